//! Domain Ports - Node request records and the traits at the OS boundary
//!
//! The reconcilers only ever talk to the operating system through
//! [`Mounter`] and to the credential store through [`AttributeResolver`],
//! so both can be replaced by fakes in tests.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// Volume Capability
// =============================================================================

/// Access mode requested for a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    #[default]
    Unknown,
    SingleNodeWriter,
    SingleNodeReaderOnly,
    MultiNodeReaderOnly,
    MultiNodeSingleWriter,
    MultiNodeMultiWriter,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::Unknown => write!(f, "UNKNOWN"),
            AccessMode::SingleNodeWriter => write!(f, "SINGLE_NODE_WRITER"),
            AccessMode::SingleNodeReaderOnly => write!(f, "SINGLE_NODE_READER_ONLY"),
            AccessMode::MultiNodeReaderOnly => write!(f, "MULTI_NODE_READER_ONLY"),
            AccessMode::MultiNodeSingleWriter => write!(f, "MULTI_NODE_SINGLE_WRITER"),
            AccessMode::MultiNodeMultiWriter => write!(f, "MULTI_NODE_MULTI_WRITER"),
        }
    }
}

/// Capability of a volume as requested by the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeCapability {
    /// Requested access mode
    #[serde(default)]
    pub access_mode: AccessMode,
    /// Filesystem type, informational for FUSE mounts
    #[serde(default)]
    pub fs_type: String,
    /// Flags passed to the mount tool, in order
    #[serde(default)]
    pub mount_flags: Vec<String>,
    /// Publish the volume read-only
    #[serde(default)]
    pub read_only: bool,
}

// =============================================================================
// Node Requests
// =============================================================================

/// Keys of a secrets map, never the values
fn redacted(secrets: &BTreeMap<String, String>) -> Vec<&str> {
    secrets.keys().map(String::as_str).collect()
}

/// Request to mount a volume at its staging path
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageVolumeRequest {
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub staging_target_path: String,
    #[serde(default)]
    pub volume_capability: Option<VolumeCapability>,
    #[serde(default)]
    pub volume_context: BTreeMap<String, String>,
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
}

impl std::fmt::Debug for StageVolumeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageVolumeRequest")
            .field("volume_id", &self.volume_id)
            .field("staging_target_path", &self.staging_target_path)
            .field("volume_capability", &self.volume_capability)
            .field("volume_context", &self.volume_context)
            .field("secrets", &redacted(&self.secrets))
            .finish()
    }
}

/// Request to tear down the staging mount
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnstageVolumeRequest {
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub staging_target_path: String,
}

/// Request to bind the staged mount into a workload path
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishVolumeRequest {
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub staging_target_path: String,
    #[serde(default)]
    pub target_path: String,
    #[serde(default)]
    pub volume_capability: Option<VolumeCapability>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub volume_context: BTreeMap<String, String>,
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
}

impl std::fmt::Debug for PublishVolumeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishVolumeRequest")
            .field("volume_id", &self.volume_id)
            .field("staging_target_path", &self.staging_target_path)
            .field("target_path", &self.target_path)
            .field("volume_capability", &self.volume_capability)
            .field("readonly", &self.readonly)
            .field("volume_context", &self.volume_context)
            .field("secrets", &redacted(&self.secrets))
            .finish()
    }
}

/// Request to remove the workload bind mount
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpublishVolumeRequest {
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub target_path: String,
}

/// Request for volume usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStatsRequest {
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub volume_path: String,
}

/// Request for online volume expansion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandVolumeRequest {
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub volume_path: String,
    #[serde(default)]
    pub required_bytes: u64,
}

// =============================================================================
// Node Responses
// =============================================================================

/// Empty success object returned by the mount operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyResponse {}

// =============================================================================
// Mount Point State
// =============================================================================

/// Classification of a path as observed in the OS mount table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountPointState {
    /// Path does not exist
    Absent,
    /// Path exists and is not a mount point
    NotAMountPoint,
    /// Path is a mount point with readable content
    ValidMount,
    /// Path is registered as mounted but its content is unreadable
    StaleMount,
}

impl MountPointState {
    /// Whether something is attached at the path, healthy or not
    pub fn is_mounted(&self) -> bool {
        matches!(self, MountPointState::ValidMount | MountPointState::StaleMount)
    }
}

impl std::fmt::Display for MountPointState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MountPointState::Absent => write!(f, "absent"),
            MountPointState::NotAMountPoint => write!(f, "not-a-mount-point"),
            MountPointState::ValidMount => write!(f, "valid-mount"),
            MountPointState::StaleMount => write!(f, "stale-mount"),
        }
    }
}

// =============================================================================
// Mount Spec
// =============================================================================

/// Storage account credentials and container for a volume
#[derive(Clone, PartialEq, Eq)]
pub struct StorageAccount {
    pub account_name: String,
    pub account_key: String,
    pub container_name: String,
}

impl std::fmt::Debug for StorageAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAccount")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("container_name", &self.container_name)
            .finish()
    }
}

/// Invocation of the external mount tool for one stage call
#[derive(Clone)]
pub struct MountSpec {
    /// Remote endpoint, e.g. `wasb://<container>@<account>.blob.core.windows.net`
    pub remote_endpoint: String,
    /// Local mount point
    pub target: PathBuf,
    /// Tool flags, passed before the endpoint
    pub mount_flags: Vec<String>,
    /// Variables added on top of the inherited environment
    pub env_overrides: BTreeMap<String, String>,
}

impl MountSpec {
    /// Argument list for the mount tool
    pub fn args(&self) -> Vec<String> {
        let mut args = self.mount_flags.clone();
        args.push(self.remote_endpoint.clone());
        args.push(self.target.to_string_lossy().into_owned());
        args
    }
}

impl std::fmt::Debug for MountSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountSpec")
            .field("remote_endpoint", &self.remote_endpoint)
            .field("target", &self.target)
            .field("mount_flags", &self.mount_flags)
            .field("env_overrides", &redacted(&self.env_overrides))
            .finish()
    }
}

// =============================================================================
// Mounter Port
// =============================================================================

/// Port for the OS mount primitives
///
/// Probing methods return raw `std::io::Result` so callers can tell a missing
/// path apart from a genuine I/O failure.
#[async_trait]
pub trait Mounter: Send + Sync {
    /// Whether `path` is likely not a mount point. Fails with
    /// `ErrorKind::NotFound` when the path does not exist.
    async fn is_likely_not_mount_point(&self, path: &Path) -> std::io::Result<bool>;

    /// Enumerate the directory, used as a liveness check on a mount
    async fn read_dir(&self, path: &Path) -> std::io::Result<()>;

    /// Create the directory and its parents; existing directories succeed
    async fn make_dir(&self, path: &Path) -> std::io::Result<()>;

    /// Remove an empty directory
    async fn remove_dir(&self, path: &Path) -> std::io::Result<()>;

    /// Run the external mount tool described by `spec`
    async fn mount_remote(&self, spec: &MountSpec) -> Result<()>;

    /// Mount `source` at `target` with the given options (e.g. `bind`, `ro`)
    async fn mount(&self, source: &Path, target: &Path, fs_type: &str, options: &[String])
        -> Result<()>;

    /// Unmount `target`; a path with nothing mounted succeeds
    async fn unmount(&self, target: &Path) -> Result<()>;
}

// =============================================================================
// Attribute Resolver Port
// =============================================================================

/// Port for volume attribute and secret lookup
#[async_trait]
pub trait AttributeResolver: Send + Sync {
    /// Resolve account credentials and container for a volume
    async fn resolve(
        &self,
        volume_id: &str,
        volume_context: &BTreeMap<String, String>,
        secrets: &BTreeMap<String, String>,
    ) -> Result<StorageAccount>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type MounterRef = Arc<dyn Mounter>;
pub type AttributeResolverRef = Arc<dyn AttributeResolver>;
