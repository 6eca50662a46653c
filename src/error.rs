//! Error types for the goofys CSI node plugin
//!
//! Every failure a node operation can surface is a variant here. Variants
//! carry the paths involved and, for external tool failures, the captured
//! tool output so operators can diagnose a failed mount from the RPC error
//! alone.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the node plugin
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} is not implemented")]
    Unimplemented(String),

    // =========================================================================
    // Mount Point Errors
    // =========================================================================
    #[error("Could not probe mount point {path:?}: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not create mount point {path:?}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Volume Attribute Errors
    // =========================================================================
    #[error("Could not resolve attributes for volume {volume_id}: {reason}")]
    AttributeResolution { volume_id: String, reason: String },

    // =========================================================================
    // External Tool Errors
    // =========================================================================
    #[error("Mount of {source_desc} at {target:?} failed: {reason}, output: {output}")]
    MountFailed {
        source_desc: String,
        target: PathBuf,
        reason: String,
        output: String,
    },

    #[error("Could not unmount {path:?}: {reason}, output: {output}")]
    UnmountFailed {
        path: PathBuf,
        reason: String,
        output: String,
    },

    // =========================================================================
    // Rollback Errors
    // =========================================================================
    #[error("Unmount of stale mount point {path:?} failed: {reason}")]
    RecoveryUnmountFailed { path: PathBuf, reason: String },

    #[error("Could not remove mount target {path:?}: {reason}")]
    CleanupFailed { path: PathBuf, reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("YAML encode error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Status code reported to the orchestrator for an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcCode {
    /// Request is malformed, caller must fix it before retrying
    InvalidArgument,
    /// Operation failed on this node, caller may retry
    Internal,
    /// Feature intentionally absent
    Unimplemented,
}

impl std::fmt::Display for RpcCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcCode::InvalidArgument => write!(f, "InvalidArgument"),
            RpcCode::Internal => write!(f, "Internal"),
            RpcCode::Unimplemented => write!(f, "Unimplemented"),
        }
    }
}

impl Error {
    /// Map this error to the status code the orchestrator sees
    pub fn code(&self) -> RpcCode {
        match self {
            Error::InvalidArgument(_) => RpcCode::InvalidArgument,
            Error::Unimplemented(_) => RpcCode::Unimplemented,
            _ => RpcCode::Internal,
        }
    }

    /// Check if the orchestrator should retry the whole operation
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::InvalidArgument(_) | Error::Unimplemented(_) | Error::Configuration(_)
        )
    }

    /// Short machine-readable name, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Unimplemented(_) => "unimplemented",
            Error::Probe { .. } => "probe",
            Error::CreateDirectory { .. } => "create_directory",
            Error::AttributeResolution { .. } => "attribute_resolution",
            Error::MountFailed { .. } => "mount_failed",
            Error::UnmountFailed { .. } => "unmount_failed",
            Error::RecoveryUnmountFailed { .. } => "recovery_unmount_failed",
            Error::CleanupFailed { .. } => "cleanup_failed",
            Error::Configuration(_) => "configuration",
            Error::Internal(_) => "internal",
            Error::Yaml(_) => "yaml",
        }
    }
}

/// Result type alias for the node plugin
pub type Result<T> = std::result::Result<T, Error>;
