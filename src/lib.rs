//! goofys CSI Node Plugin
//!
//! Node-side volume plugin that mounts object-storage containers on a node
//! with goofys and binds them into workload paths.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                          Node RPC Surface (REST)                            │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────────┐  │
//! │  │     Stage       │  │    Publish      │  │   Unstage / Unpublish       │  │
//! │  │   Reconciler    │  │   Reconciler    │  │   Reconciler                │  │
//! │  └────────┬────────┘  └────────┬────────┘  └─────────────┬───────────────┘  │
//! │           │                    │                         │                  │
//! │           └────────────────────┼─────────────────────────┘                  │
//! │                                │                                            │
//! │                    ┌───────────┴───────────┐                                │
//! │                    │  Mount Point Prober   │                                │
//! │                    │  (re-probe, no cache) │                                │
//! │                    └───────────┬───────────┘                                │
//! ├────────────────────────────────┼────────────────────────────────────────────┤
//! │                           Mounter Port                                      │
//! │  ┌─────────────────────────────┐  ┌─────────────────────────────────────┐   │
//! │  │     OS mount table          │  │     goofys / mount / umount         │   │
//! │  │   (stat, readdir, mkdir)    │  │     (child processes)               │   │
//! │  └─────────────────────────────┘  └─────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`node`]: Stage/Publish/Unstage/Unpublish reconcilers and the node service
//! - [`mount`]: Mount point probing and the OS-backed mounter
//! - [`driver`]: Static driver configuration and identity responder
//! - [`api`]: JSON endpoints and server
//! - [`domain`]: Request records and port traits
//! - [`error`]: Error types and handling

pub mod api;
pub mod domain;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod mount;
pub mod node;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, RestRouter};

pub use domain::ports::{
    AccessMode, AttributeResolver, MountPointState, MountSpec, Mounter, StorageAccount,
    VolumeCapability,
};

pub use driver::{DriverConfig, IdentityResponder, VersionInfo};

pub use error::{Error, Result, RpcCode};

pub use metrics::NodeMetrics;

pub use mount::SystemMounter;

pub use node::{
    NodeService, PublishReconciler, SecretAttributeResolver, StageReconciler,
    TeardownReconciler,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
