//! Stage Reconciler
//!
//! Drives a staging path to "goofys mounted" state:
//!
//! ```text
//! Start ─▶ Probed ─┬─(valid)──────────────────────────────▶ AlreadyMounted
//!                  ├─(stale)─▶ Recovering ─▶ Recovered ─┐
//!                  └─(absent / plain dir)───────────────┴─▶ DirectoryEnsured ─▶ Mounted
//! ```
//!
//! A failed mount is followed by exactly one rollback pass
//! (probe, unmount, probe, remove directory). The pass never loops; if it
//! cannot restore a clean path the original mount error is returned and the
//! orchestrator retries the whole call in its own cycle.

use super::{require, require_capability, require_path};
use crate::domain::ports::{AttributeResolverRef, MountPointState, MounterRef, StageVolumeRequest};
use crate::error::{Error, Result};
use crate::mount::{build_mount_spec, ensure_directory, probe_mount_point};
use std::path::Path;
use tracing::{error, info, warn};

/// Result of a successful stage call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The mount tool was run and succeeded
    Mounted,
    /// A healthy mount was already present, nothing was run
    AlreadyMounted,
}

/// Reconciler for NodeStageVolume
pub struct StageReconciler {
    mounter: MounterRef,
    resolver: AttributeResolverRef,
}

impl StageReconciler {
    /// Create a new stage reconciler
    pub fn new(mounter: MounterRef, resolver: AttributeResolverRef) -> Self {
        Self { mounter, resolver }
    }

    /// Mount the volume at its staging path
    pub async fn reconcile(&self, req: &StageVolumeRequest) -> Result<StageOutcome> {
        let volume_id = require(&req.volume_id, "Volume ID missing in request")?;
        let target = require_path(&req.staging_target_path, "Staging target not provided")?;
        let capability =
            require_capability(&req.volume_capability, "Volume capability not provided")?;

        match probe_mount_point(self.mounter.as_ref(), target).await? {
            MountPointState::ValidMount => {
                info!(volume_id, target = %target.display(), "Already mounted to target");
                return Ok(StageOutcome::AlreadyMounted);
            }
            MountPointState::StaleMount => {
                warn!(volume_id, target = %target.display(), "Stale mount found, unmounting before remount");
                self.mounter.unmount(target).await.map_err(|e| {
                    error!(target = %target.display(), error = %e, "Unmount of stale mount failed");
                    Error::RecoveryUnmountFailed {
                        path: target.to_path_buf(),
                        reason: e.to_string(),
                    }
                })?;
            }
            MountPointState::Absent | MountPointState::NotAMountPoint => {}
        }

        ensure_directory(self.mounter.as_ref(), target).await?;

        let account = self
            .resolver
            .resolve(volume_id, &req.volume_context, &req.secrets)
            .await?;
        let spec = build_mount_spec(&account, capability, target);

        info!(
            volume_id,
            target = %target.display(),
            endpoint = %spec.remote_endpoint,
            fs_type = %capability.fs_type,
            flags = ?spec.mount_flags,
            "Mounting volume"
        );

        match self.mounter.mount_remote(&spec).await {
            Ok(()) => {
                info!(volume_id, target = %target.display(), "Volume mounted");
                Ok(StageOutcome::Mounted)
            }
            Err(err) => {
                error!(volume_id, target = %target.display(), error = %err, "Mount failed");
                self.roll_back(target).await;
                Err(err)
            }
        }
    }

    /// Single rollback pass after a failed mount. Failures are logged only;
    /// the caller always returns the original mount error.
    async fn roll_back(&self, target: &Path) {
        let state = match probe_mount_point(self.mounter.as_ref(), target).await {
            Ok(state) => state,
            Err(e) => {
                error!(target = %target.display(), error = %e, "Mount point check after failed mount failed");
                return;
            }
        };

        if state.is_mounted() {
            if let Err(e) = self.mounter.unmount(target).await {
                error!(
                    target = %target.display(),
                    error = %e,
                    "Rollback unmount failed, manual intervention may be needed"
                );
                return;
            }

            match probe_mount_point(self.mounter.as_ref(), target).await {
                Ok(state) if state.is_mounted() => {
                    error!(
                        target = %target.display(),
                        "Still mounted despite unmount, will retry on next stage call"
                    );
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(target = %target.display(), error = %e, "Mount point check after rollback failed");
                    return;
                }
            }
        }

        if let Err(e) = self.mounter.remove_dir(target).await {
            warn!(target = %target.display(), error = %e, "Could not remove staging directory");
        }
    }
}
