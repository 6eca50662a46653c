//! Publish Reconciler
//!
//! Bind-mounts a staged volume into the workload's target path.
//! There is no stale-mount recovery here; a failed bind mount removes the
//! directory it created, and a failed removal is reported on its own so an
//! empty target path is never left looking published.

use super::{require, require_capability, require_path};
use crate::domain::ports::{MountPointState, MounterRef, PublishVolumeRequest};
use crate::error::{Error, Result};
use crate::mount::{ensure_directory, probe_mount_point};
use tracing::{error, info};

/// Result of a successful publish call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Mounted,
    AlreadyMounted,
}

/// Bind mount options for a publish request
pub fn bind_options(readonly: bool) -> Vec<String> {
    let mut options = vec!["bind".to_string()];
    if readonly {
        options.push("ro".to_string());
    }
    options
}

/// Reconciler for NodePublishVolume
pub struct PublishReconciler {
    mounter: MounterRef,
}

impl PublishReconciler {
    pub fn new(mounter: MounterRef) -> Self {
        Self { mounter }
    }

    /// Bind the staging path into the target path
    pub async fn reconcile(&self, req: &PublishVolumeRequest) -> Result<PublishOutcome> {
        let capability =
            require_capability(&req.volume_capability, "Volume capability missing in request")?;
        let volume_id = require(&req.volume_id, "Volume ID missing in request")?;
        let target = require_path(&req.target_path, "Target path missing in request")?;
        let source = require_path(&req.staging_target_path, "Staging target not provided")?;

        if probe_mount_point(self.mounter.as_ref(), target).await? == MountPointState::ValidMount {
            info!(volume_id, target = %target.display(), "Target already published");
            return Ok(PublishOutcome::AlreadyMounted);
        }

        ensure_directory(self.mounter.as_ref(), target).await?;

        let options = bind_options(req.readonly || capability.read_only);
        info!(
            volume_id,
            source = %source.display(),
            target = %target.display(),
            options = ?options,
            "Publishing volume"
        );

        if let Err(err) = self.mounter.mount(source, target, "", &options).await {
            error!(volume_id, target = %target.display(), error = %err, "Bind mount failed");
            if let Err(e) = self.mounter.remove_dir(target).await {
                return Err(Error::CleanupFailed {
                    path: target.to_path_buf(),
                    reason: format!("{} (after mount failure: {})", e, err),
                });
            }
            return Err(err);
        }

        info!(volume_id, source = %source.display(), target = %target.display(), "Volume published");
        Ok(PublishOutcome::Mounted)
    }
}
