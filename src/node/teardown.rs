//! Unstage / Unpublish
//!
//! Both tear-downs validate the request and call the unmount primitive once.
//! There is no pre-probe and no retry: an already-unmounted path succeeds
//! because the primitive itself is idempotent, and any failure goes straight
//! back to the orchestrator.

use super::{require, require_path};
use crate::domain::ports::{MounterRef, UnpublishVolumeRequest, UnstageVolumeRequest};
use crate::error::Result;
use std::path::Path;
use tracing::{error, info};

/// Reconciler for NodeUnstageVolume and NodeUnpublishVolume
pub struct TeardownReconciler {
    mounter: MounterRef,
}

impl TeardownReconciler {
    pub fn new(mounter: MounterRef) -> Self {
        Self { mounter }
    }

    /// Unmount the staging path
    pub async fn unstage(&self, req: &UnstageVolumeRequest) -> Result<()> {
        let volume_id = require(&req.volume_id, "Volume ID not provided")?;
        let target = require_path(&req.staging_target_path, "Staging target not provided")?;
        self.unmount(volume_id, target).await
    }

    /// Unmount the workload target path
    pub async fn unpublish(&self, req: &UnpublishVolumeRequest) -> Result<()> {
        let volume_id = require(&req.volume_id, "Volume ID missing in request")?;
        let target = require_path(&req.target_path, "Target path missing in request")?;
        self.unmount(volume_id, target).await
    }

    async fn unmount(&self, volume_id: &str, target: &Path) -> Result<()> {
        info!(volume_id, target = %target.display(), "Unmounting volume");
        self.mounter.unmount(target).await.map_err(|e| {
            error!(volume_id, target = %target.display(), error = %e, "Unmount failed");
            e
        })?;
        info!(volume_id, target = %target.display(), "Volume unmounted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mount::testing::{FakeCalls, FakeEntry, FakeMounter};
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn reconciler() -> (TeardownReconciler, Arc<FakeMounter>) {
        let fake = Arc::new(FakeMounter::new());
        (TeardownReconciler::new(fake.clone()), fake)
    }

    fn unstage_request() -> UnstageVolumeRequest {
        UnstageVolumeRequest {
            volume_id: "v1".into(),
            staging_target_path: "/var/lib/stage/v1".into(),
        }
    }

    #[tokio::test]
    async fn test_unstage_unmounts_once() {
        let (reconciler, fake) = reconciler();
        fake.set("/var/lib/stage/v1", FakeEntry::Mounted);

        reconciler.unstage(&unstage_request()).await.unwrap();

        assert_eq!(fake.calls().unmount, 1);
        assert_eq!(fake.calls().probe, 0);
        assert_eq!(fake.entry("/var/lib/stage/v1"), Some(FakeEntry::Dir));
    }

    #[tokio::test]
    async fn test_unstage_of_unmounted_path_succeeds() {
        let (reconciler, fake) = reconciler();

        tokio_test::assert_ok!(reconciler.unstage(&unstage_request()).await);
        tokio_test::assert_ok!(reconciler.unstage(&unstage_request()).await);

        assert_eq!(fake.calls().unmount, 2);
    }

    #[tokio::test]
    async fn test_unmount_failure_is_surfaced() {
        let (reconciler, fake) = reconciler();
        fake.script(|s| s.fail_unmount = true);

        let err = reconciler.unstage(&unstage_request()).await.unwrap_err();

        assert_matches!(err, Error::UnmountFailed { ref output, .. } if output == "target is busy");
        assert_eq!(fake.calls().unmount, 1);
    }

    #[tokio::test]
    async fn test_unstage_validation() {
        let (reconciler, fake) = reconciler();

        let missing_id = UnstageVolumeRequest {
            volume_id: String::new(),
            ..unstage_request()
        };
        assert_matches!(reconciler.unstage(&missing_id).await, Err(Error::InvalidArgument(m)) if m == "Volume ID not provided");

        let missing_path = UnstageVolumeRequest {
            staging_target_path: String::new(),
            ..unstage_request()
        };
        assert_matches!(reconciler.unstage(&missing_path).await, Err(Error::InvalidArgument(m)) if m == "Staging target not provided");

        let relative_path = UnstageVolumeRequest {
            staging_target_path: "stage/v1".into(),
            ..unstage_request()
        };
        assert_matches!(reconciler.unstage(&relative_path).await, Err(Error::InvalidArgument(_)));

        assert_eq!(fake.calls(), FakeCalls::default());
    }

    #[tokio::test]
    async fn test_unpublish_validation() {
        let (reconciler, fake) = reconciler();

        let missing_id = UnpublishVolumeRequest {
            volume_id: String::new(),
            target_path: "/var/lib/pods/p1".into(),
        };
        assert_matches!(reconciler.unpublish(&missing_id).await, Err(Error::InvalidArgument(_)));

        let missing_target = UnpublishVolumeRequest {
            volume_id: "v1".into(),
            target_path: String::new(),
        };
        assert_matches!(
            reconciler.unpublish(&missing_target).await,
            Err(Error::InvalidArgument(_))
        );

        let relative_target = UnpublishVolumeRequest {
            volume_id: "v1".into(),
            target_path: "pods/p1".into(),
        };
        assert_matches!(
            reconciler.unpublish(&relative_target).await,
            Err(Error::InvalidArgument(_))
        );

        assert_eq!(fake.calls(), FakeCalls::default());
    }
}
