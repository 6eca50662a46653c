//! Mount Point Probing
//!
//! Classifies a path against the OS mount table and prepares mount point
//! directories. Nothing here caches: every call re-reads the mount table.

use crate::domain::ports::{MountPointState, Mounter};
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Classify `path` as absent, plain directory, healthy mount or stale mount.
///
/// A missing path is a normal [`MountPointState::Absent`] result; only
/// unexpected I/O failures become [`Error::Probe`].
pub async fn probe_mount_point(mounter: &dyn Mounter, path: &Path) -> Result<MountPointState> {
    let not_mounted = match mounter.is_likely_not_mount_point(path).await {
        Ok(not_mounted) => not_mounted,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Mount point does not exist");
            return Ok(MountPointState::Absent);
        }
        Err(e) => {
            return Err(Error::Probe {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if not_mounted {
        return Ok(MountPointState::NotAMountPoint);
    }

    // Liveness check: a mount whose backing process died stays in the
    // mount table but can no longer be listed.
    match mounter.read_dir(path).await {
        Ok(()) => Ok(MountPointState::ValidMount),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Mount point is not readable");
            Ok(MountPointState::StaleMount)
        }
    }
}

/// Make sure a directory exists at `path`. Existing directories succeed.
pub async fn ensure_directory(mounter: &dyn Mounter, path: &Path) -> Result<()> {
    mounter.make_dir(path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "MakeDir failed");
        Error::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        }
    })
}
