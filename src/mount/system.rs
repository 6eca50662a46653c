//! OS-backed Mounter
//!
//! Implements the [`Mounter`] port with filesystem metadata, `mount`/`umount`
//! and the goofys binary. All external commands run to completion; nothing
//! here kills a child process on cancellation.

use crate::domain::ports::{MountSpec, Mounter};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Default mount tool binary
pub const DEFAULT_MOUNT_BINARY: &str = "goofys";

/// Mount point directory permissions
const MOUNT_POINT_MODE: u32 = 0o750;

/// Mount table of the calling process
const MOUNTINFO_PATH: &str = "/proc/self/mountinfo";

/// Mounter backed by the local operating system
#[derive(Debug, Clone)]
pub struct SystemMounter {
    mount_binary: String,
}

impl Default for SystemMounter {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT_BINARY)
    }
}

impl SystemMounter {
    /// Create a mounter that runs `mount_binary` for remote mounts
    pub fn new(mount_binary: impl Into<String>) -> Self {
        Self {
            mount_binary: mount_binary.into(),
        }
    }
}

/// Decode the octal escapes (`\040` for a space) used in mountinfo paths
fn unescape_mount_path(field: &str) -> PathBuf {
    let bytes = field.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b));
        if escaped {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            decoded.push(value as u8);
            i += 4;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    PathBuf::from(OsStr::from_bytes(&decoded))
}

/// Mount points listed in `/proc/self/mountinfo` text
///
/// Format per line: `<id> <parent> <major:minor> <root> <mount point> ...`
pub fn parse_mountinfo(text: &str) -> Vec<PathBuf> {
    text.lines()
        .filter_map(|line| line.split_whitespace().nth(4))
        .map(unescape_mount_path)
        .collect()
}

/// Whether `target` appears as a mount point in the given mount table
pub fn is_listed_mount_point(mount_points: &[PathBuf], target: &Path) -> bool {
    mount_points.iter().any(|m| m == target)
}

impl SystemMounter {
    /// Look `target` up in the kernel mount table
    ///
    /// Bind mounts of a directory on the same filesystem keep the parent's
    /// device number, so only the table can tell them apart from plain
    /// directories. Answers `None` when the table cannot be read.
    async fn in_mount_table(&self, target: &Path) -> Option<bool> {
        let text = match tokio::fs::read_to_string(MOUNTINFO_PATH).await {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "Mount table unavailable");
                return None;
            }
        };
        // A dead FUSE mount fails realpath with ENOTCONN; compare as given.
        let resolved = tokio::fs::canonicalize(target)
            .await
            .unwrap_or_else(|_| target.to_path_buf());
        let mount_points = parse_mountinfo(&text);
        Some(
            is_listed_mount_point(&mount_points, &resolved)
                || is_listed_mount_point(&mount_points, target),
        )
    }
}

/// Stdout followed by stderr, lossily decoded
fn combined_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined.trim().to_string()
}

#[async_trait]
impl Mounter for SystemMounter {
    async fn is_likely_not_mount_point(&self, path: &Path) -> std::io::Result<bool> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            // A FUSE mount whose daemon exited answers stat with ENOTCONN.
            // It is still in the mount table, so report it as mounted and let
            // the liveness check classify it.
            Err(e) if e.kind() == ErrorKind::NotConnected => return Ok(false),
            Err(e) => return Err(e),
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => return Ok(false),
        };
        let parent_meta = tokio::fs::metadata(parent).await?;

        Ok(meta.dev() == parent_meta.dev())
    }

    async fn read_dir(&self, path: &Path) -> std::io::Result<()> {
        let mut entries = tokio::fs::read_dir(path).await?;
        entries.next_entry().await?;
        Ok(())
    }

    async fn make_dir(&self, path: &Path) -> std::io::Result<()> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true).mode(MOUNT_POINT_MODE);
        builder.create(path).await
    }

    async fn remove_dir(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_dir(path).await
    }

    async fn mount_remote(&self, spec: &MountSpec) -> Result<()> {
        debug!(
            binary = %self.mount_binary,
            args = ?spec.args(),
            target = %spec.target.display(),
            "Running mount tool"
        );

        let output = Command::new(&self.mount_binary)
            .args(spec.args())
            .envs(&spec.env_overrides)
            .output()
            .await
            .map_err(|e| Error::MountFailed {
                source_desc: spec.remote_endpoint.clone(),
                target: spec.target.clone(),
                reason: format!("could not run {}: {}", self.mount_binary, e),
                output: String::new(),
            })?;

        let text = combined_output(&output);
        if !output.status.success() {
            error!(
                target = %spec.target.display(),
                status = %output.status,
                output = %text,
                "Mount tool failed"
            );
            return Err(Error::MountFailed {
                source_desc: spec.remote_endpoint.clone(),
                target: spec.target.clone(),
                reason: output.status.to_string(),
                output: text,
            });
        }

        debug!(target = %spec.target.display(), output = %text, "Mount tool succeeded");
        Ok(())
    }

    async fn mount(
        &self,
        source: &Path,
        target: &Path,
        fs_type: &str,
        options: &[String],
    ) -> Result<()> {
        let mut command = Command::new("mount");
        if !fs_type.is_empty() {
            command.args(["-t", fs_type]);
        }
        if !options.is_empty() {
            let joined = options.join(",");
            command.args(["-o", joined.as_str()]);
        }
        command.arg(source).arg(target);

        let failed = |reason: String, output: String| Error::MountFailed {
            source_desc: source.display().to_string(),
            target: target.to_path_buf(),
            reason,
            output,
        };

        let output = command
            .output()
            .await
            .map_err(|e| failed(format!("could not run mount: {}", e), String::new()))?;

        if !output.status.success() {
            return Err(failed(output.status.to_string(), combined_output(&output)));
        }

        Ok(())
    }

    async fn unmount(&self, target: &Path) -> Result<()> {
        match tokio::fs::symlink_metadata(target).await {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(target = %target.display(), "Unmount skipped, path does not exist");
                return Ok(());
            }
            _ => {}
        }

        if self.in_mount_table(target).await == Some(false) {
            info!(target = %target.display(), "Unmount skipped, path is not mounted");
            return Ok(());
        }

        let output = Command::new("umount")
            .arg(target)
            .output()
            .await
            .map_err(|e| Error::UnmountFailed {
                path: target.to_path_buf(),
                reason: format!("could not run umount: {}", e),
                output: String::new(),
            })?;

        if !output.status.success() {
            let text = combined_output(&output);
            // Lost a race with another unmount of the same path.
            if text.contains("not mounted") {
                info!(target = %target.display(), "Unmount skipped, path is not mounted");
                return Ok(());
            }
            return Err(Error::UnmountFailed {
                path: target.to_path_buf(),
                reason: output.status.to_string(),
                output: text,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_plain_directory_is_not_mount_point() {
        let tmp = TempDir::new().unwrap();
        let mounter = SystemMounter::default();
        assert!(mounter.is_likely_not_mount_point(tmp.path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_path_reports_not_found() {
        let tmp = TempDir::new().unwrap();
        let mounter = SystemMounter::default();
        let err = mounter
            .is_likely_not_mount_point(&tmp.path().join("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_make_and_remove_dir() {
        let tmp = TempDir::new().unwrap();
        let mounter = SystemMounter::default();
        let target = tmp.path().join("a/b/c");

        mounter.make_dir(&target).await.unwrap();
        mounter.make_dir(&target).await.unwrap();
        assert!(target.is_dir());

        mounter.remove_dir(&target).await.unwrap();
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_unmount_of_unmounted_paths_succeeds() {
        let tmp = TempDir::new().unwrap();
        let mounter = SystemMounter::default();

        mounter.unmount(tmp.path()).await.unwrap();
        mounter.unmount(&tmp.path().join("missing")).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_mount_binary_reports_mount_failure() {
        let tmp = TempDir::new().unwrap();
        let mounter = SystemMounter::new("/nonexistent/goofys-binary");
        let spec = MountSpec {
            remote_endpoint: "wasb://c@a.blob.core.windows.net".into(),
            target: tmp.path().to_path_buf(),
            mount_flags: Vec::new(),
            env_overrides: BTreeMap::new(),
        };

        let err = mounter.mount_remote(&spec).await.unwrap_err();
        assert_matches!(err, Error::MountFailed { ref target, .. } if target == tmp.path());
    }

    #[tokio::test]
    async fn test_failing_mount_tool_captures_output() {
        let tmp = TempDir::new().unwrap();
        // `sh -c <script> <endpoint> <target>` prints and exits non-zero
        let mounter = SystemMounter::new("sh");
        let spec = MountSpec {
            remote_endpoint: "wasb://c@a.blob.core.windows.net".into(),
            target: tmp.path().to_path_buf(),
            mount_flags: vec!["-c".into(), "echo \"account=$AZURE_STORAGE_ACCOUNT\"; exit 3".into()],
            env_overrides: BTreeMap::from([(
                "AZURE_STORAGE_ACCOUNT".to_string(),
                "acct".to_string(),
            )]),
        };

        let err = mounter.mount_remote(&spec).await.unwrap_err();
        assert_matches!(err, Error::MountFailed { ref output, .. } if output == "account=acct");
    }

    const MOUNTINFO: &str = "\
22 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw
36 22 0:45 / /var/lib/stage/v1 rw,nosuid,nodev shared:20 - fuse goofys rw,user_id=0
37 22 8:1 /var/lib/stage/v1 /var/lib/pods/p1/volumes/v1 rw,relatime shared:1 - ext4 /dev/sda1 rw
38 22 8:1 /data /mnt/with\\040space rw,relatime shared:1 - ext4 /dev/sda1 rw
";

    #[test]
    fn test_parse_mountinfo() {
        let mount_points = parse_mountinfo(MOUNTINFO);
        assert_eq!(mount_points.len(), 4);
        assert_eq!(mount_points[1], Path::new("/var/lib/stage/v1"));
        assert_eq!(mount_points[3], Path::new("/mnt/with space"));
    }

    #[test]
    fn test_same_device_bind_mount_is_listed() {
        // The bind mount shares 8:1 with `/`, so a device comparison misses it
        let mount_points = parse_mountinfo(MOUNTINFO);
        assert!(is_listed_mount_point(&mount_points, Path::new("/var/lib/pods/p1/volumes/v1")));
        assert!(!is_listed_mount_point(&mount_points, Path::new("/var/lib/pods/p2/volumes/v1")));
    }

    #[test]
    fn test_unescape_mount_path_keeps_plain_backslash() {
        assert_eq!(unescape_mount_path("/a\\b"), Path::new("/a\\b"));
        assert_eq!(unescape_mount_path("/tab\\011end"), Path::new("/tab\tend"));
    }

    #[tokio::test]
    async fn test_unmount_removes_same_device_bind_mount() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        let target = tmp.path().join("dst");
        std::fs::create_dir(&source).unwrap();
        std::fs::create_dir(&target).unwrap();

        let mounter = SystemMounter::default();
        let options = vec!["bind".to_string()];
        if mounter.mount(&source, &target, "", &options).await.is_err() {
            // Needs mount privileges
            return;
        }
        assert!(mounter.is_likely_not_mount_point(&target).await.unwrap());
        assert_eq!(mounter.in_mount_table(&target).await, Some(true));

        mounter.unmount(&target).await.unwrap();

        assert_eq!(mounter.in_mount_table(&target).await, Some(false));
    }
}
