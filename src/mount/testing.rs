//! In-memory Mounter for reconciler tests
//!
//! Holds a fake mount table keyed by path, counts every call and lets tests
//! script failures of each primitive.

use crate::domain::ports::{MountSpec, Mounter};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// What exists at a fake path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeEntry {
    Dir,
    Mounted,
    Stale,
}

/// Call counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeCalls {
    pub probe: usize,
    pub make_dir: usize,
    pub remove_dir: usize,
    pub mount_remote: usize,
    pub mount: usize,
    pub unmount: usize,
}

/// Scripted behaviour
#[derive(Debug, Default)]
pub struct FakeScript {
    /// Probe calls with index >= this value fail with an I/O error
    pub fail_probe_from: Option<usize>,
    pub fail_make_dir: bool,
    pub fail_remove_dir: bool,
    pub fail_mount_remote: bool,
    /// A failed remote mount still leaves the target mounted
    pub mount_remote_leaves_mounted: bool,
    pub fail_mount: bool,
    pub fail_unmount: bool,
    /// A successful unmount leaves the target mounted
    pub unmount_leaves_mounted: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    entries: HashMap<PathBuf, FakeEntry>,
    calls: FakeCalls,
    script: FakeScript,
    last_spec: Option<MountSpec>,
    last_mount_options: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeMounter {
    state: Mutex<FakeState>,
}

impl FakeMounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: impl Into<PathBuf>, entry: FakeEntry) {
        self.state.lock().entries.insert(path.into(), entry);
    }

    pub fn entry(&self, path: impl AsRef<Path>) -> Option<FakeEntry> {
        self.state.lock().entries.get(path.as_ref()).copied()
    }

    pub fn script(&self, f: impl FnOnce(&mut FakeScript)) {
        f(&mut self.state.lock().script);
    }

    pub fn fail_probe_from_call(&self, call: usize) {
        self.state.lock().script.fail_probe_from = Some(call);
    }

    pub fn calls(&self) -> FakeCalls {
        self.state.lock().calls.clone()
    }

    pub fn last_spec(&self) -> Option<MountSpec> {
        self.state.lock().last_spec.clone()
    }

    pub fn last_mount_options(&self) -> Vec<String> {
        self.state.lock().last_mount_options.clone()
    }
}

#[async_trait]
impl Mounter for FakeMounter {
    async fn is_likely_not_mount_point(&self, path: &Path) -> std::io::Result<bool> {
        let mut state = self.state.lock();
        let call = state.calls.probe;
        state.calls.probe += 1;
        if state.script.fail_probe_from.is_some_and(|from| call >= from) {
            return Err(std::io::Error::new(ErrorKind::PermissionDenied, "fake probe failure"));
        }
        match state.entries.get(path) {
            None => Err(std::io::Error::new(ErrorKind::NotFound, "no such file")),
            Some(FakeEntry::Dir) => Ok(true),
            Some(FakeEntry::Mounted) | Some(FakeEntry::Stale) => Ok(false),
        }
    }

    async fn read_dir(&self, path: &Path) -> std::io::Result<()> {
        match self.state.lock().entries.get(path) {
            None => Err(std::io::Error::new(ErrorKind::NotFound, "no such file")),
            Some(FakeEntry::Stale) => Err(std::io::Error::new(
                ErrorKind::NotConnected,
                "transport endpoint is not connected",
            )),
            Some(_) => Ok(()),
        }
    }

    async fn make_dir(&self, path: &Path) -> std::io::Result<()> {
        let mut state = self.state.lock();
        state.calls.make_dir += 1;
        if state.script.fail_make_dir {
            return Err(std::io::Error::new(ErrorKind::PermissionDenied, "read-only filesystem"));
        }
        state.entries.entry(path.to_path_buf()).or_insert(FakeEntry::Dir);
        Ok(())
    }

    async fn remove_dir(&self, path: &Path) -> std::io::Result<()> {
        let mut state = self.state.lock();
        state.calls.remove_dir += 1;
        if state.script.fail_remove_dir {
            return Err(std::io::Error::new(ErrorKind::Other, "device or resource busy"));
        }
        let entry = state.entries.get(path).copied();
        match entry {
            None => Err(std::io::Error::new(ErrorKind::NotFound, "no such file")),
            Some(FakeEntry::Dir) => {
                state.entries.remove(path);
                Ok(())
            }
            Some(_) => Err(std::io::Error::new(ErrorKind::Other, "device or resource busy")),
        }
    }

    async fn mount_remote(&self, spec: &MountSpec) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.mount_remote += 1;
        state.last_spec = Some(spec.clone());
        if state.script.fail_mount_remote {
            if state.script.mount_remote_leaves_mounted {
                state.entries.insert(spec.target.clone(), FakeEntry::Mounted);
            }
            return Err(Error::MountFailed {
                source_desc: spec.remote_endpoint.clone(),
                target: spec.target.clone(),
                reason: "exit status: 1".into(),
                output: "fake mount tool failure".into(),
            });
        }
        state.entries.insert(spec.target.clone(), FakeEntry::Mounted);
        Ok(())
    }

    async fn mount(
        &self,
        source: &Path,
        target: &Path,
        _fs_type: &str,
        options: &[String],
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.mount += 1;
        state.last_mount_options = options.to_vec();
        if state.script.fail_mount {
            return Err(Error::MountFailed {
                source_desc: source.display().to_string(),
                target: target.to_path_buf(),
                reason: "exit status: 32".into(),
                output: "fake bind mount failure".into(),
            });
        }
        state.entries.insert(target.to_path_buf(), FakeEntry::Mounted);
        Ok(())
    }

    async fn unmount(&self, target: &Path) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.unmount += 1;
        if state.script.fail_unmount {
            return Err(Error::UnmountFailed {
                path: target.to_path_buf(),
                reason: "exit status: 32".into(),
                output: "target is busy".into(),
            });
        }
        if state.script.unmount_leaves_mounted {
            return Ok(());
        }
        if let Some(entry) = state.entries.get_mut(target) {
            *entry = FakeEntry::Dir;
        }
        Ok(())
    }
}
