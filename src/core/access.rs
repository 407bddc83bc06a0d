//! Scoped access to files outside the documents root
//!
//! Sandboxed platforms require access to an externally picked file to be
//! bracketed by explicit start/stop calls. `AccessGuard` releases on drop.

use std::path::{Path, PathBuf};

/// Platform capability granting temporary access to an external file
pub trait ScopedAccess: Send + Sync {
    /// Request access; `false` means access was denied
    fn start(&self, path: &Path) -> bool;

    /// Release previously granted access
    fn stop(&self, path: &Path);
}

/// Access policy for unsandboxed platforms: always granted, nothing to release
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl ScopedAccess for Unrestricted {
    fn start(&self, _path: &Path) -> bool {
        true
    }

    fn stop(&self, _path: &Path) {}
}

/// Granted access that is released when dropped
pub struct AccessGuard<'a> {
    access: &'a dyn ScopedAccess,
    path: PathBuf,
}

impl<'a> AccessGuard<'a> {
    /// Acquire access, or `None` if denied
    pub fn acquire(access: &'a dyn ScopedAccess, path: &Path) -> Option<Self> {
        if !access.start(path) {
            return None;
        }
        Some(Self {
            access,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.access.stop(&self.path);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records start/stop calls and optionally denies access; clones share the log
    #[derive(Clone, Default)]
    pub struct RecordingAccess {
        pub deny: bool,
        pub calls: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingAccess {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ScopedAccess for RecordingAccess {
        fn start(&self, path: &Path) -> bool {
            self.calls
                .lock()
                .unwrap()
                .push(format!("start {}", path.display()));
            !self.deny
        }

        fn stop(&self, path: &Path) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("stop {}", path.display()));
        }
    }
}
