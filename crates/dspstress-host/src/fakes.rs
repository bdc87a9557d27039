//! In-memory fake host for tests
//!
//! `FakeHost` satisfies the `HostControl` contract without touching the
//! machine. Tests script the kernel release, mark control files as absent
//! (already-unbound hosts), inject load failures, and afterwards inspect an
//! ordered operation log.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::HostError;
use crate::host::HostControl;
use crate::Result;

#[derive(Debug)]
struct FakeHostState {
    release: String,
    loaded: BTreeSet<String>,
    missing_controls: BTreeSet<PathBuf>,
    busy_controls: BTreeSet<PathBuf>,
    fail_load: BTreeSet<String>,
    log: Vec<String>,
}

/// Scriptable in-memory `HostControl` implementation.
#[derive(Debug)]
pub struct FakeHost {
    state: Mutex<FakeHostState>,
}

impl FakeHost {
    /// A fake host running the given kernel release with the given modules
    /// already loaded.
    pub fn new(release: &str, loaded: &[&str]) -> Self {
        Self {
            state: Mutex::new(FakeHostState {
                release: release.to_string(),
                loaded: loaded.iter().map(|m| m.to_string()).collect(),
                missing_controls: BTreeSet::new(),
                busy_controls: BTreeSet::new(),
                fail_load: BTreeSet::new(),
                log: Vec::new(),
            }),
        }
    }

    /// Make writes to `path` fail with `NotFound`, simulating a host where
    /// the device is already unbound from the driver.
    pub fn remove_control(&self, path: &Path) {
        let mut state = self.state.lock().unwrap();
        state.missing_controls.insert(path.to_path_buf());
    }

    /// Make writes to `path` fail with EBUSY, simulating a device that is
    /// already bound.
    pub fn mark_control_busy(&self, path: &Path) {
        let mut state = self.state.lock().unwrap();
        state.busy_controls.insert(path.to_path_buf());
    }

    /// Make `load_module` fail for the given module.
    pub fn fail_load(&self, module: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_load.insert(module.to_string());
    }

    /// Whether a module is currently loaded.
    pub fn is_loaded(&self, module: &str) -> bool {
        self.state.lock().unwrap().loaded.contains(module)
    }

    /// Ordered log of every host operation performed.
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }
}

#[async_trait]
impl HostControl for FakeHost {
    async fn kernel_release(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().release.clone())
    }

    async fn load_module(&self, module: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("load {module}"));
        if state.fail_load.contains(module) {
            return Err(HostError::ModuleLoad {
                module: module.to_string(),
                detail: "injected failure".to_string(),
            });
        }
        state.loaded.insert(module.to_string());
        Ok(())
    }

    async fn unload_module(&self, module: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("unload {module}"));
        // not-loaded is tolerated, matching the modprobe -r contract
        state.loaded.remove(module);
        Ok(())
    }

    async fn write_control(&self, path: &Path, value: &[u8]) -> std::io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!(
            "write {} <- {}",
            path.display(),
            String::from_utf8_lossy(value)
        ));
        if state.missing_controls.contains(path) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such control file",
            ));
        }
        if state.busy_controls.contains(path) {
            return Err(std::io::Error::from_raw_os_error(16)); // EBUSY
        }
        Ok(())
    }
}
