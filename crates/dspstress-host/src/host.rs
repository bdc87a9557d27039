//! Host control surface: kernel modules and sysfs driver-binding files
//!
//! `HostControl` is the seam between the lifecycle state machine and the
//! machine it runs on. Production code talks to the real host through
//! `SysfsHost` (uname, modprobe, sysfs control-file writes); tests use the
//! in-memory `FakeHost` from the `fakes` module.

use crate::error::HostError;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Abstraction over the host operations the lifecycle manager needs.
#[async_trait]
pub trait HostControl: Send + Sync {
    /// The running kernel release string (`uname -r`).
    async fn kernel_release(&self) -> Result<String>;

    /// Load a kernel module. Already-loaded is not an error.
    async fn load_module(&self, module: &str) -> Result<()>;

    /// Unload a kernel module. Not-currently-loaded is not an error.
    async fn unload_module(&self, module: &str) -> Result<()>;

    /// Write raw bytes to a driver control file (bind/unbind).
    ///
    /// Returns the raw I/O error so callers can distinguish "device not
    /// attached here" conditions from genuine failures.
    async fn write_control(&self, path: &Path, value: &[u8]) -> std::io::Result<()>;
}

/// Real host implementation backed by `uname`, `modprobe`, and sysfs.
#[derive(Debug, Default)]
pub struct SysfsHost;

impl SysfsHost {
    pub fn new() -> Self {
        Self
    }
}

/// modprobe -r output for a module that is absent or not loaded.
fn unload_tolerable(stderr: &str) -> bool {
    stderr.contains("not found") || stderr.contains("not currently loaded") || stderr.contains("is not loaded")
}

#[async_trait]
impl HostControl for SysfsHost {
    async fn kernel_release(&self) -> Result<String> {
        let output = Command::new("uname")
            .arg("-r")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| HostError::ReleaseQuery(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HostError::ReleaseQuery(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn load_module(&self, module: &str) -> Result<()> {
        let output = Command::new("modprobe")
            .arg(module)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| HostError::ModuleLoad {
                module: module.to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HostError::ModuleLoad {
                module: module.to_string(),
                detail: stderr.trim().to_string(),
            });
        }

        debug!(module, "module loaded");
        Ok(())
    }

    async fn unload_module(&self, module: &str) -> Result<()> {
        let output = Command::new("modprobe")
            .args(["-r", module])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| HostError::ModuleUnload {
                module: module.to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if unload_tolerable(&stderr) {
                debug!(module, "module was not loaded, nothing to unload");
                return Ok(());
            }
            return Err(HostError::ModuleUnload {
                module: module.to_string(),
                detail: stderr.trim().to_string(),
            });
        }

        debug!(module, "module unloaded");
        Ok(())
    }

    async fn write_control(&self, path: &Path, value: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(path, value).await
    }
}
