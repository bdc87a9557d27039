//! Device lifecycle: exclusive driver binding for the suite
//!
//! The DSP and the generic DMA driver contend for the same memory-transfer
//! channel, so the sequence is strict: unbind from the generic driver before
//! loading the target module, rebind only after the suite is done. The whole
//! sequence is idempotent against a host that starts already unbound or with
//! modules already unloaded.

use crate::error::HostError;
use crate::host::HostControl;
use crate::kver::{gate, KernelVersion};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the device is currently attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceBinding {
    /// Bound to the generic DMA driver (host default).
    GenericDma,
    /// Detached from every driver.
    Unbound,
    /// Bound to the target DSP driver.
    TargetDriver,
}

/// Names and paths describing the device under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device identifier written to the bind/unbind control files.
    pub device_id: String,

    /// Generic DMA driver the device belongs to outside the suite.
    pub generic_driver: String,

    /// Bus directory containing the driver control files.
    pub bus_path: PathBuf,

    /// Target driver module exercised by the suite.
    pub target_module: String,

    /// Legacy codec module that claims the DMA channel on old kernels.
    pub secondary_module: String,

    /// Kernel versions below this still need the legacy module unloaded.
    pub legacy_gate: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: "37220000.dma".to_string(),
            generic_driver: "dma-pl330".to_string(),
            bus_path: PathBuf::from("/sys/bus/amba/drivers"),
            target_module: "delcore30m".to_string(),
            secondary_module: "avico".to_string(),
            legacy_gate: "5.4".to_string(),
        }
    }
}

impl DeviceConfig {
    /// Control file that detaches the device from the generic driver.
    pub fn unbind_path(&self) -> PathBuf {
        self.bus_path.join(&self.generic_driver).join("unbind")
    }

    /// Control file that reattaches the device to the generic driver.
    pub fn bind_path(&self) -> PathBuf {
        self.bus_path.join(&self.generic_driver).join("bind")
    }
}

/// Unbind write errors meaning the device was not attached to this driver.
fn already_unbound(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::NotFound || err.raw_os_error() == Some(19) // ENODEV
}

/// Bind write errors meaning the device already has a driver.
fn already_bound(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(16) // EBUSY
}

/// Owns the device binding state for the duration of a suite run.
///
/// `setup` must be balanced by `teardown` on every exit path; the suite
/// guarantees this by treating all mid-run failures as values and calling
/// `teardown` before propagating them.
pub struct DeviceLifecycle {
    host: Arc<dyn HostControl>,
    config: DeviceConfig,
    binding: DeviceBinding,
    /// Gate decision cached at setup so teardown can never disagree with it.
    legacy_unload: Option<bool>,
}

impl DeviceLifecycle {
    pub fn new(host: Arc<dyn HostControl>, config: DeviceConfig) -> Self {
        Self {
            host,
            config,
            binding: DeviceBinding::GenericDma,
            legacy_unload: None,
        }
    }

    /// Current binding state as tracked by the lifecycle.
    pub fn binding(&self) -> DeviceBinding {
        self.binding
    }

    /// Claim the device for the target driver.
    ///
    /// On old kernels the legacy codec module is unloaded first; the device
    /// is then detached from the generic DMA driver and the target module is
    /// cycled (unload + load) to start from a clean driver state.
    pub async fn setup(&mut self) -> Result<()> {
        let release = self.host.kernel_release().await?;
        let current = KernelVersion::parse(&release)?;
        let threshold = KernelVersion::parse(&self.config.legacy_gate)?;
        let legacy = gate(&current, &threshold);
        self.legacy_unload = Some(legacy);
        info!(kernel = %current, legacy_unload = legacy, "device setup starting");

        if legacy {
            self.host.unload_module(&self.config.secondary_module).await?;
        }

        let unbind = self.config.unbind_path();
        match self
            .host
            .write_control(&unbind, self.config.device_id.as_bytes())
            .await
        {
            Ok(()) => debug!(device = %self.config.device_id, "device unbound from generic driver"),
            Err(e) if already_unbound(&e) => {
                debug!(device = %self.config.device_id, "device already unbound")
            }
            Err(e) => {
                return Err(HostError::Unbind {
                    device: self.config.device_id.clone(),
                    source: e,
                })
            }
        }
        self.binding = DeviceBinding::Unbound;

        self.host.unload_module(&self.config.target_module).await?;
        self.host.load_module(&self.config.target_module).await?;
        self.binding = DeviceBinding::TargetDriver;

        info!(module = %self.config.target_module, "target driver bound");
        Ok(())
    }

    /// Restore the host to its pre-suite state.
    ///
    /// Safe to call after a partially failed setup: rebinding a still-bound
    /// device is tolerated, and the legacy module is only reloaded if setup
    /// actually unloaded it. Errors here mean the host is in an inconsistent
    /// state and must abort the process; there is no retry.
    pub async fn teardown(&mut self) -> Result<()> {
        let bind = self.config.bind_path();
        match self
            .host
            .write_control(&bind, self.config.device_id.as_bytes())
            .await
        {
            Ok(()) => debug!(device = %self.config.device_id, "device rebound to generic driver"),
            Err(e) if already_bound(&e) => {
                debug!(device = %self.config.device_id, "device already bound")
            }
            Err(e) => {
                return Err(HostError::Bind {
                    device: self.config.device_id.clone(),
                    source: e,
                })
            }
        }
        self.binding = DeviceBinding::GenericDma;

        if self.legacy_unload.unwrap_or(false) {
            self.host.load_module(&self.config.secondary_module).await?;
        }

        info!("device teardown complete");
        Ok(())
    }
}
