//! dspstress-host: kernel module and device-binding control for the
//! dspstress harness
//!
//! The DSP co-processor and the generic DMA driver cannot both claim the
//! device, so a suite run must own the binding exclusively. This crate
//! provides:
//!
//! - [`kver`]: kernel release parsing and the version gate deciding whether
//!   the legacy codec module still has to be unloaded
//! - [`host`]: the [`HostControl`] trait and the real [`SysfsHost`]
//!   implementation (uname / modprobe / sysfs control files)
//! - [`device`]: the [`DeviceLifecycle`] state machine sequencing
//!   unbind → module reload at setup and rebind → legacy reload at teardown
//! - [`fakes`]: an in-memory [`FakeHost`](fakes::FakeHost) for tests

pub mod device;
pub mod error;
pub mod fakes;
pub mod host;
pub mod kver;

pub use device::{DeviceBinding, DeviceConfig, DeviceLifecycle};
pub use error::HostError;
pub use host::{HostControl, SysfsHost};
pub use kver::{gate, KernelVersion};

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HostError>;
