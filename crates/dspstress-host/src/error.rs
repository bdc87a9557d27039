//! Error types for dspstress-host

use thiserror::Error;

/// Errors raised by the host control surface
#[derive(Error, Debug)]
pub enum HostError {
    /// Kernel release string could not be parsed
    #[error("cannot parse kernel release '{release}': {reason}")]
    InvalidRelease {
        /// The offending release string
        release: String,
        /// Why it was rejected
        reason: String,
    },

    /// Release-candidate base kernels are unsupported
    #[error("release-candidate kernel '{0}' is unsupported")]
    ReleaseCandidate(String),

    /// Querying the running kernel release failed
    #[error("failed to query kernel release: {0}")]
    ReleaseQuery(String),

    /// Loading a kernel module failed
    #[error("failed to load module '{module}': {detail}")]
    ModuleLoad {
        /// Module name passed to modprobe
        module: String,
        /// Captured stderr or OS error text
        detail: String,
    },

    /// Unloading a kernel module failed (not-loaded is tolerated, not reported)
    #[error("failed to unload module '{module}': {detail}")]
    ModuleUnload {
        /// Module name passed to modprobe -r
        module: String,
        /// Captured stderr or OS error text
        detail: String,
    },

    /// Unbinding the device from its generic driver failed
    #[error("failed to unbind device '{device}': {source}")]
    Unbind {
        /// Device identifier written to the unbind control file
        device: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Rebinding the device to its generic driver failed
    #[error("failed to rebind device '{device}': {source}")]
    Bind {
        /// Device identifier written to the bind control file
        device: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
