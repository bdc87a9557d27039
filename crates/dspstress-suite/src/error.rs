//! Error types for dspstress-suite

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while running a stress suite
#[derive(Error, Debug)]
pub enum SuiteError {
    /// A stress or compute executable could not be started
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program name as invoked
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Fixture generation failed (generation is fatal, cleanup is not)
    #[error("fixture generation failed for {path}: {reason}")]
    Fixture {
        /// Target image path
        path: PathBuf,
        /// Generator exit status or OS error text
        reason: String,
    },

    /// A stress worker vanished without reporting its result
    #[error("stress worker for core {core} did not report: {source}")]
    WorkerLost {
        /// Core index of the lost worker
        core: usize,
        /// The join failure (panic or cancellation)
        #[source]
        source: tokio::task::JoinError,
    },

    /// A suite plan file could not be parsed
    #[error("invalid suite plan: {0}")]
    Plan(#[from] serde_json::Error),

    /// Device or module sequencing failed
    #[error(transparent)]
    Host(#[from] dspstress_host::HostError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
