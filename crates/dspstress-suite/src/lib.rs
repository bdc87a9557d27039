//! dspstress-suite: concurrent stress-test execution for the delcore30m DSP
//!
//! The harness exercises black-box stress executables (exit code 0 = pass)
//! against the DSP while `dspstress-host` holds the device binding. This
//! crate provides:
//!
//! - [`fixture`]: deterministic test-image provisioning and cleanup
//! - [`runner`]: single external invocations with a wall-clock timeout
//! - [`case`]: serial repeat-cases
//! - [`stress`]: the fan-out/fan-in multi-core stress orchestrator
//! - [`report`]: result aggregation into a suite verdict
//! - [`plan`]: declarative suite plans (defaults mirror the established
//!   delcore30m workload)
//! - [`suite`]: top-level sequencing with guaranteed device release

pub mod case;
pub mod error;
pub mod fixture;
pub mod plan;
pub mod report;
pub mod runner;
pub mod stress;
pub mod suite;

pub use case::{run_case, CaseResult, TestCase};
pub use error::SuiteError;
pub use fixture::{Fixture, FixtureProvisioner};
pub use plan::{FixtureSpec, StressPhase, SuitePlan};
pub use report::{SuiteReport, SuiteVerdict};
pub use runner::{ExitOutcome, ProcessRunner, DEFAULT_TIMEOUT};
pub use stress::{StressOrchestrator, WorkerResult, WorkerTask};
pub use suite::StressSuite;

/// Result type for suite operations
pub type Result<T> = std::result::Result<T, SuiteError>;
