//! External stress-executable invocation with a wall-clock timeout
//!
//! Every test case and every stress worker funnels through
//! [`ProcessRunner::run`]; it is the only suspension point in the harness.
//! The contract with the executables is exit-code only: 0 passes, anything
//! else fails, output is diagnostic and normally discarded.

use crate::error::SuiteError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

/// Default per-invocation timeout, matching the harness-wide historical value.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How a single invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitOutcome {
    /// Normal termination with the raw exit code (signal death is -1).
    Exited(i32),
    /// The executable ran past the timeout and was killed.
    TimedOut,
}

impl ExitOutcome {
    /// Whether this invocation passed (exit code 0).
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }
}

impl std::fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exit code {code}"),
            ExitOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Invokes external executables, enforcing a timeout per invocation.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    verbose: bool,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
        }
    }
}

impl ProcessRunner {
    pub fn new(timeout: Duration, verbose: bool) -> Self {
        Self { timeout, verbose }
    }

    /// Same runner with a different timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            verbose: self.verbose,
        }
    }

    /// Run `program` with `args` to completion or timeout.
    ///
    /// Output is discarded unless the runner is verbose, in which case the
    /// child inherits the caller's streams. A timeout kills only this child
    /// and is reported as [`ExitOutcome::TimedOut`], never as an exit code.
    pub async fn run(&self, program: &str, args: &[String]) -> Result<ExitOutcome> {
        let (stdout, stderr) = if self.verbose {
            (Stdio::inherit(), Stdio::inherit())
        } else {
            (Stdio::null(), Stdio::null())
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| SuiteError::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                Ok(ExitOutcome::Exited(status.code().unwrap_or(-1)))
            }
            Err(_) => {
                warn!(
                    program,
                    timeout_secs = self.timeout.as_secs(),
                    "executable timed out, killing"
                );
                if let Err(e) = child.kill().await {
                    warn!(program, error = %e, "failed to kill timed-out child");
                }
                Ok(ExitOutcome::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_exit_zero_is_success() {
        assert!(ExitOutcome::Exited(0).is_success());
        assert!(!ExitOutcome::Exited(2).is_success());
        assert!(!ExitOutcome::Exited(-1).is_success());
        assert!(!ExitOutcome::TimedOut.is_success());
    }

    #[tokio::test]
    async fn test_run_reports_raw_exit_code() {
        let runner = ProcessRunner::default();

        let ok = runner.run("true", &[]).await.unwrap();
        assert_eq!(ok, ExitOutcome::Exited(0));

        let fail = runner
            .run("sh", &["-c".to_string(), "exit 3".to_string()])
            .await
            .unwrap();
        assert_eq!(fail, ExitOutcome::Exited(3));
    }

    #[tokio::test]
    async fn test_run_times_out_instead_of_hanging() {
        let runner = ProcessRunner::new(Duration::from_millis(200), false);
        let outcome = runner
            .run("sleep", &["30".to_string()])
            .await
            .unwrap();
        assert_eq!(outcome, ExitOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_missing_executable_is_a_spawn_error() {
        let runner = ProcessRunner::default();
        let err = runner
            .run("dspstress-no-such-binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SuiteError::Spawn { .. }));
    }
}
