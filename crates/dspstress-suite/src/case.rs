//! Serial test-case descriptors and execution

use crate::fixture::Fixture;
use crate::runner::{ExitOutcome, ProcessRunner};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Descriptor for one serial test case.
///
/// A case invokes one executable `repeats` times and fails on the first
/// non-zero exit or timeout. Repeat counts and timeouts are plan data, not
/// harness constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Human-readable case name.
    pub name: String,

    /// Executable to invoke.
    pub program: String,

    /// Arguments passed on every invocation.
    pub args: Vec<String>,

    /// How many consecutive passing invocations the case requires.
    pub repeats: u32,

    /// Per-invocation timeout in seconds.
    pub timeout_secs: u64,

    /// Index of a provisioned fixture appended as `-i <path>`, if the
    /// executable consumes an image.
    #[serde(default)]
    pub fixture: Option<usize>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            repeats: 1,
            timeout_secs: crate::runner::DEFAULT_TIMEOUT.as_secs(),
            fixture: None,
        }
    }

    /// Set the repeat count.
    pub fn repeats(mut self, repeats: u32) -> Self {
        self.repeats = repeats;
        self
    }

    /// Attach a provisioned fixture by index.
    pub fn with_fixture(mut self, index: usize) -> Self {
        self.fixture = Some(index);
        self
    }

    /// Full argument list with the fixture path resolved.
    pub fn resolved_args(&self, fixtures: &[Fixture]) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(index) = self.fixture {
            if let Some(fixture) = fixtures.get(index) {
                args.push("-i".to_string());
                args.push(fixture.path.display().to_string());
            }
        }
        args
    }
}

/// Outcome of a serial test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    /// Case name from the plan.
    pub name: String,

    /// Command line, for reproducing the failure by hand.
    pub command: String,

    /// Invocations actually issued (< repeats when the case failed early).
    pub runs: u32,

    /// Outcome of the last invocation.
    pub outcome: ExitOutcome,

    /// Spawn-level failure, if the executable never ran.
    pub error: Option<String>,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl CaseResult {
    /// Whether the case passed.
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.outcome.is_success()
    }
}

/// Run a case to completion, folding every failure into the result.
pub async fn run_case(runner: &ProcessRunner, case: &TestCase, fixtures: &[Fixture]) -> CaseResult {
    let start = Instant::now();
    let args = case.resolved_args(fixtures);
    let command = format!("{} {}", case.program, args.join(" "));
    info!(case = %case.name, repeats = case.repeats, "running case");

    let mut runs = 0;
    let mut outcome = ExitOutcome::Exited(0);
    let mut error = None;

    for _ in 0..case.repeats {
        runs += 1;
        match runner.run(&case.program, &args).await {
            Ok(o) if o.is_success() => continue,
            Ok(o) => {
                warn!(case = %case.name, run = runs, outcome = %o, "case invocation failed");
                outcome = o;
                break;
            }
            Err(e) => {
                warn!(case = %case.name, run = runs, error = %e, "case could not be executed");
                outcome = ExitOutcome::Exited(-1);
                error = Some(e.to_string());
                break;
            }
        }
    }

    CaseResult {
        name: case.name.clone(),
        command,
        runs,
        outcome,
        error,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_case_passes_after_all_repeats() {
        let runner = ProcessRunner::default();
        let case = TestCase::new("noop", "true", vec![]).repeats(3);

        let result = run_case(&runner, &case, &[]).await;
        assert!(result.passed());
        assert_eq!(result.runs, 3);
    }

    #[tokio::test]
    async fn test_case_stops_on_first_failing_repeat() {
        // Fails on the 3rd invocation; counter lives in a temp file.
        let dir = tempdir().unwrap();
        let counter = dir.path().join("count");
        let script = format!(
            "n=$(cat {c} 2>/dev/null || echo 0); n=$((n+1)); echo $n > {c}; [ $n -lt 3 ]",
            c = counter.display()
        );
        let runner = ProcessRunner::default();
        let case = TestCase::new("flaky", "sh", vec!["-c".to_string(), script]).repeats(10);

        let result = run_case(&runner, &case, &[]).await;
        assert!(!result.passed());
        assert_eq!(result.runs, 3, "no invocations after the first failure");
        assert_eq!(result.outcome, ExitOutcome::Exited(1));
        assert_eq!(std::fs::read_to_string(&counter).unwrap().trim(), "3");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_folded_into_the_result() {
        let runner = ProcessRunner::default();
        let case = TestCase::new("ghost", "dspstress-no-such-binary", vec![]).repeats(5);

        let result = run_case(&runner, &case, &[]).await;
        assert!(!result.passed());
        assert_eq!(result.runs, 1);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_timeout_is_reported_not_hung() {
        let runner = ProcessRunner::new(Duration::from_millis(200), false);
        let case = TestCase::new("hang", "sleep", vec!["30".to_string()]);

        let result = run_case(&runner, &case, &[]).await;
        assert!(!result.passed());
        assert_eq!(result.outcome, ExitOutcome::TimedOut);
    }

    #[test]
    fn test_fixture_index_resolves_to_image_args() {
        let fixtures = vec![
            Fixture::new("/tmp/image1.png", 1280, 720),
            Fixture::new("/tmp/image2.png", 1920, 1080),
        ];
        let case = TestCase::new("dma", "delcore30m-inversiontest", vec![]).with_fixture(1);

        assert_eq!(
            case.resolved_args(&fixtures),
            vec!["-i".to_string(), "/tmp/image2.png".to_string()]
        );
    }
}
