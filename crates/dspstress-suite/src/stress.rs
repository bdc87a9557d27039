//! Concurrent multi-core stress orchestration
//!
//! One tokio task per core drives the stress executable in a loop against a
//! dedicated fixture. Workers are fully independent: a failing worker stops
//! its own loop and reports, but never cancels or blocks a sibling. The
//! orchestrator joins every worker before returning, so callers always get
//! exactly one result per dispatched task, in completion-independent order.

use crate::error::SuiteError;
use crate::fixture::Fixture;
use crate::runner::{ExitOutcome, ProcessRunner};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One concurrent worker's assignment.
#[derive(Debug, Clone)]
pub struct WorkerTask {
    /// Index of the DSP core this worker models load for.
    pub core: usize,

    /// Image the worker's invocations read (shared, never written).
    pub fixture: Arc<Fixture>,

    /// Maximum invocations before the worker reports success.
    pub cycles: u32,
}

/// Exactly one of these is produced per dispatched [`WorkerTask`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    /// Core index from the task.
    pub core: usize,

    /// Invocations actually issued (== cycles on success).
    pub cycles_run: u32,

    /// Final outcome: `Exited(0)` after a full budget, otherwise the first
    /// failing invocation's outcome.
    pub outcome: ExitOutcome,

    /// Spawn-level failure, if an invocation never ran.
    pub error: Option<String>,
}

impl WorkerResult {
    /// Whether this worker exhausted its budget without a failure.
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.outcome.is_success()
    }
}

/// Fans per-core workloads out onto concurrent workers and joins them all.
#[derive(Debug, Clone)]
pub struct StressOrchestrator {
    runner: ProcessRunner,
    program: String,
    base_args: Vec<String>,
}

impl StressOrchestrator {
    /// Orchestrator for one stress program. Each worker invokes
    /// `program base_args... <fixture path>`.
    pub fn new(runner: ProcessRunner, program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            base_args,
        }
    }

    /// Run every task to completion and collect one result per task.
    ///
    /// The call returns only after the slowest worker has finished; there is
    /// no early exit at this level even when a worker fails immediately. A
    /// worker that cannot report (task panic) violates the
    /// one-result-per-task invariant and surfaces as [`SuiteError::WorkerLost`].
    pub async fn run(&self, tasks: Vec<WorkerTask>) -> Result<Vec<WorkerResult>> {
        let mut handles: Vec<(usize, JoinHandle<WorkerResult>)> = Vec::with_capacity(tasks.len());

        for task in tasks {
            let runner = self.runner.clone();
            let program = self.program.clone();
            let base_args = self.base_args.clone();
            let core = task.core;
            handles.push((
                core,
                tokio::spawn(async move { drive_worker(runner, program, base_args, task).await }),
            ));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (core, handle) in handles {
            let result = handle
                .await
                .map_err(|source| SuiteError::WorkerLost { core, source })?;
            results.push(result);
        }

        Ok(results)
    }
}

async fn drive_worker(
    runner: ProcessRunner,
    program: String,
    base_args: Vec<String>,
    task: WorkerTask,
) -> WorkerResult {
    debug!(core = task.core, cycles = task.cycles, fixture = %task.fixture.path.display(), "worker started");

    let mut args = base_args;
    args.push(task.fixture.path.display().to_string());

    for cycle in 1..=task.cycles {
        match runner.run(&program, &args).await {
            Ok(outcome) if outcome.is_success() => {}
            Ok(outcome) => {
                warn!(core = task.core, cycle, outcome = %outcome, "worker invocation failed");
                return WorkerResult {
                    core: task.core,
                    cycles_run: cycle,
                    outcome,
                    error: None,
                };
            }
            Err(e) => {
                warn!(core = task.core, cycle, error = %e, "worker could not execute program");
                return WorkerResult {
                    core: task.core,
                    cycles_run: cycle,
                    outcome: ExitOutcome::Exited(-1),
                    error: Some(e.to_string()),
                };
            }
        }
    }

    debug!(core = task.core, "worker exhausted its cycle budget");
    WorkerResult {
        core: task.core,
        cycles_run: task.cycles,
        outcome: ExitOutcome::Exited(0),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture(path: impl Into<std::path::PathBuf>) -> Arc<Fixture> {
        Arc::new(Fixture::new(path, 64, 64))
    }

    /// Stand-in stress program: sh reads the fixture path as `$1`.
    fn orchestrator(script: &str) -> StressOrchestrator {
        StressOrchestrator::new(
            ProcessRunner::default(),
            "sh",
            vec!["-c".to_string(), script.to_string(), "worker".to_string()],
        )
    }

    #[tokio::test]
    async fn test_one_result_per_task_all_passing() {
        let orch = orchestrator("exit 0");
        let tasks = vec![
            WorkerTask { core: 0, fixture: fixture("/tmp/image1.png"), cycles: 7 },
            WorkerTask { core: 1, fixture: fixture("/tmp/image2.png"), cycles: 3 },
        ];

        let results = orch.run(tasks).await.unwrap();
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.passed());
        }
        let heavy = results.iter().find(|r| r.core == 0).unwrap();
        assert_eq!(heavy.cycles_run, 7, "asymmetric budgets must be honored");
    }

    #[tokio::test]
    async fn test_worker_stops_on_first_failure_and_reports_its_code() {
        // Fails with code 2 on the 5th invocation; counter keyed by fixture.
        let dir = tempdir().unwrap();
        let image = dir.path().join("image1.png");
        let script =
            "n=$(cat \"$1.cnt\" 2>/dev/null || echo 0); n=$((n+1)); echo $n > \"$1.cnt\"; [ $n -lt 5 ] || exit 2";
        let orch = orchestrator(script);

        let results = orch
            .run(vec![WorkerTask { core: 0, fixture: fixture(&image), cycles: 100 }])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].cycles_run, 5);
        assert_eq!(results[0].outcome, ExitOutcome::Exited(2));
        let issued = std::fs::read_to_string(image.with_extension("png.cnt")).unwrap();
        assert_eq!(issued.trim(), "5", "no invocations after the failure");
    }

    #[tokio::test]
    async fn test_failing_worker_never_cancels_its_sibling() {
        // Worker on the "bad" fixture fails on cycle 3; the other runs its
        // full budget and still reports success.
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("bad.png");
        let script = "n=$(cat \"$1.cnt\" 2>/dev/null || echo 0); n=$((n+1)); echo $n > \"$1.cnt\"; \
                      case \"$1\" in *bad*) [ $n -lt 3 ] || exit 2 ;; esac";
        let orch = orchestrator(script);

        let results = orch
            .run(vec![
                WorkerTask { core: 0, fixture: fixture(&good), cycles: 7 },
                WorkerTask { core: 1, fixture: fixture(&bad), cycles: 100 },
            ])
            .await
            .unwrap();

        assert_eq!(results.len(), 2, "a failing worker still reports");
        let survivor = results.iter().find(|r| r.core == 0).unwrap();
        assert!(survivor.passed());
        assert_eq!(survivor.cycles_run, 7);
        let failed = results.iter().find(|r| r.core == 1).unwrap();
        assert_eq!(failed.outcome, ExitOutcome::Exited(2));
        assert_eq!(failed.cycles_run, 3);
    }

    #[tokio::test]
    async fn test_spawn_failure_becomes_a_result_not_a_missing_worker() {
        let orch = StressOrchestrator::new(
            ProcessRunner::default(),
            "dspstress-no-such-binary",
            vec![],
        );

        let results = orch
            .run(vec![WorkerTask { core: 2, fixture: fixture("/tmp/image.png"), cycles: 10 }])
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].passed());
        assert!(results[0].error.is_some());
        assert_eq!(results[0].cycles_run, 1);
    }
}
