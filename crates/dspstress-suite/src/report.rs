//! Suite-level result aggregation

use crate::case::CaseResult;
use crate::stress::WorkerResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated pass/fail verdict for a full suite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteVerdict {
    /// Whether every case and every worker passed.
    pub passed: bool,

    /// One entry per failure, with enough detail to reproduce it by hand
    /// (empty if passed).
    pub violations: Vec<String>,

    /// Summary message citing the first failure and the count of the rest.
    pub message: String,
}

impl SuiteVerdict {
    /// Evaluate all collected results. The suite waits for every result
    /// before calling this; there is no early exit on first failure.
    pub fn evaluate(cases: &[CaseResult], workers: &[WorkerResult]) -> Self {
        let mut violations = Vec::new();

        for case in cases {
            if !case.passed() {
                let detail = match &case.error {
                    Some(error) => error.clone(),
                    None => format!("{} on run {}", case.outcome, case.runs),
                };
                violations.push(format!("case '{}' ({}): {}", case.name, case.command, detail));
            }
        }

        for worker in workers {
            if !worker.passed() {
                let detail = match &worker.error {
                    Some(error) => error.clone(),
                    None => worker.outcome.to_string(),
                };
                violations.push(format!(
                    "core {}: {} on cycle {}",
                    worker.core, detail, worker.cycles_run
                ));
            }
        }

        let passed = violations.is_empty();
        let message = if passed {
            "all cases passed".to_string()
        } else {
            format!(
                "first failure: {}; {} other failure(s)",
                violations[0],
                violations.len() - 1
            )
        };

        SuiteVerdict {
            passed,
            violations,
            message,
        }
    }
}

/// Full record of one suite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Unique identifier for this run.
    pub run_id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// Serial case results, in plan order.
    pub cases: Vec<CaseResult>,

    /// Stress worker results from all concurrent phases.
    pub workers: Vec<WorkerResult>,

    /// Aggregated verdict.
    pub verdict: SuiteVerdict,
}

impl SuiteReport {
    /// Number of serial cases that passed.
    pub fn passed_cases(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    /// Number of serial cases that failed.
    pub fn failed_cases(&self) -> usize {
        self.cases.iter().filter(|c| !c.passed()).count()
    }
}
