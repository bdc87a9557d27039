//! Top-level suite sequencing
//!
//! Control flow for one run: claim the device, provision fixtures, drive the
//! serial cases and then the concurrent stress phases, clean up fixtures,
//! release the device, aggregate. The device is released on every exit path
//! once setup has been attempted; mid-run failures travel as values so no
//! path skips teardown.

use crate::case::{run_case, CaseResult};
use crate::fixture::{Fixture, FixtureProvisioner};
use crate::plan::SuitePlan;
use crate::report::{SuiteReport, SuiteVerdict};
use crate::runner::ProcessRunner;
use crate::stress::{StressOrchestrator, WorkerResult, WorkerTask};
use crate::Result;
use dspstress_host::{DeviceConfig, DeviceLifecycle, HostControl};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

/// A configured stress suite, ready to run.
pub struct StressSuite {
    host: Arc<dyn HostControl>,
    device: DeviceConfig,
    plan: SuitePlan,
    verbose: bool,
}

impl StressSuite {
    pub fn new(host: Arc<dyn HostControl>, device: DeviceConfig, plan: SuitePlan) -> Self {
        Self {
            host,
            device,
            plan,
            verbose: false,
        }
    }

    /// Pass executable output through to the caller's streams.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Execute the full suite and return its report.
    ///
    /// The device binding is restored before this returns, whatever happened
    /// in between. A teardown failure is fatal and takes precedence over the
    /// verdict, because it means the host was left inconsistent.
    pub async fn run(&self) -> Result<SuiteReport> {
        let start = Instant::now();
        let started_at = chrono::Utc::now();
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, "starting stress suite");

        let mut lifecycle = DeviceLifecycle::new(self.host.clone(), self.device.clone());
        if let Err(setup_err) = lifecycle.setup().await {
            // Undo whatever setup managed to do before reporting its error.
            if let Err(teardown_err) = lifecycle.teardown().await {
                error!(error = %teardown_err, "teardown after failed setup also failed; host may be inconsistent");
            }
            return Err(setup_err.into());
        }

        let phases = self.run_phases().await;
        let teardown = lifecycle.teardown().await;
        if let Err(e) = &teardown {
            error!(error = %e, "device teardown failed; host may be inconsistent");
        }

        let (cases, workers) = phases?;
        teardown?;

        let verdict = SuiteVerdict::evaluate(&cases, &workers);
        if verdict.passed {
            info!(run_id = %run_id, cases = cases.len(), workers = workers.len(), "suite passed");
        } else {
            info!(run_id = %run_id, message = %verdict.message, "suite failed");
        }

        Ok(SuiteReport {
            run_id,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            cases,
            workers,
            verdict,
        })
    }

    /// Provision fixtures, run everything, clean fixtures up again.
    async fn run_phases(&self) -> Result<(Vec<CaseResult>, Vec<WorkerResult>)> {
        let provisioner = FixtureProvisioner::new(self.plan.generator.clone());
        let fixtures = self.plan.fixtures();
        for fixture in &fixtures {
            provisioner.provision(fixture).await?;
        }

        let outcome = self.run_cases(&fixtures).await;
        provisioner.cleanup(&fixtures).await;
        outcome
    }

    async fn run_cases(&self, fixtures: &[Fixture]) -> Result<(Vec<CaseResult>, Vec<WorkerResult>)> {
        let mut cases = Vec::with_capacity(self.plan.serial.len());
        for case in &self.plan.serial {
            let runner = ProcessRunner::new(Duration::from_secs(case.timeout_secs), self.verbose);
            let result = run_case(&runner, case, fixtures).await;
            info!(case = %result.name, passed = result.passed(), runs = result.runs, "case finished");
            cases.push(result);
        }

        let mut workers = Vec::new();
        if !self.plan.stress.is_empty() && fixtures.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "stress phases require at least one fixture in the plan",
            )
            .into());
        }
        for phase in &self.plan.stress {
            info!(phase = %phase.name, cores = phase.cycles.len(), "starting stress phase");
            let runner = ProcessRunner::new(Duration::from_secs(phase.timeout_secs), self.verbose);
            let orchestrator =
                StressOrchestrator::new(runner, phase.program.clone(), phase.base_args.clone());

            let tasks: Vec<WorkerTask> = phase
                .cycles
                .iter()
                .enumerate()
                .map(|(core, &cycles)| WorkerTask {
                    core,
                    // Worker i reuses fixture i; extra workers wrap around.
                    fixture: Arc::new(fixtures[core % fixtures.len()].clone()),
                    cycles,
                })
                .collect();

            let mut results = orchestrator.run(tasks).await?;
            info!(phase = %phase.name, results = results.len(), "stress phase joined");
            workers.append(&mut results);
        }

        Ok((cases, workers))
    }
}
