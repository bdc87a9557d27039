//! dspstress - delcore30m DSP stress-validation harness
//!
//! ## Commands
//!
//! - `run`: claim the device, execute the suite plan, restore the device,
//!   report pass/fail (nonzero exit on failure)
//! - `plan`: print the effective suite plan as JSON
//! - `host-check`: show the running kernel version and the legacy-unload
//!   gate decision without touching the device

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dspstress_host::{gate, DeviceConfig, HostControl, KernelVersion, SysfsHost};
use dspstress_suite::{StressSuite, SuitePlan, SuiteReport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "dspstress")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stress-validation harness for the delcore30m DSP", long_about = None)]
struct Cli {
    /// Enable verbose output (debug logs, executable output passthrough)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and reports
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stress suite against the device
    Run {
        /// Suite plan file (JSON); defaults to the built-in delcore30m plan
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Directory for generated fixture images
        #[arg(long)]
        fixture_dir: Option<PathBuf>,
    },

    /// Print the effective suite plan as JSON
    Plan {
        /// Suite plan file (JSON); defaults to the built-in delcore30m plan
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// Show the kernel version and the legacy-unload gate decision
    HostCheck,
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_plan(path: Option<&PathBuf>, fixture_dir: Option<PathBuf>) -> Result<SuitePlan> {
    let mut plan = match path {
        Some(path) => SuitePlan::from_file(path)
            .with_context(|| format!("failed to load plan from {}", path.display()))?,
        None => SuitePlan::default(),
    };
    if let Some(dir) = fixture_dir {
        plan.fixture_dir = dir;
    }
    Ok(plan)
}

fn print_report(report: &SuiteReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("run {} ({} ms)", report.run_id, report.duration_ms);
    for case in &report.cases {
        let status = if case.passed() { "PASS" } else { "FAIL" };
        println!("  [{status}] {} ({} runs): {}", case.name, case.runs, case.command);
    }
    for worker in &report.workers {
        let status = if worker.passed() { "PASS" } else { "FAIL" };
        println!(
            "  [{status}] core {} ({} cycles): {}",
            worker.core, worker.cycles_run, worker.outcome
        );
    }
    println!("{}", report.verdict.message);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);

    match cli.command {
        Commands::Run { plan, fixture_dir } => {
            let plan = load_plan(plan.as_ref(), fixture_dir)?;
            let host = Arc::new(SysfsHost::new());
            let suite = StressSuite::new(host, DeviceConfig::default(), plan).verbose(cli.verbose);

            let report = suite.run().await.context("suite aborted")?;
            print_report(&report, cli.json)?;

            if !report.verdict.passed {
                std::process::exit(1);
            }
        }

        Commands::Plan { plan } => {
            let plan = load_plan(plan.as_ref(), None)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }

        Commands::HostCheck => {
            let host = SysfsHost::new();
            let release = host.kernel_release().await?;
            let current = KernelVersion::parse(&release)?;
            let config = DeviceConfig::default();
            let threshold = KernelVersion::parse(&config.legacy_gate)?;
            let legacy = gate(&current, &threshold);
            println!("kernel release: {release}");
            println!("parsed version: {current}");
            println!(
                "legacy unload of '{}' required (< {}): {}",
                config.secondary_module, config.legacy_gate, legacy
            );
        }
    }

    Ok(())
}
