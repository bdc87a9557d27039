//! Declarative suite plans
//!
//! A plan describes everything a run executes: which fixtures to generate,
//! which serial cases to drive, and how hard to stress each core in the
//! concurrent phases. The default plan reproduces the established delcore30m
//! validation workload; every count, ratio, and timeout can be overridden by
//! loading a plan from JSON.

use crate::case::TestCase;
use crate::fixture::Fixture;
use crate::runner::DEFAULT_TIMEOUT;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Resolution of a fixture image to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSpec {
    pub width: u32,
    pub height: u32,
}

/// One concurrent stress phase.
///
/// Worker `i` drives `program base_args... <fixture i>` for `cycles[i]`
/// iterations. Differing cycle budgets model differing per-core stress
/// intensity and are plan data, never harness constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressPhase {
    /// Phase name for reporting.
    pub name: String,

    /// Stress executable.
    pub program: String,

    /// Arguments preceding the per-worker fixture path.
    pub base_args: Vec<String>,

    /// Per-invocation timeout in seconds.
    pub timeout_secs: u64,

    /// Cycle budget per worker; entry `i` is core `i` on fixture `i`.
    pub cycles: Vec<u32>,
}

/// Full description of a validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuitePlan {
    /// Directory the fixture images are generated in.
    pub fixture_dir: PathBuf,

    /// Image generator program.
    pub generator: String,

    /// Fixtures to provision, smallest index first.
    pub fixtures: Vec<FixtureSpec>,

    /// Serial cases, run in order.
    pub serial: Vec<TestCase>,

    /// Concurrent stress phases, run after the serial cases.
    pub stress: Vec<StressPhase>,
}

impl Default for SuitePlan {
    /// The established delcore30m workload: parallel compute on one and two
    /// cores, serial DMA inversion, asymmetric two-core DMA stress, and a
    /// fibonacci smoke case.
    fn default() -> Self {
        let timeout = DEFAULT_TIMEOUT.as_secs();
        SuitePlan {
            fixture_dir: PathBuf::from("/tmp"),
            generator: "ffmpeg".to_string(),
            fixtures: vec![
                FixtureSpec { width: 1280, height: 720 },
                FixtureSpec { width: 1920, height: 1080 },
            ],
            serial: vec![
                TestCase::new(
                    "paralleltest-1core",
                    "delcore30m-paralleltest",
                    vec!["15".to_string(), "1".to_string()],
                )
                .repeats(100),
                TestCase::new(
                    "paralleltest-2cores",
                    "delcore30m-paralleltest",
                    vec!["15".to_string(), "2".to_string()],
                )
                .repeats(100),
                TestCase::new("dma-1core", "delcore30m-inversiontest", vec![])
                    .repeats(100)
                    .with_fixture(1),
                TestCase::new(
                    "fibonacci",
                    "delcore30m-fibonacci",
                    vec!["-i".to_string(), "10".to_string(), "-v".to_string()],
                ),
            ],
            stress: vec![StressPhase {
                name: "dma-2core-async".to_string(),
                program: "delcore30m-inversiontest".to_string(),
                base_args: vec!["-i".to_string()],
                timeout_secs: timeout,
                cycles: vec![700, 100],
            }],
        }
    }
}

impl SuitePlan {
    /// Load a plan from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let plan = serde_json::from_str(&content)?;
        Ok(plan)
    }

    /// Concrete fixture list, numbered `image1.png`, `image2.png`, ...
    pub fn fixtures(&self) -> Vec<Fixture> {
        self.fixtures
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                Fixture::new(
                    self.fixture_dir.join(format!("image{}.png", i + 1)),
                    spec.width,
                    spec.height,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_plan_matches_established_workload() {
        let plan = SuitePlan::default();
        assert_eq!(plan.fixtures.len(), 2);
        assert_eq!(plan.serial.len(), 4);
        assert_eq!(plan.stress.len(), 1);
        assert_eq!(plan.stress[0].cycles, vec![700, 100]);

        let dma = plan.serial.iter().find(|c| c.name == "dma-1core").unwrap();
        assert_eq!(dma.repeats, 100);
        assert_eq!(dma.fixture, Some(1), "serial DMA uses the larger image");
    }

    #[test]
    fn test_fixture_paths_are_numbered_in_the_plan_dir() {
        let plan = SuitePlan::default();
        let fixtures = plan.fixtures();
        assert_eq!(fixtures[0].path, PathBuf::from("/tmp/image1.png"));
        assert_eq!(fixtures[0].width, 1280);
        assert_eq!(fixtures[1].path, PathBuf::from("/tmp/image2.png"));
        assert_eq!(fixtures[1].height, 1080);
    }

    #[test]
    fn test_plan_loads_from_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");
        let json = serde_json::to_string_pretty(&SuitePlan::default()).unwrap();
        std::fs::write(&path, json).unwrap();

        let plan = SuitePlan::from_file(&path).unwrap();
        assert_eq!(plan.stress[0].name, "dma-2core-async");
    }

    #[test]
    fn test_malformed_plan_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(SuitePlan::from_file(&path).is_err());
    }
}
