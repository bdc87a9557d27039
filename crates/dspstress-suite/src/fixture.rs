//! Synthetic image fixtures for the DMA stress executables
//!
//! Fixtures are generated once at suite start with an external image
//! generator, shared read-only by every case and worker, and removed once at
//! suite end. Generation failure aborts the suite; cleanup failure must not
//! mask a real test failure and is only logged.

use crate::error::SuiteError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// A deterministically generated test image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    /// Where the image lives for the duration of the suite.
    pub path: PathBuf,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

impl Fixture {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }
}

/// Generates and removes fixture images via an external generator.
#[derive(Debug, Clone)]
pub struct FixtureProvisioner {
    generator: String,
}

impl Default for FixtureProvisioner {
    fn default() -> Self {
        Self {
            generator: "ffmpeg".to_string(),
        }
    }
}

impl FixtureProvisioner {
    /// Use a different generator program (tests substitute a stand-in).
    pub fn new(generator: impl Into<String>) -> Self {
        Self {
            generator: generator.into(),
        }
    }

    /// Generate a single RGB test frame at the fixture's resolution,
    /// overwriting any existing file at its path.
    pub async fn provision(&self, fixture: &Fixture) -> Result<()> {
        let source = format!("testsrc=size={}x{}", fixture.width, fixture.height);
        let status = Command::new(&self.generator)
            .args(["-loglevel", "error", "-f", "lavfi", "-i", &source])
            .args(["-pix_fmt", "rgb24", "-frames", "1", "-y"])
            .arg(&fixture.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .await
            .map_err(|e| SuiteError::Fixture {
                path: fixture.path.clone(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(SuiteError::Fixture {
                path: fixture.path.clone(),
                reason: format!("generator exited with {status}"),
            });
        }

        debug!(path = %fixture.path.display(), width = fixture.width, height = fixture.height, "fixture generated");
        Ok(())
    }

    /// Best-effort removal of all fixtures. Never fails the suite.
    pub async fn cleanup(&self, fixtures: &[Fixture]) {
        for fixture in fixtures {
            if let Err(e) = tokio::fs::remove_file(&fixture.path).await {
                warn!(path = %fixture.path.display(), error = %e, "failed to remove fixture");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_provision_fails_when_generator_fails() {
        let provisioner = FixtureProvisioner::new("false");
        let fixture = Fixture::new("/tmp/dspstress-never-created.png", 64, 64);

        let err = provisioner.provision(&fixture).await.unwrap_err();
        assert!(matches!(err, SuiteError::Fixture { .. }));
    }

    #[tokio::test]
    async fn test_provision_fails_when_generator_is_missing() {
        let provisioner = FixtureProvisioner::new("dspstress-no-such-generator");
        let fixture = Fixture::new("/tmp/dspstress-never-created.png", 64, 64);

        let err = provisioner.provision(&fixture).await.unwrap_err();
        assert!(matches!(err, SuiteError::Fixture { .. }));
    }

    #[tokio::test]
    async fn test_cleanup_removes_files_and_tolerates_missing_ones() {
        let dir = tempdir().unwrap();
        let present = Fixture::new(dir.path().join("image1.png"), 64, 64);
        let missing = Fixture::new(dir.path().join("image2.png"), 64, 64);
        std::fs::write(&present.path, b"fake image").unwrap();

        let provisioner = FixtureProvisioner::default();
        provisioner.cleanup(&[present.clone(), missing]).await;

        assert!(!present.path.exists());
    }
}
