//! Shared utilities for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use config_deployer::{DeploymentOrchestrator, LiveConfigStore, ProcessValidator};

/// Validator script that approves everything.
#[allow(dead_code)]
pub const ALWAYS_VALID: &str = r#"echo '{"is_valid": true}'"#;

/// Validator script that rejects any staged document containing "broken".
#[allow(dead_code)]
pub const REJECT_BROKEN: &str = r#"
if grep -rq broken "$1" 2>/dev/null; then
  echo '{"is_valid": false, "errors": ["bad yaml"]}'
  exit 1
fi
echo '{"is_valid": true, "errors": []}'
"#;

/// A scratch deployment: live store, staging root and validator script.
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.path().join("config")
    }

    pub fn staging_root(&self) -> PathBuf {
        self.root.path().join("staging")
    }

    pub fn store(&self) -> LiveConfigStore {
        LiveConfigStore::new(self.config_dir(), self.root.path())
    }

    /// Write `body` as a shell script and return a validator running it.
    pub fn validator(&self, body: &str) -> ProcessValidator {
        let script = self.root.path().join("validate.sh");
        std::fs::write(&script, body).unwrap();
        ProcessValidator::new("sh", vec![script.display().to_string()], Duration::from_secs(10))
    }

    pub fn orchestrator(&self, validator: ProcessValidator) -> Arc<DeploymentOrchestrator> {
        Arc::new(
            DeploymentOrchestrator::new(self.store(), Arc::new(validator))
                .with_staging_root(self.staging_root()),
        )
    }

    /// Number of staging directories still present.
    pub fn leftover_staging(&self) -> usize {
        count_entries(&self.staging_root())
    }
}

fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
