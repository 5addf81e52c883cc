//! Stage → validate → promote sequencing.
//!
//! # Import state machine
//! ```text
//! Idle → Staging → Validating → Rejected ──────────────┐
//!                             └→ Promoting → Promoted ─┴→ Cleaned
//! ```
//! `Cleaned` is reached from every state after `Idle`, including error
//! paths: the staging area is released explicitly on normal exits and by
//! `Drop` on early returns.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::deploy::document::{ConfigBundle, EnvOverrides};
use crate::deploy::error::{DeployError, DeployResult};
use crate::deploy::staging::StagingArea;
use crate::deploy::store::LiveConfigStore;
use crate::deploy::validator::{ValidationReport, Validator};
use crate::observability::metrics;

/// Result of an import that ran to a decision.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// True when the bundle was validated and promoted.
    pub accepted: bool,
    pub report: ValidationReport,
}

/// Coordinates staging, validation and promotion against one live store.
pub struct DeploymentOrchestrator {
    store: LiveConfigStore,
    validator: Arc<dyn Validator>,
    staging_root: Option<PathBuf>,
    /// Single-writer lease over the whole import sequence.
    write_lease: Mutex<()>,
}

impl DeploymentOrchestrator {
    pub fn new(store: LiveConfigStore, validator: Arc<dyn Validator>) -> Self {
        Self {
            store,
            validator,
            staging_root: None,
            write_lease: Mutex::new(()),
        }
    }

    /// Create staging directories under `root` instead of the system temp dir.
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }

    pub fn store(&self) -> &LiveConfigStore {
        &self.store
    }

    /// Validate a candidate bundle and, if accepted, make it live.
    ///
    /// Rejections are returned as `Ok` with `accepted: false`; errors are
    /// reserved for staging and promotion failures.
    ///
    /// The sequence runs on its own task: once started it completes (and
    /// rolls back a failed promotion) even if the caller's future is dropped.
    pub async fn import(self: &Arc<Self>, bundle: &ConfigBundle, env: &EnvOverrides) -> DeployResult<ImportOutcome> {
        let this = Arc::clone(self);
        let bundle = bundle.clone();
        let env = env.clone();

        let task = tokio::spawn(async move {
            let _lease = this.write_lease.lock().await;
            let start = Instant::now();

            let result = this.import_locked(&bundle, &env).await;

            let outcome = match &result {
                Ok(o) if o.accepted => "accepted",
                Ok(_) => "rejected",
                Err(_) => "failed",
            };
            metrics::record_import(outcome, start);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(DeployError::Interrupted(e.to_string())),
        }
    }

    async fn import_locked(&self, bundle: &ConfigBundle, env: &EnvOverrides) -> DeployResult<ImportOutcome> {
        self.store.check_overrides(env)?;

        let mut staging = StagingArea::acquire(self.staging_root.as_deref()).await?;
        staging.write_bundle(bundle).await?;

        tracing::info!(
            staging = %staging.path().display(),
            documents = bundle.len(),
            "Bundle staged, validating"
        );
        let report = self.validator.validate(staging.path()).await;

        if !report.is_valid {
            tracing::warn!(
                exit_code = ?report.exit_code,
                diagnostic = ?report.diagnostic,
                "Bundle rejected by validator"
            );
            staging.release();
            return Ok(ImportOutcome {
                accepted: false,
                report,
            });
        }

        self.store.promote(bundle, env).await?;
        staging.release();

        Ok(ImportOutcome {
            accepted: true,
            report,
        })
    }

    /// Validate what is currently live without proposing a change.
    pub async fn validate_live(&self) -> ValidationReport {
        self.validator.validate(self.store.config_dir()).await
    }

    /// Validate an arbitrary directory, relative paths resolving against the
    /// store's base location.
    pub async fn validate_dir(&self, dir: &Path) -> ValidationReport {
        let target = self.store.resolve(dir);
        self.validator.validate(&target).await
    }
}
