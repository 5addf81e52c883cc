//! Live store watcher: re-validates the live configuration when it changes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use arc_swap::ArcSwapOption;
use notify::{Watcher, RecursiveMode, Event, RecommendedWatcher, Config};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use crate::deploy::{DeploymentOrchestrator, ValidationReport};

/// Bursts of file events within this window trigger one validation.
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Most recent verdict on the live store.
#[derive(Debug, Clone, Serialize)]
pub struct LiveValidation {
    /// Seconds since the Unix epoch when the check finished.
    pub checked_at: u64,
    pub report: ValidationReport,
}

/// Shared slot holding the latest live validation, if any ran yet.
pub type LiveStatus = Arc<ArcSwapOption<LiveValidation>>;

/// Watches the live config directory and publishes fresh validation reports.
///
/// Read-only with respect to the store.
pub struct LiveStoreWatcher {
    orchestrator: Arc<DeploymentOrchestrator>,
    status: LiveStatus,
    poll_interval: Duration,
}

impl LiveStoreWatcher {
    pub fn new(orchestrator: Arc<DeploymentOrchestrator>, status: LiveStatus, poll_interval: Duration) -> Self {
        Self {
            orchestrator,
            status,
            poll_interval,
        }
    }

    /// Start watching.
    ///
    /// The returned watcher must be kept alive for events to keep flowing;
    /// the task exits when `shutdown` fires.
    pub fn spawn(
        self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(RecommendedWatcher, JoinHandle<()>), notify::Error> {
        let dir: PathBuf = self.orchestrator.store().config_dir().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(notify::Error::io)?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            }
        }, Config::default().with_poll_interval(self.poll_interval))?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?dir, "Live store watcher started");

        let handle = tokio::spawn(async move {
            self.refresh().await;
            loop {
                tokio::select! {
                    Some(()) = rx.recv() => {
                        tokio::time::sleep(DEBOUNCE).await;
                        while rx.try_recv().is_ok() {}
                        tracing::info!("Live config change detected, re-validating...");
                        self.refresh().await;
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Live store watcher received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        });

        Ok((watcher, handle))
    }

    /// Validate the live store now and publish the result.
    pub async fn refresh(&self) -> Arc<LiveValidation> {
        let report = self.orchestrator.validate_live().await;
        if !report.is_valid {
            tracing::warn!(diagnostic = ?report.diagnostic, "Live configuration failed validation");
        }

        let checked_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let snapshot = Arc::new(LiveValidation { checked_at, report });
        self.status.store(Some(snapshot.clone()));
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{LiveConfigStore, Validator};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingValidator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Validator for CountingValidator {
        async fn validate(&self, dir: &Path) -> ValidationReport {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let valid = !dir.join("core.yaml").exists()
                || std::fs::read_to_string(dir.join("core.yaml")).unwrap_or_default() != "broken";
            ValidationReport::from_output(Some(0), &format!("{{\"is_valid\": {}}}", valid), String::new())
        }
    }

    #[tokio::test]
    async fn test_watcher_revalidates_on_change() {
        let root = tempfile::tempdir().unwrap();
        let validator = Arc::new(CountingValidator::default());
        let store = LiveConfigStore::new(root.path().join("config"), root.path());
        let orchestrator = Arc::new(DeploymentOrchestrator::new(store, validator.clone()));
        let status: LiveStatus = Arc::new(ArcSwapOption::empty());

        let (tx, _) = broadcast::channel(1);
        let watcher = LiveStoreWatcher::new(orchestrator, status.clone(), Duration::from_millis(100));
        let (_watcher, handle) = watcher.spawn(tx.subscribe()).unwrap();

        // Initial validation happens without any change
        for _ in 0..50 {
            if status.load_full().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(status.load_full().unwrap().report.is_valid);

        std::fs::write(root.path().join("config").join("core.yaml"), "broken").unwrap();
        for _ in 0..100 {
            if status.load_full().is_some_and(|s| !s.report.is_valid) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!status.load_full().unwrap().report.is_valid);
        assert!(validator.calls.load(Ordering::SeqCst) >= 2);

        // Watching never changes what is live
        assert_eq!(
            std::fs::read_to_string(root.path().join("config").join("core.yaml")).unwrap(),
            "broken"
        );

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
