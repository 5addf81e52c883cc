//! The live, authoritative configuration location.
//!
//! # Layout
//! ```text
//! base_dir/
//!   <override files>
//!   config_dir/        (usually base_dir/config)
//!     core.yaml api.yaml data.yaml model.yaml
//! ```
//!
//! Promotion writes file by file. Each write is atomic (temp file + rename);
//! the first failure stops promotion and restores every file already written.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::schema::StoreConfig;
use crate::deploy::document::{ConfigBundle, DocumentName, EnvOverrides};
use crate::deploy::error::{DeployError, DeployResult};

/// Persistent directory holding the active configuration documents.
#[derive(Debug, Clone)]
pub struct LiveConfigStore {
    config_dir: PathBuf,
    base_dir: PathBuf,
}

/// What a successful promotion wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionSummary {
    pub documents: Vec<DocumentName>,
    pub overrides: Vec<String>,
}

struct Snapshot {
    path: PathBuf,
    previous: Option<Vec<u8>>,
}

impl LiveConfigStore {
    pub fn new(config_dir: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            base_dir: base_dir.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.config_dir.clone(), config.base_dir.clone())
    }

    /// Directory holding the recognized documents.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Directory receiving override files.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// True when documents and override files land in the same directory.
    pub fn shares_base(&self) -> bool {
        same_location(&self.config_dir, &self.base_dir)
    }

    /// Reject overrides that would overwrite a recognized document.
    ///
    /// Only possible when `config_dir` and `base_dir` are the same place.
    pub fn check_overrides(&self, env: &EnvOverrides) -> DeployResult<()> {
        if !self.shares_base() {
            return Ok(());
        }
        match env.iter().find(|(name, _)| DocumentName::parse(name).is_some()) {
            Some((name, _)) => Err(DeployError::OverrideShadowsDocument(name.to_string())),
            None => Ok(()),
        }
    }

    /// Resolve a caller-supplied directory against the base location.
    pub fn resolve(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base_dir.join(dir)
        }
    }

    /// Read every recognized document present on disk.
    ///
    /// Missing files mean "not configured" and are simply absent from the bundle.
    pub async fn read_all(&self) -> DeployResult<ConfigBundle> {
        let mut bundle = ConfigBundle::new();
        for name in DocumentName::ALL {
            let path = self.config_dir.join(name.file_name());
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => bundle.insert(name, content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(DeployError::Store { path, source }),
            }
        }
        Ok(bundle)
    }

    /// Write the bundle's documents and the override files into the store.
    pub async fn promote(&self, bundle: &ConfigBundle, env: &EnvOverrides) -> DeployResult<PromotionSummary> {
        self.check_overrides(env)?;

        let mut targets: Vec<(PathBuf, &str)> = Vec::with_capacity(bundle.len() + env.len());
        for (name, content) in bundle.iter() {
            targets.push((self.config_dir.join(name.file_name()), content));
        }
        for (name, content) in env.iter() {
            targets.push((self.base_dir.join(name), content));
        }

        let mut written: Vec<Snapshot> = Vec::with_capacity(targets.len());
        for (path, content) in targets {
            let previous = match read_previous(&path).await {
                Ok(previous) => previous,
                Err(source) => return Err(self.abort(written, path, source).await),
            };
            if let Err(source) = write_atomic(&path, content.as_bytes()).await {
                return Err(self.abort(written, path, source).await);
            }
            written.push(Snapshot { path, previous });
        }

        tracing::info!(
            config_dir = %self.config_dir.display(),
            documents = bundle.len(),
            overrides = env.len(),
            "Configuration promoted"
        );

        Ok(PromotionSummary {
            documents: bundle.iter().map(|(name, _)| name).collect(),
            overrides: env.iter().map(|(name, _)| name.to_string()).collect(),
        })
    }

    async fn abort(&self, written: Vec<Snapshot>, path: PathBuf, source: std::io::Error) -> DeployError {
        tracing::error!(path = %path.display(), error = %source, "Promotion failed, rolling back");
        let rolled_back = rollback(written).await;
        DeployError::Promotion {
            path,
            rolled_back,
            source,
        }
    }
}

/// Compare two directories after making them absolute against the working directory.
pub(crate) fn same_location(a: &Path, b: &Path) -> bool {
    match (std::path::absolute(a), std::path::absolute(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

async fn read_previous(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Restore snapshots in reverse write order. Returns true if all succeeded.
async fn rollback(written: Vec<Snapshot>) -> bool {
    let mut clean = true;
    for snapshot in written.into_iter().rev() {
        let result = match &snapshot.previous {
            Some(bytes) => write_atomic(&snapshot.path, bytes).await,
            None => tokio::fs::remove_file(&snapshot.path).await,
        };
        if let Err(e) = result {
            tracing::error!(path = %snapshot.path.display(), error = %e, "Rollback failed");
            clean = false;
        }
    }
    clean
}

/// Write via a sibling temp file and rename, so readers never see a torn file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent).await?;

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("config");
    let tmp = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(root: &Path) -> LiveConfigStore {
        LiveConfigStore::new(root.join("config"), root)
    }

    #[tokio::test]
    async fn test_read_all_on_missing_directory_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let store = store_in(root.path());
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_promote_creates_directory_and_writes() {
        let root = tempfile::tempdir().unwrap();
        let store = store_in(root.path());

        let mut bundle = ConfigBundle::new();
        bundle.insert(DocumentName::Core, "valid: true");
        let mut env = EnvOverrides::new();
        env.insert(".env", "API_KEY=abc").unwrap();

        let summary = store.promote(&bundle, &env).await.unwrap();
        assert_eq!(summary.documents, vec![DocumentName::Core]);
        assert_eq!(summary.overrides, vec![".env".to_string()]);

        let live = store.read_all().await.unwrap();
        assert_eq!(live.get(DocumentName::Core), Some("valid: true"));
        assert_eq!(
            std::fs::read_to_string(root.path().join(".env")).unwrap(),
            "API_KEY=abc"
        );
        assert!(!root.path().join("config").join(".env").exists());
    }

    #[tokio::test]
    async fn test_partial_bundle_leaves_other_documents() {
        let root = tempfile::tempdir().unwrap();
        let store = store_in(root.path());

        let mut first = ConfigBundle::new();
        first.insert(DocumentName::Core, "core: 1");
        first.insert(DocumentName::Api, "api: 1");
        store.promote(&first, &EnvOverrides::new()).await.unwrap();

        let mut second = ConfigBundle::new();
        second.insert(DocumentName::Api, "api: 2");
        store.promote(&second, &EnvOverrides::new()).await.unwrap();

        let live = store.read_all().await.unwrap();
        assert_eq!(live.get(DocumentName::Core), Some("core: 1"));
        assert_eq!(live.get(DocumentName::Api), Some("api: 2"));
    }

    #[tokio::test]
    async fn test_failed_promotion_rolls_back() {
        let root = tempfile::tempdir().unwrap();
        let store = store_in(root.path());

        let mut before = ConfigBundle::new();
        before.insert(DocumentName::Core, "core: old");
        store.promote(&before, &EnvOverrides::new()).await.unwrap();

        // A directory in place of an override file makes the rename fail
        std::fs::create_dir_all(root.path().join("blocked").join("child")).unwrap();

        let mut bundle = ConfigBundle::new();
        bundle.insert(DocumentName::Core, "core: new");
        bundle.insert(DocumentName::Model, "model: new");
        let mut env = EnvOverrides::new();
        env.insert("blocked", "X=1").unwrap();

        let err = store.promote(&bundle, &env).await.unwrap_err();
        match err {
            DeployError::Promotion { path, rolled_back, .. } => {
                assert!(path.ends_with("blocked"));
                assert!(rolled_back);
            }
            other => panic!("unexpected error: {other}"),
        }

        let live = store.read_all().await.unwrap();
        assert_eq!(live.get(DocumentName::Core), Some("core: old"));
        assert_eq!(live.get(DocumentName::Model), None);
    }

    #[tokio::test]
    async fn test_override_cannot_replace_document_in_shared_directory() {
        let root = tempfile::tempdir().unwrap();
        let store = LiveConfigStore::new(root.path(), root.path());
        assert!(store.shares_base());

        let mut bundle = ConfigBundle::new();
        bundle.insert(DocumentName::Core, "core: validated");
        let mut env = EnvOverrides::new();
        env.insert("core.yaml", "core: unvalidated").unwrap();

        let err = store.promote(&bundle, &env).await.unwrap_err();
        assert!(matches!(err, DeployError::OverrideShadowsDocument(ref name) if name == "core.yaml"));
        assert!(err.is_client_error());
        assert!(!root.path().join("core.yaml").exists());
    }

    #[tokio::test]
    async fn test_document_named_override_allowed_in_separate_base() {
        let root = tempfile::tempdir().unwrap();
        let store = store_in(root.path());
        assert!(!store.shares_base());

        let mut env = EnvOverrides::new();
        env.insert("core.yaml", "copy: true").unwrap();
        store.promote(&ConfigBundle::new(), &env).await.unwrap();

        assert!(root.path().join("core.yaml").exists());
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_same_location_ignores_trailing_components() {
        assert!(same_location(Path::new("/srv/app/"), Path::new("/srv/app/.")));
        assert!(!same_location(Path::new("/srv/app/config"), Path::new("/srv/app")));
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let store = LiveConfigStore::new("/srv/app/config", "/srv/app");
        assert_eq!(store.resolve(Path::new("candidate")), PathBuf::from("/srv/app/candidate"));
        assert_eq!(store.resolve(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
    }
}
