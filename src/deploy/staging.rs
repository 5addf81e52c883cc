//! Ephemeral staging directories for candidate bundles.
//!
//! # Lifecycle
//! ```text
//! acquire() → write()* → release()
//!                  └──── (early return / panic) → Drop removes the directory
//! ```
//!
//! Each import gets its own directory with a random suffix, created
//! exclusively, so concurrent imports never share staging state.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::deploy::document::{ConfigBundle, DocumentName};
use crate::deploy::error::{DeployError, DeployResult};

const STAGING_PREFIX: &str = "config-staging-";

/// Scoped handle on a temporary directory holding one candidate bundle.
#[derive(Debug)]
pub struct StagingArea {
    dir: Option<TempDir>,
    path: PathBuf,
    written: Vec<PathBuf>,
}

impl StagingArea {
    /// Create a fresh staging directory.
    ///
    /// With `root` set the directory is created inside it, otherwise in the
    /// system temp directory. Directory creation runs on the blocking pool.
    pub async fn acquire(root: Option<&Path>) -> DeployResult<Self> {
        let root = root.map(Path::to_path_buf);
        let error_path = root.clone().unwrap_or_else(std::env::temp_dir);

        let result = tokio::task::spawn_blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix(STAGING_PREFIX);
            match root {
                Some(root) => std::fs::create_dir_all(&root).and_then(|_| builder.tempdir_in(&root)),
                None => builder.tempdir(),
            }
        })
        .await
        .unwrap_or_else(|e| Err(std::io::Error::other(e)));

        let dir = result.map_err(|source| DeployError::Staging {
            path: error_path,
            source,
        })?;
        let path = dir.path().to_path_buf();

        tracing::debug!(path = %path.display(), "Staging area acquired");
        Ok(Self {
            dir: Some(dir),
            path,
            written: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one document into the staging directory, replacing prior content.
    pub async fn write(&mut self, name: DocumentName, content: &str) -> DeployResult<()> {
        let target = self.path.join(name.file_name());
        tokio::fs::write(&target, content)
            .await
            .map_err(|source| DeployError::Staging {
                path: target.clone(),
                source,
            })?;

        if !self.written.contains(&target) {
            self.written.push(target);
        }
        Ok(())
    }

    /// Stage every document in the bundle.
    pub async fn write_bundle(&mut self, bundle: &ConfigBundle) -> DeployResult<()> {
        for (name, content) in bundle.iter() {
            self.write(name, content).await?;
        }
        Ok(())
    }

    /// Remove staged files and the directory itself.
    ///
    /// Failures are logged and swallowed so they never mask the outcome of
    /// the operation that used the staging area.
    pub fn release(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        for file in self.written.drain(..) {
            if let Err(e) = std::fs::remove_file(&file) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %file.display(), error = %e, "Failed to remove staged file");
                }
            }
        }

        match dir.close() {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Staging area released"),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staging directory")
            }
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_release_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::acquire(Some(root.path())).await.unwrap();
        staging.write(DocumentName::Core, "valid: true").await.unwrap();

        let path = staging.path().to_path_buf();
        assert_eq!(
            std::fs::read_to_string(path.join("core.yaml")).unwrap(),
            "valid: true"
        );

        staging.release();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let mut staging = StagingArea::acquire(Some(root.path())).await.unwrap();
            staging.write(DocumentName::Api, "port: 80").await.unwrap();
            staging.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_write_overwrites_prior_content() {
        let mut staging = StagingArea::acquire(None).await.unwrap();
        staging.write(DocumentName::Model, "a").await.unwrap();
        staging.write(DocumentName::Model, "b").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(staging.path().join("model.yaml")).unwrap(),
            "b"
        );
        staging.release();
    }

    #[tokio::test]
    async fn test_concurrent_acquires_get_distinct_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = StagingArea::acquire(Some(root.path())).await.unwrap();
        let b = StagingArea::acquire(Some(root.path())).await.unwrap();
        assert_ne!(a.path(), b.path());
        a.release();
        b.release();
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_release_tolerates_externally_removed_directory() {
        let staging = StagingArea::acquire(None).await.unwrap();
        std::fs::remove_dir_all(staging.path()).unwrap();
        staging.release();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_acquire_creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");

        let staging = StagingArea::acquire(Some(&nested)).await.unwrap();

        assert!(staging.path().starts_with(&nested));
        staging.release();
    }
}
