//! Operational error taxonomy for deployments.
//!
//! Validation rejections are not errors; they travel as a
//! [`ValidationReport`](crate::deploy::validator::ValidationReport).
//! Validator spawn and output failures are folded into the report as well,
//! and staging cleanup failures are only logged.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a deployment operation.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The staging directory could not be created or written.
    #[error("Staging failed at {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written during promotion.
    ///
    /// `rolled_back` is true when every already-written target was restored.
    #[error("Promotion failed at {path} (rolled back: {rolled_back}): {source}")]
    Promotion {
        path: PathBuf,
        rolled_back: bool,
        #[source]
        source: std::io::Error,
    },

    /// The live store could not be read.
    #[error("Failed to read {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An override file name was not a single plain path component.
    #[error("Invalid override file name: {0:?}")]
    InvalidOverrideName(String),

    /// An override file would land on a document path of the store.
    #[error("Override {0:?} would replace a live document")]
    OverrideShadowsDocument(String),

    /// The import task ended without producing an outcome.
    #[error("Import interrupted: {0}")]
    Interrupted(String),
}

impl DeployError {
    /// True for errors caused by the request rather than the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DeployError::InvalidOverrideName(_) | DeployError::OverrideShadowsDocument(_)
        )
    }
}

pub type DeployResult<T> = Result<T, DeployError>;
