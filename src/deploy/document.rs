//! Recognized configuration documents and the bundles that carry them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::deploy::error::DeployError;

/// One of the fixed set of documents the live store recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentName {
    /// Core service settings.
    #[serde(rename = "core.yaml")]
    Core,
    /// API settings.
    #[serde(rename = "api.yaml")]
    Api,
    /// Data source settings.
    #[serde(rename = "data.yaml")]
    Data,
    /// Model settings.
    #[serde(rename = "model.yaml")]
    Model,
}

impl DocumentName {
    /// Every recognized document, in store listing order.
    pub const ALL: [DocumentName; 4] = [
        DocumentName::Core,
        DocumentName::Api,
        DocumentName::Data,
        DocumentName::Model,
    ];

    /// File name of the document inside a config directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DocumentName::Core => "core.yaml",
            DocumentName::Api => "api.yaml",
            DocumentName::Data => "data.yaml",
            DocumentName::Model => "model.yaml",
        }
    }

    /// Look up a recognized document by file name.
    ///
    /// Returns `None` for anything outside the recognized set.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|doc| doc.file_name() == name)
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Candidate documents submitted as one deployment unit.
///
/// A bundle may be partial: names it does not carry are left untouched
/// in the live store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigBundle {
    documents: BTreeMap<DocumentName, String>,
}

impl ConfigBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bundle from caller-supplied entries.
    ///
    /// Unrecognized names are dropped, as are entries with no content.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut bundle = Self::new();
        for (name, content) in entries {
            let Some(doc) = DocumentName::parse(&name) else {
                tracing::debug!(name = %name, "Ignoring unrecognized config document");
                continue;
            };
            match content {
                Some(content) => bundle.insert(doc, content),
                None => tracing::debug!(document = %doc, "Document not supplied, skipping"),
            }
        }
        bundle
    }

    /// Insert or replace a document's content.
    pub fn insert(&mut self, name: DocumentName, content: impl Into<String>) {
        self.documents.insert(name, content.into());
    }

    pub fn get(&self, name: DocumentName) -> Option<&str> {
        self.documents.get(&name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocumentName, &str)> {
        self.documents.iter().map(|(name, content)| (*name, content.as_str()))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Override files written next to the live store, outside validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvOverrides {
    files: BTreeMap<String, String>,
}

impl EnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build overrides from caller-supplied entries, rejecting unsafe names.
    pub fn from_entries<I>(entries: I) -> Result<Self, DeployError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut overrides = Self::new();
        for (name, content) in entries {
            overrides.insert(name, content)?;
        }
        Ok(overrides)
    }

    /// Add an override file.
    ///
    /// The name must be a single plain path component.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) -> Result<(), DeployError> {
        let name = name.into();
        if !is_plain_file_name(&name) {
            return Err(DeployError::InvalidOverrideName(name));
        }
        self.files.insert(name, content.into());
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(name, content)| (name.as_str(), content.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognized_names() {
        assert_eq!(DocumentName::parse("core.yaml"), Some(DocumentName::Core));
        assert_eq!(DocumentName::parse("model.yaml"), Some(DocumentName::Model));
        assert_eq!(DocumentName::parse("secrets.yaml"), None);
        assert_eq!(DocumentName::parse("CORE.yaml"), None);
    }

    #[test]
    fn test_bundle_drops_unknown_and_absent_entries() {
        let bundle = ConfigBundle::from_entries(vec![
            ("core.yaml".to_string(), Some("valid: true".to_string())),
            ("api.yaml".to_string(), None),
            ("extra.yaml".to_string(), Some("ignored".to_string())),
        ]);

        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.get(DocumentName::Core), Some("valid: true"));
        assert_eq!(bundle.get(DocumentName::Api), None);
    }

    #[test]
    fn test_bundle_serializes_by_file_name() {
        let mut bundle = ConfigBundle::new();
        bundle.insert(DocumentName::Data, "source: s3");
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json, serde_json::json!({ "data.yaml": "source: s3" }));
    }

    #[test]
    fn test_override_names_must_be_plain() {
        let mut env = EnvOverrides::new();
        assert!(env.insert(".env", "A=1").is_ok());
        assert!(env.insert("../.env", "A=1").is_err());
        assert!(env.insert("nested/.env", "A=1").is_err());
        assert!(env.insert("..", "A=1").is_err());
        assert!(env.insert("", "A=1").is_err());
        assert_eq!(env.len(), 1);
    }
}
