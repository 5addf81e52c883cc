//! External validation authority.
//!
//! # Protocol
//! ```text
//! <program> [args..] <absolute dir>
//!     stdout → single JSON object with a boolean `is_valid`
//!     stderr → captured for diagnostics
//!     exit code → surfaced, never decides validity
//! ```
//!
//! Every failure mode (spawn error, timeout, unparseable output) resolves to
//! an invalid [`ValidationReport`] rather than an error.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::config::schema::ValidatorConfig;
use crate::observability::metrics;

/// Parsed verdict of one validator run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Overall validity flag. Promotion happens only when this is true.
    pub is_valid: bool,

    /// Exit code of the validator process, if it exited normally.
    pub exit_code: Option<i32>,

    /// Parsed payload, `null` when the output could not be parsed.
    pub result: Value,

    /// Captured standard error.
    pub stderr: String,

    /// Raw standard output, kept only when it failed to parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,

    /// Explanation for reports that did not come from a valid payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ValidationReport {
    /// Build a report from the validator's captured output.
    pub fn from_output(exit_code: Option<i32>, stdout: &str, stderr: String) -> Self {
        let trimmed = stdout.trim();
        let parsed = match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => value,
            Err(e) => {
                return Self {
                    is_valid: false,
                    exit_code,
                    result: Value::Null,
                    stderr,
                    raw_output: Some(stdout.to_string()),
                    diagnostic: Some(format!("Validator output is not valid JSON: {}", e)),
                };
            }
        };

        match parsed.get("is_valid").and_then(Value::as_bool) {
            Some(is_valid) => Self {
                is_valid,
                exit_code,
                result: parsed,
                stderr,
                raw_output: None,
                diagnostic: None,
            },
            None => Self {
                is_valid: false,
                exit_code,
                result: parsed,
                stderr,
                raw_output: Some(stdout.to_string()),
                diagnostic: Some("Validator payload has no boolean `is_valid` field".to_string()),
            },
        }
    }

    /// Invalid report for a run that produced no usable output.
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            exit_code: None,
            result: Value::Null,
            stderr: String::new(),
            raw_output: None,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Anything that can judge a configuration directory.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Validate the documents in `dir`. Must not modify the directory.
    async fn validate(&self, dir: &Path) -> ValidationReport;
}

/// Runs an external validator program once per request.
#[derive(Debug, Clone)]
pub struct ProcessValidator {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessValidator {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from settings, honoring the interpreter environment override.
    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self::new(
            config.resolve_program(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn run(&self, dir: &Path) -> ValidationReport {
        let target = match std::path::absolute(dir) {
            Ok(p) => p,
            Err(e) => return ValidationReport::failed(format!("Cannot resolve {}: {}", dir.display(), e)),
        };

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(program = %self.program.display(), error = %e, "Failed to spawn validator");
                return ValidationReport::failed(format!(
                    "Failed to start validator {}: {}",
                    self.program.display(),
                    e
                ));
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to collect validator output");
                return ValidationReport::failed(format!("Failed to collect validator output: {}", e));
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "Validator timed out");
                return ValidationReport::failed(format!(
                    "Validator timed out after {}s",
                    self.timeout.as_secs()
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = output.status.code();

        let report = ValidationReport::from_output(exit_code, &stdout, stderr);
        if report.diagnostic.is_some() {
            tracing::warn!(
                exit_code = ?exit_code,
                diagnostic = ?report.diagnostic,
                "Validator produced unusable output"
            );
        }
        report
    }
}

#[async_trait]
impl Validator for ProcessValidator {
    async fn validate(&self, dir: &Path) -> ValidationReport {
        let start = Instant::now();
        tracing::debug!(program = %self.program.display(), dir = %dir.display(), "Running validator");

        let report = self.run(dir).await;

        metrics::record_validation(report.is_valid, start);
        tracing::info!(
            dir = %dir.display(),
            is_valid = report.is_valid,
            exit_code = ?report.exit_code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Validation finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sh_validator(script: &str) -> ProcessValidator {
        // `sh -c <script> <argv0> <dir>` exposes the directory as $1
        ProcessValidator::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "validator".to_string()],
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_parse_valid_payload() {
        let report = ValidationReport::from_output(Some(0), "{\"is_valid\": true}\n", String::new());
        assert!(report.is_valid);
        assert_eq!(report.result, json!({ "is_valid": true }));
        assert!(report.raw_output.is_none());
    }

    #[test]
    fn test_parse_rejection_keeps_errors() {
        let report = ValidationReport::from_output(
            Some(1),
            r#"{"is_valid": false, "errors": ["bad yaml"]}"#,
            "trace".to_string(),
        );
        assert!(!report.is_valid);
        assert_eq!(report.result["errors"][0], "bad yaml");
        assert_eq!(report.stderr, "trace");
        assert!(report.diagnostic.is_none());
    }

    #[test]
    fn test_unparseable_output_is_invalid_and_retained() {
        let report = ValidationReport::from_output(Some(0), "not json", String::new());
        assert!(!report.is_valid);
        assert_eq!(report.raw_output.as_deref(), Some("not json"));
        assert!(report.diagnostic.is_some());
    }

    #[test]
    fn test_missing_flag_is_invalid() {
        let report = ValidationReport::from_output(Some(0), r#"{"is_valid": "yes"}"#, String::new());
        assert!(!report.is_valid);
        assert!(report.diagnostic.unwrap().contains("is_valid"));
    }

    #[tokio::test]
    async fn test_exit_code_is_not_authoritative() {
        let validator = sh_validator("echo '{\"is_valid\": true}'; exit 2");
        let dir = tempfile::tempdir().unwrap();
        let report = validator.validate(dir.path()).await;
        assert!(report.is_valid);
        assert_eq!(report.exit_code, Some(2));
    }

    #[tokio::test]
    async fn test_directory_is_passed_as_last_argument() {
        let validator = sh_validator("printf '{\"is_valid\": true, \"dir\": \"%s\"}' \"$1\"");
        let dir = tempfile::tempdir().unwrap();
        let report = validator.validate(dir.path()).await;
        assert!(report.is_valid);
        assert_eq!(report.result["dir"], dir.path().to_str().unwrap());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_invalid_report() {
        let validator = ProcessValidator::new(
            "/nonexistent/validator-binary",
            Vec::new(),
            Duration::from_secs(5),
        );
        let dir = tempfile::tempdir().unwrap();
        let report = validator.validate(dir.path()).await;
        assert!(!report.is_valid);
        assert!(report.exit_code.is_none());
        assert!(report.diagnostic.unwrap().contains("Failed to start validator"));
    }

    #[tokio::test]
    async fn test_timeout_is_invalid_report() {
        let validator = ProcessValidator::new(
            "sh",
            vec!["-c".to_string(), "sleep 10".to_string(), "validator".to_string()],
            Duration::from_millis(200),
        );
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let report = validator.validate(dir.path()).await;
        assert!(!report.is_valid);
        assert!(report.diagnostic.unwrap().contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
