//! Validated configuration deployment.
//!
//! # Data Flow
//! ```text
//! ConfigBundle + EnvOverrides
//!     → staging.rs (fresh temp directory, bundle written)
//!     → validator.rs (external program judges the staged directory)
//!     → orchestrator.rs (decide on the report's is_valid flag)
//!     → store.rs (promote into the live directory, rollback on failure)
//!     → staging directory removed on every exit path
//! ```
//!
//! # Design Decisions
//! - Rejections are values, not errors
//! - One import at a time per orchestrator (single-writer lease)
//! - Override files are written but never validated

pub mod document;
pub mod error;
pub mod orchestrator;
pub mod staging;
pub mod store;
pub mod validator;

pub use document::{ConfigBundle, DocumentName, EnvOverrides};
pub use error::{DeployError, DeployResult};
pub use orchestrator::{DeploymentOrchestrator, ImportOutcome};
pub use staging::StagingArea;
pub use store::{LiveConfigStore, PromotionSummary};
pub use validator::{ProcessValidator, ValidationReport, Validator};
