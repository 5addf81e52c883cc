//! Service configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DeployerConfig (validated, immutable)
//!     → used once at startup to build the store, validator and server
//!
//! While running:
//!     watcher.rs detects changes in the live config directory
//!     → orchestrator validates the live store
//!     → latest report swapped into the shared status slot
//! ```
//!
//! # Design Decisions
//! - Service settings are immutable once loaded; the documents being
//!   deployed are data, not settings
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::DeployerConfig;
pub use schema::StoreConfig;
pub use schema::ValidatorConfig;
pub use loader::{load_config, ConfigError};
