//! Validated configuration deployment service.

pub mod api;
pub mod config;
pub mod deploy;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::DeployerConfig;
pub use deploy::{DeploymentOrchestrator, LiveConfigStore, ProcessValidator, Validator};
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
