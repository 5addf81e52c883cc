//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build store/validator/orchestrator → Start listener
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → broadcast → server drains, watcher exits
//! ```
//!
//! # Design Decisions
//! - An in-flight import is never cancelled; graceful shutdown waits for
//!   the HTTP request that carries it to finish
//! - Shutdown has timeout: forced exit after deadline

pub mod shutdown;

pub use shutdown::Shutdown;
