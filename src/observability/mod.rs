//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (import outcomes, validator runs)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (paths, exit codes, outcomes)
//! - Request ID flows through the HTTP layer into handler logs
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
