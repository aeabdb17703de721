//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and the relay stream produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (from tower-http) is recorded on every request span
//! - Metric updates are no-ops until a recorder is installed, so tests and
//!   library users pay nothing unless metrics are enabled

pub mod logging;
pub mod metrics;
