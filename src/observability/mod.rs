//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! listener, connections, frame cache produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Connection ID is a span field on every per-connection event
//! - Metrics are cheap (atomic increments) and safe to record unconditionally

pub mod logging;
pub mod metrics;
