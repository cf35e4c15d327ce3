//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Client operations produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → whatever subscriber / recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - The library emits events but never installs a global subscriber on its own
//! - Metric names are prefixed with `resourcemanager_`

pub mod logging;
pub mod metrics;
