//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Client operation:
//!     → retries.rs (attempt, classify failure, decide retry,
//!                   exponential delay with jitter between attempts)
//!     → transport (one round trip per attempt)
//! ```
//!
//! # Design Decisions
//! - Classification is by status code only; failures without one are terminal
//! - Every operation is retried, creates included; a duplicate-create conflict
//!   on a later attempt surfaces unchanged
//! - Exhaustion returns the last real failure, never a synthetic one

pub mod retries;

pub use retries::RetryPolicy;
