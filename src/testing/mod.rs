//! Test support.
//!
//! [`LocalResourceManager`] is an in-process stand-in for the service, used by
//! this crate's tests and available to downstream crates for theirs.

pub mod local;

pub use local::LocalResourceManager;
