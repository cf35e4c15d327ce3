//! Resource Manager Control-Plane Client Library

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod observability;
pub mod paging;
pub mod resilience;
pub mod rpc;
pub mod testing;

pub use client::ResourceManager;
pub use config::schema::ResourceManagerConfig;
pub use error::{ResourceManagerError, Result};
pub use paging::Page;
