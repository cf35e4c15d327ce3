//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ResourceManagerConfig (validated, immutable)
//!     → handed to ResourceManager::from_config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the client copies what it needs at construction
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ResourceManagerConfig;
pub use schema::{ObservabilityConfig, RetryConfig, TimeoutConfig};
