//! Client-facing error type.
//!
//! # Taxonomy
//! ```text
//! 403           → PermissionOrNotFound (the service conflates the two)
//! 404           → NotFound
//! 409           → Conflict (etag mismatch, duplicate create)
//! 5xx           → Transient (retried internally, surfaced after exhaustion)
//! other status  → MalformedRequest
//! no status     → Unclassified (original cause kept as `source`)
//! ```
//!
//! Transports build errors through [`ResourceManagerError::from_status`] or
//! [`ResourceManagerError::unclassified`] so classification lives in one place.

use thiserror::Error;

/// Boxed cause of an unclassified failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by every resource manager operation.
#[derive(Debug, Error)]
pub enum ResourceManagerError {
    /// Caller lacks permission, or the resource does not exist.
    #[error("{message}")]
    PermissionOrNotFound { message: String },

    /// Resource explicitly does not exist.
    #[error("{message}")]
    NotFound { message: String },

    /// Etag mismatch or duplicate resource.
    #[error("{message}")]
    Conflict { message: String },

    /// Server-side failure that may succeed on retry.
    #[error("{message}")]
    Transient { code: u16, message: String },

    /// Any other status-bearing rejection.
    #[error("{message}")]
    MalformedRequest { code: u16, message: String },

    /// Failure that carried no status code.
    #[error("{message}")]
    Unclassified {
        message: String,
        #[source]
        source: BoxError,
    },
}

/// Result type for resource manager operations.
pub type Result<T> = std::result::Result<T, ResourceManagerError>;

impl ResourceManagerError {
    /// Classify a wire status code.
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            403 => Self::PermissionOrNotFound { message },
            404 => Self::NotFound { message },
            409 => Self::Conflict { message },
            500..=599 => Self::Transient { code, message },
            _ => Self::MalformedRequest { code, message },
        }
    }

    /// Wrap a failure that has no status code.
    pub fn unclassified<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = source.into();
        Self::Unclassified {
            message: source.to_string(),
            source,
        }
    }

    /// Numeric status code, `None` for unclassified failures.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::PermissionOrNotFound { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::Transient { code, .. } | Self::MalformedRequest { code, .. } => Some(*code),
            Self::Unclassified { .. } => None,
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::PermissionOrNotFound { message }
            | Self::NotFound { message }
            | Self::Conflict { message }
            | Self::Transient { message, .. }
            | Self::MalformedRequest { message, .. }
            | Self::Unclassified { message, .. } => message,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_permission_or_not_found(&self) -> bool {
        matches!(self, Self::PermissionOrNotFound { .. })
    }
}
