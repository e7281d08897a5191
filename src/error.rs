//! Error types for providers, the inventory boundary and reconciliation.

use crate::models::ProviderType;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Provider and registry errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(ProviderType),

    #[error("Provider already registered: {0}")]
    DuplicateProvider(ProviderType),

    #[error("Provider is nil or has no type key")]
    NilProvider,

    #[error("Provider {provider} unavailable: {source}")]
    ProviderUnavailable {
        provider: ProviderType,
        #[source]
        source: BoxError,
    },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Credentials are for provider {got}, expected {expected}")]
    TypeMismatch {
        expected: ProviderType,
        got: ProviderType,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Command execution failed: {0}")]
    Command(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider task failed: {0}")]
    Task(String),
}

impl ProviderError {
    /// Wraps any cause as `ProviderUnavailable` for `provider`. An error that
    /// already is `ProviderUnavailable` is returned as is.
    pub fn unavailable(provider: ProviderType, cause: impl Into<BoxError>) -> Self {
        let cause: BoxError = cause.into();
        match cause.downcast::<ProviderError>() {
            Ok(inner) if inner.is_unavailable() => *inner,
            Ok(inner) => ProviderError::ProviderUnavailable {
                provider,
                source: inner,
            },
            Err(other) => ProviderError::ProviderUnavailable {
                provider,
                source: other,
            },
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ProviderError::ProviderUnavailable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::ProviderNotFound(_))
    }

    /// The innermost `ProviderError` behind an `unavailable` wrapper, if any.
    pub fn cause(&self) -> Option<&ProviderError> {
        match self {
            ProviderError::ProviderUnavailable { source, .. } => source.downcast_ref::<ProviderError>(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Inventory repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Subnet not found: {0}")]
    NotFound(String),

    #[error("Subnet already exists: {0}")]
    Conflict(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Repository call interrupted: {0}")]
    Interrupted(ProviderError),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

/// Errors that end a reconciliation run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Listing {what} from {provider} failed: {source}")]
    Listing {
        provider: ProviderType,
        what: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("Sync of {provider} interrupted: {source}")]
    Interrupted {
        provider: ProviderType,
        #[source]
        source: ProviderError,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_unavailable_keeps_cause() {
        let err = ProviderError::unavailable(
            ProviderType::AWS,
            ProviderError::RateLimited("slow down".to_string()),
        );
        assert!(err.is_unavailable());
        assert!(matches!(err.cause(), Some(ProviderError::RateLimited(_))));
        assert!(err.to_string().contains("aws"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unavailable_is_not_double_wrapped() {
        let once = ProviderError::unavailable(ProviderType::GCP, ProviderError::Cancelled);
        let twice = ProviderError::unavailable(ProviderType::GCP, once);
        assert!(matches!(twice.cause(), Some(ProviderError::Cancelled)));
    }

    #[test]
    fn test_unavailable_wraps_foreign_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = ProviderError::unavailable(ProviderType::OVH, io);
        assert!(err.is_unavailable());
        assert!(err.cause().is_none());
        assert!(err.to_string().contains("socket closed"));
    }
}
