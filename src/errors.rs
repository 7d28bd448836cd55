//! Error types for blob operations.
//!
//! Every variant maps to a stable error code.  Only [`BlobError::NotFound`]
//! is ever treated as a non-failure, and only by listing operations and the
//! polling consumer; everything else propagates to the caller unchanged.

use thiserror::Error;

/// Errors raised while resolving options or executing a blob operation.
#[derive(Debug, Error)]
pub enum BlobError {
    /// A required option is missing from both the exchange and the
    /// endpoint configuration, or an option value is malformed.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The resolved operation name has no handler.
    #[error("operation '{operation}' is not supported")]
    UnsupportedOperation { operation: String },

    /// The vendor reported that the container or blob does not exist.
    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    /// Any other failure reported by the storage service.
    #[error("storage service returned HTTP {status} ({code}): {message}")]
    Vendor {
        status: u16,
        code: String,
        message: String,
    },

    /// Local file I/O failed (download to file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failures and other unexpected errors.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BlobError {
    /// Shorthand for a [`BlobError::Configuration`] error.
    pub fn config(message: impl Into<String>) -> Self {
        BlobError::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a [`BlobError::NotFound`] error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        BlobError::NotFound {
            resource: resource.into(),
        }
    }

    /// Whether this error is the 404-class "does not exist" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound { .. })
    }

    /// Return a stable error code string for logs and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            BlobError::Configuration { .. } => "ConfigurationError",
            BlobError::UnsupportedOperation { .. } => "UnsupportedOperation",
            BlobError::NotFound { .. } => "NotFound",
            BlobError::Vendor { .. } => "VendorError",
            BlobError::Io(_) => "IoError",
            BlobError::Internal(_) => "InternalError",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BlobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(BlobError::not_found("container/blob").is_not_found());
        assert!(!BlobError::config("missing container").is_not_found());
        let vendor = BlobError::Vendor {
            status: 409,
            code: "ContainerAlreadyExists".to_string(),
            message: "exists".to_string(),
        };
        assert!(!vendor.is_not_found());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BlobError::config("x").code(), "ConfigurationError");
        assert_eq!(
            BlobError::UnsupportedOperation {
                operation: "fly".to_string()
            }
            .code(),
            "UnsupportedOperation"
        );
        assert_eq!(
            BlobError::Internal(anyhow::anyhow!("boom")).code(),
            "InternalError"
        );
    }

    #[test]
    fn test_display_messages() {
        let err = BlobError::UnsupportedOperation {
            operation: "fly".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'fly' is not supported");
        let err = BlobError::config("container name is required");
        assert_eq!(
            err.to_string(),
            "configuration error: container name is required"
        );
    }
}
