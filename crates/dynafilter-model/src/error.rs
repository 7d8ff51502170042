//! Errors reported by the backend store.
//!
//! The core never retries or reinterprets these; they travel back to the
//! caller exactly as the backend produced them.

use std::fmt;

/// Well-known DynamoDB error codes a backend may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum BackendErrorCode {
    /// Request parameters were rejected.
    #[default]
    ValidationException,
    /// Table not found.
    ResourceNotFoundException,
    /// Table already exists.
    ResourceInUseException,
    /// Provisioned throughput exceeded.
    ProvisionedThroughputExceededException,
    /// Account-level request limit exceeded.
    RequestLimitExceeded,
    /// Request rate too high.
    ThrottlingException,
    /// Credentials rejected.
    AccessDeniedException,
    /// Response could not be decoded.
    SerializationException,
    /// Backend-side failure.
    InternalServerError,
}

impl BackendErrorCode {
    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationException => "ValidationException",
            Self::ResourceNotFoundException => "ResourceNotFoundException",
            Self::ResourceInUseException => "ResourceInUseException",
            Self::ProvisionedThroughputExceededException => {
                "ProvisionedThroughputExceededException"
            }
            Self::RequestLimitExceeded => "RequestLimitExceeded",
            Self::ThrottlingException => "ThrottlingException",
            Self::AccessDeniedException => "AccessDeniedException",
            Self::SerializationException => "SerializationException",
            Self::InternalServerError => "InternalServerError",
        }
    }
}

impl fmt::Display for BackendErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure returned by a backend `query` or `scan` call.
#[derive(Debug)]
pub struct BackendError {
    /// The error code.
    pub code: BackendErrorCode,
    /// A human-readable message.
    pub message: String,
    /// The underlying transport or SDK error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BackendError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl BackendError {
    /// Create an error carrying a custom message.
    #[must_use]
    pub fn with_message(code: BackendErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Request parameters were rejected.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(BackendErrorCode::ValidationException, message)
    }

    /// Table not found.
    #[must_use]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::with_message(BackendErrorCode::ResourceNotFoundException, message)
    }

    /// Table already exists.
    #[must_use]
    pub fn resource_in_use(message: impl Into<String>) -> Self {
        Self::with_message(BackendErrorCode::ResourceInUseException, message)
    }

    /// Backend-side failure.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(BackendErrorCode::InternalServerError, message)
    }
}

/// Create a `BackendError` from an error code.
///
/// # Examples
///
/// ```
/// use dynafilter_model::backend_error;
/// use dynafilter_model::error::BackendErrorCode;
///
/// let err = backend_error!(ThrottlingException, "slow down");
/// assert_eq!(err.code, BackendErrorCode::ThrottlingException);
/// assert_eq!(err.message, "slow down");
/// ```
#[macro_export]
macro_rules! backend_error {
    ($code:ident) => {
        $crate::error::BackendError::with_message(
            $crate::error::BackendErrorCode::$code,
            $crate::error::BackendErrorCode::$code.as_str(),
        )
    };
    ($code:ident, $msg:expr) => {
        $crate::error::BackendError::with_message($crate::error::BackendErrorCode::$code, $msg)
    };
}
