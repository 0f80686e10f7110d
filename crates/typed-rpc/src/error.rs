//! Error types for RPC operations
//!
//! Every failure the dispatcher reports is an [`RpcError`]: a stable
//! [`ErrorCode`], a human-readable message, an HTTP-like status code and an
//! optional cause.
//!
//! # Error Codes
//!
//! Codes are open string identifiers. The well-known ones have dedicated
//! [`ErrorCode`] variants; anything else is carried by [`ErrorCode::Custom`].
//! When serialized, codes are SCREAMING_SNAKE_CASE strings (`"NOT_FOUND"`).
//!
//! # Status Codes
//!
//! Unless a status is given explicitly, it is looked up in
//! [`STATUS_CODE_TABLE`]. Codes absent from the table map to 500.
//!
//! # Example
//! ```rust,ignore
//! use typed_rpc::{ErrorCode, RpcError};
//!
//! let error = RpcError::new(ErrorCode::NotFound, "User not found");
//! assert_eq!(error.status_code, 404);
//!
//! let error = RpcError::new("PAYMENT_REQUIRED", "Upgrade your plan").with_status(402);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Fixed mapping from error code to default status code.
pub const STATUS_CODE_TABLE: &[(&str, u16)] = &[
    ("VALIDATION_ERROR", 400),
    ("BAD_REQUEST", 400),
    ("UNAUTHORIZED", 401),
    ("FORBIDDEN", 403),
    ("NOT_FOUND", 404),
    ("METHOD_NOT_ALLOWED", 405),
    ("CONFLICT", 409),
    ("INTERNAL_SERVER_ERROR", 500),
    ("NOT_IMPLEMENTED", 501),
];

/// Status used for any code that is not in [`STATUS_CODE_TABLE`].
pub const DEFAULT_STATUS_CODE: u16 = 500;

/// Returns the default status code for an error code string.
pub fn default_status_for(code: &str) -> u16 {
    STATUS_CODE_TABLE
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, status)| *status)
        .unwrap_or(DEFAULT_STATUS_CODE)
}

/// Error codes for RPC operations.
///
/// The named variants cover the codes the dispatcher, gateway and client
/// produce themselves. Resolvers are free to use any other identifier through
/// [`ErrorCode::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    // Client errors (4xx)
    /// Input or output failed its schema
    ValidationError,
    /// The request was malformed or invalid
    BadRequest,
    /// Authentication is required
    Unauthorized,
    /// The authenticated identity lacks permission
    Forbidden,
    /// The procedure or resource was not found
    NotFound,
    /// The call kind or transport method is not accepted for this route
    MethodNotAllowed,
    /// The request conflicts with current state
    Conflict,

    // Server errors (5xx)
    /// An unexpected failure inside the server
    InternalServerError,
    /// The requested functionality is not implemented
    NotImplemented,

    /// Registration-time misuse (missing path, schema or resolver)
    Config,
    /// Client-side transport failure; no server status applies
    NetworkError,

    /// Any other code
    Custom(String),
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::Conflict => "CONFLICT",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::Config => "CONFIG",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Custom(code) => code,
        }
    }

    /// Default status code for this code, from [`STATUS_CODE_TABLE`].
    pub fn default_status(&self) -> u16 {
        default_status_for(self.as_str())
    }

    /// Returns true if the default status is a 4xx.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.default_status())
    }

    /// Returns true if the default status is a 5xx.
    pub fn is_server_error(&self) -> bool {
        self.default_status() >= 500
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "VALIDATION_ERROR" => Self::ValidationError,
            "BAD_REQUEST" => Self::BadRequest,
            "UNAUTHORIZED" => Self::Unauthorized,
            "FORBIDDEN" => Self::Forbidden,
            "NOT_FOUND" => Self::NotFound,
            "METHOD_NOT_ALLOWED" => Self::MethodNotAllowed,
            "CONFLICT" => Self::Conflict,
            "INTERNAL_SERVER_ERROR" => Self::InternalServerError,
            "NOT_IMPLEMENTED" => Self::NotImplemented,
            "CONFIG" => Self::Config,
            "NETWORK_ERROR" => Self::NetworkError,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        match Self::from(code.as_str()) {
            Self::Custom(_) => Self::Custom(code),
            known => known,
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Custom(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for ErrorCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from(code))
    }
}

impl PartialEq<&str> for ErrorCode {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, type-erased cause attached to an [`RpcError`].
pub type ErrorCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Classified RPC error.
///
/// Once constructed, an `RpcError` travels through the pipeline unchanged;
/// it is never re-wrapped. The `cause` is kept for debugging and is never
/// serialized.
///
/// # Example
/// ```rust,ignore
/// use typed_rpc::{ErrorCode, RpcError};
///
/// let error = RpcError::bad_request("Division by zero is not allowed");
/// assert_eq!(error.code, ErrorCode::BadRequest);
/// assert_eq!(error.status_code, 400);
///
/// let wrapped = RpcError::wrap(std::io::Error::other("disk full"));
/// assert_eq!(wrapped.status_code, 500);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("[{code}] {message}")]
pub struct RpcError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Status code, defaulted from [`STATUS_CODE_TABLE`]
    pub status_code: u16,
    /// Optional additional details (JSON value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Underlying error, for debugging only
    #[serde(skip)]
    #[source]
    pub cause: Option<ErrorCause>,
}

impl RpcError {
    /// Create a new error; the status code comes from the default table.
    pub fn new(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        let code = code.into();
        let status_code = code.default_status();
        Self {
            code,
            message: message.into(),
            status_code,
            details: None,
            cause: None,
        }
    }

    /// Create a new error with an explicit status code.
    pub fn with_status_code(
        code: impl Into<ErrorCode>,
        message: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self::new(code, message).with_status(status_code)
    }

    /// Override the status code.
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Attach the underlying error.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Wrap an unclassified error as `INTERNAL_SERVER_ERROR`, keeping it as the cause.
    pub fn wrap<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        trace!(error = %err, "Wrapping unclassified error");
        Self::internal(err.to_string()).with_cause(err)
    }

    /// Render a response-safe copy according to the error configuration.
    ///
    /// Code and status are preserved; in production mode the message and
    /// details of server errors are hidden.
    pub fn sanitize(&self, config: &ErrorConfig) -> Self {
        let mut error = self.clone();
        error.cause = None;
        if !config.development_mode && error.status_code >= 500 {
            debug!(
                code = %error.code,
                original_message = %error.message,
                "Sanitizing server error for client response"
            );
            error.message = "An internal error occurred".to_string();
            error.details = None;
        }
        error
    }

    // Convenience constructors

    /// Create a NOT_FOUND error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a BAD_REQUEST error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a VALIDATION_ERROR error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create an UNAUTHORIZED error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a FORBIDDEN error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a METHOD_NOT_ALLOWED error.
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MethodNotAllowed, message)
    }

    /// Create a CONFLICT error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Create an INTERNAL_SERVER_ERROR error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }

    /// Create a NOT_IMPLEMENTED error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotImplemented, message)
    }

    /// Create a CONFIG error (registration-time misuse).
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Config, message)
    }

    /// Create a PAYLOAD_TOO_LARGE error (explicit status 413).
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::with_status_code("PAYLOAD_TOO_LARGE", message, 413)
    }

    /// Create the NOT_FOUND error reported for an unresolvable path.
    pub fn procedure_not_found(path: &str) -> Self {
        Self::not_found(format!("Procedure {} not found", path))
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err)).with_cause(err)
    }
}

impl From<std::io::Error> for RpcError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("IO error: {}", err)).with_cause(err)
    }
}

/// Result type alias for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// Controls how errors are rendered into responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorConfig {
    /// Keep server error messages and details in responses.
    pub development_mode: bool,
}

impl ErrorConfig {
    /// Production configuration: server error messages are hidden.
    pub fn production() -> Self {
        Self {
            development_mode: false,
        }
    }

    /// Development configuration: messages are passed through.
    pub fn development() -> Self {
        Self {
            development_mode: true,
        }
    }
}
