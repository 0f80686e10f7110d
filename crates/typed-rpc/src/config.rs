//! Adapter configuration
//!
//! [`GatewayConfig`] is the configuration surface a transport adapter needs:
//! the mount prefix, optional CORS settings, an input size limit and how
//! errors are rendered.
//!
//! # Example
//! ```rust,ignore
//! use typed_rpc::{CorsConfig, ErrorConfig, GatewayConfig};
//!
//! let config = GatewayConfig::new()
//!     .with_prefix("/rpc")
//!     .with_cors(CorsConfig::default().with_allow_origins(["https://app.example.com"]))
//!     .with_max_input_size(512 * 1024)
//!     .with_error_config(ErrorConfig::development());
//!
//! config.validate()?;
//! ```

use crate::error::ErrorConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default mount prefix
pub const DEFAULT_PREFIX: &str = "/api";

/// Default maximum input size: 1 MiB
pub const DEFAULT_MAX_INPUT_SIZE: usize = 1024 * 1024;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigValidationError {
    /// prefix must start with '/' and not end with '/'
    #[error("invalid prefix '{0}': must start with '/' and not end with '/'")]
    InvalidPrefix(String),
    /// max_input_size must be greater than 0
    #[error("max_input_size must be greater than 0")]
    InvalidMaxInputSize,
    /// A CORS list was empty
    #[error("CORS {0} must not be empty")]
    EmptyCorsList(&'static str),
}

/// CORS settings for adapters that serve browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins (default: `["*"]`)
    pub allow_origins: Vec<String>,
    /// Allowed methods (default: `["*"]`)
    pub allow_methods: Vec<String>,
    /// Allowed headers (default: `["*"]`)
    pub allow_headers: Vec<String>,
    /// Whether credentials are allowed (default: true)
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: vec!["*".to_string()],
            allow_headers: vec!["*".to_string()],
            allow_credentials: true,
        }
    }
}

impl CorsConfig {
    /// Set allowed origins
    pub fn with_allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Set allowed methods
    pub fn with_allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Set allowed headers
    pub fn with_allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether credentials are allowed
    pub fn with_allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// Whether an origin is allowed
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.allow_origins.iter().any(|o| o == "*" || o == origin)
    }

    /// Validate the CORS settings.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.allow_origins.is_empty() {
            return Err(ConfigValidationError::EmptyCorsList("allow_origins"));
        }
        if self.allow_methods.is_empty() {
            return Err(ConfigValidationError::EmptyCorsList("allow_methods"));
        }
        if self.allow_headers.is_empty() {
            return Err(ConfigValidationError::EmptyCorsList("allow_headers"));
        }
        Ok(())
    }
}

/// Gateway configuration.
///
/// # Fields
///
/// * `prefix` - Mount prefix for every route. Default: `/api`.
/// * `cors` - CORS settings, `None` to disable. Default: `None`.
/// * `max_input_size` - Maximum serialized input size in bytes. Larger inputs
///   are rejected with `PAYLOAD_TOO_LARGE` (413). Default: 1 MiB.
/// * `error` - Error rendering. Default: production (server error messages hidden).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Mount prefix (default: "/api")
    pub prefix: String,
    /// CORS settings (default: disabled)
    pub cors: Option<CorsConfig>,
    /// Maximum input size in bytes (default: 1 MiB)
    pub max_input_size: usize,
    /// Error rendering
    pub error: ErrorConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            cors: None,
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            error: ErrorConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mount prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Enable CORS with the given settings
    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Set the maximum input size in bytes
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// Set the error rendering configuration
    pub fn with_error_config(mut self, error: ErrorConfig) -> Self {
        self.error = error;
        self
    }

    /// Validate the configuration and return an error if invalid.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `prefix` does not start with `/` or ends with `/`
    /// - `max_input_size` is 0
    /// - CORS is enabled with an empty list
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.prefix.starts_with('/') || self.prefix.ends_with('/') {
            return Err(ConfigValidationError::InvalidPrefix(self.prefix.clone()));
        }
        if self.max_input_size == 0 {
            return Err(ConfigValidationError::InvalidMaxInputSize);
        }
        if let Some(cors) = &self.cors {
            cors.validate()?;
        }
        Ok(())
    }
}
