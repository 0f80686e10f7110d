//! Configuration types for the logging middleware.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Default replacement for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Default slow request threshold.
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(1000);

/// Field names redacted by default (case-insensitive substring match).
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_key",
    "apikey",
    "authorization",
    "credential",
    "private_key",
    "privatekey",
    "ssn",
    "credit_card",
    "creditcard",
    "card_number",
    "cvv",
    "bearer",
];

/// Log level for completed calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose
    Trace,
    /// Development detail
    Debug,
    /// Default
    #[default]
    Info,
    /// Potential problems
    Warn,
    /// Failures
    Error,
    /// Logging disabled
    Off,
}

impl LogLevel {
    /// Whether a message at `target` passes this level.
    pub fn should_log(&self, target: LogLevel) -> bool {
        *self != LogLevel::Off && target != LogLevel::Off && target >= *self
    }
}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

/// Configuration for call logging.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level used for successful calls
    pub level: LogLevel,
    /// Whether to log the (redacted) input
    pub log_input: bool,
    /// Whether to log the (redacted) output
    pub log_output: bool,
    /// Field names to redact (case-insensitive substring match)
    pub redacted_fields: HashSet<String>,
    /// Replacement for redacted values
    pub redaction_replacement: String,
    /// Whether to log successful calls
    pub log_success: bool,
    /// Whether to log failed calls
    pub log_errors: bool,
    /// Paths that are never logged
    pub excluded_paths: HashSet<String>,
    /// Calls slower than this are logged as warnings
    pub slow_request_threshold: Option<Duration>,
    /// Whether to run each call inside an `rpc_call` span
    pub create_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_input: false,
            log_output: false,
            redacted_fields: DEFAULT_SENSITIVE_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            redaction_replacement: REDACTED.to_string(),
            log_success: true,
            log_errors: true,
            excluded_paths: HashSet::new(),
            slow_request_threshold: Some(DEFAULT_SLOW_THRESHOLD),
            create_spans: true,
        }
    }
}

impl LogConfig {
    /// Creates a logging configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level for successful calls.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets whether to log the redacted input.
    pub fn with_input(mut self, enabled: bool) -> Self {
        self.log_input = enabled;
        self
    }

    /// Sets whether to log the redacted output.
    pub fn with_output(mut self, enabled: bool) -> Self {
        self.log_output = enabled;
        self
    }

    /// Adds a field name to the redaction list.
    pub fn redact_field(mut self, field: impl Into<String>) -> Self {
        self.redacted_fields.insert(field.into());
        self
    }

    /// Adds several field names to the redaction list.
    pub fn redact_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.redacted_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Removes every redacted field, including the defaults.
    pub fn clear_redacted_fields(mut self) -> Self {
        self.redacted_fields.clear();
        self
    }

    /// Sets the replacement for redacted values.
    pub fn with_redaction_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.redaction_replacement = replacement.into();
        self
    }

    /// Sets whether to log successful calls.
    pub fn with_success_logging(mut self, enabled: bool) -> Self {
        self.log_success = enabled;
        self
    }

    /// Sets whether to log failed calls.
    pub fn with_error_logging(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }

    /// Never log calls to `path`.
    pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
        self.excluded_paths.insert(path.into());
        self
    }

    /// Log calls slower than `threshold` as warnings.
    pub fn with_slow_request_threshold(mut self, threshold: Duration) -> Self {
        self.slow_request_threshold = Some(threshold);
        self
    }

    /// Disable slow call warnings.
    pub fn without_slow_request_logging(mut self) -> Self {
        self.slow_request_threshold = None;
        self
    }

    /// Sets whether each call runs inside a tracing span.
    pub fn with_spans(mut self, enabled: bool) -> Self {
        self.create_spans = enabled;
        self
    }

    /// Whether calls to `path` are logged at all.
    pub fn should_log_path(&self, path: &str) -> bool {
        self.level != LogLevel::Off && !self.excluded_paths.contains(path)
    }

    /// Whether a call that took `elapsed` counts as slow.
    pub fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_request_threshold
            .is_some_and(|threshold| elapsed > threshold)
    }
}
