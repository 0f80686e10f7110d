//! Structured call logging
//!
//! [`logging_middleware`] records every call through `tracing`: the request
//! id from the [`RpcContext`](crate::RpcContext), path, kind, duration and,
//! on failure, the error code and status. Inputs and outputs can be logged
//! too; sensitive fields are redacted first by a [`RedactionEngine`].

mod config;
mod middleware;
mod redaction;

pub use config::{DEFAULT_SENSITIVE_FIELDS, DEFAULT_SLOW_THRESHOLD, LogConfig, LogLevel, REDACTED};
pub use middleware::logging_middleware;
pub use redaction::{RedactionEngine, redact_value};
