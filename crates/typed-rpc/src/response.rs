//! Response envelopes
//!
//! Every transport response is one of two shapes:
//!
//! ```json
//! {"result": <output>, "success": true}
//! {"error": {"code": "NOT_FOUND", "message": "..."}, "success": false}
//! ```
//!
//! The transport status is the error's `status_code`, or 200 on success.

use crate::error::{ErrorCode, ErrorConfig, RpcError, RpcResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Code used when an error envelope carries no code.
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN";

/// Message used when an error envelope carries no message.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Status of a successful response.
pub const SUCCESS_STATUS: u16 = 200;

/// The `error` member of an error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code
    pub code: String,
    /// Error message
    pub message: String,
    /// Additional details, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&RpcError> for ErrorBody {
    fn from(error: &RpcError) -> Self {
        Self {
            code: error.code.to_string(),
            message: error.message.clone(),
            details: error.details.clone(),
        }
    }
}

/// A success or error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    /// `{"result": ..., "success": true}`
    Success {
        /// Serialized output
        result: Value,
        /// Always true
        success: bool,
    },
    /// `{"error": {...}, "success": false}`
    Error {
        /// Code and message
        error: ErrorBody,
        /// Always false
        success: bool,
    },
}

impl ResponseEnvelope {
    /// Wrap a successful output.
    pub fn success(result: Value) -> Self {
        Self::Success {
            result,
            success: true,
        }
    }

    /// Wrap an error as it should be shown to callers.
    pub fn error(error: &RpcError) -> Self {
        Self::Error {
            error: ErrorBody::from(error),
            success: false,
        }
    }

    /// Render a dispatch result into a status code and envelope.
    ///
    /// Errors are sanitized according to `config` first.
    pub fn from_result(result: RpcResult<Value>, config: &ErrorConfig) -> (u16, Self) {
        match result {
            Ok(value) => (SUCCESS_STATUS, Self::success(value)),
            Err(error) => {
                let error = error.sanitize(config);
                (error.status_code, Self::error(&error))
            }
        }
    }

    /// Whether this is a success envelope
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Serialize to a JSON value.
    pub fn into_value(self) -> Value {
        match self {
            Self::Success { result, success } => {
                serde_json::json!({ "result": result, "success": success })
            }
            Self::Error { error, success } => {
                let mut body = serde_json::json!({
                    "code": error.code,
                    "message": error.message,
                });
                if let Some(details) = error.details {
                    body["details"] = details;
                }
                serde_json::json!({ "error": body, "success": success })
            }
        }
    }

    /// Interpret a received envelope.
    ///
    /// Anything with an `error` member is an error, with `UNKNOWN` and
    /// `Unknown error` filling in a missing code or message. Otherwise the
    /// `result` member (or `null`) is the output.
    pub fn parse(envelope: &Value) -> Result<Value, ErrorBody> {
        if let Some(error) = envelope.get("error") {
            let code = error
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_ERROR_CODE)
                .to_string();
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_ERROR_MESSAGE)
                .to_string();
            return Err(ErrorBody {
                code,
                message,
                details: error.get("details").cloned(),
            });
        }
        Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
    }
}

impl ErrorBody {
    /// Rebuild the classified error this body describes.
    pub fn into_error(self) -> RpcError {
        let mut error = RpcError::new(ErrorCode::from(self.code), self.message);
        error.details = self.details;
        error
    }
}
