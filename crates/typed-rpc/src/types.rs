//! Common schema types

use crate::validation::{Validate, ValidationResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Input for procedures that take no arguments.
///
/// Accepts `null`, `{}` or any object (its fields are ignored) and
/// serializes as `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoInput;

impl Serialize for NoInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

impl<'de> Deserialize<'de> for NoInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null | Value::Object(_) => Ok(NoInput),
            other => Err(serde::de::Error::custom(format!(
                "expected null or an object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl Validate for NoInput {
    fn validate(&self) -> ValidationResult {
        ValidationResult::ok()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Generic acknowledgement output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Optional human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    /// A successful response without a message
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// A successful response with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

impl Validate for SuccessResponse {
    fn validate(&self) -> ValidationResult {
        ValidationResult::ok()
    }
}
