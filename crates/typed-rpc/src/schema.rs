//! Schema contract
//!
//! A [`Schema`] turns an untrusted JSON value into a typed, validated value
//! and back. Any serde type that also implements [`Validate`] is a schema.

use crate::error::{ErrorCode, RpcError};
use crate::validation::{FieldError, Validate};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;
use tracing::trace;

/// Schema violation.
///
/// Carries a summary message plus any field-level errors produced by
/// [`Validate`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SchemaError {
    /// Summary message
    pub message: String,
    /// Field-level errors, empty for structural failures
    pub errors: Vec<FieldError>,
}

impl SchemaError {
    /// Create a schema error without field details.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Create a schema error from field-level errors.
    pub fn from_fields(errors: Vec<FieldError>) -> Self {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self { message, errors }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<SchemaError> for RpcError {
    fn from(err: SchemaError) -> Self {
        let error = RpcError::new(ErrorCode::ValidationError, err.message.clone());
        if err.errors.is_empty() {
            error
        } else {
            error.with_details(serde_json::json!({ "errors": err.errors }))
        }
    }
}

/// Validates raw values into typed values and serializes them back.
pub trait Schema: Sized + Send + 'static {
    /// Validate an untrusted value, producing the typed value.
    fn validate(raw: Value) -> Result<Self, SchemaError>;

    /// Serialize a typed value into its wire form.
    fn serialize(&self) -> Result<Value, SchemaError>;

    /// Name used in logs and procedure listings.
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

impl<T> Schema for T
where
    T: DeserializeOwned + Serialize + Validate + Send + 'static,
{
    fn validate(raw: Value) -> Result<Self, SchemaError> {
        let value: T = serde_json::from_value(raw)?;
        let result = Validate::validate(&value);
        if result.is_valid() {
            Ok(value)
        } else {
            trace!(
                schema = %std::any::type_name::<T>(),
                error_count = result.errors.len(),
                "Schema validation failed"
            );
            Err(SchemaError::from_fields(result.errors))
        }
    }

    fn serialize(&self) -> Result<Value, SchemaError> {
        let value = serde_json::to_value(self)?;
        // Serialized values obey the same rules as validated ones.
        let result = Validate::validate(self);
        if result.is_valid() {
            Ok(value)
        } else {
            Err(SchemaError::from_fields(result.errors))
        }
    }
}
