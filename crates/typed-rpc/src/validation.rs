//! Field-level validation rules
//!
//! Input and output types implement [`Validate`] to add semantic checks on top
//! of structural deserialization. Together with serde this forms the
//! [`Schema`](crate::Schema) contract used by the dispatcher and the client.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_rpc::validation::{Validate, ValidationResult, ValidationRules};
//!
//! #[derive(Debug, Deserialize, Serialize)]
//! struct CreateUserInput {
//!     name: String,
//!     email: String,
//!     age: i64,
//! }
//!
//! impl Validate for CreateUserInput {
//!     fn validate(&self) -> ValidationResult {
//!         ValidationRules::new()
//!             .required("name", &self.name)
//!             .max_length("name", &self.name, 100)
//!             .email("email", &self.email)
//!             .range("age", self.age, 0, 150)
//!             .build()
//!     }
//! }
//! ```

use crate::error::RpcError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{trace, warn};

/// Validation error for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// The name of the field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Error code identifying the type of validation failure
    pub code: String,
}

impl FieldError {
    /// Create a new field error
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }

    /// Create a "required" field error
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(&field, format!("{} is required", field), "required")
    }

    /// Create a "min_length" field error
    pub fn min_length(field: impl Into<String>, min: usize) -> Self {
        let field = field.into();
        Self::new(
            &field,
            format!("{} must be at least {} characters", field, min),
            "min_length",
        )
    }

    /// Create a "max_length" field error
    pub fn max_length(field: impl Into<String>, max: usize) -> Self {
        let field = field.into();
        Self::new(
            &field,
            format!("{} must be at most {} characters", field, max),
            "max_length",
        )
    }

    /// Create a "range" field error
    pub fn range(field: impl Into<String>, min: impl fmt::Display, max: impl fmt::Display) -> Self {
        let field = field.into();
        Self::new(
            &field,
            format!("{} must be between {} and {}", field, min, max),
            "range",
        )
    }

    /// Create a "pattern" field error
    pub fn pattern(field: impl Into<String>, pattern: &str) -> Self {
        let field = field.into();
        Self::new(
            &field,
            format!("{} must match pattern: {}", field, pattern),
            "pattern",
        )
    }

    /// Create an "email" field error
    pub fn email(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            &field,
            format!("{} must be a valid email address", field),
            "email",
        )
    }

    /// Create a custom field error
    pub fn custom(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, message, "custom")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of validating a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the value is valid
    pub valid: bool,
    /// Field-level errors (empty if valid)
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Create a validation result from a list of errors.
    /// If the list is empty, the result is valid.
    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        if !errors.is_empty() {
            let field_names: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            trace!(
                error_count = errors.len(),
                fields = ?field_names,
                "Validation failed"
            );
        }
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Get the errors
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Group errors by field name
    pub fn errors_by_field(&self) -> HashMap<String, Vec<&FieldError>> {
        let mut map: HashMap<String, Vec<&FieldError>> = HashMap::new();
        for error in &self.errors {
            map.entry(error.field.clone()).or_default().push(error);
        }
        map
    }

    /// Merge another validation result into this one
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.errors.extend(other.errors);
        self.valid = self.errors.is_empty();
        self
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Semantic validation for schema types.
///
/// Types with no rules beyond their structure can return
/// [`ValidationResult::ok`].
pub trait Validate {
    /// Validate the value and return a result with any errors
    fn validate(&self) -> ValidationResult;
}

macro_rules! impl_validate_always_ok {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Validate for $ty {
                fn validate(&self) -> ValidationResult {
                    ValidationResult::ok()
                }
            }
        )*
    };
}

impl_validate_always_ok!(
    (),
    bool,
    String,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    serde_json::Value,
);

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> ValidationResult {
        match self {
            Some(value) => value.validate(),
            None => ValidationResult::ok(),
        }
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> ValidationResult {
        self.iter()
            .map(Validate::validate)
            .fold(ValidationResult::ok(), ValidationResult::merge)
    }
}

/// Builder for validation rules.
///
/// ```rust,ignore
/// let result = ValidationRules::new()
///     .required("name", &input.name)
///     .min_length("name", &input.name, 2)
///     .pattern("phone", &input.phone, r"^\+?[0-9]{10,15}$")
///     .custom("denominator", || input.denominator != 0.0, "denominator cannot be zero")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ValidationRules {
    errors: Vec<FieldError>,
}

impl ValidationRules {
    /// Create a new validation rules builder
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error directly
    pub fn add_error(mut self, error: FieldError) -> Self {
        self.errors.push(error);
        self
    }

    /// Validate that a string field is not blank
    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::required(field));
        }
        self
    }

    /// Validate minimum string length (in characters)
    pub fn min_length(mut self, field: &str, value: &str, min: usize) -> Self {
        if value.chars().count() < min {
            self.errors.push(FieldError::min_length(field, min));
        }
        self
    }

    /// Validate maximum string length (in characters)
    pub fn max_length(mut self, field: &str, value: &str, max: usize) -> Self {
        if value.chars().count() > max {
            self.errors.push(FieldError::max_length(field, max));
        }
        self
    }

    /// Validate that an integer is within a range (inclusive)
    pub fn range(mut self, field: &str, value: i64, min: i64, max: i64) -> Self {
        if value < min || value > max {
            self.errors.push(FieldError::range(field, min, max));
        }
        self
    }

    /// Validate that a float is within a range (inclusive)
    pub fn range_f64(mut self, field: &str, value: f64, min: f64, max: f64) -> Self {
        if !(min..=max).contains(&value) {
            self.errors.push(FieldError::range(field, min, max));
        }
        self
    }

    /// Validate that a string matches a regex pattern
    pub fn pattern(mut self, field: &str, value: &str, pattern: &str) -> Self {
        match regex::Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(value) {
                    self.errors.push(FieldError::pattern(field, pattern));
                }
            }
            Err(e) => {
                // A bad pattern is a programming error; report it against the field.
                warn!(field = %field, pattern = %pattern, error = %e, "Invalid validation regex pattern");
                self.errors.push(FieldError::new(
                    field,
                    format!("Invalid validation pattern: {}", pattern),
                    "invalid_pattern",
                ));
            }
        }
        self
    }

    /// Validate that a string looks like an email address
    pub fn email(mut self, field: &str, value: &str) -> Self {
        let is_valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };

        if !is_valid {
            self.errors.push(FieldError::email(field));
        }
        self
    }

    /// Add a custom validation with a predicate
    pub fn custom<F>(mut self, field: &str, predicate: F, message: &str) -> Self
    where
        F: FnOnce() -> bool,
    {
        if !predicate() {
            self.errors.push(FieldError::custom(field, message));
        }
        self
    }

    /// Merge the result of validating a nested value, prefixing its field names
    pub fn nested<T: Validate>(mut self, field: &str, value: &T) -> Self {
        for mut error in value.validate().errors {
            error.field = format!("{}.{}", field, error.field);
            self.errors.push(error);
        }
        self
    }

    /// Build the validation result
    pub fn build(self) -> ValidationResult {
        ValidationResult::from_errors(self.errors)
    }
}

/// Validate a procedure path or mount prefix.
///
/// Paths are non-empty, do not start or end with a dot, contain no empty
/// segment and use only ASCII alphanumerics, `_`, `-` and `.`.
///
/// # Errors
///
/// Returns a `CONFIG` error naming the offending path.
pub fn validate_path(path: &str) -> Result<(), RpcError> {
    if path.is_empty() {
        return Err(RpcError::config("Procedure path cannot be empty"));
    }
    if path.starts_with('.') || path.ends_with('.') {
        return Err(RpcError::config(format!(
            "Procedure path cannot start or end with a dot (got: '{}')",
            path
        )));
    }
    if path.contains("..") {
        return Err(RpcError::config(format!(
            "Procedure path cannot contain consecutive dots (got: '{}')",
            path
        )));
    }
    if let Some(invalid_char) = path
        .chars()
        .find(|&ch| !ch.is_ascii_alphanumeric() && ch != '_' && ch != '-' && ch != '.')
    {
        return Err(RpcError::config(format!(
            "Procedure path contains invalid character: '{}' in path '{}'",
            invalid_char, path
        )));
    }
    Ok(())
}

/// Validate the serialized size of an input against a byte limit.
///
/// Scalars and empty containers are estimated without serializing.
///
/// # Errors
///
/// Returns `PAYLOAD_TOO_LARGE` (413) if the input exceeds `max_size`.
pub fn validate_input_size(input: &serde_json::Value, max_size: usize) -> Result<(), RpcError> {
    use serde_json::Value;

    let size = match input {
        Value::Null => 4,
        Value::Bool(_) => 5,
        Value::Number(_) => 20,
        Value::String(s) => s.len() + 2,
        Value::Array(arr) if arr.is_empty() => 2,
        Value::Object(obj) if obj.is_empty() => 2,
        _ => serde_json::to_vec(input)?.len(),
    };

    if size > max_size {
        return Err(RpcError::payload_too_large(format!(
            "Input size {} bytes exceeds maximum {} bytes",
            size, max_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_path() {
        for ok in ["add", "users.get", "v1.user_profile.get-all"] {
            assert!(validate_path(ok).is_ok(), "{} should be accepted", ok);
        }
        for bad in ["", ".a", "a.", "a..b", "a b", "a/b"] {
            let err = validate_path(bad).unwrap_err();
            assert_eq!(err.code.as_str(), "CONFIG", "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_validate_input_size() {
        assert!(validate_input_size(&json!(null), 4).is_ok());
        assert!(validate_input_size(&json!({"name": "x"}), 64).is_ok());

        let err = validate_input_size(&json!({"name": "x".repeat(100)}), 64).unwrap_err();
        assert_eq!(err.code.as_str(), "PAYLOAD_TOO_LARGE");
        assert_eq!(err.status_code, 413);
    }

    #[test]
    fn test_rules_collect_every_failure() {
        let result = ValidationRules::new()
            .required("name", "   ")
            .min_length("bio", "ab", 3)
            .max_length("nick", "abcdef", 3)
            .range("age", 200, 0, 150)
            .email("email", "not-an-email")
            .build();

        assert!(!result.is_valid());
        let codes: Vec<_> = result.errors().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(
            codes,
            vec!["required", "min_length", "max_length", "range", "email"]
        );
    }

    #[test]
    fn test_rules_pass() {
        let result = ValidationRules::new()
            .required("name", "Alice")
            .email("email", "alice@example.com")
            .range_f64("ratio", 0.5, 0.0, 1.0)
            .pattern("zip", "12345", r"^\d{5}$")
            .build();
        assert!(result.is_valid());
        assert!(result.errors().is_empty());
    }

    #[test]
    fn test_email_edge_cases() {
        for bad in ["@example.com", "a@", "a@b", "a@b@c.com", "a@.com", "a@b."] {
            let result = ValidationRules::new().email("email", bad).build();
            assert!(!result.is_valid(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let result = ValidationRules::new().pattern("x", "abc", "(").build();
        assert_eq!(result.errors()[0].code, "invalid_pattern");
    }

    #[test]
    fn test_nested_prefixes_fields() {
        struct Inner;
        impl Validate for Inner {
            fn validate(&self) -> ValidationResult {
                ValidationResult::from_errors(vec![FieldError::required("street")])
            }
        }

        let result = ValidationRules::new().nested("address", &Inner).build();
        assert_eq!(result.errors()[0].field, "address.street");
    }

    #[test]
    fn test_vec_merges_element_errors() {
        let values: Vec<Option<()>> = vec![None, Some(())];
        assert!(values.validate().is_valid());
    }

    #[test]
    fn test_errors_by_field() {
        let result = ValidationResult::from_errors(vec![
            FieldError::required("a"),
            FieldError::min_length("a", 2),
            FieldError::required("b"),
        ]);
        let grouped = result.errors_by_field();
        assert_eq!(grouped["a"].len(), 2);
        assert_eq!(grouped["b"].len(), 1);
    }
}
