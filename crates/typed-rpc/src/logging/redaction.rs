//! Sensitive data redaction for logged values.

use super::config::LogConfig;
use serde_json::{Map, Value};

/// Replaces values of sensitive keys, recursing through objects and arrays.
///
/// Key matching is case-insensitive: a key is sensitive when it contains any
/// configured field name.
#[derive(Debug, Clone)]
pub struct RedactionEngine {
    fields_lower: Vec<String>,
    replacement: String,
}

impl RedactionEngine {
    /// Build an engine from a logging configuration.
    pub fn new(config: &LogConfig) -> Self {
        Self::with_fields(
            config.redacted_fields.iter(),
            config.redaction_replacement.clone(),
        )
    }

    /// Build an engine from explicit field names.
    pub fn with_fields(
        fields: impl IntoIterator<Item = impl AsRef<str>>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            fields_lower: fields
                .into_iter()
                .map(|f| f.as_ref().to_lowercase())
                .collect(),
            replacement: replacement.into(),
        }
    }

    /// Whether a key names a sensitive field.
    pub fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.fields_lower.iter().any(|field| key.contains(field.as_str()))
    }

    /// A redacted copy of `value`.
    pub fn redact(&self, value: &Value) -> Value {
        self.redact_changed(value).unwrap_or_else(|| value.clone())
    }

    /// `None` when nothing needed redacting, so untouched subtrees are not rebuilt.
    fn redact_changed(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Object(map) => {
                let changed: Vec<(usize, Value)> = map
                    .iter()
                    .enumerate()
                    .filter_map(|(i, (key, val))| {
                        if self.is_sensitive(key) {
                            Some((i, Value::String(self.replacement.clone())))
                        } else {
                            self.redact_changed(val).map(|v| (i, v))
                        }
                    })
                    .collect();
                if changed.is_empty() {
                    return None;
                }

                let mut replacements = changed.into_iter().peekable();
                let mut out = Map::with_capacity(map.len());
                for (i, (key, val)) in map.iter().enumerate() {
                    let val = match replacements.next_if(|(j, _)| *j == i) {
                        Some((_, redacted)) => redacted,
                        None => val.clone(),
                    };
                    out.insert(key.clone(), val);
                }
                Some(Value::Object(out))
            }
            Value::Array(items) => {
                let redacted: Vec<Option<Value>> =
                    items.iter().map(|item| self.redact_changed(item)).collect();
                if redacted.iter().all(Option::is_none) {
                    return None;
                }
                Some(Value::Array(
                    redacted
                        .into_iter()
                        .zip(items)
                        .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
                        .collect(),
                ))
            }
            _ => None,
        }
    }
}

/// Redact `value` with the fields from `config`.
pub fn redact_value(value: &Value, config: &LogConfig) -> Value {
    RedactionEngine::new(config).redact(value)
}
