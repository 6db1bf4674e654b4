//! Validated storage adapter
//!
//! Pairs a [`KeyValueStorage`] with a [`Schema`]. Reads resolve through the
//! fallback chain *stored value → supplied default → schema-permitted
//! absence*; writes validate before touching the medium. Neither direction
//! panics: every failure comes back as a [`StoreError`].

use crate::app_log;
use crate::error::{StoreError, StoreResult};
use crate::logger::LogLevel;
use crate::persistence::KeyValueStorage;
use crate::schema::Schema;
use serde_json::Value;

/// Read and parse the JSON stored under `key`
///
/// A missing key, or the literal text `undefined`, is absent. Text that is not
/// valid JSON is reported as `CorruptedData`.
pub fn read_raw(storage: &dyn KeyValueStorage, key: &str) -> StoreResult<Option<Value>> {
    let raw = match storage.get_item(key)? {
        Some(raw) => raw,
        None => return Ok(None),
    };

    if raw == "undefined" {
        return Ok(None);
    }

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StoreError::CorruptedData {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Serialize `value` under `key`, or remove the key for falsy values
///
/// `null`, `false`, `0`, `""` and `[]` remove the key so storage never holds
/// empty placeholders.
pub fn write_raw(storage: &dyn KeyValueStorage, key: &str, value: &Value) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey);
    }

    if is_falsy(value) {
        return storage.remove_item(key);
    }

    let raw = serde_json::to_string(value)?;
    storage.set_item(key, &raw).map_err(|e| {
        if let StoreError::QuotaExceeded { .. } = e {
            app_log!(LogLevel::Error, "Storage quota exceeded for key \"{}\"", key);
        }
        e
    })
}

/// Whether a value counts as empty for persistence purposes
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}

/// Read `key` and validate it against `schema`
///
/// Returns `Ok(None)` when the resolved value is "absent" and the schema
/// permits that. When `default_value` is given the caller gets it back in
/// place of any stored value that fails validation or cannot be read.
pub fn read_validated(
    storage: &dyn KeyValueStorage,
    key: &str,
    schema: &Schema,
    default_value: Option<&Value>,
) -> StoreResult<Option<Value>> {
    let stored = match read_raw(storage, key) {
        Ok(stored) => stored,
        Err(e) => {
            app_log!(LogLevel::Error, "Error reading storage key \"{}\": {}", key, e);
            return match default_value {
                Some(default) => Ok(Some(default.clone())),
                None => Err(e),
            };
        }
    };

    match stored {
        None => resolve_absent(key, schema, default_value),
        Some(value) => match schema.validate_value(&value) {
            Ok(()) => Ok(Some(value)),
            Err(validation_error) => match default_value {
                Some(default) => {
                    app_log!(
                        LogLevel::Warn,
                        "Validation failed for \"{}\", using default value: {}",
                        key,
                        validation_error
                    );
                    Ok(Some(default.clone()))
                }
                None => {
                    app_log!(
                        LogLevel::Error,
                        "Validation error for stored data under \"{}\": {}",
                        key,
                        validation_error
                    );
                    Err(StoreError::Validation(validation_error))
                }
            },
        },
    }
}

/// Nothing stored: try the default, then an absent value
fn resolve_absent(
    key: &str,
    schema: &Schema,
    default_value: Option<&Value>,
) -> StoreResult<Option<Value>> {
    if let Some(default) = default_value {
        let default_error = match schema.validate_value(default) {
            Ok(()) => return Ok(Some(default.clone())),
            Err(e) => e,
        };

        app_log!(
            LogLevel::Error,
            "Default value validation error for key \"{}\": {}",
            key,
            default_error
        );

        if schema.validate(None).is_ok() {
            app_log!(
                LogLevel::Warn,
                "For key \"{}\", falling back to an absent value because the default is invalid",
                key
            );
            return Ok(None);
        }

        return Err(StoreError::InvalidDefault {
            key: key.to_string(),
            source: default_error,
        });
    }

    if schema.validate(None).is_ok() {
        Ok(None)
    } else {
        Err(StoreError::NoData {
            key: key.to_string(),
        })
    }
}

/// Validate `value` against `schema` and persist it under `key`
///
/// On validation failure the medium is not touched. Returns the value that was
/// written (or removed, for falsy values).
pub fn write_validated(
    storage: &dyn KeyValueStorage,
    key: &str,
    value: &Value,
    schema: &Schema,
) -> StoreResult<Value> {
    if let Err(validation_error) = schema.validate_value(value) {
        app_log!(
            LogLevel::Error,
            "Validation error for data written to \"{}\": {}",
            key,
            validation_error
        );
        return Err(StoreError::Validation(validation_error));
    }

    write_raw(storage, key, value)?;
    Ok(value.clone())
}
