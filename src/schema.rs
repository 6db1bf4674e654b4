//! Declarative schemas for persisted JSON data
//!
//! A [`Schema`] describes the *persisted* shape of a store's data. Schemas are
//! plain values: they compose (objects, arrays, tuples, enums) and may
//! explicitly permit an absent value through [`Schema::Optional`].
//!
//! Validation never panics; it returns a [`ValidationError`] listing every
//! issue found, each tagged with the dotted path of the offending value.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// A single problem found while validating a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Structured validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Single-issue error at the root path
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(vec![ValidationIssue::new("", message)])
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .issues
            .iter()
            .map(|issue| {
                if issue.path.is_empty() {
                    issue.message.clone()
                } else {
                    format!("{}: {}", issue.path, issue.message)
                }
            })
            .collect();
        f.write_str(&rendered.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Schema-as-data describing a JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Accepts anything, including an absent value
    Any,
    String { min_len: Option<usize> },
    Number,
    Integer,
    Boolean,
    /// Exactly this JSON value
    Literal(Value),
    /// One of the listed string variants
    Enum(Vec<String>),
    Array(Box<Schema>),
    Tuple(Vec<Schema>),
    Object {
        fields: Vec<(String, Schema)>,
        /// Allow keys not listed in `fields`
        passthrough: bool,
    },
    /// Permits an absent value (or a missing object field)
    Optional(Box<Schema>),
    /// Permits JSON `null`
    Nullable(Box<Schema>),
}

impl Schema {
    pub fn any() -> Self {
        Schema::Any
    }

    pub fn string() -> Self {
        Schema::String { min_len: None }
    }

    /// String with at least `min_len` characters
    pub fn non_empty_string(min_len: usize) -> Self {
        Schema::String {
            min_len: Some(min_len),
        }
    }

    pub fn number() -> Self {
        Schema::Number
    }

    pub fn integer() -> Self {
        Schema::Integer
    }

    pub fn boolean() -> Self {
        Schema::Boolean
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Schema::Literal(value.into())
    }

    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Schema::Enum(variants.into_iter().map(Into::into).collect())
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn tuple(items: impl IntoIterator<Item = Schema>) -> Self {
        Schema::Tuple(items.into_iter().collect())
    }

    /// Strict object: unknown keys are rejected
    pub fn object<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Schema)>,
        S: Into<String>,
    {
        Schema::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            passthrough: false,
        }
    }

    /// Allow unknown keys on an object schema
    pub fn passthrough(self) -> Self {
        match self {
            Schema::Object { fields, .. } => Schema::Object {
                fields,
                passthrough: true,
            },
            other => other,
        }
    }

    pub fn optional(self) -> Self {
        match self {
            Schema::Optional(_) => self,
            other => Schema::Optional(Box::new(other)),
        }
    }

    pub fn nullable(self) -> Self {
        Schema::Nullable(Box::new(self))
    }

    /// Whether an absent value is acceptable
    pub fn permits_absent(&self) -> bool {
        matches!(self, Schema::Any | Schema::Optional(_))
    }

    /// Validate a possibly absent value
    ///
    /// `None` stands for "no value at all" and only passes schemas that
    /// permit absence.
    pub fn validate(&self, value: Option<&Value>) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        self.check(value, "", &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }

    /// Validate a present value
    pub fn validate_value(&self, value: &Value) -> Result<(), ValidationError> {
        self.validate(Some(value))
    }

    fn check(&self, value: Option<&Value>, path: &str, issues: &mut Vec<ValidationIssue>) {
        let value = match (self, value) {
            (Schema::Any, _) => return,
            (Schema::Optional(_), None) => return,
            (Schema::Optional(inner), Some(v)) => return inner.check(Some(v), path, issues),
            (_, None) => {
                issues.push(ValidationIssue::new(path, "required value is missing"));
                return;
            }
            (_, Some(v)) => v,
        };

        match self {
            Schema::Any | Schema::Optional(_) => {}
            Schema::Nullable(inner) => {
                if !value.is_null() {
                    inner.check(Some(value), path, issues);
                }
            }
            Schema::String { min_len } => match value.as_str() {
                Some(s) => {
                    if let Some(min) = min_len {
                        if s.chars().count() < *min {
                            issues.push(ValidationIssue::new(
                                path,
                                format!("expected at least {} characters", min),
                            ));
                        }
                    }
                }
                None => issues.push(expected(path, "string", value)),
            },
            Schema::Number => {
                if !value.is_number() {
                    issues.push(expected(path, "number", value));
                }
            }
            Schema::Integer => {
                if !(value.is_i64() || value.is_u64()) {
                    issues.push(expected(path, "integer", value));
                }
            }
            Schema::Boolean => {
                if !value.is_boolean() {
                    issues.push(expected(path, "boolean", value));
                }
            }
            Schema::Literal(literal) => {
                if value != literal {
                    issues.push(ValidationIssue::new(
                        path,
                        format!("expected literal {}", literal),
                    ));
                }
            }
            Schema::Enum(variants) => match value.as_str() {
                Some(s) if variants.iter().any(|v| v == s) => {}
                _ => issues.push(ValidationIssue::new(
                    path,
                    format!("expected one of [{}]", variants.join(", ")),
                )),
            },
            Schema::Array(items) => match value.as_array() {
                Some(elements) => {
                    for (index, element) in elements.iter().enumerate() {
                        items.check(Some(element), &join_path(path, &index.to_string()), issues);
                    }
                }
                None => issues.push(expected(path, "array", value)),
            },
            Schema::Tuple(items) => match value.as_array() {
                Some(elements) if elements.len() == items.len() => {
                    for (index, (schema, element)) in items.iter().zip(elements).enumerate() {
                        schema.check(Some(element), &join_path(path, &index.to_string()), issues);
                    }
                }
                Some(elements) => issues.push(ValidationIssue::new(
                    path,
                    format!(
                        "expected tuple of {} elements, received {}",
                        items.len(),
                        elements.len()
                    ),
                )),
                None => issues.push(expected(path, "tuple", value)),
            },
            Schema::Object {
                fields,
                passthrough,
            } => match value.as_object() {
                Some(map) => {
                    for (name, schema) in fields {
                        schema.check(map.get(name), &join_path(path, name), issues);
                    }
                    if !passthrough {
                        for key in map.keys() {
                            if !fields.iter().any(|(name, _)| name == key) {
                                issues.push(ValidationIssue::new(
                                    join_path(path, key),
                                    "unrecognized key",
                                ));
                            }
                        }
                    }
                }
                None => issues.push(expected(path, "object", value)),
            },
        }
    }
}

fn join_path(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", base, segment)
    }
}

fn expected(path: &str, kind: &str, received: &Value) -> ValidationIssue {
    ValidationIssue::new(
        path,
        format!("expected {}, received {}", kind, type_name(received)),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate `input` against `schema` and deserialize it into `T`
pub fn validate_with_schema<T: DeserializeOwned>(
    input: &Value,
    schema: &Schema,
) -> Result<T, ValidationError> {
    schema.validate_value(input)?;
    serde_json::from_value(input.clone()).map_err(|e| ValidationError::message(e.to_string()))
}
