#![deny(missing_docs)]

//! # Schema Seam
//!
//! The contract never inspects values itself. Every check goes through the
//! [`Schema`] trait, which turns a raw JSON value into a validated (and possibly
//! coerced or stripped) value, or a structured [`ValidationError`].
//!
//! Adapters shipped here:
//! - [`typed`]: round-trips through a `serde` type. Unknown fields are dropped.
//! - [`coerced`]: like `typed`, but a numeric string is accepted wherever the
//!   type expects a number. Fields typed as strings keep their text.
//! - [`empty_object`]: accepts any object and yields `{}`.
//! - [`any`]: passes values through.
//!
//! Any `Fn(&Value) -> Result<Value, ValidationError>` closure is a schema too.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use serde_path_to_error::Segment;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A validator able to check a value's shape and produce its normalized form.
pub trait Schema: Send + Sync + 'static {
    /// Validates `value`, returning the coerced value on success.
    fn validate(&self, value: &Value) -> Result<Value, ValidationError>;

    /// Human readable name, used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Shared handle to a schema, as stored in a contract.
pub type SchemaRef = Arc<dyn Schema>;

impl fmt::Debug for dyn Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema({})", self.name())
    }
}

impl<F> Schema for F
where
    F: Fn(&Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
{
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self(value)
    }
}

/// A single problem found while validating a value.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Issue {
    /// Location of the offending value (object keys / array indices). Empty means the root.
    pub path: Vec<String>,
    /// What went wrong.
    pub message: String,
}

/// Structured failure produced by a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationError {
    /// Every issue reported by the schema. Never empty.
    pub issues: Vec<Issue>,
}

impl ValidationError {
    /// Creates an error with one issue at the root.
    pub fn new(message: impl Into<String>) -> Self {
        Self::at(Vec::new(), message)
    }

    /// Creates an error with one issue at `path`.
    pub fn at(path: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![Issue {
                path,
                message: message.into(),
            }],
        }
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
                    format!("{}: {}", issue.path.join("."), issue.message)
                }
            })
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for ValidationError {}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Schema backed by a `serde` type.
pub struct TypedSchema<T> {
    coerce_strings: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    /// Strict schema: the value must deserialize into `T` as is.
    pub fn new() -> Self {
        Self {
            coerce_strings: false,
            _marker: PhantomData,
        }
    }

    /// Lenient schema: numeric strings may stand in for numbers.
    pub fn coercing() -> Self {
        Self {
            coerce_strings: true,
            _marker: PhantomData,
        }
    }

    fn deserialize(value: Value) -> Result<T, serde_path_to_error::Error<serde_json::Error>> {
        serde_path_to_error::deserialize(value)
    }
}

impl<T> Default for TypedSchema<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let mut current = value.clone();
        let mut first: Option<ValidationError> = None;
        // Each retry turns one more string into a number, so this terminates.
        loop {
            match Self::deserialize(current.clone()) {
                Ok(typed) => return Ok(serde_json::to_value(&typed)?),
                Err(e) => {
                    let coerced = self.coerce_strings && coerce_at(&mut current, e.path());
                    let first = first.get_or_insert_with(|| issue_from(&e));
                    if !coerced {
                        return Err(first.clone());
                    }
                }
            }
        }
    }

    fn name(&self) -> &str {
        std::any::type_name::<T>()
    }
}

fn issue_from(e: &serde_path_to_error::Error<serde_json::Error>) -> ValidationError {
    let path = e
        .path()
        .iter()
        .filter_map(|segment| match segment {
            Segment::Map { key } => Some(key.clone()),
            Segment::Seq { index } => Some(index.to_string()),
            Segment::Enum { variant } => Some(variant.clone()),
            Segment::Unknown => None,
        })
        .collect();
    ValidationError::at(path, e.inner().to_string())
}

/// Replaces the numeric string found at `path` with its number.
///
/// Returns false when nothing there can be coerced.
fn coerce_at(value: &mut Value, path: &serde_path_to_error::Path) -> bool {
    let mut target = value;
    for segment in path.iter() {
        let next = match segment {
            Segment::Map { key } => target.get_mut(key.as_str()),
            Segment::Seq { index } => target.get_mut(*index),
            Segment::Enum { .. } | Segment::Unknown => None,
        };
        match next {
            Some(next) => target = next,
            None => return false,
        }
    }
    let Value::String(s) = &*target else {
        return false;
    };
    let number = match s.parse::<i64>() {
        Ok(i) => Some(Number::from(i)),
        Err(_) => s.parse::<f64>().ok().and_then(Number::from_f64),
    };
    match number {
        Some(n) => {
            *target = Value::Number(n);
            true
        }
        None => false,
    }
}

struct EmptyObject;

impl Schema for EmptyObject {
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        match value {
            Value::Object(_) | Value::Null => Ok(Value::Object(Map::new())),
            other => Err(ValidationError::new(format!(
                "expected object, received {}",
                kind_of(other)
            ))),
        }
    }

    fn name(&self) -> &str {
        "empty_object"
    }
}

struct Passthrough;

impl Schema for Passthrough {
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        Ok(value.clone())
    }

    fn name(&self) -> &str {
        "any"
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strict schema for `T`.
pub fn typed<T>() -> SchemaRef
where
    T: DeserializeOwned + Serialize + 'static,
{
    Arc::new(TypedSchema::<T>::new())
}

/// Schema for `T` that also accepts numeric strings where numbers are expected.
///
/// Path and query values always arrive as strings; use this for them.
pub fn coerced<T>() -> SchemaRef
where
    T: DeserializeOwned + Serialize + 'static,
{
    Arc::new(TypedSchema::<T>::coercing())
}

/// Schema accepting any object and stripping all of its keys.
pub fn empty_object() -> SchemaRef {
    Arc::new(EmptyObject)
}

/// Schema accepting anything unchanged.
pub fn any() -> SchemaRef {
    Arc::new(Passthrough)
}

/// Wraps a closure as a schema.
pub fn from_fn<F>(f: F) -> SchemaRef
where
    F: Fn(&Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
{
    Arc::new(f)
}
