//! # Context values
//!
//! Templates are rendered against a tree of [`Value`]s. Values are usually
//! built from JSON (`serde_json::Value` converts losslessly) but the enum also
//! carries two engine-only variants:
//!
//! - [`Value::Iter`]: the per-element loop metadata exposed through `{{#}}`
//!   and `{{##}}`.
//! - [`Value::Object`]: a host object exposing a [`MethodTable`], which is
//!   what the `call` filter dispatches against.
//!
//! [`Value::Undefined`] stands for "no binding". The engine renders it as the
//! `???` placeholder, which keeps unresolved bindings visible in the output.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::FilterError;

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;

/// Largest digit count accepted by `to_fixed`, `to_precision` and `fix`.
pub(crate) const MAX_FRACTION_DIGITS: usize = 100;

/// An ordered mapping from names to values.
pub type Map = IndexMap<String, Value>;

/// Loop metadata for one element of an iterated sequence.
///
/// The sign records whether the directive that produced it was `#` (zero
/// based) or `##` (one based); it only affects the numeric projection
/// returned by [`Iteration::position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iteration {
    index: usize,
    size: usize,
    sign: usize,
}

impl Iteration {
    /// Creates metadata for the element at `index` of a sequence of `size`.
    pub fn new(index: usize, size: usize) -> Self {
        Self {
            index,
            size,
            sign: 1,
        }
    }

    /// Returns a copy projected through the given loop-counter sign (`#` or `##`).
    pub fn with_sign(self, sign: &str) -> Self {
        Self {
            sign: sign.chars().filter(|c| *c == '#').count().clamp(1, 2),
            ..self
        }
    }

    /// Zero-based position of the element.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of elements in the iterated sequence.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this is the first element.
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    /// Whether this is the last element.
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.size
    }

    /// The numeric projection: zero based for `#`, one based for `##`.
    pub fn position(&self) -> usize {
        self.index + self.sign - 1
    }
}

/// Capability for host objects placed in a context.
///
/// Instead of reflecting over arbitrary objects, a context value opts in to
/// method dispatch by implementing this trait. The `call` filter is typed
/// against it, and path segments resolve through [`MethodTable::get`].
///
/// # Examples
///
/// ```rust
/// use markup_engine::{FilterError, MethodTable, Value};
///
/// struct Dog;
///
/// impl MethodTable for Dog {
///     fn type_name(&self) -> &str {
///         "Dog"
///     }
///
///     fn call(&self, method: &str, _args: &[String]) -> Result<Value, FilterError> {
///         match method {
///             "greet" => Ok(Value::from("Woof!")),
///             _ => Err(FilterError::MethodNotFound { method: method.to_string() }),
///         }
///     }
/// }
///
/// let dog = Value::object(Dog);
/// assert_eq!(dog.call_method("greet", &[]).unwrap(), Value::from("Woof!"));
/// ```
pub trait MethodTable: Send + Sync {
    /// Short name used in diagnostics and the default display form.
    fn type_name(&self) -> &str;

    /// Invokes a named operation with raw string arguments.
    fn call(&self, method: &str, args: &[String]) -> Result<Value, FilterError>;

    /// Resolves a named property, used by dotted paths and block contexts.
    fn get(&self, _property: &str) -> Option<Value> {
        None
    }

    /// Text substituted when the object itself is rendered.
    fn display(&self) -> String {
        format!("[{}]", self.type_name())
    }
}

/// A value in a rendering context or flowing through a filter pipeline.
#[derive(Clone, Default)]
pub enum Value {
    /// No binding. Renders as the `???` placeholder.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Map(Map),
    /// Loop metadata, only ever created by the engine.
    Iter(Iteration),
    /// A host object with a method table.
    Object(Arc<dyn MethodTable>),
}

impl Value {
    /// Wraps a host object implementing [`MethodTable`].
    pub fn object<T: MethodTable + 'static>(table: T) -> Self {
        Value::Object(Arc::new(table))
    }

    /// Converts any serializable data into a value via its JSON form.
    ///
    /// Data that cannot be represented as JSON becomes [`Value::Undefined`].
    pub fn from_serialize<T: Serialize>(data: &T) -> Self {
        serde_json::to_value(data)
            .map(Value::from)
            .unwrap_or(Value::Undefined)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True only for the literal boolean `false`.
    ///
    /// Filtered conditionals select their else branch on exactly this.
    pub fn is_false(&self) -> bool {
        matches!(self, Value::Bool(false))
    }

    /// Presence and non-emptiness test used by unfiltered conditionals.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Map(_) | Value::Iter(_) | Value::Object(_) => true,
        }
    }

    /// Numeric interpretation, if the value has one.
    ///
    /// Strings are trimmed and parsed; iterator metadata yields its position.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Iter(iter) => Some(iter.position() as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Element count of sequences, strings and maps, or the size of a loop.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            Value::Iter(iter) => Some(iter.size()),
            _ => None,
        }
    }

    /// Looks up one path segment below this value.
    ///
    /// Numeric segments index sequences, names look up map keys or object
    /// properties. Loop metadata exposes `index`, `size`, `first` and `last`.
    pub fn child(&self, segment: &str) -> Option<Cow<'_, Value>> {
        match self {
            Value::Map(map) => map.get(segment).map(Cow::Borrowed),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .map(Cow::Borrowed),
            Value::Object(table) => table.get(segment).map(Cow::Owned),
            Value::Iter(iter) => match segment {
                "index" => Some(Cow::Owned(Value::from(iter.index()))),
                "size" => Some(Cow::Owned(Value::from(iter.size()))),
                "first" => Some(Cow::Owned(Value::Bool(iter.is_first()))),
                "last" => Some(Cow::Owned(Value::Bool(iter.is_last()))),
                _ => None,
            },
            _ => None,
        }
    }

    /// Dispatches a named method through the value's method table.
    ///
    /// Host objects use their own [`MethodTable`]. Plain values expose a
    /// fixed set: `to_fixed`, `to_precision`, `to_uppercase`, `to_lowercase`,
    /// `trim`, `join` and `len`.
    pub fn call_method(&self, method: &str, args: &[String]) -> Result<Value, FilterError> {
        if let Value::Object(table) = self {
            return table.call(method, args);
        }

        let not_found = || FilterError::MethodNotFound {
            method: method.to_string(),
        };
        let digits = |position: usize| -> Result<usize, FilterError> {
            let raw = args.get(position).map(|a| a.trim()).unwrap_or("0");
            match raw.parse::<usize>() {
                Ok(n) if n <= MAX_FRACTION_DIGITS => Ok(n),
                _ => Err(FilterError::InvalidArgument {
                    filter: format!("call>{method}"),
                    argument: raw.to_string(),
                    reason: format!("expected an integer from 0 to {MAX_FRACTION_DIGITS}"),
                }),
            }
        };

        match method {
            "to_fixed" => {
                let n = self.as_number().ok_or_else(not_found)?;
                Ok(Value::String(format!("{:.*}", digits(0)?, n)))
            }
            "to_precision" => {
                let n = self.as_number().ok_or_else(not_found)?;
                let precision = digits(0)?.max(1);
                let magnitude = if n == 0.0 {
                    0
                } else {
                    n.abs().log10().floor() as i32
                };
                let decimals = (precision as i32 - 1 - magnitude).max(0) as usize;
                Ok(Value::String(format!("{:.*}", decimals, n)))
            }
            "to_uppercase" => Ok(Value::String(self.to_string().to_uppercase())),
            "to_lowercase" => Ok(Value::String(self.to_string().to_lowercase())),
            "trim" => Ok(Value::String(self.to_string().trim().to_string())),
            "join" => {
                let items = self.as_array().ok_or_else(not_found)?;
                let separator = args.first().map(String::as_str).unwrap_or(",");
                Ok(Value::String(
                    items
                        .iter()
                        .map(Value::to_string)
                        .collect::<Vec<_>>()
                        .join(separator),
                ))
            }
            "len" => self.len().map(Value::from).ok_or_else(not_found),
            _ => Err(not_found()),
        }
    }

    /// Converts to JSON. Engine-only variants become their display form.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Iter(iter) => Json::from(iter.position()),
            Value::Object(table) => Json::String(table.display()),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => Ok(()),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Map(_) => write!(f, "{}", self.to_json()),
            Value::Iter(iter) => write!(f, "{}", iter.position()),
            Value::Object(table) => f.write_str(&table.display()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Iter(iter) => f.debug_tuple("Iter").field(iter).finish(),
            Value::Object(table) => f.debug_tuple("Object").field(&table.type_name()).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Iter(a), Value::Iter(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
            }
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Iteration> for Value {
    fn from(iter: Iteration) -> Self {
        Value::Iter(iter)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
