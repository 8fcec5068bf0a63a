//! Dynamic values and property keys.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value as JsonValue;

use super::target::{Target, TargetKind};
use super::wrapper::{reactive, Reactive};
use crate::error::{Error, Result};
use crate::reactive::TargetId;

/// Upper bound on list lengths. Indices must be below it.
pub const MAX_LIST_LEN: usize = 1 << 24;

/// Integral numbers inside this range snapshot as JSON integers.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A value stored in a record field or list slot.
///
/// Equality is strict: numbers compare with IEEE `==` (so `NaN` never equals
/// itself), strings by content and objects by target identity.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(Target),
}

impl Value {
    /// Strict equality, used to decide whether a write changed anything.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_target(&self) -> Option<&Target> {
        match self {
            Value::Object(target) => Some(target),
            _ => None,
        }
    }

    /// Reactive view of an object value; `None` for primitives.
    pub fn as_reactive(&self) -> Option<Reactive> {
        self.as_target().map(reactive)
    }

    /// Interpret the value as a list length.
    pub(crate) fn as_length(&self) -> Option<usize> {
        match self {
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= MAX_LIST_LEN as f64 => {
                Some(*n as usize)
            }
            _ => None,
        }
    }

    /// Deep copy to JSON without tracking.
    pub fn snapshot(&self) -> Result<JsonValue> {
        self.snapshot_guarded(&mut HashSet::new())
    }

    pub(crate) fn snapshot_guarded(&self, visiting: &mut HashSet<TargetId>) -> Result<JsonValue> {
        Ok(match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                JsonValue::from(*n as i64)
            }
            Value::Number(n) => serde_json::Number::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Object(target) => target.snapshot_guarded(visiting)?,
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
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

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

from_integer!(i32, i64, u32, u64, usize);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Target> for Value {
    fn from(target: Target) -> Self {
        Value::Object(target)
    }
}

impl From<&Target> for Value {
    fn from(target: &Target) -> Self {
        Value::Object(target.clone())
    }
}

/// Stores the raw target, never the view.
impl From<Reactive> for Value {
    fn from(view: Reactive) -> Self {
        Value::Object(view.to_raw())
    }
}

impl From<&Reactive> for Value {
    fn from(view: &Reactive) -> Self {
        Value::Object(view.to_raw())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Builds fresh raw targets for arrays and objects.
impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::Object(Target::from_values(items)),
            JsonValue::Object(fields) => Value::Object(Target::from_fields(fields)),
        }
    }
}

/// A property key.
///
/// Keys are normalised per target kind before use, see
/// [`Target::normalize_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named record field.
    Field(String),
    /// A list slot.
    Index(usize),
    /// The length of a list.
    Length,
    /// Synthetic key for the set of fields of a record.
    Keys,
    /// The single slot of a ref or computed cell.
    Value,
}

impl Key {
    pub(crate) fn normalize(self, kind: TargetKind) -> Result<Key> {
        match (kind, self) {
            (TargetKind::Record, Key::Field(name)) => Ok(Key::Field(name)),
            (TargetKind::Record, Key::Index(i)) => Ok(Key::Field(i.to_string())),
            (TargetKind::Record, Key::Length) => Ok(Key::Field("length".to_owned())),
            (TargetKind::Record, Key::Value) => Ok(Key::Field("value".to_owned())),
            (TargetKind::List, Key::Field(name)) if name == "length" => Ok(Key::Length),
            (TargetKind::List, Key::Field(name)) => match name.parse::<usize>() {
                // Only canonical spellings: "01" is a field name, not an index.
                Ok(i) if i < MAX_LIST_LEN && i.to_string() == name => Ok(Key::Index(i)),
                _ => Err(Error::InvalidKey {
                    key: Key::Field(name),
                    kind,
                }),
            },
            (TargetKind::List, Key::Index(i)) if i < MAX_LIST_LEN => Ok(Key::Index(i)),
            (TargetKind::List, Key::Length) => Ok(Key::Length),
            (kind, key) => Err(Error::InvalidKey { key, kind }),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => write!(f, "{name:?}"),
            Key::Index(i) => write!(f, "[{i}]"),
            Key::Length => f.write_str("length"),
            Key::Keys => f.write_str("<keys>"),
            Key::Value => f.write_str("value"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}
