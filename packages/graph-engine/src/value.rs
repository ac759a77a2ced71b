//! Keys and resolver outputs

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier of a backing collection ("users", "reviews_by_repo", ...)
pub type CollectionId = String;

/// Key of a record inside a backing collection
///
/// Canonical decimal strings normalize to [`Key::Int`], so the `"1"` of an
/// `ID` argument and the `1` of a foreign key name the same record. Other
/// spellings of a number (`"007"`, `"+7"`) stay strings and round-trip
/// unchanged. Deserialization applies the same rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Str(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKey {
    Int(i64),
    Str(String),
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawKey::deserialize(deserializer)? {
            RawKey::Int(i) => Self::Int(i),
            RawKey::Str(s) => Self::from(s),
        })
    }
}

impl Key {
    /// Build a key from a JSON number or string
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::from(s.as_str())),
            _ => None,
        }
    }

    /// Convert back into JSON
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Str(s) => Value::from(s.clone()),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Key {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(i) if i.to_string() == s => Self::Int(i),
            _ => Self::Str(s.to_string()),
        }
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Output of a field resolver before it is completed against the schema
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Absent value
    Null,
    /// A scalar, or an object that child selections read from
    Value(Value),
    /// A list whose items complete independently
    List(Vec<Resolved>),
    /// A value of an abstract type, carrying the tag union resolution maps
    Tagged { tag: String, value: Value },
}

impl Resolved {
    /// Tag a value for union or interface resolution
    pub fn tagged(tag: impl Into<String>, value: Value) -> Self {
        Self::Tagged {
            tag: tag.into(),
            value,
        }
    }

    /// The runtime tag of this instance, if any
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Tagged { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Value(Value::Null))
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            other => Self::Value(other),
        }
    }
}

impl<T: Into<Resolved>> From<Option<T>> for Resolved {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Resolved>> From<Vec<T>> for Resolved {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Resolved {
    fn from(s: &str) -> Self {
        Self::Value(Value::from(s))
    }
}

impl From<String> for Resolved {
    fn from(s: String) -> Self {
        Self::Value(Value::from(s))
    }
}
