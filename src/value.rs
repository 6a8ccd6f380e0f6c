//! Dynamic value tree carried inside forwarded records.
//!
//! [`DynamicValue`] is a closed set of variants covering everything a
//! Fluentd record may contain. Records themselves are [`Mapping`]s: ordered
//! `(key, value)` pairs whose keys are always strings. Ordering is preserved
//! on the wire and duplicate keys are passed through untouched.


/// Ordered key/value pairs forming a MessagePack map.
pub type Mapping = Vec<(String, DynamicValue)>;

/// A value that can be encoded into a Fluentd record.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DynamicValue {
    /// Explicit nil; never omitted from the encoded map.
    #[default]
    Null,
    Bool(bool),
    /// Signed integer, encoded in the narrowest MessagePack int format.
    Int(i64),
    /// Unsigned integer, encoded in the narrowest MessagePack uint format.
    UInt(u64),
    Float(f64),
    String(String),
    /// Raw bytes; see [`BinaryEncoding`](crate::encoder::BinaryEncoding).
    Binary(Vec<u8>),
    Mapping(Mapping),
    Sequence(Vec<DynamicValue>),
}

impl DynamicValue {
    /// Build a mapping value from `(key, value)` pairs.
    pub fn mapping<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<DynamicValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Mapping(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Return `true` for [`DynamicValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

macro_rules! from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for DynamicValue {
            fn from(value: $ty) -> Self {
                Self::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for DynamicValue {
            fn from(value: $ty) -> Self {
                Self::UInt(u64::from(value))
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64);
from_unsigned!(u8, u16, u32, u64);

impl From<bool> for DynamicValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for DynamicValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for DynamicValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for DynamicValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for DynamicValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<Vec<u8>> for DynamicValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl<T: Into<DynamicValue>> From<Option<T>> for DynamicValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Vec<DynamicValue>> for DynamicValue {
    fn from(value: Vec<DynamicValue>) -> Self {
        Self::Sequence(value)
    }
}

impl From<Mapping> for DynamicValue {
    fn from(value: Mapping) -> Self {
        Self::Mapping(value)
    }
}

/// Convert a JSON document, typically a structured property bag.
///
/// Object key order follows `serde_json`'s map iteration order. Numbers map
/// to `UInt` when non-negative integers, `Int` when negative, else `Float`.
impl From<serde_json::Value> for DynamicValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    n.as_f64().map_or(Self::Null, Self::Float)
                }
            }
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::mapping(map),
        }
    }
}
