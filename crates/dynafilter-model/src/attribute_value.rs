//! DynamoDB `AttributeValue` and item helpers.
//!
//! On the wire an attribute value is a single-key object such as
//! `{"S": "hello"}` or `{"N": "42"}`. Numbers stay string-encoded end to end so
//! that no value ever passes through a lossy floating point representation.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An item record: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

/// A primary key map, also used as the pagination cursor (`LastEvaluatedKey`).
pub type Key = HashMap<String, AttributeValue>;

/// Type tags accepted when decoding an attribute value.
const TYPE_TAGS: &[&str] = &["S", "N", "B", "SS", "NS", "BS", "BOOL", "NULL", "L", "M"];

/// DynamoDB attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String value.
    S(String),
    /// Number value, kept as its exact decimal text.
    N(String),
    /// Binary value (base64 on the wire).
    B(bytes::Bytes),
    /// String set.
    Ss(Vec<String>),
    /// Number set.
    Ns(Vec<String>),
    /// Binary set.
    Bs(Vec<bytes::Bytes>),
    /// Boolean value.
    Bool(bool),
    /// Null marker.
    Null(bool),
    /// List of values.
    L(Vec<AttributeValue>),
    /// Nested map.
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Build a string value.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    /// Build a number value from an integer.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::N(value.to_string())
    }

    /// Returns the string if this is an `S` value.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the decimal text if this is an `N` value.
    #[must_use]
    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the nested map if this is an `M` value.
    #[must_use]
    pub fn as_m(&self) -> Option<&HashMap<String, AttributeValue>> {
        match self {
            Self::M(m) => Some(m),
            _ => None,
        }
    }

    /// The DynamoDB type tag (`"S"`, `"N"`, `"BOOL"`, ...).
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }

    /// Render as a plain JSON document, without type tags.
    ///
    /// Integral numbers that fit in `i64` become JSON integers; every other
    /// number is emitted as its exact decimal string.
    #[must_use]
    pub fn to_document(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::S(s) => Value::String(s.clone()),
            Self::N(n) => number_document(n),
            Self::B(b) => Value::String(BASE64.encode(b)),
            Self::Ss(v) => Value::Array(v.iter().cloned().map(Value::String).collect()),
            Self::Ns(v) => Value::Array(v.iter().map(|n| number_document(n)).collect()),
            Self::Bs(v) => Value::Array(v.iter().map(|b| Value::String(BASE64.encode(b))).collect()),
            Self::Bool(b) => Value::Bool(*b),
            Self::Null(_) => Value::Null,
            Self::L(list) => Value::Array(list.iter().map(Self::to_document).collect()),
            Self::M(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_document()))
                    .collect(),
            ),
        }
    }
}

fn number_document(n: &str) -> serde_json::Value {
    n.parse::<i64>().map_or_else(
        |_| serde_json::Value::String(n.to_owned()),
        serde_json::Value::from,
    )
}

/// Look up an attribute by name or dotted document path.
///
/// A top-level attribute whose name literally contains dots wins; otherwise the
/// path is walked through nested maps one segment at a time.
#[must_use]
pub fn lookup_path<'a>(item: &'a Item, path: &str) -> Option<&'a AttributeValue> {
    if let Some(value) = item.get(path) {
        return Some(value);
    }
    let mut segments = path.split('.');
    let mut current = item.get(segments.next()?)?;
    for segment in segments {
        current = current.as_m()?.get(segment)?;
    }
    Some(current)
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => write!(f, "{{S: {s}}}"),
            Self::N(n) => write!(f, "{{N: {n}}}"),
            Self::B(b) => write!(f, "{{B: {} bytes}}", b.len()),
            Self::Ss(v) => write!(f, "{{SS: {v:?}}}"),
            Self::Ns(v) => write!(f, "{{NS: {v:?}}}"),
            Self::Bs(v) => write!(f, "{{BS: {} items}}", v.len()),
            Self::Bool(b) => write!(f, "{{BOOL: {b}}}"),
            Self::Null(b) => write!(f, "{{NULL: {b}}}"),
            Self::L(v) => write!(f, "{{L: {} items}}", v.len()),
            Self::M(m) => write!(f, "{{M: {} keys}}", m.len()),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        let tag = self.type_descriptor();
        match self {
            Self::S(s) | Self::N(s) => map.serialize_entry(tag, s)?,
            Self::Ss(v) | Self::Ns(v) => map.serialize_entry(tag, v)?,
            Self::B(b) => map.serialize_entry(tag, &BASE64.encode(b))?,
            Self::Bs(v) => {
                let encoded: Vec<String> = v.iter().map(|b| BASE64.encode(b)).collect();
                map.serialize_entry(tag, &encoded)?;
            }
            Self::Bool(b) | Self::Null(b) => map.serialize_entry(tag, b)?,
            Self::L(list) => map.serialize_entry(tag, list)?,
            Self::M(m) => map.serialize_entry(tag, m)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeValueVisitor)
    }
}

struct AttributeValueVisitor;

impl<'de> Visitor<'de> for AttributeValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an AttributeValue object with exactly one type key")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let Some(tag) = map.next_key::<String>()? else {
            return Err(de::Error::custom("AttributeValue must have exactly one key"));
        };

        let value = match tag.as_str() {
            "S" => AttributeValue::S(map.next_value()?),
            "N" => AttributeValue::N(map.next_value()?),
            "B" => {
                let encoded: String = map.next_value()?;
                AttributeValue::B(decode_binary(&encoded).map_err(de::Error::custom)?)
            }
            "SS" => AttributeValue::Ss(map.next_value()?),
            "NS" => AttributeValue::Ns(map.next_value()?),
            "BS" => {
                let encoded: Vec<String> = map.next_value()?;
                let decoded = encoded
                    .iter()
                    .map(|e| decode_binary(e))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(de::Error::custom)?;
                AttributeValue::Bs(decoded)
            }
            "BOOL" => AttributeValue::Bool(map.next_value()?),
            "NULL" => AttributeValue::Null(map.next_value()?),
            "L" => AttributeValue::L(map.next_value()?),
            "M" => AttributeValue::M(map.next_value()?),
            other => return Err(de::Error::unknown_field(other, TYPE_TAGS)),
        };

        Ok(value)
    }
}

fn decode_binary(encoded: &str) -> Result<bytes::Bytes, base64::DecodeError> {
    BASE64.decode(encoded).map(bytes::Bytes::from)
}
