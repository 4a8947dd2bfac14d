use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use serde_json::Value;

use crate::convert::decode_local;
use crate::error::ConvertError;
use crate::schema::{ScalarType, SchemaTable};

/// Wire-format object exchanged with the upstream API.
pub type RemoteObject = serde_json::Map<String, Value>;

/// A typed leaf value in the local model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::Bool(_) => ScalarType::Bool,
            Scalar::Integer(_) => ScalarType::Integer,
            Scalar::Float(_) => ScalarType::Float,
            Scalar::String(_) => ScalarType::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Empty strings count as "no value"; every other scalar is a value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Scalar::String(s) if s.is_empty())
    }

    /// Total order used when sorting entries by identity value.
    pub fn sort_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Integer(a), Scalar::Integer(b)) => a.cmp(b),
            (Scalar::String(a), Scalar::String(b)) => a.cmp(b),
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.type_rank().cmp(&b.type_rank()),
            },
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Integer(n) => Some(*n as f64),
            Scalar::Float(n) => Some(*n),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Scalar::Bool(_) => 0,
            Scalar::Integer(_) | Scalar::Float(_) => 1,
            Scalar::String(_) => 2,
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Integer(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// Value of one field in the local model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LocalValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
    Blocks(Vec<LocalObject>),
}

impl LocalValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            LocalValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Scalar]> {
        match self {
            LocalValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_blocks(&self) -> Option<&[LocalObject]> {
        match self {
            LocalValue::Blocks(entries) => Some(entries),
            _ => None,
        }
    }

    /// True when the value carries nothing worth preserving.
    pub fn is_empty(&self) -> bool {
        match self {
            LocalValue::Scalar(s) => s.is_empty(),
            LocalValue::List(items) => items.is_empty(),
            LocalValue::Blocks(entries) => entries.is_empty(),
        }
    }
}

impl From<Scalar> for LocalValue {
    fn from(value: Scalar) -> Self {
        LocalValue::Scalar(value)
    }
}

impl From<&str> for LocalValue {
    fn from(value: &str) -> Self {
        LocalValue::Scalar(value.into())
    }
}

impl From<String> for LocalValue {
    fn from(value: String) -> Self {
        LocalValue::Scalar(value.into())
    }
}

impl From<i64> for LocalValue {
    fn from(value: i64) -> Self {
        LocalValue::Scalar(value.into())
    }
}

impl From<i32> for LocalValue {
    fn from(value: i32) -> Self {
        LocalValue::Scalar(value.into())
    }
}

impl From<f64> for LocalValue {
    fn from(value: f64) -> Self {
        LocalValue::Scalar(value.into())
    }
}

impl From<bool> for LocalValue {
    fn from(value: bool) -> Self {
        LocalValue::Scalar(value.into())
    }
}

impl From<Vec<Scalar>> for LocalValue {
    fn from(value: Vec<Scalar>) -> Self {
        LocalValue::List(value)
    }
}

impl From<Vec<LocalObject>> for LocalValue {
    fn from(value: Vec<LocalObject>) -> Self {
        LocalValue::Blocks(value)
    }
}

/// Caller-facing, typed representation of one configuration object.
///
/// Fields are keyed by local name and kept sorted, so equality and
/// serialization do not depend on insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct LocalObject {
    fields: BTreeMap<String, LocalValue>,
}

impl LocalObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<LocalValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: LocalValue) -> Option<LocalValue> {
        self.fields.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<LocalValue> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&LocalValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn scalar(&self, name: &str) -> Option<&Scalar> {
        self.get(name).and_then(LocalValue::as_scalar)
    }

    pub fn blocks(&self, name: &str) -> Option<&[LocalObject]> {
        self.get(name).and_then(LocalValue::as_blocks)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LocalValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Decode local JSON (local names, typed values) against `table`.
    pub fn from_json(value: &Value, table: &SchemaTable) -> Result<Self, ConvertError> {
        decode_local(value, table)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl FromIterator<(String, LocalValue)> for LocalObject {
    fn from_iter<I: IntoIterator<Item = (String, LocalValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
