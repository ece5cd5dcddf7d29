use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

///
/// ObjectId
///
/// Handle of an instance inside a `Graph` arena.
/// Relationship fields store handles, never the instances themselves.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[display("#{_0}")]
pub struct ObjectId(pub(crate) usize);

impl ObjectId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

///
/// ValueKind
///
/// Coarse type tag of a `Value`, used in diagnostics.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[remain::sorted]
pub enum ValueKind {
    #[display("boolean")]
    Bool,
    #[display("float")]
    Float,
    #[display("integer")]
    Int,
    #[display("list")]
    List,
    #[display("dict")]
    Map,
    #[display("null")]
    Null,
    #[display("object")]
    Object,
    #[display("text")]
    Text,
}

///
/// Value
///
/// Dynamic field value flowing through modifier chains.
///
/// Null     → absent or explicitly cleared.
/// Map      → dict or shape payloads; keys are kept in canonical order.
/// Object   → handle of a nested or linked instance.
///

#[derive(Clone, Debug, Default, PartialEq)]
#[remain::sorted]
pub enum Value {
    Bool(bool),
    Float(f64),
    Int(i64),
    List(Vec<Self>),
    Map(BTreeMap<String, Self>),
    #[default]
    Null,
    Object(ObjectId),
    Text(String),
}

impl Value {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Float(_) => ValueKind::Float,
            Self::Int(_) => ValueKind::Int,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
            Self::Null => ValueKind::Null,
            Self::Object(_) => ValueKind::Object,
            Self::Text(_) => ValueKind::Text,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Length for length-bearing values (text in chars, lists, dicts).
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Text(s) => Some(s.chars().count()),
            Self::List(items) => Some(items.len()),
            Self::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Object handles held directly by this value, in order, without duplicates.
    ///
    /// Only a single handle or a list of handles counts; handles nested
    /// deeper are owned by their own fields.
    #[must_use]
    pub fn object_handles(&self) -> Vec<ObjectId> {
        let mut out = Vec::new();
        match self {
            Self::Object(id) => out.push(*id),
            Self::List(items) => {
                for id in items.iter().filter_map(Self::as_object) {
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
            }
            _ => {}
        }

        out
    }

    /// Whether this value holds `id` directly (as the value or as a list item).
    #[must_use]
    pub fn holds(&self, id: ObjectId) -> bool {
        match self {
            Self::Object(current) => *current == id,
            Self::List(items) => items.iter().any(|item| item.as_object() == Some(id)),
            _ => false,
        }
    }

    /// Shallow JSON rendering.
    ///
    /// Object handles render as references; chains replace them with full
    /// documents where an `instance_of` node is present.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Bool(b) => Json::Bool(*b),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::Int(i) => Json::from(*i),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Json::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Self::Null => Json::Null,
            Self::Object(id) => reference_json(*id),
            Self::Text(s) => Json::String(s.clone()),
        }
    }
}

/// JSON stand-in for an already emitted (or not expanded) object.
#[must_use]
pub fn reference_json(id: ObjectId) -> Json {
    let mut map = serde_json::Map::new();
    map.insert(crate::JSON_REF_KEY.to_string(), Json::from(id.index()));

    Json::Object(map)
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            Json::String(s) => Self::Text(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Json::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Self::Object(id)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl FromIterator<(String, Self)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Self)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().collect())
    }
}

///
/// TESTS
///
