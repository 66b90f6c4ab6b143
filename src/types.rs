use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// A subject identifier
pub type SubjectId = String;

/// Reserved predicate carrying an entity's type tag
pub const TYPE_PREDICATE: &str = "$type";

/// Reserved key carrying an entity's id in the JSON view
pub const ID_KEY: &str = "$id";

/// A WGS84 coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// The object of a triple.
///
/// Serialized as `{"type": "<VARIANT>", "value": <payload>}`. Only `Ref` and
/// `RefArray` are graph edges; every other variant is opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypedValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Binary(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    /// Signed duration in milliseconds
    Duration(i64),
    Ref(SubjectId),
    RefArray(Vec<SubjectId>),
    Json(Value),
    GeoPoint(GeoPoint),
    GeoPolygon(Vec<GeoPoint>),
    #[serde(rename = "GEO_LINESTRING")]
    GeoLineString(Vec<GeoPoint>),
    Vector(Vec<f32>),
}

impl TypedValue {
    /// Wire name of the variant
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Null => "NULL",
            TypedValue::Bool(_) => "BOOL",
            TypedValue::Int32(_) => "INT32",
            TypedValue::Int64(_) => "INT64",
            TypedValue::Float64(_) => "FLOAT64",
            TypedValue::String(_) => "STRING",
            TypedValue::Binary(_) => "BINARY",
            TypedValue::Timestamp(_) => "TIMESTAMP",
            TypedValue::Date(_) => "DATE",
            TypedValue::Duration(_) => "DURATION",
            TypedValue::Ref(_) => "REF",
            TypedValue::RefArray(_) => "REF_ARRAY",
            TypedValue::Json(_) => "JSON",
            TypedValue::GeoPoint(_) => "GEO_POINT",
            TypedValue::GeoPolygon(_) => "GEO_POLYGON",
            TypedValue::GeoLineString(_) => "GEO_LINESTRING",
            TypedValue::Vector(_) => "VECTOR",
        }
    }

    /// Subjects this value points at, in stored order. Empty for non-edges.
    pub fn ref_targets(&self) -> &[SubjectId] {
        match self {
            TypedValue::Ref(target) => std::slice::from_ref(target),
            TypedValue::RefArray(targets) => targets,
            _ => &[],
        }
    }

    /// Whether this value is an edge to `target`
    pub fn references(&self, target: &str) -> bool {
        self.ref_targets().iter().any(|t| t == target)
    }

    /// Text payload of `String` and `Ref` values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) | TypedValue::Ref(s) => Some(s),
            _ => None,
        }
    }

    /// Plain JSON payload, without the type tag
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Null => Value::Null,
            TypedValue::Bool(b) => Value::Bool(*b),
            TypedValue::Int32(n) => json!(n),
            TypedValue::Int64(n) => json!(n),
            TypedValue::Float64(n) => json!(n),
            TypedValue::String(s) | TypedValue::Ref(s) => Value::String(s.clone()),
            TypedValue::Binary(bytes) => json!(bytes),
            TypedValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
            TypedValue::Date(date) => Value::String(date.format("%Y-%m-%d").to_string()),
            TypedValue::Duration(ms) => json!(ms),
            TypedValue::RefArray(targets) => json!(targets),
            TypedValue::Json(value) => value.clone(),
            TypedValue::GeoPoint(point) => json!(point),
            TypedValue::GeoPolygon(points) | TypedValue::GeoLineString(points) => json!(points),
            TypedValue::Vector(values) => json!(values),
        }
    }

    /// Infer a typed value from untyped JSON.
    ///
    /// Strings starting with one of `ref_prefixes` become `Ref`; pass an empty
    /// slice to disable reference detection. Numbers are always `Float64`.
    pub fn infer(value: &Value, ref_prefixes: &[String]) -> Self {
        match value {
            Value::String(s) if ref_prefixes.iter().any(|p| s.starts_with(p.as_str())) => {
                TypedValue::Ref(s.clone())
            }
            Value::String(s) => TypedValue::String(s.clone()),
            Value::Number(n) => TypedValue::Float64(n.as_f64().unwrap_or(f64::NAN)),
            Value::Bool(b) => TypedValue::Bool(*b),
            Value::Null => TypedValue::Null,
            other => TypedValue::Json(other.clone()),
        }
    }
}

/// A single (subject, predicate, object) fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: SubjectId,
    pub predicate: String,
    pub object: TypedValue,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: TypedValue) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

/// The materialized view of every triple sharing one subject
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: SubjectId,
    pub entity_type: Option<String>,
    pub properties: BTreeMap<String, TypedValue>,
}

impl Entity {
    /// Get a property's typed value
    pub fn get(&self, predicate: &str) -> Option<&TypedValue> {
        self.properties.get(predicate)
    }

    /// Convert to the JSON view (`$id`, `$type`, then property payloads)
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        if let Some(ref entity_type) = self.entity_type {
            map.insert(TYPE_PREDICATE.to_string(), Value::String(entity_type.clone()));
        }
        for (predicate, value) in &self.properties {
            if predicate == ID_KEY {
                continue;
            }
            map.insert(predicate.clone(), value.to_json());
        }
        Value::Object(map)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// String prefixes that mark a JSON string as a reference on `insert`
    pub ref_prefixes: Vec<String>,
    pub default_max_depth: usize,
    pub default_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ref_prefixes: vec![
                "entity:".to_string(),
                "thing-".to_string(),
                "user:".to_string(),
            ],
            default_max_depth: 1,
            default_limit: 100,
        }
    }
}

/// Options for forward traversal. Unset fields fall back to [`Config`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TraverseOptions {
    pub max_depth: Option<usize>,
    pub limit: Option<usize>,
}

impl TraverseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Pagination for `query`
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub skip: usize,
}

/// Counters gathered while answering a query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    /// Candidate subjects examined
    pub subjects_scanned: usize,
    /// Stored values examined across those subjects
    pub triples_scanned: usize,
    pub entities_returned: usize,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub entities: Vec<Entity>,
    pub has_more: bool,
    pub stats: QueryStats,
}

/// Store-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub triples: usize,
    pub entities: usize,
    pub predicates: usize,
}

/// A failed item inside a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchError {
    pub index: usize,
    pub error: String,
}

/// Outcome of a batch: one result per input, failures recorded by position
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult<T> {
    pub results: Vec<T>,
    pub errors: Vec<BatchError>,
}

impl<T> BatchResult<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
            errors: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
