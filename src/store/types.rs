//! Core data types for the document store
//!
//! - `DocumentId` / `DocumentPath`: addressing
//! - `FieldValue` / `Fields`: document contents
//! - `Timestamp`: server-assigned logical time
//! - `Query`, `DocumentSnapshot`, `QuerySnapshot`: reads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use super::error::{StoreError, StoreResult};

/// Server-assigned logical time, microseconds since the Unix epoch
///
/// Values handed out by a single store are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub fn as_micros(&self) -> i64 {
        self.0
    }

    pub fn as_millis(&self) -> i64 {
        self.0.div_euclid(1000)
    }

    /// Wall-clock reading of this timestamp
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_micros(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}us", self.0),
        }
    }
}

/// Opaque document identifier assigned by the store on creation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Accept an identifier supplied from outside (URL parameter, request body)
    pub fn parse(raw: impl Into<String>) -> StoreResult<Self> {
        let raw = raw.into();
        if raw.is_empty() || raw.contains('/') {
            return Err(StoreError::InvalidPath(format!("invalid document id '{}'", raw)));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check a collection name: non-empty, single path segment
pub fn validate_collection(name: &str) -> StoreResult<()> {
    if name.is_empty() || name.contains('/') {
        return Err(StoreError::InvalidPath(format!("invalid collection '{}'", name)));
    }
    Ok(())
}

/// Full address of a document: `<collection>/<id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentPath {
    pub collection: String,
    pub id: DocumentId,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: DocumentId) -> StoreResult<Self> {
        let collection = collection.into();
        validate_collection(&collection)?;
        Ok(Self { collection, id })
    }

    /// Parse a `collection/id` string
    pub fn parse(path: &str) -> StoreResult<Self> {
        match path.split_once('/') {
            Some((collection, id)) => Self::new(collection, DocumentId::parse(id)?),
            None => Err(StoreError::InvalidPath(path.to_string())),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A single field value inside a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Timestamp(Timestamp),
    /// Write-only placeholder: the store replaces it with its own time
    ServerTimestamp,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    // null < bool < integer < timestamp < string
    fn type_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Integer(_) => 2,
            FieldValue::Timestamp(_) | FieldValue::ServerTimestamp => 3,
            FieldValue::String(_) => 4,
        }
    }

    /// Total order used by ordered queries
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::String(a), FieldValue::String(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::String).unwrap_or(FieldValue::Null)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(value: Timestamp) -> Self {
        FieldValue::Timestamp(value)
    }
}

/// Document contents: field name to value
pub type Fields = BTreeMap<String, FieldValue>;

/// A document as read from the store
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    pub fields: Fields,
}

impl DocumentSnapshot {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::as_str)
    }
}

/// Result set of a query, in query order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    pub docs: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentSnapshot> {
        self.docs.iter()
    }
}

/// Sort direction for ordered queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

/// A query over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    /// Query every document of a collection
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            order_by: None,
            limit: None,
        }
    }

    /// Builder method: order by a field
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Builder method: cap the result size
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate against the documents of the target collection
    ///
    /// Documents without the `order_by` field are excluded. Ties are broken
    /// by document id.
    pub fn evaluate<'a, I>(&self, docs: I) -> QuerySnapshot
    where
        I: IntoIterator<Item = (&'a DocumentId, &'a Fields)>,
    {
        let mut matched: Vec<(&DocumentId, &Fields)> = match &self.order_by {
            Some((field, _)) => docs
                .into_iter()
                .filter(|(_, fields)| fields.contains_key(field))
                .collect(),
            None => docs.into_iter().collect(),
        };

        match &self.order_by {
            Some((field, direction)) => {
                matched.sort_by(|(a_id, a), (b_id, b)| {
                    let ordering = a[field].compare(&b[field]).then_with(|| a_id.cmp(b_id));
                    match direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    }
                });
            }
            None => matched.sort_by(|(a, _), (b, _)| a.cmp(b)),
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        QuerySnapshot {
            docs: matched
                .into_iter()
                .map(|(id, fields)| DocumentSnapshot {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .collect(),
        }
    }
}
