//! Document store abstraction.
//!
//! The production deployment talks to a hosted document database through the
//! [`DocumentStore`] trait; tests and local development use the in-memory
//! implementation. Queries are deliberately narrow, matching what the backing
//! store can serve: at most one equality or array-membership predicate per
//! field, plus at most one single-field range. Anything richer happens in
//! memory on top of the fetched documents.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from the backing document store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Field map of a document, as stored.
pub type Fields = Map<String, Value>;

/// A stored document: opaque id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name)?.as_str()
    }

    /// String-array field, tolerating absence and non-string entries.
    pub fn string_array(&self, name: &str) -> Vec<String> {
        match self.field(name).and_then(Value::as_array) {
            Some(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            None => Vec::new(),
        }
    }

    /// RFC 3339 timestamp field.
    pub fn time_field(&self, name: &str) -> Option<DateTime<Utc>> {
        let raw = self.str_field(name)?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// One per-field predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value.
    Eq(Value),
    /// Field is an array containing the value.
    ArrayContains(Value),
}

/// Endpoint of a range filter.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    pub value: Value,
    pub inclusive: bool,
}

/// Single-field range filter. The store serves at most one per query,
/// which is why visibility resolution fans out into several queries.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub field: String,
    pub lower: Option<RangeBound>,
    pub upper: Option<RangeBound>,
}

/// A store query: per-field predicates plus an optional range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub conditions: Vec<(String, Condition)>,
    pub range: Option<RangeFilter>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn field_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.to_string(), Condition::Eq(value.into())));
        self
    }

    pub fn array_contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.to_string(), Condition::ArrayContains(value.into())));
        self
    }

    /// Inclusive range over one field. Replaces any previous range filter.
    pub fn range_between(
        mut self,
        field: &str,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> Self {
        self.range = Some(RangeFilter {
            field: field.to_string(),
            lower: Some(RangeBound {
                value: lower.into(),
                inclusive: true,
            }),
            upper: Some(RangeBound {
                value: upper.into(),
                inclusive: true,
            }),
        });
        self
    }

    /// Exclusive upper-bounded range over one field.
    pub fn range_below(mut self, field: &str, upper: impl Into<Value>) -> Self {
        self.range = Some(RangeFilter {
            field: field.to_string(),
            lower: None,
            upper: Some(RangeBound {
                value: upper.into(),
                inclusive: false,
            }),
        });
        self
    }
}

/// Operations the backing document store supports.
///
/// Handles are long-lived, cheap to share, and safe for concurrent use.
/// Documents missing a filtered field never match a query on that field.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Create a document with a generated id; returns the id.
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<String>;

    /// Create or fully replace a document at a known id.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;

    /// Field-granular upsert: provided fields overwrite, others survive.
    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;
}
