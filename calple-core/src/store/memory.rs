//! In-memory document store for tests and local development.
//!
//! Filter evaluation mirrors the hosted store: documents missing a filtered
//! field never match, string ranges compare lexicographically, and `merge`
//! upserts at field granularity.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use uuid::Uuid;

use super::{
    Condition, Document, DocumentStore, Fields, Query, RangeBound, StoreError, StoreResult,
};
use async_trait::async_trait;

type Collections = BTreeMap<String, BTreeMap<String, Fields>>;

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn guard(&self) -> StoreResult<MutexGuard<'_, Collections>> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }
}

/// Order two values the way the backing store orders them: strings
/// lexicographically, numbers numerically. Mixed types do not compare.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        _ => None,
    }
}

fn within_bound(value: &Value, bound: &RangeBound, expect: Ordering) -> bool {
    match compare(value, &bound.value) {
        Some(Ordering::Equal) => bound.inclusive,
        Some(ordering) => ordering == expect,
        None => false,
    }
}

fn matches(fields: &Fields, query: &Query) -> bool {
    for (field, condition) in &query.conditions {
        let Some(value) = fields.get(field) else {
            return false;
        };
        match condition {
            Condition::Eq(expected) => {
                if value != expected {
                    return false;
                }
            }
            Condition::ArrayContains(needle) => {
                let Some(items) = value.as_array() else {
                    return false;
                };
                if !items.contains(needle) {
                    return false;
                }
            }
        }
    }

    if let Some(range) = &query.range {
        let Some(value) = fields.get(&range.field) else {
            return false;
        };
        if let Some(lower) = &range.lower {
            if !within_bound(value, lower, Ordering::Greater) {
                return false;
            }
        }
        if let Some(upper) = &range.upper {
            if !within_bound(value, upper, Ordering::Less) {
                return false;
            }
        }
    }

    true
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collections = self.guard()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut collections = self.guard()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        let mut collections = self.guard()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        let mut collections = self.guard()?;
        let doc = collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        for (key, value) in fields {
            doc.insert(key, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.guard()?;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let collections = self.guard()?;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, fields)| matches(fields, query))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect())
    }
}
