//! Combining multi-query results into one deduplicated list.

use std::collections::HashSet;

use crate::store::Document;

/// Merge per-query result batches, keeping the first occurrence of each
/// document id and silently dropping later collisions. Collisions are
/// expected: an event can surface from more than one access-path query.
/// Output order follows input order but carries no meaning to callers.
pub fn dedup_documents(batches: Vec<Vec<Document>>) -> Vec<Document> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for batch in batches {
        for doc in batch {
            if seen.insert(doc.id.clone()) {
                merged.push(doc);
            }
        }
    }
    merged
}
