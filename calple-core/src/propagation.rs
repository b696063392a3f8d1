//! Event access propagation between paired users.
//!
//! When a pairing activates, each partner is added to the member list of
//! every event the other owns; when it is removed, those memberships are
//! taken back. Propagation is best-effort and non-transactional: each
//! event's update is an independent write, failures are logged and counted
//! but never bubbled up, and a partially-propagated pair converges on the
//! next run because membership is checked before every write.

use serde_json::json;
use tracing::warn;

use crate::dday::DDAYS;
use crate::store::{Document, DocumentStore, Fields, Query};

/// Counts from one propagation run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PropagationSummary {
    pub updated: usize,
    pub failed: usize,
}

impl PropagationSummary {
    fn absorb(&mut self, other: PropagationSummary) {
        self.updated += other.updated;
        self.failed += other.failed;
    }
}

/// Grant both partners membership on each other's events.
pub async fn grant_pair(store: &dyn DocumentStore, a: &str, b: &str) -> PropagationSummary {
    let mut summary = grant_events(store, a, b).await;
    summary.absorb(grant_events(store, b, a).await);
    summary
}

/// Remove both partners' membership from each other's events.
pub async fn revoke_pair(store: &dyn DocumentStore, a: &str, b: &str) -> PropagationSummary {
    let mut summary = revoke_events(store, a, b).await;
    summary.absorb(revoke_events(store, b, a).await);
    summary
}

async fn owned_events(store: &dyn DocumentStore, owner: &str) -> Option<Vec<Document>> {
    match store
        .query(DDAYS, &Query::new().field_eq("createdBy", owner))
        .await
    {
        Ok(docs) => Some(docs),
        Err(err) => {
            warn!(owner, error = %err, "owned-events query failed; skipping this propagation direction");
            None
        }
    }
}

/// Add `member` to every event owned by `owner`, skipping events that
/// already list them. An owner never appears in its own member list.
async fn grant_events(store: &dyn DocumentStore, owner: &str, member: &str) -> PropagationSummary {
    let mut summary = PropagationSummary::default();
    if owner == member {
        return summary;
    }
    let Some(docs) = owned_events(store, owner).await else {
        summary.failed += 1;
        return summary;
    };
    for doc in docs {
        let mut members = doc.string_array("connectedUsers");
        if members.iter().any(|m| m == member) {
            continue;
        }
        members.push(member.to_string());
        write_members(store, &doc.id, members, &mut summary).await;
    }
    summary
}

/// Remove `member` from every event owned by `owner`.
async fn revoke_events(store: &dyn DocumentStore, owner: &str, member: &str) -> PropagationSummary {
    let mut summary = PropagationSummary::default();
    let Some(docs) = owned_events(store, owner).await else {
        summary.failed += 1;
        return summary;
    };
    for doc in docs {
        let members = doc.string_array("connectedUsers");
        if !members.iter().any(|m| m == member) {
            continue;
        }
        let remaining: Vec<String> = members.into_iter().filter(|m| m != member).collect();
        write_members(store, &doc.id, remaining, &mut summary).await;
    }
    summary
}

async fn write_members(
    store: &dyn DocumentStore,
    event_id: &str,
    members: Vec<String>,
    summary: &mut PropagationSummary,
) {
    let mut fields = Fields::new();
    fields.insert("connectedUsers".into(), json!(members));
    match store.merge(DDAYS, event_id, fields).await {
        Ok(()) => summary.updated += 1,
        Err(err) => {
            warn!(event = event_id, error = %err, "membership write failed");
            summary.failed += 1;
        }
    }
}
