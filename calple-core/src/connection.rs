//! Pairing lifecycle between two users.
//!
//! A connection pairs exactly two user emails. It is created `pending` by an
//! inviter, becomes `active` on acceptance, and is deleted outright on
//! rejection or removal; no terminal state persists. At most one connection
//! exists per unordered pair, and each user holds at most one active
//! pairing, enforced at invite and accept time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error::{CalpleError, CalpleResult};
use crate::propagation;
use crate::store::{Document, DocumentStore, Fields, Query};
use crate::user::User;

pub const CONNECTIONS: &str = "connections";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACTIVE: &str = "active";

/// A pairing between two user emails. `user1` is the inviter.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub id: String,
    pub user1: String,
    pub user2: String,
    pub status: String,
}

impl Connection {
    fn from_document(doc: &Document) -> Self {
        Connection {
            id: doc.id.clone(),
            user1: doc.str_field("user1").unwrap_or_default().to_string(),
            user2: doc.str_field("user2").unwrap_or_default().to_string(),
            status: doc.str_field("status").unwrap_or_default().to_string(),
        }
    }

    /// The other party of this pairing.
    pub fn partner_of(&self, email: &str) -> &str {
        if self.user1 == email {
            &self.user2
        } else {
            &self.user1
        }
    }

    pub fn involves(&self, email: &str) -> bool {
        self.user1 == email || self.user2 == email
    }
}

/// An incoming invitation joined with the inviter's display name.
#[derive(Debug, Clone, Serialize)]
pub struct Invitation {
    pub id: String,
    pub from_email: String,
    pub from_name: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Current active pairing for `email`, if any.
///
/// Checks both field orders and takes the first match; the conflict checks
/// in [`invite`] and [`accept`] keep more than one from existing.
pub async fn active_connection(
    store: &dyn DocumentStore,
    email: &str,
) -> CalpleResult<Option<Connection>> {
    for field in ["user1", "user2"] {
        let docs = store
            .query(
                CONNECTIONS,
                &Query::new()
                    .field_eq("status", STATUS_ACTIVE)
                    .field_eq(field, email),
            )
            .await?;
        if let Some(doc) = docs.first() {
            return Ok(Some(Connection::from_document(doc)));
        }
    }
    Ok(None)
}

/// Any connection between the two emails, in either field order.
async fn connection_between(
    store: &dyn DocumentStore,
    a: &str,
    b: &str,
) -> CalpleResult<Option<Connection>> {
    for (first, second) in [(a, b), (b, a)] {
        let docs = store
            .query(
                CONNECTIONS,
                &Query::new().field_eq("user1", first).field_eq("user2", second),
            )
            .await?;
        if let Some(doc) = docs.first() {
            return Ok(Some(Connection::from_document(doc)));
        }
    }
    Ok(None)
}

/// Minimal shape check; real address validation belongs to the auth
/// collaborator, which owns the user records.
fn is_valid_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Send a pairing invite from `inviter_email` to `target_email`.
///
/// Creates a `pending` connection with the inviter as `user1` and returns
/// its id.
pub async fn invite(
    store: &dyn DocumentStore,
    inviter_email: &str,
    target_email: &str,
) -> CalpleResult<String> {
    let target = target_email.trim().to_lowercase();
    if !is_valid_email(&target) {
        return Err(CalpleError::Validation("Invalid email format".into()));
    }
    if target == inviter_email {
        return Err(CalpleError::Validation("Cannot connect to yourself".into()));
    }
    if User::find_by_email(store, &target).await?.is_none() {
        return Err(CalpleError::NotFound("User not found".into()));
    }

    if let Some(existing) = connection_between(store, inviter_email, &target).await? {
        return Err(CalpleError::Conflict(format!(
            "Connection {} already",
            existing.status
        )));
    }

    // One active pairing per user. Enforced here rather than left to
    // first-match behavior in the active-connection lookup.
    for email in [inviter_email, target.as_str()] {
        if active_connection(store, email).await?.is_some() {
            return Err(CalpleError::Conflict(
                "One of you already has an active connection".into(),
            ));
        }
    }

    let now = Utc::now();
    let mut fields = Fields::new();
    fields.insert("user1".into(), json!(inviter_email));
    fields.insert("user2".into(), json!(target));
    fields.insert("status".into(), json!(STATUS_PENDING));
    fields.insert("createdAt".into(), json!(now));
    fields.insert("updatedAt".into(), json!(now));

    let id = store.create(CONNECTIONS, fields).await?;
    Ok(id)
}

/// All pending invitations addressed to `email`, joined with inviter names.
pub async fn pending_invitations(
    store: &dyn DocumentStore,
    email: &str,
) -> CalpleResult<Vec<Invitation>> {
    let docs = store
        .query(
            CONNECTIONS,
            &Query::new()
                .field_eq("status", STATUS_PENDING)
                .field_eq("user2", email),
        )
        .await?;

    let mut invitations = Vec::with_capacity(docs.len());
    for doc in docs {
        let inviter = doc.str_field("user1").unwrap_or_default().to_string();
        let from_name = match User::find_by_email(store, &inviter).await? {
            Some(user) => user.name,
            None => String::new(),
        };
        invitations.push(Invitation {
            id: doc.id.clone(),
            from_email: inviter,
            from_name,
            created_at: doc.time_field("createdAt"),
        });
    }
    Ok(invitations)
}

/// Accept an invitation, activating the pairing and granting both sides
/// access to each other's events.
pub async fn accept(store: &dyn DocumentStore, id: &str, caller_email: &str) -> CalpleResult<()> {
    let doc = store
        .get(CONNECTIONS, id)
        .await?
        .ok_or_else(|| CalpleError::NotFound("Invitation not found".into()))?;
    let conn = Connection::from_document(&doc);

    if conn.user2 != caller_email {
        return Err(CalpleError::Forbidden("Not authorized".into()));
    }

    // The invite may have been sitting while either side paired elsewhere.
    for email in [conn.user1.as_str(), conn.user2.as_str()] {
        if let Some(active) = active_connection(store, email).await? {
            if active.id != conn.id {
                return Err(CalpleError::Conflict(
                    "One of you already has an active connection".into(),
                ));
            }
        }
    }

    let mut fields = Fields::new();
    fields.insert("status".into(), json!(STATUS_ACTIVE));
    fields.insert("updatedAt".into(), json!(Utc::now()));
    store.merge(CONNECTIONS, id, fields).await?;

    propagation::grant_pair(store, &conn.user1, &conn.user2).await;
    Ok(())
}

/// Reject an invitation or remove an existing pairing. Either party may
/// remove a connection regardless of its status; the document is deleted
/// after both sides' event access is revoked.
pub async fn reject(store: &dyn DocumentStore, id: &str, caller_email: &str) -> CalpleResult<()> {
    let doc = store
        .get(CONNECTIONS, id)
        .await?
        .ok_or_else(|| CalpleError::NotFound("Invitation not found".into()))?;
    let conn = Connection::from_document(&doc);

    if !conn.involves(caller_email) {
        return Err(CalpleError::Forbidden("Not authorized".into()));
    }

    propagation::revoke_pair(store, &conn.user1, &conn.user2).await;
    store.delete(CONNECTIONS, id).await?;
    Ok(())
}
