//! User records, owned by the auth collaborator.
//!
//! The auth collaborator writes user documents on login; this module only
//! reads them. Session tokens and other credentials stored alongside the
//! profile are never deserialized back out.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CalpleError, CalpleResult};
use crate::store::{Document, DocumentStore, Query};

pub const USERS: &str = "users";

/// A user profile. `id` is the opaque identity assigned by the auth
/// collaborator; `email` is the stable natural key used for pairing and
/// event ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    /// Declared attribute category, used only for partner display.
    #[serde(default)]
    pub sex: String,
}

impl User {
    fn from_document(doc: Document) -> Option<Self> {
        let id = doc.id;
        let mut user: User = serde_json::from_value(Value::Object(doc.fields)).ok()?;
        user.id = id;
        Some(user)
    }

    /// Resolve an authenticated uid to its user record.
    ///
    /// A session pointing at a missing or email-less record cannot act,
    /// so both cases surface as unauthenticated.
    pub async fn fetch(store: &dyn DocumentStore, uid: &str) -> CalpleResult<Self> {
        let doc = store
            .get(USERS, uid)
            .await?
            .ok_or(CalpleError::Unauthenticated)?;
        Self::from_document(doc).ok_or(CalpleError::Unauthenticated)
    }

    pub async fn find_by_email(
        store: &dyn DocumentStore,
        email: &str,
    ) -> CalpleResult<Option<Self>> {
        let docs = store
            .query(USERS, &Query::new().field_eq("email", email))
            .await?;
        Ok(docs.into_iter().next().and_then(Self::from_document))
    }
}
