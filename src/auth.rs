//! Session resolution.
//!
//! Credential and session issuance belong to the external auth
//! collaborator. This module only resolves an opaque session token
//! (bearer header or session cookie) to a user id, then loads the matching
//! user record from the store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;

use calple_core::CalpleError;
use calple_core::user::User;

use crate::routes::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "calple_session";

/// Resolves opaque session tokens to user ids.
#[async_trait]
pub trait SessionAuth: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<String>;
}

/// Map-backed sessions for local development and tests.
#[derive(Default)]
pub struct StaticSessions {
    tokens: Mutex<HashMap<String, String>>,
}

impl StaticSessions {
    pub fn insert(&self, token: &str, uid: &str) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(token.to_string(), uid.to_string());
        }
    }
}

#[async_trait]
impl SessionAuth for StaticSessions {
    async fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.lock().ok()?.get(token).cloned()
    }
}

/// The authenticated caller, resolved on every request.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| session_cookie(parts))
            .ok_or(CalpleError::Unauthenticated)?;
        let uid = state
            .sessions
            .resolve(&token)
            .await
            .ok_or(CalpleError::Unauthenticated)?;
        let user = User::fetch(state.store.as_ref(), &uid).await?;
        Ok(CurrentUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

fn session_cookie(parts: &Parts) -> Option<String> {
    let raw = parts.headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}
