//! Session status endpoint.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use calple_core::user::User;

use crate::auth::CurrentUser;
use crate::routes::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/auth/status", get(status))
}

#[derive(Serialize)]
struct AuthStatus {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
}

/// GET /api/auth/status - session probe.
///
/// Always answers 200 so the frontend can check sign-in state without
/// tripping its error handling; an invalid session just reads as
/// unauthenticated.
async fn status(user: Result<CurrentUser, ApiError>) -> Json<AuthStatus> {
    match user {
        Ok(CurrentUser(user)) => Json(AuthStatus {
            authenticated: true,
            user: Some(user),
        }),
        Err(_) => Json(AuthStatus {
            authenticated: false,
            user: None,
        }),
    }
}
