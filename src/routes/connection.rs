//! Pairing endpoints.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use calple_core::connection::{self, Invitation};
use calple_core::user::User;

use crate::auth::CurrentUser;
use crate::routes::{ApiError, MessageResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/connection", get(get_connection))
        .route("/api/connection/invite", post(invite))
        .route("/api/connection/pending", get(pending))
        .route("/api/connection/{id}/accept", post(accept))
        .route("/api/connection/{id}/reject", post(reject))
}

#[derive(Serialize)]
struct ConnectionStatus {
    connected: bool,
    #[serde(rename = "connectionId", skip_serializing_if = "Option::is_none")]
    connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    partner: Option<User>,
}

/// GET /api/connection - current active pairing with partner profile
async fn get_connection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ConnectionStatus>, ApiError> {
    let store = state.store.as_ref();
    match connection::active_connection(store, &user.email).await? {
        Some(conn) => {
            let partner = User::find_by_email(store, conn.partner_of(&user.email)).await?;
            Ok(Json(ConnectionStatus {
                connected: true,
                connection_id: Some(conn.id),
                partner,
            }))
        }
        None => Ok(Json(ConnectionStatus {
            connected: false,
            connection_id: None,
            partner: None,
        })),
    }
}

#[derive(Deserialize)]
struct InviteRequest {
    email: String,
}

#[derive(Serialize)]
struct InviteResponse {
    message: String,
    #[serde(rename = "connectionId")]
    connection_id: String,
}

/// POST /api/connection/invite - send a pairing invite
async fn invite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<InviteRequest>,
) -> Result<Json<InviteResponse>, ApiError> {
    let id = connection::invite(state.store.as_ref(), &user.email, &body.email).await?;
    Ok(Json(InviteResponse {
        message: "Invitation sent".to_string(),
        connection_id: id,
    }))
}

#[derive(Serialize)]
struct InvitationList {
    invitations: Vec<Invitation>,
}

/// GET /api/connection/pending - incoming invites
async fn pending(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<InvitationList>, ApiError> {
    let invitations = connection::pending_invitations(state.store.as_ref(), &user.email).await?;
    Ok(Json(InvitationList { invitations }))
}

/// POST /api/connection/:id/accept - activate pairing and grant access
async fn accept(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    connection::accept(state.store.as_ref(), &id, &user.email).await?;
    Ok(Json(MessageResponse::new("Invitation accepted")))
}

/// POST /api/connection/:id/reject - remove pairing and revoke access
async fn reject(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    connection::reject(state.store.as_ref(), &id, &user.email).await?;
    Ok(Json(MessageResponse::new("Connection removed")))
}
