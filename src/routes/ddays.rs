//! Event endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use calple_core::CalpleError;
use calple_core::date::Viewport;
use calple_core::dday::{self, DDay, DDayPatch, NewDDay};
use calple_core::resolver;

use crate::auth::CurrentUser;
use crate::routes::{ApiError, MessageResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ddays", get(list_ddays).post(create_dday))
        .route("/api/ddays/{id}", put(update_dday).delete(delete_dday))
}

#[derive(Deserialize)]
struct ViewParams {
    view: Option<String>,
}

#[derive(Serialize)]
struct DDayList {
    ddays: Vec<DDay>,
    date: String,
}

#[derive(Serialize)]
struct DDayBody {
    dday: DDay,
}

/// GET /api/ddays?view=YYYYMM - resolve visible events for a month
async fn list_ddays(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ViewParams>,
) -> Result<Json<DDayList>, ApiError> {
    let view = params
        .view
        .ok_or_else(|| CalpleError::Validation("Missing view date parameter".into()))?;
    let viewport = Viewport::parse(&view)?;

    let ddays = resolver::resolve_viewport(state.store.as_ref(), &user.email, viewport).await;
    Ok(Json(DDayList { ddays, date: view }))
}

/// POST /api/ddays - create a new event
async fn create_dday(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<NewDDay>,
) -> Result<(StatusCode, Json<DDayBody>), ApiError> {
    let dday = dday::create(state.store.as_ref(), &user.email, input).await?;
    Ok((StatusCode::CREATED, Json(DDayBody { dday })))
}

/// PUT /api/ddays/:id - update an event (owner or shared member)
async fn update_dday(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<DDayPatch>,
) -> Result<Json<DDayBody>, ApiError> {
    let dday = dday::update(state.store.as_ref(), &user.email, &id, patch).await?;
    Ok(Json(DDayBody { dday }))
}

/// DELETE /api/ddays/:id - delete an event (owner only)
async fn delete_dday(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    dday::delete(state.store.as_ref(), &user.email, &id).await?;
    Ok(Json(MessageResponse::new("D-Day deleted")))
}
