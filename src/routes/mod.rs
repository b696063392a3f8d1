pub mod auth;
pub mod connection;
pub mod ddays;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use calple_core::CalpleError;

/// Standard API error body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Standard API message body.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        MessageResponse {
            message: message.to_string(),
        }
    }
}

/// Maps domain errors onto HTTP responses.
pub struct ApiError(CalpleError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            CalpleError::Unauthenticated => StatusCode::UNAUTHORIZED,
            CalpleError::Validation(_) => StatusCode::BAD_REQUEST,
            CalpleError::Forbidden(_) => StatusCode::FORBIDDEN,
            CalpleError::NotFound(_) => StatusCode::NOT_FOUND,
            CalpleError::Conflict(_) => StatusCode::CONFLICT,
            CalpleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let CalpleError::Store(err) = &self.0 {
            tracing::error!(error = %err, "store failure while handling request");
        }
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (self.status(), body).into_response()
    }
}

impl From<CalpleError> for ApiError {
    fn from(err: CalpleError) -> Self {
        ApiError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use calple_core::store::{DocumentStore, Fields, MemoryStore, StoreError};
    use calple_core::user::USERS;

    use crate::auth::StaticSessions;
    use crate::state::AppState;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (CalpleError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                CalpleError::Validation("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (CalpleError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (CalpleError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (CalpleError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                CalpleError::Store(StoreError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    async fn seed_user(store: &MemoryStore, uid: &str, email: &str, name: &str) {
        let mut fields = Fields::new();
        fields.insert("email".into(), json!(email));
        fields.insert("name".into(), json!(name));
        store.set(USERS, uid, fields).await.unwrap();
    }

    async fn test_app() -> Router {
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(StaticSessions::default());

        seed_user(&store, "uid-ana", "ana@example.com", "Ana").await;
        seed_user(&store, "uid-bo", "bo@example.com", "Bo").await;
        sessions.insert("tok-ana", "uid-ana");
        sessions.insert("tok-bo", "uid-bo");

        crate::app(AppState::new(store, sessions))
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requests_without_a_session_are_unauthorized() {
        let app = test_app().await;
        let response = app
            .oneshot(request("GET", "/api/ddays?view=202502", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_malformed_viewport_is_a_bad_request() {
        let app = test_app().await;
        let response = app
            .oneshot(request("GET", "/api/ddays?view=2025", Some("tok-ana"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_event_lifecycle_over_http() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/ddays",
                Some("tok-ana"),
                Some(json!({"title": "Dinner", "date": "20250214"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["dday"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(request(
                "GET",
                "/api/ddays?view=202502",
                Some("tok-ana"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        assert_eq!(listed["date"], "202502");
        assert_eq!(listed["ddays"].as_array().unwrap().len(), 1);

        // An unconnected user cannot edit someone else's event.
        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/ddays/{id}"),
                Some("tok-bo"),
                Some(json!({"title": "Hijacked"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(request(
                "DELETE",
                &format!("/api/ddays/{id}"),
                Some("tok-ana"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_pairing_flow_over_http() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/connection/invite",
                Some("tok-ana"),
                Some(json!({"email": "bo@example.com"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let invited = body_json(response).await;
        let conn_id = invited["connectionId"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(request(
                "GET",
                "/api/connection/pending",
                Some("tok-bo"),
                None,
            ))
            .await
            .unwrap();
        let pending = body_json(response).await;
        assert_eq!(pending["invitations"][0]["from_email"], "ana@example.com");

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/connection/{conn_id}/accept"),
                Some("tok-bo"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request("GET", "/api/connection", Some("tok-ana"), None))
            .await
            .unwrap();
        let status = body_json(response).await;
        assert_eq!(status["connected"], true);
        assert_eq!(status["partner"]["email"], "bo@example.com");

        // A duplicate invite now conflicts.
        let response = app
            .oneshot(request(
                "POST",
                "/api/connection/invite",
                Some("tok-bo"),
                Some(json!({"email": "ana@example.com"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_auth_status_probe() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(request("GET", "/api/auth/status", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["authenticated"], false);

        let response = app
            .oneshot(request("GET", "/api/auth/status", Some("tok-ana"), None))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["user"]["email"], "ana@example.com");
    }
}
