//! HTTP API for the care coordinator.
//!
//! Operators open a session for a patient, then exchange messages with the
//! booking assistant. Every response carries the current booking snapshot.

pub mod config;
pub mod error;
pub mod routes;

use axum::{
    Router,
    routing::{get, post},
};
use care_coordinator_conversation::SessionRegistry;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    pub registry: SessionRegistry,
}

impl AppState {
    #[must_use]
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }
}

/// Builds the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/sessions", post(routes::open_session))
        .route("/sessions/{operator_id}/messages", post(routes::post_message))
        .route("/sessions/{operator_id}/reset", post(routes::reset))
        .route("/sessions/{operator_id}/patient", post(routes::switch_patient))
        .route("/sessions/{operator_id}/booking", get(routes::booking))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use care_coordinator_ai::Completion;
    use care_coordinator_conversation::Collaborators;
    use care_coordinator_conversation::testing::{ScriptedProvider, tool_batch};
    use care_coordinator_core::FixedClock;
    use care_coordinator_lookup::InMemoryDirectory;
    use chrono::NaiveDate;
    use serde_json::{Value as JsonValue, json};
    use tower::ServiceExt;

    fn app(script: Vec<Completion>) -> Router {
        let deps = Collaborators::new(
            Arc::new(ScriptedProvider::new(script)),
            Arc::new(InMemoryDirectory::sample()),
        )
        .with_clock(Arc::new(FixedClock(
            NaiveDate::from_ymd_opt(2025, 6, 13).expect("date"),
        )));
        router(Arc::new(AppState::new(SessionRegistry::new(deps))))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    async fn open(app: &Router, operator: &str, patient: i64) -> JsonValue {
        let (status, body) = send(
            app,
            "POST",
            "/sessions",
            Some(json!({"operator_id": operator, "patient_id": patient})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(&app(Vec::new()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn opens_and_reuses_session() {
        let app = app(Vec::new());
        let first = open(&app, "nurse-1", 1).await;
        assert_eq!(first["patient_name"], "John Doe");
        assert_eq!(first["booking"]["committed"], false);

        let again = open(&app, "nurse-1", 1).await;
        assert_eq!(first["session_id"], again["session_id"]);

        let other = open(&app, "nurse-1", 2).await;
        assert_ne!(first["session_id"], other["session_id"]);
        assert_eq!(other["patient_name"], "Jane Smith");
    }

    #[tokio::test]
    async fn unknown_patient_is_bad_gateway() {
        let (status, body) = send(
            &app(Vec::new()),
            "POST",
            "/sessions",
            Some(json!({"operator_id": "nurse-1", "patient_id": 99})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().expect("error").contains("99"));
    }

    #[tokio::test]
    async fn unknown_operator_is_not_found() {
        let app = app(Vec::new());
        let (status, _) = send(&app, "GET", "/sessions/ghost/booking", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &app,
            "POST",
            "/sessions/ghost/messages",
            Some(json!({"text": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let app = app(Vec::new());
        open(&app, "nurse-1", 1).await;
        let (status, _) = send(
            &app,
            "POST",
            "/sessions/nurse-1/messages",
            Some(json!({"text": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn message_returns_reply_and_booking() {
        let app = app(vec![
            tool_batch("check_appointment_history", json!({"provider_id": 2})),
            Completion::TextReply("This would be a NEW visit with Dr. House.".to_string()),
        ]);
        open(&app, "nurse-1", 1).await;

        let (status, body) = send(
            &app,
            "POST",
            "/sessions/nurse-1/messages",
            Some(json!({"text": "Has John seen Dr. House?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "This would be a NEW visit with Dr. House.");
        assert_eq!(body["outcome"], "replied");
        assert_eq!(body["round_trips"], 2);
        assert_eq!(body["booking"]["classification"], "NEW");
        assert_eq!(body["recent_tool_calls"][0]["tool"], "check_appointment_history");

        let (status, booking) = send(&app, "GET", "/sessions/nurse-1/booking", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(booking["provider"]["id"], 2);

        let (status, reset) = send(&app, "POST", "/sessions/nurse-1/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(reset["booking"]["provider"].is_null());
        assert_eq!(reset["patient_name"], "John Doe");
    }

    #[tokio::test]
    async fn switch_patient_route() {
        let app = app(Vec::new());
        let john = open(&app, "nurse-1", 1).await;
        let (status, jane) = send(
            &app,
            "POST",
            "/sessions/nurse-1/patient",
            Some(json!({"patient_id": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(jane["patient_id"], 2);
        assert_ne!(john["session_id"], jane["session_id"]);
    }
}
