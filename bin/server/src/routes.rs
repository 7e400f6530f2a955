//! Session routes.

use crate::AppState;
use crate::error::ApiError;
use axum::{
    Json,
    extract::{Path, State},
};
use care_coordinator_conversation::{BookingSnapshot, Session, SessionKey, ToolCallRecord, TurnOutcome};
use care_coordinator_core::{PatientId, SessionInstanceId};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub operator_id: String,
    pub patient_id: PatientId,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchPatientRequest {
    pub patient_id: PatientId,
}

/// A session as reported to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: SessionInstanceId,
    pub operator_id: String,
    pub patient_id: PatientId,
    pub patient_name: String,
    pub booking: BookingSnapshot,
}

impl SessionView {
    async fn of(session: &Session) -> Self {
        Self {
            session_id: session.id(),
            operator_id: session.key().operator_id.clone(),
            patient_id: session.key().patient_id,
            patient_name: session.patient().await.name,
            booking: session.booking_status().await,
        }
    }
}

/// Reply to an operator message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub reply: String,
    pub outcome: TurnOutcome,
    pub round_trips: usize,
    pub booking: BookingSnapshot,
    pub recent_tool_calls: Vec<ToolCallRecord>,
}

pub async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

#[instrument(skip(state, request), fields(operator_id = %request.operator_id))]
pub async fn open_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let operator_id = request.operator_id.trim();
    if operator_id.is_empty() {
        return Err(ApiError::InvalidRequest {
            reason: "operator_id is required".to_string(),
        });
    }
    let session = state
        .registry
        .get_or_create(SessionKey::new(operator_id, request.patient_id))
        .await?;
    Ok(Json(SessionView::of(&session).await))
}

#[instrument(skip(state, request))]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(operator_id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let session = state.registry.require(&operator_id).await?;
    let turn = session.handle_message(&request.text).await?;
    Ok(Json(MessageResponse {
        reply: turn.reply,
        outcome: turn.outcome,
        round_trips: turn.round_trips,
        booking: session.booking_status().await,
        recent_tool_calls: session.recent_tool_calls().await,
    }))
}

#[instrument(skip(state))]
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(operator_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.registry.reset(&operator_id).await?;
    Ok(Json(SessionView::of(&session).await))
}

#[instrument(skip(state, request), fields(patient_id = %request.patient_id))]
pub async fn switch_patient(
    State(state): State<Arc<AppState>>,
    Path(operator_id): Path<String>,
    Json(request): Json<SwitchPatientRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .registry
        .switch_patient(&operator_id, request.patient_id)
        .await?;
    Ok(Json(SessionView::of(&session).await))
}

pub async fn booking(
    State(state): State<Arc<AppState>>,
    Path(operator_id): Path<String>,
) -> Result<Json<BookingSnapshot>, ApiError> {
    let session = state.registry.require(&operator_id).await?;
    Ok(Json(session.booking_status().await))
}
