// libs/triage-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use shared_models::error::AppError;

use crate::models::{ChatRequest, ChatResponse, SessionSnapshot, TriageError};
use crate::services::conversation::TriageService;

impl From<TriageError> for AppError {
    fn from(err: TriageError) -> Self {
        match err {
            TriageError::SessionNotFound => AppError::NotFound(err.to_string()),
            TriageError::InvalidMessage(msg) => AppError::ValidationError(msg),
            TriageError::Store(msg) => AppError::Database(msg),
            TriageError::Booking(e) => AppError::from(e),
        }
    }
}

pub async fn chat(
    State(triage): State<Arc<TriageService>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = triage.handle_message(request).await?;
    debug!("Session {} now at {}", response.session_id, response.stage);
    Ok(Json(response))
}

pub async fn get_session(
    State(triage): State<Arc<TriageService>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(triage.snapshot(&session_id).await?))
}
