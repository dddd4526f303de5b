// libs/triage-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::conversation::TriageService;

pub fn triage_routes(state: Arc<TriageService>) -> Router {
    Router::new()
        .route("/", post(handlers::chat))
        .route("/sessions/{session_id}", get(handlers::get_session))
        .with_state(state)
}
