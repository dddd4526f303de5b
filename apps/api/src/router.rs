use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use appointment_cell::BookingService;
use triage_cell::router::triage_routes;
use triage_cell::TriageService;

async fn root() -> Json<Value> {
    Json(json!({ "message": "Medikah Chat API is running" }))
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(triage: Arc<TriageService>, booking: Arc<BookingService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ping", get(ping))
        .nest("/chat", triage_routes(triage))
        .nest("/appointments", appointment_routes(booking))
}
