// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::booking::BookingService;

pub fn appointment_routes(state: Arc<BookingService>) -> Router {
    Router::new()
        .route("/schedule", post(handlers::schedule_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .with_state(state)
}
