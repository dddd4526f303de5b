// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::locale::Locale;
use shared_utils::validation::is_valid_email;

use crate::models::{
    AppointmentError, BookingRequest, PublicAppointment, ScheduleRequest, ScheduleResponse,
    MAX_LOCALE_LENGTH, MAX_PATIENT_NAME_LENGTH, MAX_SYMPTOMS_LENGTH,
};
use crate::services::booking::BookingService;
use crate::services::scheduling::{parse_datetime, parse_timezone};

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::NotConfigured(_) => AppError::Configuration(err.to_string()),
            AppointmentError::InvalidTime(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

fn validate(request: &ScheduleRequest) -> Result<(), AppError> {
    let name = request.patient_name.trim();
    if name.is_empty() || name.chars().count() > MAX_PATIENT_NAME_LENGTH {
        return Err(AppError::ValidationError(format!(
            "patient_name must be between 1 and {} characters",
            MAX_PATIENT_NAME_LENGTH
        )));
    }
    if !is_valid_email(&request.patient_contact) {
        return Err(AppError::ValidationError("patient_contact must be a valid email address".to_string()));
    }
    if request.symptoms.as_deref().is_some_and(|s| s.chars().count() > MAX_SYMPTOMS_LENGTH) {
        return Err(AppError::ValidationError(format!(
            "symptoms must be at most {} characters",
            MAX_SYMPTOMS_LENGTH
        )));
    }
    if request.locale.as_deref().is_some_and(|l| l.chars().count() > MAX_LOCALE_LENGTH) {
        return Err(AppError::ValidationError(format!(
            "locale must be at most {} characters",
            MAX_LOCALE_LENGTH
        )));
    }
    Ok(())
}

/// Direct booking without the chat flow.
pub async fn schedule_appointment(
    State(booking): State<Arc<BookingService>>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, AppError> {
    validate(&request)?;

    let timezone = parse_timezone(request.timezone.as_deref(), booking.default_timezone());
    let scheduled_time = parse_datetime(&request.appointment_time, Utc::now(), timezone).map_err(|e| {
        warn!("Rejected appointment_time '{}': {}", request.appointment_time, e);
        AppError::BadRequest(format!("Invalid appointment_time: {}", e))
    })?;

    let locale = request.locale.as_deref().and_then(Locale::from_hint).unwrap_or_default();

    let outcome = booking
        .book(BookingRequest {
            patient_name: request.patient_name.trim().to_string(),
            patient_email: request.patient_contact.trim().to_lowercase(),
            scheduled_time,
            timezone,
            locale,
            symptoms: request.symptoms.clone(),
            notes: Vec::new(),
        })
        .await?;

    info!(
        "Direct booking {} created (patient notified: {}, doctor notified: {})",
        outcome.appointment.id, outcome.notifications.patient, outcome.notifications.doctor
    );

    Ok(Json(ScheduleResponse::from_outcome(&outcome)))
}

pub async fn get_appointment(
    State(booking): State<Arc<BookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<PublicAppointment>, AppError> {
    let appointment = booking.get_appointment(appointment_id).await?;
    Ok(Json(PublicAppointment::from(&appointment)))
}
