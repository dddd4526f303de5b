// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use notification_cell::DeliveryReport;
use shared_models::locale::Locale;

use crate::services::scheduling::ParseFailure;

pub const MAX_PATIENT_NAME_LENGTH: usize = 255;
pub const MAX_SYMPTOMS_LENGTH: usize = 2000;
pub const MAX_LOCALE_LENGTH: usize = 120;

// ==============================================================================
// CORE APPOINTMENT MODEL
// ==============================================================================

/// A booked telehealth visit. Immutable once recorded; the patient's contact
/// only survives as `contact_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "appointment_id")]
    pub id: Uuid,
    pub patient_name: String,
    #[serde(rename = "patient_contact_hash")]
    pub contact_hash: String,
    #[serde(rename = "appointment_time")]
    pub scheduled_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// What the recorder needs to create an appointment. `contact` is hashed
/// before anything is stored. The id is allocated up front so the visit
/// links exist before the record does.
#[derive(Debug, Clone)]
pub struct AppointmentDraft {
    pub id: Uuid,
    pub patient_name: String,
    pub contact: String,
    pub scheduled_time: DateTime<Utc>,
}

/// Appointment as exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicAppointment {
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub scheduled_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&Appointment> for PublicAppointment {
    fn from(appointment: &Appointment) -> Self {
        Self {
            appointment_id: appointment.id,
            patient_name: appointment.patient_name.clone(),
            scheduled_time: appointment.scheduled_time,
            created_at: appointment.created_at,
        }
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

/// Input shared by the chat confirmation step and direct booking.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub patient_name: String,
    pub patient_email: String,
    pub scheduled_time: DateTime<Utc>,
    pub timezone: chrono_tz::Tz,
    pub locale: Locale,
    pub symptoms: Option<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub appointment: Appointment,
    pub join_link: String,
    pub calendar_link: String,
    pub assigned_doctor: String,
    pub scheduled_for_display: String,
    pub notifications: DeliveryReport,
}

// ==============================================================================
// HTTP PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub patient_name: String,
    pub patient_contact: String,
    /// RFC 3339 with offset, or a free-text expression read in `timezone`.
    pub appointment_time: String,
    pub symptoms: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub appointment_id: Uuid,
    pub join_link: String,
    pub calendar_link: String,
    pub scheduled_for: String,
    pub scheduled_time: DateTime<Utc>,
    pub assigned_doctor: String,
    pub notifications: DeliveryReport,
    pub message: String,
}

impl ScheduleResponse {
    pub fn from_outcome(outcome: &BookingOutcome) -> Self {
        let message = if outcome.notifications.all_delivered() {
            "Appointment scheduled and notifications sent.".to_string()
        } else {
            "Appointment scheduled, but some notifications could not be delivered.".to_string()
        };

        Self {
            appointment_id: outcome.appointment.id,
            join_link: outcome.join_link.clone(),
            calendar_link: outcome.calendar_link.clone(),
            scheduled_for: outcome.scheduled_for_display.clone(),
            scheduled_time: outcome.appointment.scheduled_time,
            assigned_doctor: outcome.assigned_doctor.clone(),
            notifications: outcome.notifications,
            message,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Booking is not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(#[from] ParseFailure),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
