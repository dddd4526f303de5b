use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::locale::Locale;

/// A single outbound email.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub recipient: String,
    pub subject: String,
    pub plain_body: String,
    pub html_body: Option<String>,
}

/// Everything an email needs to know about a booked visit. Lives only for
/// the duration of one request; `patient_email` is never persisted.
#[derive(Debug, Clone)]
pub struct AppointmentNotice {
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub scheduled_time: DateTime<Utc>,
    /// Pre-rendered local time, e.g. "Thursday, October 23, 2025 at 5:00 PM (America/Mexico_City)".
    pub scheduled_for_display: String,
    pub locale: Locale,
    pub duration_minutes: i64,
    pub assigned_doctor: String,
    pub symptoms: Option<String>,
    pub calendar_link: Option<String>,
}

/// Per-recipient delivery outcome returned to API clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub patient: bool,
    pub doctor: bool,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.patient && self.doctor
    }
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification service not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Email provider returned status {status}")]
    ProviderRejected { status: u16, recipient: String },

    #[error("Email provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
