// libs/appointment-cell/src/services/telemedicine.rs
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use shared_config::MAX_MINUTES;

use crate::models::AppointmentError;

pub const GOOGLE_CALENDAR_URL: &str = "https://calendar.google.com/calendar/render";
pub const CALENDAR_EVENT_TITLE: &str = "Medikah Telehealth Appointment";

/// Video room for one appointment: `{base}/{appointment_id}`.
pub fn join_link(base_url: &str, appointment_id: Uuid) -> Result<String, AppointmentError> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(AppointmentError::NotConfigured("DOXY_BASE_URL".to_string()));
    }
    Ok(format!("{}/{}", base, appointment_id))
}

fn google_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

/// "Add to Google Calendar" template link for the visit.
pub fn calendar_link(
    title: &str,
    description: &str,
    start: DateTime<Utc>,
    duration_minutes: i64,
    location: Option<&str>,
) -> Result<String, AppointmentError> {
    if duration_minutes <= 0 || duration_minutes > MAX_MINUTES {
        return Err(AppointmentError::ValidationError(
            "appointment duration must be between 1 minute and one year".to_string(),
        ));
    }
    let end = start + Duration::minutes(duration_minutes);

    let mut params = vec![
        ("action", "TEMPLATE".to_string()),
        ("text", title.to_string()),
        ("details", description.to_string()),
        ("dates", format!("{}/{}", google_timestamp(start), google_timestamp(end))),
    ];
    if let Some(location) = location.filter(|l| !l.is_empty()) {
        params.push(("location", location.to_string()));
    }

    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!("{}?{}", GOOGLE_CALENDAR_URL, query))
}
