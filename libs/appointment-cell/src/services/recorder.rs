// libs/appointment-cell/src/services/recorder.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use shared_config::BookingSettings;
use shared_utils::hashing::contact_hash;

use crate::models::{Appointment, AppointmentDraft, AppointmentError};
use crate::services::store::AppointmentStore;

/// Turns a draft into a stored appointment. Duplicate protection belongs to
/// the caller; every call creates a new record.
pub struct AppointmentRecorder {
    hash_key: String,
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentRecorder {
    pub fn new(settings: &BookingSettings, store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            hash_key: settings.hash_key.clone(),
            store,
        }
    }

    #[instrument(skip(self, draft), fields(scheduled_time = %draft.scheduled_time))]
    pub async fn record(&self, draft: &AppointmentDraft) -> Result<Appointment, AppointmentError> {
        let patient_name = draft.patient_name.trim();
        if patient_name.is_empty() {
            return Err(AppointmentError::ValidationError("patient name is required".to_string()));
        }
        if draft.contact.trim().is_empty() {
            return Err(AppointmentError::ValidationError("patient contact is required".to_string()));
        }

        let contact_hash = contact_hash(&self.hash_key, &draft.contact)
            .ok_or_else(|| AppointmentError::NotConfigured("APPOINTMENT_HASH_KEY".to_string()))?;

        let appointment = Appointment {
            id: draft.id,
            patient_name: patient_name.to_string(),
            contact_hash,
            scheduled_time: draft.scheduled_time,
            created_at: Utc::now(),
        };

        self.store.insert(&appointment).await?;

        info!("Appointment {} recorded for {}", appointment.id, appointment.scheduled_time);
        Ok(appointment)
    }
}
