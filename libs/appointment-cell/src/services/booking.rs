// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono_tz::Tz;
use rand::seq::SliceRandom;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use notification_cell::{AppointmentNotice, DeliveryReport, Notifier};
use shared_config::AppConfig;

use crate::models::{Appointment, AppointmentDraft, AppointmentError, BookingOutcome, BookingRequest};
use crate::services::recorder::AppointmentRecorder;
use crate::services::scheduling::{format_local_for, parse_timezone};
use crate::services::store::AppointmentStore;
use crate::services::telemedicine::{calendar_link, join_link, CALENDAR_EVENT_TITLE};

pub const FALLBACK_DOCTOR: &str = "Medikah Primary Care";

#[derive(Debug, Clone)]
pub struct BookingOptions {
    pub doxy_base_url: String,
    pub duration_minutes: i64,
    pub doctor_pool: Vec<String>,
    pub default_timezone: Tz,
}

impl BookingOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            doxy_base_url: config.doxy_base_url.clone(),
            duration_minutes: config.appointment_duration_minutes,
            doctor_pool: config.doctor_pool.clone(),
            default_timezone: parse_timezone(Some(&config.default_timezone), Tz::UTC),
        }
    }
}

/// Records an appointment, builds its links and notifies both sides.
///
/// Used by the chat confirmation step and by direct booking. The recorder is
/// absent when the hash key or sender address is missing; the chat keeps
/// working and the first booking attempt reports the missing key.
pub struct BookingService {
    recorder: Result<AppointmentRecorder, String>,
    store: Arc<dyn AppointmentStore>,
    notifier: Option<Arc<dyn Notifier>>,
    options: BookingOptions,
}

impl BookingService {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn AppointmentStore>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let recorder = match config.booking_settings() {
            Ok(settings) => Ok(AppointmentRecorder::new(&settings, store.clone())),
            Err(e) => {
                error!("Booking disabled: {}", e);
                Err(e.to_string())
            }
        };

        Self {
            recorder,
            store,
            notifier,
            options: BookingOptions::from_config(config),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.recorder.is_ok()
    }

    pub fn default_timezone(&self) -> Tz {
        self.options.default_timezone
    }

    pub fn options(&self) -> &BookingOptions {
        &self.options
    }

    fn assign_doctor(&self) -> String {
        self.options
            .doctor_pool
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| FALLBACK_DOCTOR.to_string())
    }

    /// Join and calendar links, built before recording so a bad link
    /// setting never leaves a stored appointment behind an error.
    fn links(&self, id: Uuid, request: &BookingRequest) -> Result<(String, String), AppointmentError> {
        let join = join_link(&self.options.doxy_base_url, id)?;
        let calendar = calendar_link(
            CALENDAR_EVENT_TITLE,
            &format!("Telehealth visit for {}. Join via Doxy.me: {}", request.patient_name.trim(), join),
            request.scheduled_time,
            self.options.duration_minutes,
            Some(&join),
        )?;
        Ok((join, calendar))
    }

    #[instrument(skip(self, request), fields(scheduled_time = %request.scheduled_time))]
    pub async fn book(&self, request: BookingRequest) -> Result<BookingOutcome, AppointmentError> {
        let recorder = self
            .recorder
            .as_ref()
            .map_err(|missing| AppointmentError::NotConfigured(missing.clone()))?;

        let id = Uuid::new_v4();
        let (join, calendar) = self.links(id, &request)?;

        let appointment = recorder
            .record(&AppointmentDraft {
                id,
                patient_name: request.patient_name.clone(),
                contact: request.patient_email.clone(),
                scheduled_time: request.scheduled_time,
            })
            .await?;

        let assigned_doctor = self.assign_doctor();
        info!("Assigned doctor {} to appointment {}", assigned_doctor, appointment.id);

        let notice = AppointmentNotice {
            appointment_id: appointment.id,
            patient_name: appointment.patient_name.clone(),
            patient_email: request.patient_email.clone(),
            scheduled_time: appointment.scheduled_time,
            scheduled_for_display: format_local_for(appointment.scheduled_time, request.timezone, request.locale),
            locale: request.locale,
            duration_minutes: self.options.duration_minutes,
            assigned_doctor: assigned_doctor.clone(),
            symptoms: request.symptoms.clone(),
            calendar_link: Some(calendar.clone()),
        };

        let mut doctor_notes = vec![format!("Doxy.me link: {}", join)];
        doctor_notes.extend(request.notes.iter().cloned());

        let notifications = self.dispatch(&notice, &join, &doctor_notes).await;

        Ok(BookingOutcome {
            scheduled_for_display: notice.scheduled_for_display,
            appointment,
            join_link: join,
            calendar_link: calendar,
            assigned_doctor,
            notifications,
        })
    }

    /// Both messages go out concurrently; a failure on one side never
    /// affects the other or the stored appointment.
    async fn dispatch(&self, notice: &AppointmentNotice, join: &str, notes: &[String]) -> DeliveryReport {
        let Some(notifier) = &self.notifier else {
            warn!("No notifier configured; appointment {} not announced", notice.appointment_id);
            return DeliveryReport::default();
        };

        let (patient, doctor) = futures::join!(
            notifier.send_patient_confirmation(notice, join),
            notifier.send_doctor_alert(notice, notes),
        );

        if let Err(e) = &patient {
            warn!("Patient confirmation for {} failed: {}", notice.appointment_id, e);
        }
        if let Err(e) = &doctor {
            warn!("Doctor alert for {} failed: {}", notice.appointment_id, e);
        }

        DeliveryReport {
            patient: patient.is_ok(),
            doctor: doctor.is_ok(),
        }
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store.get(id).await?.ok_or(AppointmentError::NotFound)
    }
}
