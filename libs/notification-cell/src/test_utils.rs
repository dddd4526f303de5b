use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{AppointmentNotice, NotificationError};
use crate::services::email::Notifier;

/// One delivery attempt seen by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub enum SentNotice {
    Patient { appointment_id: Uuid, recipient: String, join_link: String },
    Doctor { appointment_id: Uuid, notes: Vec<String> },
}

/// In-process notifier for tests: remembers what it was asked to send and
/// can be told to fail either side.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotice>>,
    fail_patient: bool,
    fail_doctor: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_doctor() -> Self {
        Self { fail_doctor: true, ..Self::default() }
    }

    pub fn failing_patient() -> Self {
        Self { fail_patient: true, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<SentNotice> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    fn push(&self, notice: SentNotice) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notice);
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_patient_confirmation(
        &self,
        notice: &AppointmentNotice,
        join_link: &str,
    ) -> Result<(), NotificationError> {
        if self.fail_patient {
            return Err(NotificationError::ProviderRejected {
                status: 500,
                recipient: notice.patient_email.clone(),
            });
        }
        self.push(SentNotice::Patient {
            appointment_id: notice.appointment_id,
            recipient: notice.patient_email.clone(),
            join_link: join_link.to_string(),
        });
        Ok(())
    }

    async fn send_doctor_alert(
        &self,
        notice: &AppointmentNotice,
        notes: &[String],
    ) -> Result<(), NotificationError> {
        if self.fail_doctor {
            return Err(NotificationError::ProviderRejected {
                status: 500,
                recipient: "doctor".to_string(),
            });
        }
        self.push(SentNotice::Doctor {
            appointment_id: notice.appointment_id,
            notes: notes.to_vec(),
        });
        Ok(())
    }
}
