use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;

use crate::models::{AppointmentNotice, NotificationError, NotificationMessage};
use crate::services::templates;

pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";
pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Outbound side of a booking. Implementations must report failure instead
/// of panicking; callers decide how to degrade.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_patient_confirmation(
        &self,
        notice: &AppointmentNotice,
        join_link: &str,
    ) -> Result<(), NotificationError>;

    async fn send_doctor_alert(
        &self,
        notice: &AppointmentNotice,
        notes: &[String],
    ) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone)]
pub enum EmailTransport {
    SendGrid { api_key: String, endpoint: String },
    Resend { api_key: String, endpoint: String },
    /// Log instead of sending.
    Sandbox,
}

impl EmailTransport {
    /// Resend wins when both keys are present. Sandbox mode overrides both.
    pub fn from_config(config: &AppConfig) -> Self {
        if config.email_sandbox_mode {
            return EmailTransport::Sandbox;
        }
        if !config.resend_api_key.is_empty() {
            return EmailTransport::Resend {
                api_key: config.resend_api_key.clone(),
                endpoint: RESEND_API_URL.to_string(),
            };
        }
        if !config.sendgrid_api_key.is_empty() {
            return EmailTransport::SendGrid {
                api_key: config.sendgrid_api_key.clone(),
                endpoint: SENDGRID_API_URL.to_string(),
            };
        }
        warn!("No email provider key configured; notifications will only be logged");
        EmailTransport::Sandbox
    }

    fn name(&self) -> &'static str {
        match self {
            EmailTransport::SendGrid { .. } => "sendgrid",
            EmailTransport::Resend { .. } => "resend",
            EmailTransport::Sandbox => "sandbox",
        }
    }
}

#[derive(Debug)]
pub struct EmailNotifier {
    client: Client,
    transport: EmailTransport,
    sender_email: String,
    doctor_email: String,
}

impl EmailNotifier {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        let settings = config
            .booking_settings()
            .map_err(|_| NotificationError::NotConfigured("NOTIFICATION_SENDER_EMAIL"))?;

        Ok(Self::with_transport(
            EmailTransport::from_config(config),
            &settings.sender_email,
            &config.doctor_notification_email,
        ))
    }

    pub fn with_transport(transport: EmailTransport, sender_email: &str, doctor_email: &str) -> Self {
        info!("Email notifier using {} transport", transport.name());
        Self {
            client: Client::new(),
            transport,
            sender_email: sender_email.to_string(),
            doctor_email: doctor_email.to_string(),
        }
    }

    pub fn is_sandbox(&self) -> bool {
        matches!(self.transport, EmailTransport::Sandbox)
    }

    #[instrument(skip(self, message), fields(subject = %message.subject))]
    pub async fn send(&self, message: &NotificationMessage) -> Result<(), NotificationError> {
        let html = message.html_body.clone().unwrap_or_else(|| message.plain_body.clone());

        let (endpoint, api_key, payload) = match &self.transport {
            EmailTransport::Sandbox => {
                info!("[Sandbox] Notification '{}' skipped", message.subject);
                debug!("[Sandbox] To {}: {}", message.recipient, message.plain_body);
                return Ok(());
            }
            EmailTransport::SendGrid { api_key, endpoint } => (
                endpoint,
                api_key,
                json!({
                    "personalizations": [{ "to": [{ "email": message.recipient }] }],
                    "from": { "email": self.sender_email },
                    "subject": message.subject,
                    "content": [
                        { "type": "text/plain", "value": message.plain_body },
                        { "type": "text/html", "value": html }
                    ]
                }),
            ),
            EmailTransport::Resend { api_key, endpoint } => (
                endpoint,
                api_key,
                json!({
                    "from": self.sender_email,
                    "to": [message.recipient],
                    "subject": message.subject,
                    "text": message.plain_body,
                    "html": html
                }),
            ),
        };

        info!("Sending notification via {}", self.transport.name());
        debug!("Recipient: {}", message.recipient);

        let response = self
            .client
            .post(endpoint.as_str())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Email provider rejected message: {} - {}", status, body);
            return Err(NotificationError::ProviderRejected {
                status: status.as_u16(),
                recipient: message.recipient.clone(),
            });
        }

        debug!("Email provider accepted message to {} ({})", message.recipient, status);
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_patient_confirmation(
        &self,
        notice: &AppointmentNotice,
        join_link: &str,
    ) -> Result<(), NotificationError> {
        let message = templates::patient_confirmation(notice, join_link);
        self.send(&message).await
    }

    async fn send_doctor_alert(
        &self,
        notice: &AppointmentNotice,
        notes: &[String],
    ) -> Result<(), NotificationError> {
        if self.doctor_email.trim().is_empty() {
            return Err(NotificationError::NotConfigured("DOCTOR_NOTIFICATION_EMAIL"));
        }
        let message = templates::doctor_alert(notice, &self.doctor_email, notes);
        self.send(&message).await
    }
}
