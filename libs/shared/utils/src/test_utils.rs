use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, RejectionTarget};

pub const TEST_HASH_KEY: &str = "test-appointment-hash-key";

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub hash_key: String,
    pub sender_email: String,
    pub doctor_email: String,
    pub openai_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_service_role_key: String::new(),
            hash_key: TEST_HASH_KEY.to_string(),
            sender_email: "care@medikah.test".to_string(),
            doctor_email: "doctor@medikah.test".to_string(),
            openai_api_key: String::new(),
        }
    }
}

impl TestConfig {
    /// Config backed by a (mock) Supabase instance instead of memory.
    pub fn with_supabase(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            appointment_hash_key: self.hash_key.clone(),
            notification_sender_email: self.sender_email.clone(),
            doctor_notification_email: self.doctor_email.clone(),
            doxy_base_url: "https://doxy.me/medikah-test".to_string(),
            on_call_doctor_name: "Dr. Test".to_string(),
            doctor_pool: vec!["Dr. Test".to_string()],
            email_sandbox_mode: true,
            appointment_duration_minutes: 30,
            sendgrid_api_key: String::new(),
            resend_api_key: String::new(),
            openai_api_key: self.openai_api_key.clone(),
            openai_model: "gpt-4o".to_string(),
            session_ttl_minutes: 90,
            rejection_target: RejectionTarget::Auto,
            default_timezone: "UTC".to_string(),
            default_locale: "en".to_string(),
            port: 0,
        }
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn session_row(session_id: &str, stage: &str, updated_at: DateTime<Utc>) -> serde_json::Value {
        json!({
            "session_id": session_id,
            "stage": stage,
            "patient_name": null,
            "patient_email": null,
            "symptom_overview": null,
            "symptom_history": null,
            "preferred_time_utc": null,
            "locale": "en",
            "timezone": "UTC",
            "emergency_flag": false,
            "appointment_id": null,
            "appointment_confirmed_at": null,
            "notes": [],
            "message_history": [],
            "created_at": updated_at.to_rfc3339(),
            "updated_at": updated_at.to_rfc3339()
        })
    }

    pub fn appointment_row(patient_name: &str, contact_hash: &str) -> serde_json::Value {
        json!({
            "appointment_id": Uuid::new_v4(),
            "patient_name": patient_name,
            "patient_contact_hash": contact_hash,
            "appointment_time": "2030-01-15T15:00:00Z",
            "created_at": "2030-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
