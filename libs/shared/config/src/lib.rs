use std::env;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 90;
pub const DEFAULT_APPOINTMENT_DURATION_MINUTES: i64 = 30;
pub const DEFAULT_DOCTOR_POOL: &str = "Dr. Alvarez,Dr. Gutierrez,Dr. Lopez";

/// Keys without which a real booking cannot be made.
pub const REQUIRED_BOOKING_KEYS: [&str; 2] = ["APPOINTMENT_HASH_KEY", "NOTIFICATION_SENDER_EMAIL"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
}

/// Where the confirmation step sends a patient who rejects the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionTarget {
    /// Route by what the patient mentions, falling back to symptoms.
    Auto,
    Timing,
    Symptoms,
}

impl RejectionTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "timing" | "time" => Some(Self::Timing),
            "symptoms" => Some(Self::Symptoms),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub appointment_hash_key: String,
    pub notification_sender_email: String,
    pub doctor_notification_email: String,
    pub doxy_base_url: String,
    pub on_call_doctor_name: String,
    pub doctor_pool: Vec<String>,
    pub email_sandbox_mode: bool,
    pub appointment_duration_minutes: i64,
    pub sendgrid_api_key: String,
    pub resend_api_key: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub session_ttl_minutes: i64,
    pub rejection_target: RejectionTarget,
    pub default_timezone: String,
    pub default_locale: String,
    pub port: u16,
}

/// The two settings a real booking cannot do without.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub hash_key: String,
    pub sender_email: String,
}

fn var_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using default", key);
        default.to_string()
    })
}

pub fn parse_bool_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Upper bound for any minute-valued setting: one year.
pub const MAX_MINUTES: i64 = 60 * 24 * 366;

fn positive_minutes(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(raw) => parse_minutes(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_minutes(key: &str, raw: &str, default: i64) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > MAX_MINUTES => {
            warn!("{}={} is too large; capping at {}", key, raw, MAX_MINUTES);
            MAX_MINUTES
        }
        Ok(value) if value > 0 => value,
        _ => {
            warn!("Invalid {}={}; defaulting to {}", key, raw, default);
            default
        }
    }
}

pub fn parse_doctor_pool(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Self {
        let rejection_raw = env::var("TRIAGE_REJECTION_TARGET").unwrap_or_else(|_| "auto".into());
        let rejection_target = RejectionTarget::parse(&rejection_raw).unwrap_or_else(|| {
            warn!("Unknown TRIAGE_REJECTION_TARGET={}; using auto", rejection_raw);
            RejectionTarget::Auto
        });

        let port = env::var("PORT")
            .ok()
            .and_then(|raw| raw.parse::<u16>().ok())
            .unwrap_or(3000);

        // The original deployment used the SendGrid-specific flag name.
        let sandbox_raw = env::var("EMAIL_SANDBOX_MODE")
            .or_else(|_| env::var("SENDGRID_SANDBOX_MODE"))
            .unwrap_or_else(|_| "false".into());

        let config = Self {
            supabase_url: var_or_empty("SUPABASE_URL"),
            supabase_service_role_key: var_or_empty("SUPABASE_SERVICE_ROLE_KEY"),
            appointment_hash_key: var_or_empty("APPOINTMENT_HASH_KEY"),
            notification_sender_email: var_or_empty("NOTIFICATION_SENDER_EMAIL"),
            doctor_notification_email: var_or_empty("DOCTOR_NOTIFICATION_EMAIL"),
            doxy_base_url: var_or("DOXY_BASE_URL", "https://doxy.me/medikah"),
            on_call_doctor_name: var_or("ON_CALL_DOCTOR_NAME", "our on-call doctor"),
            doctor_pool: parse_doctor_pool(&var_or("SCHEDULER_DOCTORS", DEFAULT_DOCTOR_POOL)),
            email_sandbox_mode: parse_bool_flag(&sandbox_raw),
            appointment_duration_minutes: positive_minutes(
                "APPOINTMENT_DURATION_MINUTES",
                DEFAULT_APPOINTMENT_DURATION_MINUTES,
            ),
            sendgrid_api_key: env::var("SENDGRID_API_KEY").unwrap_or_default(),
            resend_api_key: env::var("RESEND_API_KEY").unwrap_or_default(),
            openai_api_key: var_or_empty("OPENAI_API_KEY"),
            openai_model: var_or("OPENAI_MODEL", "gpt-4o"),
            session_ttl_minutes: positive_minutes("SESSION_TTL_MINUTES", DEFAULT_SESSION_TTL_MINUTES),
            rejection_target,
            default_timezone: var_or("DEFAULT_TIMEZONE", "UTC"),
            default_locale: var_or("DEFAULT_LOCALE", "en"),
            port,
        };

        if let Err(e) = config.booking_settings() {
            warn!("Bookings disabled until configured: {}", e);
        }
        if !config.is_database_configured() {
            warn!("Supabase not configured - sessions and appointments kept in memory");
        }

        config
    }

    pub fn booking_settings(&self) -> Result<BookingSettings, ConfigError> {
        if self.appointment_hash_key.trim().is_empty() {
            return Err(ConfigError::Missing("APPOINTMENT_HASH_KEY"));
        }
        if self.notification_sender_email.trim().is_empty() {
            return Err(ConfigError::Missing("NOTIFICATION_SENDER_EMAIL"));
        }
        Ok(BookingSettings {
            hash_key: self.appointment_hash_key.clone(),
            sender_email: self.notification_sender_email.clone(),
        })
    }

    pub fn is_database_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_role_key.is_empty()
    }

    pub fn is_ai_configured(&self) -> bool {
        !self.openai_api_key.is_empty()
    }

    /// Status line per required key, as printed by `--check-config`.
    pub fn required_key_report(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("APPOINTMENT_HASH_KEY", !self.appointment_hash_key.trim().is_empty()),
            ("NOTIFICATION_SENDER_EMAIL", !self.notification_sender_email.trim().is_empty()),
            (
                "SENDGRID_API_KEY or RESEND_API_KEY",
                !self.sendgrid_api_key.is_empty() || !self.resend_api_key.is_empty(),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_flag_parsing() {
        for raw in ["1", "true", "YES", " on "] {
            assert!(parse_bool_flag(raw), "{} should be truthy", raw);
        }
        for raw in ["0", "false", "", "maybe"] {
            assert!(!parse_bool_flag(raw), "{} should be falsy", raw);
        }
    }

    #[test]
    fn test_minutes_are_positive_and_capped() {
        assert_eq!(parse_minutes("SESSION_TTL_MINUTES", " 45 ", 90), 45);
        assert_eq!(parse_minutes("SESSION_TTL_MINUTES", "0", 90), 90);
        assert_eq!(parse_minutes("SESSION_TTL_MINUTES", "soon", 90), 90);
        assert_eq!(parse_minutes("SESSION_TTL_MINUTES", "9223372036854775807", 90), MAX_MINUTES);
    }

    #[test]
    fn test_doctor_pool_skips_blanks() {
        let pool = parse_doctor_pool("Dr. A, ,Dr. B,");
        assert_eq!(pool, vec!["Dr. A".to_string(), "Dr. B".to_string()]);
    }

    #[test]
    fn test_rejection_target_parse() {
        assert_eq!(RejectionTarget::parse("Timing"), Some(RejectionTarget::Timing));
        assert_eq!(RejectionTarget::parse("symptoms"), Some(RejectionTarget::Symptoms));
        assert_eq!(RejectionTarget::parse("auto"), Some(RejectionTarget::Auto));
        assert_eq!(RejectionTarget::parse("elsewhere"), None);
    }
}
