use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::AppointmentError;
use shared_models::locale::Locale;

/// Turns kept in a session; the newest are handed to the reply generator.
pub const MAX_MESSAGE_HISTORY: usize = 20;
pub const MAX_CHAT_MESSAGE_LENGTH: usize = 4000;

// ==============================================================================
// STAGES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Welcome,
    CollectSymptoms,
    CollectHistory,
    CollectName,
    CollectEmail,
    CollectTiming,
    ConfirmSummary,
    Scheduled,
    EmergencyEscalated,
}

impl Stage {
    /// The main path, in order. `EmergencyEscalated` sits beside it.
    pub const ORDER: [Stage; 8] = [
        Stage::Welcome,
        Stage::CollectSymptoms,
        Stage::CollectHistory,
        Stage::CollectName,
        Stage::CollectEmail,
        Stage::CollectTiming,
        Stage::ConfirmSummary,
        Stage::Scheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Welcome => "welcome",
            Stage::CollectSymptoms => "collect_symptoms",
            Stage::CollectHistory => "collect_history",
            Stage::CollectName => "collect_name",
            Stage::CollectEmail => "collect_email",
            Stage::CollectTiming => "collect_timing",
            Stage::ConfirmSummary => "confirm_summary",
            Stage::Scheduled => "scheduled",
            Stage::EmergencyEscalated => "emergency_escalated",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Scheduled | Stage::EmergencyEscalated)
    }

    pub fn next(&self) -> Option<Stage> {
        let position = Stage::ORDER.iter().position(|stage| stage == self)?;
        Stage::ORDER.get(position + 1).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = TriageError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Stage::ORDER
            .iter()
            .chain(std::iter::once(&Stage::EmergencyEscalated))
            .find(|stage| stage.as_str() == raw)
            .copied()
            .ok_or_else(|| TriageError::Store(format!("unknown stage '{}'", raw)))
    }
}

// ==============================================================================
// SESSION
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Everything known about one intake conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "session_id")]
    pub id: String,
    pub stage: Stage,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub symptom_overview: Option<String>,
    pub symptom_history: Option<String>,
    #[serde(rename = "preferred_time_utc")]
    pub preferred_time: Option<DateTime<Utc>>,
    pub locale: Locale,
    /// IANA zone name.
    pub timezone: String,
    pub emergency_flag: bool,
    pub appointment_id: Option<Uuid>,
    #[serde(rename = "appointment_confirmed_at")]
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Set while the patient corrects a detail from the summary.
    #[serde(default)]
    pub revising: bool,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub message_history: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, locale: Locale, timezone: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            stage: Stage::Welcome,
            patient_name: None,
            patient_email: None,
            symptom_overview: None,
            symptom_history: None,
            preferred_time: None,
            locale,
            timezone: timezone.to_string(),
            emergency_flag: false,
            appointment_id: None,
            confirmed_at: None,
            revising: false,
            notes: Vec::new(),
            message_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.updated_at > ttl
    }

    pub fn push_turn(&mut self, role: TurnRole, content: &str) {
        self.message_history.push(ChatTurn {
            role,
            content: content.to_string(),
        });
        if self.message_history.len() > MAX_MESSAGE_HISTORY {
            let excess = self.message_history.len() - MAX_MESSAGE_HISTORY;
            self.message_history.drain(..excess);
        }
    }

    pub fn recent_turns(&self, count: usize) -> &[ChatTurn] {
        let start = self.message_history.len().saturating_sub(count);
        &self.message_history[start..]
    }
}

/// Public view of a session: progress and flags, never contact details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub stage: Stage,
    pub locale: Locale,
    pub timezone: String,
    pub emergency_flag: bool,
    pub appointment_confirmed: bool,
    pub appointment_id: Option<Uuid>,
    pub preferred_time_utc: Option<DateTime<Utc>>,
    pub has_name: bool,
    pub has_email: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            stage: session.stage,
            locale: session.locale,
            timezone: session.timezone.clone(),
            emergency_flag: session.emergency_flag,
            appointment_confirmed: session.appointment_id.is_some(),
            appointment_id: session.appointment_id,
            preferred_time_utc: session.preferred_time,
            has_name: session.patient_name.is_some(),
            has_email: session.patient_email.is_some(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

// ==============================================================================
// HTTP PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
}

/// Call to action shown next to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageAction {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
    pub stage: Stage,
    pub actions: Vec<TriageAction>,
    pub appointment_confirmed: bool,
    pub emergency_noted: bool,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Session store error: {0}")]
    Store(String),

    #[error(transparent)]
    Booking(#[from] AppointmentError),
}
