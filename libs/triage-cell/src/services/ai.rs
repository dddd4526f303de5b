// libs/triage-cell/src/services/ai.rs
//! Optional conversational wording from an OpenAI-compatible chat
//! completions endpoint. The canned reply is always the fallback.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use shared_config::AppConfig;
use shared_utils::validation::redact_emails;

use crate::models::{Session, Stage, TurnRole};
use crate::services::replies::ReplyKey;

pub const OPENAI_API_URL: &str = "https://api.openai.com";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const HISTORY_TURNS_IN_PROMPT: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// `None` means "use the canned reply".
    async fn generate(
        &self,
        session: &Session,
        user_message: &str,
        reply: ReplyKey,
        canned: &str,
    ) -> Option<String>;
}

fn stage_task(stage: Stage) -> &'static str {
    match stage {
        Stage::Welcome => "Greet the patient warmly, say you are here to connect them with a doctor and ask what brings them in today.",
        Stage::CollectSymptoms => "Ask what symptoms or concerns they would like to discuss with the doctor. They may be nervous, so validate their feelings if they express anxiety.",
        Stage::CollectHistory => "Briefly acknowledge what they shared, then ask when the symptoms started and whether they are getting better, worse or staying the same.",
        Stage::CollectName => "Ask for the patient's full name. If they asked a question instead, answer it briefly and gently ask for their name again.",
        Stage::CollectEmail => "Ask for the email address where appointment details should be sent. If the last one was invalid, kindly ask them to double-check it.",
        Stage::CollectTiming => "Ask when they would like a telemedicine visit. If the last answer could not be understood, suggest a format like 'February 5 at 3pm' or '2026-02-05 15:00'.",
        Stage::ConfirmSummary => "Ask the patient to confirm the collected details or say what to change.",
        Stage::Scheduled => "The appointment is booked. Offer to answer other questions while they wait.",
        Stage::EmergencyEscalated => "The patient has been told to seek emergency care. Stay calm and supportive and do not schedule anything.",
    }
}

fn collected_fields(session: &Session) -> String {
    let field = |label: &str, value: Option<String>| match value {
        Some(value) => format!("  - {}: {}", label, value),
        None => format!("  - {}: NOT YET COLLECTED", label),
    };

    [
        field("Primary concern", session.symptom_overview.clone()),
        field("History", session.symptom_history.clone()),
        field("Name", session.patient_name.clone()),
        field("Email", session.patient_email.as_ref().map(|_| "provided".to_string())),
        field("Preferred time", session.preferred_time.map(|time| time.to_rfc3339())),
    ]
    .join("\n")
}

pub fn build_system_prompt(session: &Session, doctor_name: &str, canned: &str) -> String {
    format!(
        "You are Medikah's virtual intake assistant, a warm and empathetic healthcare concierge \
who helps patients prepare for telemedicine visits.

ABOUT MEDIKAH:
- Telehealth service connecting patients with doctors across the Americas
- Visits are secure Doxy.me video calls
- The on-call doctor is {doctor}

PATIENT DATA COLLECTED SO FAR:
{fields}

YOUR CURRENT TASK:
{task}

SUGGESTED REPLY (keep its meaning, you may rephrase):
{canned}

LANGUAGE:
Respond only in {language}.

RULES:
1. Never diagnose or give medical advice; the doctor will help with that
2. If the patient asks about cost, privacy or how telemedicine works, answer briefly and return to the intake
3. No more than 4 sentences
4. Do not ask for information you already have
5. If anything sounds like a medical emergency, tell them to call emergency services immediately",
        doctor = doctor_name,
        fields = collected_fields(session),
        task = stage_task(session.stage),
        canned = canned,
        language = session.locale.display_name(),
    )
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

pub struct OpenAiReplyGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    doctor_name: String,
    max_tokens: u32,
    temperature: f32,
    request_timeout: Duration,
}

impl OpenAiReplyGenerator {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(config, OPENAI_API_URL)
    }

    pub fn with_base_url(config: &AppConfig, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            doctor_name: config.on_call_doctor_name.clone(),
            max_tokens: 300,
            temperature: 0.7,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Chat turns are forwarded with email addresses redacted.
    fn request_body(&self, session: &Session, user_message: &str, canned: &str) -> Value {
        let mut messages = vec![json!({
            "role": "system",
            "content": build_system_prompt(session, &self.doctor_name, canned),
        })];

        // The current message is already the newest turn in the history.
        let history = session.recent_turns(HISTORY_TURNS_IN_PROMPT);
        for turn in history {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            };
            messages.push(json!({ "role": role, "content": redact_emails(&turn.content) }));
        }
        if history.last().map(|turn| turn.content.as_str()) != Some(user_message) {
            messages.push(json!({ "role": "user", "content": redact_emails(user_message) }));
        }

        json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        })
    }

    async fn complete(&self, body: &Value) -> Result<Option<String>, reqwest::Error> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        let completion: CompletionResponse = response.json().await?;
        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty()))
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiReplyGenerator {
    #[instrument(skip_all, fields(session_id = %session.id, stage = %session.stage))]
    async fn generate(
        &self,
        session: &Session,
        user_message: &str,
        reply: ReplyKey,
        canned: &str,
    ) -> Option<String> {
        if !reply.allows_generated_text() {
            return None;
        }

        let body = self.request_body(session, user_message, canned);
        let completed = match timeout(self.request_timeout, self.complete(&body)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Reply generation timed out after {:?}; using canned reply", self.request_timeout);
                return None;
            }
        };
        match completed {
            Ok(Some(text)) => {
                debug!("Generated reply for {:?}", reply);
                Some(text)
            }
            Ok(None) => {
                warn!("Empty completion; using canned reply");
                None
            }
            Err(e) => {
                warn!("Reply generation failed, using canned reply: {}", e);
                None
            }
        }
    }
}
