// libs/triage-cell/src/services/conversation.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use appointment_cell::services::scheduling::parse_timezone;
use appointment_cell::{AppointmentError, BookingOutcome, BookingRequest, BookingService};
use shared_models::locale::Locale;

use crate::models::{
    ChatRequest, ChatResponse, Session, SessionSnapshot, Stage, TriageAction, TriageError,
    TurnRole, MAX_CHAT_MESSAGE_LENGTH,
};
use crate::services::ai::ReplyGenerator;
use crate::services::locks::SessionLocks;
use crate::services::replies::{self, ReplyKey, ReplyVars};
use crate::services::session_store::{generate_session_token, SessionStore};
use crate::services::stage_machine::{advance, TriageSettings};

/// Runs one chat turn end to end: load, advance, book if asked, reply, save.
pub struct TriageService {
    sessions: Arc<dyn SessionStore>,
    booking: Arc<BookingService>,
    replies: Option<Arc<dyn ReplyGenerator>>,
    locks: SessionLocks,
    /// Booked sessions whose final save failed. They shadow the stored copy
    /// until a later save succeeds, so a retry never books twice.
    unsaved: Mutex<HashMap<String, Session>>,
    settings: TriageSettings,
}

impl TriageService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        booking: Arc<BookingService>,
        replies: Option<Arc<dyn ReplyGenerator>>,
        settings: TriageSettings,
    ) -> Self {
        Self {
            sessions,
            booking,
            replies,
            locks: SessionLocks::new(),
            unsaved: Mutex::new(HashMap::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &TriageSettings {
        &self.settings
    }

    fn new_session(&self, request: &ChatRequest) -> Session {
        let locale = request
            .locale
            .as_deref()
            .and_then(Locale::from_hint)
            .unwrap_or(self.settings.default_locale);
        let timezone = parse_timezone(request.timezone.as_deref(), self.settings.default_timezone);
        let session = Session::new(generate_session_token(), locale, timezone.name(), Utc::now());
        info!("Started session {} ({}, {})", session.id, locale, session.timezone);
        session
    }

    fn unsaved(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.unsaved.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn load(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Session>, TriageError> {
        let held = self.unsaved().get(id).cloned();
        match held {
            Some(session) if session.is_expired(now, self.settings.session_ttl) => {
                self.unsaved().remove(id);
                Ok(None)
            }
            Some(session) => Ok(Some(session)),
            None => self.sessions.get(id, now).await,
        }
    }

    /// A failed save is fatal for the turn unless the session already holds
    /// an appointment; that state is kept in memory and the turn succeeds.
    async fn persist(&self, session: &Session) -> Result<(), TriageError> {
        match self.sessions.save(session).await {
            Ok(()) => {
                self.unsaved().remove(&session.id);
                Ok(())
            }
            Err(e) if session.appointment_id.is_some() => {
                error!("Could not save booked session {}: {}; holding it in memory", session.id, e);
                self.unsaved().insert(session.id.clone(), session.clone());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, request), fields(session_id = ?request.session_id))]
    pub async fn handle_message(&self, request: ChatRequest) -> Result<ChatResponse, TriageError> {
        if request.message.chars().count() > MAX_CHAT_MESSAGE_LENGTH {
            return Err(TriageError::InvalidMessage(format!(
                "message must be at most {} characters",
                MAX_CHAT_MESSAGE_LENGTH
            )));
        }

        let requested_id = request.session_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
        let _guard = match requested_id {
            Some(id) => Some(self.locks.acquire(id).await),
            None => None,
        };

        let now = Utc::now();
        let existing = match requested_id {
            Some(id) => self.load(id, now).await?,
            None => None,
        };
        let mut session = match existing {
            Some(session) => session,
            None => {
                if let Some(id) = requested_id {
                    info!("Session {} unknown or expired; issuing a new one", id);
                }
                self.new_session(&request)
            }
        };

        if let Some(hint) = request.locale.as_deref().and_then(Locale::from_hint) {
            session.locale = hint;
        }

        session.push_turn(TurnRole::User, &request.message);
        let transition = advance(session, &request.message, now, &self.settings);
        let mut session = transition.session;
        let mut reply = transition.reply;
        let mut actions = Vec::new();
        let mut vars = ReplyVars {
            name: session.patient_name.clone(),
            doctor: self.settings.on_call_doctor_name.clone(),
            ..ReplyVars::default()
        };

        if transition.book_appointment && session.appointment_id.is_some() {
            warn!("Session {} already holds an appointment; not booking again", session.id);
            reply = ReplyKey::ScheduledFollowUp;
        } else if transition.book_appointment {
            match self.book(&session).await {
                Ok(outcome) => {
                    session.appointment_id = Some(outcome.appointment.id);
                    session.confirmed_at = Some(outcome.appointment.created_at);
                    reply = if outcome.notifications.patient {
                        ReplyKey::BookingConfirmed
                    } else {
                        ReplyKey::BookingConfirmedEmailFailed
                    };
                    vars.doctor = outcome.assigned_doctor.clone();
                    vars.when = Some(outcome.scheduled_for_display.clone());
                    actions = booking_actions(&outcome, session.locale);
                }
                Err(AppointmentError::NotConfigured(missing)) => {
                    error!("Cannot book for session {}: {} not configured", session.id, missing);
                    session.stage = Stage::ConfirmSummary;
                    session.updated_at = now;
                    self.persist(&session).await?;
                    return Err(AppointmentError::NotConfigured(missing).into());
                }
                Err(e) => {
                    warn!("Booking failed for session {}: {}", session.id, e);
                    session.stage = Stage::ConfirmSummary;
                    session.notes.push(format!("booking_failed: {}", e));
                    reply = ReplyKey::BookingRetry;
                }
            }
        }

        if reply == ReplyKey::ConfirmSummary {
            let tz = parse_timezone(Some(&session.timezone), self.settings.default_timezone);
            vars.summary = Some(replies::summary(&session, tz));
        }

        let canned = replies::render(reply, session.locale, &vars);
        let text = match &self.replies {
            Some(generator) if reply.allows_generated_text() => generator
                .generate(&session, &request.message, reply, &canned)
                .await
                .unwrap_or(canned),
            _ => canned,
        };

        session.push_turn(TurnRole::Assistant, &text);
        session.updated_at = now;
        self.persist(&session).await?;

        Ok(ChatResponse {
            reply: text,
            session_id: session.id.clone(),
            stage: session.stage,
            actions,
            appointment_confirmed: session.appointment_id.is_some(),
            emergency_noted: session.emergency_flag || transition.emergency_noted,
        })
    }

    async fn book(&self, session: &Session) -> Result<BookingOutcome, AppointmentError> {
        let (Some(name), Some(email), Some(scheduled_time)) = (
            session.patient_name.clone(),
            session.patient_email.clone(),
            session.preferred_time,
        ) else {
            return Err(AppointmentError::ValidationError(
                "session is missing name, email or preferred time".to_string(),
            ));
        };

        let symptoms = match (&session.symptom_overview, &session.symptom_history) {
            (Some(overview), Some(history)) => Some(format!("{}\n{}", overview, history)),
            (overview, history) => overview.clone().or_else(|| history.clone()),
        };

        self.booking
            .book(BookingRequest {
                patient_name: name,
                patient_email: email,
                scheduled_time,
                timezone: parse_timezone(Some(&session.timezone), self.settings.default_timezone),
                locale: session.locale,
                symptoms,
                notes: vec![format!("Intake session: {}", session.id)],
            })
            .await
    }

    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, TriageError> {
        self.load(session_id, Utc::now())
            .await?
            .map(|session| SessionSnapshot::from(&session))
            .ok_or(TriageError::SessionNotFound)
    }
}

fn booking_actions(outcome: &BookingOutcome, locale: Locale) -> Vec<TriageAction> {
    let (join, calendar) = match locale {
        Locale::En => ("Join your visit", "Add to calendar"),
        Locale::Es => ("Unirse a la consulta", "Agregar al calendario"),
    };
    vec![
        TriageAction {
            label: join.to_string(),
            url: outcome.join_link.clone(),
        },
        TriageAction {
            label: calendar.to_string(),
            url: outcome.calendar_link.clone(),
        },
    ]
}
