// libs/triage-cell/src/services/stage_machine.rs
//! Pure intake state machine. One incoming message in, the updated session
//! and the reply to give out. No I/O happens here; booking is requested
//! through `Transition::book_appointment` and carried out by the caller.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use appointment_cell::services::scheduling::{parse_datetime, parse_timezone, ParseFailure};
use shared_config::{AppConfig, RejectionTarget, MAX_MINUTES};
use shared_models::locale::Locale;

use crate::models::{Session, Stage};
use crate::services::emergency;
use crate::services::extract::{
    classify_confirmation, extract_email, extract_free_text, extract_name, ConfirmationReply,
    EditField,
};
use crate::services::replies::ReplyKey;

#[derive(Debug, Clone)]
pub struct TriageSettings {
    pub rejection_target: RejectionTarget,
    pub default_timezone: Tz,
    pub default_locale: Locale,
    pub on_call_doctor_name: String,
    pub session_ttl: Duration,
}

impl TriageSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            rejection_target: config.rejection_target,
            default_timezone: parse_timezone(Some(&config.default_timezone), Tz::UTC),
            default_locale: Locale::from_hint(&config.default_locale).unwrap_or_default(),
            on_call_doctor_name: config.on_call_doctor_name.clone(),
            session_ttl: Duration::minutes(config.session_ttl_minutes.clamp(1, MAX_MINUTES)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub session: Session,
    pub reply: ReplyKey,
    pub book_appointment: bool,
    /// An emergency keyword was seen on this turn.
    pub emergency_noted: bool,
}

impl Transition {
    fn reply(session: Session, reply: ReplyKey) -> Self {
        Self {
            session,
            reply,
            book_appointment: false,
            emergency_noted: false,
        }
    }
}

fn ask_for(stage: Stage) -> ReplyKey {
    match stage {
        Stage::CollectSymptoms => ReplyKey::AskSymptoms,
        Stage::CollectHistory => ReplyKey::AskHistory,
        Stage::CollectName => ReplyKey::AskName,
        Stage::CollectEmail => ReplyKey::AskEmail,
        Stage::CollectTiming => ReplyKey::AskTiming,
        Stage::ConfirmSummary => ReplyKey::ConfirmSummary,
        Stage::Welcome => ReplyKey::ReadyWhenYouAre,
        Stage::Scheduled => ReplyKey::ScheduledFollowUp,
        Stage::EmergencyEscalated => ReplyKey::EmergencyFollowUp,
    }
}

/// Moves past a stage whose value was just collected. A correction made
/// from the summary goes straight back to it, except that new symptoms
/// are followed by their history.
fn complete(mut session: Session) -> Transition {
    let next = if session.revising && session.stage != Stage::CollectSymptoms {
        session.revising = false;
        Stage::ConfirmSummary
    } else {
        session.stage.next().unwrap_or(Stage::ConfirmSummary)
    };

    debug!("Session {} {} -> {}", session.id, session.stage, next);
    session.stage = next;
    Transition::reply(session, ask_for(next))
}

fn timing_clarification(failure: ParseFailure) -> ReplyKey {
    match failure {
        ParseFailure::Unrecognized => ReplyKey::ClarifyTimingUnrecognized,
        ParseFailure::InPast => ReplyKey::ClarifyTimingPast,
        ParseFailure::OutOfRange => ReplyKey::ClarifyTimingOutOfRange,
    }
}

fn rejection_field(target: RejectionTarget, mentioned: Option<EditField>) -> EditField {
    match target {
        RejectionTarget::Timing => EditField::Timing,
        RejectionTarget::Symptoms => EditField::Symptoms,
        RejectionTarget::Auto => mentioned.unwrap_or(EditField::Symptoms),
    }
}

fn reopen(mut session: Session, field: EditField) -> Transition {
    let (stage, reply) = match field {
        EditField::Symptoms => {
            session.symptom_overview = None;
            session.symptom_history = None;
            (Stage::CollectSymptoms, ReplyKey::EditSymptoms)
        }
        EditField::Name => {
            session.patient_name = None;
            (Stage::CollectName, ReplyKey::EditName)
        }
        EditField::Email => {
            session.patient_email = None;
            (Stage::CollectEmail, ReplyKey::EditEmail)
        }
        EditField::Timing => {
            session.preferred_time = None;
            (Stage::CollectTiming, ReplyKey::EditTiming)
        }
    };

    debug!("Session {} reopened at {}", session.id, stage);
    session.stage = stage;
    session.revising = true;
    Transition::reply(session, reply)
}

/// Applies one patient message to the session.
pub fn advance(
    mut session: Session,
    text: &str,
    now: DateTime<Utc>,
    settings: &TriageSettings,
) -> Transition {
    let text = text.trim();

    if emergency::detect(text, Some(session.locale)) {
        if session.stage.is_terminal() {
            let mut transition = Transition::reply(session, ReplyKey::EmergencySafety);
            transition.emergency_noted = true;
            return transition;
        }

        warn!("Emergency escalation for session {} at stage {}", session.id, session.stage);
        session.emergency_flag = true;
        session.revising = false;
        session.notes.push(format!("emergency_flagged: {}", text));
        session.stage = Stage::EmergencyEscalated;
        let mut transition = Transition::reply(session, ReplyKey::EmergencySafety);
        transition.emergency_noted = true;
        return transition;
    }

    match session.stage {
        Stage::Scheduled => return Transition::reply(session, ReplyKey::ScheduledFollowUp),
        Stage::EmergencyEscalated => return Transition::reply(session, ReplyKey::EmergencyFollowUp),
        _ => {}
    }

    if text.is_empty() {
        return Transition::reply(session, ReplyKey::ReadyWhenYouAre);
    }

    match session.stage {
        Stage::Welcome => complete(session),

        Stage::CollectSymptoms => match extract_free_text(text) {
            Some(overview) => {
                session.notes.push(format!("symptom_overview: {}", overview));
                session.symptom_overview = Some(overview);
                complete(session)
            }
            None => Transition::reply(session, ReplyKey::ClarifySymptoms),
        },

        Stage::CollectHistory => match extract_free_text(text) {
            Some(history) => {
                session.notes.push(format!("symptom_history: {}", history));
                session.symptom_history = Some(match session.symptom_history.take() {
                    Some(existing) => format!("{}\n{}", existing, history),
                    None => history,
                });
                complete(session)
            }
            None => Transition::reply(session, ReplyKey::ClarifyHistory),
        },

        Stage::CollectName => match extract_name(text) {
            Some(name) => {
                session.notes.push(format!("name_raw: {}", text));
                session.patient_name = Some(name);
                complete(session)
            }
            None => Transition::reply(session, ReplyKey::ClarifyName),
        },

        Stage::CollectEmail => match extract_email(text) {
            Some(email) => {
                session.notes.push(format!("email_raw: {}", text));
                session.patient_email = Some(email);
                complete(session)
            }
            None => Transition::reply(session, ReplyKey::ClarifyEmail),
        },

        Stage::CollectTiming => {
            let tz = parse_timezone(Some(&session.timezone), settings.default_timezone);
            match parse_datetime(text, now, tz) {
                Ok(preferred) => {
                    session.notes.push(format!("preferred_time_input: {}", text));
                    session.preferred_time = Some(preferred);
                    complete(session)
                }
                Err(failure) => {
                    debug!("Session {} timing not accepted: {}", session.id, failure);
                    Transition::reply(session, timing_clarification(failure))
                }
            }
        }

        Stage::ConfirmSummary => {
            session.notes.push(format!("summary_feedback: {}", text));
            match classify_confirmation(text) {
                ConfirmationReply::Confirm => {
                    session.stage = Stage::Scheduled;
                    session.revising = false;
                    Transition {
                        session,
                        reply: ReplyKey::BookingConfirmed,
                        book_appointment: true,
                        emergency_noted: false,
                    }
                }
                ConfirmationReply::Reject(mentioned) => {
                    reopen(session, rejection_field(settings.rejection_target, mentioned))
                }
                ConfirmationReply::Unclear => {
                    Transition::reply(session, ReplyKey::ClarifyConfirmation)
                }
            }
        }

        Stage::Scheduled | Stage::EmergencyEscalated => {
            let reply = ask_for(session.stage);
            Transition::reply(session, reply)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn settings(target: RejectionTarget) -> TriageSettings {
        TriageSettings {
            rejection_target: target,
            default_timezone: Tz::UTC,
            default_locale: Locale::En,
            on_call_doctor_name: "Dr. Test".to_string(),
            session_ttl: Duration::minutes(90),
        }
    }

    #[test]
    fn test_oversized_ttl_is_capped() {
        let mut config = shared_utils::test_utils::TestConfig::default().to_app_config();
        config.session_ttl_minutes = i64::MAX;
        assert_eq!(TriageSettings::from_config(&config).session_ttl, Duration::minutes(MAX_MINUTES));
    }

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 14, 12, 0, 0).unwrap()
    }

    fn session_at(stage: Stage) -> Session {
        let mut session = Session::new("s1".to_string(), Locale::En, "UTC", reference());
        session.stage = stage;
        session
    }

    fn summary_ready() -> Session {
        let mut session = session_at(Stage::ConfirmSummary);
        session.symptom_overview = Some("headache".to_string());
        session.symptom_history = Some("two days".to_string());
        session.patient_name = Some("Jane Doe".to_string());
        session.patient_email = Some("jane@example.com".to_string());
        session.preferred_time = Some(Utc.with_ymd_and_hms(2030, 1, 15, 15, 0, 0).unwrap());
        session
    }

    fn step(session: Session, text: &str) -> Transition {
        advance(session, text, reference(), &settings(RejectionTarget::Auto))
    }

    #[test]
    fn test_welcome_moves_to_symptoms_without_extraction() {
        let transition = step(session_at(Stage::Welcome), "I have a headache");
        assert_eq!(transition.session.stage, Stage::CollectSymptoms);
        assert_eq!(transition.reply, ReplyKey::AskSymptoms);
        assert_eq!(transition.session.symptom_overview, None);
    }

    #[test]
    fn test_blank_message_stays_put() {
        let transition = step(session_at(Stage::CollectName), "   ");
        assert_eq!(transition.session.stage, Stage::CollectName);
        assert_eq!(transition.reply, ReplyKey::ReadyWhenYouAre);
    }

    #[test]
    fn test_emergency_escalates_from_every_open_stage() {
        for stage in Stage::ORDER.iter().filter(|stage| !stage.is_terminal()) {
            let transition = step(session_at(*stage), "chest pain and can't breathe");
            assert_eq!(transition.session.stage, Stage::EmergencyEscalated, "from {}", stage);
            assert_eq!(transition.reply, ReplyKey::EmergencySafety);
            assert!(transition.session.emergency_flag);
            assert!(transition.emergency_noted);
            assert!(!transition.book_appointment);
            assert_eq!(transition.session.notes, vec!["emergency_flagged: chest pain and can't breathe"]);
        }
    }

    #[test]
    fn test_emergency_after_scheduling_does_not_mutate() {
        let mut scheduled = summary_ready();
        scheduled.stage = Stage::Scheduled;
        let transition = step(scheduled.clone(), "now I can't breathe");
        assert_eq!(transition.reply, ReplyKey::EmergencySafety);
        assert!(transition.emergency_noted);
        assert_eq!(transition.session, scheduled);
    }

    #[test]
    fn test_terminal_stages_give_follow_up() {
        let transition = step(session_at(Stage::Scheduled), "thanks!");
        assert_eq!(transition.reply, ReplyKey::ScheduledFollowUp);
        assert_eq!(transition.session.stage, Stage::Scheduled);

        let transition = step(session_at(Stage::EmergencyEscalated), "ok");
        assert_eq!(transition.reply, ReplyKey::EmergencyFollowUp);
        assert_eq!(transition.session.stage, Stage::EmergencyEscalated);
    }

    #[test]
    fn test_history_appends() {
        let mut session = session_at(Stage::CollectHistory);
        session.symptom_history = Some("started Monday".to_string());
        let transition = step(session, "worse at night");
        assert_eq!(
            transition.session.symptom_history.as_deref(),
            Some("started Monday\nworse at night")
        );
        assert_eq!(transition.session.stage, Stage::CollectName);
    }

    #[test]
    fn test_name_and_email_collection() {
        let transition = step(session_at(Stage::CollectName), "my name is jane doe");
        assert_eq!(transition.session.patient_name.as_deref(), Some("Jane Doe"));
        assert_eq!(transition.reply, ReplyKey::AskEmail);
        assert_eq!(transition.session.notes, vec!["name_raw: my name is jane doe"]);

        let transition = step(transition.session, "it's Jane@Example.com");
        assert_eq!(transition.session.patient_email.as_deref(), Some("jane@example.com"));
        assert_eq!(transition.session.stage, Stage::CollectTiming);

        let transition = step(session_at(Stage::CollectEmail), "no email");
        assert_eq!(transition.reply, ReplyKey::ClarifyEmail);
        assert_eq!(transition.session.stage, Stage::CollectEmail);
    }

    #[test]
    fn test_timing_failures_keep_stage() {
        let transition = step(session_at(Stage::CollectTiming), "whenever works");
        assert_eq!(transition.reply, ReplyKey::ClarifyTimingUnrecognized);
        assert_eq!(transition.session.stage, Stage::CollectTiming);

        let transition = step(session_at(Stage::CollectTiming), "2029-06-01 10:00");
        assert_eq!(transition.reply, ReplyKey::ClarifyTimingPast);

        let transition = step(session_at(Stage::CollectTiming), "2030-02-30 10:00");
        assert_eq!(transition.reply, ReplyKey::ClarifyTimingOutOfRange);
    }

    #[test]
    fn test_timing_uses_session_timezone() {
        let mut session = session_at(Stage::CollectTiming);
        session.timezone = "America/Mexico_City".to_string();
        let transition = step(session, "tomorrow at 3pm");
        assert_eq!(
            transition.session.preferred_time,
            Some(Utc.with_ymd_and_hms(2030, 1, 15, 21, 0, 0).unwrap())
        );
        assert_eq!(transition.session.stage, Stage::ConfirmSummary);
        assert_eq!(transition.reply, ReplyKey::ConfirmSummary);
    }

    #[test]
    fn test_confirmation_requests_booking() {
        let transition = step(summary_ready(), "yes please");
        assert!(transition.book_appointment);
        assert_eq!(transition.session.stage, Stage::Scheduled);
        assert_eq!(transition.session.notes, vec!["summary_feedback: yes please"]);
    }

    #[test]
    fn test_unclear_confirmation_stays() {
        let transition = step(summary_ready(), "hmm");
        assert_eq!(transition.reply, ReplyKey::ClarifyConfirmation);
        assert_eq!(transition.session.stage, Stage::ConfirmSummary);
        assert!(!transition.book_appointment);
    }

    #[test]
    fn test_rejection_routes_by_mentioned_field() {
        let transition = step(summary_ready(), "no, change the time");
        assert_eq!(transition.session.stage, Stage::CollectTiming);
        assert_eq!(transition.reply, ReplyKey::EditTiming);
        assert_eq!(transition.session.preferred_time, None);
        assert!(transition.session.revising);
        assert!(!transition.book_appointment);

        let transition = step(summary_ready(), "the email is wrong");
        assert_eq!(transition.session.stage, Stage::CollectEmail);
        assert_eq!(transition.session.patient_email, None);

        let transition = step(summary_ready(), "no");
        assert_eq!(transition.session.stage, Stage::CollectSymptoms);
        assert_eq!(transition.session.symptom_overview, None);
        assert_eq!(transition.session.symptom_history, None);
    }

    #[test]
    fn test_fixed_rejection_target() {
        let transition = advance(
            summary_ready(),
            "the email is wrong",
            reference(),
            &settings(RejectionTarget::Timing),
        );
        assert_eq!(transition.session.stage, Stage::CollectTiming);
        assert!(transition.session.patient_email.is_some());
    }

    #[test]
    fn test_revision_returns_to_summary() {
        let reopened = step(summary_ready(), "change my name").session;
        assert_eq!(reopened.stage, Stage::CollectName);

        let transition = step(reopened, "Janet Doe");
        assert_eq!(transition.session.stage, Stage::ConfirmSummary);
        assert_eq!(transition.reply, ReplyKey::ConfirmSummary);
        assert!(!transition.session.revising);
        assert_eq!(transition.session.patient_name.as_deref(), Some("Janet Doe"));
    }

    #[test]
    fn test_symptom_revision_collects_history_again() {
        let reopened = step(summary_ready(), "no").session;
        let transition = step(reopened, "a sore throat instead");
        assert_eq!(transition.session.stage, Stage::CollectHistory);

        let transition = step(transition.session, "since yesterday");
        assert_eq!(transition.session.stage, Stage::ConfirmSummary);
        assert_eq!(transition.session.symptom_history.as_deref(), Some("since yesterday"));
        assert!(!transition.session.revising);
    }
}
