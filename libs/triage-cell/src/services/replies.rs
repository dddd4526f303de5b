//! Canned replies for every turn of the intake script, in English and
//! Spanish. Placeholders: `{name}`, `{doctor}`, `{summary}`, `{when}`.

use chrono_tz::Tz;

use appointment_cell::services::scheduling::format_local_for;
use shared_models::locale::Locale;

use crate::models::Session;

pub const REPLY_TABLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKey {
    ReadyWhenYouAre,
    EmergencySafety,
    AskSymptoms,
    AskHistory,
    AskName,
    AskEmail,
    AskTiming,
    ClarifySymptoms,
    ClarifyHistory,
    ClarifyName,
    ClarifyEmail,
    ClarifyTimingUnrecognized,
    ClarifyTimingPast,
    ClarifyTimingOutOfRange,
    ConfirmSummary,
    ClarifyConfirmation,
    EditSymptoms,
    EditName,
    EditEmail,
    EditTiming,
    BookingConfirmed,
    BookingConfirmedEmailFailed,
    BookingRetry,
    ScheduledFollowUp,
    EmergencyFollowUp,
}

impl ReplyKey {
    pub const ALL: [ReplyKey; 25] = [
        ReplyKey::ReadyWhenYouAre,
        ReplyKey::EmergencySafety,
        ReplyKey::AskSymptoms,
        ReplyKey::AskHistory,
        ReplyKey::AskName,
        ReplyKey::AskEmail,
        ReplyKey::AskTiming,
        ReplyKey::ClarifySymptoms,
        ReplyKey::ClarifyHistory,
        ReplyKey::ClarifyName,
        ReplyKey::ClarifyEmail,
        ReplyKey::ClarifyTimingUnrecognized,
        ReplyKey::ClarifyTimingPast,
        ReplyKey::ClarifyTimingOutOfRange,
        ReplyKey::ConfirmSummary,
        ReplyKey::ClarifyConfirmation,
        ReplyKey::EditSymptoms,
        ReplyKey::EditName,
        ReplyKey::EditEmail,
        ReplyKey::EditTiming,
        ReplyKey::BookingConfirmed,
        ReplyKey::BookingConfirmedEmailFailed,
        ReplyKey::BookingRetry,
        ReplyKey::ScheduledFollowUp,
        ReplyKey::EmergencyFollowUp,
    ];

    /// Collection prompts may be rephrased by the reply generator; safety,
    /// summary and booking replies are always sent as written.
    pub fn allows_generated_text(&self) -> bool {
        matches!(
            self,
            ReplyKey::ReadyWhenYouAre
                | ReplyKey::AskSymptoms
                | ReplyKey::AskHistory
                | ReplyKey::AskName
                | ReplyKey::AskEmail
                | ReplyKey::AskTiming
                | ReplyKey::ClarifySymptoms
                | ReplyKey::ClarifyHistory
                | ReplyKey::ClarifyName
                | ReplyKey::ClarifyEmail
                | ReplyKey::ClarifyTimingUnrecognized
                | ReplyKey::ClarifyTimingPast
                | ReplyKey::ClarifyTimingOutOfRange
        )
    }
}

/// (key, English, Spanish)
pub static REPLIES: &[(ReplyKey, &str, &str)] = &[
    (
        ReplyKey::ReadyWhenYouAre,
        "I'm ready when you are. Could you share a bit more so I can prepare the doctor?",
        "Aquí estoy cuando guste. ¿Podría contarme un poco más para preparar al doctor?",
    ),
    (
        ReplyKey::EmergencySafety,
        "Your symptoms sound urgent. Please call your local emergency number or go to the nearest emergency room immediately. I'll pause scheduling and remain here if you need non-urgent information.",
        "Sus síntomas suenan urgentes. Por favor llame al número de emergencias local o acuda de inmediato a la sala de emergencias más cercana. Pausaré la programación y seguiré aquí si necesita información que no sea urgente.",
    ),
    (
        ReplyKey::AskSymptoms,
        "Welcome to Medikah! I'm here to help you connect with a doctor. Could you tell me what you're feeling and what you'd like the doctor to help with today?",
        "¡Bienvenido a Medikah! Estoy aquí para ayudarle a conectar con un doctor. ¿Podría contarme qué siente y en qué le gustaría que el doctor le ayude hoy?",
    ),
    (
        ReplyKey::AskHistory,
        "Thanks for sharing that. When did these symptoms begin, and have they been getting better, worse, or about the same?",
        "Gracias por compartirlo. ¿Cuándo comenzaron estos síntomas y han mejorado, empeorado o siguen igual?",
    ),
    (
        ReplyKey::AskName,
        "Understood. So the doctor knows who they'll be seeing, what's your full name?",
        "Entendido. Para que el doctor sepa a quién atenderá, ¿cuál es su nombre completo?",
    ),
    (
        ReplyKey::AskEmail,
        "Thank you, {name}. What's the best email to send appointment details to?",
        "Gracias, {name}. ¿A qué correo electrónico le enviamos los detalles de la cita?",
    ),
    (
        ReplyKey::AskTiming,
        "Got it. When would you like to connect with {doctor} via telemedicine? You can share a date and time, like 'tomorrow at 3pm'.",
        "Perfecto. ¿Cuándo le gustaría conectarse con {doctor} por telemedicina? Puede indicar una fecha y hora, por ejemplo 'mañana a las 3 de la tarde'.",
    ),
    (
        ReplyKey::ClarifySymptoms,
        "Could you describe your symptoms in a few words? A short description is enough for the doctor to prepare.",
        "¿Podría describir sus síntomas en pocas palabras? Una descripción breve es suficiente para que el doctor se prepare.",
    ),
    (
        ReplyKey::ClarifyHistory,
        "Could you tell me, in a few words, when this started and how it has changed?",
        "¿Podría decirme, en pocas palabras, cuándo empezó y cómo ha cambiado?",
    ),
    (
        ReplyKey::ClarifyName,
        "I want to make sure I have your name right. Could you type just your first and last name?",
        "Quiero asegurarme de tener bien su nombre. ¿Podría escribir solo su nombre y apellido?",
    ),
    (
        ReplyKey::ClarifyEmail,
        "I want to be sure the doctor can reach you. Could you enter a valid email address?",
        "Quiero asegurarme de que el doctor pueda contactarle. ¿Podría escribir un correo electrónico válido?",
    ),
    (
        ReplyKey::ClarifyTimingUnrecognized,
        "Thanks. Could you share the date and time in a format like 'February 5 at 3pm' or '2026-02-05 15:00' so I can lock it in?",
        "Gracias. ¿Podría indicar la fecha y hora con un formato como '5 de febrero a las 3 de la tarde' o '2026-02-05 15:00' para reservarla?",
    ),
    (
        ReplyKey::ClarifyTimingPast,
        "That time has already passed. What future date and time would work for you?",
        "Esa hora ya pasó. ¿Qué fecha y hora futura le funcionaría?",
    ),
    (
        ReplyKey::ClarifyTimingOutOfRange,
        "I couldn't find that date or time on the calendar. Could you double-check it, for example 'February 5 at 3pm'?",
        "No encontré esa fecha u hora en el calendario. ¿Podría revisarla, por ejemplo '5 de febrero a las 3 de la tarde'?",
    ),
    (
        ReplyKey::ConfirmSummary,
        "{summary}\n\nDoes that look right? Reply 'yes' and I'll book your secure Doxy.me visit with {doctor}, or tell me what to change.",
        "{summary}\n\n¿Es correcto? Responda 'sí' y reservaré su visita segura por Doxy.me con {doctor}, o dígame qué desea cambiar.",
    ),
    (
        ReplyKey::ClarifyConfirmation,
        "Thanks for clarifying. Tell me what you'd like to update (name, email, symptoms, or timing), or reply 'yes' to book.",
        "Gracias por aclarar. Dígame qué desea actualizar (nombre, correo, síntomas u horario), o responda 'sí' para reservar.",
    ),
    (
        ReplyKey::EditSymptoms,
        "No problem. Let's go over your symptoms again. What are you feeling?",
        "No hay problema. Repasemos sus síntomas. ¿Qué siente?",
    ),
    (
        ReplyKey::EditName,
        "No problem. What name should I use instead?",
        "No hay problema. ¿Qué nombre debo usar?",
    ),
    (
        ReplyKey::EditEmail,
        "Understood. What's the correct email address?",
        "Entendido. ¿Cuál es el correo electrónico correcto?",
    ),
    (
        ReplyKey::EditTiming,
        "Sure thing. What date and time works best for you?",
        "Claro. ¿Qué fecha y hora le funciona mejor?",
    ),
    (
        ReplyKey::BookingConfirmed,
        "You're all set! Your telemedicine visit with {doctor} is booked for {when}. A confirmation email with your secure Doxy.me link is on its way.",
        "¡Listo! Su visita de telemedicina con {doctor} está reservada para el {when}. Le enviamos un correo de confirmación con su enlace seguro de Doxy.me.",
    ),
    (
        ReplyKey::BookingConfirmedEmailFailed,
        "You're all set! Your telemedicine visit with {doctor} is booked for {when}. We couldn't send the confirmation email, so please keep the visit link below.",
        "¡Listo! Su visita de telemedicina con {doctor} está reservada para el {when}. No pudimos enviar el correo de confirmación, así que guarde el enlace de la visita que aparece abajo.",
    ),
    (
        ReplyKey::BookingRetry,
        "I couldn't finish booking just now. Please reply 'yes' again in a moment to confirm.",
        "No pude completar la reserva en este momento. Por favor responda 'sí' de nuevo en un momento para confirmar.",
    ),
    (
        ReplyKey::ScheduledFollowUp,
        "You're set! Feel free to ask any other questions while you wait for the visit.",
        "¡Todo listo! Puede hacer cualquier otra pregunta mientras espera su visita.",
    ),
    (
        ReplyKey::EmergencyFollowUp,
        "I'm here if you have more questions. If your symptoms are severe, please call your local emergency number now.",
        "Sigo aquí si tiene más preguntas. Si sus síntomas son graves, llame ahora al número de emergencias local.",
    ),
];

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct ReplyVars {
    pub name: Option<String>,
    pub doctor: String,
    pub summary: Option<String>,
    pub when: Option<String>,
}

pub fn template(key: ReplyKey, locale: Locale) -> &'static str {
    REPLIES
        .iter()
        .find(|(candidate, _, _)| *candidate == key)
        .map(|(_, en, es)| match locale {
            Locale::En => *en,
            Locale::Es => *es,
        })
        .unwrap_or_default()
}

pub fn render(key: ReplyKey, locale: Locale, vars: &ReplyVars) -> String {
    template(key, locale)
        .replace("{name}", vars.name.as_deref().unwrap_or_default())
        .replace("{doctor}", &vars.doctor)
        .replace("{summary}", vars.summary.as_deref().unwrap_or_default())
        .replace("{when}", vars.when.as_deref().unwrap_or_default())
}

/// Recap shown before booking.
pub fn summary(session: &Session, tz: Tz) -> String {
    let missing = "—";
    let when = session
        .preferred_time
        .map(|instant| format_local_for(instant, tz, session.locale))
        .unwrap_or_else(|| missing.to_string());
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| missing.to_string());

    let labels = match session.locale {
        Locale::En => [
            "Here is what I've gathered so far:",
            "Name",
            "Contact email",
            "Primary concern",
            "Symptom details",
            "Preferred appointment time",
        ],
        Locale::Es => [
            "Esto es lo que tengo hasta ahora:",
            "Nombre",
            "Correo de contacto",
            "Motivo principal",
            "Detalles de los síntomas",
            "Horario preferido",
        ],
    };

    [
        labels[0].to_string(),
        format!("• {}: {}", labels[1], field(&session.patient_name)),
        format!("• {}: {}", labels[2], field(&session.patient_email)),
        format!("• {}: {}", labels[3], field(&session.symptom_overview)),
        format!("• {}: {}", labels[4], field(&session.symptom_history)),
        format!("• {}: {}", labels[5], when),
    ]
    .join("\n")
}
