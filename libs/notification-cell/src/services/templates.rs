use shared_models::locale::Locale;

use crate::models::{AppointmentNotice, NotificationMessage};

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn patient_confirmation(notice: &AppointmentNotice, join_link: &str) -> NotificationMessage {
    let name = &notice.patient_name;
    let when = &notice.scheduled_for_display;

    let (subject, greeting, scheduled, join, calendar, not_you, sign_off) = match notice.locale {
        Locale::En => (
            "Your upcoming Medikah telehealth appointment",
            format!("Hello {},", name),
            format!("Your telehealth appointment is scheduled for {}.", when),
            "Join using this secure Doxy.me link:",
            "Add the appointment to your calendar:",
            "If you did not request this appointment, please contact us immediately.",
            "Thank you,\nMedikah Care Team",
        ),
        Locale::Es => (
            "Su próxima cita de telemedicina con Medikah",
            format!("Hola {},", name),
            format!("Su cita de telemedicina está programada para {}.", when),
            "Únase con este enlace seguro de Doxy.me:",
            "Agregue la cita a su calendario:",
            "Si usted no solicitó esta cita, contáctenos de inmediato.",
            "Gracias,\nEquipo de Atención de Medikah",
        ),
    };

    let mut plain = format!("{}\n\n{}\n{} {}\n\n", greeting, scheduled, join, join_link);
    let mut html = format!(
        "<p>{}</p><p>{}</p><p>{} <a href=\"{}\">{}</a></p>",
        escape_html(&greeting),
        escape_html(&scheduled),
        join,
        escape_html(join_link),
        escape_html(join_link),
    );

    if let Some(calendar_link) = &notice.calendar_link {
        plain.push_str(&format!("{} {}\n\n", calendar, calendar_link));
        html.push_str(&format!(
            "<p>{} <a href=\"{}\">{}</a></p>",
            calendar,
            escape_html(calendar_link),
            calendar
        ));
    }

    plain.push_str(&format!("{}\n\n{}", not_you, sign_off));
    html.push_str(&format!(
        "<p>{}</p><p>{}</p>",
        not_you,
        sign_off.replace('\n', "<br/>")
    ));

    NotificationMessage {
        recipient: notice.patient_email.clone(),
        subject: subject.to_string(),
        plain_body: plain,
        html_body: Some(html),
    }
}

/// The doctor alert is always in English; intake notes are appended verbatim.
pub fn doctor_alert(notice: &AppointmentNotice, recipient: &str, notes: &[String]) -> NotificationMessage {
    let mut lines = vec![
        "Telehealth appointment scheduled.".to_string(),
        format!("Appointment ID: {}", notice.appointment_id),
        format!("Assigned doctor: {}", notice.assigned_doctor),
        format!("Patient: {}", notice.patient_name),
        format!("When: {} ({} UTC)", notice.scheduled_for_display, notice.scheduled_time.to_rfc3339()),
        format!("Duration: {} minutes", notice.duration_minutes),
        format!("Language preference: {}", notice.locale.display_name()),
    ];

    if let Some(symptoms) = notice.symptoms.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        lines.push(format!("Primary concern: {}", symptoms));
    }
    if let Some(calendar_link) = &notice.calendar_link {
        lines.push(format!("Calendar: {}", calendar_link));
    }
    if !notes.is_empty() {
        lines.push(String::new());
        lines.push("Intake notes:".to_string());
        lines.extend(notes.iter().map(|note| format!("- {}", note)));
    }

    let plain = lines.join("\n");
    let html = lines
        .iter()
        .map(|line| escape_html(line))
        .collect::<Vec<_>>()
        .join("<br/>");

    NotificationMessage {
        recipient: recipient.to_string(),
        subject: "New Medikah telehealth appointment scheduled".to_string(),
        plain_body: plain,
        html_body: Some(html),
    }
}
