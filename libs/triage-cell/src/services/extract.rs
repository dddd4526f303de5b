//! Field extraction for each collection stage. Pure functions: they either
//! produce the cleaned value or `None`, and the stage machine decides what
//! to say.

use shared_utils::text::{fold_accents, words};

pub use shared_utils::validation::extract_email;

pub const MAX_FREE_TEXT_LENGTH: usize = 2000;
pub const MAX_NAME_LENGTH: usize = 255;

/// Lead-ins stripped from the front of a name answer, longest first.
const NAME_LEAD_INS: &[&str] = &[
    "my name is",
    "my name's",
    "mi nombre es",
    "name is",
    "me llamo",
    "this is",
    "call me",
    "it's",
    "its",
    "i'm",
    "im",
    "i am",
    "yo soy",
    "soy",
];

const AFFIRMATIVE_WORDS: &[&str] = &[
    "yes", "yep", "yeah", "yup", "ok", "okay", "sure", "correct", "confirm", "confirmed",
    "right", "affirmative", "book", "si", "claro", "correcto", "confirmo", "vale", "perfecto",
    "exacto", "reserva", "reservar",
];

const AFFIRMATIVE_PHRASES: &[&str] = &["looks good", "sounds good", "de acuerdo", "esta bien", "go ahead"];

const NEGATIVE_WORDS: &[&str] = &[
    "no", "nope", "nah", "not", "wrong", "incorrect", "change", "edit", "fix", "update", "cambiar",
    "cambia", "corregir", "incorrecto", "mal", "actualizar",
];

/// Which detail a patient wants to correct at the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Symptoms,
    Name,
    Email,
    Timing,
}

const EDIT_FIELD_WORDS: &[(&str, EditField)] = &[
    ("time", EditField::Timing),
    ("date", EditField::Timing),
    ("day", EditField::Timing),
    ("hour", EditField::Timing),
    ("when", EditField::Timing),
    ("hora", EditField::Timing),
    ("fecha", EditField::Timing),
    ("dia", EditField::Timing),
    ("horario", EditField::Timing),
    ("name", EditField::Name),
    ("nombre", EditField::Name),
    ("email", EditField::Email),
    ("mail", EditField::Email),
    ("correo", EditField::Email),
    ("symptom", EditField::Symptoms),
    ("symptoms", EditField::Symptoms),
    ("sintoma", EditField::Symptoms),
    ("sintomas", EditField::Symptoms),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationReply {
    Confirm,
    Reject(Option<EditField>),
    Unclear,
}

/// Symptom or history text: at least one letter, at most 2000 characters.
pub fn extract_free_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if !trimmed.chars().any(char::is_alphabetic) || trimmed.chars().count() > MAX_FREE_TEXT_LENGTH {
        return None;
    }
    Some(trimmed.to_string())
}

fn strip_lead_in(text: &str) -> &str {
    let lowered = text.to_lowercase().replace('’', "'");
    for lead_in in NAME_LEAD_INS {
        let Some(rest) = lowered.strip_prefix(lead_in) else {
            continue;
        };
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            // Lead-ins are ASCII apart from the apostrophe, which was
            // normalised to one byte; count chars to stay on a boundary.
            let skip = lead_in.chars().count();
            let offset = text.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(text.len());
            return text[offset..].trim_start();
        }
    }
    text
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Patient name with any lead-in removed, whitespace collapsed and
/// title-cased. Rejects digits, `@` and answers without a letter.
pub fn extract_name(text: &str) -> Option<String> {
    let stripped = strip_lead_in(text.trim());
    let cleaned = stripped.trim_end_matches(['.', '!', ',', ';']);

    if !cleaned.chars().any(char::is_alphabetic)
        || cleaned.chars().any(|c| c.is_ascii_digit() || c == '@')
    {
        return None;
    }

    let name = cleaned.split_whitespace().map(title_case).collect::<Vec<_>>().join(" ");
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return None;
    }
    Some(name)
}

pub fn mentioned_field(text: &str) -> Option<EditField> {
    let words = words(text);
    words.iter().find_map(|word| {
        EDIT_FIELD_WORDS
            .iter()
            .find(|(candidate, _)| candidate == word)
            .map(|(_, field)| *field)
    })
}

/// Reads the patient's answer to the summary. Any negation or a named field
/// without a yes counts as a request to edit.
pub fn classify_confirmation(text: &str) -> ConfirmationReply {
    let folded = fold_accents(text);
    let words = words(text);
    let has_word = |table: &[&str]| words.iter().any(|word| table.contains(&word.as_str()));

    let negative = has_word(NEGATIVE_WORDS);
    let affirmative = has_word(AFFIRMATIVE_WORDS)
        || AFFIRMATIVE_PHRASES.iter().any(|phrase| folded.contains(phrase));
    let field = mentioned_field(text);

    if negative || (field.is_some() && !affirmative) {
        ConfirmationReply::Reject(field)
    } else if affirmative {
        ConfirmationReply::Confirm
    } else {
        ConfirmationReply::Unclear
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_text_bounds() {
        assert_eq!(extract_free_text("  headache  "), Some("headache".to_string()));
        assert_eq!(extract_free_text("12345"), None);
        assert_eq!(extract_free_text("   "), None);
        assert!(extract_free_text(&"a".repeat(2000)).is_some());
        assert_eq!(extract_free_text(&"a".repeat(2001)), None);
    }

    #[test]
    fn test_name_lead_ins_and_casing() {
        assert_eq!(extract_name("my name is jane   doe"), Some("Jane Doe".to_string()));
        assert_eq!(extract_name("I'm MARÍA lópez."), Some("María López".to_string()));
        assert_eq!(extract_name("Me llamo José Pérez"), Some("José Pérez".to_string()));
        assert_eq!(extract_name("soy Ana"), Some("Ana".to_string()));
        assert_eq!(extract_name("Sonia Ruiz"), Some("Sonia Ruiz".to_string()));
        assert_eq!(extract_name("Imelda Marquez"), Some("Imelda Marquez".to_string()));
    }

    #[test]
    fn test_name_rejections() {
        assert_eq!(extract_name("jane@example.com"), None);
        assert_eq!(extract_name("R2D2"), None);
        assert_eq!(extract_name("my name is"), None);
        assert_eq!(extract_name(&"a".repeat(256)), None);
    }

    #[test]
    fn test_email_extraction() {
        assert_eq!(
            extract_email("you can reach me at Jane.Doe@Example.com"),
            Some("jane.doe@example.com".to_string())
        );
        assert_eq!(extract_email("jane at example dot com"), None);
    }

    #[test]
    fn test_confirmation_classification() {
        assert_eq!(classify_confirmation("yes"), ConfirmationReply::Confirm);
        assert_eq!(classify_confirmation("Sí, por favor"), ConfirmationReply::Confirm);
        assert_eq!(classify_confirmation("looks good!"), ConfirmationReply::Confirm);
        assert_eq!(classify_confirmation("yes, the time is right"), ConfirmationReply::Confirm);
        assert_eq!(classify_confirmation("no"), ConfirmationReply::Reject(None));
        assert_eq!(
            classify_confirmation("can we change the time?"),
            ConfirmationReply::Reject(Some(EditField::Timing))
        );
        assert_eq!(
            classify_confirmation("the email is wrong"),
            ConfirmationReply::Reject(Some(EditField::Email))
        );
        assert_eq!(
            classify_confirmation("mi nombre está mal"),
            ConfirmationReply::Reject(Some(EditField::Name))
        );
        assert_eq!(classify_confirmation("I know"), ConfirmationReply::Unclear);
        assert_eq!(classify_confirmation("hmm"), ConfirmationReply::Unclear);
    }
}
