//! Keyword-based safety escalation. Recall over precision: a plain
//! case-insensitive substring match against both tables, whatever language
//! the conversation is in.

use tracing::debug;

use shared_models::locale::Locale;
use shared_utils::text::fold_accents;

pub const EMERGENCY_KEYWORDS_VERSION: u32 = 1;

pub const ENGLISH_EMERGENCY_KEYWORDS: &[&str] = &[
    "chest pain",
    "shortness of breath",
    "difficulty breathing",
    "trouble breathing",
    "bleeding",
    "unconscious",
    "can't breathe",
    "cannot breathe",
    "suicidal",
    "overdose",
    "stroke",
    "heart attack",
    "severe pain",
    "numbness",
];

pub const SPANISH_EMERGENCY_KEYWORDS: &[&str] = &[
    "dolor de pecho",
    "dolor en el pecho",
    "falta de aire",
    "dificultad para respirar",
    "no puedo respirar",
    "sangrado",
    "sangrando",
    "inconsciente",
    "suicida",
    "sobredosis",
    "derrame cerebral",
    "ataque al corazón",
    "infarto",
    "dolor severo",
    "dolor intenso",
    "entumecimiento",
];

/// First keyword found in `text`, from either table.
pub fn matched_keyword(text: &str) -> Option<&'static str> {
    let folded = fold_accents(text);
    ENGLISH_EMERGENCY_KEYWORDS
        .iter()
        .chain(SPANISH_EMERGENCY_KEYWORDS)
        .find(|keyword| folded.contains(&fold_accents(keyword)))
        .copied()
}

/// `locale_hint` is informational only; both tables are always checked.
pub fn detect(text: &str, locale_hint: Option<Locale>) -> bool {
    match matched_keyword(text) {
        Some(keyword) => {
            debug!("Emergency keyword '{}' matched (locale hint {:?})", keyword, locale_hint);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_triggers_in_any_case() {
        for keyword in ENGLISH_EMERGENCY_KEYWORDS.iter().chain(SPANISH_EMERGENCY_KEYWORDS) {
            let shouted = format!("Please help, {} since this morning!", keyword.to_uppercase());
            assert!(detect(&shouted, None), "'{}' should trigger", keyword);
            assert!(detect(keyword, Some(Locale::En)), "'{}' should trigger", keyword);
        }
    }

    #[test]
    fn test_locale_hint_does_not_limit_tables() {
        assert!(detect("tengo dolor de pecho", Some(Locale::En)));
        assert!(detect("I have chest pain", Some(Locale::Es)));
    }

    #[test]
    fn test_accent_and_apostrophe_variants() {
        assert!(detect("creo que es un ataque al corazon", None));
        assert!(detect("I can’t breathe", None));
    }

    #[test]
    fn test_ordinary_complaints_do_not_trigger() {
        for text in ["I have a headache", "me duele la garganta", "sore throat and a mild fever"] {
            assert!(!detect(text, None), "'{}' should not trigger", text);
        }
    }

    #[test]
    fn test_tables_are_lowercase_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for keyword in ENGLISH_EMERGENCY_KEYWORDS.iter().chain(SPANISH_EMERGENCY_KEYWORDS) {
            assert_eq!(*keyword, keyword.to_lowercase());
            assert!(seen.insert(*keyword), "duplicate keyword '{}'", keyword);
        }
    }
}
