use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

pub const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*\.[a-z]{2,}")
        .expect("email pattern compiles")
});

/// First email-shaped token in free text, lower-cased.
pub fn extract_email(text: &str) -> Option<String> {
    let found = EMAIL_TOKEN.find(text)?.as_str();
    let (local, _) = found.split_once('@')?;
    if found.len() > MAX_EMAIL_LENGTH
        || local.starts_with('.')
        || local.ends_with('.')
        || local.contains("..")
    {
        return None;
    }
    Some(found.to_lowercase())
}

/// True when the whole string (after trimming) is a single address.
pub fn is_valid_email(raw: &str) -> bool {
    let trimmed = raw.trim();
    extract_email(trimmed).is_some_and(|email| email.len() == trimmed.len())
}

/// Replaces every email-shaped token with `[email]`.
pub fn redact_emails(text: &str) -> Cow<'_, str> {
    EMAIL_TOKEN.replace_all(text, "[email]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_from_sentence() {
        assert_eq!(
            extract_email("sure, it's Jane.Doe@Example.com thanks"),
            Some("jane.doe@example.com".to_string())
        );
    }

    #[test]
    fn test_rejects_malformed() {
        for raw in ["jane", "jane@", "@example.com", "jane@example", "jane..doe@example.com", "jane @ example.com"] {
            assert!(!is_valid_email(raw), "{} should be invalid", raw);
        }
    }

    #[test]
    fn test_redacts_every_address() {
        assert_eq!(
            redact_emails("mine is Jane@Example.com, or jd@work.mx"),
            "mine is [email], or [email]"
        );
        assert_eq!(redact_emails("no address here"), "no address here");
    }

    #[test]
    fn test_accepts_plain_address() {
        assert!(is_valid_email(" patient+intake@clinic.mx "));
    }
}
