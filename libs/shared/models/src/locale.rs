use std::fmt;

use serde::{Deserialize, Serialize};

/// Conversation language. Only English and Spanish scripts exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Es];

    /// Accepts tags like `es`, `es-MX`, `es_419` or `Spanish`; anything
    /// unrecognised yields `None` so callers can apply their own default.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let lowered = hint.trim().to_lowercase();
        let primary = lowered.split(['-', '_']).next().unwrap_or_default();
        match primary {
            "en" | "english" | "inglés" | "ingles" => Some(Locale::En),
            "es" | "spanish" | "español" | "espanol" => Some(Locale::Es),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Es => "Spanish",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
