//! Source languages and the marker-based language heuristic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// A document language, identified by its ISO 639-1 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Hebrew (`he`).
    #[serde(rename = "he")]
    Hebrew,
    /// Yiddish (`yi`).
    #[serde(rename = "yi")]
    Yiddish,
    /// English (`en`). English text is never sent to a translator.
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// The ISO 639-1 code for this language.
    pub fn code(self) -> &'static str {
        match self {
            Language::Hebrew => "he",
            Language::Yiddish => "yi",
            Language::English => "en",
        }
    }

    /// Whether text in this language needs translating before it is shown.
    pub fn needs_translation(self) -> bool {
        self != Language::English
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "he" | "iw" => Ok(Language::Hebrew),
            "yi" | "ji" => Ok(Language::Yiddish),
            "en" => Ok(Language::English),
            other => Err(RagError::ConfigError(format!("unknown language code '{other}'"))),
        }
    }
}

/// How the engine decides the source language of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageHint {
    /// The caller states the language.
    Declared(Language),
    /// Use [`detect_language`].
    #[default]
    Detect,
}

impl LanguageHint {
    /// Resolve the hint against the document text.
    pub fn resolve(self, text: &str) -> Language {
        match self {
            LanguageHint::Declared(language) => language,
            LanguageHint::Detect => detect_language(text),
        }
    }
}

impl From<Language> for LanguageHint {
    fn from(language: Language) -> Self {
        LanguageHint::Declared(language)
    }
}

/// Letterforms that occur in Yiddish orthography but not in modern Hebrew.
const YIDDISH_MARKERS: [char; 7] = [
    '\u{05F0}', // װ double vav
    '\u{05F1}', // ױ vav yod
    '\u{05F2}', // ײ double yod
    '\u{FB1F}', // ײַ double yod with patah
    '\u{FB2E}', // אַ alef with patah
    '\u{FB2F}', // אָ alef with qamats
    '\u{FB4E}', // פֿ pe with rafe
];

/// Guess whether a Hebrew-script document is Yiddish or Hebrew.
///
/// This is a coarse heuristic, not language identification: any Yiddish
/// ligature or pointed letter in the text means [`Language::Yiddish`], and
/// everything else (including unpointed Yiddish and non-Hebrew-script text)
/// is reported as [`Language::Hebrew`]. Declare the language explicitly with
/// [`LanguageHint::Declared`] when it is known.
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(|c| YIDDISH_MARKERS.contains(&c)) {
        Language::Yiddish
    } else {
        Language::Hebrew
    }
}
