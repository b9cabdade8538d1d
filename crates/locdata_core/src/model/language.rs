//! Supported text-line languages and their external code mappings.
//!
//! # Responsibility
//! - Define the closed set of languages the dataset can carry.
//! - Map languages to persisted short codes and provider language ids.
//!
//! # Invariants
//! - Unknown codes map to `None`; parsing never fails with an error.

use std::fmt::{Display, Formatter};

/// Languages supported by the localization dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    EnglishUs,
    Japanese,
    French,
}

/// Persisted code for US English.
pub const LANGUAGE_CODE_EN_US: &str = "en_us";
/// Persisted code for French.
pub const LANGUAGE_CODE_FR_FR: &str = "fr_fr";
/// Persisted code for Japanese.
pub const LANGUAGE_CODE_JP_JP: &str = "jp_jp";

impl Language {
    /// All supported languages in declaration order.
    pub const ALL: [Language; 3] = [Language::EnglishUs, Language::Japanese, Language::French];

    /// Short code used by the document file format.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::EnglishUs => LANGUAGE_CODE_EN_US,
            Self::Japanese => LANGUAGE_CODE_JP_JP,
            Self::French => LANGUAGE_CODE_FR_FR,
        }
    }

    /// Parses a document-file short code. Unknown codes yield `None`.
    pub fn from_code(value: &str) -> Option<Self> {
        match value {
            LANGUAGE_CODE_EN_US => Some(Self::EnglishUs),
            LANGUAGE_CODE_FR_FR => Some(Self::French),
            LANGUAGE_CODE_JP_JP => Some(Self::Japanese),
            _ => None,
        }
    }

    /// Language id understood by the translation provider.
    pub fn provider_id(self) -> &'static str {
        match self {
            Self::EnglishUs => "en",
            Self::French => "fr",
            Self::Japanese => "ja",
        }
    }

    /// Maps a provider language id (`en`, `fr-CA`, `ja`...) to a language.
    ///
    /// Region suffixes are ignored; unsupported ids yield `None`.
    pub fn from_provider_id(value: &str) -> Option<Self> {
        let primary = value
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Self::EnglishUs),
            "fr" => Some(Self::French),
            "ja" => Some(Self::Japanese),
            _ => None,
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::EnglishUs => "English (US)",
            Self::Japanese => "Japanese",
            Self::French => "French",
        };
        write!(f, "{label}")
    }
}
