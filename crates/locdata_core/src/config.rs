//! Translation settings parsed at startup.
//!
//! # Responsibility
//! - Parse the translation method and language-detection confidence policy.
//! - Reject invalid settings before any service is constructed.
//!
//! # Invariants
//! - A numeric threshold is always within `[0, 1]`.
//! - Invalid configuration is an error for the caller to treat as fatal.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Threshold value that delegates reliability to the provider.
pub const API_DEFAULT_THRESHOLD: &str = "api_default";

/// Translation model requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationMethod {
    #[default]
    ServiceDefault,
    Base,
    NeuralMachineTranslation,
}

impl TranslationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServiceDefault => "ServiceDefault",
            Self::Base => "Base",
            Self::NeuralMachineTranslation => "NeuralMachineTranslation",
        }
    }
}

/// How language detections are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ConfidencePolicy {
    /// Accept detections the provider flags as reliable.
    #[default]
    ProviderDefault,
    /// Accept detections whose confidence is strictly above the threshold.
    Threshold(f32),
}

impl ConfidencePolicy {
    /// Returns whether a detection passes this policy.
    pub fn accepts(self, confidence: f32, is_reliable: bool) -> bool {
        match self {
            Self::ProviderDefault => is_reliable,
            Self::Threshold(threshold) => confidence > threshold,
        }
    }
}

/// Settings consumed by the translation adapter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TranslationSettings {
    pub method: TranslationMethod,
    pub confidence: ConfidencePolicy,
}

/// Raw settings document, e.g. `{"TranslationMethod": "Base", "LanguageDetectionThreshold": "0.7"}`.
#[derive(Debug, Clone, Deserialize)]
struct RawSettings {
    #[serde(rename = "TranslationMethod")]
    translation_method: String,
    #[serde(rename = "LanguageDetectionThreshold")]
    language_detection_threshold: String,
}

/// Invalid translation configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidTranslationMethod(String),
    InvalidDetectionThreshold(String),
    Malformed(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTranslationMethod(value) => write!(
                f,
                "invalid translation method `{value}`; expected ServiceDefault|Base|NeuralMachineTranslation"
            ),
            Self::InvalidDetectionThreshold(value) => write!(
                f,
                "invalid language detection threshold `{value}`; expected a number in [0, 1] or `{API_DEFAULT_THRESHOLD}`"
            ),
            Self::Malformed(err) => write!(f, "malformed settings document: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value)
    }
}

impl TranslationSettings {
    /// Parses settings from their string form.
    ///
    /// # Errors
    /// - Unknown translation method.
    /// - Threshold that is neither `api_default` (any case) nor a number in `[0, 1]`.
    pub fn parse(method: &str, threshold: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            method: parse_translation_method(method)?,
            confidence: parse_confidence_policy(threshold)?,
        })
    }

    /// Parses the JSON settings document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_str(json)?;
        Self::parse(&raw.translation_method, &raw.language_detection_threshold)
    }
}

fn parse_translation_method(value: &str) -> Result<TranslationMethod, ConfigError> {
    match value.trim() {
        "ServiceDefault" => Ok(TranslationMethod::ServiceDefault),
        "Base" => Ok(TranslationMethod::Base),
        "NeuralMachineTranslation" => Ok(TranslationMethod::NeuralMachineTranslation),
        other => Err(ConfigError::InvalidTranslationMethod(other.to_string())),
    }
}

fn parse_confidence_policy(value: &str) -> Result<ConfidencePolicy, ConfigError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case(API_DEFAULT_THRESHOLD) {
        return Ok(ConfidencePolicy::ProviderDefault);
    }
    match trimmed.parse::<f32>() {
        Ok(threshold) if (0.0..=1.0).contains(&threshold) => {
            Ok(ConfidencePolicy::Threshold(threshold))
        }
        _ => Err(ConfigError::InvalidDetectionThreshold(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfidencePolicy, ConfigError, TranslationMethod, TranslationSettings};

    #[test]
    fn parses_api_default_case_insensitively() {
        let settings = TranslationSettings::parse("Base", "API_default").expect("valid settings");
        assert_eq!(settings.method, TranslationMethod::Base);
        assert_eq!(settings.confidence, ConfidencePolicy::ProviderDefault);
    }

    #[test]
    fn parses_numeric_threshold_within_bounds() {
        let settings =
            TranslationSettings::parse("ServiceDefault", " 0.75 ").expect("valid settings");
        assert_eq!(settings.confidence, ConfidencePolicy::Threshold(0.75));
        assert!(TranslationSettings::parse("ServiceDefault", "0").is_ok());
        assert!(TranslationSettings::parse("ServiceDefault", "1").is_ok());
    }

    #[test]
    fn rejects_out_of_range_or_garbage_threshold() {
        for value in ["1.01", "-0.1", "high", "", "NaN"] {
            let err = TranslationSettings::parse("Base", value).expect_err("must fail");
            assert!(matches!(err, ConfigError::InvalidDetectionThreshold(_)));
        }
    }

    #[test]
    fn rejects_unknown_method() {
        let err = TranslationSettings::parse("Quantum", "0.5").expect_err("must fail");
        assert!(err.to_string().contains("Quantum"));
    }

    #[test]
    fn reads_json_settings_document() {
        let settings = TranslationSettings::from_json_str(
            r#"{"TranslationMethod": "NeuralMachineTranslation", "LanguageDetectionThreshold": "0.4"}"#,
        )
        .expect("valid json settings");
        assert_eq!(settings.method, TranslationMethod::NeuralMachineTranslation);
        assert_eq!(settings.confidence, ConfidencePolicy::Threshold(0.4));

        let err = TranslationSettings::from_json_str("{}").expect_err("missing keys");
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn threshold_policy_is_strictly_greater() {
        let policy = ConfidencePolicy::Threshold(0.5);
        assert!(!policy.accepts(0.5, true));
        assert!(policy.accepts(0.51, false));
        assert!(ConfidencePolicy::ProviderDefault.accepts(0.0, true));
    }
}
