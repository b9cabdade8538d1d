//! Adapter from a raw cloud translation client to `TranslationService`.
//!
//! # Responsibility
//! - Apply the configured confidence policy to raw detections.
//! - Map provider language ids to `Language`.
//! - Validate translate requests before they reach the provider.
//!
//! # Invariants
//! - Detection output has exactly one slot per input text.
//! - Provider ids outside the supported set become `None`.

use crate::config::{ConfidencePolicy, TranslationMethod, TranslationSettings};
use crate::model::language::Language;
use crate::translation::service::{ServiceError, ServiceResult, TranslationService};
use log::warn;

/// One raw detection as returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub language_code: String,
    pub confidence: f32,
    pub is_reliable: bool,
}

impl RawDetection {
    pub fn new(language_code: impl Into<String>, confidence: f32, is_reliable: bool) -> Self {
        Self {
            language_code: language_code.into(),
            confidence,
            is_reliable,
        }
    }
}

/// Raw cloud translation client contract.
pub trait TranslationProvider: Send + Sync {
    /// Stable provider id for logs.
    fn provider_id(&self) -> &str;

    /// Detects one language per text. `None` marks texts the provider could
    /// not classify at all.
    fn detect(&self, texts: &[String]) -> ServiceResult<Vec<Option<RawDetection>>>;

    /// Translates between provider language ids.
    fn translate(
        &self,
        text: &str,
        source_id: &str,
        target_id: &str,
        method: TranslationMethod,
    ) -> ServiceResult<String>;
}

/// `TranslationService` backed by a raw provider and translation settings.
pub struct CloudTranslationAdapter<P: TranslationProvider> {
    provider: P,
    settings: TranslationSettings,
}

impl<P: TranslationProvider> CloudTranslationAdapter<P> {
    pub fn new(provider: P, settings: TranslationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> TranslationSettings {
        self.settings
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn accept(&self, detection: Option<RawDetection>) -> Option<Language> {
        let detection = detection?;
        let policy: ConfidencePolicy = self.settings.confidence;
        if !policy.accepts(detection.confidence, detection.is_reliable) {
            return None;
        }
        Language::from_provider_id(&detection.language_code)
    }
}

impl<P: TranslationProvider> TranslationService for CloudTranslationAdapter<P> {
    fn detect_languages(&self, texts: &[String]) -> ServiceResult<Vec<Option<Language>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let raw = self.provider.detect(texts).map_err(|err| {
            warn!(
                "event=detect module=translation status=error provider={} error={}",
                self.provider.provider_id(),
                err
            );
            err
        })?;
        if raw.len() != texts.len() {
            return Err(ServiceError::MalformedResponse(format!(
                "expected {} detections, got {}",
                texts.len(),
                raw.len()
            )));
        }

        Ok(raw.into_iter().map(|item| self.accept(item)).collect())
    }

    fn translate(&self, text: &str, source: Language, target: Language) -> ServiceResult<String> {
        if text.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("text is blank".to_string()));
        }
        if source == target {
            return Err(ServiceError::InvalidRequest(format!(
                "source and target are both {source}"
            )));
        }

        self.provider.translate(
            text,
            source.provider_id(),
            target.provider_id(),
            self.settings.method,
        )
    }
}
