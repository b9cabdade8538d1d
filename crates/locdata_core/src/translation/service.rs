//! Translation service contract consumed by the integrity engine.

use crate::model::language::Language;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Translation service failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Service could not be reached or refused the call.
    Unavailable(String),
    /// Service answered with a payload that does not match the request.
    MalformedResponse(String),
    /// Request rejected before reaching the service.
    InvalidRequest(String),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "translation service unavailable: {message}"),
            Self::MalformedResponse(message) => {
                write!(f, "malformed translation service response: {message}")
            }
            Self::InvalidRequest(message) => write!(f, "invalid translation request: {message}"),
        }
    }
}

impl Error for ServiceError {}

/// Result alias for translation service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Language detection and translation.
///
/// Implementations may block on network I/O. A call either succeeds for the
/// whole batch or fails as a whole.
pub trait TranslationService: Send + Sync {
    /// Detects the language of each text. The result has one slot per input,
    /// `None` when detection was inconclusive or unsupported.
    fn detect_languages(&self, texts: &[String]) -> ServiceResult<Vec<Option<Language>>>;

    /// Translates `text` from `source` to `target`.
    fn translate(&self, text: &str, source: Language, target: Language) -> ServiceResult<String>;
}

/// Service used when no translation backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTranslationService;

impl TranslationService for OfflineTranslationService {
    fn detect_languages(&self, _texts: &[String]) -> ServiceResult<Vec<Option<Language>>> {
        Err(ServiceError::Unavailable("offline".to_string()))
    }

    fn translate(
        &self,
        _text: &str,
        _source: Language,
        _target: Language,
    ) -> ServiceResult<String> {
        Err(ServiceError::Unavailable("offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{OfflineTranslationService, ServiceError, TranslationService};
    use crate::model::language::Language;

    #[test]
    fn offline_service_always_fails() {
        let service = OfflineTranslationService;
        assert!(matches!(
            service.detect_languages(&["hello".to_string()]),
            Err(ServiceError::Unavailable(_))
        ));
        assert!(matches!(
            service.translate("hello", Language::EnglishUs, Language::French),
            Err(ServiceError::Unavailable(_))
        ));
    }
}
