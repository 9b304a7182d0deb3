//! Translation capability

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::LanguageCode;

use super::CapabilityOutput;

/// Request to render `text` in `target`
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub text: String,
    /// Declared language of `text`, if known
    pub source: Option<LanguageCode>,
    pub target: LanguageCode,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target: LanguageCode) -> Self {
        Self {
            text: text.into(),
            source: None,
            target,
        }
    }

    pub fn with_source(mut self, source: Option<LanguageCode>) -> Self {
        self.source = source;
        self
    }
}

/// Text translation backend limited to a fixed set of target languages
#[async_trait]
pub trait Translator: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Target languages this backend can produce
    fn supported_languages(&self) -> &BTreeSet<LanguageCode>;

    async fn translate(&self, request: TranslationRequest) -> Result<CapabilityOutput>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool {
        true
    }
}

/// Fail with `UnsupportedLanguage` unless `target` is in `supported`
pub fn ensure_supported(supported: &BTreeSet<LanguageCode>, target: &LanguageCode) -> Result<()> {
    if supported.contains(target) {
        return Ok(());
    }
    Err(Error::UnsupportedLanguage {
        language: target.to_string(),
        supported: supported.iter().map(ToString::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_supported() {
        let supported: BTreeSet<LanguageCode> =
            ["fr", "es"].iter().map(|c| c.parse().unwrap()).collect();

        assert!(ensure_supported(&supported, &"fr".parse().unwrap()).is_ok());

        let err = ensure_supported(&supported, &"de".parse().unwrap()).unwrap_err();
        match err {
            Error::UnsupportedLanguage { language, supported } => {
                assert_eq!(language, "de");
                assert_eq!(supported, vec!["es".to_string(), "fr".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
