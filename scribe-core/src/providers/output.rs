//! Uniform provider output

use serde::{Deserialize, Serialize};

use crate::types::LanguageCode;

use super::TokenUsage;

/// What every provider returns on success
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityOutput {
    /// Produced text
    pub text: String,
    /// Language of `text`, if the backend reported or implied it
    pub language: Option<LanguageCode>,
    /// Confidence score (0.0 - 1.0) if available
    pub confidence: Option<f32>,
    /// Duration of the source audio in milliseconds
    pub duration_ms: Option<u64>,
    /// The backend only saw a prefix of the input
    pub input_truncated: bool,
    /// Model that produced the output
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl CapabilityOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: Option<LanguageCode>) -> Self {
        self.language = language;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}
