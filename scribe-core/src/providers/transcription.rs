//! Transcription capability

use async_trait::async_trait;

use crate::audio::DecodedAudio;
use crate::error::Result;
use crate::types::LanguageCode;

use super::CapabilityOutput;

/// Request for transcription
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Decoded mono waveform
    pub audio: DecodedAudio,
    /// Optional language hint
    pub language: Option<LanguageCode>,
    /// Optional prompt to guide transcription
    pub prompt: Option<String>,
}

impl TranscriptionRequest {
    pub fn new(audio: DecodedAudio) -> Self {
        Self {
            audio,
            language: None,
            prompt: None,
        }
    }

    pub fn with_language(mut self, language: Option<LanguageCode>) -> Self {
        self.language = language;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Speech-to-text backend
///
/// Implementations return `Error::Unrecognized` when the recognizer produced
/// no usable transcript, which callers treat as a negative result rather than
/// a fault.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Transcribe audio to text
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<CapabilityOutput>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool {
        true
    }
}
