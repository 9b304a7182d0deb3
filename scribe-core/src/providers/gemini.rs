//! Gemini transcription provider (native API with inline audio)
//!
//! Completion goes through Gemini's OpenAI-compatible endpoint instead, see
//! `OpenAICompletionProvider::gemini`.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::http::{self, missing_key, resolve_api_key};
use super::{CapabilityOutput, Transcriber, TranscriptionRequest};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Marker the model is told to emit when nothing intelligible was said
const NO_SPEECH_MARKER: &str = "[NO_SPEECH]";

/// Gemini transcription provider
pub struct GeminiTranscriptionProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiTranscriptionProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: resolve_api_key(api_key, "GEMINI_API_KEY"),
            model: "gemini-2.5-flash".to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| missing_key(self.name()))
    }

    fn build_request(&self, request: &TranscriptionRequest) -> Result<GenerateContentRequest> {
        let wav_data = request.audio.to_wav()?;

        let mut prompt = String::from(
            "Transcribe this audio accurately. Output only the transcribed text, \
             nothing else. If the audio contains no intelligible speech, output ",
        );
        prompt.push_str(NO_SPEECH_MARKER);
        prompt.push('.');
        if let Some(lang) = &request.language {
            prompt.push_str(" The speech is in language code ");
            prompt.push_str(lang.as_str());
            prompt.push('.');
        }
        if let Some(context) = &request.prompt {
            prompt.push_str(" Context for names and terms: ");
            prompt.push_str(context);
        }

        Ok(GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "audio/wav".to_string(),
                            data: STANDARD.encode(&wav_data),
                        },
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
            }),
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn transcript(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
    }
}

#[async_trait]
impl Transcriber for GeminiTranscriptionProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<CapabilityOutput> {
        let api_key = self.api_key()?;
        let generate_request = self.build_request(&request)?;

        debug!("Sending transcription request to Gemini");

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = http::send(
            self.name(),
            self.client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .header("Content-Type", "application/json")
                .json(&generate_request),
        )
        .await?;

        let gemini_response: GenerateContentResponse = http::json(self.name(), response).await?;
        let text = gemini_response
            .transcript()
            .ok_or_else(|| Error::backend(self.name(), "No transcription returned"))?;

        let text = text.trim();
        if text.is_empty() || text.contains(NO_SPEECH_MARKER) {
            return Err(Error::Unrecognized);
        }

        Ok(CapabilityOutput::new(text)
            .with_language(request.language.clone())
            .with_model(self.model.clone())
            .with_duration_ms(request.audio.duration_ms()))
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
