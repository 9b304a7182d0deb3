//! OpenAI provider implementations for Whisper transcription and chat completion

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::LanguageCode;

use super::completion::TokenUsage;
use super::http::{self, missing_key, resolve_api_key};
use super::{
    CapabilityOutput, CompletionProvider, CompletionRequest, CompletionResponse, Transcriber,
    TranscriptionRequest,
};

pub(crate) const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub(crate) const GEMINI_OPENAI_COMPAT_BASE: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai";

/// OpenAI Whisper transcription provider
pub struct OpenAITranscriptionProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAITranscriptionProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: resolve_api_key(api_key, "OPENAI_API_KEY"),
            model: "whisper-1".to_string(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at an OpenAI-compatible server
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
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

#[async_trait]
impl Transcriber for OpenAITranscriptionProvider {
    fn name(&self) -> &str {
        "OpenAI Whisper"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<CapabilityOutput> {
        let api_key = self.api_key()?;
        let wav_data = request.audio.to_wav()?;

        let file_part = reqwest::multipart::Part::bytes(wav_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::backend_source(self.name(), e))?;

        // verbose_json reports the detected language and duration
        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        if let Some(lang) = &request.language {
            form = form.text("language", lang.primary().to_string());
        }

        if let Some(prompt) = &request.prompt {
            form = form.text("prompt", prompt.clone());
        }

        debug!("Sending transcription request to OpenAI Whisper");

        let response = http::send(
            self.name(),
            self.client
                .post(format!("{}/audio/transcriptions", self.base_url))
                .header("Authorization", format!("Bearer {}", api_key))
                .multipart(form),
        )
        .await?;

        let whisper_response: WhisperResponse = http::json(self.name(), response).await?;
        let text = whisper_response.text.trim();
        if text.is_empty() {
            return Err(Error::Unrecognized);
        }

        // whisper reports language names ("english"), keep only valid codes
        let language = whisper_response
            .language
            .as_deref()
            .and_then(|l| LanguageCode::new(l).ok())
            .or(request.language);

        let duration_ms = whisper_response
            .duration
            .map(|d| (d * 1000.0) as u64)
            .unwrap_or_else(|| request.audio.duration_ms());

        Ok(CapabilityOutput::new(text)
            .with_language(language)
            .with_model(self.model.clone())
            .with_duration_ms(duration_ms))
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Chat completion provider for OpenAI and OpenAI-compatible endpoints
pub struct OpenAICompletionProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    label: &'static str,
}

impl OpenAICompletionProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: resolve_api_key(api_key, "OPENAI_API_KEY"),
            model: "gpt-4o-mini".to_string(),
            base_url: OPENAI_API_BASE.to_string(),
            label: "OpenAI GPT",
        }
    }

    /// Gemini through its OpenAI-compatible endpoint
    pub fn gemini(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: resolve_api_key(api_key, "GEMINI_API_KEY"),
            model: "gemini-2.5-flash".to_string(),
            base_url: GEMINI_OPENAI_COMPAT_BASE.to_string(),
            label: "Gemini",
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
            .ok_or_else(|| missing_key(self.label))
    }

    fn chat_request(&self, request: CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_prompt,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.text,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl ChatResponse {
    fn into_completion(self, provider: &str) -> Result<CompletionResponse> {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::backend(provider, "No completion returned"))?;

        Ok(CompletionResponse {
            text,
            usage: self.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: Some(self.model),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompletionProvider {
    fn name(&self) -> &str {
        self.label
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_key = self.api_key()?;
        let chat_request = self.chat_request(request);

        debug!("Sending completion request to {}", self.label);

        let response = http::send(
            self.label,
            self.client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&chat_request),
        )
        .await?;

        let chat_response: ChatResponse = http::json(self.label, response).await?;
        chat_response.into_completion(self.label)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
