//! Hugging Face Inference API providers
//!
//! Hosted versions of the pipeline models: `facebook/bart-large-cnn` for
//! summaries, `Helsinki-NLP/opus-mt-*` for translation and Whisper checkpoints
//! for speech recognition.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::LanguageCode;

use super::http::{self, missing_key, resolve_api_key};
use super::{
    CapabilityOutput, SummaryLimits, SummaryRequest, Summarizer, Transcriber,
    TranscriptionRequest, TranslationRequest, Translator, ensure_supported,
};

const HF_INFERENCE_BASE: &str = "https://router.huggingface.co/hf-inference/models";

/// Shared client for one hosted model
struct InferenceClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl InferenceClient {
    fn new(api_key: Option<String>, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: resolve_api_key(api_key, "HF_TOKEN"),
            base_url: HF_INFERENCE_BASE.to_string(),
            model: model.to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/{}", self.base_url, self.model)
    }

    async fn post_json<B, T>(&self, provider: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let api_key = self.api_key.as_deref().ok_or_else(|| missing_key(provider))?;

        debug!("Sending inference request to {} ({})", provider, self.model);

        let response = http::send(
            provider,
            self.client
                .post(self.url())
                .header("Authorization", format!("Bearer {}", api_key))
                .json(body),
        )
        .await?;

        http::json(provider, response).await
    }

    async fn post_audio<T: DeserializeOwned>(&self, provider: &str, wav: Vec<u8>) -> Result<T> {
        let api_key = self.api_key.as_deref().ok_or_else(|| missing_key(provider))?;

        debug!("Sending audio inference request to {} ({})", provider, self.model);

        let response = http::send(
            provider,
            self.client
                .post(self.url())
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "audio/wav")
                .body(wav),
        )
        .await?;

        http::json(provider, response).await
    }
}

#[derive(Debug, Serialize)]
struct TextInputs<'a, P: Serialize> {
    inputs: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<P>,
}

#[derive(Debug, Serialize)]
struct SummaryParameters {
    min_length: usize,
    max_length: usize,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary_text: String,
}

#[derive(Debug, Deserialize)]
struct TranslationOutput {
    translation_text: String,
}

#[derive(Debug, Deserialize)]
struct AsrOutput {
    #[serde(default)]
    text: String,
}

/// Model length hints are in tokens; English averages about 4 tokens per 3 words
fn words_to_tokens(words: usize) -> usize {
    words.saturating_mul(4).div_ceil(3)
}

fn first<T>(provider: &str, outputs: Vec<T>) -> Result<T> {
    outputs
        .into_iter()
        .next()
        .ok_or_else(|| Error::backend(provider, "Empty inference response"))
}

/// Summarizer backed by a hosted seq2seq model
pub struct HuggingFaceSummarizer {
    inner: InferenceClient,
    limits: SummaryLimits,
}

impl HuggingFaceSummarizer {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            inner: InferenceClient::new(api_key, "facebook/bart-large-cnn"),
            limits: SummaryLimits::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.inner.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_limits(mut self, limits: SummaryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn model(&self) -> &str {
        &self.inner.model
    }
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    fn name(&self) -> &str {
        "Hugging Face Summarizer"
    }

    async fn summarize(&self, request: SummaryRequest) -> Result<CapabilityOutput> {
        self.limits.check(&request.text)?;
        let (text, input_truncated) = self.limits.fit(&request.text);

        let body = TextInputs {
            inputs: &text,
            parameters: Some(SummaryParameters {
                min_length: words_to_tokens(request.bounds.min_words),
                max_length: words_to_tokens(request.bounds.max_words),
                do_sample: false,
            }),
        };

        let outputs: Vec<SummaryOutput> = self.inner.post_json(self.name(), &body).await?;
        let summary = first(self.name(), outputs)?;

        Ok(CapabilityOutput {
            input_truncated,
            ..CapabilityOutput::new(summary.summary_text.trim()).with_model(self.inner.model.clone())
        })
    }

    fn is_configured(&self) -> bool {
        self.inner.api_key.is_some()
    }
}

/// Translator backed by a hosted single-pair model such as `Helsinki-NLP/opus-mt-en-fr`
pub struct HuggingFaceTranslator {
    inner: InferenceClient,
    supported: BTreeSet<LanguageCode>,
}

impl HuggingFaceTranslator {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        targets: impl IntoIterator<Item = LanguageCode>,
    ) -> Self {
        Self {
            inner: InferenceClient::new(api_key, &model.into()),
            supported: targets.into_iter().collect(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.inner.model
    }
}

#[async_trait]
impl Translator for HuggingFaceTranslator {
    fn name(&self) -> &str {
        "Hugging Face Translator"
    }

    fn supported_languages(&self) -> &BTreeSet<LanguageCode> {
        &self.supported
    }

    async fn translate(&self, request: TranslationRequest) -> Result<CapabilityOutput> {
        ensure_supported(&self.supported, &request.target)?;

        let body: TextInputs<'_, ()> = TextInputs {
            inputs: &request.text,
            parameters: None,
        };

        let outputs: Vec<TranslationOutput> = self.inner.post_json(self.name(), &body).await?;
        let translation = first(self.name(), outputs)?;

        Ok(CapabilityOutput::new(translation.translation_text.trim())
            .with_language(Some(request.target))
            .with_model(self.inner.model.clone()))
    }

    fn is_configured(&self) -> bool {
        self.inner.api_key.is_some()
    }
}

/// Speech recognizer backed by a hosted Whisper checkpoint
pub struct HuggingFaceTranscriber {
    inner: InferenceClient,
}

impl HuggingFaceTranscriber {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            inner: InferenceClient::new(api_key, "openai/whisper-large-v3"),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.inner.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.inner.model
    }
}

#[async_trait]
impl Transcriber for HuggingFaceTranscriber {
    fn name(&self) -> &str {
        "Hugging Face Whisper"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<CapabilityOutput> {
        let wav = request.audio.to_wav()?;
        let output: AsrOutput = self.inner.post_audio(self.name(), wav).await?;

        let text = output.text.trim();
        if text.is_empty() {
            return Err(Error::Unrecognized);
        }

        Ok(CapabilityOutput::new(text)
            .with_language(request.language.clone())
            .with_model(self.inner.model.clone())
            .with_duration_ms(request.audio.duration_ms()))
    }

    fn is_configured(&self) -> bool {
        self.inner.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::LengthBounds;

    #[test]
    fn test_token_estimate_saturates() {
        assert_eq!(words_to_tokens(150), 200);
        assert_eq!(words_to_tokens(usize::MAX), usize::MAX.div_ceil(3));
    }

    #[test]
    fn test_summary_body_matches_pipeline_parameters() {
        let body = TextInputs {
            inputs: "some text",
            parameters: Some(SummaryParameters {
                min_length: words_to_tokens(30),
                max_length: words_to_tokens(150),
                do_sample: false,
            }),
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["inputs"], "some text");
        assert_eq!(json["parameters"]["min_length"], 40);
        assert_eq!(json["parameters"]["max_length"], 200);
        assert_eq!(json["parameters"]["do_sample"], false);
    }

    #[test]
    fn test_translation_body_has_no_parameters() {
        let body: TextInputs<'_, ()> = TextInputs {
            inputs: "Hello, how are you?",
            parameters: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("parameters").is_none());
    }

    #[test]
    fn test_output_parsing() {
        let summaries: Vec<SummaryOutput> =
            serde_json::from_str(r#"[{"summary_text": "A fox jumps."}]"#).unwrap();
        assert_eq!(first("hf", summaries).unwrap().summary_text, "A fox jumps.");

        let translations: Vec<TranslationOutput> =
            serde_json::from_str(r#"[{"translation_text": "Bonjour, comment ça va?"}]"#)
                .unwrap();
        assert_eq!(
            first("hf", translations).unwrap().translation_text,
            "Bonjour, comment ça va?"
        );

        let empty: Vec<SummaryOutput> = Vec::new();
        assert_eq!(
            first("hf", empty).unwrap_err().kind(),
            ErrorKind::BackendUnavailable
        );
    }

    #[tokio::test]
    async fn test_translator_rejects_unsupported_target_before_network() {
        let translator = HuggingFaceTranslator::new(
            Some("hf_test".to_string()),
            "Helsinki-NLP/opus-mt-en-fr",
            ["fr".parse().unwrap()],
        )
        .with_base_url("http://127.0.0.1:9");

        let err = translator
            .translate(TranslationRequest::new("Hello", "de".parse().unwrap()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedLanguage);
    }

    #[tokio::test]
    async fn test_summarizer_rejects_short_input_before_network() {
        let summarizer =
            HuggingFaceSummarizer::new(Some("hf_test".to_string())).with_base_url("http://127.0.0.1:9");

        let err = summarizer
            .summarize(SummaryRequest::new("too short", LengthBounds::default()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputTooShort);
    }

    #[test]
    fn test_url_joins_model() {
        let summarizer = HuggingFaceSummarizer::new(Some("hf_test".to_string()))
            .with_base_url("http://localhost:8080/models/");
        assert_eq!(
            summarizer.inner.url(),
            "http://localhost:8080/models/facebook/bart-large-cnn"
        );
    }
}
