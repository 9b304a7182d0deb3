//! Summarizer and translator adapters over any completion model

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{LanguageCode, LengthBounds};

use super::{
    CapabilityOutput, CompletionProvider, CompletionRequest, CompletionResponse, SummaryLimits,
    SummaryRequest, Summarizer, TranslationRequest, Translator, ensure_supported,
};

/// English display name for common language codes, falling back to the code
pub fn language_name(code: &LanguageCode) -> &str {
    match code.primary() {
        "ar" => "Arabic",
        "de" => "German",
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "hi" => "Hindi",
        "it" => "Italian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "nl" => "Dutch",
        "pl" => "Polish",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "sw" => "Swahili",
        "tr" => "Turkish",
        "uk" => "Ukrainian",
        "zh" => "Chinese",
        _ => code.as_str(),
    }
}

fn into_output(response: CompletionResponse) -> CapabilityOutput {
    CapabilityOutput {
        model: response.model,
        usage: response.usage,
        ..CapabilityOutput::new(response.text.trim())
    }
}

/// Summarizer that prompts a completion model
pub struct CompletionSummarizer {
    provider: Arc<dyn CompletionProvider>,
    limits: SummaryLimits,
}

impl CompletionSummarizer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            limits: SummaryLimits {
                min_input_words: SummaryLimits::default().min_input_words,
                // chat models take far longer inputs than bart
                max_input_words: 20_000,
            },
        }
    }

    pub fn with_limits(mut self, limits: SummaryLimits) -> Self {
        self.limits = limits;
        self
    }

    fn build_system_prompt(bounds: &LengthBounds) -> String {
        format!(
            "You are a summarization assistant. Condense the user's text into a summary \
             of between {} and {} words. Keep the key facts and drop repetition; do not \
             copy the text verbatim. Write in the same language as the text. Output ONLY \
             the summary, nothing else.",
            bounds.min_words, bounds.max_words
        )
    }
}

#[async_trait]
impl Summarizer for CompletionSummarizer {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn summarize(&self, request: SummaryRequest) -> Result<CapabilityOutput> {
        self.limits.check(&request.text)?;
        let (text, input_truncated) = self.limits.fit(&request.text);

        // ~4 tokens per 3 words, with headroom
        let max_tokens = u32::try_from(request.bounds.max_words.saturating_mul(2))
            .unwrap_or(u32::MAX)
            .max(64);
        let completion = CompletionRequest::new(
            Self::build_system_prompt(&request.bounds),
            text.into_owned(),
        )
        .with_max_tokens(max_tokens);

        debug!("Summarizing via {}", self.name());

        let response = self.provider.complete(completion).await?;
        Ok(CapabilityOutput {
            input_truncated,
            ..into_output(response)
        })
    }

    fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }
}

/// Translator that prompts a completion model, restricted to configured targets
pub struct CompletionTranslator {
    provider: Arc<dyn CompletionProvider>,
    supported: BTreeSet<LanguageCode>,
}

impl CompletionTranslator {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        targets: impl IntoIterator<Item = LanguageCode>,
    ) -> Self {
        Self {
            provider,
            supported: targets.into_iter().collect(),
        }
    }

    fn build_system_prompt(source: Option<&LanguageCode>, target: &LanguageCode) -> String {
        let mut prompt = String::from("You are a translation assistant. Translate the user's text ");
        if let Some(source) = source {
            prompt.push_str("from ");
            prompt.push_str(language_name(source));
            prompt.push(' ');
        }
        prompt.push_str("into ");
        prompt.push_str(language_name(target));
        prompt.push_str(
            ". Preserve meaning, tone and formatting. Output ONLY the translation, nothing else.",
        );
        prompt
    }
}

#[async_trait]
impl Translator for CompletionTranslator {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn supported_languages(&self) -> &BTreeSet<LanguageCode> {
        &self.supported
    }

    async fn translate(&self, request: TranslationRequest) -> Result<CapabilityOutput> {
        ensure_supported(&self.supported, &request.target)?;
        if request.text.trim().is_empty() {
            return Err(Error::InvalidInput("nothing to translate".to_string()));
        }

        let completion = CompletionRequest::new(
            Self::build_system_prompt(request.source.as_ref(), &request.target),
            request.text,
        )
        .with_temperature(0.0);

        let response = self.provider.complete(completion).await?;
        Ok(into_output(response).with_language(Some(request.target)))
    }

    fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }
}
