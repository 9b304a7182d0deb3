//! Startup configuration and the provider factory that turns it into a registry

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dispatcher::DispatcherConfig;
use crate::error::{Error, Result};
use crate::providers::{
    CompletionProvider, CompletionSummarizer, CompletionTranslator, GeminiTranscriptionProvider,
    HuggingFaceSummarizer, HuggingFaceTranscriber, HuggingFaceTranslator,
    OpenAICompletionProvider, OpenAITranscriptionProvider, SummaryLimits,
};
use crate::registry::{CapabilityRegistry, Provider};
use crate::types::{CapabilityDescriptor, LanguageCode};

/// Hosted service family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    OpenAI,
    Gemini,
    HuggingFace,
}

/// Which service to call and how to authenticate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub backend: Backend,
    /// Model identifier; the backend's default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Literal API key (prefer `api_key_env`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Endpoint override, e.g. a self-hosted OpenAI-compatible server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ServiceConfig {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            model: None,
            api_key: None,
            api_key_env: None,
            base_url: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Explicit key or named variable; `None` lets the provider read its default variable
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                let var = self.api_key_env.as_deref()?;
                match std::env::var(var) {
                    Ok(key) if !key.trim().is_empty() => Some(key),
                    _ => {
                        warn!("API key variable {} is not set", var);
                        None
                    }
                }
            })
    }

    fn completion_provider(&self) -> Result<Arc<dyn CompletionProvider>> {
        let mut provider = match self.backend {
            Backend::OpenAI => OpenAICompletionProvider::new(self.api_key()),
            Backend::Gemini => OpenAICompletionProvider::gemini(self.api_key()),
            Backend::HuggingFace => {
                return Err(Error::Config(
                    "huggingface has no completion backend".to_string(),
                ));
            }
        };
        if let Some(model) = &self.model {
            provider = provider.with_model(model.clone());
        }
        if let Some(url) = &self.base_url {
            provider = provider.with_base_url(url.clone());
        }
        Ok(Arc::new(provider))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizationConfig {
    #[serde(flatten)]
    pub service: ServiceConfig,
    /// Override the backend's input limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<SummaryLimits>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(flatten)]
    pub service: ServiceConfig,
    /// Source side of the pair; any source when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LanguageCode>,
    pub targets: Vec<LanguageCode>,
}

impl TranslationConfig {
    /// Explicit model, else the opus-mt model for a single language pair
    fn model(&self) -> Result<String> {
        if let Some(model) = &self.service.model {
            return Ok(model.clone());
        }
        match (self.service.backend, &self.source, self.targets.as_slice()) {
            (Backend::HuggingFace, Some(source), [target]) => Ok(format!(
                "Helsinki-NLP/opus-mt-{}-{}",
                source.primary(),
                target.primary()
            )),
            (Backend::HuggingFace, _, _) => Err(Error::Config(
                "huggingface translation needs a model, or a source and one target".to_string(),
            )),
            (Backend::OpenAI, _, _) => Ok("gpt-4o-mini".to_string()),
            (Backend::Gemini, _, _) => Ok("gemini-2.5-flash".to_string()),
        }
    }
}

/// Root configuration
///
/// A capability whose section is absent is not registered. `Default`
/// registers all three with the stock models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScribeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<ServiceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarization: Option<SummarizationConfig>,
    #[serde(default)]
    pub translation: Vec<TranslationConfig>,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            transcription: Some(ServiceConfig::new(Backend::OpenAI).with_model("whisper-1")),
            summarization: Some(SummarizationConfig {
                service: ServiceConfig::new(Backend::HuggingFace)
                    .with_model("facebook/bart-large-cnn"),
                limits: None,
            }),
            translation: vec![TranslationConfig {
                service: ServiceConfig::new(Backend::HuggingFace)
                    .with_model("Helsinki-NLP/opus-mt-en-fr"),
                source: LanguageCode::new("en").ok(),
                targets: LanguageCode::new("fr").into_iter().collect(),
            }],
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl ScribeConfig {
    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).map_err(|e| Error::resource(path.display().to_string(), e))?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let services = self
            .transcription
            .iter()
            .chain(self.summarization.iter().map(|s| &s.service))
            .chain(self.translation.iter().map(|t| &t.service));
        for service in services {
            if service.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "{:?} model name is empty",
                    service.backend
                )));
            }
        }

        if let Some(limits) = self.summarization.as_ref().and_then(|s| s.limits) {
            if limits.min_input_words > limits.max_input_words {
                return Err(Error::Config(format!(
                    "summarization min_input_words ({}) exceeds max_input_words ({})",
                    limits.min_input_words, limits.max_input_words
                )));
            }
        }

        for (index, translation) in self.translation.iter().enumerate() {
            if translation.targets.is_empty() {
                return Err(Error::Config(format!(
                    "translation entry {} lists no targets",
                    index
                )));
            }
            translation.model()?;
        }

        let dispatcher = &self.dispatcher;
        if !(dispatcher.silence_threshold > 0.0 && dispatcher.silence_threshold <= 1.0) {
            return Err(Error::Config(format!(
                "silence_threshold must be in (0, 1], got {}",
                dispatcher.silence_threshold
            )));
        }
        if dispatcher.max_input_chars == 0 {
            return Err(Error::Config("max_input_chars must be positive".to_string()));
        }

        Ok(())
    }

    /// Instantiate every configured provider
    pub fn build_registry(&self) -> Result<CapabilityRegistry> {
        self.validate()?;
        let mut registry = CapabilityRegistry::new();

        if let Some(service) = &self.transcription {
            let (descriptor, provider) = build_transcriber(service);
            registry.register(descriptor, provider)?;
        }

        if let Some(summarization) = &self.summarization {
            let (descriptor, provider) = build_summarizer(summarization)?;
            registry.register(descriptor, provider)?;
        }

        for translation in &self.translation {
            let (descriptor, provider) = build_translator(translation)?;
            registry.register(descriptor, provider)?;
        }

        for descriptor in registry.descriptors() {
            info!("  {}: {}", descriptor.kind, descriptor.identifier);
        }
        Ok(registry)
    }
}

fn build_transcriber(service: &ServiceConfig) -> (CapabilityDescriptor, Provider) {
    let api_key = service.api_key();
    let model = service.model.clone();
    let base_url = service.base_url.clone();

    let (identifier, provider): (String, Provider) = match service.backend {
        Backend::OpenAI => {
            let mut p = OpenAITranscriptionProvider::new(api_key);
            if let Some(model) = model {
                p = p.with_model(model);
            }
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            (p.model().to_string(), Provider::Transcriber(Arc::new(p)))
        }
        Backend::Gemini => {
            let mut p = GeminiTranscriptionProvider::new(api_key);
            if let Some(model) = model {
                p = p.with_model(model);
            }
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            (p.model().to_string(), Provider::Transcriber(Arc::new(p)))
        }
        Backend::HuggingFace => {
            let mut p = HuggingFaceTranscriber::new(api_key);
            if let Some(model) = model {
                p = p.with_model(model);
            }
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            (p.model().to_string(), Provider::Transcriber(Arc::new(p)))
        }
    };

    if !provider.is_configured() {
        warn!("Transcription backend {} has no API key", provider.name());
    }
    (CapabilityDescriptor::transcriber(identifier), provider)
}

fn build_summarizer(config: &SummarizationConfig) -> Result<(CapabilityDescriptor, Provider)> {
    let service = &config.service;

    let (identifier, provider): (String, Provider) = match service.backend {
        Backend::HuggingFace => {
            let mut p = HuggingFaceSummarizer::new(service.api_key());
            if let Some(model) = &service.model {
                p = p.with_model(model.clone());
            }
            if let Some(url) = &service.base_url {
                p = p.with_base_url(url.clone());
            }
            if let Some(limits) = config.limits {
                p = p.with_limits(limits);
            }
            (p.model().to_string(), Provider::Summarizer(Arc::new(p)))
        }
        Backend::OpenAI | Backend::Gemini => {
            let completion = service.completion_provider()?;
            let identifier = completion_model(service);
            let mut p = CompletionSummarizer::new(completion);
            if let Some(limits) = config.limits {
                p = p.with_limits(limits);
            }
            (identifier, Provider::Summarizer(Arc::new(p)))
        }
    };

    if !provider.is_configured() {
        warn!("Summarization backend {} has no API key", provider.name());
    }
    Ok((CapabilityDescriptor::summarizer(identifier), provider))
}

fn build_translator(config: &TranslationConfig) -> Result<(CapabilityDescriptor, Provider)> {
    let service = &config.service;
    let targets = config.targets.iter().cloned();

    let (identifier, provider): (String, Provider) = match service.backend {
        Backend::HuggingFace => {
            let model = config.model()?;
            let mut p = HuggingFaceTranslator::new(service.api_key(), model, targets.clone());
            if let Some(url) = &service.base_url {
                p = p.with_base_url(url.clone());
            }
            (p.model().to_string(), Provider::Translator(Arc::new(p)))
        }
        Backend::OpenAI | Backend::Gemini => {
            let completion = service.completion_provider()?;
            let p = CompletionTranslator::new(completion, targets.clone());
            (config.model()?, Provider::Translator(Arc::new(p)))
        }
    };

    if !provider.is_configured() {
        warn!("Translation backend {} has no API key", provider.name());
    }
    Ok((
        CapabilityDescriptor::translator(identifier, config.source.clone(), targets),
        provider,
    ))
}

fn completion_model(service: &ServiceConfig) -> String {
    match (&service.model, service.backend) {
        (Some(model), _) => model.clone(),
        (None, Backend::Gemini) => "gemini-2.5-flash".to_string(),
        (None, _) => "gpt-4o-mini".to_string(),
    }
}
