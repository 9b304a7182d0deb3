//! Task dispatcher: validates a request, routes it to the registered provider
//! and normalizes what comes back.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::{Instrument, Span, debug, error, field, info_span, warn};
use uuid::Uuid;

use crate::audio::{self, AudioHandle, DecodedAudio};
use crate::error::{Error, Result};
use crate::providers::{CapabilityOutput, SummaryRequest, TranscriptionRequest, TranslationRequest};
use crate::registry::{CapabilityRegistry, Provider, RegisteredCapability};
use crate::types::{
    LanguageCode, ProcessingInput, ProcessingRequest, ProcessingResult, RequestId, ResultMetadata,
    Task, TaskKind, TextBlob, truncate_words, word_count,
};
use crate::vad::SpeechDetector;

/// Request checks applied before any provider is involved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Report silent recordings as unrecognized without calling the recognizer
    pub detect_silence: bool,
    /// RMS level a chunk must reach to count as speech
    pub silence_threshold: f32,
    /// Longest accepted text input, in characters
    pub max_input_chars: usize,
    /// Fewest words worth summarizing
    pub min_input_words: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            detect_silence: true,
            silence_threshold: 0.01,
            max_input_chars: 100_000,
            min_input_words: 1,
        }
    }
}

/// Routes requests to providers in a shared, read-only registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<CapabilityRegistry>,
    config: DispatcherConfig,
    detector: SpeechDetector,
}

impl Dispatcher {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self::with_config(registry, DispatcherConfig::default())
    }

    pub fn with_config(registry: Arc<CapabilityRegistry>, config: DispatcherConfig) -> Self {
        let detector = SpeechDetector::new().with_threshold(config.silence_threshold);
        Self {
            registry,
            config,
            detector,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Run one request through its provider
    pub async fn dispatch(&self, request: &ProcessingRequest) -> Result<ProcessingResult> {
        let request_id = Uuid::new_v4();
        let task = request.task().kind();
        let span = info_span!("dispatch", %request_id, %task, provider = field::Empty);

        let result = self
            .dispatch_inner(request_id, request)
            .instrument(span.clone())
            .await;

        if let Err(err) = &result {
            let _enter = span.enter();
            if err.is_negative_result() {
                warn!(kind = ?err.kind(), "Dispatch produced no result: {}", err);
            } else {
                error!(kind = ?err.kind(), "Dispatch failed: {}", error_chain(err));
            }
        }
        result
    }

    async fn dispatch_inner(
        &self,
        request_id: RequestId,
        request: &ProcessingRequest,
    ) -> Result<ProcessingResult> {
        let started = Instant::now();
        self.validate(request)?;

        let entry = self.resolve(request)?;
        let provider = entry.provider();
        Span::current().record("provider", provider.name());

        debug!("Invoking {} for {}", provider.name(), request.task().kind());

        let output = self
            .invoke(request, provider)
            .await
            .map_err(|err| wrap_provider_error(provider.name(), err))?;

        let (output, normalized) = self.normalize(request, provider, output)?;

        let metadata = ResultMetadata {
            request_id,
            provider: provider.name().to_string(),
            model: output
                .model
                .clone()
                .or_else(|| Some(entry.descriptor().identifier.clone())),
            detected_language: match request.task() {
                Task::Transcribe { .. } => normalized.language.clone(),
                _ => None,
            },
            truncated: normalized.truncated,
            input_truncated: output.input_truncated,
            within_bounds: normalized.within_bounds,
            confidence: output.confidence,
            audio_duration_ms: output.duration_ms,
            usage: output.usage,
            elapsed_ms: started.elapsed().as_millis() as u64,
            completed_at: Utc::now(),
        };

        debug!(
            "Completed in {}ms ({} words)",
            metadata.elapsed_ms,
            word_count(&normalized.text)
        );

        Ok(ProcessingResult {
            task: request.task().kind(),
            output: TextBlob {
                text: normalized.text,
                language: normalized.language,
            },
            metadata,
        })
    }

    fn validate(&self, request: &ProcessingRequest) -> Result<()> {
        let task = request.task();
        request.input().check_modality(task.kind())?;

        match request.input() {
            ProcessingInput::Audio(handle) => {
                if handle.is_empty() {
                    return Err(Error::InvalidInput("audio input is empty".to_string()));
                }
            }
            ProcessingInput::Text(blob) => {
                let chars = blob.text.chars().count();
                if chars > self.config.max_input_chars {
                    return Err(Error::InvalidInput(format!(
                        "text input is {} characters, limit is {}",
                        chars, self.config.max_input_chars
                    )));
                }

                match task {
                    Task::Summarize(bounds) => {
                        bounds.validate()?;
                        let words = blob.word_count();
                        let required = self.config.min_input_words.max(1);
                        if words < required {
                            return Err(Error::InputTooShort { words, required });
                        }
                    }
                    Task::Translate { .. } if blob.is_blank() => {
                        return Err(Error::InvalidInput("nothing to translate".to_string()));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, request: &ProcessingRequest) -> Result<&RegisteredCapability> {
        let task = request.task();
        let source = match (task, request.input()) {
            (Task::Translate { .. }, ProcessingInput::Text(blob)) => blob.language.as_ref(),
            _ => None,
        };
        self.registry
            .resolve_pair(task.kind(), source, task.target_language())
    }

    async fn invoke(
        &self,
        request: &ProcessingRequest,
        provider: &Provider,
    ) -> Result<CapabilityOutput> {
        match (request.task(), request.input(), provider) {
            (
                Task::Transcribe {
                    language_hint,
                    prompt,
                },
                ProcessingInput::Audio(handle),
                Provider::Transcriber(transcriber),
            ) => {
                let audio = decode_blocking(handle).await?;
                if audio.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "{} holds no samples",
                        handle.describe()
                    )));
                }
                if self.config.detect_silence && !self.detector.contains_speech(&audio) {
                    return Err(Error::Unrecognized);
                }
                let mut transcription =
                    TranscriptionRequest::new(audio).with_language(language_hint.clone());
                if let Some(prompt) = prompt {
                    transcription = transcription.with_prompt(prompt.clone());
                }
                transcriber.transcribe(transcription).await
            }
            (Task::Summarize(bounds), ProcessingInput::Text(blob), Provider::Summarizer(summarizer)) => {
                summarizer
                    .summarize(SummaryRequest::new(blob.text.clone(), *bounds))
                    .await
            }
            (Task::Translate { target }, ProcessingInput::Text(blob), Provider::Translator(translator)) => {
                translator
                    .translate(
                        TranslationRequest::new(blob.text.clone(), target.clone())
                            .with_source(blob.language.clone()),
                    )
                    .await
            }
            (task, _, provider) => Err(Error::InvalidInput(format!(
                "{} cannot serve {}",
                provider.name(),
                task.kind()
            ))),
        }
    }

    fn normalize(
        &self,
        request: &ProcessingRequest,
        provider: &Provider,
        output: CapabilityOutput,
    ) -> Result<(CapabilityOutput, Normalized)> {
        let text = output.text.trim();
        if text.is_empty() {
            return Err(match request.task().kind() {
                TaskKind::Transcribe => Error::Unrecognized,
                _ => Error::backend(provider.name(), "provider returned empty output"),
            });
        }

        let input_language = match request.input() {
            ProcessingInput::Text(blob) => blob.language.clone(),
            ProcessingInput::Audio(_) => None,
        };

        let normalized = match request.task() {
            Task::Transcribe { language_hint, .. } => Normalized {
                text: text.to_string(),
                language: output.language.clone().or_else(|| language_hint.clone()),
                truncated: false,
                within_bounds: None,
            },
            Task::Summarize(bounds) => {
                let words = word_count(text);
                let (text, truncated) = if words > bounds.max_words {
                    debug!("Clamping {}-word summary to {}", words, bounds.max_words);
                    (truncate_words(text, bounds.max_words), true)
                } else {
                    (text.to_string(), false)
                };
                let within_bounds = bounds.contains(word_count(&text));
                Normalized {
                    text,
                    language: output.language.clone().or(input_language),
                    truncated,
                    within_bounds: Some(within_bounds),
                }
            }
            Task::Translate { target } => Normalized {
                text: text.to_string(),
                language: Some(target.clone()),
                truncated: false,
                within_bounds: None,
            },
        };

        Ok((output, normalized))
    }
}

/// Output text and the flags derived from it
struct Normalized {
    text: String,
    language: Option<LanguageCode>,
    truncated: bool,
    within_bounds: Option<bool>,
}

/// Decode off the async runtime; a decoder panic is re-raised on the caller
async fn decode_blocking(handle: &AudioHandle) -> Result<DecodedAudio> {
    let handle = handle.clone();
    join_decode(tokio::task::spawn_blocking(move || audio::decode(&handle)).await)
}

fn join_decode(
    joined: std::result::Result<Result<DecodedAudio>, JoinError>,
) -> Result<DecodedAudio> {
    match joined {
        Ok(decoded) => decoded,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(Error::Cancelled),
    }
}

/// Taxonomy errors pass through; anything else is a backend fault
fn wrap_provider_error(provider: &str, error: Error) -> Error {
    match error {
        Error::Config(_) | Error::ConfigParse(_) => Error::backend_source(provider, error),
        other => other,
    }
}

/// Render an error with all of its causes
pub(crate) fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
