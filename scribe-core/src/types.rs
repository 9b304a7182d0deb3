//! Core types used throughout Scribe

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::AudioHandle;
use crate::error::{Error, Result};
use crate::providers::TokenUsage;

/// Unique identifier for a single dispatch
pub type RequestId = Uuid;

/// Audio data as raw bytes (16-bit little-endian PCM)
pub type AudioData = Vec<u8>;

/// Capability kinds the dispatcher can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Transcribe,
    Summarize,
    Translate,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Transcribe => "transcribe",
            TaskKind::Summarize => "summarize",
            TaskKind::Translate => "translate",
        }
    }

    /// Get all task kinds
    pub fn all() -> &'static [TaskKind] {
        &[TaskKind::Transcribe, TaskKind::Summarize, TaskKind::Translate]
    }

    /// Whether this task consumes audio (otherwise text)
    pub fn consumes_audio(&self) -> bool {
        matches!(self, TaskKind::Transcribe)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "transcribe" => Ok(TaskKind::Transcribe),
            "summarize" | "summarise" => Ok(TaskKind::Summarize),
            "translate" => Ok(TaskKind::Translate),
            other => Err(Error::InvalidInput(format!("unknown task: {other}"))),
        }
    }
}

/// Normalized language code ("fr", "en", "pt-br")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim().to_lowercase().replace('_', "-");
        let mut parts = code.splitn(2, '-');

        let primary = parts.next().unwrap_or_default();
        let primary_ok =
            (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_lowercase());
        let region_ok = parts.next().is_none_or(|region| {
            (2..=8).contains(&region.len()) && region.chars().all(|c| c.is_ascii_alphanumeric())
        });

        if primary_ok && region_ok {
            Ok(Self(code))
        } else {
            Err(Error::InvalidInput(format!("invalid language code: {code:?}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary subtag without region ("pt" for "pt-br")
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

/// A piece of text with its declared or detected language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlob {
    pub text: String,
    pub language: Option<LanguageCode>,
}

impl TextBlob {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: LanguageCode) -> Self {
        self.language = Some(language);
        self
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }
}

/// Count whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Keep at most `max_words` words, joined by single spaces
pub fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Target summary length, in words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for LengthBounds {
    fn default() -> Self {
        Self {
            min_words: 30,
            max_words: 150,
        }
    }
}

impl LengthBounds {
    pub fn new(min_words: usize, max_words: usize) -> Result<Self> {
        let bounds = Self {
            min_words,
            max_words,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_words == 0 {
            return Err(Error::InvalidInput(
                "summary max_words must be positive".to_string(),
            ));
        }
        if self.min_words > self.max_words {
            return Err(Error::InvalidInput(format!(
                "summary min_words ({}) exceeds max_words ({})",
                self.min_words, self.max_words
            )));
        }
        Ok(())
    }

    pub fn contains(&self, words: usize) -> bool {
        (self.min_words..=self.max_words).contains(&words)
    }
}

/// A task together with the parameters that only make sense for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    Transcribe {
        #[serde(default)]
        language_hint: Option<LanguageCode>,
        /// Vocabulary or style context passed to the recognizer
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
    Summarize(LengthBounds),
    Translate {
        target: LanguageCode,
    },
}

impl Task {
    pub fn transcribe() -> Self {
        Task::Transcribe {
            language_hint: None,
            prompt: None,
        }
    }

    pub fn summarize() -> Self {
        Task::Summarize(LengthBounds::default())
    }

    pub fn translate(target: LanguageCode) -> Self {
        Task::Translate { target }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Transcribe { .. } => TaskKind::Transcribe,
            Task::Summarize(_) => TaskKind::Summarize,
            Task::Translate { .. } => TaskKind::Translate,
        }
    }

    pub fn target_language(&self) -> Option<&LanguageCode> {
        match self {
            Task::Translate { target } => Some(target),
            _ => None,
        }
    }
}

impl FromStr for Task {
    type Err = Error;

    /// Parse "transcribe", "summarize", "summarize:20-60" or "translate:fr"
    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (s, None),
        };

        match (name.parse::<TaskKind>()?, arg) {
            (TaskKind::Transcribe, None) => Ok(Task::transcribe()),
            (TaskKind::Transcribe, Some(lang)) => Ok(Task::Transcribe {
                language_hint: Some(lang.parse()?),
                prompt: None,
            }),
            (TaskKind::Summarize, None) => Ok(Task::summarize()),
            (TaskKind::Summarize, Some(range)) => {
                let (min, max) = range.split_once('-').ok_or_else(|| {
                    Error::InvalidInput(format!("expected MIN-MAX word bounds, got {range:?}"))
                })?;
                let parse = |v: &str| {
                    v.trim().parse::<usize>().map_err(|_| {
                        Error::InvalidInput(format!("invalid word bound: {v:?}"))
                    })
                };
                Ok(Task::Summarize(LengthBounds::new(parse(min)?, parse(max)?)?))
            }
            (TaskKind::Translate, Some(lang)) => Ok(Task::translate(lang.parse()?)),
            (TaskKind::Translate, None) => Err(Error::InvalidInput(
                "translate requires a target language, e.g. translate:fr".to_string(),
            )),
        }
    }
}

/// Input payload of a request
#[derive(Debug, Clone)]
pub enum ProcessingInput {
    Audio(AudioHandle),
    Text(TextBlob),
}

impl ProcessingInput {
    pub fn text(text: impl Into<String>) -> Self {
        ProcessingInput::Text(TextBlob::new(text))
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, ProcessingInput::Audio(_))
    }

    fn modality(&self) -> &'static str {
        match self {
            ProcessingInput::Audio(_) => "audio",
            ProcessingInput::Text(_) => "text",
        }
    }

    /// Check that this input has the modality `task` consumes
    pub fn check_modality(&self, task: TaskKind) -> Result<()> {
        if self.is_audio() == task.consumes_audio() {
            return Ok(());
        }
        let expected = if task.consumes_audio() { "audio" } else { "text" };
        Err(Error::InvalidInput(format!(
            "{task} expects {expected} input, got {}",
            self.modality()
        )))
    }
}

/// A single unit of work for the dispatcher
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    input: ProcessingInput,
    task: Task,
}

impl ProcessingRequest {
    pub fn new(input: ProcessingInput, task: Task) -> Self {
        Self { input, task }
    }

    pub fn input(&self) -> &ProcessingInput {
        &self.input
    }

    pub fn task(&self) -> &Task {
        &self.task
    }
}

/// What was registered for a capability at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub kind: TaskKind,
    /// Model or service name
    pub identifier: String,
    /// Translation targets (empty for other kinds)
    #[serde(default)]
    pub supported_languages: BTreeSet<LanguageCode>,
    /// Source side of a translation pair; `None` accepts any source
    #[serde(default)]
    pub source_language: Option<LanguageCode>,
}

impl CapabilityDescriptor {
    pub fn transcriber(identifier: impl Into<String>) -> Self {
        Self::untargeted(TaskKind::Transcribe, identifier)
    }

    pub fn summarizer(identifier: impl Into<String>) -> Self {
        Self::untargeted(TaskKind::Summarize, identifier)
    }

    pub fn translator(
        identifier: impl Into<String>,
        source_language: Option<LanguageCode>,
        targets: impl IntoIterator<Item = LanguageCode>,
    ) -> Self {
        Self {
            kind: TaskKind::Translate,
            identifier: identifier.into(),
            supported_languages: targets.into_iter().collect(),
            source_language,
        }
    }

    fn untargeted(kind: TaskKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            supported_languages: BTreeSet::new(),
            source_language: None,
        }
    }

    pub fn supports_target(&self, language: &LanguageCode) -> bool {
        self.supported_languages.contains(language)
    }

    pub fn accepts_source(&self, language: &LanguageCode) -> bool {
        self.source_language
            .as_ref()
            .is_none_or(|source| source.primary() == language.primary())
    }
}

/// Details attached to every successful result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub request_id: RequestId,
    /// Provider that produced the output
    pub provider: String,
    pub model: Option<String>,
    pub detected_language: Option<LanguageCode>,
    /// Output was cut to fit the requested bounds
    pub truncated: bool,
    /// Input was cut to fit the backend's context
    pub input_truncated: bool,
    /// Output word count lies within the requested bounds (summaries only)
    pub within_bounds: Option<bool>,
    pub confidence: Option<f32>,
    pub audio_duration_ms: Option<u64>,
    pub usage: Option<TokenUsage>,
    pub elapsed_ms: u64,
    pub completed_at: DateTime<Utc>,
}

/// A successful dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub task: TaskKind,
    pub output: TextBlob,
    pub metadata: ResultMetadata,
}
