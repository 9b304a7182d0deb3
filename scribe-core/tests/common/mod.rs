//! Stub providers and fixtures shared by the integration tests
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};

use scribe::providers::{
    CompletionProvider, CompletionRequest, CompletionResponse, SummaryRequest,
    TranscriptionRequest, TranslationRequest,
};
use scribe::{
    CapabilityDescriptor, CapabilityOutput, CapabilityRegistry, Error, LanguageCode, Provider,
    Result, Summarizer, Transcriber, Translator,
};

pub fn lang(code: &str) -> LanguageCode {
    code.parse().unwrap()
}

// ============ Transcription ============

pub struct StubTranscriber {
    /// `None` reports the audio as unintelligible
    reply: Option<String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl StubTranscriber {
    pub fn says(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn unintelligible() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    fn name(&self) -> &str {
        "stub-asr"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<CapabilityOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = request.prompt.clone();
        match &self.reply {
            Some(text) => Ok(CapabilityOutput::new(text.clone())
                .with_language(Some(request.language.unwrap_or_else(|| lang("en"))))
                .with_duration_ms(request.audio.duration_ms())),
            None => Err(Error::Unrecognized),
        }
    }
}

// ============ Summarization ============

pub enum SummaryBehavior {
    /// Keep the first N words of the input
    FirstWords(usize),
    /// Fail as an unreachable backend
    Fail,
    /// Never answer within a test's lifetime
    Hang,
}

pub struct StubSummarizer {
    behavior: SummaryBehavior,
    calls: AtomicUsize,
}

impl StubSummarizer {
    pub fn new(behavior: SummaryBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    fn name(&self) -> &str {
        "stub-summarizer"
    }

    async fn summarize(&self, request: SummaryRequest) -> Result<CapabilityOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            SummaryBehavior::FirstWords(n) => {
                let summary: Vec<&str> = request.text.split_whitespace().take(n).collect();
                Ok(CapabilityOutput::new(summary.join(" ")))
            }
            SummaryBehavior::Fail => Err(Error::backend("stub-summarizer", "connection refused")),
            SummaryBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(CapabilityOutput::new("too late"))
            }
        }
    }
}

// ============ Completion ============

/// Chat model that always answers the same text and keeps the last request
pub struct StubModel {
    reply: String,
    last: Mutex<Option<CompletionRequest>>,
}

impl StubModel {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            last: Mutex::new(None),
        })
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for StubModel {
    fn name(&self) -> &str {
        "stub-llm"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        *self.last.lock().unwrap() = Some(request);
        Ok(CompletionResponse {
            text: self.reply.clone(),
            usage: None,
            model: None,
        })
    }

    fn is_configured(&self) -> bool {
        true
    }
}

// ============ Translation ============

pub struct StubTranslator {
    name: &'static str,
    targets: BTreeSet<LanguageCode>,
    reply: String,
    calls: AtomicUsize,
}

impl StubTranslator {
    pub fn new(name: &'static str, targets: &[&str], reply: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            targets: targets.iter().map(|t| lang(t)).collect(),
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for StubTranslator {
    fn name(&self) -> &str {
        self.name
    }

    fn supported_languages(&self) -> &BTreeSet<LanguageCode> {
        &self.targets
    }

    async fn translate(&self, request: TranslationRequest) -> Result<CapabilityOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        scribe::providers::ensure_supported(&self.targets, &request.target)?;
        Ok(CapabilityOutput::new(self.reply.clone()).with_language(Some(request.target)))
    }
}

// ============ Registry ============

pub fn register_transcriber(registry: &mut CapabilityRegistry, stub: &Arc<StubTranscriber>) {
    registry
        .register(
            CapabilityDescriptor::transcriber("stub-whisper"),
            Provider::Transcriber(stub.clone()),
        )
        .unwrap();
}

pub fn register_summarizer(registry: &mut CapabilityRegistry, stub: &Arc<StubSummarizer>) {
    registry
        .register(
            CapabilityDescriptor::summarizer("stub-bart"),
            Provider::Summarizer(stub.clone()),
        )
        .unwrap();
}

pub fn register_translator(
    registry: &mut CapabilityRegistry,
    stub: &Arc<StubTranslator>,
    source: Option<&str>,
) {
    let targets: Vec<LanguageCode> = stub.supported_languages().iter().cloned().collect();
    registry
        .register(
            CapabilityDescriptor::translator(stub.name(), source.map(lang), targets),
            Provider::Translator(stub.clone()),
        )
        .unwrap();
}

// ============ Audio ============

fn wav(samples: impl Iterator<Item = i16>) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// One second of a loud 440Hz tone
pub fn speech_wav() -> Vec<u8> {
    wav((0..16000).map(|i| {
        let t = i as f32 / 16000.0;
        ((t * 440.0 * std::f32::consts::TAU).sin() * 8000.0) as i16
    }))
}

/// One second of silence
pub fn silent_wav() -> Vec<u8> {
    wav(std::iter::repeat_n(0i16, 16000))
}

/// A passage of `words` distinct words
pub fn passage(words: usize) -> String {
    (0..words)
        .map(|i| format!("word{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}
