//! Provider abstraction layer for the three capabilities
//!
//! Each capability is a single-operation trait; concrete backends (OpenAI,
//! Gemini, Hugging Face, or any completion model) plug in behind it.
mod completion;
mod gemini;
mod http;
mod huggingface;
mod llm;
mod openai;
mod output;
mod summarization;
mod transcription;
mod translation;

pub use completion::{CompletionProvider, CompletionRequest, CompletionResponse, TokenUsage};
pub use gemini::GeminiTranscriptionProvider;
pub use huggingface::{HuggingFaceSummarizer, HuggingFaceTranscriber, HuggingFaceTranslator};
pub use llm::{CompletionSummarizer, CompletionTranslator, language_name};
pub use openai::{OpenAICompletionProvider, OpenAITranscriptionProvider};
pub use output::CapabilityOutput;
pub use summarization::{SummaryLimits, SummaryRequest, Summarizer};
pub use transcription::{Transcriber, TranscriptionRequest};
pub use translation::{TranslationRequest, Translator, ensure_supported};
