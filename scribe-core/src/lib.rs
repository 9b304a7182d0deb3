//! Scribe - transcription, summarization and translation behind one dispatcher
//!
//! Providers for each capability are registered once at startup in a
//! [`CapabilityRegistry`]. The [`Dispatcher`] validates a request, routes it
//! to the matching provider and normalizes the result; the [`PipelineRunner`]
//! chains several tasks, e.g. transcribe, then summarize, then translate.

pub mod audio;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod registry;
pub mod service;
pub mod types;
pub mod vad;

pub use error::{Error, ErrorKind, Result};
pub use types::*;

pub use audio::{AudioHandle, DecodedAudio};
pub use config::{Backend, ScribeConfig, ServiceConfig, SummarizationConfig, TranslationConfig};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use pipeline::{PipelineError, PipelineRunner};
pub use providers::{CapabilityOutput, Summarizer, Transcriber, Translator};
pub use registry::{CapabilityRegistry, Provider, RegisteredCapability};
pub use service::ScribeService;
