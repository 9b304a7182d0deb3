//! Error types for Scribe

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TaskKind;

/// Result type alias using Scribe's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by backend failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All possible errors in Scribe
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No provider registered for {0}")]
    UnsupportedCapability(TaskKind),

    #[error("Unsupported language: {language} (supported: {})", .supported.join(", "))]
    UnsupportedLanguage {
        language: String,
        supported: Vec<String>,
    },

    #[error("Resource unavailable: {resource}")]
    ResourceUnavailable {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Speech could not be recognized")]
    Unrecognized,

    #[error("Input too short to summarize: {words} words, need at least {required}")]
    InputTooShort { words: usize, required: usize },

    #[error("Backend {provider} unavailable: {message}")]
    BackendUnavailable {
        provider: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Flat error category, for callers that map failures to external responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedCapability,
    UnsupportedLanguage,
    ResourceUnavailable,
    Unrecognized,
    InputTooShort,
    BackendUnavailable,
    Cancelled,
    Config,
}

impl Error {
    /// Backend failure without an underlying error value
    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::BackendUnavailable {
            provider: provider.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Backend failure wrapping the error that caused it
    pub fn backend_source<E>(provider: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::BackendUnavailable {
            provider: provider.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn resource(resource: impl Into<String>, source: std::io::Error) -> Self {
        Error::ResourceUnavailable {
            resource: resource.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::UnsupportedCapability(_) => ErrorKind::UnsupportedCapability,
            Error::UnsupportedLanguage { .. } => ErrorKind::UnsupportedLanguage,
            Error::ResourceUnavailable { .. } => ErrorKind::ResourceUnavailable,
            Error::Unrecognized => ErrorKind::Unrecognized,
            Error::InputTooShort { .. } => ErrorKind::InputTooShort,
            Error::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Config(_) | Error::ConfigParse(_) => ErrorKind::Config,
        }
    }

    /// A legitimate negative outcome rather than a fault
    pub fn is_negative_result(&self) -> bool {
        matches!(self, Error::Unrecognized)
    }
}
