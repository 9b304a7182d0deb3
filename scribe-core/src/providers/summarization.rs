//! Summarization capability

use std::borrow::Cow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{LengthBounds, truncate_words, word_count};

use super::CapabilityOutput;

/// Request for a summary of `text` within `bounds`
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub text: String,
    pub bounds: LengthBounds,
}

impl SummaryRequest {
    pub fn new(text: impl Into<String>, bounds: LengthBounds) -> Self {
        Self {
            text: text.into(),
            bounds,
        }
    }
}

/// Input size limits of a summarization backend, in words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLimits {
    /// Below this there is nothing worth condensing
    pub min_input_words: usize,
    /// Longer inputs are cut to fit the model's context
    pub max_input_words: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            min_input_words: 10,
            // bart-large-cnn accepts 1024 tokens
            max_input_words: 700,
        }
    }
}

impl SummaryLimits {
    pub fn check(&self, text: &str) -> Result<()> {
        let words = word_count(text);
        let required = self.min_input_words.max(1);
        if words < required {
            return Err(Error::InputTooShort { words, required });
        }
        Ok(())
    }

    /// Cut `text` to the backend's input limit; the flag is true when cut
    pub fn fit<'a>(&self, text: &'a str) -> (Cow<'a, str>, bool) {
        if word_count(text) > self.max_input_words {
            (Cow::Owned(truncate_words(text, self.max_input_words)), true)
        } else {
            (Cow::Borrowed(text), false)
        }
    }
}

/// Text summarization backend
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Condense text, aiming for a length within the request's bounds
    async fn summarize(&self, request: SummaryRequest) -> Result<CapabilityOutput>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool {
        true
    }
}
