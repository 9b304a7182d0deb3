//! Completion provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request for a single system + user completion
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Instructions for the model
    pub system_prompt: String,
    /// Text to process
    pub text: String,
    /// Max tokens to generate
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            text: text.into(),
            max_tokens: None,
            temperature: 0.3,
        }
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Response from completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model used for completion
    pub model: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Trait for chat-completion backends used by the summarizer and translator adapters
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}
