//! Entry point for callers: one request or a chained pipeline

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ScribeConfig;
use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::error::Result;
use crate::pipeline::{PipelineError, PipelineRunner};
use crate::registry::CapabilityRegistry;
use crate::types::{ProcessingInput, ProcessingRequest, ProcessingResult, Task};

/// Transcription, summarization and translation over a fixed set of providers
#[derive(Debug, Clone)]
pub struct ScribeService {
    runner: PipelineRunner,
}

impl ScribeService {
    pub fn new(registry: CapabilityRegistry, config: DispatcherConfig) -> Self {
        let dispatcher = Dispatcher::with_config(Arc::new(registry), config);
        Self {
            runner: PipelineRunner::new(dispatcher),
        }
    }

    /// Build every configured provider and register it
    pub fn from_config(config: &ScribeConfig) -> Result<Self> {
        let registry = config.build_registry()?;
        info!("Scribe ready with {} capabilities", registry.len());
        Ok(Self::new(registry, config.dispatcher.clone()))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.runner.dispatcher()
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        self.dispatcher().registry()
    }

    pub async fn process(&self, input: ProcessingInput, task: Task) -> Result<ProcessingResult> {
        self.dispatcher()
            .dispatch(&ProcessingRequest::new(input, task))
            .await
    }

    pub async fn process_pipeline(
        &self,
        input: ProcessingInput,
        steps: &[Task],
    ) -> std::result::Result<Vec<ProcessingResult>, PipelineError> {
        self.runner.run(input, steps).await
    }

    pub async fn process_pipeline_cancellable(
        &self,
        input: ProcessingInput,
        steps: &[Task],
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<ProcessingResult>, PipelineError> {
        self.runner.run_cancellable(input, steps, cancel).await
    }
}
