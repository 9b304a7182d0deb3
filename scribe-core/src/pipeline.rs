//! Chained task execution
//!
//! Each step consumes the text produced by the step before it. The first
//! failure stops the chain; results produced up to that point are handed
//! back inside the error.

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatcher::Dispatcher;
use crate::error::{Error, ErrorKind};
use crate::types::{ProcessingInput, ProcessingRequest, ProcessingResult, Task, TaskKind};

/// A pipeline stopped at `step`
#[derive(Debug, Error)]
#[error("pipeline step {step} ({}) failed: {error}", .task.map_or("-", |t| t.as_str()))]
pub struct PipelineError {
    /// Zero-based index of the failing step
    pub step: usize,
    /// Kind of the failing step; `None` when there were no steps at all
    pub task: Option<TaskKind>,
    /// Results of the steps that succeeded before the failure
    pub completed: Vec<ProcessingResult>,
    #[source]
    pub error: Error,
}

impl PipelineError {
    fn at(step: usize, task: &Task, completed: Vec<ProcessingResult>, error: Error) -> Self {
        Self {
            step,
            task: Some(task.kind()),
            completed,
            error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Runs a sequence of tasks through a dispatcher
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    dispatcher: Dispatcher,
}

impl PipelineRunner {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn run(
        &self,
        input: ProcessingInput,
        steps: &[Task],
    ) -> Result<Vec<ProcessingResult>, PipelineError> {
        self.run_cancellable(input, steps, &CancellationToken::new())
            .await
    }

    /// Like `run`, but abandons the in-flight step once `cancel` fires
    pub async fn run_cancellable(
        &self,
        input: ProcessingInput,
        steps: &[Task],
        cancel: &CancellationToken,
    ) -> Result<Vec<ProcessingResult>, PipelineError> {
        check_steps(&input, steps)?;

        let mut completed = Vec::with_capacity(steps.len());
        let mut current = input;

        for (step, task) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Pipeline cancelled before step {}", step);
                return Err(PipelineError::at(step, task, completed, Error::Cancelled));
            }

            debug!("Pipeline step {}: {}", step, task.kind());
            let request = ProcessingRequest::new(current, task.clone());

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Error::Cancelled),
                result = self.dispatcher.dispatch(&request) => result,
            };

            match outcome {
                Ok(result) => {
                    current = ProcessingInput::Text(result.output.clone());
                    completed.push(result);
                }
                Err(error) => {
                    info!(
                        "Pipeline stopped at step {} with {} completed",
                        step,
                        completed.len()
                    );
                    return Err(PipelineError::at(step, task, completed, error));
                }
            }
        }

        Ok(completed)
    }
}

/// Reject step lists that cannot type-check before anything runs
fn check_steps(input: &ProcessingInput, steps: &[Task]) -> Result<(), PipelineError> {
    let Some(first) = steps.first() else {
        return Err(PipelineError {
            step: 0,
            task: None,
            completed: Vec::new(),
            error: Error::InvalidInput("pipeline has no steps".to_string()),
        });
    };

    if let Err(error) = input.check_modality(first.kind()) {
        return Err(PipelineError::at(0, first, Vec::new(), error));
    }

    // only the first step can see audio
    if let Some((step, task)) = steps
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, task)| task.kind().consumes_audio())
    {
        return Err(PipelineError::at(
            step,
            task,
            Vec::new(),
            Error::InvalidInput(format!("{} can only be the first step", task.kind())),
        ));
    }

    Ok(())
}
