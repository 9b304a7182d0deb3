//! Chained runs: transcribe → summarize → translate
//!
//! - Output of each step feeds the next
//! - Fail-fast keeps the results produced so far
//! - Step lists are type-checked before any provider runs
//! - Cancellation abandons the in-flight step

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use scribe::{
    AudioHandle, CapabilityRegistry, Dispatcher, DispatcherConfig, Error, ErrorKind,
    LengthBounds, PipelineRunner, ProcessingInput, ScribeService, Task, TaskKind,
};
use tokio_util::sync::CancellationToken;

struct Stubs {
    transcriber: Arc<StubTranscriber>,
    summarizer: Arc<StubSummarizer>,
    translator: Arc<StubTranslator>,
}

fn stubs(summary: SummaryBehavior) -> (Stubs, CapabilityRegistry) {
    let stubs = Stubs {
        transcriber: StubTranscriber::says(&passage(120)),
        summarizer: StubSummarizer::new(summary),
        translator: StubTranslator::new("opus-mt-en-fr", &["fr"], "Un résumé en français."),
    };
    let mut registry = CapabilityRegistry::new();
    register_transcriber(&mut registry, &stubs.transcriber);
    register_summarizer(&mut registry, &stubs.summarizer);
    register_translator(&mut registry, &stubs.translator, Some("en"));
    (stubs, registry)
}

fn runner(registry: CapabilityRegistry) -> PipelineRunner {
    PipelineRunner::new(Dispatcher::new(Arc::new(registry)))
}

fn full_chain() -> Vec<Task> {
    vec![
        Task::transcribe(),
        Task::Summarize(LengthBounds::new(20, 60).unwrap()),
        Task::translate(lang("fr")),
    ]
}

fn audio() -> ProcessingInput {
    ProcessingInput::Audio(AudioHandle::Wav(speech_wav()))
}

// ============ Successful chains ============

#[tokio::test]
async fn test_transcribe_summarize_translate() {
    let (stubs, registry) = stubs(SummaryBehavior::FirstWords(40));
    let results = runner(registry).run(audio(), &full_chain()).await.unwrap();

    let tasks: Vec<TaskKind> = results.iter().map(|r| r.task).collect();
    assert_eq!(
        tasks,
        vec![TaskKind::Transcribe, TaskKind::Summarize, TaskKind::Translate]
    );

    // the summary is the first 40 words of the transcript
    let transcript_words: Vec<&str> = results[0].output.text.split_whitespace().collect();
    assert_eq!(results[1].output.text, transcript_words[..40].join(" "));

    // transcript language flows through the summary into the translation request
    assert_eq!(results[0].output.language, Some(lang("en")));
    assert_eq!(results[1].output.language, Some(lang("en")));
    assert_eq!(results[2].output.text, "Un résumé en français.");
    assert_eq!(results[2].output.language, Some(lang("fr")));

    assert_eq!(stubs.transcriber.calls(), 1);
    assert_eq!(stubs.summarizer.calls(), 1);
    assert_eq!(stubs.translator.calls(), 1);
}

#[tokio::test]
async fn test_text_pipeline_skips_transcription() {
    let (stubs, registry) = stubs(SummaryBehavior::FirstWords(25));
    let steps = [Task::summarize(), Task::translate(lang("fr"))];

    let results = runner(registry)
        .run(ProcessingInput::text(passage(300)), &steps)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    // 25 words is below the default 30-word minimum but still accepted
    assert_eq!(results[0].metadata.within_bounds, Some(false));
    assert_eq!(stubs.transcriber.calls(), 0);
}

// ============ Fail-fast ============

#[tokio::test]
async fn test_failure_at_step_two_keeps_step_one() {
    let (stubs, registry) = stubs(SummaryBehavior::Fail);

    let err = runner(registry)
        .run(audio(), &full_chain())
        .await
        .unwrap_err();

    assert_eq!(err.step, 1);
    assert_eq!(err.task, Some(TaskKind::Summarize));
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    assert_eq!(err.completed.len(), 1);
    assert_eq!(err.completed[0].task, TaskKind::Transcribe);

    assert_eq!(stubs.summarizer.calls(), 1);
    assert_eq!(stubs.translator.calls(), 0);
}

#[tokio::test]
async fn test_unsupported_target_stops_at_last_step() {
    let (stubs, registry) = stubs(SummaryBehavior::FirstWords(40));
    let steps = [Task::transcribe(), Task::summarize(), Task::translate(lang("de"))];

    let err = runner(registry).run(audio(), &steps).await.unwrap_err();

    assert_eq!(err.step, 2);
    assert!(matches!(err.error, Error::UnsupportedLanguage { .. }));
    assert_eq!(err.completed.len(), 2);
    assert_eq!(stubs.translator.calls(), 0);
}

#[tokio::test]
async fn test_unrecognized_first_step() {
    let summarizer = StubSummarizer::new(SummaryBehavior::FirstWords(40));
    let transcriber = StubTranscriber::unintelligible();
    let mut registry = CapabilityRegistry::new();
    register_transcriber(&mut registry, &transcriber);
    register_summarizer(&mut registry, &summarizer);

    let err = runner(registry)
        .run(audio(), &[Task::transcribe(), Task::summarize()])
        .await
        .unwrap_err();

    assert_eq!(err.step, 0);
    assert!(err.error.is_negative_result());
    assert!(err.completed.is_empty());
    assert_eq!(summarizer.calls(), 0);
}

// ============ Type checking ============

#[tokio::test]
async fn test_misplaced_transcribe_rejected_before_any_call() {
    let (stubs, registry) = stubs(SummaryBehavior::FirstWords(40));
    let steps = [Task::transcribe(), Task::summarize(), Task::transcribe()];

    let err = runner(registry).run(audio(), &steps).await.unwrap_err();

    assert_eq!(err.step, 2);
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.completed.is_empty());
    assert_eq!(stubs.transcriber.calls(), 0);
    assert_eq!(stubs.summarizer.calls(), 0);
}

#[tokio::test]
async fn test_text_task_on_audio_rejected() {
    let (stubs, registry) = stubs(SummaryBehavior::FirstWords(40));

    let err = runner(registry)
        .run(audio(), &[Task::summarize()])
        .await
        .unwrap_err();

    assert_eq!(err.step, 0);
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(stubs.summarizer.calls(), 0);
}

// ============ Cancellation ============

#[tokio::test]
async fn test_cancel_abandons_in_flight_step() {
    let (stubs, registry) = stubs(SummaryBehavior::Hang);
    let runner = runner(registry);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(10),
        runner.run_cancellable(audio(), &full_chain(), &cancel),
    )
    .await
    .expect("cancellation should end the run")
    .unwrap_err();

    assert_eq!(err.step, 1);
    assert!(matches!(err.error, Error::Cancelled));
    assert_eq!(err.completed.len(), 1);
    assert_eq!(stubs.summarizer.calls(), 1);
    assert_eq!(stubs.translator.calls(), 0);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let (stubs, registry) = stubs(SummaryBehavior::FirstWords(40));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = runner(registry)
        .run_cancellable(audio(), &full_chain(), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.step, 0);
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(stubs.transcriber.calls(), 0);
}

// ============ Service facade ============

#[tokio::test]
async fn test_service_process_and_pipeline() {
    let (stubs, registry) = stubs(SummaryBehavior::FirstWords(40));
    let service = ScribeService::new(registry, DispatcherConfig::default());

    let result = service
        .process(
            ProcessingInput::text("Hello, how are you?"),
            Task::translate(lang("fr")),
        )
        .await
        .unwrap();
    assert_eq!(result.output.text, "Un résumé en français.");

    let results = service
        .process_pipeline(audio(), &full_chain())
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(stubs.translator.calls(), 2);
    assert_eq!(service.registry().len(), 3);
}
