mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use docsum_core::{DocumentType, ModelConfig, ModelRegistry, TokenizerFamily};
use docsum_llm::LlmError;
use docsum_summary::{ErrorKind, RetryPolicy, StrategyError, SummaryEngine};

fn unavailable() -> Result<String, LlmError> {
    Err(LlmError::ModelUnavailable("model is loading".into()))
}

#[tokio::test(start_paused = true)]
async fn model_load_failure_is_retried_with_backoff_then_surfaced() {
    let backend = Arc::new(ScriptedBackend::new(|_| unavailable()));
    let service = service(&backend, &ModelRegistry::builtin(), RetryPolicy::default());

    let started = tokio::time::Instant::now();
    let err = service
        .summarize_document("A contract between two parties.", Some(DocumentType::LegalContract))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ModelLoad);
    assert!(err.kind().is_transient());
    match err.cause() {
        Some(StrategyError::ModelLoad { model, attempts, source }) => {
            assert_eq!(model, "Equall/Saul-7B-Instruct-v1");
            assert_eq!(*attempts, 3);
            assert!(matches!(source, LlmError::ModelUnavailable(_)));
        }
        other => panic!("unexpected cause: {other:?}"),
    }
    assert_eq!(backend.call_count(), 3);
    // 500ms + 1000ms of backoff between the three attempts.
    assert!(started.elapsed() >= Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn transient_failure_recovers_and_is_reported() {
    let failures = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&failures);
    let backend = Arc::new(ScriptedBackend::new(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(LlmError::ApiError {
                status: 503,
                body: "warming up".into(),
            })
        } else {
            Ok("Summary: Recovered after a warm-up.".into())
        }
    }));
    let service = service(&backend, &ModelRegistry::builtin(), fast_policy());

    let response = service.summarize_document("Short memo.", None).await.unwrap();
    assert_eq!(response.summary, "Recovered after a warm-up.");
    assert_eq!(response.warnings.len(), 2);
    assert!(response.warnings[0].contains("attempt 1"));
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn hung_calls_time_out_as_model_load_failures() {
    let backend = Arc::new(
        ScriptedBackend::new(|_| Ok("too late".into())).with_delay(|_| Duration::from_secs(600)),
    );
    let policy = RetryPolicy {
        timeout: Duration::from_secs(1),
        ..fast_policy()
    };
    let service = service(&backend, &ModelRegistry::builtin(), policy);

    let err = service.summarize_document("Short memo.", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelLoad);
    assert!(err.detailed_message().contains("no response within"));
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test]
async fn empty_output_is_retried_once() {
    let backend = Arc::new(ScriptedBackend::new(|_| Ok("Summary:   ".into())));
    let service = service(&backend, &ModelRegistry::builtin(), fast_policy());

    let err = service.summarize_document("Short memo.", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SummaryGeneration);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn empty_output_then_success_adds_warning() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let backend = Arc::new(ScriptedBackend::new(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(String::new())
        } else {
            Ok("Second try worked.".into())
        }
    }));
    let service = service(&backend, &ModelRegistry::builtin(), fast_policy());

    let response = service.summarize_document("Short memo.", None).await.unwrap();
    assert_eq!(response.summary, "Second try worked.");
    assert_eq!(response.warnings.len(), 1);
    assert!(response.warnings[0].contains("empty output"));
}

#[tokio::test]
async fn context_overflow_is_never_retried() {
    let backend = Arc::new(ScriptedBackend::new(|_| {
        Err(LlmError::ApiError {
            status: 400,
            body: "This model's maximum context length is 512 tokens".into(),
        })
    }));
    let service = service(&backend, &ModelRegistry::builtin(), fast_policy());

    let err = service
        .summarize_document("Short memo.", Some(DocumentType::Email))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TokenLimitExceeded);
    assert!(matches!(
        err.cause(),
        Some(StrategyError::TokenLimitExceeded { budget: 412, .. })
    ));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn template_larger_than_budget_fails_before_any_call() {
    let backend = Arc::new(ScriptedBackend::new(map_reduce_script));
    let tiny = ModelConfig::new("tiny", 40, 10).with_tokenizer(TokenizerFamily::Words);
    let registry = ModelRegistry::builtin()
        .with_override(DocumentType::General, tiny)
        .unwrap();
    let service = service(&backend, &registry, fast_policy());

    let err = service.summarize_document("Short memo.", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TokenLimitExceeded);
    assert!(matches!(
        err.cause(),
        Some(StrategyError::TokenLimitExceeded { budget: 30, .. })
    ));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn missing_provider_configuration_fails_fast() {
    let backend = Arc::new(ScriptedBackend::new(|_| {
        Err(LlmError::NotConfigured("ANTHROPIC_API_KEY not set".into()))
    }));
    let service = service(&backend, &ModelRegistry::builtin(), fast_policy());

    let err = service.summarize_document("Short memo.", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelLoad);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn failed_chunk_discards_partial_results() {
    let backend = Arc::new(ScriptedBackend::new(|prompt| match first_marker(prompt) {
        Some(90) => Err(LlmError::ApiError {
            status: 422,
            body: "unprocessable".into(),
        }),
        _ => map_reduce_script(prompt),
    }));
    let service = service(&backend, &small_registry(), fast_policy());

    let err = service
        .summarize_document(&numbered_words(250), Some(DocumentType::LegalContract))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SummaryGeneration);
    // No reduce call happened.
    assert!(backend.call_count() <= 3);
}

#[tokio::test]
async fn non_converging_reduce_hits_depth_cap() {
    // Every call answers with 80 words, so merged summaries never fit.
    let backend = Arc::new(ScriptedBackend::new(|_| Ok(vec!["echo"; 80].join(" "))));
    let engine = SummaryEngine::new(backend.clone(), fast_policy()).with_max_reduce_depth(3);
    let service = service_with(&small_registry(), engine);

    let err = service
        .summarize_document(&numbered_words(250), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SummaryGeneration);
    assert!(matches!(
        err.cause(),
        Some(StrategyError::ReduceDepthExceeded { depth: 3 })
    ));
    // Three map calls, then three reduce levels of three chunks each.
    assert_eq!(backend.call_count(), 12);
}

#[tokio::test(start_paused = true)]
async fn dropped_request_cancels_in_flight_calls() {
    let backend = Arc::new(
        ScriptedBackend::new(map_reduce_script).with_delay(|_| Duration::from_secs(60)),
    );
    let service = service(&backend, &small_registry(), fast_policy());

    let content = numbered_words(250);
    let request = service.summarize_document(&content, None);
    let outcome = tokio::time::timeout(Duration::from_millis(50), request).await;
    assert!(outcome.is_err());

    // Every call was started, none completed.
    assert_eq!(backend.call_count(), 3);
    assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 3);
}
