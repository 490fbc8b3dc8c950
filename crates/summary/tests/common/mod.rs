//! Scripted inference backend shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docsum_core::{DocumentType, ModelConfig, ModelRegistry, TokenizerFamily};
use docsum_llm::{LlmError, LlmProvider};
use docsum_summary::{
    DocumentSummaryService, RetryPolicy, StrategyKind, SummaryEngine, SummaryStrategyFactory,
};

type Script = dyn Fn(&str) -> Result<String, LlmError> + Send + Sync;
type Delay = dyn Fn(&str) -> Duration + Send + Sync;

/// Backend whose answers come from a closure over the prompt.
pub struct ScriptedBackend {
    script: Box<Script>,
    delay: Option<Box<Delay>>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub requests: Mutex<Vec<(String, u32)>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(script: impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_output_tokens_seen(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|(_, m)| *m).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedBackend {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), max_output_tokens));
        self.prompts.lock().unwrap().push(prompt.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(prompt)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.script)(prompt)
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

/// First `w<N>` marker word in a prompt, if any.
pub fn first_marker(prompt: &str) -> Option<usize> {
    prompt
        .split_whitespace()
        .filter_map(|w| w.strip_prefix('w'))
        .find_map(|n| n.parse().ok())
}

/// Partial summaries embedded in a reduce prompt.
pub fn partials(prompt: &str) -> Option<Vec<String>> {
    let (_, rest) = prompt.split_once("Partial summaries:\n")?;
    let (body, _) = rest.rsplit_once("\n\nSummary:")?;
    Some(body.split("\n\n").map(str::to_string).collect())
}

/// Answers chunk prompts with `part-w<N>` and reduce prompts with the
/// partials joined by ` | `.
pub fn map_reduce_script(prompt: &str) -> Result<String, LlmError> {
    if let Some(parts) = partials(prompt) {
        return Ok(format!("Summary: {}", parts.join(" | ")));
    }
    match first_marker(prompt) {
        Some(n) => Ok(format!("part-w{n}")),
        None => Ok("A plain summary of the document.".to_string()),
    }
}

/// `n` words `w0 w1 ...`; each word is one token under the words tokenizer.
pub fn numbered_words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

/// Words in `kind`'s chunk prompt with no content.
pub fn prompt_overhead(kind: StrategyKind) -> u32 {
    kind.prompt("").split_whitespace().count() as u32
}

/// Built-in table with small word-counted budgets for legal and general
/// documents: 100 tokens of content per chunk prompt.
pub fn small_registry() -> ModelRegistry {
    let small = |id: &str, kind: StrategyKind| {
        ModelConfig::new(id, 120 + prompt_overhead(kind), 20).with_tokenizer(TokenizerFamily::Words)
    };
    ModelRegistry::builtin()
        .with_override(
            DocumentType::LegalContract,
            small("saul-test", StrategyKind::LegalContract),
        )
        .and_then(|r| r.with_override(DocumentType::General, small("bart-test", StrategyKind::General)))
        .unwrap()
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        timeout: Duration::from_secs(5),
    }
}

pub fn service(
    backend: &Arc<ScriptedBackend>,
    registry: &ModelRegistry,
    policy: RetryPolicy,
) -> DocumentSummaryService {
    service_with(registry, SummaryEngine::new(backend.clone(), policy))
}

pub fn service_with(registry: &ModelRegistry, engine: SummaryEngine) -> DocumentSummaryService {
    DocumentSummaryService::new(SummaryStrategyFactory::new(registry, Arc::new(engine)).unwrap())
}
