//! Shared summarization machinery: budget checks, map over chunks, reduce,
//! and per-call retry/timeout handling.

use std::sync::Arc;
use std::time::Duration;

use docsum_chunker::ChunkingService;
use docsum_core::config::SummaryConfig;
use docsum_core::ModelConfig;
use docsum_llm::{LlmError, LlmErrorKind, LlmProvider};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use super::kind::StrategyKind;
use super::StrategyOutput;
use crate::error::StrategyError;
use crate::types::RequestPhase;

/// Retry and timeout settings for one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts for model-load failures, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Bound on a single backend call. Expiry counts as a model-load failure.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SummaryConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: config.retry_base_delay(),
            max_delay: config.retry_max_delay(),
            timeout: config.call_timeout(),
        }
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based):
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// A finished prompt and the text it wraps.
struct Call {
    index: usize,
    prompt: String,
    source: String,
    /// Prompt size under the strategy's counter.
    tokens: usize,
}

/// Tokens left for source text once `template` (a prompt with empty
/// content) is counted.
fn content_budget(
    chunker: &ChunkingService,
    config: &ModelConfig,
    template: &str,
) -> Result<usize, StrategyError> {
    let limit = config.token_budget() as usize;
    let overhead = chunker.count_tokens(template);
    match limit.checked_sub(overhead) {
        Some(budget) if budget > 0 => Ok(budget),
        _ => Err(StrategyError::TokenLimitExceeded {
            model: config.model_id.clone(),
            tokens: overhead,
            budget: limit,
        }),
    }
}

/// Count a finished prompt against the model's input budget.
fn prepare(
    chunker: &ChunkingService,
    config: &ModelConfig,
    index: usize,
    source: String,
    prompt: String,
) -> Result<Call, StrategyError> {
    let tokens = chunker.count_tokens(&prompt);
    let limit = config.token_budget() as usize;
    if tokens > limit {
        return Err(StrategyError::TokenLimitExceeded {
            model: config.model_id.clone(),
            tokens,
            budget: limit,
        });
    }
    Ok(Call {
        index,
        prompt,
        source,
        tokens,
    })
}

/// Executes summarization for every strategy.
///
/// Holds the inference backend and the limits shared by all strategies;
/// the per-type parts come from [`StrategyKind`] and the model config.
pub struct SummaryEngine {
    backend: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    max_concurrency: usize,
    max_reduce_depth: u32,
    overlap_ratio: f32,
}

impl SummaryEngine {
    pub fn new(backend: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            max_concurrency: 4,
            max_reduce_depth: 3,
            overlap_ratio: 0.1,
        }
    }

    pub fn from_config(backend: Arc<dyn LlmProvider>, config: &SummaryConfig) -> Self {
        Self::new(backend, RetryPolicy::from_config(config))
            .with_max_concurrency(config.max_concurrency)
            .with_max_reduce_depth(config.max_reduce_depth)
            .with_overlap_ratio(config.overlap_ratio)
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    pub fn with_max_reduce_depth(mut self, depth: u32) -> Self {
        self.max_reduce_depth = depth.max(1);
        self
    }

    pub fn with_overlap_ratio(mut self, ratio: f32) -> Self {
        self.overlap_ratio = ratio.clamp(0.0, 0.5);
        self
    }

    /// Overlap for a chunk budget; always below the budget.
    fn overlap_for(&self, budget: usize) -> usize {
        ((budget as f32 * self.overlap_ratio) as usize).min(budget.saturating_sub(1))
    }

    /// Summarize `content` with `kind`'s prompts under `config`.
    ///
    /// Every prompt sent, template included, fits the model's input budget
    /// (`max_input_tokens - reserved_output_tokens`) under `chunker`'s counter.
    pub async fn run(
        &self,
        kind: StrategyKind,
        config: &ModelConfig,
        chunker: &ChunkingService,
        content: &str,
    ) -> Result<StrategyOutput, StrategyError> {
        let max_output = kind.max_output_tokens(config);
        let token_count = chunker.count_tokens(content);
        let budget = content_budget(chunker, config, &kind.prompt(""))?;
        let mut warnings = Vec::new();

        if token_count <= budget {
            debug!(
                strategy = kind.name(),
                phase = %RequestPhase::Invoking,
                tokens = token_count,
                budget,
                "content fits one call"
            );
            let call = prepare(chunker, config, 0, content.to_string(), kind.prompt(content))?;
            let text = self.invoke(kind, config, &call, max_output, &mut warnings).await?;
            return Ok(StrategyOutput {
                summary: kind.finish(text, content),
                chunk_count: 1,
                reduce_passes: 0,
                token_count,
                model_used: config.model_id.clone(),
                warnings,
            });
        }

        let calls = self.split(chunker, config, content, budget, |text| kind.prompt(text))?;
        let chunk_count = calls.len();
        info!(
            strategy = kind.name(),
            phase = %RequestPhase::Chunking,
            model = %config.model_id,
            tokens = token_count,
            budget,
            chunks = chunk_count,
            "content exceeds budget, chunking"
        );

        debug!(phase = %RequestPhase::Invoking, calls = chunk_count, "summarizing chunks");
        let mut partials = self.map(kind, config, calls, max_output, &mut warnings).await?;

        let reduce_budget = content_budget(chunker, config, &kind.reduce_prompt(""))?;
        let mut passes = 0u32;
        let summary = loop {
            passes += 1;
            if passes > self.max_reduce_depth {
                warn!(
                    strategy = kind.name(),
                    depth = self.max_reduce_depth,
                    "reduce depth exhausted"
                );
                return Err(StrategyError::ReduceDepthExceeded {
                    depth: self.max_reduce_depth,
                });
            }

            let combined = partials.join("\n\n");
            let combined_tokens = chunker.count_tokens(&combined);
            if combined_tokens <= reduce_budget {
                debug!(
                    phase = %RequestPhase::Reducing,
                    pass = passes,
                    tokens = combined_tokens,
                    "final reduce pass"
                );
                let prompt = kind.reduce_prompt(&combined);
                let call = prepare(chunker, config, 0, combined, prompt)?;
                break self.invoke(kind, config, &call, max_output, &mut warnings).await?;
            }

            let calls = self.split(chunker, config, &combined, reduce_budget, |text| {
                kind.reduce_prompt(text)
            })?;
            debug!(
                phase = %RequestPhase::Reducing,
                pass = passes,
                tokens = combined_tokens,
                chunks = calls.len(),
                "partial summaries exceed budget, reducing in chunks"
            );
            partials = self.map(kind, config, calls, max_output, &mut warnings).await?;
        };

        Ok(StrategyOutput {
            summary: kind.finish(summary, content),
            chunk_count,
            reduce_passes: passes,
            token_count,
            model_used: config.model_id.clone(),
            warnings,
        })
    }

    /// Chunk `text` to `budget` tokens and wrap each chunk with `prompt`.
    /// Fails before any model call when a wrapped chunk does not fit.
    fn split(
        &self,
        chunker: &ChunkingService,
        config: &ModelConfig,
        text: &str,
        budget: usize,
        prompt: impl Fn(&str) -> String,
    ) -> Result<Vec<Call>, StrategyError> {
        chunker
            .split(text, budget, self.overlap_for(budget))
            .map_err(StrategyError::InvalidChunkParameters)?
            .map(|chunk| {
                let wrapped = prompt(&chunk.text);
                prepare(chunker, config, chunk.index, chunk.text, wrapped)
            })
            .collect()
    }

    /// Run every call, at most `max_concurrency` at a time. Results come
    /// back in chunk order regardless of completion order. The first failure
    /// drops the calls still in flight.
    async fn map(
        &self,
        kind: StrategyKind,
        config: &ModelConfig,
        calls: Vec<Call>,
        max_output: u32,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<String>, StrategyError> {
        let mut results: Vec<(usize, String, Vec<String>)> = stream::iter(calls)
            .map(|call| async move {
                let mut call_warnings = Vec::new();
                let text = self
                    .invoke(kind, config, &call, max_output, &mut call_warnings)
                    .await?;
                Ok::<_, StrategyError>((call.index, text, call_warnings))
            })
            .buffer_unordered(self.max_concurrency)
            .try_collect()
            .await?;

        results.sort_by_key(|(index, _, _)| *index);
        let mut partials = Vec::with_capacity(results.len());
        for (_, text, call_warnings) in results {
            warnings.extend(call_warnings);
            partials.push(text);
        }
        Ok(partials)
    }

    /// One model call with retries.
    async fn invoke(
        &self,
        kind: StrategyKind,
        config: &ModelConfig,
        call: &Call,
        max_output: u32,
        warnings: &mut Vec<String>,
    ) -> Result<String, StrategyError> {
        let Call {
            prompt,
            source,
            tokens,
            ..
        } = call;
        let tokens = *tokens;
        let model = config.model_id.as_str();
        let budget = config.token_budget() as usize;
        let mut load_attempts = 0u32;
        let mut regenerated = false;

        loop {
            let request = self.backend.generate(model, prompt, max_output);
            let outcome = match tokio::time::timeout(self.retry.timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(LlmError::ModelUnavailable(format!(
                    "no response within {}s",
                    self.retry.timeout.as_secs_f32()
                ))),
            };

            let failure = match outcome {
                Ok(raw) => {
                    let text = kind.clean(&raw, source);
                    if !text.is_empty() {
                        return Ok(text);
                    }
                    if regenerated {
                        return Err(StrategyError::SummaryGeneration {
                            model: model.to_string(),
                            reason: "model returned empty output twice".into(),
                        });
                    }
                    warn!(model, "empty model output, retrying once");
                    warnings.push(format!("model '{model}' returned empty output; retried once"));
                    regenerated = true;
                    continue;
                }
                Err(e) => e,
            };

            match failure.kind() {
                LlmErrorKind::Unavailable => {
                    load_attempts += 1;
                    if load_attempts >= self.retry.max_attempts {
                        warn!(model, attempts = load_attempts, error = %failure, "model load retries exhausted");
                        return Err(StrategyError::ModelLoad {
                            model: model.to_string(),
                            attempts: load_attempts,
                            source: failure,
                        });
                    }
                    let delay = self.retry.backoff(load_attempts);
                    warn!(
                        model,
                        attempt = load_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "model unavailable, backing off"
                    );
                    warnings.push(format!(
                        "model '{model}' unavailable on attempt {load_attempts}: {failure}"
                    ));
                    tokio::time::sleep(delay).await;
                }
                LlmErrorKind::ContextOverflow => {
                    warn!(model, tokens, budget, error = %failure, "backend rejected input size");
                    return Err(StrategyError::TokenLimitExceeded {
                        model: model.to_string(),
                        tokens,
                        budget,
                    });
                }
                LlmErrorKind::BadOutput if !regenerated => {
                    warn!(model, error = %failure, "unusable model output, retrying once");
                    warnings.push(format!("model '{model}' returned unusable output; retried once"));
                    regenerated = true;
                }
                LlmErrorKind::BadOutput | LlmErrorKind::Rejected => {
                    return Err(StrategyError::SummaryGeneration {
                        model: model.to_string(),
                        reason: failure.to_string(),
                    });
                }
                LlmErrorKind::Misconfigured => {
                    return Err(StrategyError::ModelLoad {
                        model: model.to_string(),
                        attempts: load_attempts + 1,
                        source: failure,
                    });
                }
            }
        }
    }
}
