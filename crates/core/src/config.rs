use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f32(profile: &str, key: &str, default: f32) -> f32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub summary: SummaryConfig,
}

/// Well-known env keys that identify a profile when prefixed.
const PROFILE_MARKER_KEYS: &[&str] = &[
    "LLM_PROVIDER",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "OLLAMA_URL",
];

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DOCSUM_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DOCSUM_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            llm: LlmConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            summary: SummaryConfig::from_env_profiled(p),
        }
    }

    /// Discover available profiles by scanning env vars for `{PREFIX}_{MARKER_KEY}` patterns.
    /// Always includes "default" (the unprefixed config).
    pub fn available_profiles() -> Vec<String> {
        let mut profiles = std::collections::BTreeSet::new();
        profiles.insert("default".to_string());

        for (key, _) in env::vars() {
            for marker in PROFILE_MARKER_KEYS {
                if let Some(prefix) = key.strip_suffix(&format!("_{}", marker)) {
                    if !prefix.is_empty()
                        && prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                    {
                        profiles.insert(prefix.to_string());
                    }
                }
            }
        }

        profiles.into_iter().collect()
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  llm:         provider={}", self.llm.provider);
        tracing::info!("  ollama:      url={}", self.ollama.url);
        tracing::info!(
            "  summary:     models={}, retries={}, timeout={}s, concurrency={}",
            self.summary
                .models_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(builtin)".to_string()),
            self.summary.max_retries,
            self.summary.call_timeout_secs,
            self.summary.max_concurrency
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "llm": {
                "provider": self.llm.provider,
                "configured": self.llm.is_configured(),
            },
            "ollama": { "url": self.ollama.url },
            "summary": {
                "models_path": self.summary.models_path,
                "max_retries": self.summary.max_retries,
                "call_timeout_secs": self.summary.call_timeout_secs,
                "max_concurrency": self.summary.max_concurrency,
                "max_reduce_depth": self.summary.max_reduce_depth,
            },
        })
    }
}

// ── LLM (OpenAI / Anthropic) ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "anthropic", "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub temperature: f32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "ollama"),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            anthropic_api_key: profiled_env_opt(p, "ANTHROPIC_API_KEY"),
            temperature: profiled_env_f32(p, "LLM_TEMPERATURE", 0.1),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "anthropic" | "claude" => self.anthropic_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
        }
    }
}

// ── Summarization ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// TOML model table; `None` uses the built-in table.
    pub models_path: Option<PathBuf>,
    /// Attempts per model call when the model cannot be loaded.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub call_timeout_secs: u64,
    /// Concurrent chunk invocations per request.
    pub max_concurrency: usize,
    pub max_reduce_depth: u32,
    /// Overlap between chunks as a fraction of the token budget.
    pub overlap_ratio: f32,
    /// Fraction of a chunk searched backwards for a paragraph/sentence break.
    pub lookback_ratio: f32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            models_path: None,
            max_retries: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
            call_timeout_secs: 120,
            max_concurrency: 4,
            max_reduce_depth: 3,
            overlap_ratio: 0.1,
            lookback_ratio: 0.25,
        }
    }
}

impl SummaryConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            models_path: profiled_env_opt(p, "SUMMARY_MODELS_PATH").map(PathBuf::from),
            max_retries: profiled_env_u32(p, "SUMMARY_MAX_RETRIES", d.max_retries).max(1),
            retry_base_delay_ms: profiled_env_u64(p, "SUMMARY_RETRY_BASE_MS", d.retry_base_delay_ms),
            retry_max_delay_ms: profiled_env_u64(p, "SUMMARY_RETRY_MAX_MS", d.retry_max_delay_ms),
            call_timeout_secs: profiled_env_u64(p, "SUMMARY_CALL_TIMEOUT_SECS", d.call_timeout_secs),
            max_concurrency: profiled_env_u32(p, "SUMMARY_MAX_CONCURRENCY", d.max_concurrency as u32)
                .max(1) as usize,
            max_reduce_depth: profiled_env_u32(p, "SUMMARY_MAX_REDUCE_DEPTH", d.max_reduce_depth),
            overlap_ratio: profiled_env_f32(p, "SUMMARY_OVERLAP_RATIO", d.overlap_ratio)
                .clamp(0.0, 0.5),
            lookback_ratio: profiled_env_f32(p, "SUMMARY_LOOKBACK_RATIO", d.lookback_ratio)
                .clamp(0.0, 1.0),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_prefix_wins_over_plain_key() {
        // Unique prefix so parallel tests never observe these vars.
        env::set_var("DSTESTPROFA_LLM_PROVIDER", "anthropic");
        env::set_var("DSTESTPROFA_ANTHROPIC_API_KEY", "sk-ant-profiled");
        env::set_var("DSTESTPROFA_SUMMARY_MAX_RETRIES", "5");
        env::set_var("DSTESTPROFA_SUMMARY_OVERLAP_RATIO", "0.9");

        let config = Config::for_profile("dstestprofa");
        assert_eq!(config.profile, "DSTESTPROFA");
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.anthropic_api_key.as_deref(), Some("sk-ant-profiled"));
        assert!(config.llm.is_configured());
        let redacted = config.redacted_summary();
        assert_eq!(redacted["llm"]["configured"], true);
        assert!(!redacted.to_string().contains("sk-ant-profiled"));
        assert_eq!(config.summary.max_retries, 5);
        assert_eq!(config.summary.overlap_ratio, 0.5);
        assert!(Config::available_profiles().contains(&"DSTESTPROFA".to_string()));
    }

    #[test]
    fn summary_defaults() {
        let d = SummaryConfig::default();
        assert_eq!(d.max_retries, 3);
        assert_eq!(d.call_timeout(), Duration::from_secs(120));
        assert_eq!(d.retry_base_delay(), Duration::from_millis(500));
        assert!(d.overlap_ratio > 0.0 && d.overlap_ratio < 1.0);
    }
}
