//! Generative-text seam: the only place the pipeline talks to a model.
//!
//! Stages never hold a provider. They call [`ServiceClient::call`], which
//! wraps a [`TextGenerator`] with a per-call timeout and retry. The default
//! generator forwards to an `edgequake_llm` provider; tests and custom
//! backends plug in their own implementation through
//! [`crate::config::GenerationConfigBuilder::generator`].
//!
//! ## Retry Strategy
//!
//! Timeouts and backend errors are retried `max_retries` times (default 1)
//! with exponential backoff (`retry_backoff_ms * 2^(attempt-1)`). After the
//! last attempt the failure surfaces as [`DeckError::GenerationFailed`].

use crate::config::GenerationConfig;
use crate::error::DeckError;
use crate::pipeline::Stage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// One prompt/response round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// A model's answer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Failure of a single generator call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("no response within {0}s")]
    Timeout(u64),
    #[error("{0}")]
    Backend(String),
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: &GenerationRequest) -> Result<Completion, ServiceError>;
}

/// [`TextGenerator`] backed by an `edgequake_llm` chat provider.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<Completion, ServiceError> {
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.user.as_str()),
        ];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ServiceError::Backend(e.to_string()))?;
        Ok(Completion {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Per-request wrapper adding timeout, retry and call accounting.
pub struct ServiceClient<'a> {
    generator: Arc<dyn TextGenerator>,
    config: &'a GenerationConfig,
    calls: AtomicU32,
    retries: AtomicU32,
}

impl<'a> ServiceClient<'a> {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &'a GenerationConfig) -> Self {
        Self {
            generator,
            config,
            calls: AtomicU32::new(0),
            retries: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        self.config
    }

    /// Successful calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Retries so far.
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Send one prompt, retrying transient failures.
    pub async fn call(
        &self,
        stage: Stage,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, DeckError> {
        let request = GenerationRequest {
            system: system.to_string(),
            user: user.to_string(),
            temperature,
            max_tokens: self.config.max_tokens,
        };
        let limit = Duration::from_secs(self.config.api_timeout_secs);
        let start = Instant::now();
        let mut last_err = String::from("Unknown error");

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.config.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    stage, attempt, self.config.max_retries, backoff
                );
                self.retries.fetch_add(1, Ordering::Relaxed);
                sleep(Duration::from_millis(backoff)).await;
            }

            let outcome = match timeout(limit, self.generator.complete(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout(self.config.api_timeout_secs)),
            };

            match outcome {
                Ok(completion) => {
                    self.calls.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "{}: {} input tokens, {} output tokens, {:?}",
                        stage,
                        completion.input_tokens,
                        completion.output_tokens,
                        start.elapsed()
                    );
                    return Ok(completion.content);
                }
                Err(e) => {
                    warn!("{}: attempt {} failed: {}", stage, attempt + 1, e);
                    last_err = e.to_string();
                }
            }
        }

        Err(DeckError::GenerationFailed {
            stage,
            attempts: self.config.max_retries + 1,
            detail: last_err,
        })
    }
}

// ── JSON decoding ────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*\n(.*?)\n?```\s*$").unwrap());

/// Decode a JSON object from a model response.
///
/// Strips code fences and any prose around the outermost `{ … }`.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let trimmed = raw.trim();
    let body = match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).trim(),
        None => trimmed,
    };
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if end > start => &body[start..=end],
        _ => return Err("response contains no JSON object".into()),
    };
    serde_json::from_str(json).map_err(|e| e.to_string())
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DeckError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DeckError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the text generator, from most-specific to least-specific:
///
/// 1. `config.generator`
/// 2. `config.provider`
/// 3. `config.provider_name` (+ `config.model`)
/// 4. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`
/// 5. `OPENAI_API_KEY`
/// 6. `ProviderFactory::from_env`
pub fn resolve_generator(config: &GenerationConfig) -> Result<Arc<dyn TextGenerator>, DeckError> {
    if let Some(ref generator) = config.generator {
        return Ok(Arc::clone(generator));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmGenerator::new(provider)))
}

fn resolve_provider(config: &GenerationConfig) -> Result<Arc<dyn LLMProvider>, DeckError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DeckError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
