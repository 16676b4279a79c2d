//! LLM enrichment: the only place the pipeline talks to a provider.
//!
//! An [`Enricher`] owns a provider handle plus the sampling settings taken
//! from configuration. Every call is bounded by a timeout, and every failure
//! comes back as an [`AdapterError`]; deciding whether that degrades or
//! fails the session is the processor's job.

pub mod prompt;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use sessiondigest_config::{AppConfig, EnrichmentMode};
use sessiondigest_core::error::AdapterError;
use sessiondigest_core::provider::{Provider, ProviderRequest, ResponseFormat};
use sessiondigest_core::record::CompletionResult;
use tracing::{debug, warn};

pub use prompt::PromptContext;

/// Calls the configured provider and turns replies into [`CompletionResult`]s.
pub struct Enricher {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    seed: Option<u64>,
    mode: EnrichmentMode,
    timeout: Duration,
}

impl Enricher {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 2000,
            seed: None,
            mode: EnrichmentMode::default(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Build an enricher with the sampling settings from `config`.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self {
            provider,
            model: config.model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            seed: config.seed,
            mode: config.enrichment_mode,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    pub fn with_mode(mut self, mode: EnrichmentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn mode(&self) -> EnrichmentMode {
        self.mode
    }

    /// Run one enrichment call for `ctx`.
    pub async fn complete(&self, ctx: &PromptContext<'_>) -> Result<CompletionResult, AdapterError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: prompt::build_messages(ctx, self.mode),
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            seed: self.seed,
            response_format: match self.mode {
                EnrichmentMode::Structured => ResponseFormat::JsonObject,
                EnrichmentMode::Text => ResponseFormat::Text,
            },
        };

        debug!(
            provider = %self.provider.name(),
            model = %self.model,
            mode = ?self.mode,
            "Requesting enrichment"
        );

        let response = match tokio::time::timeout(self.timeout, self.provider.complete(request)).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(provider = %self.provider.name(), secs = self.timeout.as_secs(), "Enrichment timed out");
                return Err(AdapterError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        match self.mode {
            EnrichmentMode::Structured => {
                let payload = response::parse_structured(&response.content)?;
                Ok(CompletionResult::Structured { payload })
            }
            EnrichmentMode::Text => {
                let text = response::collapse_whitespace(response::strip_code_fence(&response.content));
                if text.is_empty() {
                    return Err(AdapterError::MalformedPayload("empty reply".into()));
                }
                Ok(CompletionResult::Text { text })
            }
        }
    }
}
