use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use synapse_common::{Result, SynapseError};
use tracing::debug;

use crate::anthropic::AnthropicClient;
use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::gemini::GeminiClient;
use crate::openai::OpenAiClient;

/// Provider name that selects the built-in rule-based planner instead of a
/// reasoning service.
pub const KEYWORD_PROVIDER: &str = "keyword";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "keyword", "openai", "anthropic" or "gemini"
    pub provider: String,

    pub model: String,

    /// API key. When absent, read from OPENAI_API_KEY, ANTHROPIC_API_KEY or
    /// GOOGLE_API_KEY depending on the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Endpoint override (OpenAI-compatible servers, Gemini proxies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrent() -> usize {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: KEYWORD_PROVIDER.into(),
            model: "rules".into(),
            api_key: None,
            api_url: None,
            temperature: Some(0.0),
            max_tokens: None,
            timeout_ms: default_timeout_ms(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl LlmConfig {
    pub fn is_keyword(&self) -> bool {
        self.provider == KEYWORD_PROVIDER
    }

    /// Resolve the API key from config or the provider's environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }

        let env_var = match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY",
            "anthropic" => "ANTHROPIC_API_KEY",
            "gemini" => "GOOGLE_API_KEY",
            _ => return None,
        };

        std::env::var(env_var).ok().filter(|k| !k.is_empty())
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Caps the number of in-flight requests to the wrapped client.
pub struct SemaphoredClient {
    inner: Arc<dyn LlmClient>,
    semaphore: Arc<tokio::sync::Semaphore>,
}

impl SemaphoredClient {
    pub fn new(inner: Arc<dyn LlmClient>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl LlmClient for SemaphoredClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| SynapseError::Reasoning(format!("Semaphore acquire failed: {e}")))?;
        debug!(model = %self.inner.model_name(), json_mode = request.json_mode, "Sending reasoning request");
        self.inner.complete(request).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Build the reasoning client for a configured provider.
///
/// The keyword provider has no client; callers check [`LlmConfig::is_keyword`]
/// first.
pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let base_client: Arc<dyn LlmClient> = match config.provider.as_str() {
        "openai" => Arc::new(OpenAiClient::new(
            config.api_url.clone(),
            config.model.clone(),
            config.resolve_api_key(),
            config.timeout(),
        )?),
        "anthropic" => {
            let api_key = config.resolve_api_key().ok_or_else(|| {
                SynapseError::Config("Anthropic requires an API key".to_string())
            })?;
            Arc::new(AnthropicClient::new(
                config.model.clone(),
                api_key,
                config.timeout(),
            )?)
        }
        "gemini" => {
            let api_key = config
                .resolve_api_key()
                .ok_or_else(|| SynapseError::Config("Gemini requires an API key".to_string()))?;
            Arc::new(GeminiClient::new(
                config.api_url.clone(),
                config.model.clone(),
                api_key,
                config.timeout(),
            )?)
        }
        KEYWORD_PROVIDER => {
            return Err(SynapseError::Config(
                "The keyword provider has no reasoning client".to_string(),
            ));
        }
        other => {
            return Err(SynapseError::Config(format!(
                "Unknown LLM provider: {other}"
            )));
        }
    };

    Ok(Arc::new(SemaphoredClient::new(
        base_client,
        config.max_concurrent_requests,
    )))
}
