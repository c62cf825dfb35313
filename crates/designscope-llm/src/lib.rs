pub mod anthropic;
pub mod cost;
pub mod prompt;
pub mod response;
pub mod types;

pub use anthropic::{validate_api_key, AnthropicClient};
pub use cost::{CostConfig, CostEstimate, CostEstimator};
pub use prompt::{
    AnalysisType, ContentBlock, ImageSource, Priority, PromptBuilder, PromptConfig,
    PROMPT_TEMPLATE_VERSION,
};
pub use response::{complete_result, locate_json_span, parse_span, validate_response};
pub use types::*;

use async_trait::async_trait;
use designscope_common::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Single-shot request/response seam. One call per analysis; no conversation state.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, content: Vec<ContentBlock>) -> Result<LLMResponse>;

    fn model(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: CostConfig::default().max_output_tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl LLMConfig {
    /// Reads `ANTHROPIC_API_KEY` and the `DESIGNSCOPE_*` overrides. Unset values keep
    /// their defaults; set but unparsable numbers are a config error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.api_key = key;
        }
        if let Ok(model) = std::env::var("DESIGNSCOPE_MODEL") {
            config.model = model;
        }
        if let Ok(url) = std::env::var("DESIGNSCOPE_BASE_URL") {
            config.base_url = url;
        }
        if let Some(max_tokens) = env_number("DESIGNSCOPE_MAX_TOKENS")? {
            config.max_tokens = max_tokens as usize;
        }
        if let Some(secs) = env_number("DESIGNSCOPE_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn env_number(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| AnalysisError::Config(format!("{} must be a whole number, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
