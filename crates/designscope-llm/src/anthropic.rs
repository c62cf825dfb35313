use crate::{ContentBlock, LLMConfig, LLMProvider, LLMResponse, Usage};
use async_trait::async_trait;
use designscope_common::{AnalysisError, Result};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info, warn};

const API_VERSION: &str = "2023-06-01";
const KEY_PREFIX: &str = "sk-ant-";

/// Format check only: the `sk-ant-` prefix and more than 20 characters overall.
/// Says nothing about whether the key is live.
pub fn validate_api_key(key: &str) -> bool {
    key.starts_with(KEY_PREFIX) && key.chars().count() > 20
}

pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: usize,
    base_url: String,
}

impl AnthropicClient {
    /// Rejects a malformed credential here, before any request can be made.
    pub fn new(config: LLMConfig) -> Result<Self> {
        if !validate_api_key(&config.api_key) {
            return Err(AnalysisError::InvalidCredential);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key,
            model: config.model,
            max_tokens: config.max_tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(LLMConfig::from_env()?)
    }

    fn request_body(&self, content: &[ContentBlock]) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": content,
            }],
        })
    }
}

#[async_trait]
impl LLMProvider for AnthropicClient {
    async fn generate(&self, content: Vec<ContentBlock>) -> Result<LLMResponse> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.request_body(&content);
        debug!("POST {} with {} content blocks, model {}", url, content.len(), self.model);

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Messages API returned {} after {:?}", status, start.elapsed());
            return Err(AnalysisError::Network {
                status: Some(status.as_u16()),
                reason: error_reason(status, &error_text),
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::network(format!("unreadable response body: {}", e)))?;
        info!("Messages API call succeeded in {:?}", start.elapsed());

        Ok(parse_message(&json))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Prefers the API's own error message; falls back to the status reason phrase.
fn error_reason(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

fn parse_message(json: &Value) -> LLMResponse {
    let content = json["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b["type"] == "text")
                .filter_map(|b| b["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let usage = json["usage"].as_object().map(|u| {
        let prompt_tokens = u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0) as usize;
        let completion_tokens = u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0) as usize;
        Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    });

    LLMResponse {
        content,
        finish_reason: json["stop_reason"].as_str().map(|s| s.to_string()),
        usage,
    }
}
