use crate::Usage;
use designscope_common::{AnalysisError, Result};
use designscope_core::AnalysisPayload;
use serde::{Deserialize, Serialize};

/// Pricing and sizing knobs for estimates. Rates are per token.
#[derive(Debug, Clone, PartialEq)]
pub struct CostConfig {
    /// Tokens assumed for the fixed instruction template around the payload.
    pub prompt_overhead_tokens: usize,
    /// Cap on generated tokens; also sent as `max_tokens`.
    pub max_output_tokens: usize,
    /// Flat charge per attached snapshot.
    pub tokens_per_image: usize,
    pub input_cost_per_token: f64,
    pub output_cost_per_token: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            prompt_overhead_tokens: 2000,
            max_output_tokens: 4096,
            tokens_per_image: 1600,
            input_cost_per_token: 3.0 / 1_000_000.0,
            output_cost_per_token: 15.0 / 1_000_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub estimated_cost: f64,
}

/// Rough token and price figures for display. Never used to refuse a request.
pub struct CostEstimator {
    config: CostConfig,
}

impl CostEstimator {
    pub fn new(config: CostConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    /// Estimate from the size of an already-serialized payload (~4 bytes per token).
    pub fn estimate_serialized(&self, serialized: &str) -> CostEstimate {
        let input_tokens = serialized.len().div_ceil(4) + self.config.prompt_overhead_tokens;
        self.price(input_tokens, self.config.max_output_tokens)
    }

    /// Sized from the structured text the prompt embeds, plus a flat charge for
    /// each snapshot that survives the `max_images` cap.
    pub fn estimate(&self, payload: &AnalysisPayload, max_images: usize) -> Result<CostEstimate> {
        let structured = payload
            .to_structured_text()
            .map_err(|e| AnalysisError::Config(format!("payload is not serializable: {}", e)))?;
        let attached = payload.images.as_ref().map_or(0, |images| images.len().min(max_images));

        let mut estimate = self.estimate_serialized(&structured);
        estimate.input_tokens += attached * self.config.tokens_per_image;
        Ok(self.price(estimate.input_tokens, estimate.output_tokens))
    }

    /// Cost of a finished call from the usage the endpoint reported.
    pub fn actual(&self, usage: &Usage) -> CostEstimate {
        self.price(usage.prompt_tokens, usage.completion_tokens)
    }

    fn price(&self, input_tokens: usize, output_tokens: usize) -> CostEstimate {
        CostEstimate {
            input_tokens,
            output_tokens,
            estimated_cost: input_tokens as f64 * self.config.input_cost_per_token
                + output_tokens as f64 * self.config.output_cost_per_token,
        }
    }
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::new(CostConfig::default())
    }
}
