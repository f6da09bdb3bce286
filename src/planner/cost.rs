use crate::config::LlmConfig;
use crate::llm::TokenUsage;

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostRates {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl CostRates {
    /// Default rates by model family; the "flash-lite" tier is cheaper.
    pub fn default_for_model(model: &str) -> Self {
        if model.contains("flash-lite") {
            Self {
                input_per_million: 0.1,
                output_per_million: 0.4,
            }
        } else {
            Self {
                input_per_million: 0.3,
                output_per_million: 1.0,
            }
        }
    }

    /// Defaults for the configured model with any configured overrides applied.
    pub fn from_config(config: &LlmConfig) -> Self {
        let defaults = Self::default_for_model(&config.model);
        Self {
            input_per_million: config
                .input_usd_per_million
                .unwrap_or(defaults.input_per_million),
            output_per_million: config
                .output_usd_per_million
                .unwrap_or(defaults.output_per_million),
        }
    }
}

/// Estimated spend for a completion, rounded to 8 decimals.
///
/// `None` when the provider reported neither prompt nor completion tokens.
pub fn estimate_cost_usd(rates: CostRates, usage: &TokenUsage) -> Option<f64> {
    if usage.is_unknown() {
        return None;
    }

    let input = usage.prompt_tokens.unwrap_or(0) as f64;
    let output = usage.completion_tokens.unwrap_or(0) as f64;
    let cost = (input / 1_000_000.0) * rates.input_per_million
        + (output / 1_000_000.0) * rates.output_per_million;

    Some((cost * 1e8).round() / 1e8)
}
