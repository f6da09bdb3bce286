//! Generation normalizer.
//!
//! Turns a [`FeatureBrief`] into stories and tasks, either from the
//! model's JSON response or from the deterministic fallback. Provider
//! failures, malformed output and under-sized results never escape
//! [`Generator::generate`]; they all select the fallback.

mod cost;
mod extract;
mod fallback;
mod normalize;
mod types;

pub use cost::*;
pub use extract::*;
pub use fallback::*;
pub use normalize::*;
pub use types::*;

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::LlmResult;
use crate::export::build_markdown;
use crate::llm::{ChatRequest, LlmClient, Message, TokenUsage};
use crate::prompts::{
    generation_user_prompt, GENERATION_MAX_TOKENS, GENERATION_SYSTEM_PROMPT,
    GENERATION_TEMPERATURE,
};

/// Produces plans for feature briefs.
#[derive(Clone)]
pub struct Generator {
    llm: LlmClient,
    rates: CostRates,
}

impl Generator {
    /// Create a generator using the given client and provider config
    pub fn new(llm: LlmClient, config: &LlmConfig) -> Self {
        Self {
            llm,
            rates: CostRates::from_config(config),
        }
    }

    /// Model name recorded on every result
    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Generate a plan for `brief`. Always returns a usable payload.
    pub async fn generate(&self, brief: &FeatureBrief) -> GenerationResult {
        let start = Instant::now();

        if !self.llm.has_credential() {
            debug!("No LLM credential configured, using fallback plan");
            return self.fallback(brief, TokenUsage::unknown(), None);
        }

        let completion = match self.request_plan(brief).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(
                    error = %e,
                    latency_ms = start.elapsed().as_millis(),
                    "LLM generation failed, using fallback tasks"
                );
                return self.fallback(brief, TokenUsage::unknown(), None);
            }
        };

        let raw = match parse_model_payload(&completion.content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "LLM output unusable, using fallback tasks");
                return self.fallback(brief, TokenUsage::unknown(), None);
            }
        };

        let usage = completion.usage;
        let estimated_cost_usd = estimate_cost_usd(self.rates, &usage);
        let (user_stories, tasks) = normalize(raw);

        if !meets_minimums(&user_stories, &tasks) {
            warn!(
                stories = user_stories.len(),
                tasks = tasks.len(),
                "LLM output below minimums, using fallback tasks"
            );
            return self.fallback(brief, usage, estimated_cost_usd);
        }

        let generated_markdown = build_markdown(brief, &user_stories, &tasks);

        info!(
            model = %self.model(),
            stories = user_stories.len(),
            tasks = tasks.len(),
            latency_ms = start.elapsed().as_millis(),
            estimated_cost_usd = ?estimated_cost_usd,
            "Plan generated from LLM output"
        );

        GenerationResult {
            payload: GeneratedPayload {
                user_stories,
                tasks,
                generated_markdown,
            },
            meta: GenerationMeta {
                model: self.model().to_string(),
                used_fallback: false,
                usage,
                estimated_cost_usd,
            },
        }
    }

    async fn request_plan(&self, brief: &FeatureBrief) -> LlmResult<crate::llm::ChatCompletion> {
        let request = ChatRequest::new(
            self.model(),
            vec![
                Message::system(GENERATION_SYSTEM_PROMPT),
                Message::user(generation_user_prompt(brief)),
            ],
        )
        .with_temperature(GENERATION_TEMPERATURE)
        .with_max_tokens(GENERATION_MAX_TOKENS);

        self.llm.complete(request).await
    }

    fn fallback(
        &self,
        brief: &FeatureBrief,
        usage: TokenUsage,
        estimated_cost_usd: Option<f64>,
    ) -> GenerationResult {
        GenerationResult {
            payload: build_fallback(brief),
            meta: GenerationMeta {
                model: self.model().to_string(),
                used_fallback: true,
                usage,
                estimated_cost_usd,
            },
        }
    }
}
