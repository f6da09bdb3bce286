use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{ChatCompletion, ChatRequest, ChatResponse, LlmHealth, Message};
use crate::config::{LlmConfig, RequestConfig};
use crate::error::{LlmError, LlmResult};
use crate::prompts::{GENERATION_MAX_TOKENS, GENERATION_TEMPERATURE, PING_PROMPT};

/// Client for an OpenAI-compatible chat-completions endpoint
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    request_config: RequestConfig,
}

impl LlmClient {
    /// Create a new chat-completions client
    pub fn new(config: &LlmConfig, request_config: RequestConfig) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: crate::config::normalize_base_url(&config.base_url),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            request_config,
        })
    }

    /// Configured model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether a credential is configured
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a chat-completion request, retrying per the request config
    pub async fn complete(&self, request: ChatRequest) -> LlmResult<ChatCompletion> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingCredential)?;
        let url = format!("{}chat/completions", self.base_url);

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = backoff_delay(self.request_config.retry_delay_ms, retries);
                warn!(
                    model = %request.model,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying chat completion"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, api_key, &request).await {
                Ok(completion) => {
                    info!(
                        model = %request.model,
                        latency_ms = start.elapsed().as_millis(),
                        prompt_tokens = ?completion.usage.prompt_tokens,
                        completion_tokens = ?completion.usage.completion_tokens,
                        "Chat completion succeeded"
                    );
                    return Ok(completion);
                }
                Err(e) => {
                    error!(
                        model = %request.model,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Chat completion failed"
                    );
                    // Client-side errors will not improve on retry.
                    if matches!(e, LlmError::Api { status, .. } if (400..500).contains(&status) && status != 429)
                    {
                        return Err(e);
                    }
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        match last_error {
            Some(e) if self.request_config.max_retries == 0 => Err(e),
            last => Err(LlmError::Unavailable {
                message: last
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "Unknown error".to_string()),
                retries: retries.saturating_sub(1),
            }),
        }
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest,
    ) -> LlmResult<ChatCompletion> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Calling chat completions"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: if error_body.is_empty() {
                    "No error body returned.".to_string()
                } else {
                    error_body
                },
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })?;

        let content = body
            .first_content()
            .ok_or(LlmError::EmptyResponse)?
            .to_string();

        Ok(ChatCompletion {
            content,
            usage: body.usage.into(),
        })
    }

    /// One minimal completion to report whether the model is reachable
    pub async fn ping(&self) -> LlmHealth {
        if !self.has_credential() {
            return LlmHealth::MissingConfig;
        }

        let request = ChatRequest::new(&self.model, vec![Message::user(PING_PROMPT)])
            .with_temperature(GENERATION_TEMPERATURE)
            .with_max_tokens(GENERATION_MAX_TOKENS);
        match self.complete(request).await {
            Ok(_) => LlmHealth::Ok,
            Err(e) => {
                warn!(error = %e, "LLM health check failed");
                LlmHealth::Degraded
            }
        }
    }
}

/// Exponential backoff before retry number `retry` (1-based), saturating
/// instead of overflowing for large retry counts.
fn backoff_delay(base_ms: u64, retry: u32) -> Duration {
    let factor = 2_u64.checked_pow(retry.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}
