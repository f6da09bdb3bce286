use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Default OpenAI-compatible endpoint for the Gemini chat-completions API.
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
/// Default model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash-lite";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub server: ServerConfig,
}

/// Chat-completion provider configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider credential. `None` routes every generation to the fallback.
    pub api_key: Option<String>,
    /// Base URL, always ending in exactly one `/`.
    pub base_url: String,
    pub model: String,
    /// USD per million prompt tokens, overriding the per-model default.
    pub input_usd_per_million: Option<f64>,
    /// USD per million completion tokens, overriding the per-model default.
    pub output_usd_per_million: Option<f64>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let llm = LlmConfig {
            api_key: non_empty_var("GEMINI_API_KEY"),
            base_url: normalize_base_url(
                &non_empty_var("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            ),
            model: non_empty_var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            input_usd_per_million: parse_rate("GEMINI_INPUT_USD_PER_MILLION")?,
            output_usd_per_million: parse_rate("GEMINI_OUTPUT_USD_PER_MILLION")?,
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/planner.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let defaults = RequestConfig::default();
        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_ms),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retry_delay_ms),
        };

        let server = ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: match env::var("SERVER_PORT") {
                Ok(raw) => raw.parse().map_err(|_| AppError::Config {
                    message: format!("SERVER_PORT must be a port number, got '{}'", raw),
                })?,
                Err(_) => 3000,
            },
        };

        Ok(Config {
            llm,
            database,
            logging,
            request,
            server,
        })
    }
}

impl LlmConfig {
    /// Provider config pointing at `base_url` with the default model.
    pub fn new(api_key: Option<String>, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: normalize_base_url(base_url),
            model: DEFAULT_LLM_MODEL.to_string(),
            input_usd_per_million: None,
            output_usd_per_million: None,
        }
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override both per-million token rates
    pub fn with_rates(mut self, input: f64, output: f64) -> Self {
        self.input_usd_per_million = Some(input);
        self.output_usd_per_million = Some(output);
        self
    }

    /// Whether a credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::new(None, DEFAULT_LLM_BASE_URL)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 0,
            retry_delay_ms: 500,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Trim trailing slashes and append exactly one.
pub fn normalize_base_url(raw: &str) -> String {
    format!("{}/", raw.trim().trim_end_matches('/'))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_rate(key: &str) -> Result<Option<f64>, AppError> {
    match non_empty_var(key) {
        None => Ok(None),
        Some(raw) => match raw.parse::<f64>() {
            Ok(rate) if rate.is_finite() && rate >= 0.0 => Ok(Some(rate)),
            _ => Err(AppError::Config {
                message: format!("{} must be a non-negative number, got '{}'", key, raw),
            }),
        },
    }
}
