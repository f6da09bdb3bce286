//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads a .env
//! file via dotenvy, so these tests set every variable they assert on.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use feature_planner::config::{Config, LogFormat, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
use serial_test::serial;
use std::env;

#[test]
#[serial]
fn test_config_from_env_loads_without_credential() {
    env::remove_var("GEMINI_API_KEY");
    env::remove_var("GEMINI_BASE_URL");
    env::remove_var("GEMINI_MODEL");

    let config = Config::from_env().expect("config should load without a key");
    if env::var("GEMINI_API_KEY").is_err() {
        assert!(!config.llm.has_credential());
    }
    assert!(config.llm.base_url.ends_with('/'));
}

#[test]
#[serial]
fn test_config_from_env_llm_settings() {
    env::set_var("GEMINI_API_KEY", "  test-key  ");
    env::set_var("GEMINI_BASE_URL", "http://localhost:9999/v1//");
    env::set_var("GEMINI_MODEL", "gemini-2.5-pro");

    let config = Config::from_env().unwrap();
    assert_eq!(config.llm.api_key.as_deref(), Some("test-key"));
    assert_eq!(config.llm.base_url, "http://localhost:9999/v1/");
    assert_eq!(config.llm.model, "gemini-2.5-pro");

    // Restore defaults
    env::remove_var("GEMINI_API_KEY");
    env::set_var("GEMINI_BASE_URL", DEFAULT_LLM_BASE_URL);
    env::set_var("GEMINI_MODEL", DEFAULT_LLM_MODEL);
}

#[test]
#[serial]
fn test_config_blank_api_key_is_absent() {
    env::set_var("GEMINI_API_KEY", "   ");

    let config = Config::from_env().unwrap();
    assert!(config.llm.api_key.is_none());

    env::remove_var("GEMINI_API_KEY");
}

#[test]
#[serial]
fn test_config_from_env_rate_overrides() {
    env::set_var("GEMINI_INPUT_USD_PER_MILLION", "1.25");
    env::set_var("GEMINI_OUTPUT_USD_PER_MILLION", "10");

    let config = Config::from_env().unwrap();
    assert_eq!(config.llm.input_usd_per_million, Some(1.25));
    assert_eq!(config.llm.output_usd_per_million, Some(10.0));

    env::remove_var("GEMINI_INPUT_USD_PER_MILLION");
    env::remove_var("GEMINI_OUTPUT_USD_PER_MILLION");
}

#[test]
#[serial]
fn test_config_invalid_rate_is_error() {
    env::set_var("GEMINI_INPUT_USD_PER_MILLION", "cheap");

    let result = Config::from_env();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("GEMINI_INPUT_USD_PER_MILLION"));

    env::remove_var("GEMINI_INPUT_USD_PER_MILLION");
}

#[test]
#[serial]
fn test_config_from_env_custom_database() {
    env::set_var("DATABASE_PATH", "/custom/path.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "10");

    let config = Config::from_env().unwrap();
    assert_eq!(config.database.path.to_str().unwrap(), "/custom/path.db");
    assert_eq!(config.database.max_connections, 10);

    // Restore defaults
    env::set_var("DATABASE_PATH", "./data/planner.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "5");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    env::set_var("LOG_FORMAT", "JSON");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    // Restore default
    env::set_var("LOG_FORMAT", "pretty");
}

#[test]
#[serial]
fn test_config_from_env_log_level() {
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.level, "debug");

    env::set_var("LOG_LEVEL", "info");
}

#[test]
#[serial]
fn test_config_from_env_custom_request() {
    env::set_var("REQUEST_TIMEOUT_MS", "60000");
    env::set_var("MAX_RETRIES", "2");
    env::set_var("RETRY_DELAY_MS", "250");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 60000);
    assert_eq!(config.request.max_retries, 2);
    assert_eq!(config.request.retry_delay_ms, 250);

    // Restore defaults
    env::set_var("REQUEST_TIMEOUT_MS", "30000");
    env::set_var("MAX_RETRIES", "0");
    env::set_var("RETRY_DELAY_MS", "500");
}

#[test]
#[serial]
fn test_config_invalid_number_uses_default() {
    env::set_var("DATABASE_MAX_CONNECTIONS", "not-a-number");

    let config = Config::from_env().unwrap();
    // Should fall back to default
    assert_eq!(config.database.max_connections, 5);

    // Restore default
    env::set_var("DATABASE_MAX_CONNECTIONS", "5");
}

#[test]
#[serial]
fn test_config_from_env_server() {
    env::set_var("SERVER_HOST", "0.0.0.0");
    env::set_var("SERVER_PORT", "8088");

    let config = Config::from_env().unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8088);

    env::set_var("SERVER_HOST", "127.0.0.1");
    env::set_var("SERVER_PORT", "3000");
}

#[test]
#[serial]
fn test_config_invalid_port_is_error() {
    env::set_var("SERVER_PORT", "http");

    let result = Config::from_env();
    assert!(result.is_err());

    env::set_var("SERVER_PORT", "3000");
}
