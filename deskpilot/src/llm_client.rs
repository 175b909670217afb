use crate::settings::ModelSettings;
use anyhow::{Context, Result};
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI-compatible client for the configured model server
pub fn create_client(settings: &ModelSettings) -> Result<Client<OpenAIConfig>> {
    let base_url = settings.base_url.trim_end_matches('/');
    let config = OpenAIConfig::new()
        .with_api_base(base_url)
        .with_api_key(settings.resolved_api_key());

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Short, readable description of a failed API call
pub fn describe_error(error: &OpenAIError, model: &str) -> String {
    if let OpenAIError::Reqwest(e) = error {
        if e.is_timeout() {
            return "Request timed out".to_string();
        }
        if e.is_connect() {
            return "Could not connect to the model server".to_string();
        }
    }

    let error_str = error.to_string();
    let lower_error = error_str.to_lowercase();

    if lower_error.contains("401")
        || lower_error.contains("unauthorized")
        || lower_error.contains("invalid_api_key")
    {
        "Invalid API key".to_string()
    } else if lower_error.contains("429")
        || lower_error.contains("rate limit")
        || lower_error.contains("too many requests")
    {
        "Rate limited - try again".to_string()
    } else if lower_error.contains("404") || lower_error.contains("not found") {
        format!("Unknown model: {}", model)
    } else if lower_error.contains("500") || lower_error.contains("503") {
        "Model server unavailable".to_string()
    } else {
        format!("API error: {}", error_str)
    }
}
