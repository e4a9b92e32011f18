//! Configuration management for the signal engine.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required. API key for the bundled OpenRouter provider.
//! - `DEFAULT_MODEL` - Optional. The default LLM model to use. Defaults to `openai/gpt-4o-mini`.
//! - `PROVIDER_TIMEOUT_SECS` - Optional. Upper bound for a single provider call.
//! - `PROVIDER_MAX_RETRIES` - Optional. Retries for transient provider errors. Defaults to `3`.
//! - `LLM_TEMPERATURE` - Optional. Sampling temperature.

use std::str::FromStr;

use thiserror::Error;

use crate::llm::LlmOptions;

const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key
    pub api_key: String,

    /// Default LLM model identifier (OpenRouter format)
    pub default_model: String,

    /// Upper bound for a single provider call
    pub timeout_secs: Option<u64>,

    /// Retries for transient provider errors
    pub max_retries: u32,

    /// Sampling temperature
    pub temperature: Option<f64>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not set,
    /// and `ConfigError::InvalidValue` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("OPENROUTER_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let default_model = lookup("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key,
            default_model,
            timeout_secs: parse_var(&lookup, "PROVIDER_TIMEOUT_SECS")?,
            max_retries: parse_var(&lookup, "PROVIDER_MAX_RETRIES")?.unwrap_or(3),
            temperature: parse_var(&lookup, "LLM_TEMPERATURE")?,
        })
    }

    /// LLM options to place into an agent context.
    pub fn llm_options(&self) -> LlmOptions {
        LlmOptions {
            model: Some(self.default_model.clone()),
            temperature: self.temperature,
            timeout_secs: self.timeout_secs,
            ..LlmOptions::default()
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))
        })
        .transpose()
}
