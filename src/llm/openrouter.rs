//! OpenRouter-backed capability provider with automatic retry for transient errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};

use super::error::{ProviderError, ProviderErrorKind};
use super::{CapabilityProvider, ProviderOptions, ProviderResponse, ToolDescriptor};
use crate::config::Config;
use crate::signal::{SchemaId, Signal};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retry policy for transient provider errors.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Maximum total time to spend retrying
    pub max_retry_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_retry_duration: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    /// How long to wait before retry number `attempt + 1`, or `None` to give up.
    ///
    /// Honors the provider's `Retry-After`; otherwise backs off exponentially
    /// from 5s for rate limits and 2s for everything else. Never sleeps past
    /// `max_retry_duration` measured from the first attempt.
    fn delay_for(&self, error: &ProviderError, attempt: u32, elapsed: Duration) -> Option<Duration> {
        if !error.kind.is_transient() || attempt >= self.max_retries {
            return None;
        }

        let backoff = error.retry_after.unwrap_or_else(|| {
            let base: u64 = match error.kind {
                ProviderErrorKind::RateLimited => 5,
                _ => 2,
            };
            Duration::from_secs(2u64.saturating_pow(attempt).saturating_mul(base))
        });

        let delay = backoff
            .min(MAX_BACKOFF)
            .min(self.max_retry_duration.saturating_sub(elapsed));
        (!delay.is_zero()).then_some(delay)
    }
}

/// OpenRouter API client with automatic retry for transient errors.
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    default_model: String,
    retry_config: RetryConfig,
}

impl OpenRouterProvider {
    /// Create a new provider with default retry configuration.
    pub fn new(api_key: String, default_model: String) -> Self {
        Self::with_retry_config(api_key, default_model, RetryConfig::default())
    }

    /// Create a new provider with custom retry configuration.
    pub fn with_retry_config(
        api_key: String,
        default_model: String,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            default_model,
            retry_config,
        }
    }

    /// Create a provider from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let retry_config = RetryConfig {
            max_retries: config.max_retries,
            ..RetryConfig::default()
        };
        Self::with_retry_config(
            config.api_key.clone(),
            config.default_model.clone(),
            retry_config,
        )
    }

    /// Build the chat completion request for a provider call.
    fn build_request(
        &self,
        prompt: &str,
        tools: &[ToolDescriptor],
        options: &ProviderOptions,
    ) -> OpenRouterRequest {
        let tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();

        let response_format = match (&options.json_schema, options.json_response) {
            (Some(schema), _) => Some(json!({
                "type": "json_schema",
                "json_schema": {"name": "response", "schema": schema}
            })),
            (None, true) => Some(json!({"type": "json_object"})),
            (None, false) => None,
        };

        OpenRouterRequest {
            model: options
                .llm
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            messages: vec![json!({"role": "user", "content": prompt})],
            tool_choice: (!tools.is_empty()).then(|| "auto".to_string()),
            tools: (!tools.is_empty()).then_some(tools),
            temperature: options.llm.temperature,
            max_tokens: options.llm.max_tokens,
            response_format,
        }
    }

    /// Parse Retry-After header if present.
    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok().map(Duration::from_secs))
    }

    /// Classify a non-success HTTP response.
    fn create_error(status: u16, body: &str, retry_after: Option<Duration>) -> ProviderError {
        match status {
            429 => ProviderError::rate_limited(body.to_string(), retry_after),
            400..=499 => ProviderError::client_error(status, body.to_string()),
            _ => ProviderError::server_error(status, body.to_string()),
        }
    }

    /// Execute a single request without retry.
    async fn execute_request(
        &self,
        request: &OpenRouterRequest,
    ) -> Result<OpenRouterResponse, ProviderError> {
        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network_error(format!("Request timeout: {}", e))
                } else if e.is_connect() {
                    ProviderError::network_error(format!("Connection failed: {}", e))
                } else {
                    ProviderError::network_error(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Self::create_error(status.as_u16(), &body, retry_after));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
        })
    }

    /// Execute a request with automatic retry for transient errors.
    async fn execute_with_retry(
        &self,
        request: &OpenRouterRequest,
    ) -> Result<OpenRouterResponse, ProviderError> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            let error = match self.execute_request(request).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            "Request succeeded after {} retries (total time: {:?})",
                            attempt,
                            start.elapsed()
                        );
                    }
                    return Ok(response);
                }
                Err(error) => error,
            };

            let Some(delay) = self.retry_config.delay_for(&error, attempt, start.elapsed()) else {
                tracing::error!("Request failed after {} retries: {}", attempt, error);
                return Err(error);
            };

            tracing::warn!(
                "Retry attempt {} failed with {}, retrying in {:?}: {}",
                attempt + 1,
                error.kind,
                delay,
                error.message
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Turn a completion into a provider response.
///
/// JSON output that was asked for and parses becomes `Structured`;
/// everything else is wrapped in a reply signal under `content`.
fn interpret_response(
    response: OpenRouterResponse,
    json_response: bool,
) -> Result<ProviderResponse, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::parse_error("No choices in response".to_string()))?;

    if json_response {
        if let Some(parsed) = choice
            .message
            .content
            .as_deref()
            .and_then(|c| serde_json::from_str::<Value>(c).ok())
        {
            return Ok(ProviderResponse::Structured(parsed));
        }
    }

    let mut payload = Map::new();
    payload.insert(
        "content".to_string(),
        choice.message.content.map(Value::String).unwrap_or(Value::Null),
    );
    if let Some(tool_calls) = choice.message.tool_calls {
        payload.insert("tool_calls".to_string(), tool_calls);
    }
    if let Some(model) = response.model {
        payload.insert("model".to_string(), Value::String(model));
    }
    Ok(ProviderResponse::Reply(Signal::new(SchemaId::Response, payload)))
}

#[async_trait]
impl CapabilityProvider for OpenRouterProvider {
    async fn call(
        &self,
        prompt: &str,
        tools: &[ToolDescriptor],
        options: &ProviderOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(prompt, tools, options);
        tracing::debug!(
            "Sending request to OpenRouter: model={}, tools={}",
            request.model,
            tools.len()
        );

        let response = self.execute_with_retry(&request).await?;
        interpret_response(response, options.json_response)
    }
}

/// OpenRouter API request format.
#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

/// OpenRouter API response format.
#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<OpenRouterChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterMessage,
}

#[derive(Debug, Deserialize)]
struct OpenRouterMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmOptions;

    fn provider() -> OpenRouterProvider {
        OpenRouterProvider::new("key".to_string(), "openai/gpt-4o-mini".to_string())
    }

    #[test]
    fn test_request_with_schema_and_tools() {
        let tools = vec![ToolDescriptor::new("weather", "Look up weather")];
        let options = ProviderOptions::new(LlmOptions::default())
            .with_json_schema(json!({"type": "object"}));

        let request = serde_json::to_value(provider().build_request("hi", &tools, &options)).unwrap();

        assert_eq!(request["model"], json!("openai/gpt-4o-mini"));
        assert_eq!(request["messages"][0]["content"], json!("hi"));
        assert_eq!(request["tools"][0]["function"]["name"], json!("weather"));
        assert_eq!(request["tool_choice"], json!("auto"));
        assert_eq!(request["response_format"]["type"], json!("json_schema"));
        assert_eq!(
            request["response_format"]["json_schema"]["schema"],
            json!({"type": "object"})
        );
    }

    #[test]
    fn test_request_without_tools_omits_tool_fields() {
        let options = ProviderOptions::new(LlmOptions {
            model: Some("anthropic/claude-sonnet-4".to_string()),
            temperature: Some(0.0),
            ..LlmOptions::default()
        });

        let request = serde_json::to_value(provider().build_request("hi", &[], &options)).unwrap();

        assert_eq!(request["model"], json!("anthropic/claude-sonnet-4"));
        assert_eq!(request["temperature"], json!(0.0));
        assert!(request.get("tools").is_none());
        assert!(request.get("tool_choice").is_none());
        assert!(request.get("response_format").is_none());
    }

    #[test]
    fn test_interpret_json_content_as_structured() {
        let response: OpenRouterResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "{\"feasibility\": {\"possible\": true}}"}}]
        }))
        .unwrap();

        let interpreted = interpret_response(response, true).unwrap();
        assert_eq!(
            interpreted,
            ProviderResponse::Structured(json!({"feasibility": {"possible": true}}))
        );
    }

    #[test]
    fn test_interpret_text_content_as_reply() {
        let response: OpenRouterResponse = serde_json::from_value(json!({
            "model": "openai/gpt-4o-mini",
            "choices": [{"message": {"content": "It is 72 degrees"}}]
        }))
        .unwrap();

        let ProviderResponse::Reply(signal) = interpret_response(response, false).unwrap() else {
            panic!("expected reply");
        };
        assert_eq!(signal.schema_id, SchemaId::Response);
        assert_eq!(signal.payload["content"], json!("It is 72 degrees"));
        assert_eq!(signal.payload["model"], json!("openai/gpt-4o-mini"));
    }

    #[test]
    fn test_status_classification() {
        let err = OpenRouterProvider::create_error(429, "slow down", Some(Duration::from_secs(7)));
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
        assert_eq!(err.retry_after, Some(Duration::from_secs(7)));

        assert_eq!(
            OpenRouterProvider::create_error(401, "bad key", None).kind,
            ProviderErrorKind::ClientError
        );
        assert_eq!(
            OpenRouterProvider::create_error(503, "down", None).kind,
            ProviderErrorKind::ServerError
        );
        assert_eq!(
            OpenRouterProvider::create_error(302, "moved", None).kind,
            ProviderErrorKind::ServerError
        );
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let config = RetryConfig {
            max_retries: 10,
            max_retry_duration: Duration::from_secs(600),
        };
        let error = ProviderError::server_error(502, "bad gateway".to_string());
        let delay = |attempt| config.delay_for(&error, attempt, Duration::ZERO);

        assert_eq!(delay(0), Some(Duration::from_secs(2)));
        assert_eq!(delay(1), Some(Duration::from_secs(4)));
        assert_eq!(delay(9), Some(MAX_BACKOFF));

        let rate_limited = ProviderError::rate_limited("x".to_string(), None);
        assert_eq!(
            config.delay_for(&rate_limited, 0, Duration::ZERO),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_retry_after_is_honored() {
        let error = ProviderError::rate_limited("x".to_string(), Some(Duration::from_secs(30)));
        assert_eq!(
            RetryConfig::default().delay_for(&error, 2, Duration::ZERO),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_when_to_give_up() {
        let config = RetryConfig::default();
        let transient = ProviderError::network_error("reset".to_string());

        assert_eq!(
            config.delay_for(&ProviderError::client_error(400, "bad".to_string()), 0, Duration::ZERO),
            None
        );
        assert_eq!(config.delay_for(&transient, config.max_retries, Duration::ZERO), None);
        assert_eq!(config.delay_for(&transient, 0, config.max_retry_duration), None);
        assert_eq!(
            config.delay_for(&transient, 0, config.max_retry_duration - Duration::from_secs(1)),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_interpret_empty_choices_is_parse_error() {
        let response: OpenRouterResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        let err = interpret_response(response, false).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::ParseError);
    }
}
