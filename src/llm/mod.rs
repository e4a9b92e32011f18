//! Capability provider module - the reasoning service the pipelines consult.
//!
//! This module provides a trait-based abstraction over the provider, with
//! an OpenRouter-backed adapter as the bundled implementation. The engine
//! itself only ever talks to [`CapabilityProvider`].

mod error;
#[cfg(test)]
pub(crate) mod mock;
mod openrouter;

pub use error::{ProviderError, ProviderErrorKind};
pub use openrouter::{OpenRouterProvider, RetryConfig};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::signal::Signal;

/// Category of a tool exposed by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Reactive workflow
    Beam,
    /// Read-only capability
    Lens,
    /// Side-effecting capability
    Prism,
}

/// Opaque handle to a tool the provider may invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// JSON schema of the tool's input
    #[serde(default)]
    pub parameters: Value,

    /// Set when the tool is collected from an agent's tool lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ToolKind>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Value::Object(Map::new()),
            kind: None,
        }
    }
}

/// LLM settings found in an agent's context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmOptions {
    /// Model identifier; providers fall back to their own default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature (0 = deterministic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Maximum output tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,

    /// Upper bound for a single provider call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LlmOptions {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Options for a single provider call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOptions {
    pub llm: LlmOptions,
    /// Ask for a JSON object instead of free text
    pub json_response: bool,
    /// Constrains the shape of a JSON response
    pub json_schema: Option<Value>,
}

impl ProviderOptions {
    pub fn new(llm: LlmOptions) -> Self {
        Self {
            llm,
            json_response: false,
            json_schema: None,
        }
    }

    /// Request structured output matching `schema`.
    pub fn with_json_schema(mut self, schema: Value) -> Self {
        self.json_response = true;
        self.json_schema = Some(schema);
        self
    }
}

/// What a provider hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    /// A structured result object
    Structured(Value),
    /// A reply signal whose payload carries a `content` field
    Reply(Signal),
}

impl ProviderResponse {
    /// The result content, whichever shape the provider chose.
    ///
    /// For replies this is `payload.content`, or the whole payload when
    /// there is no `content` key.
    pub fn into_content(self) -> Value {
        match self {
            ProviderResponse::Structured(value) => value,
            ProviderResponse::Reply(mut signal) => match signal.payload.remove("content") {
                Some(content) => content,
                None => Value::Object(signal.payload),
            },
        }
    }
}

/// Trait for capability providers.
///
/// # Contract
/// - `tools` is the full tool set the provider may select from
/// - Transport failures and timeouts are reported as `ProviderError`,
///   never as a fabricated response
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    async fn call(
        &self,
        prompt: &str,
        tools: &[ToolDescriptor],
        options: &ProviderOptions,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// Call `provider`, bounded by `options.llm.timeout_secs` when set.
pub async fn call_bounded(
    provider: &dyn CapabilityProvider,
    prompt: &str,
    tools: &[ToolDescriptor],
    options: &ProviderOptions,
) -> Result<ProviderResponse, ProviderError> {
    match options.llm.timeout() {
        Some(limit) => match tokio::time::timeout(limit, provider.call(prompt, tools, options)).await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(limit)),
        },
        None => provider.call(prompt, tools, options).await,
    }
}
