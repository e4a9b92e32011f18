//! Scripted provider for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CapabilityProvider, ProviderError, ProviderOptions, ProviderResponse, ToolDescriptor};

/// A call the provider received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub tool_names: Vec<String>,
    pub options: ProviderOptions,
}

/// Replays queued responses in order and records every call.
///
/// Running out of responses is reported as a server error.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CapabilityProvider for ScriptedProvider {
    async fn call(
        &self,
        prompt: &str,
        tools: &[ToolDescriptor],
        options: &ProviderOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            options: options.clone(),
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::server_error(500, "script exhausted".to_string())))
    }
}
