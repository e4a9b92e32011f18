//! Agent execution context - read-only input to every handler call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::types::SignalError;
use crate::llm::{CapabilityProvider, LlmOptions, ToolDescriptor, ToolKind};

/// Tools exposed by an agent, by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSet {
    #[serde(default)]
    pub beams: Option<Vec<ToolDescriptor>>,
    #[serde(default)]
    pub lenses: Option<Vec<ToolDescriptor>>,
    #[serde(default)]
    pub prisms: Option<Vec<ToolDescriptor>>,
}

impl ToolSet {
    /// Union of all categories, in the order beams, lenses, prisms.
    ///
    /// Each returned descriptor has `kind` set to its category.
    pub fn available_tools(&self) -> Vec<ToolDescriptor> {
        [
            (ToolKind::Beam, &self.beams),
            (ToolKind::Lens, &self.lenses),
            (ToolKind::Prism, &self.prisms),
        ]
        .into_iter()
        .flat_map(|(kind, tools)| {
            tools.iter().flatten().map(move |tool| ToolDescriptor {
                kind: Some(kind),
                ..tool.clone()
            })
        })
        .collect()
    }
}

/// Prompt template options; may carry the LLM settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateOpts {
    #[serde(default)]
    pub llm_opts: Option<LlmOptions>,
}

/// Context passed to handlers alongside each signal.
///
/// # Thread Safety
/// Handlers only read the context, so one context can serve concurrent
/// invocations for different signals.
#[derive(Clone)]
pub struct AgentContext {
    pub tools: ToolSet,

    /// Checked before `llm_config`
    pub template_opts: Option<TemplateOpts>,

    pub llm_config: Option<LlmOptions>,

    /// Reasoning service used by the pipelines
    pub provider: Arc<dyn CapabilityProvider>,
}

impl AgentContext {
    /// Create a context with no tools and no LLM configuration.
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self {
            tools: ToolSet::default(),
            template_opts: None,
            llm_config: None,
            provider,
        }
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_llm_config(mut self, llm: LlmOptions) -> Self {
        self.llm_config = Some(llm);
        self
    }

    pub fn with_template_llm_opts(mut self, llm: LlmOptions) -> Self {
        self.template_opts = Some(TemplateOpts {
            llm_opts: Some(llm),
        });
        self
    }

    /// Resolve the LLM configuration.
    ///
    /// # Errors
    /// `MissingLlmConfiguration` if neither `template_opts.llm_opts` nor
    /// `llm_config` is present.
    pub fn llm_options(&self) -> Result<&LlmOptions, SignalError> {
        self.template_opts
            .as_ref()
            .and_then(|t| t.llm_opts.as_ref())
            .or(self.llm_config.as_ref())
            .ok_or(SignalError::MissingLlmConfiguration)
    }

    pub fn available_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.available_tools()
    }
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext")
            .field("tools", &self.tools)
            .field("template_opts", &self.template_opts)
            .field("llm_config", &self.llm_config)
            .finish_non_exhaustive()
    }
}
