//! Error taxonomy for signal handling.

use crate::llm::ProviderError;

/// Errors returned to the caller instead of an outbound signal.
///
/// Routing errors have no well-formed reply to synthesize;
/// `MissingLlmConfiguration` is a deployment defect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("Unsupported task signal type: {0}")]
    UnsupportedTaskType(String),

    #[error("Unsupported plan signal type: {0}")]
    UnsupportedPlanType(String),

    #[error("Handler not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("No LLM configuration found in context (expected template_opts.llm_opts or llm_config)")]
    MissingLlmConfiguration,
}

impl SignalError {
    /// Whether the error means the agent cannot act on any signal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SignalError::MissingLlmConfiguration)
    }
}

/// Pipeline phase at which a task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Analysis,
    Execution,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Analysis => write!(f, "analysis"),
            Stage::Execution => write!(f, "execution"),
        }
    }
}

/// Stage-tagged failure inside the task pipeline.
///
/// These never reach the caller as errors; they become failure signals.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed at analysis: {0}")]
    AnalysisInfeasible(String),

    #[error("Failed at analysis: {0}")]
    AnalysisProviderError(ProviderError),

    #[error("Failed at execution: {0}")]
    ExecutionProviderError(ProviderError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::AnalysisInfeasible(_) | PipelineError::AnalysisProviderError(_) => {
                Stage::Analysis
            }
            PipelineError::ExecutionProviderError(_) => Stage::Execution,
        }
    }

    /// The underlying cause, without the stage prefix.
    pub fn reason(&self) -> String {
        match self {
            PipelineError::AnalysisInfeasible(reason) => reason.clone(),
            PipelineError::AnalysisProviderError(e) | PipelineError::ExecutionProviderError(e) => {
                e.to_string()
            }
        }
    }
}
