//! Objective/plan payload - the typed content of an `objective` signal.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::task::lenient_progress;

/// Sub-type of an objective signal (`payload.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSignalType {
    Evaluate,
    NextStep,
    StatusUpdate,
    Completion,
}

impl PlanSignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evaluate => "evaluate",
            Self::NextStep => "next_step",
            Self::StatusUpdate => "status_update",
            Self::Completion => "completion",
        }
    }
}

impl FromStr for PlanSignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "evaluate" => Ok(Self::Evaluate),
            "next_step" => Ok(Self::NextStep),
            "status_update" => Ok(Self::StatusUpdate),
            "completion" => Ok(Self::Completion),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for PlanSignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a plan step.
///
/// Only `pending` and `completed` drive the objective pipeline; any other
/// status (`skipped`, `blocked`, ...) is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Other(String),
}

impl StepStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Other(s) => s,
        }
    }
}

impl From<String> for StepStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => StepStatus::Pending,
            "in_progress" => StepStatus::InProgress,
            "completed" => StepStatus::Completed,
            "failed" => StepStatus::Failed,
            _ => StepStatus::Other(value),
        }
    }
}

impl From<StepStatus> for String {
    fn from(value: StepStatus) -> Self {
        value.as_str().to_string()
    }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub status: StepStatus,

    /// Agent already responsible for this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Step {
    pub fn new(status: StepStatus) -> Self {
        Self {
            status,
            assigned_to: None,
            extra: Map::new(),
        }
    }

    pub fn assigned_to(mut self, agent: impl Into<String>) -> Self {
        self.assigned_to = Some(agent.into());
        self
    }
}

/// An agent that can be handed a step.
///
/// A descriptor without an `id` is kept but can never be selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AgentDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            extra: Map::new(),
        }
    }
}

/// `payload.context` of an objective signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_agents: Option<Vec<AgentDescriptor>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Decision about how an objective proceeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Evaluation {
    /// Dispatch the step at `next_step_index`.
    ///
    /// `next_step_index == steps.len()` means every step has been dispatched.
    Continue {
        next_step_index: usize,
        assigned_agent: Option<String>,
        reasoning: String,
    },
    /// The objective is done.
    Complete { reasoning: String },
}

/// Typed view of an objective signal payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanPayload {
    #[serde(rename = "type")]
    pub kind: PlanSignalType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PlanContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,

    /// Percentage in `0..=100`
    #[serde(
        default,
        deserialize_with = "lenient_progress",
        skip_serializing_if = "Option::is_none"
    )]
    pub progress: Option<u8>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlanPayload {
    /// Deserialize from a raw signal payload.
    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(payload.clone()))
    }

    /// Serialize back into a raw signal payload.
    pub fn into_payload(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct always serializes to an object.
            _ => Map::new(),
        }
    }

    pub fn steps(&self) -> Option<&[Step]> {
        self.steps.as_deref()
    }

    pub fn available_agents(&self) -> Option<&[AgentDescriptor]> {
        self.context
            .as_ref()
            .and_then(|c| c.available_agents.as_deref())
    }
}
