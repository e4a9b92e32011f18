//! Task payload - the typed content of a `task` signal.
//!
//! # Lifecycle
//! ```text
//! Pending -> InProgress -> Completed
//!                      \-> Failed
//! ```
//! A payload is a self-contained snapshot: handlers never mutate it in place,
//! they consume it and emit a fully formed successor.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Sub-type of a task signal (`payload.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSignalType {
    /// Work was assigned to the receiving agent
    Assignment,
    /// Progress report
    StatusUpdate,
    /// The task finished successfully
    Completion,
    /// The task failed
    Failure,
}

impl TaskSignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::StatusUpdate => "status_update",
            Self::Completion => "completion",
            Self::Failure => "failure",
        }
    }
}

impl FromStr for TaskSignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assignment" => Ok(Self::Assignment),
            "status_update" => Ok(Self::StatusUpdate),
            "completion" => Ok(Self::Completion),
            "failure" => Ok(Self::Failure),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for TaskSignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Read a percentage from any JSON number, rounded and clamped to `0..=100`.
pub(crate) fn lenient_progress<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map(|p| p.round().clamp(0.0, 100.0) as u8))
}

/// Outcome attached to a finished task.
///
/// # Invariants
/// - `success == true` implies `output` is set and `error` is not
/// - `success == false` implies `error` is set and `output` is not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    pub fn success(output: Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// Typed view of a task signal payload.
///
/// Keys this engine does not know about are kept in `extra` so that
/// transforms preserve them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    #[serde(rename = "type")]
    pub kind: TaskSignalType,

    /// Opaque, passed through as received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Value>,

    /// Opaque, passed through as received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    /// Percentage in `0..=100`
    #[serde(
        default,
        deserialize_with = "lenient_progress",
        skip_serializing_if = "Option::is_none"
    )]
    pub progress: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskPayload {
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

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled task")
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    /// Mark the task as being worked on.
    pub fn into_status_update(mut self) -> Self {
        self.kind = TaskSignalType::StatusUpdate;
        self.status = Some(TaskStatus::InProgress);
        self
    }

    /// Finish the task successfully with the given output.
    ///
    /// # Postconditions
    /// `status == Completed`, `progress == 100`, `result.success == true`
    pub fn into_completion(mut self, output: Value) -> Self {
        self.kind = TaskSignalType::Completion;
        self.status = Some(TaskStatus::Completed);
        self.progress = Some(100);
        self.result = Some(TaskResult::success(output));
        self
    }

    /// Finish the task with an error. Progress is left as reported.
    pub fn into_failure(mut self, error: impl Into<String>) -> Self {
        self.kind = TaskSignalType::Failure;
        self.status = Some(TaskStatus::Failed);
        self.result = Some(TaskResult::failure(error));
        self
    }
}
