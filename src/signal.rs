//! Signal - the single message unit exchanged between agents.
//!
//! # Invariants
//! - Every signal produced by the engine carries a fresh `id`
//! - Replies swap `sender` and `recipient` of the originating signal
//! - `payload.type` is one of the sub-types allowed by `schema_id`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Opaque identifier of a signal.
///
/// Incoming signals may carry any string; signals created here use UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(String);

impl SignalId {
    /// Create a new unique signal ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SignalId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SignalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SignalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Semantic schema of a signal's payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SchemaId {
    /// Work item assigned to an agent
    Task,
    /// Higher-level goal with ordered steps
    Objective,
    /// Free-form reply
    Response,
    /// Anything this engine does not know about
    Other(String),
}

impl SchemaId {
    pub fn as_str(&self) -> &str {
        match self {
            SchemaId::Task => "task",
            SchemaId::Objective => "objective",
            SchemaId::Response => "response",
            SchemaId::Other(s) => s,
        }
    }
}

impl From<String> for SchemaId {
    fn from(value: String) -> Self {
        match value.as_str() {
            "task" => SchemaId::Task,
            "objective" => SchemaId::Objective,
            "response" => SchemaId::Response,
            _ => SchemaId::Other(value),
        }
    }
}

impl From<SchemaId> for String {
    fn from(value: SchemaId) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message between agents.
///
/// Signals are value objects: handlers read one and build a new one,
/// copying fields explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub schema_id: SchemaId,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Signal {
    /// Create a new signal with a fresh id.
    pub fn new(schema_id: SchemaId, payload: Map<String, Value>) -> Self {
        Self {
            id: SignalId::new(),
            schema_id,
            payload,
            sender: None,
            recipient: None,
            metadata: Map::new(),
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `type` field of the payload, if it is a string.
    pub fn payload_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }

    /// Build a reply to this signal.
    ///
    /// # Postconditions
    /// - `reply.id` is fresh
    /// - `reply.recipient == self.sender` and `reply.sender == self.recipient`
    /// - `reply.metadata["in_reply_to"] == self.id`
    pub fn reply(&self, payload: Map<String, Value>) -> Signal {
        Signal {
            id: SignalId::new(),
            schema_id: self.schema_id.clone(),
            payload,
            sender: self.recipient.clone(),
            recipient: self.sender.clone(),
            metadata: Map::new(),
        }
        .with_metadata("in_reply_to", self.id.as_str())
    }
}
