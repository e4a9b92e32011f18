//! Task module - typed payloads carried by signals.
//!
//! Signals travel as loosely-typed JSON; these types are what the engine
//! works with once a payload has been validated at the router boundary.
//! - All types use algebraic data types with exhaustive matching
//! - Transforms consume a payload and return its successor

pub mod plan;
pub mod task;

pub use plan::{
    AgentDescriptor, Evaluation, PlanContext, PlanPayload, PlanSignalType, Step, StepStatus,
};
pub use task::{TaskPayload, TaskResult, TaskSignalType, TaskStatus};
