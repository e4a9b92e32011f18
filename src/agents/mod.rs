//! Agents module - the signal handler contract and its default behavior.
//!
//! # Pieces
//! - **SignalHandler**: the callbacks every agent type supports
//! - **router**: generic dispatch by schema and `payload.type`
//! - **DefaultHandler**: the default task and objective pipelines
//!
//! # Composition
//! Concrete agents hold a `DefaultHandler` and delegate to it for the
//! callbacks they do not customize. Callbacks nobody implements answer
//! `NotImplemented` instead of inventing a success.

mod context;
pub mod objective;
pub mod router;
pub mod task_pipeline;
mod types;

pub use context::{AgentContext, TemplateOpts, ToolSet};
pub use types::{PipelineError, SignalError, Stage};

use async_trait::async_trait;

use crate::signal::Signal;
use crate::task::{PlanPayload, TaskPayload};

/// Contract every agent type implements.
///
/// # Invariants
/// - A callback returns `Ok` only with a fully formed reply signal
/// - Callbacks never mutate their input; the typed payload is consumed
///   and its successor is emitted
/// - Unoverridden callbacks return `SignalError::NotImplemented`
#[async_trait]
pub trait SignalHandler: Send + Sync {
    /// Generic dispatch. Override only to change routing itself.
    async fn handle_signal(&self, signal: &Signal, ctx: &AgentContext) -> Result<Signal, SignalError> {
        router::route(self, signal, ctx).await
    }

    async fn handle_task_assignment(
        &self,
        _signal: &Signal,
        _task: TaskPayload,
        _ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        Err(SignalError::NotImplemented("handle_task_assignment"))
    }

    async fn handle_task_update(
        &self,
        _signal: &Signal,
        _task: TaskPayload,
        _ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        Err(SignalError::NotImplemented("handle_task_update"))
    }

    async fn handle_task_completion(
        &self,
        _signal: &Signal,
        _task: TaskPayload,
        _ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        Err(SignalError::NotImplemented("handle_task_completion"))
    }

    async fn handle_task_failure(
        &self,
        _signal: &Signal,
        _task: TaskPayload,
        _ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        Err(SignalError::NotImplemented("handle_task_failure"))
    }

    async fn handle_plan_evaluation(
        &self,
        _signal: &Signal,
        _plan: PlanPayload,
        _ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        Err(SignalError::NotImplemented("handle_plan_evaluation"))
    }

    async fn handle_plan_next_step(
        &self,
        _signal: &Signal,
        _plan: PlanPayload,
        _ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        Err(SignalError::NotImplemented("handle_plan_next_step"))
    }

    async fn handle_plan_update(
        &self,
        _signal: &Signal,
        _plan: PlanPayload,
        _ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        Err(SignalError::NotImplemented("handle_plan_update"))
    }

    async fn handle_plan_completion(
        &self,
        _signal: &Signal,
        _plan: PlanPayload,
        _ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        Err(SignalError::NotImplemented("handle_plan_completion"))
    }
}

/// Default pipelines for tasks and objectives.
///
/// Task completion, task failure and plan next-step have no default and
/// stay `NotImplemented`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl DefaultHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SignalHandler for DefaultHandler {
    async fn handle_task_assignment(
        &self,
        signal: &Signal,
        task: TaskPayload,
        ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        task_pipeline::handle_task_assignment(signal, task, ctx).await
    }

    async fn handle_task_update(
        &self,
        signal: &Signal,
        task: TaskPayload,
        ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        task_pipeline::handle_task_update(signal, task, ctx).await
    }

    async fn handle_plan_evaluation(
        &self,
        signal: &Signal,
        plan: PlanPayload,
        ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        objective::handle_objective_evaluation(signal, plan, ctx).await
    }

    async fn handle_plan_update(
        &self,
        signal: &Signal,
        plan: PlanPayload,
        ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        objective::handle_objective_update(signal, plan, ctx).await
    }

    async fn handle_plan_completion(
        &self,
        signal: &Signal,
        plan: PlanPayload,
        ctx: &AgentContext,
    ) -> Result<Signal, SignalError> {
        objective::handle_objective_completion(signal, plan, ctx).await
    }
}
