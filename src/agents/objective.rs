//! Default objective pipeline - deterministic plan bookkeeping.
//!
//! None of these handlers consult the provider; agents that want
//! provider-backed planning override the callbacks.

use super::{AgentContext, SignalError};
use crate::signal::Signal;
use crate::task::{AgentDescriptor, Evaluation, PlanPayload, PlanSignalType, Step, StepStatus};

const EVALUATION_REASONING: &str = "Objective evaluated successfully";
const COMPLETION_REASONING: &str = "Objective completed successfully";

/// Index of the first pending step, or `steps.len()` when none is pending.
pub fn next_step_index(steps: &[Step]) -> usize {
    steps
        .iter()
        .position(|s| s.status == StepStatus::Pending)
        .unwrap_or(steps.len())
}

/// `round(100 * completed / total)`, or 0 for an empty plan.
pub fn calculate_progress(steps: &[Step]) -> u8 {
    if steps.is_empty() {
        return 0;
    }
    let completed = steps
        .iter()
        .filter(|s| s.status == StepStatus::Completed)
        .count();
    (100.0 * completed as f64 / steps.len() as f64).round() as u8
}

/// Pick the agent for the step at `index`.
///
/// An existing `assigned_to` wins; otherwise the first available agent,
/// provided it has an id.
/// Yields `None` when either the steps or the available agents are absent.
pub fn select_agent(
    steps: Option<&[Step]>,
    agents: Option<&[AgentDescriptor]>,
    index: usize,
) -> Option<String> {
    let (steps, agents) = (steps?, agents?);
    steps
        .get(index)
        .and_then(|step| step.assigned_to.clone())
        .or_else(|| agents.first().and_then(|a| a.id.clone()))
}

/// Decide the next step and who should take it.
pub async fn handle_objective_evaluation(
    signal: &Signal,
    mut plan: PlanPayload,
    ctx: &AgentContext,
) -> Result<Signal, SignalError> {
    ctx.llm_options()?;

    let index = plan.steps().map(next_step_index).unwrap_or(0);
    let assigned_agent = select_agent(plan.steps(), plan.available_agents(), index);
    tracing::debug!(
        "Objective {}: next step {} assigned to {:?}",
        signal.id,
        index,
        assigned_agent
    );

    plan.kind = PlanSignalType::Evaluate;
    plan.evaluation = Some(Evaluation::Continue {
        next_step_index: index,
        assigned_agent,
        reasoning: EVALUATION_REASONING.to_string(),
    });
    Ok(signal.reply(plan.into_payload()))
}

/// Recompute progress from the step statuses.
pub async fn handle_objective_update(
    signal: &Signal,
    mut plan: PlanPayload,
    ctx: &AgentContext,
) -> Result<Signal, SignalError> {
    ctx.llm_options()?;

    plan.kind = PlanSignalType::StatusUpdate;
    plan.progress = Some(plan.steps().map(calculate_progress).unwrap_or(0));
    Ok(signal.reply(plan.into_payload()))
}

/// Mark the objective complete.
///
/// Completion is taken on the caller's word: step statuses are not checked.
pub async fn handle_objective_completion(
    signal: &Signal,
    mut plan: PlanPayload,
    ctx: &AgentContext,
) -> Result<Signal, SignalError> {
    ctx.llm_options()?;

    plan.kind = PlanSignalType::Completion;
    plan.progress = Some(100);
    plan.evaluation = Some(Evaluation::Complete {
        reasoning: COMPLETION_REASONING.to_string(),
    });
    Ok(signal.reply(plan.into_payload()))
}
