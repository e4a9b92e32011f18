//! Default router - schema switch, then `payload.type` switch.
//!
//! Payloads are validated here, at the boundary, so callbacks only ever see
//! typed payloads. Nothing is dropped silently: an unknown schema or
//! sub-type is an error.

use std::str::FromStr;

use super::{AgentContext, SignalError, SignalHandler};
use crate::signal::{SchemaId, Signal};
use crate::task::{PlanPayload, PlanSignalType, TaskPayload, TaskSignalType};

/// Dispatch `signal` to the matching callback of `handler`.
///
/// # Errors
/// - `UnsupportedSchema` for any schema other than task/objective
/// - `UnsupportedTaskType` / `UnsupportedPlanType` for an unknown or missing `payload.type`
/// - `InvalidPayload` if the payload does not fit its typed shape
/// - whatever the chosen callback returns
pub async fn route<H>(
    handler: &H,
    signal: &Signal,
    ctx: &AgentContext,
) -> Result<Signal, SignalError>
where
    H: SignalHandler + ?Sized,
{
    tracing::debug!(
        "Routing signal {} (schema={}, type={})",
        signal.id,
        signal.schema_id,
        signal.payload_type().unwrap_or("-")
    );

    match &signal.schema_id {
        SchemaId::Task => {
            let kind: TaskSignalType =
                parse_type(signal).map_err(SignalError::UnsupportedTaskType)?;
            let task = TaskPayload::from_payload(&signal.payload)
                .map_err(|e| SignalError::InvalidPayload(e.to_string()))?;

            match kind {
                TaskSignalType::Assignment => handler.handle_task_assignment(signal, task, ctx).await,
                TaskSignalType::StatusUpdate => handler.handle_task_update(signal, task, ctx).await,
                TaskSignalType::Completion => handler.handle_task_completion(signal, task, ctx).await,
                TaskSignalType::Failure => handler.handle_task_failure(signal, task, ctx).await,
            }
        }
        SchemaId::Objective => {
            let kind: PlanSignalType =
                parse_type(signal).map_err(SignalError::UnsupportedPlanType)?;
            let plan = PlanPayload::from_payload(&signal.payload)
                .map_err(|e| SignalError::InvalidPayload(e.to_string()))?;

            match kind {
                PlanSignalType::Evaluate => handler.handle_plan_evaluation(signal, plan, ctx).await,
                PlanSignalType::NextStep => handler.handle_plan_next_step(signal, plan, ctx).await,
                PlanSignalType::StatusUpdate => handler.handle_plan_update(signal, plan, ctx).await,
                PlanSignalType::Completion => handler.handle_plan_completion(signal, plan, ctx).await,
            }
        }
        other => {
            tracing::warn!("Signal {} has unsupported schema {}", signal.id, other);
            Err(SignalError::UnsupportedSchema(other.to_string()))
        }
    }
}

fn parse_type<T: FromStr<Err = String>>(signal: &Signal) -> Result<T, String> {
    match signal.payload_type() {
        Some(raw) => raw.parse(),
        None => Err("<missing>".to_string()),
    }
}
