//! # Agent Signals
//!
//! Signal-driven agent core: agents receive signals, route them by schema
//! and sub-type, and answer with reply signals.
//!
//! This library provides:
//! - A signal envelope and the typed task/objective payloads it carries
//! - A handler contract with a default router and default pipelines
//! - A capability provider seam with an OpenRouter-backed implementation
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────────────────────────┐
//!        │          SignalHandler           │
//!        │   (router: schema → callback)    │
//!        └───────┬──────────────────┬───────┘
//!                │                  │
//!                ▼                  ▼
//!     ┌───────────────────┐  ┌───────────────────┐
//!     │   Task pipeline   │  │ Objective pipeline│
//!     │ analyze → execute │  │ next step/progress│
//!     └─────────┬─────────┘  └───────────────────┘
//!               │
//!               ▼
//!     ┌───────────────────┐
//!     │ CapabilityProvider│
//!     │   (OpenRouter)    │
//!     └───────────────────┘
//! ```
//!
//! ## Task Flow
//! 1. Receive a task assignment signal
//! 2. Ask the provider whether the task is feasible and what it needs
//! 3. Execute with the agent's tools
//! 4. Reply with a completion or a staged failure
//!
//! ## Modules
//! - `agents`: handler contract, router and default pipelines
//! - `signal`: the signal envelope
//! - `task`: typed task and plan payloads
//! - `llm`: capability provider contract and adapters

pub mod agents;
pub mod config;
pub mod llm;
pub mod logging;
pub mod signal;
pub mod task;

pub use agents::{AgentContext, DefaultHandler, PipelineError, SignalError, SignalHandler};
pub use config::Config;
pub use llm::{CapabilityProvider, OpenRouterProvider, ProviderError};
pub use signal::{SchemaId, Signal, SignalId};
