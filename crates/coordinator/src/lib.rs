//! Plan-and-dispatch orchestration for delivery disruptions.
//!
//! ```text
//! Disruption
//!      │
//!      ▼
//! ┌─────────────┐   Plan    ┌────────────┐  results  ┌────────────┐
//! │   Planner   │ ────────► │ Dispatcher │ ────────► │ Aggregator │ ──► Resolution
//! │ (LLM/rules) │           │ seq | par  │           │            │
//! └─────────────┘           └─────┬──────┘           └────────────┘
//!                                 │ registry lookup
//!                   ┌─────────────┼──────────────┐
//!                   ▼             ▼              ▼
//!              [notifier]   [route finder]  [merchant status]
//! ```
//!
//! The [`Orchestrator`] drives a request through
//! `Init → Planning → Dispatching → Aggregating → Done`, or
//! `Planning → Errored` when no plan can be made.

pub mod aggregator;
pub mod config;
pub mod dispatcher;
pub mod keyword;
pub mod orchestrator;
pub mod planner;
pub mod retry;

pub use aggregator::aggregate;
pub use config::{BackendConfig, BackendKind, DispatchConfig, SynapseConfig};
pub use dispatcher::Dispatcher;
pub use keyword::KeywordPlanner;
pub use orchestrator::{
    interpolate_directive, Orchestrator, OrchestratorState, ResolveOutcome, PRIOR_OUTPUT,
};
pub use planner::{extract_json_object, parse_plan, LlmPlanner, Planner};
pub use retry::RetryPolicy;
