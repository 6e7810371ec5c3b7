//! Top-level resolve flow: plan, dispatch, aggregate.

use crate::aggregator::aggregate;
use crate::config::SynapseConfig;
use crate::dispatcher::Dispatcher;
use crate::keyword::KeywordPlanner;
use crate::planner::{LlmPlanner, Planner};
use crate::retry::RetryPolicy;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use synapse_common::{
    Disruption, Instruction, Plan, Resolution, ResolutionStatus, Result, SpecialistResult,
};
use synapse_llm::{build_llm_client, LlmConfig};
use synapse_memory::{InMemoryResolutionMemory, ResolutionMemory};
use synapse_specialists::SpecialistRegistry;
use tracing::{debug, error, info, warn};

/// Placeholder replaced by the output of the instruction named in `depends_on`.
pub const PRIOR_OUTPUT: &str = "{prior_output}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Init,
    Planning,
    Dispatching,
    Aggregating,
    Done,
    Errored,
}

impl OrchestratorState {
    pub fn can_transition_to(self, next: OrchestratorState) -> bool {
        use OrchestratorState::*;
        matches!(
            (self, next),
            (Init, Planning)
                | (Planning, Dispatching)
                | (Planning, Errored)
                | (Dispatching, Aggregating)
                | (Aggregating, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrchestratorState::Done | OrchestratorState::Errored)
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrchestratorState::Init => "init",
            OrchestratorState::Planning => "planning",
            OrchestratorState::Dispatching => "dispatching",
            OrchestratorState::Aggregating => "aggregating",
            OrchestratorState::Done => "done",
            OrchestratorState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Per-request state machine. Illegal transitions are logged and ignored.
struct StateMachine<'a> {
    order_id: &'a str,
    current: OrchestratorState,
    trace: Vec<OrchestratorState>,
}

impl<'a> StateMachine<'a> {
    fn new(order_id: &'a str) -> Self {
        Self {
            order_id,
            current: OrchestratorState::Init,
            trace: vec![OrchestratorState::Init],
        }
    }

    fn advance(&mut self, next: OrchestratorState) {
        if !self.current.can_transition_to(next) {
            error!(
                order_id = %self.order_id,
                from = %self.current,
                to = %next,
                "Invariant violation: illegal orchestrator transition"
            );
            return;
        }
        debug!(order_id = %self.order_id, from = %self.current, to = %next, "State transition");
        self.current = next;
        self.trace.push(next);
    }
}

/// A resolution plus how the orchestrator got there.
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub resolution: Resolution,
    /// States visited, starting with `Init`
    pub trace: Vec<OrchestratorState>,
    /// The plan that was dispatched, absent on planning failure
    pub plan: Option<Plan>,
}

impl ResolveOutcome {
    pub fn final_state(&self) -> OrchestratorState {
        self.trace
            .last()
            .copied()
            .unwrap_or(OrchestratorState::Init)
    }
}

/// Ties the planner, dispatcher and aggregator together.
///
/// Shared across requests; holds no per-request state.
pub struct Orchestrator {
    planner: Arc<dyn Planner>,
    registry: Arc<SpecialistRegistry>,
    dispatcher: Dispatcher,
    retry: RetryPolicy,
    memory: Option<Arc<dyn ResolutionMemory>>,
}

impl Orchestrator {
    pub fn new(planner: Arc<dyn Planner>, registry: Arc<SpecialistRegistry>) -> Self {
        Self {
            planner,
            registry,
            dispatcher: Dispatcher::default(),
            retry: RetryPolicy::default(),
            memory: None,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn ResolutionMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Wire up every collaborator from configuration.
    ///
    /// One memory store is shared: the orchestrator writes to it and the
    /// reasoning planner recalls from it.
    pub fn from_config(config: &SynapseConfig) -> Result<Self> {
        let backend = config.backend.build()?;
        let registry = Arc::new(SpecialistRegistry::with_defaults(backend));

        let memory: Option<Arc<dyn ResolutionMemory>> = config
            .memory
            .enabled
            .then(|| Arc::new(InMemoryResolutionMemory::from_config(&config.memory)) as _);

        let planner: Arc<dyn Planner> = if config.provider.is_keyword() {
            info!("No reasoning provider configured, using keyword planner");
            Arc::new(KeywordPlanner::new())
        } else {
            let client = build_llm_client(&config.provider)?;
            info!(
                provider = %config.provider.provider,
                model = %config.provider.model,
                "Using reasoning planner"
            );
            let (temperature, max_tokens) = planning_sampling(&config.provider);
            let mut planner = LlmPlanner::new(client, &registry)
                .with_temperature(temperature)
                .with_max_tokens(max_tokens);
            if let Some(ref memory) = memory {
                planner = planner.with_memory(memory.clone());
            }
            Arc::new(planner)
        };

        let mut orchestrator = Self::new(planner, registry)
            .with_dispatcher(Dispatcher::new(config.dispatch.instruction_timeout()))
            .with_retry_policy(config.planning.clone());

        if let Some(memory) = memory {
            orchestrator = orchestrator.with_memory(memory);
        }

        Ok(orchestrator)
    }

    pub fn planner_kind(&self) -> String {
        self.planner.kind()
    }

    pub fn registry(&self) -> &SpecialistRegistry {
        &self.registry
    }

    /// Resolve one disruption. Always returns a resolution; planning
    /// failures become a `planning_failed` resolution.
    pub async fn resolve(&self, disruption: &Disruption) -> ResolveOutcome {
        let order_label = disruption.order_id.as_deref().unwrap_or("-");
        let mut machine = StateMachine::new(order_label);

        info!(order_id = %order_label, "Resolving disruption");
        machine.advance(OrchestratorState::Planning);

        let planned = self
            .retry
            .run(|attempt| {
                debug!(order_id = %order_label, attempt = attempt, "Planning attempt");
                self.planner.plan(disruption)
            })
            .await;

        let plan = match planned {
            Ok(plan) => plan,
            Err(e) => {
                warn!(order_id = %order_label, code = e.code(), error = %e, "Planning failed");
                machine.advance(OrchestratorState::Errored);
                return ResolveOutcome {
                    resolution: Resolution::planning_failed(disruption.order_id.clone(), &e),
                    trace: machine.trace,
                    plan: None,
                };
            }
        };

        info!(
            order_id = %order_label,
            workflow_type = %plan.workflow_type().as_str(),
            instructions = plan.len(),
            "Plan accepted"
        );
        machine.advance(OrchestratorState::Dispatching);

        let results = self
            .dispatcher
            .dispatch_with(&plan, &self.registry, |instruction, done| {
                interpolate_directive(instruction, &plan, done)
            })
            .await;

        machine.advance(OrchestratorState::Aggregating);
        let resolution = aggregate(disruption.order_id.clone(), plan.workflow_type(), results);

        if resolution.status == ResolutionStatus::Resolved {
            self.remember(&plan, &disruption.scenario_text);
        }

        machine.advance(OrchestratorState::Done);
        info!(
            order_id = %order_label,
            status = ?resolution.status,
            "Disruption resolved"
        );

        ResolveOutcome {
            resolution,
            trace: machine.trace,
            plan: Some(plan),
        }
    }

    /// Fire-and-forget memory write; never delays or fails the response.
    fn remember(&self, plan: &Plan, scenario: &str) {
        let Some(memory) = self.memory.clone() else {
            return;
        };
        let summary = plan.summary();
        let scenario = scenario.to_string();
        tokio::spawn(async move {
            if let Err(e) = memory.record(&summary, &scenario).await {
                warn!(error = %e, "Failed to record resolution in memory");
            }
        });
    }
}

/// Temperature and token budget for planning calls. Planning stays
/// deterministic unless the config asks otherwise.
fn planning_sampling(provider: &LlmConfig) -> (Option<f32>, Option<u32>) {
    (
        provider.temperature.or(Some(0.0)),
        provider.max_tokens.or(Some(1024)),
    )
}

/// Directive for `instruction` with its dependency's result folded in.
///
/// Every `{prior_output}` is replaced by the dependency's output, or by
/// `[unavailable: <error>]` when it failed. Without a placeholder the output
/// is appended as `Context from <id>: <output>`.
pub fn interpolate_directive(
    instruction: &Instruction,
    plan: &Plan,
    results: &[SpecialistResult],
) -> String {
    let Some(dependency) = instruction.depends_on.as_deref() else {
        return instruction.directive.clone();
    };

    let prior = plan
        .position(dependency)
        .and_then(|index| results.iter().find(|r| r.instruction_index == index));

    let value = match prior {
        Some(result) if result.is_success() => result.text().to_string(),
        Some(result) => format!("[unavailable: {}]", result.text()),
        None => "[unavailable: not executed]".to_string(),
    };

    if instruction.directive.contains(PRIOR_OUTPUT) {
        instruction.directive.replace(PRIOR_OUTPUT, &value)
    } else {
        format!(
            "{}\n\nContext from {}: {}",
            instruction.directive, dependency, value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_common::{SpecialistId, WorkflowType};

    fn chained_plan(directive: &str) -> Plan {
        Plan::new(
            WorkflowType::Sequential,
            vec![
                Instruction::new("route", SpecialistId::ROUTE_FINDER, "Find a route"),
                Instruction::new("notify", SpecialistId::NOTIFICATION_SENDER, directive)
                    .depending_on("route"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn planning_sampling_defaults_to_deterministic() {
        let omitted = LlmConfig {
            provider: "openai".into(),
            model: "llama3".into(),
            temperature: None,
            max_tokens: None,
            ..Default::default()
        };
        assert_eq!(planning_sampling(&omitted), (Some(0.0), Some(1024)));

        let explicit = LlmConfig {
            temperature: Some(0.7),
            max_tokens: Some(256),
            ..omitted
        };
        assert_eq!(planning_sampling(&explicit), (Some(0.7), Some(256)));
    }

    #[test]
    fn legal_transitions() {
        use OrchestratorState::*;
        assert!(Init.can_transition_to(Planning));
        assert!(Planning.can_transition_to(Errored));
        assert!(!Dispatching.can_transition_to(Errored));
        assert!(!Init.can_transition_to(Done));
        assert!(!Done.can_transition_to(Planning));
        assert!(Errored.is_terminal());
    }

    #[test]
    fn illegal_transition_is_ignored() {
        let mut machine = StateMachine::new("GF-1");
        machine.advance(OrchestratorState::Done);
        assert_eq!(machine.current, OrchestratorState::Init);
        assert_eq!(machine.trace, vec![OrchestratorState::Init]);
    }

    #[test]
    fn placeholder_replaced_with_output() {
        let plan = chained_plan("Tell the customer: {prior_output} ({prior_output})");
        let done = vec![SpecialistResult::success(
            0,
            SpecialistId::route_finder(),
            "Find a route",
            "ETA 20 minutes",
        )];
        assert_eq!(
            interpolate_directive(&plan.instructions()[1], &plan, &done),
            "Tell the customer: ETA 20 minutes (ETA 20 minutes)"
        );
    }

    #[test]
    fn failed_dependency_is_marked_unavailable() {
        let plan = chained_plan("Tell the customer: {prior_output}");
        let done = vec![SpecialistResult::failure(
            0,
            SpecialistId::route_finder(),
            "Find a route",
            "timeout",
        )];
        assert_eq!(
            interpolate_directive(&plan.instructions()[1], &plan, &done),
            "Tell the customer: [unavailable: timeout]"
        );
    }

    #[test]
    fn no_placeholder_appends_context() {
        let plan = chained_plan("Tell the customer");
        let done = vec![SpecialistResult::success(
            0,
            SpecialistId::route_finder(),
            "Find a route",
            "ETA 20 minutes",
        )];
        assert_eq!(
            interpolate_directive(&plan.instructions()[1], &plan, &done),
            "Tell the customer\n\nContext from route: ETA 20 minutes"
        );
    }

    #[test]
    fn independent_instruction_is_untouched() {
        let plan = chained_plan("x");
        assert_eq!(
            interpolate_directive(&plan.instructions()[0], &plan, &[]),
            "Find a route"
        );
    }
}
