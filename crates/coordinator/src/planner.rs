//! Planning: turning a disruption into a validated [`Plan`].

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use synapse_common::{
    Disruption, Instruction, Plan, PlanningError, SpecialistId, SynapseError, WorkflowType,
};
use synapse_llm::{ChatMessage, LlmClient, LlmRequest};
use synapse_memory::{Memory, ResolutionMemory};
use synapse_specialists::SpecialistRegistry;
use tracing::{debug, info, warn};

/// Maximum scenario length accepted for planning.
pub const MAX_SCENARIO_LENGTH: usize = 10_000;

/// Past resolutions shown to the reasoning service with each scenario.
pub const RECALLED_RESOLUTIONS: usize = 3;

/// Produces one plan per call. Implementations make at most one reasoning
/// call; retry is the caller's decision.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, disruption: &Disruption) -> Result<Plan, PlanningError>;

    /// Short label for diagnostics, e.g. `keyword` or `llm (gpt-4o)`.
    fn kind(&self) -> String;
}

/// Reject scenarios that cannot be planned before spending a reasoning call.
pub fn validate_scenario(disruption: &Disruption) -> Result<(), PlanningError> {
    let scenario = disruption.scenario_text.trim();
    if scenario.is_empty() {
        return Err(PlanningError::Invalid("scenario_text is empty".into()));
    }
    if scenario.len() > MAX_SCENARIO_LENGTH {
        return Err(PlanningError::Invalid(format!(
            "scenario_text exceeds {} bytes",
            MAX_SCENARIO_LENGTH
        )));
    }
    Ok(())
}

const PLANNER_SYSTEM_PROMPT: &str = r#"You are the planning agent of a last-mile delivery coordinator.
Analyze a delivery disruption and produce an action plan as a single JSON object.

Each instruction targets exactly one specialist from the list you are given and
carries a self-contained directive in plain language. Include every id (customer,
driver, merchant) a specialist needs in its directive.

Use "parallel" when the actions are independent. Use "sequential" when an action
needs the result of an earlier one; give the later instruction a "depends_on"
naming the earlier instruction's id and put the placeholder {prior_output} in its
directive where that result belongs.

Respond ONLY with the JSON object. No prose, no markdown fences."#;

const PLAN_SCHEMA: &str = r#"{
  "thought": "one-line summary of the plan",
  "workflow_type": "sequential | parallel",
  "instructions": [
    {
      "id": "step-1",
      "target_specialist": "<specialist id>",
      "directive": "<what the specialist should do>",
      "depends_on": "<id of an earlier instruction, optional>"
    }
  ]
}"#;

/// Planner backed by a reasoning service.
pub struct LlmPlanner {
    client: Arc<dyn LlmClient>,
    specialists: Vec<(SpecialistId, String)>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    memory: Option<Arc<dyn ResolutionMemory>>,
}

impl LlmPlanner {
    /// The registry is consulted once, here, to describe the specialists in
    /// the prompt.
    pub fn new(client: Arc<dyn LlmClient>, registry: &SpecialistRegistry) -> Self {
        Self {
            client,
            specialists: registry.descriptions(),
            temperature: Some(0.0),
            max_tokens: Some(1024),
            memory: None,
        }
    }

    /// Recall recent successful resolutions into every prompt.
    pub fn with_memory(mut self, memory: Arc<dyn ResolutionMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn recall(&self) -> Vec<Memory> {
        let Some(ref memory) = self.memory else {
            return Vec::new();
        };
        match memory.recall(RECALLED_RESOLUTIONS).await {
            Ok(memories) => memories,
            Err(e) => {
                warn!(error = %e, "Failed to recall past resolutions, planning without them");
                Vec::new()
            }
        }
    }

    fn build_prompt(&self, disruption: &Disruption, past: &[Memory]) -> String {
        let mut prompt = String::from("Available specialists:\n");
        for (id, description) in &self.specialists {
            prompt.push_str(&format!("- {}: {}\n", id, description));
        }

        prompt.push_str(&format!(
            "\nScenario:\n\"{}\"\n",
            disruption.scenario_text.trim()
        ));

        let context = disruption.context_lines();
        if !context.is_empty() {
            prompt.push_str("\nKnown context:\n");
            for line in context {
                prompt.push_str(&format!("- {}\n", line));
            }
        }

        if !past.is_empty() {
            prompt.push_str("\nPlans that worked before:\n");
            for memory in past {
                prompt.push_str(&format!("- {}\n", memory.content));
            }
        }

        prompt.push_str(&format!("\nJSON schema:\n{}\n", PLAN_SCHEMA));
        prompt
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, disruption: &Disruption) -> Result<Plan, PlanningError> {
        validate_scenario(disruption)?;

        let past = self.recall().await;
        let request = LlmRequest {
            system_prompt: Some(PLANNER_SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage::user(self.build_prompt(disruption, &past))],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_mode: true,
        };

        let response = self
            .client
            .complete(request)
            .await
            .map_err(classify_client_error)?;

        debug!(
            model = %response.model,
            reply_len = response.content.len(),
            "Received planning reply"
        );

        let plan = parse_plan(&response.content).inspect_err(|e| {
            warn!(error = %e, "Planning reply rejected");
        })?;

        info!(
            workflow_type = %plan.workflow_type().as_str(),
            instructions = plan.len(),
            "Plan generated"
        );
        Ok(plan)
    }

    fn kind(&self) -> String {
        format!("llm ({})", self.client.model_name())
    }
}

/// Transport failures and transient statuses (429, 5xx) are `Unreachable`
/// and may be retried. Rejected requests and unusable bodies fail the same
/// way every time.
fn classify_client_error(error: SynapseError) -> PlanningError {
    match error {
        SynapseError::ReasoningApi { status, body } if status == 429 || status >= 500 => {
            PlanningError::Unreachable(format!("reasoning service returned {status}: {body}"))
        }
        SynapseError::ReasoningApi { status, body } => {
            PlanningError::Invalid(format!("reasoning request rejected with {status}: {body}"))
        }
        SynapseError::ReasoningResponse(detail) => PlanningError::Malformed(detail),
        other => PlanningError::Unreachable(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    thought: Option<String>,
    workflow_type: String,
    instructions: Vec<RawInstruction>,
}

#[derive(Debug, Deserialize)]
struct RawInstruction {
    #[serde(default)]
    id: Option<String>,
    target_specialist: String,
    directive: String,
    #[serde(default)]
    depends_on: Option<String>,
}

/// Parse and validate a reasoning reply.
///
/// Replies that hold no JSON object, or one that does not parse, are
/// `Malformed`. Objects that break the schema or the plan invariants are
/// `Invalid`. A parallel plan that chains instructions through
/// `depends_on` is run sequentially, since only sequential dispatch can
/// feed one output into the next directive.
pub fn parse_plan(reply: &str) -> Result<Plan, PlanningError> {
    let json = extract_json_object(reply).ok_or_else(|| {
        PlanningError::Malformed(format!(
            "no JSON object in reply: {}",
            reply.chars().take(200).collect::<String>()
        ))
    })?;

    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| PlanningError::Malformed(e.to_string()))?;

    let raw: RawPlan =
        serde_json::from_value(value).map_err(|e| PlanningError::Invalid(e.to_string()))?;

    let mut workflow_type: WorkflowType = raw.workflow_type.parse()?;

    let instructions: Vec<Instruction> = raw
        .instructions
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let id = raw
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("step-{}", index + 1));
            Instruction {
                id,
                target_specialist: SpecialistId::new(raw.target_specialist.trim()),
                directive: raw.directive,
                depends_on: raw.depends_on.filter(|d| !d.trim().is_empty()),
            }
        })
        .collect();

    if workflow_type == WorkflowType::Parallel && instructions.iter().any(|i| i.depends_on.is_some())
    {
        warn!("Parallel plan chains instructions, running it sequentially");
        workflow_type = WorkflowType::Sequential;
    }

    Ok(Plan::new(workflow_type, instructions)?.with_thought(raw.thought.unwrap_or_default()))
}

/// Extract the first balanced JSON object from text that may contain other
/// prose. Braces inside string literals are ignored.
pub fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_common::Result;
    use synapse_llm::LlmResponse;
    use synapse_memory::InMemoryResolutionMemory;
    use synapse_specialists::InMemoryBackend;
    use std::sync::Mutex;

    struct ScriptedClient {
        reply: std::result::Result<String, fn() -> SynapseError>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self::failing_with(|| SynapseError::Reasoning("connection refused".into()))
        }

        fn failing_with(error: fn() -> SynapseError) -> Self {
            Self {
                reply: Err(error),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
            self.requests.lock().unwrap().push(request);
            match self.reply {
                Ok(ref content) => Ok(LlmResponse {
                    content: content.clone(),
                    model: "scripted".into(),
                    usage: None,
                    finish_reason: None,
                }),
                Err(error) => Err(error()),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn planner(client: Arc<ScriptedClient>) -> LlmPlanner {
        let registry = SpecialistRegistry::with_defaults(Arc::new(InMemoryBackend::seeded()));
        LlmPlanner::new(client, &registry)
    }

    const TRAFFIC_PLAN: &str = r#"Here you go:
{"thought": "reroute and tell the customer",
 "workflow_type": "parallel",
 "instructions": [
   {"target_specialist": "route-finder", "directive": "Find a route to 123 Maple St"},
   {"target_specialist": "notification-sender", "directive": "Tell CUST-123 about the delay {sorry}"}
 ]}"#;

    #[test]
    fn extract_json_object_variants() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
        assert_eq!(
            extract_json_object(r#"Sure! {"a":{"b":2}} done"#),
            Some(r#"{"a":{"b":2}}"#)
        );
        assert_eq!(
            extract_json_object(r#"{"a":"}{ \" }"}"#),
            Some(r#"{"a":"}{ \" }"}"#)
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object(r#"{"a":1"#), None);
    }

    #[test]
    fn parse_defaults_ids_and_keeps_thought() {
        let plan = parse_plan(TRAFFIC_PLAN).unwrap();
        assert_eq!(plan.workflow_type(), WorkflowType::Parallel);
        assert_eq!(plan.instructions()[0].id, "step-1");
        assert_eq!(plan.instructions()[1].id, "step-2");
        assert_eq!(
            plan.instructions()[1].target_specialist,
            SpecialistId::notification_sender()
        );
        assert_eq!(plan.thought(), Some("reroute and tell the customer"));
    }

    #[test]
    fn parse_classifies_failures() {
        assert!(matches!(parse_plan("I cannot help"), Err(PlanningError::Malformed(_))));
        assert!(matches!(parse_plan("{not: json}"), Err(PlanningError::Malformed(_))));
        assert!(matches!(
            parse_plan(r#"{"workflow_type": "parallel"}"#),
            Err(PlanningError::Invalid(_))
        ));
        assert!(matches!(
            parse_plan(r#"{"workflow_type": "whenever", "instructions": [{"target_specialist": "route-finder", "directive": "x"}]}"#),
            Err(PlanningError::Invalid(_))
        ));
        assert!(matches!(
            parse_plan(r#"{"workflow_type": "parallel", "instructions": []}"#),
            Err(PlanningError::Invalid(_))
        ));
        assert!(matches!(
            parse_plan(r#"{"workflow_type": "sequential", "instructions": [{"target_specialist": "route-finder", "directive": "x", "depends_on": "step-2"}, {"target_specialist": "route-finder", "directive": "y"}]}"#),
            Err(PlanningError::Invalid(_))
        ));
    }

    #[test]
    fn unregistered_specialist_is_not_a_parse_error() {
        let plan = parse_plan(
            r#"{"workflow_type": "parallel", "instructions": [{"target_specialist": "drone-dispatch", "directive": "Fly it over"}]}"#,
        )
        .unwrap();
        assert_eq!(plan.instructions()[0].target_specialist.as_str(), "drone-dispatch");
    }

    #[tokio::test]
    async fn prompt_lists_specialists_and_context() {
        let client = Arc::new(ScriptedClient::replying(TRAFFIC_PLAN));
        let disruption = Disruption::new("Major traffic jam on the bridge")
            .with_order_id("GF-789")
            .with_customer("CUST-123", "Alice");

        let plan = planner(client.clone()).plan(&disruption).await.unwrap();
        assert_eq!(plan.len(), 2);

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].json_mode);
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("- merchant-status-checker:"));
        assert!(prompt.contains("- route-finder:"));
        assert!(prompt.contains("Major traffic jam on the bridge"));
        assert!(prompt.contains("Customer: Alice (CUST-123)"));
    }

    #[tokio::test]
    async fn unreachable_client_maps_to_unreachable() {
        let client = Arc::new(ScriptedClient::failing());
        let err = planner(client.clone())
            .plan(&Disruption::new("Traffic"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Unreachable(_)));
        assert_eq!(client.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn provider_errors_are_classified() {
        async fn classify(error: fn() -> SynapseError) -> PlanningError {
            planner(Arc::new(ScriptedClient::failing_with(error)))
                .plan(&Disruption::new("Traffic"))
                .await
                .unwrap_err()
        }

        assert!(matches!(
            classify(|| SynapseError::ReasoningApi { status: 503, body: "overloaded".into() }).await,
            PlanningError::Unreachable(_)
        ));
        assert!(matches!(
            classify(|| SynapseError::ReasoningApi { status: 429, body: "slow down".into() }).await,
            PlanningError::Unreachable(_)
        ));

        let rejected =
            classify(|| SynapseError::ReasoningApi { status: 401, body: "bad key".into() }).await;
        assert!(matches!(rejected, PlanningError::Invalid(_)));
        assert!(!rejected.is_retryable());

        let garbled = classify(|| SynapseError::ReasoningResponse("expected value".into())).await;
        assert!(matches!(garbled, PlanningError::Malformed(_)));
        assert!(!garbled.is_retryable());
    }

    #[test]
    fn chained_parallel_plan_runs_sequentially() {
        let plan = parse_plan(
            r#"{"workflow_type": "parallel", "instructions": [
                {"id": "route", "target_specialist": "route-finder", "directive": "Find a route"},
                {"id": "notify", "target_specialist": "notification-sender",
                 "directive": "Tell CUST-1: {prior_output}", "depends_on": "route"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(plan.workflow_type(), WorkflowType::Sequential);
        assert_eq!(plan.instructions()[1].depends_on.as_deref(), Some("route"));
    }

    #[tokio::test]
    async fn recent_resolutions_appear_in_prompt() {
        let memory = Arc::new(InMemoryResolutionMemory::new(10));
        for i in 1..=4 {
            memory
                .record(&format!("plan {i}"), &format!("scenario {i}"))
                .await
                .unwrap();
        }

        let client = Arc::new(ScriptedClient::replying(TRAFFIC_PLAN));
        planner(client.clone())
            .with_memory(memory)
            .plan(&Disruption::new("Major traffic jam"))
            .await
            .unwrap();

        let requests = client.requests.lock().unwrap();
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("Plans that worked before:"));
        assert!(prompt.contains("For the problem 'scenario 4', the successful plan was: plan 4"));
        assert!(prompt.contains("scenario 2"));
        assert!(!prompt.contains("scenario 1"));
    }

    #[tokio::test]
    async fn prompt_without_memory_has_no_history() {
        let client = Arc::new(ScriptedClient::replying(TRAFFIC_PLAN));
        planner(client.clone())
            .plan(&Disruption::new("Major traffic jam"))
            .await
            .unwrap();
        let requests = client.requests.lock().unwrap();
        assert!(!requests[0].messages[0].content.contains("Plans that worked before"));
    }

    #[tokio::test]
    async fn blank_or_oversized_scenario_skips_reasoning_call() {
        let client = Arc::new(ScriptedClient::replying(TRAFFIC_PLAN));
        let planner = planner(client.clone());

        assert!(matches!(
            planner.plan(&Disruption::new("   ")).await,
            Err(PlanningError::Invalid(_))
        ));
        assert!(matches!(
            planner.plan(&Disruption::new("x".repeat(MAX_SCENARIO_LENGTH + 1))).await,
            Err(PlanningError::Invalid(_))
        ));
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn kind_names_the_model() {
        let planner = planner(Arc::new(ScriptedClient::replying("{}")));
        assert_eq!(planner.kind(), "llm (scripted)");
    }
}
