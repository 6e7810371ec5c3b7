//! Rule-based planner used when no reasoning provider is configured.

use crate::planner::{validate_scenario, Planner};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use synapse_common::{Disruption, Instruction, Plan, PlanningError, SpecialistId, WorkflowType};
use tracing::debug;

static ORDERING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bfirst\b.*\bthen\b|\bonce\b").unwrap());

static ALTERNATIVES_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)\b(?:other|alternative|similar)\b.*\b(?:places?|restaurants?|joints?|merchants?|spots?)\b",
    )
    .unwrap()
});

const TRAFFIC_KEYWORDS: &[&str] = &["traffic", "route", "road", "jam", "accident"];
const KITCHEN_KEYWORDS: &[&str] = &["kitchen", "prep", "overload"];

/// Deterministic planner driven by keywords and the structured payload.
///
/// - traffic wording adds a `route-finder` step
/// - a merchant that is not `OPEN`, or kitchen wording, adds a
///   `merchant-status-checker` step for the merchant
/// - asking for other places to order from adds a `merchant-finder` step
/// - the customer is always notified last
/// - ordering wording ("first ... then", "once") makes the plan sequential,
///   chaining each step's output into the next
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordPlanner;

impl KeywordPlanner {
    pub fn new() -> Self {
        Self
    }

    fn mentions_any(text: &str, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| text.contains(k))
    }

    fn route_directive(disruption: &Disruption) -> String {
        let destination = disruption.destination().unwrap_or("the delivery address");
        let mut directive = format!("Find the fastest alternative route to {}", destination);
        if let Some(ref driver) = disruption.driver {
            if !driver.id.trim().is_empty() {
                directive.push_str(&format!(" for driver {}", driver.id.trim()));
            }
        }
        if let Some(ref order_id) = disruption.order_id {
            directive.push_str(&format!(" on order {}", order_id));
        }
        directive
    }

    fn merchant_directive(disruption: &Disruption, merchant_id: &str) -> String {
        match disruption.merchant.as_ref().map(|m| m.name.trim()) {
            Some(name) if !name.is_empty() => format!(
                "Check the kitchen status and prep time for merchant {} ({})",
                merchant_id, name
            ),
            _ => format!(
                "Check the kitchen status and prep time for merchant {}",
                merchant_id
            ),
        }
    }

    fn recipient(disruption: &Disruption) -> String {
        match disruption.customer {
            Some(ref c) if !c.id.trim().is_empty() && !c.name.trim().is_empty() => {
                format!("customer {} ({})", c.id.trim(), c.name.trim())
            }
            Some(ref c) if !c.id.trim().is_empty() => format!("customer {}", c.id.trim()),
            _ => "the customer".to_string(),
        }
    }

    fn notify_directive(disruption: &Disruption, chained: bool) -> String {
        let order = disruption
            .order_id
            .as_deref()
            .map(|id| format!("order {}", id))
            .unwrap_or_else(|| "their order".to_string());
        let mut directive = format!(
            "Notify {} that {} is delayed: {}",
            Self::recipient(disruption),
            order,
            disruption.scenario_text.trim()
        );
        if chained {
            directive.push_str(" Latest update: {prior_output}");
        }
        directive
    }
}

#[async_trait]
impl Planner for KeywordPlanner {
    async fn plan(&self, disruption: &Disruption) -> Result<Plan, PlanningError> {
        validate_scenario(disruption)?;

        let lower = disruption.scenario_text.to_lowercase();
        let ordered = ORDERING_PATTERN.is_match(&lower);

        let mut steps: Vec<(SpecialistId, String)> = Vec::new();

        if Self::mentions_any(&lower, TRAFFIC_KEYWORDS) {
            steps.push((SpecialistId::route_finder(), Self::route_directive(disruption)));
        }

        let merchant_trouble = disruption
            .merchant_status()
            .is_some_and(|status| status != "OPEN")
            || Self::mentions_any(&lower, KITCHEN_KEYWORDS);
        if merchant_trouble {
            if let Some(merchant_id) = disruption.merchant_id() {
                steps.push((
                    SpecialistId::merchant_status_checker(),
                    Self::merchant_directive(disruption, merchant_id),
                ));
            }
        }

        if ALTERNATIVES_PATTERN.is_match(&lower) {
            steps.push((
                SpecialistId::merchant_finder(),
                format!("Find nearby alternatives: {}", disruption.scenario_text.trim()),
            ));
        }

        let chained = ordered && !steps.is_empty();
        steps.push((
            SpecialistId::notification_sender(),
            Self::notify_directive(disruption, chained),
        ));

        let workflow_type = if ordered || steps.len() == 1 {
            WorkflowType::Sequential
        } else {
            WorkflowType::Parallel
        };

        let instructions = steps
            .into_iter()
            .enumerate()
            .map(|(index, (target, directive))| {
                let instruction = Instruction::new(format!("step-{}", index + 1), target, directive);
                if chained && index > 0 {
                    instruction.depending_on(format!("step-{}", index))
                } else {
                    instruction
                }
            })
            .collect();

        let plan = Plan::new(workflow_type, instructions)?
            .with_thought("keyword rules matched the scenario wording");
        debug!(summary = %plan.summary(), "Keyword plan");
        Ok(plan)
    }

    fn kind(&self) -> String {
        "keyword".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(plan: &Plan) -> Vec<&str> {
        plan.instructions()
            .iter()
            .map(|i| i.target_specialist.as_str())
            .collect()
    }

    #[tokio::test]
    async fn traffic_is_parallel_route_and_notify() {
        let disruption: Disruption = serde_json::from_str(
            r#"{"scenario_text": "Major traffic jam", "merchant": {"status": null}}"#,
        )
        .unwrap();

        let plan = KeywordPlanner.plan(&disruption).await.unwrap();
        assert_eq!(plan.workflow_type(), WorkflowType::Parallel);
        assert_eq!(targets(&plan), vec!["route-finder", "notification-sender"]);
        assert!(plan.instructions().iter().all(|i| i.depends_on.is_none()));
    }

    #[tokio::test]
    async fn overloaded_merchant_adds_status_check() {
        let disruption = Disruption::new("The kitchen is overloaded and has a 40-minute prep time.")
            .with_order_id("GF-555")
            .with_customer("CUST-456", "Bob")
            .with_merchant("MERC-789", "Pizza Palace", Some("OVERLOADED"));

        let plan = KeywordPlanner.plan(&disruption).await.unwrap();
        assert_eq!(plan.workflow_type(), WorkflowType::Parallel);
        assert_eq!(
            targets(&plan),
            vec!["merchant-status-checker", "notification-sender"]
        );
        assert!(plan.instructions()[0].directive.contains("MERC-789"));
        assert!(plan.instructions()[1].directive.contains("customer CUST-456 (Bob)"));
        assert!(plan.instructions()[1].directive.contains("order GF-555"));
    }

    #[tokio::test]
    async fn asking_for_alternatives_adds_merchant_search() {
        let disruption = Disruption::new(
            "Kitchen is overloaded. Suggest other pizza places with under a 20-minute wait.",
        )
        .with_merchant("MERC-789", "Pizza Palace", Some("OVERLOADED"));

        let plan = KeywordPlanner.plan(&disruption).await.unwrap();
        assert_eq!(plan.workflow_type(), WorkflowType::Parallel);
        assert_eq!(
            targets(&plan),
            vec!["merchant-status-checker", "merchant-finder", "notification-sender"]
        );
        assert!(plan.instructions()[1].directive.contains("pizza places"));
    }

    #[tokio::test]
    async fn non_open_status_alone_triggers_check() {
        let disruption = Disruption::new("Order is late")
            .with_merchant("MERC-1", "Deli", Some("closed"));
        let plan = KeywordPlanner.plan(&disruption).await.unwrap();
        assert_eq!(targets(&plan)[0], "merchant-status-checker");
    }

    #[tokio::test]
    async fn ordering_words_chain_sequentially() {
        let disruption = Disruption::new(
            "First, find the fastest route for the driver. Once you have the new ETA, then inform the customer.",
        )
        .with_order_id("GF-111")
        .with_customer("CUST-789", "Charlie")
        .with_driver("DRV-456")
        .with_destination("789 Pine Ln");

        let plan = KeywordPlanner.plan(&disruption).await.unwrap();
        assert_eq!(plan.workflow_type(), WorkflowType::Sequential);
        assert_eq!(targets(&plan), vec!["route-finder", "notification-sender"]);

        let route = &plan.instructions()[0];
        assert!(route.directive.contains("789 Pine Ln"));
        assert!(route.directive.contains("DRV-456"));

        let notify = &plan.instructions()[1];
        assert_eq!(notify.depends_on.as_deref(), Some("step-1"));
        assert!(notify.directive.contains("{prior_output}"));
    }

    #[tokio::test]
    async fn anything_else_is_a_single_notification() {
        let plan = KeywordPlanner
            .plan(&Disruption::new("Customer asked for an update"))
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(targets(&plan), vec!["notification-sender"]);
        assert!(plan.instructions()[0].directive.contains("the customer"));
    }

    #[tokio::test]
    async fn blank_scenario_is_invalid() {
        assert!(matches!(
            KeywordPlanner.plan(&Disruption::new("")).await,
            Err(PlanningError::Invalid(_))
        ));
    }
}
