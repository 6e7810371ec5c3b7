//! Plan and instruction types produced by the planner.

use crate::PlanningError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier of a registered specialist.
///
/// Open-ended: the registry decides which ids exist, so unknown ids are
/// representable and surface as unroutable instructions at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecialistId(String);

impl SpecialistId {
    pub const NOTIFICATION_SENDER: &'static str = "notification-sender";
    pub const ROUTE_FINDER: &'static str = "route-finder";
    pub const MERCHANT_STATUS_CHECKER: &'static str = "merchant-status-checker";
    pub const MERCHANT_FINDER: &'static str = "merchant-finder";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn notification_sender() -> Self {
        Self::new(Self::NOTIFICATION_SENDER)
    }

    pub fn route_finder() -> Self {
        Self::new(Self::ROUTE_FINDER)
    }

    pub fn merchant_status_checker() -> Self {
        Self::new(Self::MERCHANT_STATUS_CHECKER)
    }

    pub fn merchant_finder() -> Self {
        Self::new(Self::MERCHANT_FINDER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpecialistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpecialistId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Concurrency policy for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowType {
    /// One instruction at a time, in declared order
    Sequential,
    /// All instructions at once, joined before aggregation
    Parallel,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::Sequential => "sequential",
            WorkflowType::Parallel => "parallel",
        }
    }
}

impl std::str::FromStr for WorkflowType {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(WorkflowType::Sequential),
            "parallel" => Ok(WorkflowType::Parallel),
            other => Err(PlanningError::Invalid(format!(
                "workflow_type must be 'sequential' or 'parallel', got '{}'",
                other
            ))),
        }
    }
}

/// One unit of work for one specialist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Unique within the plan
    pub id: String,

    pub target_specialist: SpecialistId,

    /// Natural-language action for the specialist
    pub directive: String,

    /// Earlier instruction whose output feeds this one (sequential only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
}

impl Instruction {
    pub fn new(
        id: impl Into<String>,
        target: impl Into<SpecialistId>,
        directive: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            target_specialist: target.into(),
            directive: directive.into(),
            depends_on: None,
        }
    }

    pub fn depending_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on = Some(id.into());
        self
    }
}

impl From<String> for SpecialistId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A validated plan. Construct with [`Plan::new`], which enforces the
/// structural invariants; fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    workflow_type: WorkflowType,
    instructions: Vec<Instruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<String>,
}

impl Plan {
    /// Validate and build a plan.
    ///
    /// Rejects an empty instruction list, blank directives, blank or duplicate
    /// ids, `depends_on` references that do not point at an earlier
    /// instruction, and any `depends_on` in a parallel plan. Unregistered
    /// specialists are not checked here.
    pub fn new(
        workflow_type: WorkflowType,
        instructions: Vec<Instruction>,
    ) -> Result<Self, PlanningError> {
        if instructions.is_empty() {
            return Err(PlanningError::Invalid("plan has no instructions".into()));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for (index, instruction) in instructions.iter().enumerate() {
            if instruction.id.trim().is_empty() {
                return Err(PlanningError::Invalid(format!(
                    "instruction {} has an empty id",
                    index + 1
                )));
            }
            if instruction.target_specialist.as_str().trim().is_empty() {
                return Err(PlanningError::Invalid(format!(
                    "instruction '{}' has no target_specialist",
                    instruction.id
                )));
            }
            if instruction.directive.trim().is_empty() {
                return Err(PlanningError::Invalid(format!(
                    "instruction '{}' has an empty directive",
                    instruction.id
                )));
            }
            if let Some(ref dep) = instruction.depends_on {
                if workflow_type == WorkflowType::Parallel {
                    return Err(PlanningError::Invalid(format!(
                        "instruction '{}' depends on '{}' but parallel plans cannot chain instructions",
                        instruction.id, dep
                    )));
                }
                if !seen.contains(dep.as_str()) {
                    return Err(PlanningError::Invalid(format!(
                        "instruction '{}' depends on '{}', which is not an earlier instruction",
                        instruction.id, dep
                    )));
                }
            }
            if !seen.insert(instruction.id.as_str()) {
                return Err(PlanningError::Invalid(format!(
                    "duplicate instruction id '{}'",
                    instruction.id
                )));
            }
        }

        Ok(Self {
            workflow_type,
            instructions,
            thought: None,
        })
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        let thought = thought.into();
        self.thought = (!thought.trim().is_empty()).then_some(thought);
        self
    }

    pub fn workflow_type(&self) -> WorkflowType {
        self.workflow_type
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn thought(&self) -> Option<&str> {
        self.thought.as_deref()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Position of the instruction with the given id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.instructions.iter().position(|i| i.id == id)
    }

    /// One-line description of the plan, used for memory summaries.
    pub fn summary(&self) -> String {
        let steps = self
            .instructions
            .iter()
            .map(|i| format!("{} -> {}", i.target_specialist, i.directive))
            .collect::<Vec<_>>()
            .join("; ");
        format!("[{}] {}", self.workflow_type.as_str(), steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notify(id: &str) -> Instruction {
        Instruction::new(id, SpecialistId::NOTIFICATION_SENDER, "Tell the customer")
    }

    #[test]
    fn builds_valid_plan() {
        let plan = Plan::new(
            WorkflowType::Sequential,
            vec![
                Instruction::new("step-1", SpecialistId::ROUTE_FINDER, "Find a route"),
                notify("step-2").depending_on("step-1"),
            ],
        )
        .unwrap()
        .with_thought("route first, then notify");

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.workflow_type(), WorkflowType::Sequential);
        assert_eq!(plan.position("step-2"), Some(1));
        assert_eq!(plan.thought(), Some("route first, then notify"));
    }

    #[test]
    fn rejects_empty_plan() {
        let err = Plan::new(WorkflowType::Parallel, vec![]).unwrap_err();
        assert!(matches!(err, PlanningError::Invalid(_)));
    }

    #[test]
    fn rejects_blank_directive() {
        let err = Plan::new(
            WorkflowType::Parallel,
            vec![Instruction::new("a", SpecialistId::ROUTE_FINDER, "   ")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty directive"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Plan::new(WorkflowType::Parallel, vec![notify("a"), notify("a")]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_forward_dependency() {
        let err = Plan::new(
            WorkflowType::Sequential,
            vec![notify("a").depending_on("b"), notify("b")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("not an earlier instruction"));
    }

    #[test]
    fn rejects_dependency_in_parallel_plan() {
        let err = Plan::new(
            WorkflowType::Parallel,
            vec![
                Instruction::new("route", SpecialistId::ROUTE_FINDER, "Find a route"),
                Instruction::new("notify", SpecialistId::NOTIFICATION_SENDER, "Tell CUST-1: {prior_output}")
                    .depending_on("route"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PlanningError::Invalid(_)));
        assert!(err.to_string().contains("parallel"));
    }

    #[test]
    fn unknown_specialist_is_not_a_validation_error() {
        let plan = Plan::new(
            WorkflowType::Parallel,
            vec![Instruction::new("a", "weather-oracle", "Check the forecast")],
        );
        assert!(plan.is_ok());
    }

    #[test]
    fn workflow_type_parses_case_insensitively() {
        assert_eq!("Parallel".parse::<WorkflowType>().unwrap(), WorkflowType::Parallel);
        assert_eq!(
            " sequential ".parse::<WorkflowType>().unwrap(),
            WorkflowType::Sequential
        );
        assert!("fan-out".parse::<WorkflowType>().is_err());
    }

    #[test]
    fn summary_lists_steps_in_order() {
        let plan = Plan::new(
            WorkflowType::Parallel,
            vec![
                Instruction::new("a", SpecialistId::ROUTE_FINDER, "Find a route"),
                notify("b"),
            ],
        )
        .unwrap();
        assert_eq!(
            plan.summary(),
            "[parallel] route-finder -> Find a route; notification-sender -> Tell the customer"
        );
    }
}
