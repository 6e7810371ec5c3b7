//! Per-instruction results and the final resolution.

use crate::plan::{SpecialistId, WorkflowType};
use crate::PlanningError;
use serde::{Deserialize, Serialize};

/// Error detail recorded for an instruction whose specialist is not registered.
pub const UNROUTABLE: &str = "unroutable";
/// Error detail recorded for an invocation that exceeded its time budget.
pub const TIMEOUT: &str = "timeout";
/// Error detail recorded for an invocation whose task panicked.
pub const PANICKED: &str = "panicked";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failure,
}

/// Outcome of one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistResult {
    /// Position of the instruction in the plan
    pub instruction_index: usize,

    pub specialist_id: SpecialistId,

    /// Directive as actually sent, after interpolation
    pub directive: String,

    pub status: ResultStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    #[serde(default)]
    pub duration_ms: u64,
}

impl SpecialistResult {
    pub fn success(
        instruction_index: usize,
        specialist_id: SpecialistId,
        directive: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            instruction_index,
            specialist_id,
            directive: directive.into(),
            status: ResultStatus::Success,
            output: Some(output.into()),
            error_detail: None,
            duration_ms: 0,
        }
    }

    pub fn failure(
        instruction_index: usize,
        specialist_id: SpecialistId,
        directive: impl Into<String>,
        error_detail: impl Into<String>,
    ) -> Self {
        Self {
            instruction_index,
            specialist_id,
            directive: directive.into(),
            status: ResultStatus::Failure,
            output: None,
            error_detail: Some(error_detail.into()),
            duration_ms: 0,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// Output on success, error detail on failure.
    pub fn text(&self) -> &str {
        match self.status {
            ResultStatus::Success => self.output.as_deref().unwrap_or_default(),
            ResultStatus::Failure => self.error_detail.as_deref().unwrap_or_default(),
        }
    }

    /// Narrative line: `<specialist_id>: <output-or-error_detail>`.
    ///
    /// Multi-line text is folded onto the one line so the narrative keeps
    /// exactly one line per instruction.
    pub fn line(&self) -> String {
        let text = self
            .text()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        format!("{}: {}", self.specialist_id, text)
    }
}

/// Overall outcome of a resolution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Every instruction succeeded
    Resolved,
    /// Some instructions succeeded, some failed
    PartiallyResolved,
    /// Nothing succeeded
    Unresolved,
    /// No plan could be produced
    PlanningFailed,
}

impl ResolutionStatus {
    pub fn from_results(results: &[SpecialistResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        if results.is_empty() || succeeded == 0 {
            ResolutionStatus::Unresolved
        } else if succeeded == results.len() {
            ResolutionStatus::Resolved
        } else {
            ResolutionStatus::PartiallyResolved
        }
    }
}

/// Final merged outcome returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    pub status: ResolutionStatus,

    /// Newline-joined narrative, one line per instruction in plan order
    pub narrative: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<WorkflowType>,

    /// Results in plan order
    #[serde(default)]
    pub results: Vec<SpecialistResult>,
}

impl Resolution {
    /// Resolution for a request whose plan could not be produced.
    pub fn planning_failed(order_id: Option<String>, error: &PlanningError) -> Self {
        Self {
            order_id,
            status: ResolutionStatus::PlanningFailed,
            narrative: format!("Planning failed: {}", error),
            workflow_type: None,
            results: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.status != ResolutionStatus::Resolved
    }

    pub fn failures(&self) -> impl Iterator<Item = &SpecialistResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}
