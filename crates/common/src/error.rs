//! Error types for Synapse.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynapseError {
    #[error("Specialist error: {0}")]
    Specialist(String),

    /// The reasoning service could not be reached.
    #[error("Reasoning error: {0}")]
    Reasoning(String),

    /// The reasoning service answered with an error status.
    #[error("Reasoning API error {status}: {body}")]
    ReasoningApi { status: u16, body: String },

    /// The reasoning service answered with a body we could not use.
    #[error("Unexpected reasoning response: {0}")]
    ReasoningResponse(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SynapseError>;

/// Why a disruption could not be turned into a plan.
///
/// Always fatal to the request. Only `Unreachable` is worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    /// The reasoning collaborator could not be reached or returned an error.
    #[error("reasoning collaborator unreachable: {0}")]
    Unreachable(String),

    /// The reply was not parseable as a JSON object.
    #[error("malformed plan output: {0}")]
    Malformed(String),

    /// The reply parsed but broke the plan schema or its invariants.
    #[error("invalid plan: {0}")]
    Invalid(String),
}

impl PlanningError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlanningError::Unreachable(_))
    }

    /// Short machine-readable code for the boundary layer.
    pub fn code(&self) -> &'static str {
        match self {
            PlanningError::Unreachable(_) => "unreachable",
            PlanningError::Malformed(_) => "malformed",
            PlanningError::Invalid(_) => "invalid",
        }
    }
}
