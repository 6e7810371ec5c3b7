//! Core specialist trait.
//!
//! Defined in `synapse-common` so that the specialists crate and the
//! coordinator can both depend on it without depending on each other.

use crate::{Result, SpecialistId};
use async_trait::async_trait;

/// A capability that executes one category of corrective action.
///
/// Implementations may have external side effects (sending a notification)
/// but must not depend on orchestrator-owned state.
#[async_trait]
pub trait Specialist: Send + Sync {
    /// Identifier the registry and plans refer to.
    fn id(&self) -> &SpecialistId;

    /// One-line description shown to the reasoning collaborator.
    fn description(&self) -> &str;

    /// Execute a natural-language directive and return a text result.
    async fn invoke(&self, directive: &str) -> Result<String>;
}
