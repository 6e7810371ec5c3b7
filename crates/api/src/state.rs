//! Application state for the API server.

use std::sync::Arc;
use std::time::Instant;
use synapse_common::Result;
use synapse_coordinator::{Orchestrator, SynapseConfig};

/// Shared application state for the API server.
pub struct AppState {
    /// Resolves disruptions; shared by every request
    pub orchestrator: Arc<Orchestrator>,

    /// Server start time (for health checks)
    pub start_time: Instant,
}

impl AppState {
    /// Build the orchestrator and its collaborators from configuration.
    pub fn new(config: &SynapseConfig) -> Result<Self> {
        Ok(Self::with_orchestrator(Arc::new(Orchestrator::from_config(
            config,
        )?)))
    }

    pub fn with_orchestrator(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            start_time: Instant::now(),
        }
    }

    /// Get the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
