//! Route finder: proposes a faster route and an updated ETA.

use crate::backend::LogisticsBackend;
use crate::ids;
use async_trait::async_trait;
use std::sync::Arc;
use synapse_common::{Result, Specialist, SpecialistId, SynapseError};
use tracing::{info, warn};

pub struct RouteFinder {
    id: SpecialistId,
    backend: Arc<dyn LogisticsBackend>,
}

impl RouteFinder {
    pub fn new(backend: Arc<dyn LogisticsBackend>) -> Self {
        Self {
            id: SpecialistId::route_finder(),
            backend,
        }
    }
}

#[async_trait]
impl Specialist for RouteFinder {
    fn id(&self) -> &SpecialistId {
        &self.id
    }

    fn description(&self) -> &str {
        "Finds the fastest alternative route to a destination and reports the new ETA. \
         Mention the driver id (DRV-...) to have the driver rerouted."
    }

    async fn invoke(&self, directive: &str) -> Result<String> {
        let request = directive.trim();
        if request.is_empty() {
            return Err(SynapseError::Specialist("route directive is empty".into()));
        }

        let route = self.backend.find_route(request).await?;
        let mut output = format!(
            "Alternative route found {}. New ETA: {} minutes.",
            route.summary, route.eta_minutes
        );

        // A failed reroute still leaves a usable route estimate.
        if let Some(driver) = ids::driver_id(request) {
            match self.backend.reroute_driver(driver, &route.summary).await {
                Ok(()) => output.push_str(&format!(" Driver {} rerouted.", driver)),
                Err(e) => {
                    warn!(driver = %driver, error = %e, "Driver reroute failed");
                    output.push_str(&format!(" Driver {} could not be rerouted.", driver));
                }
            }
        }

        info!(eta_minutes = route.eta_minutes, "Route found");
        Ok(output)
    }
}
