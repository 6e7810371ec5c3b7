//! Lookup table from specialist id to implementation.

use crate::backend::LogisticsBackend;
use crate::finder::MerchantFinder;
use crate::merchant::MerchantStatusChecker;
use crate::notification::NotificationSender;
use crate::route::RouteFinder;
use std::collections::HashMap;
use std::sync::Arc;
use synapse_common::{Specialist, SpecialistId};
use tracing::debug;

/// Read-only after construction; shared across concurrent resolutions.
#[derive(Clone, Default)]
pub struct SpecialistRegistry {
    specialists: HashMap<SpecialistId, Arc<dyn Specialist>>,
}

impl SpecialistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in specialists sharing one backend.
    pub fn with_defaults(backend: Arc<dyn LogisticsBackend>) -> Self {
        Self::new()
            .with(Arc::new(NotificationSender::new(backend.clone())))
            .with(Arc::new(RouteFinder::new(backend.clone())))
            .with(Arc::new(MerchantStatusChecker::new(backend.clone())))
            .with(Arc::new(MerchantFinder::new(backend)))
    }

    /// Register a specialist, replacing any previous one with the same id.
    pub fn with(mut self, specialist: Arc<dyn Specialist>) -> Self {
        self.register(specialist);
        self
    }

    pub fn register(&mut self, specialist: Arc<dyn Specialist>) {
        let id = specialist.id().clone();
        debug!(specialist = %id, "Registering specialist");
        self.specialists.insert(id, specialist);
    }

    pub fn get(&self, id: &SpecialistId) -> Option<Arc<dyn Specialist>> {
        self.specialists.get(id).cloned()
    }

    pub fn contains(&self, id: &SpecialistId) -> bool {
        self.specialists.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<SpecialistId> {
        let mut ids: Vec<_> = self.specialists.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// `(id, description)` pairs sorted by id, for planner prompts.
    pub fn descriptions(&self) -> Vec<(SpecialistId, String)> {
        self.ids()
            .into_iter()
            .filter_map(|id| {
                let description = self.specialists.get(&id)?.description().to_string();
                Some((id, description))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.specialists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specialists.is_empty()
    }
}

impl std::fmt::Debug for SpecialistRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecialistRegistry")
            .field("specialists", &self.ids())
            .finish()
    }
}
