//! Merchant status checker: reports a kitchen's status and prep time.

use crate::backend::LogisticsBackend;
use crate::ids;
use async_trait::async_trait;
use std::sync::Arc;
use synapse_common::{Result, Specialist, SpecialistId, SynapseError};
use tracing::info;

pub struct MerchantStatusChecker {
    id: SpecialistId,
    backend: Arc<dyn LogisticsBackend>,
}

impl MerchantStatusChecker {
    pub fn new(backend: Arc<dyn LogisticsBackend>) -> Self {
        Self {
            id: SpecialistId::merchant_status_checker(),
            backend,
        }
    }

    /// The first `MERC-...` id in the directive, or the whole directive when
    /// it is nothing but a plain id in another format.
    fn merchant_ref(directive: &str) -> Option<&str> {
        let trimmed = directive.trim();
        ids::merchant_id(trimmed).or_else(|| ids::is_plain_reference(trimmed).then_some(trimmed))
    }
}

#[async_trait]
impl Specialist for MerchantStatusChecker {
    fn id(&self) -> &SpecialistId {
        &self.id
    }

    fn description(&self) -> &str {
        "Checks a merchant's kitchen status and current preparation time. \
         The directive must contain the merchant id (MERC-...)."
    }

    async fn invoke(&self, directive: &str) -> Result<String> {
        let merchant = Self::merchant_ref(directive).ok_or_else(|| {
            SynapseError::Specialist("directive does not name a merchant id".into())
        })?;

        let status = self.backend.merchant_status(merchant).await?;
        info!(merchant = %merchant, status = %status.status, "Merchant status checked");

        Ok(format!(
            "Status: {}. Current prep time is {} minutes.",
            status.status, status.prep_time_minutes
        ))
    }
}
