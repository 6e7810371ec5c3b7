//! Notification sender: delivers a message to a customer or driver.

use crate::backend::LogisticsBackend;
use crate::ids;
use async_trait::async_trait;
use std::sync::Arc;
use synapse_common::{Result, Specialist, SpecialistId, SynapseError};
use tracing::info;

/// Recipient used when a directive names nobody in particular.
pub const DEFAULT_RECIPIENT: &str = "customer";

pub struct NotificationSender {
    id: SpecialistId,
    backend: Arc<dyn LogisticsBackend>,
}

impl NotificationSender {
    pub fn new(backend: Arc<dyn LogisticsBackend>) -> Self {
        Self {
            id: SpecialistId::notification_sender(),
            backend,
        }
    }

    /// Customer ids win over driver ids; with neither the order's customer
    /// contact is used.
    fn recipient(directive: &str) -> &str {
        ids::customer_id(directive)
            .or_else(|| ids::driver_id(directive))
            .unwrap_or(DEFAULT_RECIPIENT)
    }
}

#[async_trait]
impl Specialist for NotificationSender {
    fn id(&self) -> &SpecialistId {
        &self.id
    }

    fn description(&self) -> &str {
        "Sends a push notification to a customer or driver. The directive is the message; \
         include the recipient id (CUST-... or DRV-...) when known."
    }

    async fn invoke(&self, directive: &str) -> Result<String> {
        let message = directive.trim();
        if message.is_empty() {
            return Err(SynapseError::Specialist(
                "notification directive is empty".into(),
            ));
        }

        let recipient = Self::recipient(message);
        let receipt = self.backend.send_notification(recipient, message).await?;
        info!(recipient = %recipient, message_id = %receipt.message_id, "Notification sent");

        Ok(format!(
            "Notification sent to {} (message id {}).",
            recipient, receipt.message_id
        ))
    }
}
