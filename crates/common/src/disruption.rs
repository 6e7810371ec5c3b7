//! Inbound disruption payload.

use serde::{Deserialize, Serialize};

/// A logistics event that needs coordinated corrective action.
///
/// Only `scenario_text` is required; the structured context is whatever the
/// delivery platform knows about the affected order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Disruption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    /// Free-text description of what went wrong
    pub scenario_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<Merchant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<Driver>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_details: Option<DeliveryDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Platform-reported status, e.g. `OPEN` or `OVERLOADED`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub destination_address: String,
}

impl Disruption {
    pub fn new(scenario_text: impl Into<String>) -> Self {
        Self {
            scenario_text: scenario_text.into(),
            ..Default::default()
        }
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_customer(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.customer = Some(Customer {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_merchant(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        status: Option<&str>,
    ) -> Self {
        self.merchant = Some(Merchant {
            id: id.into(),
            name: name.into(),
            status: status.map(str::to_string),
        });
        self
    }

    pub fn with_driver(mut self, id: impl Into<String>) -> Self {
        self.driver = Some(Driver { id: id.into() });
        self
    }

    pub fn with_destination(mut self, address: impl Into<String>) -> Self {
        self.delivery_details = Some(DeliveryDetails {
            destination_address: address.into(),
        });
        self
    }

    /// Merchant status, upper-cased, when the platform reported one.
    pub fn merchant_status(&self) -> Option<String> {
        self.merchant
            .as_ref()
            .and_then(|m| m.status.as_deref())
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
    }

    /// Merchant id, when one was supplied.
    pub fn merchant_id(&self) -> Option<&str> {
        self.merchant
            .as_ref()
            .map(|m| m.id.trim())
            .filter(|id| !id.is_empty())
    }

    pub fn destination(&self) -> Option<&str> {
        self.delivery_details
            .as_ref()
            .map(|d| d.destination_address.as_str())
    }

    /// Structured context rendered one fact per line, for prompts and logs.
    pub fn context_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(ref order_id) = self.order_id {
            lines.push(format!("Order ID: {}", order_id));
        }
        if let Some(ref customer) = self.customer {
            lines.push(format!("Customer: {} ({})", customer.name, customer.id));
        }
        if let Some(ref merchant) = self.merchant {
            let mut line = format!("Merchant: {}", merchant.name.trim());
            if let Some(id) = self.merchant_id() {
                line.push_str(&format!(" ({})", id));
            }
            if let Some(status) = self.merchant_status() {
                line.push_str(&format!(", status {}", status));
            }
            if line != "Merchant: " {
                lines.push(line);
            }
        }
        if let Some(ref driver) = self.driver {
            lines.push(format!("Driver: {}", driver.id));
        }
        if let Some(destination) = self.destination() {
            lines.push(format!("Destination: {}", destination));
        }
        lines
    }
}
