//! Delivery-platform backend abstraction.
//!
//! Specialists never talk to the platform directly; they go through a
//! [`LogisticsBackend`], with an HTTP implementation for the real platform
//! API and an in-memory one for development and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use synapse_common::{Result, SynapseError};
use tracing::debug;

/// Kitchen status of a merchant as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantStatus {
    pub status: String,
    pub prep_time_minutes: u32,
}

/// An alternative route proposed by the platform's routing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub summary: String,
    pub eta_minutes: u32,
}

/// Acknowledgement for a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationReceipt {
    pub message_id: String,
}

/// A merchant returned by a nearby-merchant search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearbyMerchant {
    pub name: String,
    #[serde(rename = "wait_time")]
    pub wait_time_minutes: u32,
}

/// A notification the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub recipient: String,
    pub message: String,
    pub message_id: String,
}

/// Trait for the platform operations specialists need. Mockable for testing.
#[async_trait]
pub trait LogisticsBackend: Send + Sync {
    async fn send_notification(&self, recipient: &str, message: &str)
        -> Result<NotificationReceipt>;

    async fn find_route(&self, request: &str) -> Result<RouteEstimate>;

    async fn reroute_driver(&self, driver_id: &str, reason: &str) -> Result<()>;

    async fn merchant_status(&self, merchant_id: &str) -> Result<MerchantStatus>;

    /// Merchants serving `cuisine` with at most `max_wait_minutes` wait,
    /// shortest wait first.
    async fn search_merchants(
        &self,
        cuisine: &str,
        max_wait_minutes: u32,
        limit: usize,
    ) -> Result<Vec<NearbyMerchant>>;
}

/// Detours the in-memory router picks from.
const DETOURS: &[&str] = &[
    "via the coastal expressway",
    "via Riverside Drive and the north underpass",
    "via the ring road, avoiding the main bridge",
    "via Station Street and the old market lane",
];

struct Listing {
    name: String,
    cuisine: String,
    wait_time_minutes: u32,
}

/// Self-contained backend with a seeded merchant directory.
///
/// Routes are derived deterministically from the request text so repeated
/// runs produce identical narratives.
pub struct InMemoryBackend {
    merchants: HashMap<String, MerchantStatus>,
    listings: Vec<Listing>,
    sent: Mutex<Vec<SentNotification>>,
    rerouted: Mutex<Vec<String>>,
    next_message_id: AtomicU64,
}

impl InMemoryBackend {
    /// Backend with an empty merchant directory.
    pub fn empty() -> Self {
        Self {
            merchants: HashMap::new(),
            listings: Vec::new(),
            sent: Mutex::new(Vec::new()),
            rerouted: Mutex::new(Vec::new()),
            next_message_id: AtomicU64::new(1),
        }
    }

    /// Backend seeded with the demo merchants.
    pub fn seeded() -> Self {
        Self::empty()
            .with_merchant("MERC-456", "OPEN", 10)
            .with_merchant("MERC-789", "OVERLOADED", 40)
            .with_merchant("MERC-321", "OPEN", 15)
            .with_listing("The Coffee Shop", "coffee", 10)
            .with_listing("Pizza Palace", "pizza", 40)
            .with_listing("SG Noodles", "noodles", 15)
            .with_listing("Slice House", "pizza", 15)
            .with_listing("Napoli Express", "pizza", 18)
            .with_listing("Burger Barn", "burger", 12)
            .with_listing("Patty Shack", "burger", 25)
    }

    /// Add a merchant to the nearby-merchant search index.
    pub fn with_listing(
        mut self,
        name: impl Into<String>,
        cuisine: impl Into<String>,
        wait_time_minutes: u32,
    ) -> Self {
        self.listings.push(Listing {
            name: name.into(),
            cuisine: cuisine.into(),
            wait_time_minutes,
        });
        self
    }

    pub fn with_merchant(
        mut self,
        merchant_id: impl Into<String>,
        status: impl Into<String>,
        prep_time_minutes: u32,
    ) -> Self {
        self.merchants.insert(
            merchant_id.into(),
            MerchantStatus {
                status: status.into(),
                prep_time_minutes,
            },
        );
        self
    }

    /// Notifications accepted so far, oldest first.
    pub fn sent_notifications(&self) -> Vec<SentNotification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Drivers rerouted so far, oldest first.
    pub fn rerouted_drivers(&self) -> Vec<String> {
        self.rerouted.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn fingerprint(text: &str) -> u32 {
        text.bytes()
            .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::seeded()
    }
}

#[async_trait]
impl LogisticsBackend for InMemoryBackend {
    async fn send_notification(
        &self,
        recipient: &str,
        message: &str,
    ) -> Result<NotificationReceipt> {
        let message_id = format!(
            "msg-{:04}",
            self.next_message_id.fetch_add(1, Ordering::SeqCst)
        );
        debug!(recipient = %recipient, message_id = %message_id, "Recording notification");

        self.sent
            .lock()
            .map_err(|_| SynapseError::Backend("notification log poisoned".into()))?
            .push(SentNotification {
                recipient: recipient.to_string(),
                message: message.to_string(),
                message_id: message_id.clone(),
            });

        Ok(NotificationReceipt { message_id })
    }

    async fn find_route(&self, request: &str) -> Result<RouteEstimate> {
        let fp = Self::fingerprint(request);
        Ok(RouteEstimate {
            summary: DETOURS[fp as usize % DETOURS.len()].to_string(),
            eta_minutes: 12 + fp % 19,
        })
    }

    async fn reroute_driver(&self, driver_id: &str, _reason: &str) -> Result<()> {
        self.rerouted
            .lock()
            .map_err(|_| SynapseError::Backend("reroute log poisoned".into()))?
            .push(driver_id.to_string());
        Ok(())
    }

    async fn merchant_status(&self, merchant_id: &str) -> Result<MerchantStatus> {
        self.merchants
            .get(merchant_id)
            .cloned()
            .ok_or_else(|| SynapseError::Backend(format!("unknown merchant {}", merchant_id)))
    }

    async fn search_merchants(
        &self,
        cuisine: &str,
        max_wait_minutes: u32,
        limit: usize,
    ) -> Result<Vec<NearbyMerchant>> {
        let mut matches: Vec<&Listing> = self
            .listings
            .iter()
            .filter(|l| l.cuisine.eq_ignore_ascii_case(cuisine.trim()))
            .filter(|l| l.wait_time_minutes <= max_wait_minutes)
            .collect();
        matches.sort_by(|a, b| {
            a.wait_time_minutes
                .cmp(&b.wait_time_minutes)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(matches
            .into_iter()
            .take(limit)
            .map(|l| NearbyMerchant {
                name: l.name.clone(),
                wait_time_minutes: l.wait_time_minutes,
            })
            .collect())
    }
}
