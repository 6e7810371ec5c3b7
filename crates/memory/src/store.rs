//! Resolution memory stores.

use crate::types::{Memory, MemoryConfig};
use async_trait::async_trait;
use std::collections::VecDeque;
use synapse_common::Result;
use tokio::sync::RwLock;
use tracing::debug;

/// Long-term memory of successful resolutions.
///
/// Writes and reads are best-effort: callers log failures and carry on.
#[async_trait]
pub trait ResolutionMemory: Send + Sync {
    async fn record(&self, summary: &str, scenario: &str) -> Result<()>;

    /// Up to `limit` entries, newest first.
    async fn recall(&self, limit: usize) -> Result<Vec<Memory>>;
}

/// Bounded window of the most recent resolutions.
pub struct InMemoryResolutionMemory {
    capacity: usize,
    entries: RwLock<VecDeque<Memory>>,
}

impl InMemoryResolutionMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::new()),
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Entries, oldest first.
    pub async fn recent(&self) -> Vec<Memory> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for InMemoryResolutionMemory {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

#[async_trait]
impl ResolutionMemory for InMemoryResolutionMemory {
    async fn record(&self, summary: &str, scenario: &str) -> Result<()> {
        let memory = Memory::resolution(summary, scenario);
        debug!(memory_id = %memory.id, "Recording resolution");

        let mut entries = self.entries.write().await;
        entries.push_back(memory);
        while entries.len() > self.capacity {
            if let Some(evicted) = entries.pop_front() {
                debug!(memory_id = %evicted.id, "Evicted from resolution memory");
            }
        }
        Ok(())
    }

    async fn recall(&self, limit: usize) -> Result<Vec<Memory>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
