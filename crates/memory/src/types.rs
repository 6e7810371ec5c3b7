//! Memory entry and configuration types.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A remembered successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// Unique ID
    pub id: String,

    /// `For the problem '<scenario>', the successful plan was: <summary>`
    pub content: String,

    /// Scenario text the plan was made for
    pub scenario: String,

    /// Creation timestamp (Unix millis)
    pub created_at: u64,
}

impl Memory {
    pub fn resolution(summary: &str, scenario: &str) -> Self {
        Self {
            id: format!("mem_{}", uuid::Uuid::new_v4().simple()),
            content: format!(
                "For the problem '{}', the successful plan was: {}",
                scenario, summary
            ),
            scenario: scenario.to_string(),
            created_at: now_millis(),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Configuration for resolution memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Record successful resolutions at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum entries kept before the oldest is evicted
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_capacity() -> usize {
    100
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            capacity: default_capacity(),
        }
    }
}
