//! Configuration for the orchestrator and its collaborators.
//!
//! # Security
//!
//! - Config file permission validation on Unix systems
//! - Rejects world-readable files containing API keys
//! - Warns about API keys stored in config files

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use synapse_common::{Result, SynapseError};
use synapse_llm::LlmConfig;
use synapse_memory::MemoryConfig;
use synapse_specialists::{HttpBackend, InMemoryBackend, LogisticsBackend};
use tracing::{info, warn};

/// Environment variable holding the delivery-platform API token.
pub const BACKEND_API_KEY_ENV: &str = "SYNAPSE_BACKEND_API_KEY";

/// Top-level configuration. Every section is optional in the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SynapseConfig {
    /// Reasoning provider used by the planner
    pub provider: LlmConfig,

    /// Retry policy around the planning call
    pub planning: RetryPolicy,

    pub dispatch: DispatchConfig,

    pub backend: BackendConfig,

    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on a single specialist invocation
    pub instruction_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            instruction_timeout_ms: 10_000,
        }
    }
}

impl DispatchConfig {
    pub fn instruction_timeout(&self) -> Duration {
        Duration::from_millis(self.instruction_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Seeded, self-contained platform stand-in
    #[default]
    InMemory,
    /// The delivery platform's REST API
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,

    /// Platform API root, e.g. `https://platform.example.com/v1`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bearer token. When absent, read from SYNAPSE_BACKEND_API_KEY.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::InMemory,
            base_url: None,
            api_key: None,
            timeout_ms: 5_000,
        }
    }
}

impl BackendConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var(BACKEND_API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
    }

    /// Build the configured backend.
    pub fn build(&self) -> Result<Arc<dyn LogisticsBackend>> {
        match self.kind {
            BackendKind::InMemory => {
                info!("Using in-memory logistics backend");
                Ok(Arc::new(InMemoryBackend::seeded()))
            }
            BackendKind::Http => {
                let base_url = self.base_url.as_deref().ok_or_else(|| {
                    SynapseError::Config("backend.base_url is required for the http backend".into())
                })?;
                info!(base_url = %base_url, "Using HTTP logistics backend");
                Ok(Arc::new(HttpBackend::new(
                    base_url,
                    self.resolve_api_key(),
                    Duration::from_millis(self.timeout_ms),
                )?))
            }
        }
    }
}

impl SynapseConfig {
    /// Load configuration from a TOML file.
    ///
    /// On Unix the file must be a regular file, must not be world-writable,
    /// and must not be world-readable when it holds an API key.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        validate_config_file_permissions(path)?;

        let config = Self::from_file_unchecked(path)?;

        if config.provider.api_key.is_some() || config.backend.api_key.is_some() {
            warn!(
                "API key found in config file '{}'. For better security, use environment \
                 variables instead (OPENAI_API_KEY, ANTHROPIC_API_KEY, GOOGLE_API_KEY, {}).",
                path.display(),
                BACKEND_API_KEY_ENV
            );
        }

        Ok(config)
    }

    /// Load configuration from a TOML file without permission checks.
    pub fn from_file_unchecked(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Validate config file permissions on Unix systems.
#[cfg(unix)]
fn validate_config_file_permissions(path: &std::path::Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::symlink_metadata(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

    if !metadata.is_file() {
        anyhow::bail!(
            "Config path '{}' is not a regular file. Symlinks and directories are not allowed.",
            path.display()
        );
    }

    let permission_bits = metadata.permissions().mode() & 0o777;

    if permission_bits & 0o002 != 0 {
        anyhow::bail!(
            "Config file '{}' is world-writable (mode {:04o}). Fix with: chmod o-w {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    let content = std::fs::read_to_string(path)?;
    let has_api_key = content.contains("api_key")
        && (content.contains("sk-") || content.contains("key ="));

    if has_api_key && permission_bits & 0o004 != 0 {
        anyhow::bail!(
            "Config file '{}' contains an API key but is world-readable (mode {:04o}). \
             Fix with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    if has_api_key && permission_bits & 0o040 != 0 {
        warn!(
            "Config file '{}' contains an API key and is group-readable (mode {:04o}). \
             Consider restricting access with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    Ok(())
}
