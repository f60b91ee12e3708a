//! Sync configuration (YAML + environment)
//!
//! ```yaml
//! version: 1
//! search:
//!   host: search.internal
//!   port: 8108
//!   protocol: https
//!   api_key: secret
//!   connection_timeout_secs: 2
//! queue:
//!   database_path: /var/lib/legisync/queue.db
//! propagation:
//!   policy: log_and_continue
//!   organization_id: clgn330dm000008jvcg5x05k4
//! replay:
//!   retention: mark_consumed
//!   max_retries: 3
//!   retry_base_delay_ms: 500
//! ```
//!
//! Every section is optional. Environment variables override the file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::interceptor::PropagationPolicy;
use crate::projection::DEFAULT_ORGANIZATION_ID;
use crate::replay::{RetentionPolicy, RetryPolicy};

pub const CONFIG_VERSION: u32 = 1;

pub const ENV_CONFIG: &str = "LEGISYNC_CONFIG";
pub const ENV_SEARCH_HOST: &str = "LEGISYNC_SEARCH_HOST";
pub const ENV_SEARCH_PORT: &str = "LEGISYNC_SEARCH_PORT";
pub const ENV_SEARCH_PROTOCOL: &str = "LEGISYNC_SEARCH_PROTOCOL";
pub const ENV_SEARCH_API_KEY: &str = "LEGISYNC_SEARCH_API_KEY";
pub const ENV_QUEUE_PATH: &str = "LEGISYNC_QUEUE_PATH";

/// Top-level configuration, YAML schema v1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Schema version (always 1 for v1)
    pub version: u32,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub propagation: PropagationConfig,

    #[serde(default)]
    pub replay: ReplayConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            search: SearchConfig::default(),
            queue: QueueConfig::default(),
            propagation: PropagationConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            _ => Err(SyncError::config(format!("Unknown protocol: {}", s))),
        }
    }
}

/// Search service connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub api_key: String,
    pub connection_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8108,
            protocol: Protocol::Http,
            api_key: "xyz".to_string(),
            connection_timeout_secs: 2,
        }
    }
}

impl SearchConfig {
    /// `{protocol}://{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub database_path: PathBuf,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("legisync-queue.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropagationConfig {
    pub policy: PropagationPolicy,
    /// Scope identifier injected into every indexed Note
    pub organization_id: String,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            policy: PropagationPolicy::default(),
            organization_id: DEFAULT_ORGANIZATION_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    pub retention: RetentionPolicy,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::default(),
            max_retries: 3,
            retry_base_delay_ms: 500,
        }
    }
}

impl ReplayConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

impl SyncConfig {
    /// Load from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: SyncConfig = serde_yaml::from_str(content)?;

        if config.version != CONFIG_VERSION {
            return Err(SyncError::UnsupportedVersion {
                found: config.version,
                supported: vec![CONFIG_VERSION],
            });
        }

        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` for environment variables.
    ///
    /// `LEGISYNC_CONFIG` selects an optional YAML file; the other variables
    /// override individual settings on top of it.
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG).filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::from_yaml(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_SEARCH_HOST) {
            self.search.host = host;
        }
        if let Some(port) = lookup(ENV_SEARCH_PORT) {
            self.search.port = port.trim().parse().map_err(|e| {
                SyncError::config(format!("{} must be a port number: {}", ENV_SEARCH_PORT, e))
            })?;
        }
        if let Some(protocol) = lookup(ENV_SEARCH_PROTOCOL) {
            self.search.protocol = protocol.trim().parse()?;
        }
        if let Some(api_key) = lookup(ENV_SEARCH_API_KEY) {
            self.search.api_key = api_key;
        }
        if let Some(path) = lookup(ENV_QUEUE_PATH) {
            self.queue.database_path = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.host.trim().is_empty() {
            return Err(SyncError::config("search.host must not be empty"));
        }
        if self.search.port == 0 {
            return Err(SyncError::config("search.port must be non-zero"));
        }
        if self.search.connection_timeout_secs == 0 {
            return Err(SyncError::config(
                "search.connection_timeout_secs must be at least 1",
            ));
        }
        if self.propagation.organization_id.trim().is_empty() {
            return Err(SyncError::config(
                "propagation.organization_id must not be empty",
            ));
        }
        if self.queue.database_path.as_os_str().is_empty() {
            return Err(SyncError::config("queue.database_path must not be empty"));
        }
        Ok(())
    }
}
