//! Server configuration.

use std::path::Path;
use std::sync::Arc;

use hubchat_hub::{Clock, HubConfig, SystemClock};
use hubchat_protocol::FrameLimits;
use serde::{Deserialize, Serialize};

use crate::HubchatError;

/// Address the server listens on when none is configured.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8081";

/// Everything needed to start a server.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// { "bind_addr": "0.0.0.0:8081", "hub": { "outbound_capacity": 64 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_addr: String,

    /// Hub inbox and per-client queue sizes.
    pub hub: HubConfig,

    /// Command line and message body size limits.
    pub limits: FrameLimits,

    /// Stamp messages in UTC instead of local time.
    pub utc_timestamps: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            hub: HubConfig::default(),
            limits: FrameLimits::default(),
            utc_timestamps: false,
        }
    }
}

impl ServerConfig {
    /// Parses a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, HubchatError> {
        let path = path.as_ref();
        let config_error = |reason: String| HubchatError::Config {
            path: path.display().to_string(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        Self::from_json_str(&raw).map_err(|e| config_error(e.to_string()))
    }

    /// The wall clock matching `utc_timestamps`.
    pub fn clock(&self) -> Arc<dyn Clock> {
        if self.utc_timestamps {
            Arc::new(SystemClock::utc())
        } else {
            Arc::new(SystemClock::local())
        }
    }
}
