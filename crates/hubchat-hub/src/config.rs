//! Hub configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// HubConfig
// ---------------------------------------------------------------------------

/// Sizing for the hub's queues.
///
/// Both queues are bounded. A full inbox makes connection handlers wait
/// before posting their next event, which in turn stops them reading from
/// their sockets. A full outbound queue drops messages for that one client
/// instead, so a stalled reader cannot hold up the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Events the hub inbox buffers before posters wait.
    pub inbox_capacity: usize,

    /// Messages each client's outbound queue buffers before new ones are
    /// dropped.
    pub outbound_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: 64,
            outbound_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_config_default() {
        let config = HubConfig::default();
        assert_eq!(config.inbox_capacity, 64);
        assert_eq!(config.outbound_capacity, 256);
    }

    #[test]
    fn test_hub_config_partial_json_keeps_defaults() {
        let config: HubConfig =
            serde_json::from_str(r#"{ "inbox_capacity": 8 }"#).unwrap();
        assert_eq!(config.inbox_capacity, 8);
        assert_eq!(config.outbound_capacity, 256);
    }
}
