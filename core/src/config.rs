//! Settings for the default transport.
//!
//! # Design
//! `TransportConfig` deserializes from any serde source (all fields
//! optional) and can also be read from `COURIER_*` environment variables,
//! mirroring how the mock server picks up `PORT`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Overall timeout per request. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
    /// Headers added to every request that does not already set them.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Some(60),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `COURIER_TIMEOUT_SECS` and `COURIER_USER_AGENT`.
    /// A timeout of `0` disables the timeout; unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(secs) = lookup("COURIER_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok()) {
            config.timeout_secs = (secs > 0).then_some(secs);
        }
        if let Some(user_agent) = lookup("COURIER_USER_AGENT").filter(|v| !v.is_empty()) {
            config.user_agent = user_agent;
        }
        config
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout(), Some(Duration::from_secs(60)));
        assert!(config.user_agent.starts_with("courier/"));
        assert!(config.default_headers.is_empty());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"timeout_secs":5,"default_headers":{"Accept":"application/json"}}"#)
                .unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.default_headers["Accept"], "application/json");
    }

    #[test]
    fn env_overrides() {
        let config = TransportConfig::from_lookup(|key| match key {
            "COURIER_TIMEOUT_SECS" => Some("0".to_string()),
            "COURIER_USER_AGENT" => Some("demo/1.0".to_string()),
            _ => None,
        });
        assert_eq!(config.timeout(), None);
        assert_eq!(config.user_agent, "demo/1.0");
    }

    #[test]
    fn unparsable_env_values_are_ignored() {
        let config = TransportConfig::from_lookup(|key| {
            (key == "COURIER_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config, TransportConfig::default());
    }
}
