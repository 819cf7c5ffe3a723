//! Server configuration.

use std::time::Duration;

use partyroom_room::RegistryConfig;
use serde::{Deserialize, Serialize};

use crate::PartyroomError;

/// Address the server listens on when nothing else is configured.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Everything needed to start a [`PartyroomServer`](crate::PartyroomServer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the WebSocket listener to.
    pub bind_addr: String,

    /// Room capacity and code settings.
    pub registry: RegistryConfig,

    /// Close connections that send nothing for this long. `None` disables
    /// the timeout.
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            registry: RegistryConfig::default(),
            idle_timeout: None,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PARTYROOM_BIND`, `PARTYROOM_MAX_PLAYERS` and
    /// `PARTYROOM_IDLE_TIMEOUT_SECS`.
    ///
    /// # Errors
    /// [`PartyroomError::Config`] if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, PartyroomError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PartyroomError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("PARTYROOM_BIND").filter(|v| !v.is_empty()) {
            config.bind_addr = addr;
        }

        if let Some(val) = lookup("PARTYROOM_MAX_PLAYERS") {
            let n: usize = val.trim().parse().map_err(|_| {
                PartyroomError::Config(format!("PARTYROOM_MAX_PLAYERS is not a number: {val:?}"))
            })?;
            if n == 0 {
                return Err(PartyroomError::Config(
                    "PARTYROOM_MAX_PLAYERS must be at least 1".into(),
                ));
            }
            config.registry.max_players = n;
        }

        if let Some(val) = lookup("PARTYROOM_IDLE_TIMEOUT_SECS") {
            let secs: u64 = val.trim().parse().map_err(|_| {
                PartyroomError::Config(format!(
                    "PARTYROOM_IDLE_TIMEOUT_SECS is not a number: {val:?}"
                ))
            })?;
            // 0 means no timeout
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.registry.max_players, 10);
        assert_eq!(config.idle_timeout, None);
    }

    #[test]
    fn test_server_config_partial_json_fills_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"bind_addr":"0.0.0.0:4000"}"#).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:4000");
        assert_eq!(config.registry, RegistryConfig::default());
        assert_eq!(config.idle_timeout, None);
    }

    #[test]
    fn test_from_lookup_no_vars_is_default() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PARTYROOM_BIND", "0.0.0.0:9000"),
            ("PARTYROOM_MAX_PLAYERS", "4"),
            ("PARTYROOM_IDLE_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.registry.max_players, 4);
        assert_eq!(config.registry.code_length, 6);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_lookup_empty_bind_keeps_default() {
        let config = ServerConfig::from_lookup(lookup(&[("PARTYROOM_BIND", "")])).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_from_lookup_zero_timeout_disables() {
        let config =
            ServerConfig::from_lookup(lookup(&[("PARTYROOM_IDLE_TIMEOUT_SECS", "0")])).unwrap();
        assert_eq!(config.idle_timeout, None);
    }

    #[test]
    fn test_from_lookup_bad_max_players() {
        let err = ServerConfig::from_lookup(lookup(&[("PARTYROOM_MAX_PLAYERS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, PartyroomError::Config(_)));
        assert!(err.to_string().contains("PARTYROOM_MAX_PLAYERS"));

        let err =
            ServerConfig::from_lookup(lookup(&[("PARTYROOM_MAX_PLAYERS", "0")])).unwrap_err();
        assert!(matches!(err, PartyroomError::Config(_)));
    }

    #[test]
    fn test_from_lookup_bad_timeout() {
        let err = ServerConfig::from_lookup(lookup(&[("PARTYROOM_IDLE_TIMEOUT_SECS", "-5")]))
            .unwrap_err();
        assert!(err.to_string().contains("PARTYROOM_IDLE_TIMEOUT_SECS"));
    }
}
