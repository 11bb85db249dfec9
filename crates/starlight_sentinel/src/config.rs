//! Sentinel Runtime configuration: `config.json`'s `sentinel.*` keys plus
//! the per-process identity (layer, priority, selectors) a Sentinel binary
//! supplies directly rather than reading from the shared file.

use starlight_protocol::config::RawConfig;
use starlight_protocol::defaults::*;
use std::path::{Path, PathBuf};

/// Everything a [`crate::runtime::SentinelRuntime`] needs to dial, register,
/// and maintain itself. Identity fields (`layer`, `priority`, ...) are set
/// by the calling binary; timing and auth fields are read from
/// `config.json` the same way [`starlight_hub`'s `HubConfig`] is.
#[derive(Debug, Clone)]
pub struct SentinelRuntimeConfig {
    pub hub_url: String,
    pub layer: String,
    pub priority: i32,
    pub selectors: Vec<String>,
    pub capabilities: Vec<String>,
    pub version: String,
    pub auth_token: Option<String>,
    pub reconnect_delay_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub memory_path: PathBuf,
}

impl SentinelRuntimeConfig {
    /// Build a config for `layer`, reading timing and auth settings from
    /// `config.json` at `config_path` (tolerant of a missing/corrupt file)
    /// and writing the persistent memory file to
    /// `{memory_dir}/{layer}_memory.json`.
    pub fn load(
        layer: &str,
        priority: i32,
        hub_url: Option<String>,
        config_path: &Path,
        memory_dir: &Path,
    ) -> (Self, Option<String>) {
        let outcome = RawConfig::load(config_path);
        let cfg = &outcome.config;

        let hub_url = hub_url.unwrap_or_else(|| {
            std::env::var(HUB_URL_ENV)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| DEFAULT_HUB_URL.to_string())
        });
        let auth_token = {
            let token = cfg.get_str("hub.security.authToken", "");
            if token.is_empty() { None } else { Some(token) }
        };

        let config = SentinelRuntimeConfig {
            hub_url,
            layer: layer.to_string(),
            priority,
            selectors: Vec::new(),
            capabilities: Vec::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            auth_token,
            reconnect_delay_secs: cfg.get_u64("sentinel.reconnectDelay", DEFAULT_RECONNECT_DELAY_SECS),
            heartbeat_interval_secs: cfg.get_u64("sentinel.heartbeatInterval", DEFAULT_HEARTBEAT_INTERVAL_SECS),
            memory_path: memory_dir.join(format!("{layer}_memory.json")),
        };

        (config, outcome.warning)
    }

    /// Attach explicit capabilities (e.g. `"vision"`, `"accessibility"`)
    /// that inform the Orchestrator's pre-check enrichment decision.
    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_selectors(mut self, selectors: Vec<String>) -> Self {
        self.selectors = selectors;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_yields_defaults() {
        let (config, warning) = SentinelRuntimeConfig::load(
            "Pulse",
            10,
            Some("ws://localhost:8080".to_string()),
            Path::new("/nonexistent/config.json"),
            Path::new("/tmp"),
        );
        assert!(warning.is_none());
        assert_eq!(config.reconnect_delay_secs, DEFAULT_RECONNECT_DELAY_SECS);
        assert_eq!(config.heartbeat_interval_secs, DEFAULT_HEARTBEAT_INTERVAL_SECS);
        assert!(config.auth_token.is_none());
        assert_eq!(config.memory_path, Path::new("/tmp/Pulse_memory.json"));
    }

    #[test]
    fn hub_url_env_override_is_trimmed() {
        std::env::set_var(HUB_URL_ENV, "ws://example:9999  ");
        let (config, _) = SentinelRuntimeConfig::load(
            "Janitor",
            5,
            None,
            Path::new("/nonexistent/config.json"),
            Path::new("/tmp"),
        );
        std::env::remove_var(HUB_URL_ENV);
        assert_eq!(config.hub_url, "ws://example:9999");
    }
}
