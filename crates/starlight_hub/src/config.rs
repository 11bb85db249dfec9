//! Hub configuration: `config.json` keys under the `hub`, `aura`, `pii`
//! prefixes, loaded via [`starlight_protocol::config::RawConfig`].

use starlight_protocol::config::RawConfig;
use starlight_protocol::defaults::*;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub bind_addr: String,
    pub sync_budget_secs: u64,
    pub mission_timeout_secs: u64,
    pub heartbeat_timeout_secs: u64,
    pub lock_ttl_secs: u64,
    pub entropy_throttle_ms: u64,
    pub settlement_window_ms: u64,
    pub screenshot_max_age_ms: u64,
    pub trace_max_events: usize,
    pub auth_token: String,
    pub predictive_wait_ms: u64,
    pub bucket_size_ms: u64,
    pub max_veto_count: u32,
    pub pii_mode: String,
    pub pii_patterns: std::collections::HashMap<String, String>,
}

impl HubConfig {
    /// Load from `config.json` at `path`. Never fails: missing or corrupt
    /// files fall back to defaults; a warning is logged by the caller if
    /// one was produced.
    pub fn load(path: &Path) -> (Self, Option<String>) {
        let outcome = RawConfig::load(path);
        let cfg = &outcome.config;

        let mut pii_patterns = std::collections::HashMap::new();
        for (k, v) in cfg.get_object("pii.patterns") {
            if let Some(s) = v.as_str() {
                pii_patterns.insert(k, s.to_string());
            }
        }

        let config = HubConfig {
            bind_addr: cfg.get_str("hub.bindAddr", DEFAULT_HUB_BIND_ADDR),
            sync_budget_secs: cfg.get_u64("hub.syncBudget", DEFAULT_SYNC_BUDGET_SECS),
            mission_timeout_secs: cfg.get_u64("hub.missionTimeout", DEFAULT_MISSION_TIMEOUT_SECS),
            heartbeat_timeout_secs: cfg.get_u64("hub.heartbeatTimeout", DEFAULT_HEARTBEAT_TIMEOUT_SECS),
            lock_ttl_secs: cfg.get_u64("hub.lockTTL", DEFAULT_LOCK_TTL_SECS),
            entropy_throttle_ms: cfg.get_u64("hub.entropyThrottle", DEFAULT_ENTROPY_THROTTLE_MS),
            settlement_window_ms: cfg.get_u64("sentinel.settlementWindow", DEFAULT_SETTLEMENT_WINDOW_MS),
            screenshot_max_age_ms: cfg.get_u64("hub.screenshotMaxAge", DEFAULT_SCREENSHOT_MAX_AGE_MS),
            trace_max_events: cfg.get_u64("hub.traceMaxEvents", DEFAULT_TRACE_MAX_EVENTS as u64) as usize,
            auth_token: cfg.get_str("hub.security.authToken", ""),
            predictive_wait_ms: cfg.get_u64("aura.predictiveWaitMs", DEFAULT_PREDICTIVE_WAIT_MS),
            bucket_size_ms: cfg.get_u64("aura.bucketSizeMs", DEFAULT_BUCKET_SIZE_MS),
            max_veto_count: cfg.get_u64("sentinel.maxVetoCount", DEFAULT_MAX_VETO_COUNT as u64) as u32,
            pii_mode: cfg.get_str("pii.mode", "alert"),
            pii_patterns,
        };

        (config, outcome.warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_yields_defaults() {
        let (config, warning) = HubConfig::load(Path::new("/nonexistent/config.json"));
        assert!(warning.is_none());
        assert_eq!(config.sync_budget_secs, DEFAULT_SYNC_BUDGET_SECS);
        assert_eq!(config.pii_mode, "alert");
    }
}
