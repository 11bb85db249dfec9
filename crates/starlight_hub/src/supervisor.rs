//! Sentinel Supervisor (C3): sweeps the registry for stale heartbeats on a
//! fixed interval, logging DEGRADED/GONE transitions and dropping pending
//! votes from a Sentinel that disappears mid-command.

use crate::orchestrator::Orchestrator;
use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Runs until the process exits; intended to be spawned once at startup.
pub async fn run(registry: Registry, orchestrator: Arc<Orchestrator>, heartbeat_timeout: Duration) {
    let mut ticker = tokio::time::interval(heartbeat_timeout / 2);
    loop {
        ticker.tick().await;
        let (degraded, gone) = registry.sweep_heartbeats(heartbeat_timeout).await;

        for id in &degraded {
            warn!(sentinel = %id, "heartbeat stale, marking DEGRADED");
        }
        for id in &gone {
            warn!(sentinel = %id, "heartbeat timed out twice over, removing Sentinel");
        }

        if !gone.is_empty() {
            if let Some(channel) = orchestrator.active_channel().await {
                for id in &gone {
                    if channel.current_hijacker().as_ref() == Some(id) {
                        info!(sentinel = %id, "dropping in-flight hijack held by a Sentinel that went GONE");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::context::ContextStore;
    use crate::driver::NullBrowserDriver;
    use crate::entropy::EntropyMonitor;
    use crate::registry::SentinelRecord;
    use crate::trace::TraceRecorder;
    use starlight_ids::SentinelId;
    use starlight_protocol::SentinelState;
    use starlight_security::{PiiGuard, PiiMode};
    use std::collections::{HashMap, HashSet};
    use std::time::Instant;
    use tokio::sync::mpsc;

    fn test_config() -> HubConfig {
        HubConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            sync_budget_secs: 2,
            mission_timeout_secs: 5,
            heartbeat_timeout_secs: 1,
            lock_ttl_secs: 5,
            entropy_throttle_ms: 50,
            settlement_window_ms: 500,
            screenshot_max_age_ms: 2_000,
            trace_max_events: 100,
            auth_token: String::new(),
            predictive_wait_ms: 1_000,
            bucket_size_ms: 5,
            max_veto_count: 3,
            pii_mode: "alert".to_string(),
            pii_patterns: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn sweep_removes_a_sentinel_whose_heartbeat_never_arrives() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = SentinelId::new();
        registry
            .register(SentinelRecord {
                id: id.clone(),
                layer: "Slow".to_string(),
                priority: 1,
                capabilities: HashSet::new(),
                selectors: Vec::new(),
                state: SentinelState::Ready,
                last_heartbeat: Instant::now() - Duration::from_secs(10),
                last_entropy: None,
                last_health: None,
                registered_at: Instant::now(),
                outbound: tx,
            })
            .await;

        let orchestrator = Arc::new(Orchestrator::new(
            registry.clone(),
            Arc::new(EntropyMonitor::new(Duration::from_millis(10))),
            Arc::new(TraceRecorder::new(100)),
            Arc::new(ContextStore::new()),
            Arc::new(PiiGuard::new(PiiMode::Alert, HashMap::new())),
            Arc::new(NullBrowserDriver),
            test_config(),
        ));

        let heartbeat_timeout = Duration::from_millis(20);
        let sweep = tokio::spawn(run(registry.clone(), orchestrator, heartbeat_timeout));
        tokio::time::sleep(Duration::from_millis(60)).await;
        sweep.abort();

        assert!(registry.get(&id).await.is_none());
    }
}
