//! Sentinel registry (C2, C3): the Hub's authoritative record of every
//! connected Sentinel, its liveness state, and its connection handle.
//!
//! Many-reader/single-writer over a `RwLock`: the Orchestrator's fan-out
//! reads the table; the Supervisor and the registration handler are the
//! only writers.

use starlight_ids::SentinelId;
use starlight_protocol::SentinelState;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};

/// Outbound channel to a single Sentinel connection's write task.
pub type OutboundSender = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone)]
pub struct SentinelRecord {
    pub id: SentinelId,
    pub layer: String,
    pub priority: i32,
    pub capabilities: HashSet<String>,
    pub selectors: Vec<String>,
    pub state: SentinelState,
    pub last_heartbeat: Instant,
    pub last_entropy: Option<bool>,
    pub last_health: Option<serde_json::Value>,
    pub registered_at: Instant,
    #[allow(dead_code)]
    pub outbound: OutboundSender,
}

impl SentinelRecord {
    pub fn is_ready(&self) -> bool {
        self.state == SentinelState::Ready
    }
}

/// The Sentinel registry. Cheap to clone (wraps an `Arc`).
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RwLock<HashMap<SentinelId, SentinelRecord>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a freshly challenged Sentinel. If another record already
    /// holds the same layer name, it is removed and returned so the caller
    /// can close its connection with reason `superseded`.
    pub async fn register(&self, record: SentinelRecord) -> Option<SentinelRecord> {
        let mut guard = self.inner.write().await;
        let superseded_id = guard
            .values()
            .find(|r| r.layer == record.layer && r.id != record.id)
            .map(|r| r.id.clone());
        let superseded = superseded_id.and_then(|id| guard.remove(&id));
        let key = record.id.clone();
        guard.insert(key, record);
        superseded
    }

    pub async fn remove(&self, id: &SentinelId) -> Option<SentinelRecord> {
        self.inner.write().await.remove(id)
    }

    pub async fn get(&self, id: &SentinelId) -> Option<SentinelRecord> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn set_state(&self, id: &SentinelId, state: SentinelState) {
        if let Some(record) = self.inner.write().await.get_mut(id) {
            record.state = state;
        }
    }

    pub async fn touch_heartbeat(&self, id: &SentinelId, entropy: Option<bool>, health: Option<serde_json::Value>) {
        if let Some(record) = self.inner.write().await.get_mut(id) {
            record.last_heartbeat = Instant::now();
            if entropy.is_some() {
                record.last_entropy = entropy;
            }
            if health.is_some() {
                record.last_health = health;
            }
        }
    }

    /// Every currently READY Sentinel, ordered by priority (ascending) then
    /// registration order — the order votes are considered in ties.
    pub async fn ready_sentinels(&self) -> Vec<SentinelRecord> {
        let guard = self.inner.read().await;
        let mut ready: Vec<SentinelRecord> = guard.values().filter(|r| r.is_ready()).cloned().collect();
        ready.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.registered_at.cmp(&b.registered_at)));
        ready
    }

    pub async fn find_by_layer(&self, layer: &str) -> Option<SentinelRecord> {
        self.inner.read().await.values().find(|r| r.layer == layer).cloned()
    }

    pub async fn available_layers(&self) -> Vec<String> {
        self.inner
            .read()
            .await
            .values()
            .filter(|r| r.is_ready())
            .map(|r| r.layer.clone())
            .collect()
    }

    /// Sweep for stale heartbeats. Returns `(degraded, gone)` ids for the
    /// caller to log and, for `gone`, drop pending votes from.
    pub async fn sweep_heartbeats(
        &self,
        heartbeat_timeout: Duration,
    ) -> (Vec<SentinelId>, Vec<SentinelId>) {
        let mut guard = self.inner.write().await;
        let now = Instant::now();
        let mut degraded = Vec::new();
        let mut gone = Vec::new();
        let mut to_remove = Vec::new();

        for record in guard.values_mut() {
            if record.state != SentinelState::Ready && record.state != SentinelState::Degraded {
                continue;
            }
            let elapsed = now.duration_since(record.last_heartbeat);
            if elapsed >= heartbeat_timeout * 2 {
                gone.push(record.id.clone());
                to_remove.push(record.id.clone());
            } else if elapsed >= heartbeat_timeout && record.state == SentinelState::Ready {
                record.state = SentinelState::Degraded;
                degraded.push(record.id.clone());
            }
        }

        for id in &to_remove {
            guard.remove(id);
        }

        (degraded, gone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_record(id: SentinelId, layer: &str, priority: i32) -> SentinelRecord {
        let (tx, _rx) = mpsc::unbounded_channel();
        SentinelRecord {
            id,
            layer: layer.to_string(),
            priority,
            capabilities: HashSet::new(),
            selectors: Vec::new(),
            state: SentinelState::Ready,
            last_heartbeat: Instant::now(),
            last_entropy: None,
            last_health: None,
            registered_at: Instant::now(),
            outbound: tx,
        }
    }

    #[tokio::test]
    async fn re_registering_a_layer_supersedes_the_old_record() {
        let registry = Registry::new();
        let first = fake_record(SentinelId::new(), "Janitor", 5);
        let first_id = first.id.clone();
        assert!(registry.register(first).await.is_none());

        let second = fake_record(SentinelId::new(), "Janitor", 5);
        let superseded = registry.register(second).await;
        assert_eq!(superseded.unwrap().id, first_id);

        assert_eq!(registry.ready_sentinels().await.len(), 1);
    }

    #[tokio::test]
    async fn ready_sentinels_sorted_by_priority() {
        let registry = Registry::new();
        registry.register(fake_record(SentinelId::new(), "V", 7)).await;
        registry.register(fake_record(SentinelId::new(), "J", 5)).await;
        let ready = registry.ready_sentinels().await;
        assert_eq!(ready[0].layer, "J");
        assert_eq!(ready[1].layer, "V");
    }

    #[tokio::test]
    async fn heartbeat_sweep_degrades_then_removes() {
        let registry = Registry::new();
        let record = fake_record(SentinelId::new(), "Slow", 1);
        let id = record.id.clone();
        registry.register(record).await;

        if let Some(r) = registry.inner.write().await.get_mut(&id) {
            r.last_heartbeat = Instant::now() - Duration::from_secs(10);
        }
        let (degraded, gone) = registry.sweep_heartbeats(Duration::from_secs(5)).await;
        assert_eq!(degraded, vec![]);
        assert_eq!(gone, vec![id.clone()]);
        assert!(registry.get(&id).await.is_none());
    }
}
