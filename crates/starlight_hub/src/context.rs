//! Sovereign Context Store (C6): merged key-value map of side-channel
//! facts, single-writer, last-writer-wins per key.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct ContextStore {
    inner: Mutex<HashMap<String, serde_json::Value>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `updates` into the store (key-level overwrite) and return the
    /// full snapshot to broadcast as `starlight.sovereign_update`.
    pub fn merge(&self, updates: HashMap<String, serde_json::Value>) -> HashMap<String, serde_json::Value> {
        let mut guard = self.inner.lock().expect("context store lock poisoned");
        for (k, v) in updates {
            guard.insert(k, v);
        }
        guard.clone()
    }

    pub fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.inner.lock().expect("context store lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_at_key_level() {
        let store = ContextStore::new();
        let mut first = HashMap::new();
        first.insert("accessibility.score".to_string(), serde_json::json!(0.5));
        store.merge(first);

        let mut second = HashMap::new();
        second.insert("accessibility.score".to_string(), serde_json::json!(0.9));
        let merged = store.merge(second);

        assert_eq!(merged.get("accessibility.score"), Some(&serde_json::json!(0.9)));
    }

    #[test]
    fn repeated_identical_update_is_idempotent() {
        let store = ContextStore::new();
        let mut update = HashMap::new();
        update.insert("k".to_string(), serde_json::json!("v"));
        let first = store.merge(update.clone());
        let second = store.merge(update);
        assert_eq!(first, second);
    }
}
