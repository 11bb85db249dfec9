//! Trace Recorder (C9): append-only bounded ring buffer of self-describing
//! events, single-writer.

use serde::Serialize;
use starlight_ids::CommandId;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub command: Option<CommandId>,
    pub kind: String,
    pub payload: serde_json::Value,
}

pub struct TraceRecorder {
    max_events: usize,
    events: Mutex<VecDeque<TraceEvent>>,
}

impl TraceRecorder {
    pub fn new(max_events: usize) -> Self {
        Self {
            max_events: max_events.max(1),
            events: Mutex::new(VecDeque::with_capacity(max_events.min(4096))),
        }
    }

    pub fn record(&self, command: Option<CommandId>, kind: &str, payload: serde_json::Value) {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let event = TraceEvent {
            timestamp_ms,
            command,
            kind: kind.to_string(),
            payload,
        };
        let mut guard = self.events.lock().expect("trace recorder lock poisoned");
        if guard.len() >= self.max_events {
            guard.pop_front();
        }
        guard.push_back(event);
    }

    /// A serialized snapshot of the current buffer, oldest first, for
    /// post-mortem tooling (`mission_trace.json`).
    pub fn snapshot(&self) -> Vec<TraceEvent> {
        self.events.lock().expect("trace recorder lock poisoned").iter().cloned().collect()
    }

    /// Events for a single command, in recorded order.
    pub fn for_command(&self, command: CommandId) -> Vec<TraceEvent> {
        self.events
            .lock()
            .expect("trace recorder lock poisoned")
            .iter()
            .filter(|e| e.command == Some(command))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_evicts_oldest() {
        let recorder = TraceRecorder::new(2);
        recorder.record(None, "a", serde_json::json!({}));
        recorder.record(None, "b", serde_json::json!({}));
        recorder.record(None, "c", serde_json::json!({}));
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].kind, "b");
        assert_eq!(snapshot[1].kind, "c");
    }

    #[test]
    fn for_command_filters_by_command_id() {
        let recorder = TraceRecorder::new(10);
        let cmd = CommandId::new(1);
        recorder.record(Some(cmd), "pre_check", serde_json::json!({}));
        recorder.record(None, "entropy", serde_json::json!({}));
        let events = recorder.for_command(cmd);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "pre_check");
    }
}
