//! Outbound sending helpers: a cheap-to-clone handle for fire-and-forget
//! notifications to the Hub, and a pre-check-scoped wrapper exposing every
//! verdict/action verb a Sentinel may send from inside `on_pre_check`.

use serde_json::{json, Value};
use starlight_protocol::{ActionVerb, RpcNotification, SIDETALK_BROADCAST};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared by every hook invocation for one connection; cloning is just an
/// `Arc`/channel-sender bump.
#[derive(Clone)]
pub struct SentinelHandle {
    layer: Arc<str>,
    outbound: mpsc::UnboundedSender<String>,
}

impl SentinelHandle {
    pub(crate) fn new(layer: &str, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            layer: Arc::from(layer),
            outbound,
        }
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    fn send(&self, method: &'static str, params: Value) {
        let notification = RpcNotification::new(method, params);
        if let Ok(frame) = serde_json::to_string(&notification) {
            let _ = self.outbound.send(frame);
        }
    }

    /// Heartbeat emission; not part of the public hook-facing API.
    pub(crate) fn send_pulse(&self, health: Option<Value>) -> Result<(), mpsc::error::SendError<String>> {
        let notification = RpcNotification::new(
            "starlight.pulse",
            json!({ "layer": &*self.layer, "entropy": false, "health": health }),
        );
        let frame = serde_json::to_string(&notification).unwrap_or_default();
        self.outbound.send(frame)
    }

    /// Push a context merge; visible to every READY Sentinel.
    pub fn send_context_update(&self, context: HashMap<String, Value>) {
        self.send("starlight.context_update", json!({ "context": context }));
    }

    /// Send a side-talk message. Pass [`SIDETALK_BROADCAST`] as `to` to
    /// reach every other READY Sentinel.
    pub fn send_sidetalk(
        &self,
        to: impl Into<String>,
        topic: impl Into<String>,
        payload: Value,
        reply_to: Option<String>,
    ) {
        self.send(
            "starlight.sidetalk",
            json!({
                "from": &*self.layer,
                "to": to.into(),
                "topic": topic.into(),
                "payload": payload,
                "replyTo": reply_to,
            }),
        );
    }

    /// Broadcast side-talk to every other READY Sentinel; shorthand for
    /// `send_sidetalk(SIDETALK_BROADCAST, ...)`.
    pub fn broadcast_sidetalk(&self, topic: impl Into<String>, payload: Value) {
        self.send_sidetalk(SIDETALK_BROADCAST, topic, payload, None);
    }

    /// Resume dispatch after a hijack, outside the pre-check window that
    /// granted it (e.g. after a background remediation finishes).
    pub fn send_resume(&self, re_check: bool) {
        self.send("starlight.resume", json!({ "re_check": re_check }));
    }
}

/// Scoped to a single active pre-check: every verdict/action method here
/// correlates implicitly with whichever command is currently awaiting
/// votes.
pub struct CommandContext {
    handle: SentinelHandle,
}

impl CommandContext {
    pub(crate) fn new(handle: SentinelHandle) -> Self {
        Self { handle }
    }

    /// The underlying handle, for context updates or side-talk sent while
    /// handling a pre-check.
    pub fn handle(&self) -> &SentinelHandle {
        &self.handle
    }

    pub fn layer(&self) -> &str {
        self.handle.layer()
    }

    /// Approve execution with an optional confidence score (0.0-1.0).
    pub fn send_clear(&self, confidence: Option<f64>) {
        self.handle.send("starlight.clear", json!({ "confidence": confidence }));
    }

    /// Veto execution for `retry_after_ms` with an optional confidence score.
    pub fn send_wait(&self, retry_after_ms: Option<u64>, confidence: Option<f64>) {
        self.handle.send(
            "starlight.wait",
            json!({ "retryAfterMs": retry_after_ms, "confidence": confidence }),
        );
    }

    /// Take control of the page to remediate an obstacle before the
    /// original command is dispatched.
    pub fn send_hijack(&self, reason: impl Into<String>) {
        self.handle.send("starlight.hijack", json!({ "reason": reason.into() }));
    }

    /// Return control after a hijack, optionally asking the Orchestrator
    /// to re-run the pre-check before dispatching the original command.
    pub fn send_resume(&self, re_check: bool) {
        self.handle.send_resume(re_check);
    }

    /// Return control after a hijack and abort the command as blocked
    /// instead of dispatching it — for a final denial, not a transient
    /// obstacle that a re-check could clear.
    pub fn send_abort(&self) {
        self.handle.send("starlight.resume", json!({ "re_check": false, "abort": true }));
    }

    /// Execute an arbitrary action verb via the Hub's browser driver while
    /// HIJACKED.
    pub fn send_action(
        &self,
        action: ActionVerb,
        selector: Option<String>,
        text: Option<String>,
        value: Option<Value>,
        key: Option<String>,
        files: Option<Vec<String>>,
    ) {
        self.handle.send(
            "starlight.action",
            json!({
                "action": action,
                "selector": selector,
                "text": text,
                "value": value,
                "key": key,
                "files": files,
            }),
        );
    }

    pub fn send_click(&self, selector: impl Into<String>) {
        self.send_action(ActionVerb::Click, Some(selector.into()), None, None, None, None);
    }

    pub fn send_fill(&self, selector: impl Into<String>, text: impl Into<String>) {
        self.send_action(ActionVerb::Fill, Some(selector.into()), Some(text.into()), None, None, None);
    }

    pub fn send_select(&self, selector: impl Into<String>, value: Value) {
        self.send_action(ActionVerb::Select, Some(selector.into()), None, Some(value), None, None);
    }

    pub fn send_hover(&self, selector: impl Into<String>) {
        self.send_action(ActionVerb::Hover, Some(selector.into()), None, None, None, None);
    }

    pub fn send_check(&self, selector: impl Into<String>) {
        self.send_action(ActionVerb::Check, Some(selector.into()), None, None, None, None);
    }

    pub fn send_uncheck(&self, selector: impl Into<String>) {
        self.send_action(ActionVerb::Uncheck, Some(selector.into()), None, None, None, None);
    }

    pub fn send_scroll(&self, selector: impl Into<String>) {
        self.send_action(ActionVerb::Scroll, Some(selector.into()), None, None, None, None);
    }

    pub fn send_press(&self, key: impl Into<String>) {
        self.send_action(ActionVerb::Press, None, None, None, Some(key.into()), None);
    }

    pub fn send_type(&self, text: impl Into<String>) {
        self.send_action(ActionVerb::Type, None, Some(text.into()), None, None, None);
    }

    pub fn send_upload(&self, selector: impl Into<String>, files: Vec<String>) {
        self.send_action(ActionVerb::Upload, Some(selector.into()), None, None, None, Some(files));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_context() -> (CommandContext, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SentinelHandle::new("Pulse", tx);
        (CommandContext::new(handle), rx)
    }

    #[test]
    fn send_clear_emits_starlight_clear_notification() {
        let (ctx, mut rx) = test_context();
        ctx.send_clear(Some(0.9));
        let frame = rx.try_recv().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["method"], "starlight.clear");
        assert_eq!(value["params"]["confidence"], 0.9);
    }

    #[test]
    fn send_click_carries_selector_as_an_action_verb() {
        let (ctx, mut rx) = test_context();
        ctx.send_click("#submit");
        let frame = rx.try_recv().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["method"], "starlight.action");
        assert_eq!(value["params"]["action"], "click");
        assert_eq!(value["params"]["selector"], "#submit");
    }

    #[test]
    fn sidetalk_carries_the_sending_layer_as_from() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SentinelHandle::new("Janitor", tx);
        handle.broadcast_sidetalk("obstacle_cleared", json!({"selector": "#modal"}));
        let frame = rx.try_recv().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["params"]["from"], "Janitor");
        assert_eq!(value["params"]["to"], SIDETALK_BROADCAST);
    }
}
