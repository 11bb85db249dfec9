//! User-overridable lifecycle hooks a Sentinel implements.
//!
//! Every method but `on_pre_check` has a no-op default; `on_pre_check` is
//! the only one a Sentinel must implement.

use crate::handle::{CommandContext, SentinelHandle};
use async_trait::async_trait;
use serde_json::Value;
use starlight_protocol::{EntropyStreamPayload, PreCheckPayload, SidetalkAckPayload, SidetalkParams};
use std::collections::HashMap;

#[async_trait]
pub trait SentinelHooks: Send + Sync {
    /// Called once per pre-check fan-out. Must eventually call exactly one
    /// of `ctx.send_clear` / `ctx.send_wait` / `ctx.send_hijack`.
    async fn on_pre_check(&self, ctx: &CommandContext, payload: PreCheckPayload);

    /// Health payload attached to every heartbeat. `None` omits the field.
    async fn verify_health(&self) -> Option<Value> {
        None
    }

    /// A throttled entropy sample pushed while the Orchestrator is awaiting
    /// settlement.
    async fn on_entropy(&self, _handle: &SentinelHandle, _payload: EntropyStreamPayload) {}

    /// The sovereign context store changed.
    async fn on_context_update(&self, _handle: &SentinelHandle, _context: HashMap<String, Value>) {}

    /// A side-talk message addressed to this layer, or a broadcast.
    async fn on_sidetalk(&self, _handle: &SentinelHandle, _params: SidetalkParams) {}

    /// Acknowledgment of a side-talk this Sentinel sent.
    async fn on_sidetalk_ack(&self, _handle: &SentinelHandle, _payload: SidetalkAckPayload) {}

    /// Catch-all for any frame that didn't match a named hook above
    /// (unrecognized methods, raw broadcasts such as `COMMAND_COMPLETE`).
    async fn on_message(&self, _handle: &SentinelHandle, _method: Option<String>, _payload: Value) {}
}
