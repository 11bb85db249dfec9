//! Wire types for the Starlight coordination protocol.
//!
//! Every `starlight.*` method has a params type here, plus the
//! records (`VoteRecord`, `CommandOutcome`, `TraceEvent`, ...) the Hub keeps
//! internally and hands back out over the wire or to the trace snapshot.

use serde::{Deserialize, Serialize};
use starlight_ids::{CommandId, SentinelId};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// JSON-RPC 2.0 envelope
// ============================================================================

/// A JSON-RPC 2.0 request or notification frame: inbound to the Hub from a
/// Sentinel, outbound from a Sentinel Runtime for the two calls that expect
/// a matching response (`starlight.registration`, `starlight.challenge_response`).
///
/// `id` is absent for notifications (e.g. `starlight.pulse`); present for
/// calls that expect a matching response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// A JSON-RPC 2.0 response frame: outbound from the Hub, inbound to a
/// Sentinel Runtime replying to its own registration/challenge requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcErrorObject {
                code,
                message: message.into(),
            }),
        }
    }
}

/// An outbound JSON-RPC 2.0 notification (no `id`, no response expected).
#[derive(Debug, Clone, Serialize)]
pub struct RpcNotification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: serde_json::Value,
}

impl RpcNotification {
    pub fn new(method: &'static str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i32,
    pub message: String,
}

// ============================================================================
// Sentinel & command lifecycle enums
// ============================================================================

/// Lifecycle state of a registered Sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentinelState {
    Connecting,
    Challenged,
    Ready,
    Degraded,
    Gone,
}

impl fmt::Display for SentinelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentinelState::Connecting => "CONNECTING",
            SentinelState::Challenged => "CHALLENGED",
            SentinelState::Ready => "READY",
            SentinelState::Degraded => "DEGRADED",
            SentinelState::Gone => "GONE",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle state of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandState {
    Queued,
    AwaitingSettlement,
    PreCheck,
    Voting,
    Hijacked,
    Dispatched,
    RetryBackoff,
    Complete,
    Failed,
    TimedOut,
}

impl CommandState {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            CommandState::Complete | CommandState::Failed | CommandState::TimedOut
        )
    }
}

/// A Sentinel's verdict on a pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Clear,
    Wait,
    Hijack,
}

/// The cause recorded when a command reaches FAILED or TIMED_OUT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Aborted,
    Blocked,
    DriverCrash,
    NotFound,
    Obstructed,
    StaleIntent,
}

/// Action verbs a Sentinel may invoke via `starlight.action` while
/// HIJACKED, and the kind of a top-level command dispatched to the
/// browser driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionVerb {
    Goto,
    Click,
    Fill,
    Select,
    Hover,
    Check,
    Uncheck,
    Scroll,
    Press,
    Type,
    Upload,
    Evaluate,
    DispatchEvent,
    GetPageText,
    GetUrl,
    GetCookies,
    SetCookies,
    GetStorage,
    SetStorage,
    Screenshot,
}

// ============================================================================
// Hub-directed method params (Sentinel -> Hub)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationParams {
    pub layer: String,
    pub priority: i32,
    #[serde(default)]
    pub selectors: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "authToken", skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResult {
    #[serde(rename = "assignedId")]
    pub assigned_id: SentinelId,
    pub challenge: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponseParams {
    pub response: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PulseParams {
    #[serde(default)]
    pub layer: Option<String>,
    #[serde(default)]
    pub entropy: Option<bool>,
    #[serde(default)]
    pub health: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearParams {
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaitParams {
    #[serde(default, rename = "retryAfterMs")]
    pub retry_after_ms: Option<u64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HijackParams {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeParams {
    pub re_check: bool,
    /// Terminate the command as blocked instead of dispatching it — a final
    /// denial (e.g. a compliance block) rather than a transient obstacle.
    #[serde(default)]
    pub abort: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionParams {
    pub action: ActionVerb,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextUpdateParams {
    pub context: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidetalkParams {
    pub from: String,
    pub to: String,
    pub topic: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, rename = "replyTo")]
    pub reply_to: Option<String>,
}

/// Wildcard recipient for a broadcast side-talk message.
pub const SIDETALK_BROADCAST: &str = "*";

// ============================================================================
// Sentinel-directed payloads (Hub -> Sentinel)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockingElement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(rename = "className", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCheckPayload {
    pub command: PreCheckCommand,
    pub url: String,
    #[serde(default)]
    pub blocking: Vec<BlockingElement>,
    #[serde(default, rename = "targetRect", skip_serializing_if = "Option::is_none")]
    pub target_rect: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_text: Option<String>,
    #[serde(default, rename = "a11y_snapshot", skip_serializing_if = "Option::is_none")]
    pub a11y_snapshot: Option<serde_json::Value>,
    #[serde(default, rename = "stabilityHint", skip_serializing_if = "Option::is_none")]
    pub stability_hint: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCheckCommand {
    pub id: CommandId,
    pub cmd: ActionVerb,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntropyStreamPayload {
    pub entropy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SovereignUpdatePayload {
    pub context: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidetalkAckStatus {
    Delivered,
    Undeliverable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidetalkAckPayload {
    pub status: SidetalkAckStatus,
    #[serde(default, rename = "replyTo", skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(rename = "availableLayers", skip_serializing_if = "Vec::is_empty", default)]
    pub available_layers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandCompletePayload {
    pub command: CommandId,
    pub success: bool,
    #[serde(default, rename = "errorKind", skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

// ============================================================================
// Orchestrator-internal records
// ============================================================================

/// One entry in a command's immutable-after-terminal vote ledger.
#[derive(Debug, Clone, Serialize)]
pub struct VoteRecord {
    pub sentinel_id: SentinelId,
    pub layer: String,
    pub priority: i32,
    pub verdict: Verdict,
    pub confidence: Option<f64>,
    pub timestamp_ms: u64,
    /// Set for WAIT votes that carried a `retryAfterMs`.
    pub retry_after_ms: Option<u64>,
    /// Set for HIJACK votes that carried a reason.
    pub reason: Option<String>,
}

/// Final result of a command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub screenshot_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Verdict::Hijack).unwrap(), "\"hijack\"");
    }

    #[test]
    fn sentinel_state_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&SentinelState::Degraded).unwrap(),
            "\"DEGRADED\""
        );
    }

    #[test]
    fn action_verb_round_trips() {
        let v = ActionVerb::DispatchEvent;
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"dispatch_event\"");
        let back: ActionVerb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn command_state_terminal_classification() {
        assert!(CommandState::Complete.is_terminal());
        assert!(CommandState::Failed.is_terminal());
        assert!(CommandState::TimedOut.is_terminal());
        assert!(!CommandState::Voting.is_terminal());
    }

    #[test]
    fn rpc_request_allows_missing_id_for_notifications() {
        let raw = r#"{"jsonrpc":"2.0","method":"starlight.pulse","params":{}}"#;
        let req: RpcRequest = serde_json::from_str(raw).unwrap();
        assert!(req.id.is_none());
        assert_eq!(req.method, "starlight.pulse");
    }
}
