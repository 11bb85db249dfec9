//! Transport (C1) and Registration & Handshake (C2): the WebSocket accept
//! loop, the two-phase registration handshake, and the JSON-RPC method
//! dispatch table for everything a Sentinel sends the Hub.
//!
//! Each accepted connection gets a reader task (this module's `handle_connection`)
//! and a writer task that owns the sink half and drains an `mpsc` channel —
//! decoupling inbound dispatch from outbound fan-out so the Orchestrator and
//! Side-Talk Router can push frames to a Sentinel without awaiting its socket.

use crate::context::ContextStore;
use crate::orchestrator::{HijackMessage, InboundVote, Orchestrator};
use crate::registry::{Registry, SentinelRecord};
use crate::sidetalk;
use futures_util::{SinkExt, StreamExt};
use starlight_ids::{ChallengeNonce, SentinelId};
use starlight_protocol::{
    ActionParams, ChallengeResponseParams, ClearParams, ContextUpdateParams, ErrorCode,
    HijackParams, ProtocolError, PulseParams, RegistrationParams, RegistrationResult,
    ResumeParams, RpcNotification, RpcRequest, RpcResponse, SentinelState, SidetalkParams,
    WaitParams,
};
use starlight_security::tokens_equal;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Shared state every connection task needs. Cheap to clone.
#[derive(Clone)]
pub struct HubState {
    pub registry: Registry,
    pub orchestrator: Arc<Orchestrator>,
    pub context: Arc<ContextStore>,
    pub auth_token: String,
    pub max_frame_bytes: usize,
}

pub async fn run(bind_addr: &str, state: HubState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "Hub listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "accept error");
                continue;
            }
        };
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, state).await {
                warn!(peer = %peer, error = %e, "connection ended with error");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: HubState) -> anyhow::Result<()> {
    let ws_config = WebSocketConfig {
        max_message_size: Some(state.max_frame_bytes),
        max_frame_size: Some(state.max_frame_bytes),
        ..Default::default()
    };
    let ws = tokio_tungstenite::accept_async_with_config(stream, Some(ws_config)).await?;
    let (mut sink, mut ws_stream) = ws.split();

    // ── Registration (CONNECTING -> CHALLENGED) ────────────────────────────
    let Some(Ok(Message::Text(text))) = ws_stream.next().await else {
        debug!(peer = %peer, "connection closed before registration");
        return Ok(());
    };
    let request: RpcRequest = match serde_json::from_str(&text) {
        Ok(r) => r,
        Err(_) => {
            let _ = sink.send(error_message(serde_json::Value::Null, ErrorCode::ParseError)).await;
            return Ok(());
        }
    };
    if request.method != "starlight.registration" {
        let _ = sink
            .send(error_message(request.id.unwrap_or_default(), ErrorCode::InvalidRequest))
            .await;
        return Ok(());
    }
    let params: RegistrationParams = match serde_json::from_value(request.params) {
        Ok(p) => p,
        Err(_) => {
            let _ = sink
                .send(error_message(request.id.unwrap_or_default(), ErrorCode::InvalidParams))
                .await;
            return Ok(());
        }
    };
    if !tokens_equal(params.auth_token.as_deref().unwrap_or(""), &state.auth_token) {
        warn!(peer = %peer, layer = %params.layer, "registration rejected: bad auth token");
        return Ok(());
    }

    let assigned_id = SentinelId::new();
    let challenge = ChallengeNonce::new();
    let id = request.id.unwrap_or_default();
    let result = RegistrationResult { assigned_id: assigned_id.clone(), challenge: challenge.as_str().to_string() };
    let response = RpcResponse::success(id, serde_json::to_value(&result).unwrap_or_default());
    sink.send(Message::Text(serde_json::to_string(&response)?)).await?;

    // ── Challenge response (CHALLENGED -> READY) ───────────────────────────
    let Some(Ok(Message::Text(text))) = ws_stream.next().await else {
        debug!(peer = %peer, sentinel = %assigned_id, "connection closed before challenge response");
        return Ok(());
    };
    let request: RpcRequest = serde_json::from_str(&text).unwrap_or(RpcRequest {
        jsonrpc: None,
        method: String::new(),
        params: serde_json::Value::Null,
        id: None,
    });
    if request.method != "starlight.challenge_response" {
        return Ok(());
    }
    let challenge_ack: ChallengeResponseParams = match serde_json::from_value(request.params) {
        Ok(p) => p,
        Err(_) => return Ok(()),
    };
    if !tokens_equal(&challenge_ack.response, challenge.as_str()) {
        warn!(peer = %peer, sentinel = %assigned_id, "challenge response mismatch, closing");
        return Ok(());
    }
    let ack_response = RpcResponse::success(
        request.id.unwrap_or_default(),
        serde_json::json!({"assignedId": assigned_id, "state": "READY"}),
    );
    sink.send(Message::Text(serde_json::to_string(&ack_response)?)).await?;

    // ── Writer task: owns the sink, drains the outbound channel ────────────
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let capabilities: HashSet<String> = params.capabilities.into_iter().collect();
    let record = SentinelRecord {
        id: assigned_id.clone(),
        layer: params.layer.clone(),
        priority: params.priority,
        capabilities,
        selectors: params.selectors,
        state: SentinelState::Ready,
        last_heartbeat: Instant::now(),
        last_entropy: None,
        last_health: None,
        registered_at: Instant::now(),
        outbound: outbound_tx.clone(),
    };
    if let Some(superseded) = state.registry.register(record).await {
        info!(layer = %params.layer, superseded = %superseded.id, "superseded an existing Sentinel on the same layer");
        let _ = superseded.outbound.send(serde_json::to_string(&RpcNotification::new(
            "starlight.shutdown",
            serde_json::json!({"reason": "superseded"}),
        ))?);
    }
    info!(sentinel = %assigned_id, layer = %params.layer, "Sentinel READY");

    // ── Steady-state inbound dispatch ──────────────────────────────────────
    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) = dispatch(&text, &assigned_id, &state).await {
                    warn!(sentinel = %assigned_id, error = %e, "dispatch error");
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            _ => {}
        }
    }

    state.registry.remove(&assigned_id).await;
    writer.abort();
    info!(sentinel = %assigned_id, "Sentinel disconnected");
    Ok(())
}

async fn dispatch(text: &str, sentinel_id: &SentinelId, state: &HubState) -> anyhow::Result<()> {
    let request: RpcRequest = serde_json::from_str(text)?;

    if let Err(e) = starlight_security::validate(&request.method, &request.params) {
        let code = match &e {
            ProtocolError::UnknownMethod(_) => ErrorCode::MethodNotFound,
            ProtocolError::SchemaViolation { .. } => ErrorCode::InvalidParams,
            _ => ErrorCode::InvalidRequest,
        };
        warn!(sentinel = %sentinel_id, method = %request.method, error = %e, "rejecting frame");
        reply_error(state, sentinel_id, request.id, code, e.to_string()).await;
        return Ok(());
    }

    match request.method.as_str() {
        "starlight.pulse" => {
            let params: PulseParams = serde_json::from_value(request.params)?;
            state.registry.touch_heartbeat(sentinel_id, params.entropy, params.health).await;
        }
        "starlight.clear" => {
            let params: ClearParams = serde_json::from_value(request.params)?;
            if let Some(channel) = state.orchestrator.active_channel().await {
                channel.send_vote(InboundVote::Clear { sentinel_id: sentinel_id.clone(), confidence: params.confidence });
            }
        }
        "starlight.wait" => {
            let params: WaitParams = serde_json::from_value(request.params)?;
            if let Some(channel) = state.orchestrator.active_channel().await {
                channel.send_vote(InboundVote::Wait {
                    sentinel_id: sentinel_id.clone(),
                    retry_after_ms: params.retry_after_ms,
                    confidence: params.confidence,
                });
            }
        }
        "starlight.hijack" => {
            let params: HijackParams = serde_json::from_value(request.params)?;
            if let Some(channel) = state.orchestrator.active_channel().await {
                match channel.current_hijacker() {
                    Some(existing) if existing != *sentinel_id => {
                        reply_error(
                            state,
                            sentinel_id,
                            request.id,
                            ErrorCode::InvalidRequest,
                            "hijack already held by another Sentinel",
                        )
                        .await;
                    }
                    _ => {
                        channel.send_vote(InboundVote::Hijack { sentinel_id: sentinel_id.clone(), reason: params.reason });
                    }
                }
            }
        }
        "starlight.resume" => {
            let params: ResumeParams = serde_json::from_value(request.params)?;
            if let Some(channel) = state.orchestrator.active_channel().await {
                channel.send_hijack_message(HijackMessage::Resume {
                    sentinel_id: sentinel_id.clone(),
                    re_check: params.re_check,
                    abort: params.abort,
                });
            }
        }
        "starlight.action" => {
            let params: ActionParams = serde_json::from_value(request.params)?;
            if let Some(channel) = state.orchestrator.active_channel().await {
                channel.send_hijack_message(HijackMessage::Action { sentinel_id: sentinel_id.clone(), action: params });
            }
        }
        "starlight.context_update" => {
            let params: ContextUpdateParams = serde_json::from_value(request.params)?;
            let merged = state.context.merge(params.context);
            let notification = RpcNotification::new(
                "starlight.sovereign_update",
                serde_json::to_value(starlight_protocol::SovereignUpdatePayload { context: merged }).unwrap_or_default(),
            );
            broadcast(&state.registry, &notification).await;
        }
        "starlight.sidetalk" => {
            let params: SidetalkParams = serde_json::from_value(request.params)?;
            if let Some(ack) = sidetalk::route(&state.registry, sentinel_id.clone(), &params).await {
                if let Some(record) = state.registry.get(sentinel_id).await {
                    let _ = record.outbound.send(serde_json::to_string(&ack)?);
                }
            }
        }
        "starlight.abort" => {
            state.orchestrator.abort();
        }
        other => {
            warn!(method = %other, "validated method has no dispatch arm");
        }
    }
    Ok(())
}

async fn broadcast(registry: &Registry, notification: &RpcNotification) {
    let frame = match serde_json::to_string(notification) {
        Ok(f) => f,
        Err(_) => return,
    };
    for record in registry.ready_sentinels().await {
        let _ = record.outbound.send(frame.clone());
    }
}

fn error_message(id: serde_json::Value, code: ErrorCode) -> Message {
    let response = RpcResponse::error(id, code.code(), code.message());
    Message::Text(serde_json::to_string(&response).unwrap_or_default())
}

/// Send a JSON-RPC error response back on `sentinel_id`'s own outbound
/// channel, echoing `id` when the inbound frame carried one.
async fn reply_error(
    state: &HubState,
    sentinel_id: &SentinelId,
    id: Option<serde_json::Value>,
    code: ErrorCode,
    message: impl Into<String>,
) {
    let response = RpcResponse::error(id.unwrap_or_default(), code.code(), message.into());
    if let Ok(frame) = serde_json::to_string(&response) {
        if let Some(record) = state.registry.get(sentinel_id).await {
            let _ = record.outbound.send(frame);
        }
    }
}
