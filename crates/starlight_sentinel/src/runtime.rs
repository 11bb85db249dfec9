//! Connection, reconnect, registration/handshake, heartbeat, and inbound
//! dispatch for a Sentinel process.
//!
//! Dial, register (the challenge arrives on the same read loop that then
//! drives steady-state dispatch), heartbeat on a timer, retry with a fixed
//! delay on any disconnect, flush memory on exit.

use crate::config::SentinelRuntimeConfig;
use crate::error::SentinelRuntimeError;
use crate::handle::{CommandContext, SentinelHandle};
use crate::hooks::SentinelHooks;
use crate::memory::Memory;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use starlight_protocol::{
    ChallengeResponseParams, EntropyStreamPayload, PreCheckPayload, RegistrationParams,
    RegistrationResult, RpcRequest, RpcResponse, SidetalkAckPayload, SidetalkParams,
    SovereignUpdatePayload,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;
use tracing::{debug, info, warn};

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Why a connection attempt ended.
enum ConnectionOutcome {
    /// The socket closed or errored; the caller should wait `reconnect_delay`
    /// and try again.
    Disconnected,
    /// The Hub sent `starlight.shutdown`; the caller should stop retrying.
    ShutdownRequested,
}

/// Drives one Sentinel's entire lifetime: connect, register, run until
/// disconnected or shut down, repeat.
pub struct SentinelRuntime {
    config: SentinelRuntimeConfig,
    hooks: Arc<dyn SentinelHooks>,
    memory: Memory,
}

impl SentinelRuntime {
    pub fn new(config: SentinelRuntimeConfig, hooks: Arc<dyn SentinelHooks>) -> Self {
        let memory = Memory::load(&config.memory_path);
        info!(layer = %config.layer, entries = memory.len(), "loaded persistent memory");
        Self { config, hooks, memory }
    }

    /// Read-only access to this Sentinel's persistent memory.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Mutable access, for hooks that want to record a learned remediation
    /// before the next save (on disconnect, shutdown, or process exit).
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Run until an OS termination signal arrives or the Hub sends
    /// `starlight.shutdown`. Reconnects with a fixed delay on every other
    /// disconnect. Flushes memory to disk on every exit path.
    pub async fn run(mut self) -> Result<(), SentinelRuntimeError> {
        let reconnect_delay = Duration::from_secs(self.config.reconnect_delay_secs);

        loop {
            tokio::select! {
                _ = shutdown_signal() => {
                    info!(layer = %self.config.layer, "shutdown signal received, saving state");
                    break;
                }
                outcome = self.connect_once() => {
                    match outcome {
                        Ok(ConnectionOutcome::ShutdownRequested) => {
                            info!(layer = %self.config.layer, "hub requested shutdown");
                            break;
                        }
                        Ok(ConnectionOutcome::Disconnected) => {
                            info!(layer = %self.config.layer, delay_secs = reconnect_delay.as_secs(), "disconnected, retrying");
                        }
                        Err(e) => {
                            warn!(layer = %self.config.layer, error = %e, delay_secs = reconnect_delay.as_secs(), "connection error, retrying");
                        }
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(reconnect_delay) => {}
                        _ = shutdown_signal() => break,
                    }
                }
            }
        }

        if let Err(e) = self.memory.save(&self.config.memory_path) {
            warn!(layer = %self.config.layer, error = %e, "failed to save memory on exit");
        }
        info!(layer = %self.config.layer, "shutdown complete");
        Ok(())
    }

    async fn connect_once(&mut self) -> Result<ConnectionOutcome, SentinelRuntimeError> {
        info!(layer = %self.config.layer, url = %self.config.hub_url, "connecting to hub");
        let (ws_stream, _) =
            tokio_tungstenite::connect_async(self.config.hub_url.as_str())
                .await
                .map_err(|e| SentinelRuntimeError::Connect { url: self.config.hub_url.clone(), source: e })?;
        let (mut sink, mut stream) = ws_stream.split();

        let registration = match self.handshake(&mut sink, &mut stream).await {
            Ok(r) => r,
            Err(e) => {
                let _ = sink.close().await;
                return Err(e);
            }
        };
        info!(layer = %self.config.layer, sentinel = %registration.assigned_id, "READY");

        let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if sink.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
        });

        let handle = SentinelHandle::new(&self.config.layer, outbound_tx);
        let heartbeat = tokio::spawn(heartbeat_loop(
            handle.clone(),
            self.hooks.clone(),
            self.config.layer.clone(),
            Duration::from_secs(self.config.heartbeat_interval_secs),
        ));

        let outcome = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if dispatch(&text, &handle, self.hooks.as_ref()).await {
                        break ConnectionOutcome::ShutdownRequested;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break ConnectionOutcome::Disconnected,
                Some(Err(e)) => {
                    warn!(layer = %self.config.layer, error = %e, "websocket error");
                    break ConnectionOutcome::Disconnected;
                }
                _ => {}
            }
        };

        heartbeat.abort();
        writer.abort();
        Ok(outcome)
    }

    /// Registration then challenge-response, blocking until READY or the
    /// connection drops.
    async fn handshake(
        &self,
        sink: &mut futures_util::stream::SplitSink<WsStream, Message>,
        stream: &mut futures_util::stream::SplitStream<WsStream>,
    ) -> Result<RegistrationResult, SentinelRuntimeError> {
        let reg_params = RegistrationParams {
            layer: self.config.layer.clone(),
            priority: self.config.priority,
            selectors: self.config.selectors.clone(),
            capabilities: self.config.capabilities.clone(),
            version: Some(self.config.version.clone()),
            auth_token: self.config.auth_token.clone(),
        };
        let reg_request = RpcRequest {
            jsonrpc: Some("2.0".to_string()),
            method: "starlight.registration".to_string(),
            params: serde_json::to_value(&reg_params).unwrap_or_default(),
            id: Some(json!("reg-1")),
        };
        sink.send(Message::Text(serde_json::to_string(&reg_request)?)).await?;
        debug!(layer = %self.config.layer, "registration sent, awaiting challenge");

        let Some(Ok(Message::Text(text))) = stream.next().await else {
            return Err(SentinelRuntimeError::HandshakeIncomplete);
        };
        let response: RpcResponse =
            serde_json::from_str(&text).map_err(|_| SentinelRuntimeError::HandshakeRejected)?;
        let result = response.result.ok_or(SentinelRuntimeError::HandshakeRejected)?;
        let registration: RegistrationResult =
            serde_json::from_value(result).map_err(|_| SentinelRuntimeError::HandshakeRejected)?;

        let challenge_params = ChallengeResponseParams { response: registration.challenge.clone() };
        let challenge_request = RpcRequest {
            jsonrpc: Some("2.0".to_string()),
            method: "starlight.challenge_response".to_string(),
            params: serde_json::to_value(&challenge_params).unwrap_or_default(),
            id: Some(json!("chal-1")),
        };
        sink.send(Message::Text(serde_json::to_string(&challenge_request)?)).await?;

        let Some(Ok(Message::Text(text))) = stream.next().await else {
            return Err(SentinelRuntimeError::HandshakeIncomplete);
        };
        let ack: RpcResponse = serde_json::from_str(&text).map_err(|_| SentinelRuntimeError::HandshakeRejected)?;
        if ack.result.is_none() {
            return Err(SentinelRuntimeError::HandshakeRejected);
        }

        Ok(registration)
    }
}

async fn heartbeat_loop(handle: SentinelHandle, hooks: Arc<dyn SentinelHooks>, layer: String, interval: Duration) {
    loop {
        let health = hooks.verify_health().await;
        if handle.send_pulse(health).is_err() {
            debug!(layer = %layer, "heartbeat stopped: connection closed");
            break;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Dispatch one inbound frame to the matching hook. Returns `true` if the
/// frame was a shutdown request, signalling the caller to stop reconnecting.
async fn dispatch(text: &str, handle: &SentinelHandle, hooks: &(dyn SentinelHooks)) -> bool {
    let request: RpcRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "received malformed JSON, ignoring");
            return false;
        }
    };

    match request.method.as_str() {
        "starlight.pre_check" => {
            let Ok(payload) = serde_json::from_value::<PreCheckPayload>(request.params) else {
                warn!("malformed starlight.pre_check payload, ignoring");
                return false;
            };
            let ctx = CommandContext::new(handle.clone());
            hooks.on_pre_check(&ctx, payload).await;
        }
        "starlight.shutdown" => {
            info!(layer = %handle.layer(), "shutdown notification received");
            return true;
        }
        "starlight.entropy_stream" => {
            if let Ok(payload) = serde_json::from_value::<EntropyStreamPayload>(request.params) {
                hooks.on_entropy(handle, payload).await;
            }
        }
        "starlight.sovereign_update" => {
            if let Ok(payload) = serde_json::from_value::<SovereignUpdatePayload>(request.params) {
                hooks.on_context_update(handle, payload.context).await;
            }
        }
        "starlight.sidetalk" => {
            if let Ok(params) = serde_json::from_value::<SidetalkParams>(request.params) {
                hooks.on_sidetalk(handle, params).await;
            }
        }
        "starlight.sidetalk_ack" => {
            if let Ok(payload) = serde_json::from_value::<SidetalkAckPayload>(request.params) {
                hooks.on_sidetalk_ack(handle, payload).await;
            }
        }
        other => {
            let method = if other.is_empty() { None } else { Some(other.to_string()) };
            hooks.on_message(handle, method, request.params).await;
        }
    }
    false
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::SentinelHandle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct RecordingHooks {
        pre_checks: AtomicUsize,
        context_updates: AtomicUsize,
        messages: AtomicUsize,
    }

    #[async_trait]
    impl SentinelHooks for RecordingHooks {
        async fn on_pre_check(&self, ctx: &CommandContext, _payload: PreCheckPayload) {
            self.pre_checks.fetch_add(1, Ordering::SeqCst);
            ctx.send_clear(Some(1.0));
        }

        async fn on_context_update(&self, _handle: &SentinelHandle, _context: std::collections::HashMap<String, serde_json::Value>) {
            self.context_updates.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_message(&self, _handle: &SentinelHandle, _method: Option<String>, _payload: serde_json::Value) {
            self.messages.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_handle() -> (SentinelHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SentinelHandle::new("Pulse", tx), rx)
    }

    #[tokio::test]
    async fn pre_check_dispatch_invokes_hook_and_sends_clear() {
        let hooks = RecordingHooks { pre_checks: AtomicUsize::new(0), context_updates: AtomicUsize::new(0), messages: AtomicUsize::new(0) };
        let (handle, mut rx) = test_handle();
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "starlight.pre_check",
            "params": {"command": {"id": 1, "cmd": "click", "target": "#submit"}, "url": "https://example.test"},
        })
        .to_string();

        let shutdown = dispatch(&frame, &handle, &hooks).await;

        assert!(!shutdown);
        assert_eq!(hooks.pre_checks.load(Ordering::SeqCst), 1);
        let sent = rx.try_recv().unwrap();
        assert!(sent.contains("starlight.clear"));
    }

    #[tokio::test]
    async fn shutdown_notification_returns_true_without_panicking() {
        let hooks = RecordingHooks { pre_checks: AtomicUsize::new(0), context_updates: AtomicUsize::new(0), messages: AtomicUsize::new(0) };
        let (handle, _rx) = test_handle();
        let frame = serde_json::json!({"jsonrpc": "2.0", "method": "starlight.shutdown", "params": {}}).to_string();

        assert!(dispatch(&frame, &handle, &hooks).await);
    }

    #[tokio::test]
    async fn sovereign_update_dispatches_to_on_context_update() {
        let hooks = RecordingHooks { pre_checks: AtomicUsize::new(0), context_updates: AtomicUsize::new(0), messages: AtomicUsize::new(0) };
        let (handle, _rx) = test_handle();
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "starlight.sovereign_update",
            "params": {"context": {"cart_total": 42}},
        })
        .to_string();

        dispatch(&frame, &handle, &hooks).await;
        assert_eq!(hooks.context_updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unrecognized_method_falls_back_to_on_message() {
        let hooks = RecordingHooks { pre_checks: AtomicUsize::new(0), context_updates: AtomicUsize::new(0), messages: AtomicUsize::new(0) };
        let (handle, _rx) = test_handle();
        let frame = serde_json::json!({"jsonrpc": "2.0", "method": "COMMAND_COMPLETE", "params": {"command": 1, "success": true}}).to_string();

        dispatch(&frame, &handle, &hooks).await;
        assert_eq!(hooks.messages.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_json_is_dropped_not_fatal() {
        let hooks = RecordingHooks { pre_checks: AtomicUsize::new(0), context_updates: AtomicUsize::new(0), messages: AtomicUsize::new(0) };
        let (handle, _rx) = test_handle();

        assert!(!dispatch("{ not valid json", &handle, &hooks).await);
    }
}
