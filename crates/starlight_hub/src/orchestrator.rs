//! Command Orchestrator (C5) — the heart of the core.
//!
//! Runs the per-command state machine: settlement gate, pre-check fan-out,
//! vote aggregation, hijack-and-resume, retry with backoff, timeout, trace.
//! Commands within one mission are fully serialized (`mission_lock`); no
//! two commands are ever in a non-terminal state concurrently.

use crate::config::HubConfig;
use crate::context::ContextStore;
use crate::driver::BrowserDriver;
use crate::entropy::EntropyMonitor;
use crate::registry::Registry;
use crate::trace::TraceRecorder;
use starlight_ids::{CommandId, CommandIdSequence, SentinelId};
use starlight_protocol::{
    ActionParams, ActionVerb, BlockingElement, CommandOutcome, CommandState, ErrorKind,
    PreCheckCommand, PreCheckPayload, RpcNotification, Verdict, Viewport, VoteRecord,
};
use starlight_security::{PiiGuard, PiiMode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, Mutex};

/// A single inbound vote, as forwarded by the WebSocket connection task
/// that received a `starlight.clear` / `starlight.wait` / `starlight.hijack`
/// frame tagged with the active command's correlation ID.
#[derive(Debug, Clone)]
pub enum InboundVote {
    Clear { sentinel_id: SentinelId, confidence: Option<f64> },
    Wait { sentinel_id: SentinelId, retry_after_ms: Option<u64>, confidence: Option<f64> },
    Hijack { sentinel_id: SentinelId, reason: String },
}

/// A message from the Sentinel currently holding the hijack.
#[derive(Debug, Clone)]
pub enum HijackMessage {
    Action { sentinel_id: SentinelId, action: ActionParams },
    Resume { sentinel_id: SentinelId, re_check: bool, abort: bool },
}

/// What [`Orchestrator::run_hijack`] decided once the hijacking Sentinel
/// released control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HijackOutcome {
    /// Dispatch the original command as normal.
    Dispatch,
    /// Re-run PRE_CHECK before dispatching.
    ReCheck,
    /// Terminate the command as blocked; never dispatch it.
    Abort,
}

/// Inbound channels for the command currently in flight. Connection tasks
/// look this up (via [`Orchestrator::active_channel`]) to forward votes and
/// hijack traffic; it is replaced every time a new command starts PRE_CHECK.
pub struct CommandChannel {
    pub command_id: CommandId,
    votes_tx: mpsc::UnboundedSender<InboundVote>,
    hijack_tx: mpsc::UnboundedSender<HijackMessage>,
    /// The Sentinel currently holding the hijack, if any — used to reject a
    /// second hijack attempt from a different Sentinel with a protocol error
    /// rather than silently ignoring it.
    hijacker: std::sync::Mutex<Option<SentinelId>>,
}

impl CommandChannel {
    pub fn send_vote(&self, vote: InboundVote) {
        let _ = self.votes_tx.send(vote);
    }

    pub fn send_hijack_message(&self, msg: HijackMessage) {
        let _ = self.hijack_tx.send(msg);
    }

    /// Returns `true` if this is the first hijack claim for the command;
    /// `false` if a different Sentinel already holds it.
    pub fn claim_hijack(&self, sentinel_id: SentinelId) -> bool {
        let mut guard = self.hijacker.lock().expect("hijacker lock poisoned");
        match &*guard {
            Some(existing) => *existing == sentinel_id,
            None => {
                *guard = Some(sentinel_id);
                true
            }
        }
    }

    pub fn current_hijacker(&self) -> Option<SentinelId> {
        self.hijacker.lock().expect("hijacker lock poisoned").clone()
    }
}

pub struct Orchestrator {
    registry: Registry,
    entropy: Arc<EntropyMonitor>,
    trace: Arc<TraceRecorder>,
    context: Arc<ContextStore>,
    pii: Arc<PiiGuard>,
    driver: Arc<dyn BrowserDriver>,
    config: HubConfig,
    command_ids: CommandIdSequence,
    active: Mutex<Option<Arc<CommandChannel>>>,
    mission_lock: Mutex<()>,
    aborted: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        registry: Registry,
        entropy: Arc<EntropyMonitor>,
        trace: Arc<TraceRecorder>,
        context: Arc<ContextStore>,
        pii: Arc<PiiGuard>,
        driver: Arc<dyn BrowserDriver>,
        config: HubConfig,
    ) -> Self {
        Self {
            registry,
            entropy,
            trace,
            context,
            pii,
            driver,
            config,
            command_ids: CommandIdSequence::new(),
            active: Mutex::new(None),
            mission_lock: Mutex::new(()),
            aborted: AtomicBool::new(false),
        }
    }

    pub async fn active_channel(&self) -> Option<Arc<CommandChannel>> {
        self.active.lock().await.clone()
    }

    /// Best-effort cancellation for `starlight.abort`: the in-flight
    /// command observes this flag at its next suspension point and
    /// transitions to FAILED/aborted.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub async fn submit(&self, kind: ActionVerb, target: Option<String>, url: String) -> CommandOutcome {
        let _mission_guard = self.mission_lock.lock().await;
        self.aborted.store(false, Ordering::SeqCst);

        let command_id = self.command_ids.next();
        let deadline = Instant::now() + Duration::from_secs(self.config.mission_timeout_secs);
        let mut attempt: u32 = 1;
        let mut veto_count: u32 = 0;

        self.trace.record(Some(command_id), "queued", serde_json::json!({"cmd": kind}));

        loop {
            if self.aborted.load(Ordering::SeqCst) {
                self.trace.record(Some(command_id), "aborted", serde_json::json!({}));
                *self.active.lock().await = None;
                return CommandOutcome { success: false, error_kind: Some(ErrorKind::Aborted), screenshot_ref: None };
            }
            if Instant::now() >= deadline {
                self.trace.record(Some(command_id), "timed_out", serde_json::json!({}));
                *self.active.lock().await = None;
                return CommandOutcome { success: false, error_kind: Some(ErrorKind::Timeout), screenshot_ref: None };
            }

            // AWAITING_SETTLEMENT: poll the entropy monitor every bucket-size
            // ms until stable or the mission deadline passes.
            let bucket = Duration::from_millis(self.config.bucket_size_ms);
            let predictive_wait = Duration::from_millis(self.config.predictive_wait_ms);
            let mut waited = Duration::ZERO;
            while !self.entropy.is_stable(None) {
                if Instant::now() >= deadline || self.aborted.load(Ordering::SeqCst) {
                    break;
                }
                tokio::time::sleep(bucket).await;
                waited += bucket;
                if waited >= predictive_wait {
                    self.trace.record(Some(command_id), "forced_retry_bucket", serde_json::json!({}));
                    waited = Duration::ZERO;
                }
            }

            // PRE_CHECK: compose payload, fan out, start sync-budget timer.
            let ready = self.registry.ready_sentinels().await;
            let needs_enrichment = ready.iter().any(|r| {
                r.capabilities.contains("vision") || r.capabilities.contains("accessibility")
            });
            let mut payload = PreCheckPayload {
                command: PreCheckCommand { id: command_id, cmd: kind, target: target.clone() },
                url: url.clone(),
                blocking: Vec::<BlockingElement>::new(),
                target_rect: None,
                viewport: if needs_enrichment { Some(Viewport { width: 1280, height: 720 }) } else { None },
                screenshot: None,
                page_text: self.driver.page_text().await,
                a11y_snapshot: None,
                stability_hint: None,
            };

            // Hub-side PII guard: scan before anything is handed to a
            // Sentinel. `block` terminates the command here; `redact`
            // sanitizes the payload in place; `alert` only traces.
            let pii_findings = self.pii.scan_pre_check(&payload);
            if !pii_findings.is_empty() {
                let samples: Vec<serde_json::Value> = pii_findings
                    .iter()
                    .map(|f| serde_json::json!({"kind": f.kind, "redacted": f.redacted}))
                    .collect();
                match self.pii.mode() {
                    PiiMode::Block => {
                        self.trace.record(Some(command_id), "pii_block", serde_json::json!({"findings": samples}));
                        *self.active.lock().await = None;
                        return CommandOutcome { success: false, error_kind: Some(ErrorKind::Blocked), screenshot_ref: None };
                    }
                    PiiMode::Redact => {
                        self.trace.record(Some(command_id), "pii_redact", serde_json::json!({"findings": samples}));
                        if let Some(text) = payload.page_text.as_mut() {
                            *text = self.pii.redact_text(text);
                        }
                        for element in payload.blocking.iter_mut() {
                            if let Some(text) = element.text.as_mut() {
                                *text = self.pii.redact_text(text);
                            }
                        }
                    }
                    PiiMode::Alert => {
                        self.trace.record(Some(command_id), "pii_alert", serde_json::json!({"findings": samples}));
                    }
                }
            }

            self.trace.record(
                Some(command_id),
                "pre_check",
                serde_json::to_value(&payload).unwrap_or(serde_json::Value::Null),
            );

            let notification = RpcNotification::new(
                "starlight.pre_check",
                serde_json::to_value(&payload).unwrap_or(serde_json::Value::Null),
            );
            let frame = serde_json::to_string(&notification).unwrap_or_default();
            for record in &ready {
                let _ = record.outbound.send(frame.clone());
            }

            // VOTING: collect until every READY Sentinel has voted or the
            // sync budget elapses.
            let (votes_tx, mut votes_rx) = mpsc::unbounded_channel();
            let (hijack_tx, mut hijack_rx) = mpsc::unbounded_channel();
            let channel = Arc::new(CommandChannel {
                command_id,
                votes_tx,
                hijack_tx,
                hijacker: std::sync::Mutex::new(None),
            });
            *self.active.lock().await = Some(channel.clone());

            let sync_budget = Duration::from_secs(self.config.sync_budget_secs);
            let voting_deadline = Instant::now() + sync_budget;
            let mut ledger: Vec<VoteRecord> = Vec::new();
            let mut latest_verdict: HashMap<SentinelId, usize> = HashMap::new();

            loop {
                if latest_verdict.len() >= ready.len() {
                    break;
                }
                let remaining = voting_deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match tokio::time::timeout(remaining, votes_rx.recv()).await {
                    Ok(Some(vote)) => {
                        let record = vote_to_record(vote, &ready);
                        if let Some(record) = record {
                            latest_verdict.insert(record.sentinel_id.clone(), ledger.len());
                            ledger.push(record);
                        }
                    }
                    _ => break,
                }
            }

            self.trace.record(
                Some(command_id),
                "votes_collected",
                serde_json::json!({"count": ledger.len(), "ready": ready.len()}),
            );

            // Decision rule: hijack beats wait beats clear.
            let hijack_verdict = latest_verdict
                .values()
                .map(|&idx| &ledger[idx])
                .filter(|v| v.verdict == Verdict::Hijack)
                .min_by_key(|v| (v.priority, v.timestamp_ms));

            if let Some(winner) = hijack_verdict.cloned() {
                self.trace.record(
                    Some(command_id),
                    "hijacked",
                    serde_json::json!({"sentinel": winner.sentinel_id.clone(), "reason": winner.reason.clone()}),
                );
                channel.claim_hijack(winner.sentinel_id);

                let hijack_outcome = self.run_hijack(command_id, &mut hijack_rx, &channel).await;
                *self.active.lock().await = None;
                match hijack_outcome {
                    HijackOutcome::ReCheck => {
                        attempt += 1;
                        continue;
                    }
                    HijackOutcome::Abort => {
                        self.trace.record(Some(command_id), "hijack_abort", serde_json::json!({}));
                        return CommandOutcome { success: false, error_kind: Some(ErrorKind::Blocked), screenshot_ref: None };
                    }
                    HijackOutcome::Dispatch => {}
                }
                // fall through to dispatch the original command.
            } else {
                let wait_verdict = latest_verdict
                    .values()
                    .map(|&idx| &ledger[idx])
                    .find(|v| v.verdict == Verdict::Wait && v.confidence.map(|c| c != 0.0).unwrap_or(true));

                if let Some(wait) = wait_verdict {
                    veto_count += 1;
                    if veto_count > self.config.max_veto_count {
                        self.trace.record(Some(command_id), "force_clear", serde_json::json!({}));
                    } else {
                        let delay_ms = wait.retry_after_ms.unwrap_or(0);
                        let delay = Duration::from_millis(delay_ms).min(deadline.saturating_duration_since(Instant::now()));
                        self.trace.record(Some(command_id), "retry_backoff", serde_json::json!({"delay_ms": delay_ms}));
                        *self.active.lock().await = None;
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                }
            }

            // DISPATCHED
            *self.active.lock().await = None;
            self.trace.record(Some(command_id), "dispatched", serde_json::json!({"attempt": attempt}));
            let action = ActionParams { action: kind, selector: target.clone(), text: None, value: None, key: None, files: None };
            let outcome = self.driver.execute(&action).await;

            let kind_str = if outcome.success { "complete" } else { "failed" };
            self.trace.record(
                Some(command_id),
                kind_str,
                serde_json::to_value(&outcome).unwrap_or(serde_json::Value::Null),
            );

            let completion = RpcNotification::new(
                "COMMAND_COMPLETE",
                serde_json::json!({"command": command_id, "success": outcome.success, "errorKind": outcome.error_kind}),
            );
            let frame = serde_json::to_string(&completion).unwrap_or_default();
            for record in self.registry.ready_sentinels().await {
                let _ = record.outbound.send(frame.clone());
            }

            return outcome;
        }
    }

    /// Drive the HIJACKED state: accept a sequence of `starlight.action`
    /// messages from the winning Sentinel, forward each synchronously to
    /// the browser driver, and echo `COMMAND_COMPLETE` back to it. Returns
    /// what the Sentinel asked for on `resume`.
    async fn run_hijack(
        &self,
        command_id: CommandId,
        hijack_rx: &mut mpsc::UnboundedReceiver<HijackMessage>,
        channel: &Arc<CommandChannel>,
    ) -> HijackOutcome {
        while let Some(msg) = hijack_rx.recv().await {
            match msg {
                HijackMessage::Action { sentinel_id, action } => {
                    if channel.current_hijacker().as_ref() != Some(&sentinel_id) {
                        continue;
                    }
                    self.trace.record(Some(command_id), "hijack_action", serde_json::json!({"action": action.action}));
                    let outcome = self.driver.execute(&action).await;
                    if let Some(record) = self.registry.get(&sentinel_id).await {
                        let completion = RpcNotification::new(
                            "COMMAND_COMPLETE",
                            serde_json::json!({"command": command_id, "success": outcome.success, "errorKind": outcome.error_kind}),
                        );
                        let _ = record.outbound.send(serde_json::to_string(&completion).unwrap_or_default());
                    }
                }
                HijackMessage::Resume { sentinel_id, re_check, abort } => {
                    if channel.current_hijacker().as_ref() != Some(&sentinel_id) {
                        continue;
                    }
                    self.trace.record(Some(command_id), "resume", serde_json::json!({"re_check": re_check, "abort": abort}));
                    return if abort {
                        HijackOutcome::Abort
                    } else if re_check {
                        HijackOutcome::ReCheck
                    } else {
                        HijackOutcome::Dispatch
                    };
                }
            }
        }
        HijackOutcome::Dispatch
    }

    pub fn context(&self) -> &Arc<ContextStore> {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NullBrowserDriver;
    use crate::registry::SentinelRecord;
    use starlight_protocol::SentinelState;
    use std::collections::HashSet;

    fn test_config() -> HubConfig {
        HubConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            sync_budget_secs: 2,
            mission_timeout_secs: 5,
            heartbeat_timeout_secs: 5,
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

    fn fake_ready_sentinel(layer: &str, priority: i32) -> (SentinelRecord, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SentinelRecord {
                id: SentinelId::new(),
                layer: layer.to_string(),
                priority,
                capabilities: HashSet::new(),
                selectors: Vec::new(),
                state: SentinelState::Ready,
                last_heartbeat: std::time::Instant::now(),
                last_entropy: None,
                last_health: None,
                registered_at: std::time::Instant::now(),
                outbound: tx,
            },
            rx,
        )
    }

    fn test_orchestrator() -> Orchestrator {
        Orchestrator::new(
            Registry::new(),
            Arc::new(EntropyMonitor::new(Duration::from_millis(0))),
            Arc::new(TraceRecorder::new(100)),
            Arc::new(ContextStore::new()),
            Arc::new(PiiGuard::new(starlight_security::PiiMode::Alert, HashMap::new())),
            Arc::new(NullBrowserDriver),
            test_config(),
        )
    }

    #[tokio::test]
    async fn clean_dispatch_with_unanimous_clear_votes() {
        let orchestrator = Arc::new(test_orchestrator());
        let (first, _rx1) = fake_ready_sentinel("Vision", 5);
        let (second, _rx2) = fake_ready_sentinel("Janitor", 3);
        let first_id = first.id.clone();
        let second_id = second.id.clone();
        orchestrator.registry.register(first).await;
        orchestrator.registry.register(second).await;

        let orch = orchestrator.clone();
        tokio::spawn(async move {
            let channel = loop {
                if let Some(c) = orch.active_channel().await {
                    break c;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            };
            channel.send_vote(InboundVote::Clear { sentinel_id: first_id, confidence: Some(0.9) });
            channel.send_vote(InboundVote::Clear { sentinel_id: second_id, confidence: None });
        });

        let outcome = orchestrator
            .submit(ActionVerb::Click, Some("#submit".to_string()), "https://example.com".to_string())
            .await;
        assert!(outcome.success);
        assert!(outcome.error_kind.is_none());
    }

    #[tokio::test]
    async fn hijack_wins_and_resume_dispatches_original_command() {
        let orchestrator = Arc::new(test_orchestrator());
        let (janitor, _rx) = fake_ready_sentinel("Janitor", 1);
        let janitor_id = janitor.id.clone();
        orchestrator.registry.register(janitor).await;

        let orch = orchestrator.clone();
        let hijacker_id = janitor_id.clone();
        tokio::spawn(async move {
            let channel = loop {
                if let Some(c) = orch.active_channel().await {
                    break c;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            };
            channel.send_vote(InboundVote::Hijack {
                sentinel_id: hijacker_id.clone(),
                reason: "cookie banner".to_string(),
            });
            // give the orchestrator a moment to claim the hijack before the
            // remediation action arrives.
            tokio::time::sleep(Duration::from_millis(50)).await;
            channel.send_hijack_message(HijackMessage::Action {
                sentinel_id: hijacker_id.clone(),
                action: ActionParams {
                    action: ActionVerb::Click,
                    selector: Some("#dismiss".to_string()),
                    text: None,
                    value: None,
                    key: None,
                    files: None,
                },
            });
            tokio::time::sleep(Duration::from_millis(20)).await;
            channel.send_hijack_message(HijackMessage::Resume { sentinel_id: hijacker_id, re_check: false, abort: false });
        });

        let outcome = orchestrator
            .submit(ActionVerb::Click, Some("#submit".to_string()), "https://example.com".to_string())
            .await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn veto_overrun_forces_clear_after_max_veto_count() {
        let mut config = test_config();
        config.max_veto_count = 1;
        config.sync_budget_secs = 1;
        let orchestrator = Arc::new(Orchestrator::new(
            Registry::new(),
            Arc::new(EntropyMonitor::new(Duration::from_millis(0))),
            Arc::new(TraceRecorder::new(100)),
            Arc::new(ContextStore::new()),
            Arc::new(PiiGuard::new(starlight_security::PiiMode::Alert, HashMap::new())),
            Arc::new(NullBrowserDriver),
            config,
        ));
        let (voter, _rx) = fake_ready_sentinel("Janitor", 1);
        let voter_id = voter.id.clone();
        orchestrator.registry.register(voter).await;

        let orch = orchestrator.clone();
        tokio::spawn(async move {
            // Two PRE_CHECK rounds: the first Wait vote is below the
            // (lowered) max_veto_count and triggers a retry; the second
            // pushes veto_count past it and forces a clear.
            for _ in 0..2 {
                let channel = loop {
                    if let Some(c) = orch.active_channel().await {
                        break c;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                };
                channel.send_vote(InboundVote::Wait {
                    sentinel_id: voter_id.clone(),
                    retry_after_ms: Some(5),
                    confidence: Some(0.8),
                });
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
        });

        let outcome = orchestrator
            .submit(ActionVerb::Click, Some("#submit".to_string()), "https://example.com".to_string())
            .await;
        assert!(outcome.success);
    }

    struct TextBrowserDriver {
        text: &'static str,
    }

    #[async_trait::async_trait]
    impl crate::driver::BrowserDriver for TextBrowserDriver {
        async fn execute(&self, _action: &ActionParams) -> CommandOutcome {
            CommandOutcome { success: true, error_kind: None, screenshot_ref: None }
        }

        async fn page_text(&self) -> Option<String> {
            Some(self.text.to_string())
        }
    }

    #[tokio::test]
    async fn pii_block_mode_aborts_before_dispatch() {
        let orchestrator = Orchestrator::new(
            Registry::new(),
            Arc::new(EntropyMonitor::new(Duration::from_millis(0))),
            Arc::new(TraceRecorder::new(100)),
            Arc::new(ContextStore::new()),
            Arc::new(PiiGuard::new(starlight_security::PiiMode::Block, HashMap::new())),
            Arc::new(TextBrowserDriver { text: "contact alice@example.com for access" }),
            test_config(),
        );

        let outcome = orchestrator
            .submit(ActionVerb::Click, Some("#submit".to_string()), "https://example.com".to_string())
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Blocked));
    }

    #[tokio::test]
    async fn pii_redact_mode_sanitizes_page_text_and_still_dispatches() {
        let orchestrator = Orchestrator::new(
            Registry::new(),
            Arc::new(EntropyMonitor::new(Duration::from_millis(0))),
            Arc::new(TraceRecorder::new(100)),
            Arc::new(ContextStore::new()),
            Arc::new(PiiGuard::new(starlight_security::PiiMode::Redact, HashMap::new())),
            Arc::new(TextBrowserDriver { text: "contact alice@example.com for access" }),
            test_config(),
        );

        let outcome = orchestrator
            .submit(ActionVerb::Click, Some("#submit".to_string()), "https://example.com".to_string())
            .await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn hijack_abort_terminates_the_command_without_dispatch() {
        let orchestrator = Arc::new(test_orchestrator());
        let (janitor, _rx) = fake_ready_sentinel("Janitor", 1);
        let janitor_id = janitor.id.clone();
        orchestrator.registry.register(janitor).await;

        let orch = orchestrator.clone();
        let hijacker_id = janitor_id.clone();
        tokio::spawn(async move {
            let channel = loop {
                if let Some(c) = orch.active_channel().await {
                    break c;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            };
            channel.send_vote(InboundVote::Hijack {
                sentinel_id: hijacker_id.clone(),
                reason: "pii compliance block".to_string(),
            });
            tokio::time::sleep(Duration::from_millis(50)).await;
            channel.send_hijack_message(HijackMessage::Resume { sentinel_id: hijacker_id, re_check: false, abort: true });
        });

        let outcome = orchestrator
            .submit(ActionVerb::Click, Some("#submit".to_string()), "https://example.com".to_string())
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Blocked));
    }
}

fn vote_to_record(vote: InboundVote, ready: &[crate::registry::SentinelRecord]) -> Option<VoteRecord> {
    let timestamp_ms = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0);
    let (sentinel_id, verdict, confidence, retry_after_ms, reason) = match vote {
        InboundVote::Clear { sentinel_id, confidence } => (sentinel_id, Verdict::Clear, confidence, None, None),
        InboundVote::Wait { sentinel_id, retry_after_ms, confidence } => {
            (sentinel_id, Verdict::Wait, confidence, retry_after_ms, None)
        }
        InboundVote::Hijack { sentinel_id, reason } => (sentinel_id, Verdict::Hijack, None, None, Some(reason)),
    };
    let record = ready.iter().find(|r| r.id == sentinel_id)?;
    Some(VoteRecord {
        sentinel_id,
        layer: record.layer.clone(),
        priority: record.priority,
        verdict,
        confidence,
        timestamp_ms,
        retry_after_ms,
        reason,
    })
}
