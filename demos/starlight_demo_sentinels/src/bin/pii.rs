//! PII Sentinel: a privacy/compliance guardian.
//!
//! Scans the text surfaces of a pre-check payload with the same
//! [`starlight_security::PiiGuard`] the Hub itself can apply, but running
//! independently as an ordinary voting Sentinel rather than a dispatch-path
//! guard. In `alert` mode it logs findings to the sovereign context and
//! clears; in `block` mode it hijacks and then aborts the command outright
//! (compliance denial is final, not a transient obstacle to retry).

use async_trait::async_trait;
use clap::Parser;
use starlight_demo_sentinels::CommonArgs;
use starlight_protocol::PreCheckPayload;
use starlight_protocol::config::RawConfig;
use starlight_security::{PiiGuard, PiiMode};
use starlight_sentinel::{CommandContext, SentinelHooks, SentinelRuntime};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::Arc;

struct PiiSentinel {
    guard: PiiGuard,
    last_finding_count: Mutex<usize>,
}

impl PiiSentinel {
    fn new(guard: PiiGuard) -> Self {
        Self { guard, last_finding_count: Mutex::new(0) }
    }
}

#[async_trait]
impl SentinelHooks for PiiSentinel {
    async fn on_pre_check(&self, ctx: &CommandContext, payload: PreCheckPayload) {
        let findings = self.guard.scan_pre_check(&payload);
        *self.last_finding_count.lock().expect("pii sentinel lock poisoned") = findings.len();

        if findings.is_empty() {
            ctx.send_clear(None);
            return;
        }

        let kinds: Vec<&str> = {
            let mut seen = Vec::new();
            for f in &findings {
                if !seen.contains(&f.kind.as_str()) {
                    seen.push(f.kind.as_str());
                }
            }
            seen
        };
        tracing::warn!(layer = %ctx.layer(), count = findings.len(), kinds = ?kinds, "PII detected");

        let mut context = HashMap::new();
        context.insert(
            "security".to_string(),
            serde_json::json!({
                "pii_detected": true,
                "pii_count": findings.len(),
                "pii_types": kinds,
                "compliance_mode": format!("{:?}", self.guard.mode()),
            }),
        );
        ctx.handle().send_context_update(context);

        match self.guard.mode() {
            PiiMode::Block => {
                ctx.send_hijack(format!("PII compliance block: {kinds:?}"));
                ctx.send_abort();
            }
            PiiMode::Alert | PiiMode::Redact => {
                ctx.send_clear(None);
            }
        }
    }

    async fn on_message(&self, _handle: &starlight_sentinel::SentinelHandle, method: Option<String>, _payload: serde_json::Value) {
        if method.as_deref() == Some("COMMAND_COMPLETE") {
            let mut count = self.last_finding_count.lock().expect("pii sentinel lock poisoned");
            if *count > 0 {
                tracing::info!(findings = *count, "command completed with PII warnings outstanding");
                *count = 0;
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let args = CommonArgs::parse();
    let config = starlight_demo_sentinels::bootstrap("pii-sentinel", "PIISentinel", 2, &args)
        .with_capabilities(vec!["pii-detection".to_string(), "compliance".to_string()]);

    let raw = RawConfig::load(&args.config).config;
    let mode = PiiMode::from_str_or_default(&raw.get_str("pii.mode", "alert"));
    let mut patterns = HashMap::new();
    for (k, v) in raw.get_object("pii.patterns") {
        if let Some(s) = v.as_str() {
            patterns.insert(k, s.to_string());
        }
    }

    let hooks = Arc::new(PiiSentinel::new(PiiGuard::new(mode, patterns)));
    if let Err(e) = SentinelRuntime::new(config, hooks).run().await {
        tracing::error!(error = %e, "pii-sentinel exited with an error");
        std::process::exit(1);
    }
}
