//! Janitor Sentinel: clears modals, popups, and cookie banners out of the
//! way before a command dispatches.
//!
//! On a pre-check, scans the blocking elements the Hub already surfaced for
//! anything matching a known obstacle selector. If one is visible, it
//! hijacks, clicks the matching close control, gives the page a moment to
//! settle, then resumes with a re-check so the Orchestrator re-evaluates the
//! now-cleared page before dispatching the original command. Clears
//! immediately if nothing matches.

use async_trait::async_trait;
use clap::Parser;
use starlight_demo_sentinels::CommonArgs;
use starlight_protocol::PreCheckPayload;
use starlight_sentinel::{CommandContext, SentinelHooks, SentinelRuntime};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const BLOCKING_PATTERNS: &[&str] = &[".modal", ".popup", "#overlay", ".cookie-banner"];

struct JanitorSentinel {
    hijacking: AtomicBool,
}

impl JanitorSentinel {
    fn new() -> Self {
        Self { hijacking: AtomicBool::new(false) }
    }

    fn matching_pattern(class_name: &str, id: &str) -> Option<&'static str> {
        BLOCKING_PATTERNS.iter().copied().find(|pattern| {
            pattern.strip_prefix('.').map(|c| class_name.contains(c)).unwrap_or(false)
                || pattern.strip_prefix('#').map(|i| id == i).unwrap_or(false)
        })
    }
}

#[async_trait]
impl SentinelHooks for JanitorSentinel {
    async fn on_pre_check(&self, ctx: &CommandContext, payload: PreCheckPayload) {
        if self.hijacking.load(Ordering::SeqCst) {
            return;
        }

        for element in &payload.blocking {
            if element.visibility.as_deref() == Some("none") {
                continue;
            }
            let class_name = element.class_name.as_deref().unwrap_or("");
            let id = element.id.as_deref().unwrap_or("");
            let Some(pattern) = Self::matching_pattern(class_name, id) else { continue };

            let selector = element.selector.clone().unwrap_or_else(|| pattern.to_string());
            tracing::info!(layer = %ctx.layer(), %selector, "obstacle detected, hijacking");
            self.hijacking.store(true, Ordering::SeqCst);
            ctx.send_hijack(format!("detected visible obstacle: {selector}"));

            let close_selector = if selector.contains("close") { selector } else { ".close-btn".to_string() };
            ctx.send_click(format!("{close_selector} >> visible=true"));

            tokio::time::sleep(std::time::Duration::from_millis(1_500)).await;
            ctx.send_resume(true);
            self.hijacking.store(false, Ordering::SeqCst);
            return;
        }

        ctx.send_clear(None);
    }

    async fn on_message(&self, _handle: &starlight_sentinel::SentinelHandle, method: Option<String>, _payload: serde_json::Value) {
        if method.as_deref() == Some("COMMAND_COMPLETE") {
            tracing::debug!("command complete, resuming normal sweep");
        }
    }
}

#[tokio::main]
async fn main() {
    let args = CommonArgs::parse();
    let config = starlight_demo_sentinels::bootstrap("janitor-sentinel", "JanitorSentinel", 5, &args)
        .with_selectors(BLOCKING_PATTERNS.iter().map(|s| s.to_string()).collect())
        .with_capabilities(vec!["obstacle-clearing".to_string()]);

    let hooks = Arc::new(JanitorSentinel::new());
    if let Err(e) = SentinelRuntime::new(config, hooks).run().await {
        tracing::error!(error = %e, "janitor-sentinel exited with an error");
        std::process::exit(1);
    }
}
