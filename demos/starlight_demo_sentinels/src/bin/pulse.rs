//! Pulse Sentinel: a temporal-stability voter.
//!
//! Tracks DOM/network entropy events independently of the Hub's own
//! settlement gate and additionally tolerates rhythmic noise (a looping CSS
//! animation, a polling widget) that would otherwise veto forever: if the
//! last `RHYTHM_SAMPLE_SIZE` entropy events arrive at a roughly constant
//! interval, the page is treated as settled even though events keep firing.
//! Force-clears after `max_veto_count` consecutive WAITs on the same command
//! so a site that never truly quiesces doesn't stall a mission.

use async_trait::async_trait;
use clap::Parser;
use starlight_demo_sentinels::CommonArgs;
use starlight_protocol::defaults::{DEFAULT_MAX_VETO_COUNT, DEFAULT_SETTLEMENT_WINDOW_MS, RHYTHM_SAMPLE_SIZE};
use starlight_protocol::{EntropyStreamPayload, PreCheckPayload};
use starlight_sentinel::{CommandContext, SentinelHandle, SentinelHooks, SentinelRuntime};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct PulseState {
    last_entropy: Instant,
    history: VecDeque<Instant>,
    veto_count: u32,
    current_command: Option<String>,
}

impl Default for PulseState {
    fn default() -> Self {
        Self { last_entropy: Instant::now(), history: VecDeque::new(), veto_count: 0, current_command: None }
    }
}

struct PulseSentinel {
    settlement_window: Duration,
    max_veto_count: u32,
    state: Mutex<PulseState>,
}

impl PulseSentinel {
    fn new(settlement_window: Duration, max_veto_count: u32) -> Self {
        Self { settlement_window, max_veto_count, state: Mutex::new(PulseState::default()) }
    }

    /// True if the last few entropy events landed at a roughly constant
    /// interval rather than irregularly.
    fn is_rhythmic(history: &VecDeque<Instant>) -> bool {
        if history.len() < RHYTHM_SAMPLE_SIZE {
            return false;
        }
        let intervals: Vec<f64> =
            history.iter().zip(history.iter().skip(1)).map(|(a, b)| b.duration_since(*a).as_secs_f64() * 1000.0).collect();
        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if mean < 100.0 {
            return false;
        }
        let variance = intervals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / intervals.len() as f64;
        variance < 25.0
    }
}

#[async_trait]
impl SentinelHooks for PulseSentinel {
    async fn on_entropy(&self, _handle: &SentinelHandle, payload: EntropyStreamPayload) {
        if !payload.entropy {
            return;
        }
        let mut state = self.state.lock().expect("pulse state lock poisoned");
        let now = Instant::now();
        state.last_entropy = now;
        state.history.push_back(now);
        if state.history.len() > RHYTHM_SAMPLE_SIZE {
            state.history.pop_front();
        }
    }

    async fn on_pre_check(&self, ctx: &CommandContext, payload: PreCheckPayload) {
        let command_key = payload.command.target.clone().unwrap_or_else(|| payload.url.clone());
        let stability_hint = payload.stability_hint.unwrap_or(0);

        let window = if stability_hint > 0 {
            self.settlement_window.max(Duration::from_millis(stability_hint)).min(Duration::from_millis(2_000))
        } else {
            self.settlement_window
        };

        let mut state = self.state.lock().expect("pulse state lock poisoned");
        if state.current_command.as_deref() != Some(command_key.as_str()) {
            state.veto_count = 0;
            state.current_command = Some(command_key);
        }

        let silence = Instant::now().duration_since(state.last_entropy);
        let settled = silence >= window || Self::is_rhythmic(&state.history);

        if settled {
            state.veto_count = 0;
            ctx.send_clear(Some(1.0));
        } else if state.veto_count >= self.max_veto_count {
            tracing::info!(layer = %ctx.layer(), "animation tolerance: forcing clear after max vetoes");
            state.veto_count = 0;
            ctx.send_clear(Some(0.5));
        } else {
            state.veto_count += 1;
            let retry_after_ms = window.saturating_sub(silence).as_millis().max(200) as u64;
            ctx.send_wait(Some(retry_after_ms), None);
        }
    }
}

#[tokio::main]
async fn main() {
    let args = CommonArgs::parse();
    let config = starlight_demo_sentinels::bootstrap("pulse-sentinel", "PulseSentinel", 1, &args)
        .with_capabilities(vec!["temporal-stability".to_string(), "settling".to_string(), "network-idle".to_string()]);

    let hooks = Arc::new(PulseSentinel::new(Duration::from_millis(DEFAULT_SETTLEMENT_WINDOW_MS), DEFAULT_MAX_VETO_COUNT));
    if let Err(e) = SentinelRuntime::new(config, hooks).run().await {
        tracing::error!(error = %e, "pulse-sentinel exited with an error");
        std::process::exit(1);
    }
}
