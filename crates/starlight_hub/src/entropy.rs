//! Entropy Monitor (C4): aggregates DOM/network/navigation activity into a
//! settlement signal with rhythmic-animation tolerance.

use starlight_protocol::defaults::{
    MAX_STABILITY_WINDOW_MS, RHYTHM_MAX_VARIANCE, RHYTHM_MIN_MEAN_INTERVAL_MS, RHYTHM_SAMPLE_SIZE,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct State {
    last_event: Instant,
    intervals: VecDeque<Duration>,
    last_arrival: Option<Instant>,
}

/// Tracks entropy events and answers whether the environment is currently
/// stable. Advisory only — the Orchestrator decides what to do with it.
pub struct EntropyMonitor {
    settlement_window: Duration,
    state: Mutex<State>,
}

impl EntropyMonitor {
    pub fn new(settlement_window: Duration) -> Self {
        let now = Instant::now();
        Self {
            settlement_window,
            state: Mutex::new(State {
                last_event: now,
                intervals: VecDeque::with_capacity(RHYTHM_SAMPLE_SIZE),
                last_arrival: None,
            }),
        }
    }

    /// Record an entropy event (DOM mutation, network activity, navigation,
    /// or heartbeat-reported entropy flag).
    pub fn record_event(&self) {
        let now = Instant::now();
        let mut state = self.state.lock().expect("entropy monitor lock poisoned");
        if let Some(prev) = state.last_arrival {
            let interval = now.duration_since(prev);
            if state.intervals.len() == RHYTHM_SAMPLE_SIZE {
                state.intervals.pop_front();
            }
            state.intervals.push_back(interval);
        }
        state.last_arrival = Some(now);
        state.last_event = now;
    }

    /// Silence duration since the last recorded entropy event.
    pub fn silence(&self) -> Duration {
        let state = self.state.lock().expect("entropy monitor lock poisoned");
        Instant::now().duration_since(state.last_event)
    }

    /// Whether the environment is stable, given an optional per-command
    /// stability hint (clamped to `[settlement_window, MAX_STABILITY_WINDOW_MS]`).
    pub fn is_stable(&self, stability_hint_ms: Option<u64>) -> bool {
        let state = self.state.lock().expect("entropy monitor lock poisoned");

        let effective_window = match stability_hint_ms {
            Some(hint) => Duration::from_millis(
                hint.clamp(self.settlement_window.as_millis() as u64, MAX_STABILITY_WINDOW_MS),
            ),
            None => self.settlement_window,
        };

        if Instant::now().duration_since(state.last_event) >= effective_window {
            return true;
        }

        Self::is_rhythmic(&state.intervals)
    }

    /// Rhythmic-animation tolerance: the last `RHYTHM_SAMPLE_SIZE` intervals
    /// have variance below epsilon and a mean above the minimum — a
    /// repeating animation, not real activity.
    fn is_rhythmic(intervals: &VecDeque<Duration>) -> bool {
        if intervals.len() < RHYTHM_SAMPLE_SIZE {
            return false;
        }
        let samples: Vec<f64> = intervals.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        if mean <= RHYTHM_MIN_MEAN_INTERVAL_MS {
            return false;
        }
        let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        variance < RHYTHM_MAX_VARIANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn stable_after_settlement_window_elapses() {
        let monitor = EntropyMonitor::new(Duration::from_millis(20));
        monitor.record_event();
        assert!(!monitor.is_stable(None));
        sleep(Duration::from_millis(30));
        assert!(monitor.is_stable(None));
    }

    #[test]
    fn stability_hint_is_clamped_to_max_window() {
        let monitor = EntropyMonitor::new(Duration::from_millis(10));
        monitor.record_event();
        // A hint larger than MAX_STABILITY_WINDOW_MS is clamped down, so a
        // short sleep still should not report stable under the raw hint.
        assert!(!monitor.is_stable(Some(999_999)));
    }

    #[test]
    fn rhythmic_intervals_report_stable_regardless_of_silence() {
        let monitor = EntropyMonitor::new(Duration::from_secs(10));
        for _ in 0..RHYTHM_SAMPLE_SIZE {
            monitor.record_event();
            sleep(Duration::from_millis(110));
        }
        assert!(monitor.is_stable(None));
    }
}
