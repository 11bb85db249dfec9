//! Canonical default values for the Starlight wire protocol and timing model.

/// Default address the Hub listens on for both Sentinel and Intent Client connections.
pub const DEFAULT_HUB_BIND_ADDR: &str = "127.0.0.1:8080";
/// Default URL a Sentinel Runtime dials when no `HUB_URL` override is set.
pub const DEFAULT_HUB_URL: &str = "ws://localhost:8080";

/// Maximum size, in bytes, of a single JSON-RPC text frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Pre-check fan-out vote collection deadline (`hub.syncBudget`), seconds.
pub const DEFAULT_SYNC_BUDGET_SECS: u64 = 30;
/// Per-command end-to-end deadline (`hub.missionTimeout`), seconds.
pub const DEFAULT_MISSION_TIMEOUT_SECS: u64 = 180;
/// Heartbeat staleness deadline (`hub.heartbeatTimeout`), seconds.
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 5;
/// Extra grace window beyond the sync budget during which a late hijack is
/// still honored (`hub.lockTTL`), seconds.
pub const DEFAULT_LOCK_TTL_SECS: u64 = 5;
/// Minimum gap, in milliseconds, enforced between forwarded entropy events
/// (`hub.entropyThrottle`).
pub const DEFAULT_ENTROPY_THROTTLE_MS: u64 = 50;
/// Maximum age, in milliseconds, of a cached screenshot before it is
/// considered stale (`hub.screenshotMaxAge`).
pub const DEFAULT_SCREENSHOT_MAX_AGE_MS: u64 = 2_000;
/// Trace recorder retention cap (`hub.traceMaxEvents`).
pub const DEFAULT_TRACE_MAX_EVENTS: usize = 2_000;

/// Base settlement window the Entropy Monitor requires before declaring
/// stability (`sentinel.settlementWindow`), milliseconds.
pub const DEFAULT_SETTLEMENT_WINDOW_MS: u64 = 500;
/// Per-command veto cap before a forced clear (`sentinel.maxVetoCount`).
pub const DEFAULT_MAX_VETO_COUNT: u32 = 3;
/// Delay a Sentinel Runtime waits before reconnecting (`sentinel.reconnectDelay`), seconds.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 3;
/// Interval between Sentinel heartbeats (`sentinel.heartbeatInterval`), seconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 2;

/// Forced-retry bucket duration while awaiting settlement (`aura.predictiveWaitMs`).
pub const DEFAULT_PREDICTIVE_WAIT_MS: u64 = 1_000;
/// Poll granularity while awaiting settlement (`aura.bucketSizeMs`).
pub const DEFAULT_BUCKET_SIZE_MS: u64 = 100;

/// Upper clamp for a per-command dynamic stability hint, milliseconds.
pub const MAX_STABILITY_WINDOW_MS: u64 = 2_000;

/// Rhythmic-animation tolerance: number of trailing entropy events inspected.
pub const RHYTHM_SAMPLE_SIZE: usize = 10;
/// Rhythmic-animation tolerance: minimum mean inter-arrival interval, milliseconds.
pub const RHYTHM_MIN_MEAN_INTERVAL_MS: f64 = 100.0;
/// Rhythmic-animation tolerance: maximum inter-arrival variance, squared milliseconds.
pub const RHYTHM_MAX_VARIANCE: f64 = 25.0;

/// Reason recorded when the older connection holding a layer name is dropped.
pub const SUPERSEDED_REASON: &str = "superseded";

/// Environment variable overriding the Sentinel Runtime's target Hub address.
pub const HUB_URL_ENV: &str = "HUB_URL";
