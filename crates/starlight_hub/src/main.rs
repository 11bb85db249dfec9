//! Starlight Hub binary: binds the registration/command WebSocket listener
//! and runs until terminated.
//!
//! Usage:
//!     starlight-hub --bind 127.0.0.1:8080 --config ./config.json

use clap::Parser;
use starlight_hub::{
    ContextStore, EntropyMonitor, HubConfig, HubState, NullBrowserDriver, Orchestrator, Registry,
    TraceRecorder,
};
use starlight_security::PiiGuard;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "starlight-hub", about = "Coordination plane Hub for Starlight browser automation")]
struct Args {
    /// WebSocket bind address; overrides config.json's hub.bindAddr.
    #[arg(long)]
    bind: Option<String>,

    /// Path to config.json.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Verbose (debug-level) console logging.
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    starlight_logging::init_logging(starlight_logging::LogConfig {
        app_name: "starlight-hub",
        verbose: args.verbose,
        quiet_console: false,
    })?;

    let (config, warning) = HubConfig::load(&args.config);
    if let Some(warning) = warning {
        tracing::warn!(%warning, "config.json problem, continuing with defaults");
    }
    let bind_addr = args.bind.unwrap_or_else(|| config.bind_addr.clone());

    tracing::info!(bind_addr = %bind_addr, "starting Starlight Hub");

    let registry = Registry::new();
    let entropy = Arc::new(EntropyMonitor::new(Duration::from_millis(config.settlement_window_ms)));
    let trace = Arc::new(TraceRecorder::new(config.trace_max_events));
    let context = Arc::new(ContextStore::new());
    let pii = Arc::new(PiiGuard::new(
        starlight_security::PiiMode::from_str_or_default(&config.pii_mode),
        config.pii_patterns.clone(),
    ));
    let driver = Arc::new(NullBrowserDriver);

    let orchestrator = Arc::new(Orchestrator::new(
        registry.clone(),
        entropy,
        trace,
        context.clone(),
        pii,
        driver,
        config.clone(),
    ));

    let heartbeat_timeout = Duration::from_secs(config.heartbeat_timeout_secs);
    tokio::spawn(starlight_hub::supervisor::run(registry.clone(), orchestrator.clone(), heartbeat_timeout));

    let state = HubState {
        registry,
        orchestrator,
        context,
        auth_token: config.auth_token.clone(),
        max_frame_bytes: starlight_protocol::defaults::DEFAULT_MAX_FRAME_BYTES,
    };
    starlight_hub::transport::run(&bind_addr, state).await
}
