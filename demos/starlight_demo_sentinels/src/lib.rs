//! Shared CLI scaffolding for the example Sentinel binaries in this crate.
//!
//! Each binary (`pulse-sentinel`, `janitor-sentinel`, `pii-sentinel`) wires
//! its own [`starlight_sentinel::SentinelHooks`] implementation and calls
//! [`bootstrap`] to get a loaded [`starlight_sentinel::SentinelRuntimeConfig`]
//! from the same `--hub-url`/`--config`/`--memory-dir`/`--verbose` flags.

use clap::Parser;
use starlight_sentinel::SentinelRuntimeConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct CommonArgs {
    /// Starlight Hub WebSocket URL; overrides config.json and HUB_URL.
    #[arg(long)]
    pub hub_url: Option<String>,

    /// Path to config.json.
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Directory persistent memory files are written to.
    #[arg(long)]
    pub memory_dir: Option<PathBuf>,

    /// Verbose (debug-level) console logging.
    #[arg(long)]
    pub verbose: bool,
}

/// Shared entry-point plumbing: init logging, load config for `layer`, log
/// any `config.json` warning. The binary still attaches its own
/// capabilities/selectors via [`SentinelRuntimeConfig::with_capabilities`] /
/// [`SentinelRuntimeConfig::with_selectors`].
pub fn bootstrap(app_name: &'static str, layer: &str, priority: i32, args: &CommonArgs) -> SentinelRuntimeConfig {
    starlight_logging::init_logging(starlight_logging::LogConfig {
        app_name,
        verbose: args.verbose,
        quiet_console: false,
    })
    .expect("failed to initialize logging");

    let memory_dir = args.memory_dir.clone().unwrap_or_else(|| starlight_logging::starlight_home().join("memory"));
    std::fs::create_dir_all(&memory_dir).expect("failed to create memory directory");

    let (config, warning) = SentinelRuntimeConfig::load(layer, priority, args.hub_url.clone(), &args.config, &memory_dir);
    if let Some(warning) = warning {
        tracing::warn!(%warning, "config.json problem, continuing with defaults");
    }
    config
}
