//! Starlight Hub: the coordination plane's single-authority process.
//!
//! Mediates between an Intent Client and a constellation of Sentinels —
//! registration, heartbeat supervision, entropy-gated settlement, per-command
//! consensus voting with hijack-and-resume, a sovereign context store, and a
//! side-talk router — all driven by the [`orchestrator::Orchestrator`] state
//! machine.

pub mod config;
pub mod context;
pub mod driver;
pub mod entropy;
pub mod orchestrator;
pub mod registry;
pub mod sidetalk;
pub mod supervisor;
pub mod trace;
pub mod transport;

pub use config::HubConfig;
pub use context::ContextStore;
pub use driver::{BrowserDriver, FailingBrowserDriver, NullBrowserDriver};
pub use entropy::EntropyMonitor;
pub use orchestrator::Orchestrator;
pub use registry::{Registry, SentinelRecord};
pub use trace::TraceRecorder;
pub use transport::HubState;
