//! Starlight Sentinel Runtime: the library every Sentinel agent process is
//! built on.
//!
//! Handles the dial/reconnect loop, the registration and challenge-response
//! handshake, heartbeat emission, inbound dispatch to user-overridable
//! hooks, sending helpers for every Hub-directed verb, and atomic
//! persistent memory. A Sentinel binary provides a [`SentinelHooks`]
//! implementation and hands it to [`SentinelRuntime::new`].

pub mod config;
pub mod error;
pub mod handle;
pub mod hooks;
pub mod memory;
pub mod runtime;

pub use config::SentinelRuntimeConfig;
pub use error::SentinelRuntimeError;
pub use handle::{CommandContext, SentinelHandle};
pub use hooks::SentinelHooks;
pub use memory::Memory;
pub use runtime::SentinelRuntime;
