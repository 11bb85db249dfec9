//! Browser driver collaborator boundary.
//!
//! The actual browser driver (a CLI/IPC process) is explicitly out of scope:
//! the Orchestrator treats it as an opaque RPC endpoint. This trait is
//! the seam; [`NullBrowserDriver`] is a trivial always-succeeds stand-in
//! used by the demo binaries and tests.

use async_trait::async_trait;
use starlight_protocol::{ActionParams, CommandOutcome, ErrorKind};

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Execute a single action (either the original command or a
    /// hijacking Sentinel's remediation step) and report the outcome.
    async fn execute(&self, action: &ActionParams) -> CommandOutcome;

    /// Visible page text for the page the next command targets, for the
    /// Hub-side PII guard to scan before PRE_CHECK fan-out. `None` when the
    /// driver has nothing to offer (the default for every stand-in here).
    async fn page_text(&self) -> Option<String> {
        None
    }
}

/// Always succeeds immediately. Stands in for the real driver process.
pub struct NullBrowserDriver;

#[async_trait]
impl BrowserDriver for NullBrowserDriver {
    async fn execute(&self, _action: &ActionParams) -> CommandOutcome {
        CommandOutcome {
            success: true,
            error_kind: None,
            screenshot_ref: None,
        }
    }
}

/// A test/demo driver that fails with a configured error kind, to exercise
/// the Orchestrator's remediation-failure path.
pub struct FailingBrowserDriver {
    pub kind: ErrorKind,
}

#[async_trait]
impl BrowserDriver for FailingBrowserDriver {
    async fn execute(&self, _action: &ActionParams) -> CommandOutcome {
        CommandOutcome {
            success: false,
            error_kind: Some(self.kind),
            screenshot_ref: None,
        }
    }
}
