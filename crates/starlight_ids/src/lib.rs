//! Shared identifier wrappers for the Starlight coordination plane.
//!
//! `SentinelId` and `ChallengeNonce` are opaque UUID-backed tokens minted by
//! the Hub during registration. `CommandId` is a plain monotonic counter
//! scoped to a single mission, never a UUID, since the Orchestrator assigns
//! it itself and callers frequently need ordering (`CommandId` implements
//! `Ord`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Error returned when parsing a UUID-backed identifier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

macro_rules! define_uuid_id {
    ($name:ident, $label:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                Uuid::parse_str(value)
                    .map_err(|e| IdParseError::new(format!("invalid {}: {}", $label, e)))?;
                Ok(Self(value.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_uuid_id!(SentinelId, "sentinel ID");
define_uuid_id!(ChallengeNonce, "challenge nonce");

/// Monotonic command identifier, scoped to a single mission.
///
/// Unlike the UUID-backed IDs above, `CommandId` is assigned by the
/// Orchestrator itself from an in-process counter, so ordering between two
/// IDs reflects submission order within that mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CommandId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Per-mission generator of strictly increasing `CommandId`s.
#[derive(Debug, Default)]
pub struct CommandIdSequence {
    next: AtomicU64,
}

impl CommandIdSequence {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next `CommandId`, starting at 1.
    pub fn next(&self) -> CommandId {
        CommandId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_id_round_trips_through_json() {
        let id = SentinelId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: SentinelId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn sentinel_id_rejects_non_uuid() {
        assert!(SentinelId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn command_id_sequence_is_monotonic() {
        let seq = CommandIdSequence::new();
        let a = seq.next();
        let b = seq.next();
        let c = seq.next();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.as_u64(), 1);
    }

    #[test]
    fn command_id_displays_as_plain_integer() {
        let id = CommandId::new(42);
        assert_eq!(id.to_string(), "42");
    }
}
