//! Starlight coordination protocol: JSON-RPC 2.0 wire types, method
//! parameter shapes, lifecycle enums, and canonical defaults shared by the
//! Hub and every Sentinel Runtime.
//!
//! Wire carrier: one WebSocket text message carries exactly one JSON-RPC
//! object. This crate only defines the payload shapes; the
//! WebSocket accept/dial loop lives in `starlight_hub` and `starlight_sentinel`
//! respectively.

pub mod config;
pub mod defaults;
pub mod error;
pub mod types;

pub use error::{ErrorCode, ProtocolError};
pub use types::{
    ActionParams, ActionVerb, BlockingElement, ChallengeResponseParams, ClearParams,
    CommandCompletePayload, CommandOutcome, CommandState, ContextUpdateParams,
    EntropyStreamPayload, ErrorKind, HijackParams, PreCheckCommand, PreCheckPayload,
    PulseParams, RegistrationParams, RegistrationResult, ResumeParams, RpcErrorObject,
    RpcNotification, RpcRequest, RpcResponse, SentinelState, SidetalkAckPayload,
    SidetalkAckStatus, SidetalkParams, SovereignUpdatePayload, Verdict, Viewport, VoteRecord,
    SIDETALK_BROADCAST,
};
