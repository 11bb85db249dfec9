//! Protocol-level error taxonomy and JSON-RPC 2.0 error codes.

use thiserror::Error;

/// Errors raised while decoding or validating a wire frame.
///
/// These never represent a fatal condition for the peer loop that produced
/// them — a malformed frame is logged and dropped, not a crash.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON frame: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("frame exceeds max size: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("not a JSON-RPC 2.0 object")]
    NotJsonRpc,

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("schema violation for method {method}: {detail}")]
    SchemaViolation { method: String, detail: String },
}

/// Reserved and application-specific JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    NotFound,
    StaleIntent,
    TimeoutExceeded,
    Obstructed,
    DriverCrash,
}

impl ErrorCode {
    pub const fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::NotFound => -32001,
            ErrorCode::StaleIntent => -32002,
            ErrorCode::TimeoutExceeded => -32003,
            ErrorCode::Obstructed => -32004,
            ErrorCode::DriverCrash => -32005,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::NotFound => "Not found",
            ErrorCode::StaleIntent => "Stale intent",
            ErrorCode::TimeoutExceeded => "Timeout exceeded",
            ErrorCode::Obstructed => "Obstructed",
            ErrorCode::DriverCrash => "Driver crash",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_spec_values() {
        assert_eq!(ErrorCode::NotFound.code(), -32001);
        assert_eq!(ErrorCode::StaleIntent.code(), -32002);
        assert_eq!(ErrorCode::TimeoutExceeded.code(), -32003);
        assert_eq!(ErrorCode::Obstructed.code(), -32004);
        assert_eq!(ErrorCode::DriverCrash.code(), -32005);
    }
}
