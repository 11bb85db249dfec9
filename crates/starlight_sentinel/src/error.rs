//! Sentinel Runtime error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentinelRuntimeError {
    #[error("failed to connect to hub at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("hub closed the connection before completing the registration handshake")]
    HandshakeIncomplete,

    #[error("hub rejected the registration or challenge response")]
    HandshakeRejected,

    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode outgoing frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to persist memory file {path}: {source}")]
    MemoryWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
