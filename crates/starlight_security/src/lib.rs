//! Starlight Security Guards (C10): PII detection, constant-time secret
//! comparison for the registration handshake, and JSON-RPC method/schema
//! validation.

pub mod pii;
pub mod schema;
pub mod secret;

pub use pii::{PiiFinding, PiiGuard, PiiMode};
pub use schema::{validate, MethodDirection};
pub use secret::tokens_equal;
