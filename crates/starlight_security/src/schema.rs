//! JSON-RPC method and parameter shape validation.
//!
//! Every inbound frame is checked against the set of method names the
//! coordination plane actually understands before a handler ever sees it,
//! and its `params` object is checked for the fields that method requires.
//! Unknown methods and malformed params both surface as a `SchemaViolation`
//! rather than reaching application code.

use once_cell::sync::Lazy;
use serde_json::Value;
use starlight_protocol::ProtocolError;
use std::collections::HashMap;

/// Which direction a method is sent: Intent Client / Sentinel -> Hub, or
/// Hub -> Sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodDirection {
    Inbound,
    Outbound,
}

struct MethodSpec {
    direction: MethodDirection,
    required_params: &'static [&'static str],
}

static METHODS: Lazy<HashMap<&'static str, MethodSpec>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "starlight.registration",
        MethodSpec { direction: MethodDirection::Inbound, required_params: &["layer", "priority"] },
    );
    m.insert(
        "starlight.challenge_response",
        MethodSpec { direction: MethodDirection::Inbound, required_params: &["response"] },
    );
    m.insert(
        "starlight.pulse",
        MethodSpec { direction: MethodDirection::Inbound, required_params: &["layer"] },
    );
    m.insert(
        "starlight.clear",
        MethodSpec { direction: MethodDirection::Inbound, required_params: &[] },
    );
    m.insert(
        "starlight.wait",
        MethodSpec { direction: MethodDirection::Inbound, required_params: &[] },
    );
    m.insert(
        "starlight.hijack",
        MethodSpec { direction: MethodDirection::Inbound, required_params: &["reason"] },
    );
    m.insert(
        "starlight.resume",
        MethodSpec { direction: MethodDirection::Inbound, required_params: &["re_check"] },
    );
    m.insert(
        "starlight.action",
        MethodSpec { direction: MethodDirection::Inbound, required_params: &["action"] },
    );
    m.insert(
        "starlight.context_update",
        MethodSpec { direction: MethodDirection::Inbound, required_params: &["context"] },
    );
    m.insert(
        "starlight.sidetalk",
        MethodSpec {
            direction: MethodDirection::Inbound,
            required_params: &["from", "to", "topic", "payload"],
        },
    );
    m.insert(
        "starlight.abort",
        MethodSpec { direction: MethodDirection::Inbound, required_params: &[] },
    );
    m.insert(
        "starlight.pre_check",
        MethodSpec { direction: MethodDirection::Outbound, required_params: &["command", "url"] },
    );
    m.insert(
        "starlight.entropy_stream",
        MethodSpec { direction: MethodDirection::Outbound, required_params: &["entropy"] },
    );
    m.insert(
        "starlight.sovereign_update",
        MethodSpec { direction: MethodDirection::Outbound, required_params: &["context"] },
    );
    m.insert(
        "starlight.sidetalk_ack",
        MethodSpec { direction: MethodDirection::Outbound, required_params: &["status"] },
    );
    m.insert(
        "starlight.shutdown",
        MethodSpec { direction: MethodDirection::Outbound, required_params: &[] },
    );
    m
});

/// Validate a method name and its `params` object against the known method
/// table. Returns the method's direction on success.
pub fn validate(method: &str, params: &Value) -> Result<MethodDirection, ProtocolError> {
    let spec = METHODS
        .get(method)
        .ok_or_else(|| ProtocolError::UnknownMethod(method.to_string()))?;

    for field in spec.required_params {
        if params.get(field).is_none() {
            return Err(ProtocolError::SchemaViolation {
                method: method.to_string(),
                detail: format!("missing required field `{field}`"),
            });
        }
    }

    Ok(spec.direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_method_is_rejected() {
        let err = validate("starlight.nonexistent", &json!({}));
        assert!(matches!(err, Err(ProtocolError::UnknownMethod(_))));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = validate("starlight.hijack", &json!({}));
        assert!(matches!(err, Err(ProtocolError::SchemaViolation { .. })));
    }

    #[test]
    fn well_formed_registration_is_accepted() {
        let dir = validate(
            "starlight.registration",
            &json!({"layer": "PulseSentinel", "priority": 1}),
        )
        .unwrap();
        assert_eq!(dir, MethodDirection::Inbound);
    }

    #[test]
    fn outbound_method_direction_is_reported() {
        let dir = validate(
            "starlight.pre_check",
            &json!({"command": {}, "url": "https://example.com"}),
        )
        .unwrap();
        assert_eq!(dir, MethodDirection::Outbound);
    }

    #[test]
    fn clear_has_no_required_fields() {
        assert!(validate("starlight.clear", &json!({})).is_ok());
    }
}
