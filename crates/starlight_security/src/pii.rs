//! PII detection guard.
//!
//! Scans the text surfaced in a pre-check payload (blocking element text and
//! page text) against a set of regex patterns for common PII shapes. Grounded
//! on the compliance-sentinel pattern set: email, SSN, credit card, US phone,
//! IP address, and date-of-birth.

use once_cell::sync::Lazy;
use regex::Regex;
use starlight_protocol::PreCheckPayload;
use std::collections::HashMap;

/// What a PII guard does once it finds something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiMode {
    /// Log the finding and let the command proceed.
    Alert,
    /// Veto the command (hijack) until the page no longer contains PII.
    Block,
    /// Replace matched spans with a redacted placeholder before handing text
    /// onward (e.g. into a screenshot caption or trace record).
    Redact,
}

impl PiiMode {
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "block" => PiiMode::Block,
            "redact" => PiiMode::Redact,
            _ => PiiMode::Alert,
        }
    }
}

/// A single PII match. `redacted` never carries the raw matched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiiFinding {
    pub kind: String,
    pub redacted: String,
    pub raw_length: usize,
}

static DEFAULT_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("email", Regex::new(r"(?i)\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()),
        ("ssn", Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap()),
        (
            "credit_card",
            Regex::new(r"\b(?:4[0-9]{12}(?:[0-9]{3})?|5[1-5][0-9]{14}|3[47][0-9]{13}|6(?:011|5[0-9]{2})[0-9]{12})\b")
                .unwrap(),
        ),
        (
            "phone_us",
            Regex::new(r"\b(?:\+1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap(),
        ),
        ("ip_address", Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap()),
        (
            "date_of_birth",
            Regex::new(r"\b(?:0[1-9]|1[0-2])[/-](?:0[1-9]|[12]\d|3[01])[/-](?:19|20)\d{2}\b").unwrap(),
        ),
    ]
});

/// A compiled set of PII patterns: the built-in defaults plus any caller
/// overrides, addressable by kind name (an override replaces the built-in
/// pattern of the same name).
pub struct PiiGuard {
    patterns: Vec<(String, Regex)>,
    mode: PiiMode,
}

impl PiiGuard {
    pub fn new(mode: PiiMode, custom_patterns: HashMap<String, String>) -> Self {
        let mut patterns: Vec<(String, Regex)> = DEFAULT_PATTERNS
            .iter()
            .filter(|(name, _)| !custom_patterns.contains_key(*name))
            .map(|(name, re)| (name.to_string(), re.clone()))
            .collect();

        for (name, pattern) in custom_patterns {
            match Regex::new(&format!("(?i){pattern}")) {
                Ok(re) => patterns.push((name, re)),
                Err(e) => tracing::warn!(pattern_name = %name, error = %e, "invalid PII pattern, skipping"),
            }
        }

        Self { patterns, mode }
    }

    pub fn mode(&self) -> PiiMode {
        self.mode
    }

    /// Scan a block of text and return every finding, in pattern-definition
    /// order. A match's raw value is never retained; only its redacted form.
    pub fn scan(&self, text: &str) -> Vec<PiiFinding> {
        let mut findings = Vec::new();
        for (kind, pattern) in &self.patterns {
            for m in pattern.find_iter(text) {
                let raw = m.as_str();
                findings.push(PiiFinding {
                    kind: kind.clone(),
                    redacted: redact(raw),
                    raw_length: raw.len(),
                });
            }
        }
        findings
    }

    /// Scan the text surfaces of a pre-check payload: blocking element text
    /// plus page text.
    pub fn scan_pre_check(&self, payload: &PreCheckPayload) -> Vec<PiiFinding> {
        let mut all_text = payload.page_text.clone().unwrap_or_default();
        for element in &payload.blocking {
            if let Some(text) = &element.text {
                all_text.push(' ');
                all_text.push_str(text);
            }
        }
        self.scan(&all_text)
    }

    /// Replace every PII match in `text` in place with its redacted form,
    /// leaving surrounding text untouched — used to sanitize a pre-check
    /// payload before fan-out in `redact` mode.
    pub fn redact_text(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (_, pattern) in &self.patterns {
            out = pattern.replace_all(&out, |caps: &regex::Captures| redact(&caps[0])).into_owned();
        }
        out
    }
}

/// Length-preserving-ish redaction: short values collapse entirely, longer
/// ones keep their first/last two characters.
fn redact(value: &str) -> String {
    let len = value.chars().count();
    if len <= 4 {
        return "****".to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[len - 2..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(len - 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_email_and_ssn() {
        let guard = PiiGuard::new(PiiMode::Alert, HashMap::new());
        let findings = guard.scan("contact alice@example.com or ssn 123-45-6789");
        let kinds: Vec<&str> = findings.iter().map(|f| f.kind.as_str()).collect();
        assert!(kinds.contains(&"email"));
        assert!(kinds.contains(&"ssn"));
    }

    #[test]
    fn redaction_never_leaks_raw_value() {
        let guard = PiiGuard::new(PiiMode::Alert, HashMap::new());
        let findings = guard.scan("alice@example.com");
        assert_eq!(findings.len(), 1);
        assert_ne!(findings[0].redacted, "alice@example.com");
        assert!(findings[0].redacted.contains('*'));
    }

    #[test]
    fn short_value_fully_masked() {
        assert_eq!(redact("ab"), "****");
        assert_eq!(redact("abcd"), "****");
    }

    #[test]
    fn custom_pattern_overrides_default() {
        let mut custom = HashMap::new();
        custom.insert("email".to_string(), r"nomatch".to_string());
        let guard = PiiGuard::new(PiiMode::Alert, custom);
        let findings = guard.scan("alice@example.com");
        assert!(findings.is_empty());
    }

    #[test]
    fn redact_text_masks_matches_in_place() {
        let guard = PiiGuard::new(PiiMode::Redact, HashMap::new());
        let redacted = guard.redact_text("email alice@example.com before dispatch");
        assert!(!redacted.contains("alice@example.com"));
        assert!(redacted.starts_with("email "));
        assert!(redacted.ends_with(" before dispatch"));
    }

    #[test]
    fn mode_parses_from_config_string() {
        assert_eq!(PiiMode::from_str_or_default("block"), PiiMode::Block);
        assert_eq!(PiiMode::from_str_or_default("redact"), PiiMode::Redact);
        assert_eq!(PiiMode::from_str_or_default("anything-else"), PiiMode::Alert);
    }
}
