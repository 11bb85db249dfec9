//! Shared `config.json` loading.
//!
//! The Hub and every Sentinel Runtime read the same flat `config.json` file:
//! a missing or corrupt file is tolerated and yields an empty configuration
//! plus a warning the caller may log, never a fatal error.

use serde_json::Value;
use std::fs;
use std::path::Path;

/// A loaded (or defaulted) `config.json` document plus dotted-path accessors.
///
/// Typed `HubConfig` / `SentinelRuntimeConfig` values are built on top of
/// this by reading out the specific keys each component cares about; `Raw`
/// never interprets the document itself.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    root: Value,
}

/// Outcome of loading `config.json`: the (possibly empty) document, plus a
/// warning message if the file existed but could not be read or parsed.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub config: RawConfig,
    pub warning: Option<String>,
}

impl RawConfig {
    /// Load `config.json` from `path`. Never fails: a missing file yields an
    /// empty document with no warning; an unreadable or malformed file
    /// yields an empty document with a warning describing why.
    pub fn load(path: &Path) -> LoadOutcome {
        if !path.exists() {
            return LoadOutcome {
                config: RawConfig::default(),
                warning: None,
            };
        }

        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(root) => LoadOutcome {
                    config: RawConfig { root },
                    warning: None,
                },
                Err(e) => LoadOutcome {
                    config: RawConfig::default(),
                    warning: Some(format!(
                        "could not parse {}: {e}",
                        path.display()
                    )),
                },
            },
            Err(e) => LoadOutcome {
                config: RawConfig::default(),
                warning: Some(format!("could not read {}: {e}", path.display())),
            },
        }
    }

    /// Look up a dotted path such as `"sentinel.heartbeatInterval"`.
    pub fn get_path<'a>(&'a self, dotted: &str) -> Option<&'a Value> {
        let mut cursor = &self.root;
        for segment in dotted.split('.') {
            cursor = cursor.get(segment)?;
        }
        Some(cursor)
    }

    pub fn get_u64(&self, dotted: &str, default: u64) -> u64 {
        self.get_path(dotted).and_then(Value::as_u64).unwrap_or(default)
    }

    pub fn get_f64(&self, dotted: &str, default: f64) -> f64 {
        self.get_path(dotted).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn get_str(&self, dotted: &str, default: &str) -> String {
        self.get_path(dotted)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool(&self, dotted: &str, default: bool) -> bool {
        self.get_path(dotted).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn get_object(&self, dotted: &str) -> serde_json::Map<String, Value> {
        self.get_path(dotted)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_empty_config_no_warning() {
        let outcome = RawConfig::load(Path::new("/nonexistent/config.json"));
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.config.get_u64("hub.syncBudget", 30), 30);
    }

    #[test]
    fn corrupt_file_yields_warning_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut f = fs::File::create(&path).unwrap();
        write!(f, "{{ not valid json").unwrap();
        let outcome = RawConfig::load(&path);
        assert!(outcome.warning.is_some());
        assert_eq!(outcome.config.get_u64("hub.syncBudget", 30), 30);
    }

    #[test]
    fn dotted_path_resolves_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"sentinel": {"heartbeatInterval": 7}}"#).unwrap();
        let outcome = RawConfig::load(&path);
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.config.get_u64("sentinel.heartbeatInterval", 2), 7);
        assert_eq!(outcome.config.get_u64("sentinel.missing", 2), 2);
    }
}
