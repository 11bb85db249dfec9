//! Persistent Sentinel memory: a flat JSON object mapping an obstacle
//! identifier to the selector that last resolved it, written with an
//! atomic temp-file-then-rename replace so a crash mid-write never leaves
//! a truncated file.

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::SentinelRuntimeError;

#[derive(Debug, Clone, Default)]
pub struct Memory {
    entries: HashMap<String, Value>,
}

impl Memory {
    /// Load `path`. A missing file starts empty; a corrupt file is logged
    /// and treated as empty rather than treated as fatal.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => Self { entries },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "memory file corrupted, starting fresh");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read memory file, starting fresh");
                Self::default()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Atomic replace: write to a sibling temp file, then rename over
    /// `path`. The temp file is cleaned up if the write itself fails.
    pub fn save(&self, path: &Path) -> Result<(), SentinelRuntimeError> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let temp_path = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        let body = serde_json::to_vec_pretty(&self.entries).unwrap_or_default();
        if let Err(e) = fs::write(&temp_path, &body) {
            let _ = fs::remove_file(&temp_path);
            return Err(SentinelRuntimeError::MemoryWrite {
                path: path.display().to_string(),
                source: e,
            });
        }
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(SentinelRuntimeError::MemoryWrite {
                path: path.display().to_string(),
                source: e,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty() {
        let mem = Memory::load(Path::new("/nonexistent/Pulse_memory.json"));
        assert!(mem.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty_instead_of_panicking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Pulse_memory.json");
        fs::write(&path, "{ not valid json").unwrap();
        let mem = Memory::load(&path);
        assert!(mem.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Janitor_memory.json");
        let mut mem = Memory::default();
        mem.insert("modal-overlay", serde_json::json!("#close-btn"));
        mem.save(&path).unwrap();

        let loaded = Memory::load(&path);
        assert_eq!(loaded.get("modal-overlay").unwrap(), "#close-btn");
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Pii_memory.json");
        Memory::default().save(&path).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
