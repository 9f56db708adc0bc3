//! Engine configuration and persisted preferences

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Default maximum number of records kept in the ledger
pub const DEFAULT_MAX_RECORDS: usize = 500;

/// Default number of characters kept in an in-memory body preview
pub const DEFAULT_PREVIEW_LEN: usize = crate::models::PREVIEW_LEN;

const PREFERENCES_FILE: &str = "preferences.json";

/// Configuration for the capture engine, supplied by the hosting application
#[derive(Debug, Clone)]
pub struct InspectorConfig {
    /// Directory holding body files and the preferences file
    pub storage_path: PathBuf,
    /// Maximum number of records kept in the ledger before FIFO eviction
    pub max_records: usize,
    /// Number of characters kept in an in-memory body preview
    pub preview_len: usize,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            storage_path: base.join("netlens").join("bodies"),
            max_records: DEFAULT_MAX_RECORDS,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceData {
    /// True means captured traffic survives restarts and navigation
    #[serde(default)]
    preserve_log: bool,
}

/// Persisted user preferences.
///
/// A single boolean today: "preserve log". Stored as a small JSON file next
/// to the body files. A missing or unreadable file reads as the default
/// (false); writes are best-effort.
#[derive(Debug)]
pub struct Preferences {
    path: PathBuf,
    data: RwLock<PreferenceData>,
}

impl Preferences {
    /// Load preferences from `dir`, falling back to defaults
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating preferences directory {:?}", dir))?;
        }
        let path = dir.join(PREFERENCES_FILE);
        let data = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupt preferences file {:?}: {}", path, e);
                PreferenceData::default()
            }),
            Err(_) => PreferenceData::default(),
        };
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Whether captured traffic should survive restarts and navigation
    pub fn preserve_log(&self) -> bool {
        self.data
            .read()
            .map(|data| data.preserve_log)
            .unwrap_or(false)
    }

    /// Set and persist the preserve-log preference
    pub fn set_preserve_log(&self, preserve: bool) {
        // Encode under the lock, write to disk after releasing it so
        // readers never wait on I/O
        let encoded = {
            let Ok(mut data) = self.data.write() else {
                return;
            };
            data.preserve_log = preserve;
            serde_json::to_string_pretty(&*data)
        };
        match encoded {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    tracing::warn!("Failed to persist preferences: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to encode preferences: {}", e),
        }
    }
}
