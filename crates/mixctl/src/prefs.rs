//! Client-side preferences: UI size and profile/channel shortcuts.
//!
//! Values are opaque strings keyed by name.  The core only knows the two keys
//! below; everything else belongs to the view.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

pub const SHORTCUTS_KEY: &str = "MPshortcuts";
pub const SMALL_UI_KEY: &str = "MPsmallUI";

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("preference file: {0}")]
    Io(#[from] std::io::Error),
    #[error("preference file: {0}")]
    Encode(#[from] toml::ser::Error),
}

pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError>;
    fn remove(&mut self, key: &str) -> Result<(), PrefsError>;
}

/// Parses the comma separated shortcut list.  Zero and garbage are skipped.
pub fn shortcuts(store: &dyn PreferenceStore) -> Vec<i32> {
    store
        .get(SHORTCUTS_KEY)
        .map(|raw| {
            raw.split(',')
                .filter_map(|s| s.trim().parse::<i32>().ok())
                .filter(|&id| id != 0)
                .collect()
        })
        .unwrap_or_default()
}

pub fn save_shortcuts(store: &mut dyn PreferenceStore, ids: &[i32]) -> Result<(), PrefsError> {
    if ids.is_empty() {
        return store.remove(SHORTCUTS_KEY);
    }
    let raw = ids
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    store.set(SHORTCUTS_KEY, &raw)
}

pub fn small_ui(store: &dyn PreferenceStore) -> bool {
    store
        .get(SMALL_UI_KEY)
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PrefsError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Preferences persisted as a flat TOML table.  Every change is written
/// through to disk.
#[derive(Debug)]
pub struct TomlPreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl TomlPreferences {
    /// Opens `path`.  A missing or unreadable file starts out empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                warn!("prefs: ignoring unreadable {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, values }
    }

    fn save(&self) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PreferenceStore for TomlPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<(), PrefsError> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}
