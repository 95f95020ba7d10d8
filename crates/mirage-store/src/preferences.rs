//! Persisted app preferences (spec.md §6 "Persisted state": `{hostPreferences:
//! map<hostUUID, {pinnedApps: set<bundleID_lowercased>, recentApps:
//! map<bundleID, timestamp>}>}`; "recent list capped at 50 entries per host
//! by recency").

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::atomic::{read_json, write_json_atomic};
use crate::error::StoreError;

const MAX_RECENT_APPS_PER_HOST: usize = 50;

/// Per-host app preferences: pinned apps (unordered set) and recently-used
/// apps (bundle ID -> last-used timestamp, millis since epoch).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostAppPreferences {
    pub pinned_apps: HashSet<String>,
    pub recent_apps: HashMap<String, u64>,
}

/// Top-level persisted document: one [`HostAppPreferences`] per host UUID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppPreferences {
    pub host_preferences: HashMap<String, HostAppPreferences>,
}

impl AppPreferences {
    /// Pins `bundle_id` (lowercased, per spec.md) for `host_uuid`.
    pub fn pin_app(&mut self, host_uuid: &str, bundle_id: &str) {
        self.host_preferences
            .entry(host_uuid.to_owned())
            .or_default()
            .pinned_apps
            .insert(bundle_id.to_lowercase());
    }

    pub fn unpin_app(&mut self, host_uuid: &str, bundle_id: &str) {
        if let Some(prefs) = self.host_preferences.get_mut(host_uuid) {
            prefs.pinned_apps.remove(&bundle_id.to_lowercase());
        }
    }

    pub fn is_pinned(&self, host_uuid: &str, bundle_id: &str) -> bool {
        self.host_preferences
            .get(host_uuid)
            .is_some_and(|prefs| prefs.pinned_apps.contains(&bundle_id.to_lowercase()))
    }

    /// Records `bundle_id` as used at `used_at_ms`, then trims the host's
    /// recent list down to the 50 most recently used entries.
    pub fn record_recent_app(&mut self, host_uuid: &str, bundle_id: &str, used_at_ms: u64) {
        let prefs = self.host_preferences.entry(host_uuid.to_owned()).or_default();
        prefs.recent_apps.insert(bundle_id.to_lowercase(), used_at_ms);
        trim_recent(&mut prefs.recent_apps);
    }

    pub fn recent_apps(&self, host_uuid: &str) -> Vec<(&str, u64)> {
        let Some(prefs) = self.host_preferences.get(host_uuid) else {
            return Vec::new();
        };
        let mut entries: Vec<_> = prefs.recent_apps.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

fn trim_recent(recent: &mut HashMap<String, u64>) {
    if recent.len() <= MAX_RECENT_APPS_PER_HOST {
        return;
    }
    let mut entries: Vec<(String, u64)> = recent.drain().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(MAX_RECENT_APPS_PER_HOST);
    recent.extend(entries);
}

/// Persists [`AppPreferences`] to a per-user config path, atomically.
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn default_location() -> Result<Self, StoreError> {
        let config_dir = dirs::config_dir().ok_or(StoreError::NoUserDirectory)?;
        Ok(Self::at_path(config_dir.join("mirage").join("app-preferences.json")))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<AppPreferences, StoreError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, prefs: &AppPreferences) -> Result<(), StoreError> {
        write_json_atomic(&self.path, prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinning_lowercases_the_bundle_id() {
        let mut prefs = AppPreferences::default();
        prefs.pin_app("host-1", "Com.Example.App");
        assert!(prefs.is_pinned("host-1", "com.example.app"));
        assert!(prefs.is_pinned("host-1", "COM.EXAMPLE.APP"));
    }

    #[test]
    fn recent_apps_are_capped_at_fifty_by_recency() {
        let mut prefs = AppPreferences::default();
        for i in 0..60u64 {
            prefs.record_recent_app("host-1", &format!("app.{i}"), i);
        }
        let recents = prefs.recent_apps("host-1");
        assert_eq!(recents.len(), 50);
        // Newest (highest timestamp) entries survive; oldest are evicted.
        assert!(recents.iter().any(|(id, _)| *id == "app.59"));
        assert!(!recents.iter().any(|(id, _)| *id == "app.9"));
    }

    #[test]
    fn unpin_removes_only_the_named_app() {
        let mut prefs = AppPreferences::default();
        prefs.pin_app("host-1", "a.b");
        prefs.pin_app("host-1", "c.d");
        prefs.unpin_app("host-1", "a.b");
        assert!(!prefs.is_pinned("host-1", "a.b"));
        assert!(prefs.is_pinned("host-1", "c.d"));
    }

    #[test]
    fn preferences_round_trip_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::at_path(dir.path().join("prefs.json"));
        let mut prefs = store.load().unwrap();
        assert!(prefs.host_preferences.is_empty());

        prefs.pin_app("host-1", "com.example.app");
        prefs.record_recent_app("host-1", "com.example.other", 42);
        store.save(&prefs).unwrap();

        let reloaded = store.load().unwrap();
        assert!(reloaded.is_pinned("host-1", "com.example.app"));
        assert_eq!(reloaded.recent_apps("host-1"), vec![("com.example.other", 42)]);
    }
}
