//! Filter configuration
//!
//! Persisted keys, documented defaults, and username normalization. The
//! in-memory [`FilterConfig`] is owned by the engine and mutated only from
//! settings-change notifications, plus the single watchdog auto-disable
//! path.

use std::time::Duration;

use serde_json::Value;

use crate::store::SettingsStore;

// =============================================================================
// Persisted keys
// =============================================================================

pub const KEY_ENABLED: &str = "enabled";
pub const KEY_BLACKLIST: &str = "blacklist";
pub const KEY_FUZZY: &str = "fuzzyEnabled";
pub const KEY_WATCHDOG_AUTO_DISABLE: &str = "watchdogAutoDisable";
pub const KEY_WATCHDOG_THRESHOLD_MS: &str = "watchdogThresholdMs";

pub const DEFAULT_WATCHDOG_THRESHOLD: Duration = Duration::from_millis(500);

// =============================================================================
// FilterConfig
// =============================================================================

/// Read-only snapshot used by the matcher and the scan queue each pass.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub enabled: bool,
    /// Normalized, deduplicated usernames. Insertion order is preserved for
    /// display; matching does not depend on it.
    pub blocklist: Vec<String>,
    pub fuzzy_match: bool,
    pub watchdog_auto_disable: bool,
    pub watchdog_threshold: Duration,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blocklist: Vec::new(),
            fuzzy_match: false,
            watchdog_auto_disable: false,
            watchdog_threshold: DEFAULT_WATCHDOG_THRESHOLD,
        }
    }
}

impl FilterConfig {
    /// Load every key from the store. Missing or ill-typed values fall back
    /// to the defaults; a store error is logged and leaves the whole config
    /// at its defaults.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let mut config = Self::default();

        let mut read = |key: &str| match store.get(key) {
            Ok(value) => value,
            Err(err) => {
                log::error!("failed to load setting '{key}': {err}");
                None
            }
        };

        if let Some(value) = read(KEY_ENABLED).as_ref().and_then(Value::as_bool) {
            config.enabled = value;
        }
        if let Some(list) = read(KEY_BLACKLIST) {
            config.set_blocklist(string_array(&list));
        }
        if let Some(value) = read(KEY_FUZZY).as_ref().and_then(Value::as_bool) {
            config.fuzzy_match = value;
        }
        if let Some(value) = read(KEY_WATCHDOG_AUTO_DISABLE)
            .as_ref()
            .and_then(Value::as_bool)
        {
            config.watchdog_auto_disable = value;
        }
        if let Some(ms) = read(KEY_WATCHDOG_THRESHOLD_MS)
            .as_ref()
            .and_then(Value::as_u64)
            .filter(|&ms| ms > 0)
        {
            config.watchdog_threshold = Duration::from_millis(ms);
        }

        config
    }

    /// Replace the blocklist, normalizing and deduplicating entries.
    pub fn set_blocklist(&mut self, raw: impl IntoIterator<Item = String>) {
        self.blocklist.clear();
        for entry in raw {
            let normalized = normalize_username(&entry);
            if normalized.is_empty() {
                continue;
            }
            if !self.blocklist.contains(&normalized) {
                self.blocklist.push(normalized);
            }
        }
    }
}

/// Extract the string entries of a JSON array, ignoring anything else.
pub fn string_array(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Canonical form of a username: trimmed, lowercased, one leading `@`
/// stripped.
pub fn normalize_username(raw: &str) -> String {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix('@').unwrap_or(trimmed);
    bare.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn normalization() {
        assert_eq!(normalize_username("  @Alice "), "alice");
        assert_eq!(normalize_username("BOB"), "bob");
        assert_eq!(normalize_username("@@x"), "@x");
        assert_eq!(normalize_username("  "), "");
    }

    #[test]
    fn blocklist_dedupes_by_normalized_form() {
        let mut config = FilterConfig::default();
        config.set_blocklist(vec![
            "@Alice".to_string(),
            "alice".to_string(),
            " ALICE ".to_string(),
            "bob".to_string(),
            "".to_string(),
        ]);
        assert_eq!(config.blocklist, vec!["alice", "bob"]);
    }

    #[test]
    fn load_defaults_from_empty_store() {
        let store = MemoryStore::new();
        let config = FilterConfig::load(&store);
        assert!(config.enabled);
        assert!(config.blocklist.is_empty());
        assert!(!config.fuzzy_match);
        assert!(!config.watchdog_auto_disable);
        assert_eq!(config.watchdog_threshold, DEFAULT_WATCHDOG_THRESHOLD);
    }

    #[test]
    fn load_reads_every_key() {
        let store = MemoryStore::with_values([
            (KEY_ENABLED.to_string(), json!(false)),
            (KEY_BLACKLIST.to_string(), json!(["@Alice", "bob"])),
            (KEY_FUZZY.to_string(), json!(true)),
            (KEY_WATCHDOG_AUTO_DISABLE.to_string(), json!(true)),
            (KEY_WATCHDOG_THRESHOLD_MS.to_string(), json!(750)),
        ]);
        let config = FilterConfig::load(&store);
        assert!(!config.enabled);
        assert_eq!(config.blocklist, vec!["alice", "bob"]);
        assert!(config.fuzzy_match);
        assert!(config.watchdog_auto_disable);
        assert_eq!(config.watchdog_threshold, Duration::from_millis(750));
    }

    #[test]
    fn load_survives_store_errors() {
        let mut store = MemoryStore::new();
        store.fail_loads = true;
        let config = FilterConfig::load(&store);
        assert!(config.enabled);
        assert!(config.blocklist.is_empty());
    }

    #[test]
    fn ill_typed_values_fall_back() {
        let store = MemoryStore::with_values([
            (KEY_ENABLED.to_string(), json!("yes")),
            (KEY_BLACKLIST.to_string(), json!([1, 2, "carol"])),
            (KEY_WATCHDOG_THRESHOLD_MS.to_string(), json!(0)),
        ]);
        let config = FilterConfig::load(&store);
        assert!(config.enabled);
        assert_eq!(config.blocklist, vec!["carol"]);
        assert_eq!(config.watchdog_threshold, DEFAULT_WATCHDOG_THRESHOLD);
    }
}
