//! Generic path-usage log (spec.md §4.F step 1), shared across
//! `manifest_usage.toml` and `artifact_usage.toml`: a path keeps only its
//! most recent access timestamp.
//!
//! The two logs have identical shape — `path → [{time = …}]`, collapsed
//! to one record per path — so one generic type serves both, the same
//! way the teacher shares one download-verify-place routine across
//! distinct artifact kinds.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GcError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
struct Stamp {
    time: u64,
}

/// A usage log keyed by `K` (a path, in every concrete instantiation),
/// recording the most recent access time per key.
#[derive(Debug, Clone)]
pub struct UsageLog<K> {
    entries: BTreeMap<K, u64>,
}

impl<K: Ord> Default for UsageLog<K> {
    fn default() -> Self {
        UsageLog { entries: BTreeMap::new() }
    }
}

impl<K> UsageLog<K>
where
    K: Ord + Clone + Display + FromStr,
{
    #[must_use]
    pub fn new() -> Self {
        UsageLog { entries: BTreeMap::new() }
    }

    /// Record an access, keeping the most recent timestamp if `key` is
    /// already present.
    pub fn record(&mut self, key: K, time: u64) {
        self.entries
            .entry(key)
            .and_modify(|existing| {
                if time > *existing {
                    *existing = time;
                }
            })
            .or_insert(time);
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<u64> {
        self.entries.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Drop every entry whose path no longer exists, per spec.md's
    /// "dropping files that no longer exist" condensation step.
    pub fn condense(&mut self, still_exists: impl Fn(&K) -> bool) {
        self.entries.retain(|key, _| still_exists(key));
    }

    /// Parse a `path → [{time = …}]` toml usage log, taking the maximum
    /// timestamp recorded for each path.
    ///
    /// # Errors
    /// Returns an error if the content isn't valid toml in the expected
    /// shape, or a key cannot be parsed into `K`.
    pub fn parse(path: &str, content: &str) -> Result<Self, GcError> {
        let raw: BTreeMap<String, Vec<Stamp>> = toml::from_str(content).map_err(|e| GcError::InvalidLog {
            path: path.to_owned(),
            message: e.to_string(),
        })?;

        let mut log = UsageLog::new();
        for (key_str, stamps) in raw {
            let key = key_str.parse::<K>().map_err(|_| GcError::InvalidLog {
                path: path.to_owned(),
                message: format!("unparsable key \"{key_str}\""),
            })?;
            let max_time = stamps.iter().map(|s| s.time).max().unwrap_or(0);
            log.record(key, max_time);
        }
        Ok(log)
    }

    /// Serialize back to the `path → [{time = …}]` shape, sorted by key.
    #[must_use]
    pub fn to_toml_string(&self) -> String {
        let raw: BTreeMap<String, Vec<Stamp>> = self
            .entries
            .iter()
            .map(|(key, time)| (key.to_string(), vec![Stamp { time: *time }]))
            .collect();
        toml::to_string_pretty(&raw).unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_most_recent_timestamp() {
        let mut log: UsageLog<String> = UsageLog::new();
        log.record("a".to_owned(), 10);
        log.record("a".to_owned(), 5);
        assert_eq!(log.get(&"a".to_owned()), Some(10));
    }

    #[test]
    fn condense_drops_missing_paths() {
        let mut log: UsageLog<String> = UsageLog::new();
        log.record("keep".to_owned(), 1);
        log.record("drop".to_owned(), 1);
        log.condense(|key| key == "keep");
        assert_eq!(log.get(&"keep".to_owned()), Some(1));
        assert_eq!(log.get(&"drop".to_owned()), None);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut log: UsageLog<String> = UsageLog::new();
        log.record("/depot/packages/Example/abc".to_owned(), 42);
        let text = log.to_toml_string();
        let parsed: UsageLog<String> = UsageLog::parse("test", &text).unwrap();
        assert_eq!(parsed.get(&"/depot/packages/Example/abc".to_owned()), Some(42));
    }
}
