//! `orphaned.toml` (spec.md §4.F step 6): delayed-deletion bookkeeping,
//! `path → first-seen-as-orphan timestamp`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GcError;

/// Default delay before an orphan candidate is actually deleted.
pub const DEFAULT_COLLECT_DELAY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Default)]
pub struct OrphanLog {
    entries: BTreeMap<String, u64>,
}

impl OrphanLog {
    #[must_use]
    pub fn new() -> Self {
        OrphanLog::default()
    }

    /// # Errors
    /// Returns an error if `content` is not valid toml in the expected shape.
    pub fn parse(path: &str, content: &str) -> Result<Self, GcError> {
        let entries: BTreeMap<String, u64> = toml::from_str(content).map_err(|e| GcError::InvalidLog {
            path: path.to_owned(),
            message: e.to_string(),
        })?;
        Ok(OrphanLog { entries })
    }

    #[must_use]
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(&self.entries).unwrap_or_default()
    }

    /// Look up a candidate's first-seen timestamp, recording `now` if this
    /// is the first time it's been observed as an orphan (spec.md: "look
    /// up its timestamp or assign `now()`").
    pub fn first_seen_or_record(&mut self, path: &str, now: u64) -> u64 {
        *self.entries.entry(path.to_owned()).or_insert(now)
    }

    /// `true` once `now - first_seen >= collect_delay` (P7: never before).
    #[must_use]
    pub fn is_due_for_deletion(&self, path: &str, now: u64, collect_delay: Duration) -> bool {
        self.entries
            .get(path)
            .is_some_and(|&first_seen| now.saturating_sub(first_seen) >= collect_delay.as_secs())
    }

    pub fn remove(&mut self, path: &str) {
        self.entries.remove(path);
    }

    /// Drop orphanage entries for paths that are no longer orphan
    /// candidates at all (they became live again, or were deleted).
    pub fn retain(&mut self, still_candidate: impl Fn(&str) -> bool) {
        self.entries.retain(|path, _| still_candidate(path));
    }
}
