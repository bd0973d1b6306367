//! Scratch-space usage log (spec.md §4.F step 1/4).
//!
//! Unlike the manifest/artifact usage logs, a scratch directory's liveness
//! depends on whether *any* of its recorded parent projects still exists,
//! not just on a timestamp — so it gets its own small record type rather
//! than reusing `UsageLog<K>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GcError;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
struct ScratchRecord {
    #[serde(default)]
    parent_projects: Vec<String>,
    time: u64,
}

/// `scratch_usage.toml`: scratch directory path → parent projects that
/// have used it, plus a last-access timestamp.
#[derive(Debug, Clone, Default)]
pub struct ScratchUsageLog {
    entries: BTreeMap<String, ScratchRecord>,
}

impl ScratchUsageLog {
    #[must_use]
    pub fn new() -> Self {
        ScratchUsageLog::default()
    }

    pub fn record(&mut self, scratch_path: String, parent_project: String, time: u64) {
        let record = self.entries.entry(scratch_path).or_default();
        if !record.parent_projects.contains(&parent_project) {
            record.parent_projects.push(parent_project);
        }
        if time > record.time {
            record.time = time;
        }
    }

    /// A scratch path is live if any of its recorded parent projects
    /// still exists on disk.
    #[must_use]
    pub fn is_live(&self, scratch_path: &str, project_exists: impl Fn(&str) -> bool) -> bool {
        self.entries
            .get(scratch_path)
            .is_some_and(|record| record.parent_projects.iter().any(|p| project_exists(p)))
    }

    pub fn condense(&mut self, still_exists: impl Fn(&str) -> bool) {
        self.entries.retain(|path, _| still_exists(path));
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// # Errors
    /// Returns an error if `content` is not valid toml in the expected shape.
    pub fn parse(path: &str, content: &str) -> Result<Self, GcError> {
        let entries: BTreeMap<String, ScratchRecord> = toml::from_str(content).map_err(|e| GcError::InvalidLog {
            path: path.to_owned(),
            message: e.to_string(),
        })?;
        Ok(ScratchUsageLog { entries })
    }

    #[must_use]
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(&self.entries).unwrap_or_default()
    }
}
