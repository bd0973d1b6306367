//! Compat expressions: a disjunction of semver intervals, stored both parsed
//! and as the original text the user wrote.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// A compat entry: `"1.2, 2.0"` means "1.2 <= v < 2.0-excluded-range OR
/// 2.0 <= v < 3.0", i.e. a union of caret ranges.
///
/// Each comma-separated clause is parsed with semver's default (caret)
/// operator, which already implements the pre-1.0 rule this system commits
/// to: incompatible across minor versions below 1.0.0, incompatible across
/// major versions at or above 1.0.0.
#[derive(Debug, Clone)]
pub struct CompatExpr {
    original: String,
    intervals: Vec<semver::VersionReq>,
}

impl CompatExpr {
    /// Parse a compat expression from its on-disk text form.
    ///
    /// # Errors
    /// Returns an error if any comma-separated clause is not a valid semver
    /// requirement.
    pub fn parse(name: &str, text: &str) -> Result<Self, ConfigError> {
        let intervals = text
            .split(',')
            .map(|clause| {
                semver::VersionReq::parse(clause.trim()).map_err(|source| ConfigError::InvalidCompat {
                    name: name.to_owned(),
                    expr: text.to_owned(),
                    reason: source.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompatExpr {
            original: text.to_owned(),
            intervals,
        })
    }

    /// Does `version` satisfy any of this expression's intervals?
    #[must_use]
    pub fn matches(&self, version: &semver::Version) -> bool {
        self.intervals.iter().any(|req| req.matches(version))
    }

    /// The original text as written in the project file.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl Serialize for CompatExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for CompatExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let intervals = text
            .split(',')
            .map(|clause| semver::VersionReq::parse(clause.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(D::Error::custom)?;
        Ok(CompatExpr {
            original: text,
            intervals,
        })
    }
}

impl PartialEq for CompatExpr {
    fn eq(&self, other: &Self) -> bool {
        self.original == other.original
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pre_1_0_incompatible_across_minor() {
        let compat = CompatExpr::parse("pkg", "0.2.3").unwrap();
        assert!(compat.matches(&semver::Version::parse("0.2.9").unwrap()));
        assert!(!compat.matches(&semver::Version::parse("0.3.0").unwrap()));
    }

    #[test]
    fn post_1_0_incompatible_across_major() {
        let compat = CompatExpr::parse("pkg", "1.2.3").unwrap();
        assert!(compat.matches(&semver::Version::parse("1.9.0").unwrap()));
        assert!(!compat.matches(&semver::Version::parse("2.0.0").unwrap()));
    }

    #[test]
    fn union_of_clauses() {
        let compat = CompatExpr::parse("pkg", "1.2, 2.0").unwrap();
        assert!(compat.matches(&semver::Version::parse("1.5.0").unwrap()));
        assert!(compat.matches(&semver::Version::parse("2.0.1").unwrap()));
        assert!(!compat.matches(&semver::Version::parse("3.0.0").unwrap()));
    }

    #[test]
    fn invalid_clause_is_rejected() {
        assert!(CompatExpr::parse("pkg", "not-a-version").is_err());
    }

    #[test]
    fn round_trips_original_text() {
        let compat = CompatExpr::parse("pkg", "1.2, 2.0").unwrap();
        assert_eq!(compat.as_str(), "1.2, 2.0");
    }
}
