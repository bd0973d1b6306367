//! Stable, spec-mandated key ordering for on-disk TOML documents.

use toml::value::{Table, Value};

/// Reorder `table`'s top-level keys: `priority`, in the given order, first
/// (skipping any not present), then every remaining key sorted
/// alphabetically.
#[must_use]
pub fn reorder_table(table: Table, priority: &[&str]) -> Table {
    let mut ordered = Table::new();
    let mut remaining = table;

    for key in priority {
        if let Some(value) = remaining.remove(*key) {
            ordered.insert((*key).to_owned(), value);
        }
    }

    let mut rest: Vec<(String, Value)> = remaining.into_iter().collect();
    rest.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in rest {
        ordered.insert(key, value);
    }

    ordered
}

/// The fixed top-level key priority for `Project.toml` (spec.md §4.A).
pub const PROJECT_KEY_ORDER: &[&str] = &[
    "name", "uuid", "version", "deps", "weakdeps", "compat", "extras", "targets", "sources",
];

/// The fixed top-level key priority for `Manifest.toml` (spec.md §6).
pub const MANIFEST_KEY_ORDER: &[&str] = &["julia_version", "manifest_format", "project_hash", "deps"];

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn priority_keys_come_first_in_order() {
        let mut table = Table::new();
        table.insert("zeta".to_owned(), Value::Integer(1));
        table.insert("version".to_owned(), Value::String("1.0.0".to_owned()));
        table.insert("name".to_owned(), Value::String("Foo".to_owned()));

        let ordered = reorder_table(table, PROJECT_KEY_ORDER);
        let keys: Vec<&String> = ordered.keys().collect();
        assert_eq!(keys, vec!["name", "version", "zeta"]);
    }

    #[test]
    fn remaining_keys_sorted_alphabetically() {
        let mut table = Table::new();
        table.insert("zeta".to_owned(), Value::Integer(1));
        table.insert("alpha".to_owned(), Value::Integer(2));

        let ordered = reorder_table(table, PROJECT_KEY_ORDER);
        let keys: Vec<&String> = ordered.keys().collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }
}
