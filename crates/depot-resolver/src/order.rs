//! DFS-based build-order linearization, tolerant of cycles (spec.md §9
//! "Cyclic dep graphs" design note — warn, don't error, on back-edges).

use std::collections::BTreeMap;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A leaves-first linearization of `deps` (uuid → its direct dep uuids),
/// plus one warning string per back-edge encountered.
///
/// Unlike the strict cycle-rejecting DFS a single-project build graph
/// would use, this tolerates cycles: a back-edge is recorded as a
/// warning and the traversal continues without revisiting the node.
/// The returned order is deterministic — child edges are always walked
/// in `(name, uuid)` order — and is the finish order of the DFS, so
/// every node appears after all of its non-cyclic dependencies.
#[must_use]
pub fn linearize(
    deps: &BTreeMap<Uuid, Vec<Uuid>>,
    names: &BTreeMap<Uuid, String>,
    roots: &[Uuid],
) -> (Vec<Uuid>, Vec<String>) {
    let mut color: BTreeMap<Uuid, Color> = BTreeMap::new();
    let mut order = Vec::new();
    let mut warnings = Vec::new();
    let mut stack_path: Vec<Uuid> = Vec::new();

    fn name_of(names: &BTreeMap<Uuid, String>, uuid: Uuid) -> String {
        names.get(&uuid).cloned().unwrap_or_else(|| uuid.to_string())
    }

    fn visit(
        uuid: Uuid,
        deps: &BTreeMap<Uuid, Vec<Uuid>>,
        names: &BTreeMap<Uuid, String>,
        color: &mut BTreeMap<Uuid, Color>,
        order: &mut Vec<Uuid>,
        warnings: &mut Vec<String>,
        stack_path: &mut Vec<Uuid>,
    ) {
        match color.get(&uuid) {
            Some(Color::Black) => return,
            Some(Color::Gray) => {
                let cycle_start = stack_path.iter().position(|u| *u == uuid).unwrap_or(0);
                let cycle: Vec<String> = stack_path[cycle_start..]
                    .iter()
                    .map(|u| name_of(names, *u))
                    .collect();
                warnings.push(format!(
                    "dependency cycle: {} -> {}",
                    cycle.join(" -> "),
                    name_of(names, uuid)
                ));
                return;
            }
            _ => {}
        }

        color.insert(uuid, Color::Gray);
        stack_path.push(uuid);

        let mut children = deps.get(&uuid).cloned().unwrap_or_default();
        children.sort_by(|a, b| name_of(names, *a).cmp(&name_of(names, *b)).then(a.cmp(b)));
        for child in children {
            visit(child, deps, names, color, order, warnings, stack_path);
        }

        stack_path.pop();
        color.insert(uuid, Color::Black);
        order.push(uuid);
    }

    let mut sorted_roots = roots.to_vec();
    sorted_roots.sort_by(|a, b| name_of(names, *a).cmp(&name_of(names, *b)).then(a.cmp(b)));
    for root in sorted_roots {
        visit(
            root,
            deps,
            names,
            &mut color,
            &mut order,
            &mut warnings,
            &mut stack_path,
        );
    }

    (order, warnings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn uuid_n(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn leaves_come_before_dependents() {
        let a = uuid_n(1);
        let b = uuid_n(2);
        let mut deps = BTreeMap::new();
        deps.insert(a, vec![b]);
        deps.insert(b, vec![]);
        let mut names = BTreeMap::new();
        names.insert(a, "A".to_owned());
        names.insert(b, "B".to_owned());

        let (order, warnings) = linearize(&deps, &names, &[a]);
        assert!(warnings.is_empty());
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn cycle_produces_warning_not_panic() {
        let a = uuid_n(1);
        let b = uuid_n(2);
        let mut deps = BTreeMap::new();
        deps.insert(a, vec![b]);
        deps.insert(b, vec![a]);
        let mut names = BTreeMap::new();
        names.insert(a, "A".to_owned());
        names.insert(b, "B".to_owned());

        let (order, warnings) = linearize(&deps, &names, &[a]);
        assert_eq!(order.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("cycle"));
    }
}
