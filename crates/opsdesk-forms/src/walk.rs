//! Depth-first traversal of a form tree.
//!
//! Visits are produced in pre-order: a group's contents directly follow the
//! group itself. Each visit carries the enclosing group path, so the binding
//! of a field is `group_path.key` (or just `key` at the top level).

use opsdesk_core::enums::ComponentType;
use tracing::debug;

use crate::state::join_path;
use crate::types::FormComponent;

/// What a visited node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitKind<'a> {
    /// Any known non-group component.
    Field,
    /// A group; its children follow as separate visits.
    Group,
    /// A node with a type this interpreter does not render.
    Unsupported { type_tag: &'a str },
}

/// One node reached by [`walk`].
#[derive(Debug, Clone)]
pub struct Visit<'a> {
    pub component: &'a FormComponent,
    pub kind: VisitKind<'a>,
    /// Path of the enclosing groups, `""` at the top level.
    pub group_path: String,
    /// Number of enclosing groups.
    pub depth: usize,
}

impl Visit<'_> {
    /// Full state path this node binds, if it binds one.
    pub fn binding_path(&self) -> Option<String> {
        if self.kind == VisitKind::Group {
            return None;
        }
        self.component
            .binding_key()
            .map(|key| resolve_binding(&self.group_path, key))
    }

    pub fn is_field(&self) -> bool {
        self.kind == VisitKind::Field
    }
}

/// The path children of a group see.
pub fn child_path(parent: &str, path: Option<&str>) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(p) => join_path(parent, p),
        None => parent.to_owned(),
    }
}

/// The state path of a binding key inside a group path.
pub fn resolve_binding(group_path: &str, key: &str) -> String {
    join_path(group_path, key)
}

/// Walks the whole tree in pre-order.
pub fn walk(components: &[FormComponent]) -> Vec<Visit<'_>> {
    let mut visits = Vec::new();
    walk_into(components, "", 0, &mut visits);
    visits
}

fn walk_into<'a>(
    components: &'a [FormComponent],
    group_path: &str,
    depth: usize,
    visits: &mut Vec<Visit<'a>>,
) {
    for component in components {
        match &component.component_type {
            ComponentType::Group => {
                visits.push(Visit {
                    component,
                    kind: VisitKind::Group,
                    group_path: group_path.to_owned(),
                    depth,
                });
                let inner = child_path(group_path, component.group_path());
                walk_into(&component.components, &inner, depth + 1, visits);
            }
            ComponentType::Unsupported(tag) => {
                debug!(id = %component.id, tag = %tag, "unsupported component");
                visits.push(Visit {
                    component,
                    kind: VisitKind::Unsupported { type_tag: tag },
                    group_path: group_path.to_owned(),
                    depth,
                });
            }
            _ => visits.push(Visit {
                component,
                kind: VisitKind::Field,
                group_path: group_path.to_owned(),
                depth,
            }),
        }
    }
}

/// Finds the field bound at `path`.
pub fn find_binding<'a>(components: &'a [FormComponent], path: &str) -> Option<Visit<'a>> {
    walk(components)
        .into_iter()
        .find(|v| v.is_field() && v.binding_path().as_deref() == Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_json;
    use pretty_assertions::assert_eq;

    const NESTED: &str = r#"{
        "components": [
            {"id": "a", "type": "textfield", "key": "a"},
            {"id": "g1", "type": "group", "path": "outer", "components": [
                {"id": "b", "type": "textfield", "key": "b"},
                {"id": "g2", "type": "group", "components": [
                    {"id": "c", "type": "number", "key": "c"}
                ]},
                {"id": "g3", "type": "group", "path": "inner", "components": [
                    {"id": "d", "type": "checkbox", "key": "d"}
                ]}
            ]},
            {"id": "e", "type": "textfield", "key": "e"}
        ]
    }"#;

    #[test]
    fn preorder_with_group_contents_adjacent() {
        let def = parse_json(NESTED).unwrap();
        let ids: Vec<&str> = walk(&def.components)
            .iter()
            .map(|v| v.component.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "g1", "b", "g2", "c", "g3", "d", "e"]);
    }

    #[test]
    fn binding_paths_follow_group_paths() {
        let def = parse_json(NESTED).unwrap();
        let paths: Vec<String> = walk(&def.components)
            .iter()
            .filter_map(Visit::binding_path)
            .collect();
        assert_eq!(paths, vec!["a", "outer.b", "outer.c", "outer.inner.d", "e"]);
    }

    #[test]
    fn depth_counts_enclosing_groups() {
        let def = parse_json(NESTED).unwrap();
        let visits = walk(&def.components);
        let d = visits.iter().find(|v| v.component.id == "d").unwrap();
        assert_eq!(d.depth, 2);
        assert_eq!(d.group_path, "outer.inner");
    }

    #[test]
    fn unsupported_node_does_not_stop_walk() {
        let def = parse_json(
            r#"{"components": [
                {"id": "a", "type": "textfield", "key": "a"},
                {"id": "x", "type": "totally-unknown", "key": "x"},
                {"id": "b", "type": "textfield", "key": "b"}
            ]}"#,
        )
        .unwrap();
        let visits = walk(&def.components);
        assert_eq!(visits.len(), 3);
        assert_eq!(visits[1].kind, VisitKind::Unsupported { type_tag: "totally-unknown" });
        assert_eq!(visits[1].binding_path(), Some("x".to_owned()));
        assert!(visits[2].is_field());
    }

    #[test]
    fn child_path_rules() {
        assert_eq!(child_path("", Some("driver")), "driver");
        assert_eq!(child_path("trip", Some("driver")), "trip.driver");
        assert_eq!(child_path("trip", None), "trip");
        assert_eq!(child_path("trip", Some("")), "trip");
    }

    #[test]
    fn find_binding_locates_nested_field() {
        let def = parse_json(NESTED).unwrap();
        let v = find_binding(&def.components, "outer.inner.d").unwrap();
        assert_eq!(v.component.id, "d");
        assert!(find_binding(&def.components, "d").is_none());
    }
}
