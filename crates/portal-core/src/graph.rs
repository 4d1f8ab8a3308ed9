//! Dependency graph between fields
//!
//! Maps a dependency field id to the fields that must be re-evaluated when
//! its value changes, split by what they depend on it for. References that
//! cannot be honoured (self, own subtree, unknown id, group id) are left
//! out of the graph and read as an absent value.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::schema::{FieldNode, FormSchema, HttpMethod};
use crate::values::FieldValueState;

/// A field whose option list follows a dependency
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionsBinding {
    pub field_id: String,
    pub endpoint: String,
    pub method: HttpMethod,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Edge {
    Visibility,
    Options,
}

#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    visibility: HashMap<String, Vec<String>>,
    options: HashMap<String, Vec<OptionsBinding>>,
    unresolved: HashSet<(String, Edge)>,
}

impl DependencyGraph {
    pub fn build(schema: &FormSchema) -> Self {
        let nodes = schema.nodes();
        let leaves: HashSet<&str> = nodes.iter().filter(|n| !n.is_group()).map(|n| n.id.as_str()).collect();
        let mut graph = Self::default();

        for node in nodes {
            if let Some(rule) = &node.visibility {
                if resolvable(node, &rule.depends_on, &leaves) {
                    graph
                        .visibility
                        .entry(rule.depends_on.clone())
                        .or_default()
                        .push(node.id.clone());
                } else {
                    graph.unresolved.insert((node.id.clone(), Edge::Visibility));
                }
            }
            if let Some(dynamic) = node.dynamic_options() {
                if resolvable(node, &dynamic.depends_on, &leaves) {
                    graph.options.entry(dynamic.depends_on.clone()).or_default().push(OptionsBinding {
                        field_id: node.id.clone(),
                        endpoint: dynamic.endpoint.clone(),
                        method: dynamic.method,
                    });
                } else {
                    graph.unresolved.insert((node.id.clone(), Edge::Options));
                }
            }
        }
        graph
    }

    /// Fields whose visibility reads `dependency`
    pub fn visibility_subscribers(&self, dependency: &str) -> &[String] {
        self.visibility.get(dependency).map(Vec::as_slice).unwrap_or_default()
    }

    /// Fields whose options are fetched from `dependency`'s value
    pub fn options_subscribers(&self, dependency: &str) -> &[OptionsBinding] {
        self.options.get(dependency).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_dependency(&self, field_id: &str) -> bool {
        self.visibility.contains_key(field_id) || self.options.contains_key(field_id)
    }

    /// Value the visibility rule of `field` watches
    pub fn visibility_watch<'v>(&self, field: &FieldNode, values: &'v FieldValueState) -> Option<&'v Value> {
        let rule = field.visibility.as_ref()?;
        if self.unresolved.contains(&(field.id.clone(), Edge::Visibility)) {
            return None;
        }
        values.get(&rule.depends_on)
    }

    /// Value the dynamic options of `field` are keyed on
    pub fn options_watch<'v>(&self, field: &FieldNode, values: &'v FieldValueState) -> Option<&'v Value> {
        let dynamic = field.dynamic_options()?;
        if self.unresolved.contains(&(field.id.clone(), Edge::Options)) {
            return None;
        }
        values.get(&dynamic.depends_on)
    }
}

fn resolvable(node: &FieldNode, target: &str, leaves: &HashSet<&str>) -> bool {
    target != node.id && leaves.contains(target) && !node.subtree_ids().contains(target)
}
