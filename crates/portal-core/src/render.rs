//! Render tree of a session
//!
//! The visible part of the schema with current values and effective
//! options attached, ready for a front end to draw.

use serde::Serialize;
use serde_json::Value;

use crate::schema::{FieldKind, FieldNode};
use crate::session::FormSession;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedForm {
    pub form_id: String,
    pub title: String,
    pub nodes: Vec<RenderedNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum RenderedNode {
    Group {
        id: String,
        label: String,
        children: Vec<RenderedNode>,
    },
    Leaf {
        id: String,
        label: String,
        kind: &'static str,
        required: bool,
        value: Option<Value>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        options: Vec<String>,
    },
}

impl RenderedNode {
    pub fn id(&self) -> &str {
        match self {
            RenderedNode::Group { id, .. } | RenderedNode::Leaf { id, .. } => id,
        }
    }
}

impl RenderedForm {
    /// Ids of every rendered node, depth first
    pub fn ids(&self) -> Vec<&str> {
        fn walk<'a>(nodes: &'a [RenderedNode], out: &mut Vec<&'a str>) {
            for node in nodes {
                out.push(node.id());
                if let RenderedNode::Group { children, .. } = node {
                    walk(children, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }
}

impl FormSession {
    /// Walk the schema, dropping hidden nodes together with their subtrees
    pub fn render(&self) -> RenderedForm {
        RenderedForm {
            form_id: self.schema().form_id.clone(),
            title: self.schema().title.clone(),
            nodes: self.render_nodes(&self.schema().fields),
        }
    }

    fn render_nodes(&self, nodes: &[FieldNode]) -> Vec<RenderedNode> {
        nodes
            .iter()
            .filter(|node| self.own_visible(node))
            .map(|node| self.render_node(node))
            .collect()
    }

    fn render_node(&self, node: &FieldNode) -> RenderedNode {
        match &node.kind {
            FieldKind::Group(children) => RenderedNode::Group {
                id: node.id.clone(),
                label: node.label.clone(),
                children: self.render_nodes(children),
            },
            _ => RenderedNode::Leaf {
                id: node.id.clone(),
                label: node.label.clone(),
                kind: node.kind_str(),
                required: node.required,
                value: self.values().get(&node.id).cloned(),
                options: self.options_for(&node.id),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FormSchema;
    use serde_json::json;

    fn schema() -> FormSchema {
        serde_json::from_value(json!({
            "formId": "car", "title": "Car Insurance",
            "fields": [
                { "id": "owner", "label": "Owner", "type": "group", "fields": [
                    { "id": "name", "label": "Name", "type": "text", "required": true },
                    { "id": "has_claims", "label": "Prior claims?", "type": "radio", "options": ["Yes", "No"] }
                ] },
                { "id": "claims", "label": "Claims", "type": "group",
                  "visibility": { "dependsOn": "has_claims", "condition": "equals", "value": "Yes" },
                  "fields": [ { "id": "claim_count", "label": "Claim count", "type": "number" } ] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_hidden_subtree_not_rendered() {
        let mut session = FormSession::new(schema());
        assert_eq!(session.render().ids(), vec!["owner", "name", "has_claims"]);

        session.set_value("has_claims", json!("Yes")).unwrap();
        assert_eq!(
            session.render().ids(),
            vec!["owner", "name", "has_claims", "claims", "claim_count"]
        );
    }

    #[test]
    fn test_leaf_carries_value_and_options() {
        let mut session = FormSession::new(schema());
        session.set_value("has_claims", json!("No")).unwrap();
        let rendered = session.render();
        let RenderedNode::Group { children, .. } = &rendered.nodes[0] else {
            panic!("expected group");
        };
        match &children[1] {
            RenderedNode::Leaf { kind, value, options, .. } => {
                assert_eq!(*kind, "radio");
                assert_eq!(value, &Some(json!("No")));
                assert_eq!(options, &vec!["Yes".to_string(), "No".to_string()]);
            }
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_serializes_with_node_tag() {
        let session = FormSession::new(schema());
        let encoded = serde_json::to_value(session.render()).unwrap();
        assert_eq!(encoded["formId"], "car");
        assert_eq!(encoded["nodes"][0]["node"], "group");
        assert_eq!(encoded["nodes"][0]["children"][0]["node"], "leaf");
    }
}
