//! Form schema model
//!
//! Wire format is the form service's camelCase JSON, where every node
//! carries a `type` discriminator and a flat bag of optional properties.
//! Internally a node is a [`FieldNode`] whose [`FieldKind`] holds only
//! the properties that make sense for that kind.

use std::collections::{HashMap, HashSet};
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Core Types
// =============================================================================

/// Root of a form definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub form_id: String,
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FieldNode>,
}

/// One entry of the schema tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFieldNode", into = "RawFieldNode")]
pub struct FieldNode {
    pub id: String,
    pub label: String,
    pub required: bool,
    pub validation: Option<Validation>,
    pub visibility: Option<Visibility>,
    pub kind: FieldKind,
}

/// Field kinds. `Group` is the only recursive variant.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Select(Choices),
    Radio(Choices),
    Checkbox(Choices),
    Group(Vec<FieldNode>),
}

/// Option sources of a choice field
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Choices {
    pub options: Vec<String>,
    pub dynamic: Option<DynamicOptions>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Single-predicate visibility gate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    pub depends_on: String,
    pub condition: Condition,
    pub value: Value,
}

/// Visibility predicate. Unrecognised conditions are kept verbatim and
/// evaluate as always visible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    Equals,
    Other(String),
}

impl From<String> for Condition {
    fn from(s: String) -> Self {
        match s.as_str() {
            "equals" => Condition::Equals,
            _ => Condition::Other(s),
        }
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        match c {
            Condition::Equals => "equals".into(),
            Condition::Other(s) => s,
        }
    }
}

/// Remote option list bound to another field's value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicOptions {
    pub depends_on: String,
    pub endpoint: String,
    pub method: HttpMethod,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Wire Representation
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawKind {
    Text,
    Number,
    Date,
    Select,
    Radio,
    Checkbox,
    Group,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldNode {
    id: String,
    #[serde(default)]
    label: String,
    #[serde(rename = "type")]
    kind: RawKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dynamic_options: Option<DynamicOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validation: Option<Validation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visibility: Option<Visibility>,
}

impl From<RawFieldNode> for FieldNode {
    fn from(raw: RawFieldNode) -> Self {
        let choices = || Choices {
            options: raw.options.clone().unwrap_or_default(),
            dynamic: raw.dynamic_options.clone(),
        };
        let kind = match raw.kind {
            RawKind::Text => FieldKind::Text,
            RawKind::Number => FieldKind::Number,
            RawKind::Date => FieldKind::Date,
            RawKind::Select => FieldKind::Select(choices()),
            RawKind::Radio => FieldKind::Radio(choices()),
            RawKind::Checkbox => FieldKind::Checkbox(choices()),
            RawKind::Group => FieldKind::Group(raw.fields.clone().unwrap_or_default()),
        };
        Self {
            id: raw.id,
            label: raw.label,
            required: raw.required,
            validation: raw.validation,
            visibility: raw.visibility,
            kind,
        }
    }
}

impl From<FieldNode> for RawFieldNode {
    fn from(node: FieldNode) -> Self {
        let kind = node.kind_name();
        let (options, dynamic_options, fields) = match node.kind {
            FieldKind::Select(c) | FieldKind::Radio(c) | FieldKind::Checkbox(c) => {
                (Some(c.options), c.dynamic, None)
            }
            FieldKind::Group(children) => (None, None, Some(children)),
            _ => (None, None, None),
        };
        Self {
            id: node.id,
            label: node.label,
            kind,
            required: node.required,
            options,
            fields,
            dynamic_options,
            validation: node.validation,
            visibility: node.visibility,
        }
    }
}

// =============================================================================
// Accessors
// =============================================================================

impl FieldNode {
    fn kind_name(&self) -> RawKind {
        match self.kind {
            FieldKind::Text => RawKind::Text,
            FieldKind::Number => RawKind::Number,
            FieldKind::Date => RawKind::Date,
            FieldKind::Select(_) => RawKind::Select,
            FieldKind::Radio(_) => RawKind::Radio,
            FieldKind::Checkbox(_) => RawKind::Checkbox,
            FieldKind::Group(_) => RawKind::Group,
        }
    }

    /// Wire name of the kind (`"text"`, `"group"`, ...)
    pub fn kind_str(&self) -> &'static str {
        match self.kind_name() {
            RawKind::Text => "text",
            RawKind::Number => "number",
            RawKind::Date => "date",
            RawKind::Select => "select",
            RawKind::Radio => "radio",
            RawKind::Checkbox => "checkbox",
            RawKind::Group => "group",
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, FieldKind::Group(_))
    }

    pub fn children(&self) -> &[FieldNode] {
        match &self.kind {
            FieldKind::Group(children) => children,
            _ => &[],
        }
    }

    pub fn choices(&self) -> Option<&Choices> {
        match &self.kind {
            FieldKind::Select(c) | FieldKind::Radio(c) | FieldKind::Checkbox(c) => Some(c),
            _ => None,
        }
    }

    pub fn dynamic_options(&self) -> Option<&DynamicOptions> {
        self.choices().and_then(|c| c.dynamic.as_ref())
    }

    /// Ids of this node and every node beneath it
    pub fn subtree_ids(&self) -> HashSet<&str> {
        let mut ids = HashSet::new();
        collect_ids(self, &mut ids);
        ids
    }
}

fn collect_ids<'a>(node: &'a FieldNode, out: &mut HashSet<&'a str>) {
    out.insert(node.id.as_str());
    for child in node.children() {
        collect_ids(child, out);
    }
}

impl FormSchema {
    /// Every node in depth-first, document order
    pub fn nodes(&self) -> Vec<&FieldNode> {
        fn walk<'a>(nodes: &'a [FieldNode], out: &mut Vec<&'a FieldNode>) {
            for node in nodes {
                out.push(node);
                walk(node.children(), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.fields, &mut out);
        out
    }

    /// Leaf nodes only, in document order
    pub fn leaves(&self) -> Vec<&FieldNode> {
        self.nodes().into_iter().filter(|n| !n.is_group()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&FieldNode> {
        self.nodes().into_iter().find(|n| n.id == id)
    }

    /// Report schema problems the wire format cannot rule out.
    ///
    /// None of these stop a session from running: duplicated ids share a
    /// value slot, bad references read as an absent value and bad patterns
    /// are skipped.
    pub fn lint(&self) -> Vec<SchemaIssue> {
        let nodes = self.nodes();
        let mut issues = Vec::new();

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for node in &nodes {
            *seen.entry(node.id.as_str()).or_default() += 1;
        }
        let mut duplicates: Vec<_> = seen.iter().filter(|(_, n)| **n > 1).map(|(id, _)| *id).collect();
        duplicates.sort_unstable();
        issues.extend(duplicates.into_iter().map(|id| SchemaIssue::DuplicateId(id.to_string())));

        let groups: HashSet<&str> = nodes.iter().filter(|n| n.is_group()).map(|n| n.id.as_str()).collect();
        for node in &nodes {
            let targets = node
                .visibility
                .as_ref()
                .map(|v| v.depends_on.as_str())
                .into_iter()
                .chain(node.dynamic_options().map(|d| d.depends_on.as_str()));
            for target in targets {
                if let Some(issue) = self.reference_issue(node, target, &seen, &groups) {
                    issues.push(issue);
                }
            }
            if let Some(pattern) = node.validation.as_ref().and_then(|v| v.pattern.as_deref()) {
                if let Err(e) = Regex::new(pattern) {
                    issues.push(SchemaIssue::InvalidPattern {
                        field: node.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        issues
    }

    fn reference_issue(
        &self,
        node: &FieldNode,
        target: &str,
        seen: &HashMap<&str, usize>,
        groups: &HashSet<&str>,
    ) -> Option<SchemaIssue> {
        let field = node.id.clone();
        let target_owned = target.to_string();
        if target == node.id {
            Some(SchemaIssue::SelfReference { field })
        } else if node.subtree_ids().contains(target) {
            Some(SchemaIssue::SubtreeReference { field, target: target_owned })
        } else if !seen.contains_key(target) {
            Some(SchemaIssue::DanglingReference { field, target: target_owned })
        } else if groups.contains(target) {
            Some(SchemaIssue::GroupReference { field, target: target_owned })
        } else {
            None
        }
    }
}

/// Problem found by [`FormSchema::lint`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaIssue {
    DuplicateId(String),
    SelfReference { field: String },
    SubtreeReference { field: String, target: String },
    DanglingReference { field: String, target: String },
    GroupReference { field: String, target: String },
    InvalidPattern { field: String, reason: String },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::DuplicateId(id) => write!(f, "id {id} is used more than once"),
            SchemaIssue::SelfReference { field } => write!(f, "{field} depends on itself"),
            SchemaIssue::SubtreeReference { field, target } => {
                write!(f, "{field} depends on {target} inside its own subtree")
            }
            SchemaIssue::DanglingReference { field, target } => {
                write!(f, "{field} depends on unknown field {target}")
            }
            SchemaIssue::GroupReference { field, target } => {
                write!(f, "{field} depends on group {target}, which has no value")
            }
            SchemaIssue::InvalidPattern { field, reason } => {
                write!(f, "{field} has an invalid pattern: {reason}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> FormSchema {
        serde_json::from_value(json!({
            "formId": "home_insurance_application",
            "title": "Home Insurance Application",
            "fields": [
                {
                    "id": "home_details",
                    "label": "Home Details",
                    "type": "group",
                    "fields": [
                        { "id": "home_type", "label": "Home Type", "type": "select", "options": ["House", "Apartment"], "required": true },
                        { "id": "has_security", "label": "Security System?", "type": "radio", "options": ["Yes", "No"] },
                        {
                            "id": "security_type",
                            "label": "Security Type",
                            "type": "select",
                            "visibility": { "dependsOn": "has_security", "condition": "equals", "value": "Yes" },
                            "dynamicOptions": { "dependsOn": "home_type", "endpoint": "api/getSecurity", "method": "GET" }
                        },
                        { "id": "year_built", "label": "Year Built", "type": "number", "validation": { "min": 1800, "max": 2025 } }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_kinds() {
        let schema = sample();
        assert_eq!(schema.form_id, "home_insurance_application");
        let group = &schema.fields[0];
        assert!(group.is_group());
        assert_eq!(group.children().len(), 4);

        let security = schema.find("security_type").unwrap();
        let dynamic = security.dynamic_options().unwrap();
        assert_eq!(dynamic.depends_on, "home_type");
        assert_eq!(dynamic.method, HttpMethod::Get);
        assert_eq!(security.visibility.as_ref().unwrap().condition, Condition::Equals);

        let year = schema.find("year_built").unwrap();
        assert_eq!(year.kind, FieldKind::Number);
        assert_eq!(year.validation.as_ref().unwrap().min, Some(1800.0));
        assert!(!year.required);
    }

    #[test]
    fn test_unknown_condition_kept() {
        let node: FieldNode = serde_json::from_value(json!({
            "id": "x", "label": "X", "type": "text",
            "visibility": { "dependsOn": "y", "condition": "contains", "value": "a" }
        }))
        .unwrap();
        assert_eq!(node.visibility.unwrap().condition, Condition::Other("contains".into()));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<FieldNode, _> = serde_json::from_value(json!({ "id": "x", "label": "X", "type": "slider" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_reencode_uses_wire_names() {
        let schema = sample();
        let encoded = serde_json::to_value(&schema).unwrap();
        let node = &encoded["fields"][0]["fields"][2];
        assert_eq!(node["type"], "select");
        assert_eq!(node["dynamicOptions"]["method"], "GET");
        assert!(encoded["fields"][0].get("options").is_none());
    }

    #[test]
    fn test_leaves_skip_groups() {
        let schema = sample();
        let ids: Vec<_> = schema.leaves().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["home_type", "has_security", "security_type", "year_built"]);
    }

    #[test]
    fn test_lint_clean_schema() {
        assert!(sample().lint().is_empty());
    }

    #[test]
    fn test_lint_reports_bad_references() {
        let schema: FormSchema = serde_json::from_value(json!({
            "formId": "f", "title": "F",
            "fields": [
                {
                    "id": "g", "label": "G", "type": "group",
                    "visibility": { "dependsOn": "inner", "condition": "equals", "value": "1" },
                    "fields": [ { "id": "inner", "label": "Inner", "type": "text" } ]
                },
                { "id": "a", "label": "A", "type": "text",
                  "visibility": { "dependsOn": "a", "condition": "equals", "value": "1" } },
                { "id": "b", "label": "B", "type": "select",
                  "dynamicOptions": { "dependsOn": "missing", "endpoint": "e", "method": "GET" } },
                { "id": "c", "label": "C", "type": "text",
                  "visibility": { "dependsOn": "g", "condition": "equals", "value": "1" } },
                { "id": "a", "label": "A again", "type": "text", "validation": { "pattern": "(" } }
            ]
        }))
        .unwrap();

        let issues = schema.lint();
        assert!(issues.contains(&SchemaIssue::DuplicateId("a".into())));
        assert!(issues.contains(&SchemaIssue::SubtreeReference { field: "g".into(), target: "inner".into() }));
        assert!(issues.contains(&SchemaIssue::SelfReference { field: "a".into() }));
        assert!(issues.contains(&SchemaIssue::DanglingReference { field: "b".into(), target: "missing".into() }));
        assert!(issues.contains(&SchemaIssue::GroupReference { field: "c".into(), target: "g".into() }));
        assert!(issues.iter().any(|i| matches!(i, SchemaIssue::InvalidPattern { field, .. } if field == "a")));
    }
}
