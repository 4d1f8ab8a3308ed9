//! Field values captured during a form session

use std::collections::{BTreeMap, HashMap};

use serde_json::{Number, Value};

use crate::error::{FormError, Result};
use crate::schema::{FieldKind, FieldNode};

/// Flattened field id → value mapping sent on submission
pub type Payload = BTreeMap<String, Value>;

/// Current input value per field id, owned by one session
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldValueState {
    values: HashMap<String, Value>,
}

impl FieldValueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, field_id: impl Into<String>, value: Value) {
        self.values.insert(field_id.into(), value);
    }

    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.values.get(field_id)
    }

    /// Current value if it is not empty
    pub fn filled(&self, field_id: &str) -> Option<&Value> {
        self.get(field_id).filter(|v| !is_empty(v))
    }

    pub fn clear(&mut self, field_id: &str) -> Option<Value> {
        self.values.remove(field_id)
    }

    pub fn clear_all(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `null`, blank strings and empty selections count as no value.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Text form of a value, as used for pattern checks and table cells
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Convert raw text input into the value shape the field kind stores.
///
/// Numbers become JSON numbers (integers stay integral), checkboxes take a
/// comma separated list, everything else is kept as a string.
pub fn parse_input(field: &FieldNode, raw: &str) -> Result<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    match &field.kind {
        FieldKind::Number => parse_number(raw).ok_or_else(|| FormError::InvalidInput {
            field: field.id.clone(),
            reason: format!("{raw:?} is not a number"),
        }),
        FieldKind::Checkbox(_) => Ok(Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        )),
        FieldKind::Group(_) => Err(FormError::UnknownField(field.id.clone())),
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    raw.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(kind: &str) -> FieldNode {
        serde_json::from_value(json!({ "id": "f", "label": "F", "type": kind, "options": ["A", "B"] })).unwrap()
    }

    #[test]
    fn test_emptiness() {
        assert!(is_empty(&Value::Null));
        assert!(is_empty(&json!("  ")));
        assert!(is_empty(&json!([])));
        assert!(!is_empty(&json!(0)));
        assert!(!is_empty(&json!(false)));
        assert!(!is_empty(&json!(["A"])));
    }

    #[test]
    fn test_parse_number_keeps_integers() {
        assert_eq!(parse_input(&field("number"), "25").unwrap(), json!(25));
        assert_eq!(parse_input(&field("number"), "2.5").unwrap(), json!(2.5));
        assert!(matches!(
            parse_input(&field("number"), "twenty"),
            Err(FormError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_parse_checkbox_list() {
        assert_eq!(parse_input(&field("checkbox"), "A, B,").unwrap(), json!(["A", "B"]));
    }

    #[test]
    fn test_parse_blank_is_null() {
        assert_eq!(parse_input(&field("text"), "   ").unwrap(), Value::Null);
    }

    #[test]
    fn test_state_filled() {
        let mut state = FieldValueState::new();
        state.set_value("a", json!(""));
        state.set_value("b", json!("x"));
        assert!(state.filled("a").is_none());
        assert_eq!(state.filled("b"), Some(&json!("x")));
        assert_eq!(state.clear("b"), Some(json!("x")));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(display(&json!(["A", "B"])), "A, B");
        assert_eq!(display(&json!(25)), "25");
        assert_eq!(display(&Value::Null), "");
    }
}
