//! Field interpreter
//!
//! Pure decisions about a single schema node given the current values:
//! whether it is shown, which constraints it enforces and which options it
//! offers. Nothing here performs I/O or mutates session state.

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::options::DynamicOptionsCache;
use crate::schema::{Condition, FieldNode};
use crate::values::{self, FieldValueState};

// =============================================================================
// Visibility
// =============================================================================

/// Visibility of `field` given the value of the field it watches.
///
/// `watched` is `None` when the watched field has no value or the
/// reference cannot be resolved. Conditions other than `equals` are
/// permissive.
pub fn is_visible(field: &FieldNode, watched: Option<&Value>) -> bool {
    match &field.visibility {
        None => true,
        Some(rule) => match rule.condition {
            Condition::Equals => watched.map_or(false, |w| matches_value(w, &rule.value)),
            Condition::Other(_) => true,
        },
    }
}

/// Schemas declare the expected value as text, so a typed scalar matches
/// its text form and a checkbox selection matches if any item does.
fn matches_value(watched: &Value, expected: &Value) -> bool {
    if watched == expected {
        return true;
    }
    match (watched, expected) {
        (Value::Array(items), _) => items.iter().any(|item| matches_value(item, expected)),
        (Value::Number(_) | Value::Bool(_), Value::String(text)) => values::display(watched) == text.trim(),
        _ => false,
    }
}

/// [`is_visible`] reading the watched value straight from `values`
pub fn is_visible_in(field: &FieldNode, values: &FieldValueState) -> bool {
    let watched = field.visibility.as_ref().and_then(|v| values.get(&v.depends_on));
    is_visible(field, watched)
}

// =============================================================================
// Validation
// =============================================================================

#[derive(Clone, Debug)]
pub enum Rule {
    Required,
    Min(f64),
    Max(f64),
    Pattern(Regex),
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Violation {
    #[error("is required")]
    Required,

    #[error("must be at least {min} (got {actual})")]
    BelowMin { min: f64, actual: f64 },

    #[error("must be at most {max} (got {actual})")]
    AboveMax { max: f64, actual: f64 },

    #[error("must be a number")]
    NotANumber,

    #[error("does not match pattern {pattern}")]
    PatternMismatch { pattern: String },
}

/// Active constraints of a leaf. Groups have none.
///
/// A pattern that does not compile is dropped with a warning so one bad
/// rule does not make the whole form unusable.
pub fn rules_for(field: &FieldNode) -> Vec<Rule> {
    if field.is_group() {
        return Vec::new();
    }
    let mut rules = Vec::new();
    if field.required {
        rules.push(Rule::Required);
    }
    if let Some(validation) = &field.validation {
        if let Some(min) = validation.min {
            rules.push(Rule::Min(min));
        }
        if let Some(max) = validation.max {
            rules.push(Rule::Max(max));
        }
        if let Some(pattern) = &validation.pattern {
            match Regex::new(pattern) {
                Ok(re) => rules.push(Rule::Pattern(re)),
                Err(e) => tracing::warn!(field = %field.id, error = %e, "ignoring invalid validation pattern"),
            }
        }
    }
    rules
}

/// Evaluate `rules` against a value. Only `Required` looks at empty values.
pub fn check(rules: &[Rule], value: Option<&Value>) -> Vec<Violation> {
    let value = match value {
        Some(v) if !values::is_empty(v) => v,
        _ => {
            return if rules.iter().any(|r| matches!(r, Rule::Required)) {
                vec![Violation::Required]
            } else {
                Vec::new()
            };
        }
    };

    let mut violations = Vec::new();
    let number = numeric(value);
    for rule in rules {
        let violation = match (rule, number) {
            (Rule::Min(_) | Rule::Max(_), None) => Some(Violation::NotANumber),
            (Rule::Min(min), Some(actual)) if actual < *min => Some(Violation::BelowMin { min: *min, actual }),
            (Rule::Max(max), Some(actual)) if actual > *max => Some(Violation::AboveMax { max: *max, actual }),
            (Rule::Pattern(re), _) if !re.is_match(&values::display(value)) => {
                Some(Violation::PatternMismatch { pattern: re.as_str().to_string() })
            }
            _ => None,
        };
        if let Some(violation) = violation {
            if !violations.contains(&violation) {
                violations.push(violation);
            }
        }
    }
    violations
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Options
// =============================================================================

/// Options a choice field offers right now.
///
/// A fetched list is used only when it was fetched for the dependency value
/// currently held; otherwise the static list, otherwise nothing.
pub fn effective_options(field: &FieldNode, cache: &DynamicOptionsCache, watched: Option<&Value>) -> Vec<String> {
    let Some(choices) = field.choices() else {
        return Vec::new();
    };
    if choices.dynamic.is_some() {
        if let (Some(cached), Some(current)) = (cache.get(&field.id), watched) {
            if &cached.dependency_value == current {
                return cached.options.clone();
            }
        }
    }
    choices.options.clone()
}
