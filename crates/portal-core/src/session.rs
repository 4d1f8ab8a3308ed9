//! Form session
//!
//! Owns everything one user filling in one form needs: the schema, the
//! captured values, the fetched option lists and the submission state.
//!
//! ```text
//! Idle -> Editing -> Validating -> Submitting -> Success
//!            ^            |             |
//!            +------------+             +------> SubmitFailed
//!            ^                                        |
//!            +----------------------------------------+
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;

use futures_util::future::join_all;
use serde_json::Value;

use crate::error::{FormError, Result};
use crate::graph::DependencyGraph;
use crate::interpreter::{self, Rule, Violation};
use crate::options::{ApplyOutcome, DynamicOptionsCache, OptionGroups, OptionsRequest, OptionsResolver};
use crate::schema::{FieldNode, FormSchema};
use crate::service::{FormService, SubmitReceipt};
use crate::values::{FieldValueState, Payload};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Editing,
    Validating,
    Submitting,
    Success,
    SubmitFailed,
}

/// Violations of one field
#[derive(Clone, Debug, PartialEq)]
pub struct FieldReport {
    pub field_id: String,
    pub label: String,
    pub violations: Vec<Violation>,
}

impl fmt::Display for FieldReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        write!(f, "{} {}", self.label, reasons.join("; "))
    }
}

/// Per-field outcome of a rejected validation, in document order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    fields: Vec<FieldReport>,
}

impl ValidationReport {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldReport> {
        self.fields.iter().find(|r| r.field_id == field_id)
    }

    pub fn field_ids(&self) -> Vec<&str> {
        self.fields.iter().map(|r| r.field_id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldReport> {
        self.fields.iter()
    }
}

pub struct FormSession {
    schema: FormSchema,
    graph: DependencyGraph,
    rules: HashMap<String, Vec<Rule>>,
    /// Own visibility rule result per node; ancestors are applied on walk
    own_visibility: HashMap<String, bool>,
    values: FieldValueState,
    resolver: OptionsResolver,
    state: SessionState,
}

impl FormSession {
    pub fn new(schema: FormSchema) -> Self {
        for issue in schema.lint() {
            tracing::warn!(form = %schema.form_id, %issue, "schema issue");
        }
        let graph = DependencyGraph::build(&schema);
        let rules = schema
            .leaves()
            .into_iter()
            .map(|leaf| (leaf.id.clone(), interpreter::rules_for(leaf)))
            .collect();

        let mut session = Self {
            schema,
            graph,
            rules,
            own_visibility: HashMap::new(),
            values: FieldValueState::new(),
            resolver: OptionsResolver::new(),
            state: SessionState::Idle,
        };
        session.refresh_all_visibility();
        session
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn values(&self) -> &FieldValueState {
        &self.values
    }

    pub fn options_cache(&self) -> &DynamicOptionsCache {
        self.resolver.cache()
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Capture a value for a leaf field.
    ///
    /// Re-evaluates the fields that depend on `field_id` and returns the
    /// option fetches the change calls for. The caller issues them and
    /// hands each result to [`FormSession::apply_options`].
    pub fn set_value(&mut self, field_id: &str, value: Value) -> Result<Vec<OptionsRequest>> {
        match self.schema.find(field_id) {
            Some(node) if !node.is_group() => {}
            _ => return Err(FormError::UnknownField(field_id.to_string())),
        }
        match self.state {
            SessionState::Idle | SessionState::SubmitFailed => self.transition(SessionState::Editing),
            SessionState::Editing => {}
            state => return Err(FormError::InvalidState { state, action: "edit" }),
        }

        if self.values.get(field_id) == Some(&value) {
            return Ok(Vec::new());
        }
        self.values.set_value(field_id, value);

        let mut requests = Vec::new();
        let mut visited = HashSet::from([field_id.to_string()]);
        self.propagate(field_id, &mut visited, &mut requests);
        Ok(requests)
    }

    /// Re-evaluate the subscribers of `field_id` after its value changed.
    ///
    /// Fields whose options follow `field_id` lose their selection, which
    /// belonged to the previous option list; that change cascades.
    fn propagate(&mut self, field_id: &str, visited: &mut HashSet<String>, requests: &mut Vec<OptionsRequest>) {
        for subscriber in self.graph.visibility_subscribers(field_id).to_vec() {
            self.refresh_visibility(&subscriber);
        }

        let value = self.values.get(field_id).cloned().unwrap_or(Value::Null);
        requests.extend(self.resolver.on_change(&self.graph, field_id, &value));

        let dependents: Vec<String> = self
            .graph
            .options_subscribers(field_id)
            .iter()
            .map(|b| b.field_id.clone())
            .collect();
        for dependent in dependents {
            if !visited.insert(dependent.clone()) {
                continue;
            }
            if self.values.clear(&dependent).is_some() {
                tracing::debug!(field = %dependent, dependency = field_id, "reset dependent field");
                self.propagate(&dependent, visited, requests);
            }
        }
    }

    /// Store the result of an options fetch issued for this session
    pub fn apply_options(&mut self, request: &OptionsRequest, result: Result<OptionGroups>) -> ApplyOutcome {
        self.resolver.apply(request, result, &self.values)
    }

    /// Set a value and run the option fetches it triggers.
    ///
    /// Fetch failures are soft: they come back as [`ApplyOutcome::Failed`]
    /// and leave the previous options in place.
    pub async fn change<S>(&mut self, service: &S, field_id: &str, value: Value) -> Result<Vec<ApplyOutcome>>
    where
        S: FormService + ?Sized,
    {
        let requests = self.set_value(field_id, value)?;
        let fetches = requests.into_iter().map(|request| async move {
            let result = match request.ensure_supported() {
                Ok(()) => service.fetch_options(&request).await.map_err(FormError::from),
                Err(e) => Err(e),
            };
            (request, result)
        });
        let results = join_all(fetches).await;
        Ok(results
            .into_iter()
            .map(|(request, result)| self.apply_options(&request, result))
            .collect())
    }

    /// Options the field offers right now
    pub fn options_for(&self, field_id: &str) -> Vec<String> {
        match self.schema.find(field_id) {
            Some(node) => {
                interpreter::effective_options(node, self.resolver.cache(), self.graph.options_watch(node, &self.values))
            }
            None => Vec::new(),
        }
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    fn refresh_visibility(&mut self, field_id: &str) {
        if let Some(node) = self.schema.find(field_id) {
            let visible = interpreter::is_visible(node, self.graph.visibility_watch(node, &self.values));
            self.own_visibility.insert(field_id.to_string(), visible);
        }
    }

    fn refresh_all_visibility(&mut self) {
        let ids: Vec<String> = self
            .schema
            .nodes()
            .into_iter()
            .filter(|n| n.visibility.is_some())
            .map(|n| n.id.clone())
            .collect();
        for id in ids {
            self.refresh_visibility(&id);
        }
    }

    pub(crate) fn own_visible(&self, node: &FieldNode) -> bool {
        self.own_visibility.get(&node.id).copied().unwrap_or(true)
    }

    /// Leaves currently rendered: own rule passes and no ancestor is hidden
    pub fn visible_leaves(&self) -> Vec<&FieldNode> {
        fn walk<'a>(session: &FormSession, nodes: &'a [FieldNode], out: &mut Vec<&'a FieldNode>) {
            for node in nodes.iter().filter(|n| session.own_visible(n)) {
                if node.is_group() {
                    walk(session, node.children(), out);
                } else {
                    out.push(node);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &self.schema.fields, &mut out);
        out
    }

    pub fn is_shown(&self, field_id: &str) -> bool {
        self.visible_leaves().iter().any(|n| n.id == field_id)
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Every visible leaf with a captured value, groups flattened away.
    /// Hidden fields keep their values but are left out.
    pub fn payload(&self) -> Payload {
        self.visible_leaves()
            .into_iter()
            .filter_map(|leaf| self.values.filled(&leaf.id).map(|v| (leaf.id.clone(), v.clone())))
            .collect()
    }

    /// Check every visible leaf and return the payload if all pass
    pub fn validate(&self) -> std::result::Result<Payload, ValidationReport> {
        let mut report = ValidationReport::default();
        for leaf in self.visible_leaves() {
            let rules = self.rules.get(&leaf.id).map(Vec::as_slice).unwrap_or_default();
            let violations = interpreter::check(rules, self.values.get(&leaf.id));
            if !violations.is_empty() {
                report.fields.push(FieldReport {
                    field_id: leaf.id.clone(),
                    label: leaf.label.clone(),
                    violations,
                });
            }
        }
        if report.is_empty() {
            Ok(self.payload())
        } else {
            Err(report)
        }
    }

    /// Validate locally and submit through `service`.
    ///
    /// A local rejection makes no network call. Values are kept whatever
    /// the outcome; call [`FormSession::reset`] to start over.
    pub async fn submit<S>(&mut self, service: &S) -> Result<SubmitReceipt>
    where
        S: FormService + ?Sized,
    {
        match self.state {
            SessionState::Editing => {}
            SessionState::Idle | SessionState::SubmitFailed => self.transition(SessionState::Editing),
            state => return Err(FormError::InvalidState { state, action: "submit" }),
        }

        self.transition(SessionState::Validating);
        let payload = match self.validate() {
            Ok(payload) => payload,
            Err(report) => {
                self.transition(SessionState::Editing);
                return Err(FormError::Validation(report));
            }
        };

        self.transition(SessionState::Submitting);
        match service.submit(&payload).await {
            Ok(receipt) => {
                self.transition(SessionState::Success);
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!(form = %self.schema.form_id, error = %e, "submission failed");
                self.transition(SessionState::SubmitFailed);
                Err(FormError::Submit(e))
            }
        }
    }

    /// Drop values and fetched options and return to `Idle`
    pub fn reset(&mut self) {
        self.values.clear_all();
        self.resolver.clear();
        self.own_visibility.clear();
        self.refresh_all_visibility();
        self.transition(SessionState::Idle);
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            tracing::debug!(form = %self.schema.form_id, from = ?self.state, to = ?to, "session transition");
            self.state = to;
        }
    }
}
