//! Dependent-options resolver
//!
//! Keeps the remotely fetched option list of every `dynamicOptions` field
//! in step with the value of the field it depends on. Requests carry the
//! dependency value they were issued for and a response is kept only if
//! that value is still current when it is applied, so a slow answer for an
//! earlier selection can never replace the answer for the latest one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FormError;
use crate::graph::DependencyGraph;
use crate::schema::HttpMethod;
use crate::values::{self, FieldValueState};

/// Options endpoint response, keyed by option-group name
pub type OptionGroups = HashMap<String, Vec<String>>;

#[derive(Clone, Debug, PartialEq)]
pub struct CachedOptions {
    /// Dependency value the list was fetched for
    pub dependency_value: Value,
    pub options: Vec<String>,
}

/// Most recent fetched option list per field id
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DynamicOptionsCache {
    entries: HashMap<String, CachedOptions>,
}

impl DynamicOptionsCache {
    pub fn get(&self, field_id: &str) -> Option<&CachedOptions> {
        self.entries.get(field_id)
    }

    pub fn insert(&mut self, field_id: impl Into<String>, options: CachedOptions) {
        self.entries.insert(field_id.into(), options);
    }

    pub fn remove(&mut self, field_id: &str) -> Option<CachedOptions> {
        self.entries.remove(field_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One options fetch to issue against the form service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsRequest {
    /// Field whose options are being fetched
    pub field_id: String,
    /// Field whose value drives the fetch
    pub depends_on: String,
    /// Dependency value at issue time
    pub value: Value,
    pub endpoint: String,
    pub method: HttpMethod,
}

impl OptionsRequest {
    /// Only GET option endpoints are issued; POST has no agreed body shape.
    pub fn ensure_supported(&self) -> Result<(), FormError> {
        match self.method {
            HttpMethod::Get => Ok(()),
            HttpMethod::Post => Err(FormError::UnsupportedMethod {
                field: self.field_id.clone(),
                method: self.method.to_string(),
            }),
        }
    }

    /// Query string value for the dependency
    pub fn query_value(&self) -> String {
        values::display(&self.value)
    }
}

/// What happened to a fetch result
#[derive(Clone, Debug, PartialEq)]
pub enum ApplyOutcome {
    /// Stored for the field
    Applied { field_id: String, count: usize },
    /// Dependency changed since the request was issued; dropped
    Stale { field_id: String },
    /// Fetch failed; previous options left in place
    Failed { field_id: String, reason: String },
}

#[derive(Clone, Debug, Default)]
pub struct OptionsResolver {
    cache: DynamicOptionsCache,
}

impl OptionsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &DynamicOptionsCache {
        &self.cache
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Dependency `dependency` now holds `value`.
    ///
    /// Returns one request per dependent field. An empty value clears the
    /// dependents' fetched options instead of fetching.
    pub fn on_change(&mut self, graph: &DependencyGraph, dependency: &str, value: &Value) -> Vec<OptionsRequest> {
        let bindings = graph.options_subscribers(dependency);
        if values::is_empty(value) {
            for binding in bindings {
                if self.cache.remove(&binding.field_id).is_some() {
                    tracing::debug!(field = %binding.field_id, dependency, "cleared dynamic options");
                }
            }
            return Vec::new();
        }
        bindings
            .iter()
            .map(|binding| OptionsRequest {
                field_id: binding.field_id.clone(),
                depends_on: dependency.to_string(),
                value: value.clone(),
                endpoint: binding.endpoint.clone(),
                method: binding.method,
            })
            .collect()
    }

    /// Apply the result of `request` if its dependency value is still current
    pub fn apply(
        &mut self,
        request: &OptionsRequest,
        result: Result<OptionGroups, FormError>,
        values: &FieldValueState,
    ) -> ApplyOutcome {
        let field_id = request.field_id.clone();
        let groups = match result {
            Ok(groups) => groups,
            Err(e) => {
                tracing::warn!(field = %field_id, error = %e, "options fetch failed, keeping previous options");
                return ApplyOutcome::Failed { field_id, reason: e.to_string() };
            }
        };
        if values.get(&request.depends_on) != Some(&request.value) {
            tracing::debug!(field = %field_id, "discarding options for superseded dependency value");
            return ApplyOutcome::Stale { field_id };
        }
        let options = extract_group(&groups, &field_id);
        let count = options.len();
        self.cache.insert(
            field_id.clone(),
            CachedOptions { dependency_value: request.value.clone(), options },
        );
        ApplyOutcome::Applied { field_id, count }
    }
}

/// Pick the field's list out of a grouped response.
///
/// Servers key the list by the pluralised field id (`state` → `states`);
/// a response with a single group is accepted whatever its name.
pub fn extract_group(groups: &OptionGroups, field_id: &str) -> Vec<String> {
    if let Some(list) = groups.get(&format!("{field_id}s")) {
        return list.clone();
    }
    if groups.len() == 1 {
        return groups.values().next().cloned().unwrap_or_default();
    }
    Vec::new()
}
