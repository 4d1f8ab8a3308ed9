//! In-memory form service (for testing and offline use)

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Map};

use crate::error::ServiceError;
use crate::options::{OptionGroups, OptionsRequest};
use crate::schema::FormSchema;
use crate::service::{ApplicationsPage, FormService, SubmitReceipt};
use crate::values::Payload;

#[derive(Default)]
struct Recorded {
    submissions: Vec<Payload>,
    submit_calls: usize,
    option_requests: Vec<OptionsRequest>,
    fail_submissions: bool,
    fail_options: bool,
}

/// Serves a fixed set of forms and scripted option lists, and keeps every
/// submission it receives.
#[derive(Default)]
pub struct InMemoryFormService {
    forms: Vec<FormSchema>,
    options: HashMap<(String, String), OptionGroups>,
    recorded: RwLock<Recorded>,
}

impl InMemoryFormService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(mut self, schema: FormSchema) -> Self {
        self.forms.push(schema);
        self
    }

    /// Answer `endpoint?dep=value` with `groups`
    pub fn with_options(mut self, endpoint: impl Into<String>, value: impl Into<String>, groups: OptionGroups) -> Self {
        self.options.insert((endpoint.into(), value.into()), groups);
        self
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.recorded.write().fail_submissions = fail;
    }

    pub fn fail_options(&self, fail: bool) {
        self.recorded.write().fail_options = fail;
    }

    pub fn submissions(&self) -> Vec<Payload> {
        self.recorded.read().submissions.clone()
    }

    /// Submit calls received, including failed ones
    pub fn submit_calls(&self) -> usize {
        self.recorded.read().submit_calls
    }

    pub fn option_requests(&self) -> Vec<OptionsRequest> {
        self.recorded.read().option_requests.clone()
    }
}

#[async_trait]
impl FormService for InMemoryFormService {
    async fn fetch_forms(&self) -> Result<Vec<FormSchema>, ServiceError> {
        Ok(self.forms.clone())
    }

    async fn submit(&self, payload: &Payload) -> Result<SubmitReceipt, ServiceError> {
        let mut recorded = self.recorded.write();
        recorded.submit_calls += 1;
        if recorded.fail_submissions {
            return Err(ServiceError::Status { status: 503, body: "submissions unavailable".into() });
        }
        recorded.submissions.push(payload.clone());
        Ok(json!({ "status": "success", "id": recorded.submissions.len() }))
    }

    async fn fetch_submissions(&self) -> Result<ApplicationsPage, ServiceError> {
        let recorded = self.recorded.read();
        let mut columns: Vec<String> = Vec::new();
        let mut data = Vec::with_capacity(recorded.submissions.len());
        for payload in &recorded.submissions {
            let mut row = Map::new();
            for (key, value) in payload {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
                row.insert(key.clone(), value.clone());
            }
            data.push(row);
        }
        Ok(ApplicationsPage { data, columns })
    }

    async fn fetch_options(&self, request: &OptionsRequest) -> Result<OptionGroups, ServiceError> {
        let mut recorded = self.recorded.write();
        recorded.option_requests.push(request.clone());
        if recorded.fail_options {
            return Err(ServiceError::Transport("options endpoint unreachable".into()));
        }
        self.options
            .get(&(request.endpoint.clone(), request.query_value()))
            .cloned()
            .ok_or_else(|| ServiceError::Status { status: 404, body: format!("no options at {}", request.endpoint) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_submissions() {
        let service = InMemoryFormService::new();
        let mut payload = Payload::new();
        payload.insert("age".into(), json!(25));
        service.submit(&payload).await.unwrap();

        let page = service.fetch_submissions().await.unwrap();
        assert_eq!(page.columns, vec!["age"]);
        assert_eq!(page.data[0]["age"], json!(25));
        assert_eq!(service.submit_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_submission_counted_not_stored() {
        let service = InMemoryFormService::new();
        service.fail_submissions(true);
        assert!(service.submit(&Payload::new()).await.is_err());
        assert_eq!(service.submit_calls(), 1);
        assert!(service.submissions().is_empty());
    }
}
