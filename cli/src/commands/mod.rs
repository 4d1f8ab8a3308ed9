//! CLI Commands

pub mod applications;
pub mod apply;
pub mod config;
pub mod forms;

use std::time::Duration;

use anyhow::{Context as _, Result};
use portal_client::{ClientConfig, HttpFormService, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use portal_core::{FormError, FormSchema, FormService};

use crate::config::Config;
use crate::output::OutputFormat;

/// Settings and service shared by every command
pub struct Context {
    pub service: HttpFormService,
    pub format: OutputFormat,
    pub page_size: Option<usize>,
}

impl Context {
    /// Flags win over the config file, which wins over built-in defaults
    pub fn new(
        config: &Config,
        api_url: Option<String>,
        timeout_secs: Option<u64>,
        format: Option<OutputFormat>,
    ) -> Result<Self> {
        let base_url = api_url
            .or_else(|| config.api_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = timeout_secs
            .or(config.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        let format = format
            .or_else(|| config.default_format.as_deref().and_then(OutputFormat::from_setting))
            .unwrap_or(OutputFormat::Table);

        let service = HttpFormService::with_config(ClientConfig { base_url, timeout })
            .context("invalid form service settings")?;
        Ok(Self { service, format, page_size: config.page_size })
    }
}

/// Fetch the forms offered by the service
pub async fn load_forms(service: &dyn FormService) -> Result<Vec<FormSchema>> {
    let forms = service.fetch_forms().await.context("could not load forms")?;
    tracing::debug!(count = forms.len(), "loaded forms");
    Ok(forms)
}

/// The form named `form_id`, or the first one when no id is given
pub fn select_form(forms: Vec<FormSchema>, form_id: Option<&str>) -> Result<FormSchema> {
    if forms.is_empty() {
        anyhow::bail!("No forms available");
    }
    let mut forms = forms.into_iter();
    let selected = match form_id {
        None => forms.next(),
        Some(id) => forms.find(|f| f.form_id == id),
    };
    selected.ok_or_else(|| FormError::FormNotFound(form_id.unwrap_or_default().to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forms() -> Vec<FormSchema> {
        vec![
            serde_json::from_value(json!({ "formId": "health", "title": "Health", "fields": [] })).unwrap(),
            serde_json::from_value(json!({ "formId": "home", "title": "Home", "fields": [] })).unwrap(),
        ]
    }

    #[test]
    fn test_select_first_by_default() {
        assert_eq!(select_form(forms(), None).unwrap().form_id, "health");
        assert_eq!(select_form(forms(), Some("home")).unwrap().form_id, "home");
    }

    #[test]
    fn test_select_missing() {
        let err = select_form(forms(), Some("car")).unwrap_err();
        assert_eq!(err.to_string(), "form not found: car");
        assert!(select_form(Vec::new(), None).is_err());
    }

    #[test]
    fn test_context_precedence() {
        let config = Config {
            api_url: Some("https://config.example.com/".into()),
            default_format: Some("yaml".into()),
            timeout_secs: Some(3),
            page_size: Some(20),
        };
        let ctx = Context::new(&config, None, None, None).unwrap();
        assert_eq!(ctx.service.base_url().as_str(), "https://config.example.com/");
        assert_eq!(ctx.format, OutputFormat::Yaml);

        let ctx = Context::new(&config, Some("https://flag.example.com".into()), None, Some(OutputFormat::Json)).unwrap();
        assert_eq!(ctx.service.base_url().as_str(), "https://flag.example.com/");
        assert_eq!(ctx.format, OutputFormat::Json);
        assert_eq!(ctx.page_size, Some(20));
    }
}
