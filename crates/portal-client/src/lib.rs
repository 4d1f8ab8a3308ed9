//! Insurance Portal HTTP Client
//!
//! [`HttpFormService`] implements the [`FormService`] port against the
//! insurance form service's HTTP API.
//!
//! # Example
//!
//! ```rust,no_run
//! use portal_client::{ClientConfig, HttpFormService};
//! use portal_core::FormService;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = HttpFormService::with_config(ClientConfig::default())?;
//! let forms = service.fetch_forms().await?;
//! println!("{} forms available", forms.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use portal_core::{
    ApplicationsPage, FormSchema, FormService, HttpMethod, OptionGroups, OptionsRequest, Payload, ServiceError,
    SubmitReceipt,
};

pub use error::*;

pub mod error;

/// Client version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default form service base URL
pub const DEFAULT_BASE_URL: &str = "https://assignment.devotel.io/";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const FORMS_PATH: &str = "api/insurance/forms";
const SUBMIT_PATH: &str = "api/insurance/forms/submit";
const SUBMISSIONS_PATH: &str = "api/insurance/forms/submissions";

// =============================================================================
// HTTP Client
// =============================================================================

/// Configuration for the form service client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Form service reached over HTTP
#[derive(Clone)]
pub struct HttpFormService {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpFormService {
    /// Client for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        // a base without a trailing slash would lose its last segment on join
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        let user_agent = header::HeaderValue::from_str(&format!("insurance-portal/{}", VERSION))
            .map_err(|e| Error::Config(e.to_string()))?;
        headers.insert(header::USER_AGENT, user_agent);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let mut url = self.url(path)?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        tracing::debug!(%method, %url, "form service request");
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        self.request::<T, ()>(Method::GET, path, None, params).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.request(Method::POST, path, Some(body), &[]).await
    }

    /// All form schemas; a single-object response is wrapped in a list
    pub async fn forms(&self) -> Result<Vec<FormSchema>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum FormsResponse {
            Many(Vec<FormSchema>),
            One(Box<FormSchema>),
        }

        Ok(match self.get::<FormsResponse>(FORMS_PATH, &[]).await? {
            FormsResponse::Many(forms) => forms,
            FormsResponse::One(form) => vec![*form],
        })
    }

    pub async fn submit_payload(&self, payload: &Payload) -> Result<SubmitReceipt> {
        self.post(SUBMIT_PATH, payload).await
    }

    pub async fn submissions(&self) -> Result<ApplicationsPage> {
        self.get(SUBMISSIONS_PATH, &[]).await
    }

    /// `GET {endpoint}?{dependsOn}={value}`
    pub async fn options(&self, request: &OptionsRequest) -> Result<OptionGroups> {
        if request.method != HttpMethod::Get {
            return Err(Error::UnsupportedMethod(request.method.to_string()));
        }
        let value = request.query_value();
        self.get(&request.endpoint, &[(request.depends_on.as_str(), value.as_str())])
            .await
    }
}

#[async_trait]
impl FormService for HttpFormService {
    async fn fetch_forms(&self) -> std::result::Result<Vec<FormSchema>, ServiceError> {
        Ok(self.forms().await?)
    }

    async fn submit(&self, payload: &Payload) -> std::result::Result<SubmitReceipt, ServiceError> {
        Ok(self.submit_payload(payload).await?)
    }

    async fn fetch_submissions(&self) -> std::result::Result<ApplicationsPage, ServiceError> {
        Ok(self.submissions().await?)
    }

    async fn fetch_options(&self, request: &OptionsRequest) -> std::result::Result<OptionGroups, ServiceError> {
        Ok(self.options(request).await?)
    }
}
