//! Form service port
//!
//! The remote service that serves schemas, accepts submissions and stores
//! applications. Sessions and the CLI only talk to it through this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ServiceError;
use crate::options::{OptionGroups, OptionsRequest};
use crate::schema::FormSchema;
use crate::values::Payload;

/// One stored application row
pub type ApplicationRecord = Map<String, Value>;

/// Opaque confirmation returned by a successful submission
pub type SubmitReceipt = Value;

/// Stored applications plus the columns to show, in order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationsPage {
    #[serde(default)]
    pub data: Vec<ApplicationRecord>,
    #[serde(default)]
    pub columns: Vec<String>,
}

#[async_trait]
pub trait FormService: Send + Sync {
    /// All form schemas the service offers
    async fn fetch_forms(&self) -> Result<Vec<FormSchema>, ServiceError>;

    /// Submit a flattened payload
    async fn submit(&self, payload: &Payload) -> Result<SubmitReceipt, ServiceError>;

    /// Stored applications
    async fn fetch_submissions(&self) -> Result<ApplicationsPage, ServiceError>;

    /// Option groups for a dependent field
    async fn fetch_options(&self, request: &OptionsRequest) -> Result<OptionGroups, ServiceError>;
}
