//! Insurance Portal Core
//!
//! Schema-driven application forms for the insurance portal.
//!
//! ## Features
//! - Declarative form schemas fetched from the form service
//! - Conditional visibility and per-field validation rules
//! - Remote option lists that follow another field's value
//! - Form sessions with local validation and submission
//! - Sortable, filterable, paginated applications table
//!
//! # Example
//!
//! ```rust,no_run
//! use portal_core::{FormSession, InMemoryFormService, FormService};
//! use serde_json::json;
//!
//! # async fn run() -> portal_core::Result<()> {
//! let service = InMemoryFormService::new();
//! let forms = service.fetch_forms().await?;
//! let mut session = FormSession::new(forms[0].clone());
//! session.change(&service, "age", json!(25)).await?;
//! let receipt = session.submit(&service).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod graph;
pub mod interpreter;
pub mod memory;
pub mod options;
pub mod render;
pub mod schema;
pub mod service;
pub mod session;
pub mod table;
pub mod values;

pub use error::{FormError, Result, ServiceError};
pub use graph::DependencyGraph;
pub use interpreter::{Rule, Violation};
pub use memory::InMemoryFormService;
pub use options::{ApplyOutcome, CachedOptions, DynamicOptionsCache, OptionGroups, OptionsRequest, OptionsResolver};
pub use render::{RenderedForm, RenderedNode};
pub use schema::{
    Choices, Condition, DynamicOptions, FieldKind, FieldNode, FormSchema, HttpMethod, SchemaIssue, Validation,
    Visibility,
};
pub use service::{ApplicationRecord, ApplicationsPage, FormService, SubmitReceipt};
pub use session::{FieldReport, FormSession, SessionState, ValidationReport};
pub use table::{SortDirection, TableSnapshot, TableView};
pub use values::{FieldValueState, Payload};
