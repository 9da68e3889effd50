//! Trait abstraction for the form store to enable mocking in tests

use crate::schema::{Form, FormId};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which form to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormRef {
    /// Sentinel: start a new, empty form with this title
    New { title: String },
    Existing(FormId),
}

/// Acknowledgement of a persisted snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    pub form_id: FormId,
    /// Increases by one on every save of the same form
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
}

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSummary {
    pub id: FormId,
    pub title: String,
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
}

/// Persistence collaborator for whole form documents.
///
/// Saves are last-write-wins; the store only stamps a revision.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FormStore: Send + Sync {
    /// Load a stored form, or hand back a fresh one for [`FormRef::New`]
    async fn load(&self, form: FormRef) -> Result<Form>;

    /// Persist the full tree including its rules
    async fn save(&self, form: &Form) -> Result<SaveReceipt>;

    /// List stored forms
    async fn list(&self) -> Result<Vec<FormSummary>>;
}
