//! In-process form store

use super::traits::{FormRef, FormStore, FormSummary, SaveReceipt};
use crate::schema::{Form, FormId};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredForm {
    title: String,
    json: String,
    revision: u64,
    saved_at: DateTime<Utc>,
}

/// Keeps serialized snapshots in memory, so a saved form never aliases the
/// caller's live tree
#[derive(Debug, Default)]
pub struct MemoryFormStore {
    forms: Mutex<HashMap<FormId, StoredForm>>,
}

impl MemoryFormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn revision(&self, id: FormId) -> Option<u64> {
        self.forms.lock().await.get(&id).map(|f| f.revision)
    }
}

#[async_trait]
impl FormStore for MemoryFormStore {
    async fn load(&self, form: FormRef) -> Result<Form> {
        match form {
            FormRef::New { title } => Ok(Form::new(&title)),
            FormRef::Existing(id) => {
                let forms = self.forms.lock().await;
                let stored = forms
                    .get(&id)
                    .ok_or_else(|| anyhow!("Form {} is not stored", id))?;
                Ok(Form::from_json(&stored.json)?)
            }
        }
    }

    async fn save(&self, form: &Form) -> Result<SaveReceipt> {
        let json = form.to_json()?;
        let mut forms = self.forms.lock().await;
        let revision = forms.get(&form.id()).map_or(1, |f| f.revision + 1);
        let saved_at = Utc::now();
        forms.insert(
            form.id(),
            StoredForm {
                title: form.title().to_string(),
                json,
                revision,
                saved_at,
            },
        );
        Ok(SaveReceipt {
            form_id: form.id(),
            revision,
            saved_at,
        })
    }

    async fn list(&self) -> Result<Vec<FormSummary>> {
        let forms = self.forms.lock().await;
        let mut summaries: Vec<FormSummary> = forms
            .iter()
            .map(|(id, f)| FormSummary {
                id: *id,
                title: f.title.clone(),
                revision: f.revision,
                saved_at: f.saved_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }
}
