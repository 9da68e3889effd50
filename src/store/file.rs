//! JSON-file form store
//!
//! One pretty-printed document per form, named `<form id>.json`, inside a
//! single directory.

use super::traits::{FormRef, FormStore, FormSummary, SaveReceipt};
use crate::schema::{Form, FormId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// On-disk envelope around a form
#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    revision: u64,
    saved_at: DateTime<Utc>,
    form: Form,
}

pub struct FileFormStore {
    dir: PathBuf,
    /// Serializes read-modify-write of revisions within this process
    write_lock: Mutex<()>,
}

impl FileFormStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: FormId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read_document(path: &Path) -> Result<StoredDocument> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read form file {}", path.display()))?;
        let document: StoredDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse form file {}", path.display()))?;
        document.form.check_integrity()?;
        Ok(document)
    }
}

#[async_trait]
impl FormStore for FileFormStore {
    async fn load(&self, form: FormRef) -> Result<Form> {
        match form {
            FormRef::New { title } => Ok(Form::new(&title)),
            FormRef::Existing(id) => {
                let document = Self::read_document(&self.path_for(id)).await?;
                tracing::info!(form = %id, revision = document.revision, "loaded form");
                Ok(document.form)
            }
        }
    }

    async fn save(&self, form: &Form) -> Result<SaveReceipt> {
        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create store dir {}", self.dir.display()))?;

        let path = self.path_for(form.id());
        let revision = if fs::try_exists(&path).await? {
            Self::read_document(&path).await?.revision + 1
        } else {
            1
        };
        let document = StoredDocument {
            revision,
            saved_at: Utc::now(),
            form: form.clone(),
        };
        let content = serde_json::to_string_pretty(&document)?;

        // write then rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;

        tracing::info!(form = %form.id(), revision, "saved form");
        Ok(SaveReceipt {
            form_id: form.id(),
            revision,
            saved_at: document.saved_at,
        })
    }

    async fn list(&self) -> Result<Vec<FormSummary>> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_document(&path).await {
                Ok(document) => summaries.push(FormSummary {
                    id: document.form.id(),
                    title: document.form.title().to_string(),
                    revision: document.revision,
                    saved_at: document.saved_at,
                }),
                Err(err) => tracing::warn!("Skipping unreadable form file {}: {err:#}", path.display()),
            }
        }
        summaries.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Editor;
    use crate::rules::{Condition, Effect};
    use crate::schema::{FieldType, FieldWidth};
    use pretty_assertions::assert_eq;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("form-studio-{name}-{}", FormId::new()))
    }

    fn sample() -> Form {
        let mut form = Form::new("Condo addendum");
        let mut editor = Editor::new(&mut form);
        let page = editor.add_page("Project").unwrap();
        let section = editor.add_section(page, "HOA").unwrap();
        let has_hoa = editor
            .add_field(section, FieldType::Checkbox, FieldWidth::Quarter, "HOA")
            .unwrap();
        let dues = editor
            .add_field(section, FieldType::Text, FieldWidth::ThreeQuarters, "Dues")
            .unwrap();
        editor
            .add_rule(has_hoa, Condition::equals(true), dues, Effect::Show)
            .unwrap();
        form
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = temp_dir("roundtrip");
        let store = FileFormStore::new(&dir);
        let form = sample();

        let first = store.save(&form).await.unwrap();
        let second = store.save(&form).await.unwrap();
        assert_eq!(first.revision, 1);
        assert_eq!(second.revision, 2);

        let loaded = store.load(FormRef::Existing(form.id())).await.unwrap();
        assert_eq!(loaded, form);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Condo addendum");
        assert_eq!(listed[0].revision, 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_list_on_missing_dir_is_empty() {
        let store = FileFormStore::new(temp_dir("missing"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let store = FileFormStore::new(temp_dir("absent"));
        let err = store
            .load(FormRef::Existing(FormId::new()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read form file"));
    }

    #[tokio::test]
    async fn test_inconsistent_document_rejected() {
        let dir = temp_dir("corrupt");
        let store = FileFormStore::new(&dir);
        let form = sample();
        store.save(&form).await.unwrap();

        // drop the rule list but leave rule_refs behind
        let path = dir.join(format!("{}.json", form.id()));
        let mut doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        doc["form"]["rules"] = serde_json::json!([]);
        std::fs::write(&path, doc.to_string()).unwrap();

        assert!(store.load(FormRef::Existing(form.id())).await.is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
