//! Editing session: one form, its derived view, and the save/load boundary

use crate::editor::{CommandOutcome, EditCommand, Editor};
use crate::error::{FormError, Result};
use crate::layout::{resolve_form, resolve_section_visible, LayoutSlot};
use crate::rules::{evaluate, Evaluation, EvaluationOptions};
use crate::schema::{FieldWidth, Form, SectionId};
use crate::store::{FormRef, FormStore, SaveReceipt};
use crate::validation::{validate, ValidationIssue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Layout and rule evaluation derived from one exact form state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedView {
    pub layout: BTreeMap<SectionId, Vec<LayoutSlot>>,
    pub evaluation: Evaluation,
}

/// Per-session editing context.
///
/// Owns the form tree; every edit goes through [`EditorSession::apply`],
/// which re-derives the view before returning. The view is `None` while the
/// rule graph cannot be evaluated.
#[derive(Debug)]
pub struct EditorSession {
    form: Form,
    options: EvaluationOptions,
    default_width: FieldWidth,
    view: Option<ResolvedView>,
}

impl EditorSession {
    pub fn new(form: Form, options: EvaluationOptions) -> Self {
        let mut session = Self {
            form,
            options,
            default_width: FieldWidth::default(),
            view: None,
        };
        if let Err(err) = session.refresh() {
            tracing::warn!(form = %session.form.id(), "opened form without a view: {err}");
        }
        session
    }

    /// Load a form from the store and start a session on it
    pub async fn open(
        store: &dyn FormStore,
        form: FormRef,
        options: EvaluationOptions,
    ) -> anyhow::Result<Self> {
        let form = store.load(form).await?;
        tracing::info!(form = %form.id(), title = form.title(), "opened editing session");
        Ok(Self::new(form, options))
    }

    /// Width given to fields added without one
    pub fn with_default_width(mut self, width: FieldWidth) -> Self {
        self.default_width = width;
        self
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub fn view(&self) -> Option<&ResolvedView> {
        self.view.as_ref()
    }

    /// Apply one edit and re-derive the view.
    ///
    /// A rejected edit leaves both form and view untouched. An accepted edit
    /// is kept even if evaluation then fails; the error is returned and the
    /// view cleared until a later edit makes the rules evaluable again.
    pub fn apply(&mut self, mut command: EditCommand) -> Result<CommandOutcome> {
        let name = command.name();
        if let EditCommand::AddField { width, .. } = &mut command {
            if width.is_empty() {
                *width = self.default_width.name().to_string();
            }
        }
        let outcome = command
            .apply(&mut Editor::new(&mut self.form))
            .inspect_err(|err| tracing::warn!(command = name, "edit rejected: {err}"))?;
        tracing::debug!(command = name, ?outcome, "edit applied");
        self.refresh()?;
        Ok(outcome)
    }

    /// Recompute layout and rule evaluation from the current tree
    pub fn refresh(&mut self) -> Result<&ResolvedView> {
        self.view = None;
        let evaluation = evaluate(&self.form, &self.options)?;
        let view = self.view.insert(ResolvedView {
            layout: resolve_form(&self.form),
            evaluation,
        });
        Ok(&*view)
    }

    /// Change the hidden-value policy and re-evaluate
    pub fn set_options(&mut self, options: EvaluationOptions) -> Result<()> {
        self.options = options;
        self.refresh().map(|_| ())
    }

    /// Problems with current values, ignoring hidden and disabled fields
    pub fn validate(&self) -> Result<Vec<ValidationIssue>> {
        let evaluation = self.evaluation()?;
        Ok(validate(&self.form, evaluation))
    }

    /// Grid placement of the fields a preview would show
    pub fn visible_layout(&self, section: SectionId) -> Result<Vec<LayoutSlot>> {
        let evaluation = self.evaluation()?;
        let section = self.form.section(section)?;
        Ok(resolve_section_visible(section.fields(), evaluation))
    }

    fn evaluation(&self) -> Result<&Evaluation> {
        match &self.view {
            Some(view) => Ok(&view.evaluation),
            // re-run to surface the same error the last refresh hit
            None => Err(evaluate(&self.form, &self.options)
                .err()
                .unwrap_or_else(|| FormError::CyclicRuleGraph { fields: Vec::new() })),
        }
    }

    /// Detached copy of the current tree
    pub fn snapshot(&self) -> Form {
        self.form.clone()
    }

    pub async fn save(&self, store: &dyn FormStore) -> anyhow::Result<SaveReceipt> {
        store.save(&self.form).await
    }

    /// Save a snapshot in the background; later edits do not affect it
    pub fn spawn_save(&self, store: Arc<dyn FormStore>) -> JoinHandle<anyhow::Result<SaveReceipt>> {
        let snapshot = self.snapshot();
        tokio::spawn(async move { store.save(&snapshot).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Condition, EffectiveState, Effect, HiddenValuePolicy};
    use crate::schema::{FieldId, FieldValue, FormId, PageId};
    use crate::store::{MemoryFormStore, MockFormStore};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn session_with_section() -> (EditorSession, PageId, SectionId) {
        let mut session = EditorSession::new(Form::new("Session"), EvaluationOptions::default());
        let CommandOutcome::PageAdded(page_id) = session
            .apply(EditCommand::AddPage {
                title: "Subject".into(),
            })
            .unwrap()
        else {
            panic!("expected page");
        };
        let CommandOutcome::SectionAdded(section_id) = session
            .apply(EditCommand::AddSection {
                page_id,
                title: "Site".into(),
            })
            .unwrap()
        else {
            panic!("expected section");
        };
        (session, page_id, section_id)
    }

    fn add_field(session: &mut EditorSession, section_id: SectionId, field_type: &str, width: &str) -> FieldId {
        match session
            .apply(EditCommand::AddField {
                section_id,
                field_type: field_type.into(),
                width: width.into(),
                label: String::new(),
            })
            .unwrap()
        {
            CommandOutcome::FieldAdded(id) => id,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    mod editing {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_view_tracks_every_edit() {
            let (mut session, _, section) = session_with_section();
            let a = add_field(&mut session, section, "text", "half");
            let b = add_field(&mut session, section, "text", "half");
            let view = session.view().unwrap();
            assert_eq!(view.layout[&section].len(), 2);
            assert_eq!(view.evaluation.len(), 2);

            session
                .apply(EditCommand::AddRule {
                    source: a,
                    condition: Condition::equals("yes"),
                    target: b,
                    effect: Effect::Show,
                })
                .unwrap();
            assert_eq!(
                session.view().unwrap().evaluation.state(b),
                Some(EffectiveState::Hidden)
            );

            session
                .apply(EditCommand::SetFieldValue {
                    field_id: a,
                    value: FieldValue::Text("yes".into()),
                })
                .unwrap();
            assert_eq!(
                session.view().unwrap().evaluation.state(b),
                Some(EffectiveState::VisibleEnabled)
            );
        }

        #[test]
        fn test_rejected_edit_changes_nothing() {
            let (mut session, _, section) = session_with_section();
            add_field(&mut session, section, "text", "half");
            let form_before = session.form().clone();
            let view_before = session.view().cloned();

            let err = session
                .apply(EditCommand::AddField {
                    section_id: section,
                    field_type: "currency".into(),
                    width: "half".into(),
                    label: String::new(),
                })
                .unwrap_err();
            assert!(matches!(err, FormError::InvalidType(_)));
            assert_eq!(session.form(), &form_before);
            assert_eq!(session.view().cloned(), view_before);
        }

        #[test]
        fn test_move_commands_report_noop() {
            let (mut session, _, section) = session_with_section();
            let a = add_field(&mut session, section, "text", "half");
            add_field(&mut session, section, "text", "half");
            assert_eq!(
                session.apply(EditCommand::MoveFieldUp { field_id: a }).unwrap(),
                CommandOutcome::Moved(false)
            );
            assert_eq!(
                session.apply(EditCommand::MoveFieldDown { field_id: a }).unwrap(),
                CommandOutcome::Moved(true)
            );
            let first = session.view().unwrap().layout[&section][0].field_id;
            assert_ne!(first, a);
        }

        #[test]
        fn test_empty_width_uses_session_default() {
            let (session, _, section) = session_with_section();
            let mut session = session.with_default_width(FieldWidth::Third);
            let id = add_field(&mut session, section, "text", "");
            assert_eq!(session.form().field(id).unwrap().width(), FieldWidth::Third);

            let (mut plain, _, section) = session_with_section();
            let id = add_field(&mut plain, section, "text", "");
            assert_eq!(plain.form().field(id).unwrap().width(), FieldWidth::Full);
        }

        #[test]
        fn test_layout_recomputed_after_width_change() {
            let (mut session, _, section) = session_with_section();
            let a = add_field(&mut session, section, "text", "half");
            add_field(&mut session, section, "text", "half");
            assert_eq!(session.view().unwrap().layout[&section][1].row, 0);
            session
                .apply(EditCommand::SetFieldWidth {
                    field_id: a,
                    width: "two_thirds".into(),
                })
                .unwrap();
            assert_eq!(session.view().unwrap().layout[&section][1].row, 1);
        }

        #[test]
        fn test_visible_layout_and_validation() {
            let (mut session, _, section) = session_with_section();
            let gate = add_field(&mut session, section, "checkbox", "quarter");
            let detail = add_field(&mut session, section, "text", "three_quarters");
            session
                .apply(EditCommand::AddRule {
                    source: gate,
                    condition: Condition::equals(true),
                    target: detail,
                    effect: Effect::Require,
                })
                .unwrap();
            assert_eq!(session.visible_layout(section).unwrap().len(), 2);
            assert!(session.validate().unwrap().is_empty());

            session
                .apply(EditCommand::SetFieldValue {
                    field_id: gate,
                    value: FieldValue::Checkbox(true),
                })
                .unwrap();
            let issues = session.validate().unwrap();
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].field_id, detail);
        }
    }

    mod cyclic_documents {
        use super::*;
        use pretty_assertions::assert_eq;

        fn cyclic_form() -> (Form, [FieldId; 3]) {
            let (session, _, section) = session_with_section();
            let mut form = session.snapshot();
            let mut editor = Editor::new(&mut form);
            let ids = [
                editor.add_field_named(section, "text", "third", "A").unwrap(),
                editor.add_field_named(section, "text", "third", "B").unwrap(),
                editor.add_field_named(section, "text", "third", "C").unwrap(),
            ];
            editor.add_rule(ids[0], Condition::IsEmpty, ids[1], Effect::Hide).unwrap();
            editor.add_rule(ids[1], Condition::IsEmpty, ids[2], Effect::Hide).unwrap();
            let closing = form.rules_mut().insert(ids[2], Condition::IsEmpty, ids[0], Effect::Hide);
            form.field_mut(ids[0]).unwrap().rule_refs_mut().insert(closing);
            (form, ids)
        }

        #[test]
        fn test_cyclic_form_opens_without_view() {
            let (form, _) = cyclic_form();
            // the document itself is structurally valid
            assert!(form.check_integrity().is_ok());
            let session = EditorSession::new(form, EvaluationOptions::default());
            assert!(session.view().is_none());
            assert!(matches!(
                session.validate(),
                Err(FormError::CyclicRuleGraph { .. })
            ));
        }

        #[test]
        fn test_breaking_the_cycle_restores_view() {
            let (form, ids) = cyclic_form();
            let mut session = EditorSession::new(form, EvaluationOptions::default());
            let rule_id = session.form().rules().targeting(ids[0]).next().unwrap().id;

            // edits still apply but report the cycle
            let err = session
                .apply(EditCommand::SetFieldLabel {
                    field_id: ids[1],
                    label: "Renamed".into(),
                })
                .unwrap_err();
            assert!(matches!(err, FormError::CyclicRuleGraph { .. }));
            assert_eq!(session.form().field(ids[1]).unwrap().label(), "Renamed");

            session.apply(EditCommand::RemoveRule { rule_id }).unwrap();
            assert!(session.view().is_some());
        }
    }

    mod policy {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_switching_policy_re_evaluates() {
            let (mut session, _, section) = session_with_section();
            let gate = add_field(&mut session, section, "checkbox", "quarter");
            let middle = add_field(&mut session, section, "text", "quarter");
            let last = add_field(&mut session, section, "text", "quarter");
            for (source, condition, target) in [
                (gate, Condition::equals(true), middle),
                (middle, Condition::IsNotEmpty, last),
            ] {
                session
                    .apply(EditCommand::AddRule {
                        source,
                        condition,
                        target,
                        effect: Effect::Show,
                    })
                    .unwrap();
            }
            session
                .apply(EditCommand::SetFieldValue {
                    field_id: middle,
                    value: FieldValue::Text("stale".into()),
                })
                .unwrap();
            assert!(session.view().unwrap().evaluation.is_visible(last));

            session
                .set_options(EvaluationOptions {
                    hidden_values: HiddenValuePolicy::ResetOnHide,
                })
                .unwrap();
            assert!(!session.view().unwrap().evaluation.is_visible(last));
        }
    }

    mod persistence {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_open_new_and_save_round_trip() {
            let store = MemoryFormStore::new();
            let mut session = EditorSession::open(
                &store,
                FormRef::New {
                    title: "Fresh".into(),
                },
                EvaluationOptions::default(),
            )
            .await
            .unwrap();
            session
                .apply(EditCommand::AddPage {
                    title: "Only".into(),
                })
                .unwrap();
            let receipt = session.save(&store).await.unwrap();

            let reopened = EditorSession::open(
                &store,
                FormRef::Existing(receipt.form_id),
                EvaluationOptions::default(),
            )
            .await
            .unwrap();
            assert_eq!(reopened.form(), session.form());
        }

        #[tokio::test]
        async fn test_background_save_captures_snapshot() {
            let store = Arc::new(MemoryFormStore::new());
            let (mut session, page_id, _) = session_with_section();
            let handle = session.spawn_save(store.clone());
            session
                .apply(EditCommand::RenamePage {
                    page_id,
                    title: "Edited after save".into(),
                })
                .unwrap();
            handle.await.unwrap().unwrap();

            let saved = store
                .load(FormRef::Existing(session.form().id()))
                .await
                .unwrap();
            assert_eq!(saved.page(page_id).unwrap().title(), "Subject");

            session.save(store.as_ref()).await.unwrap();
            let saved = store
                .load(FormRef::Existing(session.form().id()))
                .await
                .unwrap();
            assert_eq!(saved.page(page_id).unwrap().title(), "Edited after save");
        }

        #[tokio::test]
        async fn test_save_uses_store_contract() {
            let mut store = MockFormStore::new();
            let (session, _, _) = session_with_section();
            let expected_id = session.form().id();
            store
                .expect_save()
                .withf(move |form: &Form| form.id() == expected_id && form.pages().len() == 1)
                .times(1)
                .returning(|form| {
                    Ok(SaveReceipt {
                        form_id: form.id(),
                        revision: 7,
                        saved_at: Utc::now(),
                    })
                });
            let receipt = session.save(&store).await.unwrap();
            assert_eq!(receipt.revision, 7);
        }

        #[tokio::test]
        async fn test_open_propagates_store_failure() {
            let mut store = MockFormStore::new();
            store
                .expect_load()
                .returning(|_| Err(anyhow::anyhow!("store offline")));
            let err = EditorSession::open(
                &store,
                FormRef::Existing(FormId::new()),
                EvaluationOptions::default(),
            )
            .await
            .unwrap_err();
            assert!(err.to_string().contains("store offline"));
        }
    }
}
