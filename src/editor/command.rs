//! Edit intents as data
//!
//! Commands arrive from the UI layer as JSON. Type and width travel as raw
//! names so an unknown one surfaces as `InvalidType` / `InvalidWidth` rather
//! than a decode failure.

use super::Editor;
use crate::error::Result;
use crate::rules::{Condition, Effect};
use crate::schema::{
    ChoiceOption, FieldId, FieldValue, FieldWidth, PageId, RuleId, SectionId, Validator,
};
use serde::{Deserialize, Serialize};

/// A single user edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditCommand {
    SetFormTitle {
        title: String,
    },
    AddPage {
        title: String,
    },
    RenamePage {
        page_id: PageId,
        title: String,
    },
    DeletePage {
        page_id: PageId,
    },
    AddSection {
        page_id: PageId,
        title: String,
    },
    RenameSection {
        section_id: SectionId,
        title: String,
    },
    DeleteSection {
        section_id: SectionId,
    },
    MoveSectionUp {
        section_id: SectionId,
    },
    MoveSectionDown {
        section_id: SectionId,
    },
    AddField {
        section_id: SectionId,
        field_type: String,
        /// Empty means the session's default width
        #[serde(default)]
        width: String,
        #[serde(default)]
        label: String,
    },
    DeleteField {
        field_id: FieldId,
    },
    MoveFieldUp {
        field_id: FieldId,
    },
    MoveFieldDown {
        field_id: FieldId,
    },
    ReorderWithinSection {
        section_id: SectionId,
        field_id: FieldId,
        new_index: usize,
    },
    SetFieldLabel {
        field_id: FieldId,
        label: String,
    },
    SetFieldWidth {
        field_id: FieldId,
        width: String,
    },
    SetFieldValue {
        field_id: FieldId,
        value: FieldValue,
    },
    SetFieldOptions {
        field_id: FieldId,
        options: Vec<ChoiceOption>,
    },
    SetFieldValidators {
        field_id: FieldId,
        validators: Vec<Validator>,
    },
    AddRule {
        source: FieldId,
        condition: Condition,
        target: FieldId,
        effect: Effect,
    },
    RemoveRule {
        rule_id: RuleId,
    },
}

/// What an applied command produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CommandOutcome {
    PageAdded(PageId),
    SectionAdded(SectionId),
    FieldAdded(FieldId),
    RuleAdded(RuleId),
    /// Reorder result; `false` for a boundary no-op
    Moved(bool),
    /// Final index after a drag-style reorder
    Placed(usize),
    Removed,
    Updated,
}

impl EditCommand {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetFormTitle { .. } => "set_form_title",
            Self::AddPage { .. } => "add_page",
            Self::RenamePage { .. } => "rename_page",
            Self::DeletePage { .. } => "delete_page",
            Self::AddSection { .. } => "add_section",
            Self::RenameSection { .. } => "rename_section",
            Self::DeleteSection { .. } => "delete_section",
            Self::MoveSectionUp { .. } => "move_section_up",
            Self::MoveSectionDown { .. } => "move_section_down",
            Self::AddField { .. } => "add_field",
            Self::DeleteField { .. } => "delete_field",
            Self::MoveFieldUp { .. } => "move_field_up",
            Self::MoveFieldDown { .. } => "move_field_down",
            Self::ReorderWithinSection { .. } => "reorder_within_section",
            Self::SetFieldLabel { .. } => "set_field_label",
            Self::SetFieldWidth { .. } => "set_field_width",
            Self::SetFieldValue { .. } => "set_field_value",
            Self::SetFieldOptions { .. } => "set_field_options",
            Self::SetFieldValidators { .. } => "set_field_validators",
            Self::AddRule { .. } => "add_rule",
            Self::RemoveRule { .. } => "remove_rule",
        }
    }

    pub fn apply(self, editor: &mut Editor<'_>) -> Result<CommandOutcome> {
        let outcome = match self {
            Self::SetFormTitle { title } => {
                editor.set_form_title(&title);
                CommandOutcome::Updated
            }
            Self::AddPage { title } => CommandOutcome::PageAdded(editor.add_page(&title)?),
            Self::RenamePage { page_id, title } => {
                editor.rename_page(page_id, &title)?;
                CommandOutcome::Updated
            }
            Self::DeletePage { page_id } => {
                editor.delete_page(page_id)?;
                CommandOutcome::Removed
            }
            Self::AddSection { page_id, title } => {
                CommandOutcome::SectionAdded(editor.add_section(page_id, &title)?)
            }
            Self::RenameSection { section_id, title } => {
                editor.rename_section(section_id, &title)?;
                CommandOutcome::Updated
            }
            Self::DeleteSection { section_id } => {
                editor.delete_section(section_id)?;
                CommandOutcome::Removed
            }
            Self::MoveSectionUp { section_id } => {
                CommandOutcome::Moved(editor.move_section_up(section_id)?)
            }
            Self::MoveSectionDown { section_id } => {
                CommandOutcome::Moved(editor.move_section_down(section_id)?)
            }
            Self::AddField {
                section_id,
                field_type,
                width,
                label,
            } => CommandOutcome::FieldAdded(editor.add_field_named(
                section_id,
                &field_type,
                &width,
                &label,
            )?),
            Self::DeleteField { field_id } => {
                editor.delete_field(field_id)?;
                CommandOutcome::Removed
            }
            Self::MoveFieldUp { field_id } => CommandOutcome::Moved(editor.move_field_up(field_id)?),
            Self::MoveFieldDown { field_id } => {
                CommandOutcome::Moved(editor.move_field_down(field_id)?)
            }
            Self::ReorderWithinSection {
                section_id,
                field_id,
                new_index,
            } => CommandOutcome::Placed(editor.reorder_within_section(
                section_id, field_id, new_index,
            )?),
            Self::SetFieldLabel { field_id, label } => {
                editor.set_field_label(field_id, &label)?;
                CommandOutcome::Updated
            }
            Self::SetFieldWidth { field_id, width } => {
                let width: FieldWidth = width.parse()?;
                editor.set_field_width(field_id, width)?;
                CommandOutcome::Updated
            }
            Self::SetFieldValue { field_id, value } => {
                editor.set_field_value(field_id, value)?;
                CommandOutcome::Updated
            }
            Self::SetFieldOptions { field_id, options } => {
                editor.set_field_options(field_id, options)?;
                CommandOutcome::Updated
            }
            Self::SetFieldValidators {
                field_id,
                validators,
            } => {
                editor.set_field_validators(field_id, validators)?;
                CommandOutcome::Updated
            }
            Self::AddRule {
                source,
                condition,
                target,
                effect,
            } => CommandOutcome::RuleAdded(editor.add_rule(source, condition, target, effect)?),
            Self::RemoveRule { rule_id } => {
                editor.remove_rule(rule_id)?;
                CommandOutcome::Removed
            }
        };
        Ok(outcome)
    }
}
