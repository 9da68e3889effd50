//! Field value objects

use super::ids::{FieldId, RuleId};
use crate::error::{FormError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Closed vocabulary of field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Select,
    Checkbox,
    Radio,
}

impl FieldType {
    pub const ALL: [FieldType; 6] = [
        Self::Text,
        Self::Textarea,
        Self::Email,
        Self::Select,
        Self::Checkbox,
        Self::Radio,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Email => "email",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
        }
    }

    /// Whether the field picks from a list of options
    pub fn has_options(&self) -> bool {
        matches!(self, Self::Select | Self::Radio)
    }

    pub fn is_multiline(&self) -> bool {
        matches!(self, Self::Textarea)
    }
}

impl FromStr for FieldType {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| FormError::InvalidType(s.to_string()))
    }
}

/// Width of the 12-column grid
pub const GRID_COLUMNS: u8 = 12;

/// Closed vocabulary of field widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldWidth {
    Quarter,
    Third,
    Half,
    TwoThirds,
    ThreeQuarters,
    #[default]
    Full,
}

impl FieldWidth {
    pub const ALL: [FieldWidth; 6] = [
        Self::Quarter,
        Self::Third,
        Self::Half,
        Self::TwoThirds,
        Self::ThreeQuarters,
        Self::Full,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Quarter => "quarter",
            Self::Third => "third",
            Self::Half => "half",
            Self::TwoThirds => "two_thirds",
            Self::ThreeQuarters => "three_quarters",
            Self::Full => "full",
        }
    }

    /// Grid columns this width occupies
    pub const fn column_span(self) -> u8 {
        match self {
            Self::Quarter => 3,
            Self::Third => 4,
            Self::Half => 6,
            Self::TwoThirds => 8,
            Self::ThreeQuarters => 9,
            Self::Full => 12,
        }
    }

    /// Share of the row, in percent
    pub fn percentage(self) -> f32 {
        match self {
            Self::Quarter => 25.0,
            Self::Third => 33.33,
            Self::Half => 50.0,
            Self::TwoThirds => 66.67,
            Self::ThreeQuarters => 75.0,
            Self::Full => 100.0,
        }
    }
}

impl FromStr for FieldWidth {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|w| w.name() == s)
            .ok_or_else(|| FormError::InvalidWidth(s.to_string()))
    }
}

/// Type-safe field values, one variant per field type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Textarea(String),
    Email(String),
    /// Chosen option id
    Select(Option<String>),
    Checkbox(bool),
    /// Chosen option id
    Radio(Option<String>),
}

impl FieldValue {
    /// Empty value for a freshly added field
    pub fn default_for(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => Self::Text(String::new()),
            FieldType::Textarea => Self::Textarea(String::new()),
            FieldType::Email => Self::Email(String::new()),
            FieldType::Select => Self::Select(None),
            FieldType::Checkbox => Self::Checkbox(false),
            FieldType::Radio => Self::Radio(None),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Text(_) => FieldType::Text,
            Self::Textarea(_) => FieldType::Textarea,
            Self::Email(_) => FieldType::Email,
            Self::Select(_) => FieldType::Select,
            Self::Checkbox(_) => FieldType::Checkbox,
            Self::Radio(_) => FieldType::Radio,
        }
    }

    /// Text content, or the chosen option id for choice fields
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Textarea(s) | Self::Email(s) => Some(s),
            Self::Select(choice) | Self::Radio(choice) => choice.as_deref(),
            Self::Checkbox(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Checkbox(checked) => Some(*checked),
            _ => None,
        }
    }

    /// Empty text, no choice, or an unchecked box
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) | Self::Textarea(s) | Self::Email(s) => s.is_empty(),
            Self::Select(choice) | Self::Radio(choice) => choice.is_none(),
            Self::Checkbox(checked) => !checked,
        }
    }

    /// Get the display value for previews
    pub fn display_value(&self) -> String {
        match self {
            Self::Text(s) | Self::Textarea(s) | Self::Email(s) => s.clone(),
            Self::Select(choice) | Self::Radio(choice) => choice.clone().unwrap_or_default(),
            Self::Checkbox(true) => "Yes".to_string(),
            Self::Checkbox(false) => "No".to_string(),
        }
    }
}

/// Per-field validation constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validator {
    Required,
    MinLength { len: usize },
    MaxLength { len: usize },
    EmailFormat,
}

/// One choice of a select or radio field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

/// A single form field with its configuration and value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    id: FieldId,
    #[serde(rename = "type")]
    field_type: FieldType,
    label: String,
    width: FieldWidth,
    value: FieldValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    validators: Vec<Validator>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<ChoiceOption>,
    #[serde(default)]
    rule_refs: BTreeSet<RuleId>,
}

impl Field {
    pub(crate) fn new(field_type: FieldType, width: FieldWidth, label: &str) -> Self {
        Self {
            id: FieldId::new(),
            field_type,
            label: label.to_string(),
            width,
            value: FieldValue::default_for(field_type),
            validators: Vec::new(),
            options: Vec::new(),
            rule_refs: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> FieldWidth {
        self.width
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    /// Ids of rules that target this field
    pub fn rule_refs(&self) -> &BTreeSet<RuleId> {
        &self.rule_refs
    }

    pub fn is_required_by_default(&self) -> bool {
        self.validators.contains(&Validator::Required)
    }

    pub(crate) fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }

    pub(crate) fn set_width(&mut self, width: FieldWidth) {
        self.width = width;
    }

    pub(crate) fn set_validators(&mut self, validators: Vec<Validator>) {
        self.validators = validators;
    }

    /// Check that `value` fits this field without assigning it
    pub(crate) fn check_value(&self, value: &FieldValue) -> Result<()> {
        if value.field_type() != self.field_type {
            return Err(FormError::InvalidValue {
                field: self.id.to_string(),
                reason: format!(
                    "expected a {} value, got {}",
                    self.field_type.name(),
                    value.field_type().name()
                ),
            });
        }
        if let FieldValue::Select(Some(choice)) | FieldValue::Radio(Some(choice)) = value {
            if !self.options.iter().any(|o| &o.id == choice) {
                return Err(FormError::InvalidValue {
                    field: self.id.to_string(),
                    reason: format!("unknown option '{choice}'"),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn set_value(&mut self, value: FieldValue) -> Result<()> {
        self.check_value(&value)?;
        self.value = value;
        Ok(())
    }

    /// Replace the option list; a chosen option that disappears is cleared
    pub(crate) fn set_options(&mut self, options: Vec<ChoiceOption>) -> Result<()> {
        if !self.field_type.has_options() {
            return Err(FormError::InvalidValue {
                field: self.id.to_string(),
                reason: format!("{} fields have no options", self.field_type.name()),
            });
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = options.iter().find(|o| !seen.insert(o.id.as_str())) {
            return Err(FormError::DuplicateId(dup.id.clone()));
        }
        let still_valid = self
            .value
            .as_text()
            .map_or(true, |chosen| options.iter().any(|o| o.id == chosen));
        if !still_valid {
            self.value = FieldValue::default_for(self.field_type);
        }
        self.options = options;
        Ok(())
    }

    pub(crate) fn rule_refs_mut(&mut self) -> &mut BTreeSet<RuleId> {
        &mut self.rule_refs
    }
}
