//! Value validation against field validators and effective requiredness

use crate::rules::{EffectiveState, Evaluation};
use crate::schema::{Field, FieldId, FieldValue, Form, Validator};
use serde::Serialize;

/// Why a field's current value is not acceptable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    TooShort { min: usize },
    TooLong { max: usize },
    NotAnEmail,
}

impl IssueKind {
    pub fn message(&self) -> String {
        match self {
            Self::Missing => "This field is required".to_string(),
            Self::TooShort { min } => format!("Must be at least {min} characters"),
            Self::TooLong { max } => format!("Must be at most {max} characters"),
            Self::NotAnEmail => "Must be a valid email address".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field_id: FieldId,
    pub kind: IssueKind,
}

/// Check every field that the evaluation leaves visible and enabled.
///
/// Hidden and disabled fields keep their values but are never reported.
/// Requiredness comes from the effective state, so a `require` rule makes an
/// empty field fail just like a `required` validator does.
pub fn validate(form: &Form, evaluation: &Evaluation) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for field in form.fields() {
        let required = match evaluation.state(field.id()) {
            Some(EffectiveState::Hidden | EffectiveState::VisibleDisabled) => continue,
            Some(EffectiveState::VisibleRequired) => true,
            Some(EffectiveState::VisibleEnabled) => false,
            None => field.is_required_by_default(),
        };
        check_field(field, required, &mut issues);
    }
    issues
}

fn check_field(field: &Field, required: bool, issues: &mut Vec<ValidationIssue>) {
    let value = field.value();
    let mut report = |kind| {
        issues.push(ValidationIssue {
            field_id: field.id(),
            kind,
        })
    };

    if value.is_empty() {
        if required {
            report(IssueKind::Missing);
        }
        // length and format checks only apply to something that was entered
        return;
    }

    let text = value.as_text().unwrap_or_default();
    let len = text.chars().count();
    for validator in field.validators() {
        match validator {
            Validator::Required => {}
            Validator::MinLength { len: min } if len < *min => {
                report(IssueKind::TooShort { min: *min })
            }
            Validator::MaxLength { len: max } if len > *max => {
                report(IssueKind::TooLong { max: *max })
            }
            Validator::EmailFormat if !looks_like_email(text) => report(IssueKind::NotAnEmail),
            _ => {}
        }
    }
    if let FieldValue::Email(address) = value {
        if !field.validators().contains(&Validator::EmailFormat) && !looks_like_email(address) {
            report(IssueKind::NotAnEmail);
        }
    }
}

/// `local@domain.tld` with no whitespace
fn looks_like_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !text.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.contains('@'))
}
