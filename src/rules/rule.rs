//! Rule value objects and condition matching

use crate::schema::{FieldId, FieldType, FieldValue, RuleId};
use serde::{Deserialize, Serialize};

/// Comparison operand of a condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Text(String),
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Operator plus comparison value, tested against the source field's value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Condition {
    Equals(ConditionValue),
    NotEquals(ConditionValue),
    Contains(String),
    IsEmpty,
    IsNotEmpty,
}

impl Condition {
    pub fn equals(value: impl Into<ConditionValue>) -> Self {
        Self::Equals(value.into())
    }

    pub fn not_equals(value: impl Into<ConditionValue>) -> Self {
        Self::NotEquals(value.into())
    }

    /// Whether `value` satisfies this condition.
    ///
    /// Text operands compare against text content or the chosen option id;
    /// boolean operands compare against checkbox state. An operand of the
    /// other kind never matches.
    pub fn matches(&self, value: &FieldValue) -> bool {
        match self {
            Self::Equals(operand) => Self::operand_equals(operand, value),
            Self::NotEquals(operand) => !Self::operand_equals(operand, value),
            Self::Contains(needle) => value.as_text().is_some_and(|t| t.contains(needle.as_str())),
            Self::IsEmpty => value.is_empty(),
            Self::IsNotEmpty => !value.is_empty(),
        }
    }

    /// Reject an operand that can never match a value of `source_type`
    pub fn check_source(&self, source_type: FieldType) -> Result<(), String> {
        let is_checkbox = source_type == FieldType::Checkbox;
        match self {
            Self::Equals(ConditionValue::Bool(_)) | Self::NotEquals(ConditionValue::Bool(_))
                if !is_checkbox =>
            {
                Err(format!("boolean operand on a {} field", source_type.name()))
            }
            Self::Equals(ConditionValue::Text(_))
            | Self::NotEquals(ConditionValue::Text(_))
            | Self::Contains(_)
                if is_checkbox =>
            {
                Err("text operand on a checkbox field".to_string())
            }
            _ => Ok(()),
        }
    }

    fn operand_equals(operand: &ConditionValue, value: &FieldValue) -> bool {
        match operand {
            ConditionValue::Text(expected) => value.as_text() == Some(expected.as_str()),
            ConditionValue::Bool(expected) => value.as_bool() == Some(*expected),
        }
    }
}

/// What a rule does to its target when the condition holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Show,
    Hide,
    Require,
    Disable,
}

/// Directed edge from a source field's value to a target field's state.
///
/// A rule only names its fields; it owns neither of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub source: FieldId,
    pub condition: Condition,
    pub target: FieldId,
    pub effect: Effect,
}

impl Rule {
    pub fn references(&self, field: FieldId) -> bool {
        self.source == field || self.target == field
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals_text() {
        let cond = Condition::equals("yes");
        assert!(cond.matches(&FieldValue::Text("yes".into())));
        assert!(!cond.matches(&FieldValue::Text("no".into())));
        assert!(cond.matches(&FieldValue::Radio(Some("yes".into()))));
        assert!(!cond.matches(&FieldValue::Radio(None)));
    }

    #[test]
    fn test_equals_bool() {
        let cond = Condition::equals(true);
        assert!(cond.matches(&FieldValue::Checkbox(true)));
        assert!(!cond.matches(&FieldValue::Checkbox(false)));
        // operand kind mismatch never matches
        assert!(!cond.matches(&FieldValue::Text("true".into())));
    }

    #[test]
    fn test_not_equals() {
        let cond = Condition::not_equals("condo");
        assert!(cond.matches(&FieldValue::Select(Some("house".into()))));
        assert!(cond.matches(&FieldValue::Select(None)));
        assert!(!cond.matches(&FieldValue::Select(Some("condo".into()))));
    }

    #[test]
    fn test_contains_and_emptiness() {
        let contains = Condition::Contains("flood".into());
        assert!(contains.matches(&FieldValue::Textarea("in flood zone AE".into())));
        assert!(!contains.matches(&FieldValue::Checkbox(true)));

        assert!(Condition::IsEmpty.matches(&FieldValue::Email(String::new())));
        assert!(Condition::IsNotEmpty.matches(&FieldValue::Checkbox(true)));
        assert!(!Condition::IsNotEmpty.matches(&FieldValue::Select(None)));
    }

    #[test]
    fn test_check_source_matches_operand_kind() {
        assert!(Condition::equals(true).check_source(FieldType::Checkbox).is_ok());
        assert!(Condition::equals("x").check_source(FieldType::Radio).is_ok());
        assert!(Condition::IsEmpty.check_source(FieldType::Checkbox).is_ok());

        let err = Condition::not_equals(false)
            .check_source(FieldType::Email)
            .unwrap_err();
        assert_eq!(err, "boolean operand on a email field");
        assert!(Condition::Contains("a".into())
            .check_source(FieldType::Checkbox)
            .is_err());
    }

    #[test]
    fn test_condition_serialization() {
        let json = serde_json::to_string(&Condition::equals("yes")).unwrap();
        assert_eq!(json, r#"{"op":"equals","value":"yes"}"#);
        let json = serde_json::to_string(&Condition::IsEmpty).unwrap();
        assert_eq!(json, r#"{"op":"is_empty"}"#);
        let parsed: Condition = serde_json::from_str(r#"{"op":"equals","value":false}"#).unwrap();
        assert_eq!(parsed, Condition::equals(false));
    }

    #[test]
    fn test_rule_references() {
        let source = FieldId::new();
        let target = FieldId::new();
        let rule = Rule {
            id: RuleId::new(1),
            source,
            condition: Condition::IsNotEmpty,
            target,
            effect: Effect::Require,
        };
        assert!(rule.references(source));
        assert!(rule.references(target));
        assert!(!rule.references(FieldId::new()));
    }
}
