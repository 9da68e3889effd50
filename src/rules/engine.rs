//! Effective-state evaluation over the current field values

use super::graph::RuleGraph;
use super::rule::Effect;
use crate::error::{FormError, NodeKind, Result};
use crate::schema::{Field, FieldId, FieldValue, Form};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Derived state of a field after rules are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveState {
    VisibleEnabled,
    VisibleRequired,
    VisibleDisabled,
    Hidden,
}

impl EffectiveState {
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Hidden)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::VisibleEnabled => "Visible",
            Self::VisibleRequired => "Required",
            Self::VisibleDisabled => "Disabled",
            Self::Hidden => "Hidden",
        }
    }
}

/// What a hidden field contributes when it is the source of another rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenValuePolicy {
    /// The stale stored value keeps driving downstream rules
    #[default]
    Retain,
    /// A hidden field reads as its type's empty value for downstream rules
    ResetOnHide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluationOptions {
    #[serde(default)]
    pub hidden_values: HiddenValuePolicy,
}

/// Interaction axis, orthogonal to visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interaction {
    Enabled,
    Required,
    Disabled,
}

/// Per-field evaluation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldState {
    pub state: EffectiveState,
    /// Value this field presents as a rule source
    pub effective_value: FieldValue,
}

/// Complete evaluation of one form; never partially filled
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Evaluation {
    fields: BTreeMap<FieldId, FieldState>,
}

impl Evaluation {
    pub fn state(&self, field: FieldId) -> Option<EffectiveState> {
        self.fields.get(&field).map(|f| f.state)
    }

    pub fn effective_value(&self, field: FieldId) -> Option<&FieldValue> {
        self.fields.get(&field).map(|f| &f.effective_value)
    }

    pub fn is_visible(&self, field: FieldId) -> bool {
        self.state(field).is_some_and(|s| s.is_visible())
    }

    pub fn hidden_fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.fields
            .iter()
            .filter(|(_, f)| !f.state.is_visible())
            .map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &FieldState)> {
        self.fields.iter().map(|(id, f)| (*id, f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Derive every field's effective state from its value snapshot and the rules.
///
/// Fields are visited in dependency order, so a rule always reads the
/// already-derived value of its source. Rules targeting one field apply in
/// id order and only when their condition is met; within each axis the last
/// one applied wins. A field targeted by any `show` rule starts hidden, so it
/// appears only while one of those conditions holds.
pub fn evaluate(form: &Form, options: &EvaluationOptions) -> Result<Evaluation> {
    let by_id: HashMap<FieldId, &Field> = form.fields().map(|f| (f.id(), f)).collect();
    for rule in form.rules().iter() {
        for endpoint in [rule.source, rule.target] {
            if !by_id.contains_key(&endpoint) {
                tracing::warn!(form = %form.id(), rule = %rule.id, "rule names a missing field");
                return Err(FormError::OrphanRuleReference {
                    rule: rule.id.to_string(),
                    field: endpoint.to_string(),
                });
            }
        }
    }

    let document_order: Vec<FieldId> = form.fields().map(|f| f.id()).collect();
    let graph = RuleGraph::from_rules(form.rules());
    let order = graph.topological_order(&document_order).inspect_err(|err| {
        tracing::warn!(form = %form.id(), "rule evaluation aborted: {err}");
    })?;

    let mut fields: BTreeMap<FieldId, FieldState> = BTreeMap::new();
    for id in order {
        let field = by_id
            .get(&id)
            .copied()
            .ok_or_else(|| FormError::not_found(NodeKind::Field, id))?;
        let mut visible = !form
            .rules()
            .targeting(id)
            .any(|rule| rule.effect == Effect::Show);
        let mut interaction = if field.is_required_by_default() {
            Interaction::Required
        } else {
            Interaction::Enabled
        };

        for rule in form.rules().targeting(id) {
            let source = fields
                .get(&rule.source)
                .ok_or_else(|| FormError::OrphanRuleReference {
                    rule: rule.id.to_string(),
                    field: rule.source.to_string(),
                })?;
            if !rule.condition.matches(&source.effective_value) {
                continue;
            }
            match rule.effect {
                Effect::Show => visible = true,
                Effect::Hide => visible = false,
                Effect::Require => interaction = Interaction::Required,
                Effect::Disable => interaction = Interaction::Disabled,
            }
        }

        let state = match (visible, interaction) {
            (false, _) => EffectiveState::Hidden,
            (true, Interaction::Enabled) => EffectiveState::VisibleEnabled,
            (true, Interaction::Required) => EffectiveState::VisibleRequired,
            (true, Interaction::Disabled) => EffectiveState::VisibleDisabled,
        };
        let effective_value = match (state, options.hidden_values) {
            (EffectiveState::Hidden, HiddenValuePolicy::ResetOnHide) => {
                FieldValue::default_for(field.field_type())
            }
            _ => field.value().clone(),
        };
        fields.insert(
            id,
            FieldState {
                state,
                effective_value,
            },
        );
    }

    tracing::debug!(
        form = %form.id(),
        fields = fields.len(),
        rules = form.rules().len(),
        "evaluated rules"
    );
    Ok(Evaluation { fields })
}
