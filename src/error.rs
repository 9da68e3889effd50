//! Error taxonomy for schema, editor and rule operations

use thiserror::Error;

/// Kind of tree node a lookup was aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Form,
    Page,
    Section,
    Field,
    Rule,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Form => "form",
            Self::Page => "page",
            Self::Section => "section",
            Self::Field => "field",
            Self::Rule => "rule",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors surfaced by the form core.
///
/// Every variant is recoverable: editor operations leave the tree untouched
/// when they return one, and the rule engine never applies a partial result.
#[derive(Error, Debug)]
pub enum FormError {
    /// Id lookup missed everywhere in the tree.
    #[error("{kind} not found: '{id}'")]
    NotFound { kind: NodeKind, id: String },

    /// Field type outside the closed vocabulary.
    #[error("invalid field type: '{0}'")]
    InvalidType(String),

    /// Field width outside the closed vocabulary.
    #[error("invalid field width: '{0}'")]
    InvalidWidth(String),

    /// Value shape does not fit the field it is assigned to.
    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// The same id appears twice in one tree.
    #[error("duplicate id: '{0}'")]
    DuplicateId(String),

    /// Rule dependencies loop back on themselves.
    #[error("rule graph contains a cycle through fields [{}]", fields.join(", "))]
    CyclicRuleGraph { fields: Vec<String> },

    /// A rule names a field that no longer exists, or `rule_refs` disagree
    /// with the rule table.
    #[error("rule {rule} references missing field '{field}'")]
    OrphanRuleReference { rule: String, field: String },

    /// Document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FormError {
    pub fn not_found(kind: NodeKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T, E = FormError> = std::result::Result<T, E>;
