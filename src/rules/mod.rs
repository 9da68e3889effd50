//! Conditional rule layer
//!
//! Rules are directed edges from a source field's value to a target field's
//! derived state. The table keeps explicit adjacency indexes, the graph
//! orders fields by dependency, and the engine derives effective states.

mod engine;
mod graph;
mod rule;
mod rule_set;

pub use engine::{
    evaluate, EffectiveState, Evaluation, EvaluationOptions, FieldState, HiddenValuePolicy,
};
pub use graph::RuleGraph;
pub use rule::{Condition, ConditionValue, Effect, Rule};
pub use rule_set::RuleSet;
