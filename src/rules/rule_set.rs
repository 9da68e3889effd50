//! Rule table with adjacency indexes by source and target field

use super::rule::{Condition, Effect, Rule};
use crate::error::FormError;
use crate::schema::{FieldId, RuleId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Arena of rules keyed by id.
///
/// `by_source` and `by_target` are derived from `rules` and kept in step on
/// every insert and remove. The serialized form is the plain rule list in id
/// order; indexes are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Rule>", into = "Vec<Rule>")]
pub struct RuleSet {
    rules: BTreeMap<RuleId, Rule>,
    by_source: BTreeMap<FieldId, BTreeSet<RuleId>>,
    by_target: BTreeMap<FieldId, BTreeSet<RuleId>>,
    next_id: RuleId,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: BTreeMap::new(),
            by_source: BTreeMap::new(),
            by_target: BTreeMap::new(),
            next_id: RuleId::new(1),
        }
    }
}

// Allocation state is not part of a rule set's identity.
impl PartialEq for RuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.rules == other.rules
    }
}

impl RuleSet {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// All rules in id order
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Rules whose target is `field`, in id order
    pub fn targeting(&self, field: FieldId) -> impl Iterator<Item = &Rule> {
        self.indexed(&self.by_target, field)
    }

    /// Rules whose source is `field`, in id order
    pub fn sourced_from(&self, field: FieldId) -> impl Iterator<Item = &Rule> {
        self.indexed(&self.by_source, field)
    }

    /// Ids of rules targeting `field`
    pub fn target_ids(&self, field: FieldId) -> BTreeSet<RuleId> {
        self.by_target.get(&field).cloned().unwrap_or_default()
    }

    /// Ids of rules naming `field` at either end
    pub fn referencing(&self, field: FieldId) -> BTreeSet<RuleId> {
        let mut ids = self.target_ids(field);
        if let Some(sourced) = self.by_source.get(&field) {
            ids.extend(sourced.iter().copied());
        }
        ids
    }

    /// Source fields with at least one outgoing rule
    pub fn source_fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.by_source.keys().copied()
    }

    fn indexed<'a>(
        &'a self,
        index: &'a BTreeMap<FieldId, BTreeSet<RuleId>>,
        field: FieldId,
    ) -> impl Iterator<Item = &'a Rule> + 'a {
        index
            .get(&field)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rules.get(id))
    }

    /// Allocate an id and insert. Endpoint and cycle checks belong to the caller.
    pub(crate) fn insert(
        &mut self,
        source: FieldId,
        condition: Condition,
        target: FieldId,
        effect: Effect,
    ) -> RuleId {
        let id = self.next_id;
        self.next_id = id.next();
        self.index(Rule {
            id,
            source,
            condition,
            target,
            effect,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: RuleId) -> Option<Rule> {
        let rule = self.rules.remove(&id)?;
        Self::unindex(&mut self.by_source, rule.source, id);
        Self::unindex(&mut self.by_target, rule.target, id);
        Some(rule)
    }

    /// Remove every rule naming `field`, returning them in id order
    pub(crate) fn remove_referencing(&mut self, field: FieldId) -> Vec<Rule> {
        self.referencing(field)
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    fn index(&mut self, rule: Rule) {
        self.by_source.entry(rule.source).or_default().insert(rule.id);
        self.by_target.entry(rule.target).or_default().insert(rule.id);
        if rule.id >= self.next_id {
            self.next_id = rule.id.next();
        }
        self.rules.insert(rule.id, rule);
    }

    fn unindex(index: &mut BTreeMap<FieldId, BTreeSet<RuleId>>, field: FieldId, id: RuleId) {
        if let Some(ids) = index.get_mut(&field) {
            ids.remove(&id);
            if ids.is_empty() {
                index.remove(&field);
            }
        }
    }
}

impl TryFrom<Vec<Rule>> for RuleSet {
    type Error = FormError;

    fn try_from(rules: Vec<Rule>) -> Result<Self, Self::Error> {
        let mut set = RuleSet::default();
        for rule in rules {
            if set.rules.contains_key(&rule.id) {
                return Err(FormError::DuplicateId(rule.id.to_string()));
            }
            set.index(rule);
        }
        Ok(set)
    }
}

impl From<RuleSet> for Vec<Rule> {
    fn from(set: RuleSet) -> Self {
        set.rules.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(rules: impl Iterator<Item = RuleId>) -> Vec<u64> {
        rules.map(|id| id.get()).collect()
    }

    #[test]
    fn test_insert_allocates_ids_in_order() {
        let (a, b) = (FieldId::new(), FieldId::new());
        let mut set = RuleSet::default();
        let first = set.insert(a, Condition::IsEmpty, b, Effect::Hide);
        let second = set.insert(a, Condition::IsNotEmpty, b, Effect::Show);
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_indexes_track_endpoints() {
        let (a, b, c) = (FieldId::new(), FieldId::new(), FieldId::new());
        let mut set = RuleSet::default();
        set.insert(a, Condition::IsEmpty, b, Effect::Hide);
        set.insert(b, Condition::IsEmpty, c, Effect::Require);
        set.insert(a, Condition::IsEmpty, c, Effect::Disable);

        assert_eq!(ids(set.targeting(c).map(|r| r.id)), vec![2, 3]);
        assert_eq!(ids(set.sourced_from(a).map(|r| r.id)), vec![1, 3]);
        assert_eq!(ids(set.referencing(b).into_iter()), vec![1, 2]);
        assert_eq!(set.source_fields().count(), 2);
    }

    #[test]
    fn test_remove_cleans_indexes() {
        let (a, b) = (FieldId::new(), FieldId::new());
        let mut set = RuleSet::default();
        let id = set.insert(a, Condition::IsEmpty, b, Effect::Hide);
        assert!(set.remove(id).is_some());
        assert!(set.remove(id).is_none());
        assert!(set.is_empty());
        assert_eq!(set.targeting(b).count(), 0);
        assert_eq!(set.source_fields().count(), 0);
    }

    #[test]
    fn test_remove_referencing_takes_both_directions() {
        let (a, b, c) = (FieldId::new(), FieldId::new(), FieldId::new());
        let mut set = RuleSet::default();
        set.insert(a, Condition::IsEmpty, b, Effect::Hide);
        set.insert(b, Condition::IsEmpty, c, Effect::Hide);
        set.insert(a, Condition::IsEmpty, c, Effect::Hide);

        let removed = set.remove_referencing(b);
        assert_eq!(removed.len(), 2);
        assert_eq!(ids(set.iter().map(|r| r.id)), vec![3]);
    }

    #[test]
    fn test_serializes_as_list_and_rebuilds_indexes() {
        let (a, b) = (FieldId::new(), FieldId::new());
        let mut set = RuleSet::default();
        set.insert(a, Condition::equals("yes"), b, Effect::Show);

        let json = serde_json::to_string(&set).unwrap();
        assert!(json.starts_with('['));
        let mut parsed: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);
        assert_eq!(parsed.targeting(b).count(), 1);

        // allocation continues past loaded ids
        let next = parsed.insert(b, Condition::IsEmpty, a, Effect::Hide);
        assert_eq!(next.get(), 2);
    }

    #[test]
    fn test_duplicate_rule_ids_rejected_on_load() {
        let (a, b) = (FieldId::new(), FieldId::new());
        let rule = Rule {
            id: RuleId::new(4),
            source: a,
            condition: Condition::IsEmpty,
            target: b,
            effect: Effect::Hide,
        };
        let result = RuleSet::try_from(vec![rule.clone(), rule]);
        assert!(matches!(result, Err(FormError::DuplicateId(_))));
    }
}
