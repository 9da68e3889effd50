//! Field dependency graph induced by rules

use super::rule_set::RuleSet;
use crate::error::{FormError, Result};
use crate::schema::FieldId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Adjacency view of the rule table at field granularity.
///
/// An edge `a -> b` exists when at least one rule has source `a` and target
/// `b`; parallel rules collapse into one edge.
#[derive(Debug, Clone, Default)]
pub struct RuleGraph {
    successors: BTreeMap<FieldId, BTreeSet<FieldId>>,
    predecessors: BTreeMap<FieldId, BTreeSet<FieldId>>,
}

impl RuleGraph {
    pub fn from_rules(rules: &RuleSet) -> Self {
        let mut graph = Self::default();
        for rule in rules.iter() {
            graph.add_edge(rule.source, rule.target);
        }
        graph
    }

    pub fn add_edge(&mut self, source: FieldId, target: FieldId) {
        self.successors.entry(source).or_default().insert(target);
        self.predecessors.entry(target).or_default().insert(source);
    }

    pub fn successors(&self, field: FieldId) -> impl Iterator<Item = FieldId> + '_ {
        self.successors.get(&field).into_iter().flatten().copied()
    }

    pub fn edge_count(&self) -> usize {
        self.successors.values().map(BTreeSet::len).sum()
    }

    /// Whether adding `source -> target` would close a cycle
    pub fn would_cycle(&self, source: FieldId, target: FieldId) -> bool {
        source == target || self.reaches(target, source)
    }

    fn reaches(&self, from: FieldId, to: FieldId) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(field) = queue.pop_front() {
            if field == to {
                return true;
            }
            if seen.insert(field) {
                queue.extend(self.successors(field));
            }
        }
        false
    }

    /// Order `fields` so every rule source precedes its targets.
    ///
    /// Kahn's algorithm; among fields that are ready at the same time the one
    /// earlier in `fields` goes first, so the result is deterministic.
    /// Graph nodes missing from `fields` are appended after it.
    pub fn topological_order(&self, fields: &[FieldId]) -> Result<Vec<FieldId>> {
        let mut nodes: Vec<FieldId> = fields.to_vec();
        let listed: HashSet<FieldId> = fields.iter().copied().collect();
        let extra: BTreeSet<FieldId> = self
            .successors
            .keys()
            .chain(self.predecessors.keys())
            .filter(|f| !listed.contains(f))
            .copied()
            .collect();
        nodes.extend(extra);

        let position: HashMap<FieldId, usize> =
            nodes.iter().enumerate().map(|(i, f)| (*f, i)).collect();
        let mut in_degree: HashMap<FieldId, usize> = nodes
            .iter()
            .map(|f| (*f, self.predecessors.get(f).map_or(0, BTreeSet::len)))
            .collect();

        let mut ready: BTreeSet<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, f)| in_degree[*f] == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        while let Some(next) = ready.pop_first() {
            let field = nodes[next];
            order.push(field);
            for succ in self.successors(field) {
                if let Some(degree) = in_degree.get_mut(&succ) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(position[&succ]);
                    }
                }
            }
        }

        if order.len() < nodes.len() {
            let done: HashSet<FieldId> = order.into_iter().collect();
            let remaining: Vec<FieldId> = nodes.into_iter().filter(|f| !done.contains(f)).collect();
            return Err(FormError::CyclicRuleGraph {
                fields: self
                    .find_cycle(&remaining)
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            });
        }
        Ok(order)
    }

    /// Extract one cycle from the nodes Kahn's algorithm could not order.
    ///
    /// Every such node has a predecessor among them, so walking predecessors
    /// must revisit a node.
    fn find_cycle(&self, remaining: &[FieldId]) -> Vec<FieldId> {
        let pending: HashSet<FieldId> = remaining.iter().copied().collect();
        let Some(&start) = remaining.first() else {
            return Vec::new();
        };
        let mut walk = vec![start];
        let mut seen_at: HashMap<FieldId, usize> = HashMap::from([(start, 0)]);
        let mut current = start;
        loop {
            let pred = self
                .predecessors
                .get(&current)
                .into_iter()
                .flatten()
                .find(|p| pending.contains(p))
                .copied();
            let Some(pred) = pred else {
                return walk;
            };
            if let Some(&at) = seen_at.get(&pred) {
                let mut cycle = walk.split_off(at);
                cycle.reverse();
                return cycle;
            }
            seen_at.insert(pred, walk.len());
            walk.push(pred);
            current = pred;
        }
    }
}
