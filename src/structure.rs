//! Three-valued logical structures.
//!
//! A [`Structure`] (TVS) is a finite universe of [`Node`]s plus, for every predicate of the
//! vocabulary it was created for, a total interpretation from tuples of matching arity to
//! [`Kleene`] values. Only non-false entries are stored; absent tuples read as `0`.
//!
//! Structures are plain owned data: cloning gives an independent copy, and the engine's
//! operators either mutate a structure in place (Blur, Coerce) or allocate new ones (Focus).
//!
//! # Modified predicates
//!
//! Every mutation records which predicates changed. Coerce uses this set to restrict its
//! first round of checks to constraints that could have been breached, and clears it once
//! the structure is known to satisfy all constraints.

use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use crate::kleene::Kleene;
use crate::predicate::{PredicateId, Vocabulary};
use crate::types::{Node, NodeTuple};

#[derive(Debug, Clone)]
struct Table {
    arity: usize,
    values: BTreeMap<NodeTuple, Kleene>,
}

impl Table {
    fn new(arity: usize) -> Self {
        Table {
            arity,
            values: BTreeMap::new(),
        }
    }
}

/// A three-valued logical structure.
#[derive(Debug, Clone)]
pub struct Structure {
    nodes: BTreeSet<Node>,
    next_id: u32,
    tables: Vec<Table>,
    modified: BTreeSet<PredicateId>,
}

impl Structure {
    /// Creates an empty structure interpreting every predicate of `vocab`.
    pub fn new(vocab: &Vocabulary) -> Self {
        Structure {
            nodes: BTreeSet::new(),
            next_id: 0,
            tables: vocab.iter().map(|p| Table::new(p.arity())).collect(),
            modified: BTreeSet::new(),
        }
    }

    fn table(&self, predicate: PredicateId) -> &Table {
        assert!(
            predicate.index() < self.tables.len(),
            "Predicate {} is not interpreted by this structure",
            predicate
        );
        &self.tables[predicate.index()]
    }

    fn table_mut(&mut self, predicate: PredicateId) -> &mut Table {
        assert!(
            predicate.index() < self.tables.len(),
            "Predicate {} is not interpreted by this structure",
            predicate
        );
        &mut self.tables[predicate.index()]
    }

    /// Number of interpreted predicates.
    pub fn predicate_count(&self) -> usize {
        self.tables.len()
    }

    /// Arity of an interpreted predicate.
    pub fn arity(&self, predicate: PredicateId) -> usize {
        self.table(predicate).arity
    }

    /// Interpreted predicates, in vocabulary order.
    pub fn predicates(&self) -> impl Iterator<Item = PredicateId> {
        (0..self.tables.len()).map(Self::id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.iter().copied()
    }

    /// The universe as a vector, in ascending id order.
    pub fn node_list(&self) -> Vec<Node> {
        self.nodes.iter().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: Node) -> bool {
        self.nodes.contains(&node)
    }

    /// Adds a fresh node with `active = 1` and `sm = 0`.
    pub fn new_node(&mut self) -> Node {
        let node = Node::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(node);
        self.update(Vocabulary::ACTIVE, &[node], Kleene::True);
        trace!("new_node -> {}", node);
        node
    }

    /// Removes a node together with every tuple mentioning it.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not in the universe.
    pub fn remove_node(&mut self, node: Node) {
        assert!(self.nodes.remove(&node), "Node {} is not in the universe", node);
        for (index, table) in self.tables.iter_mut().enumerate() {
            if table.arity == 0 {
                continue;
            }
            let before = table.values.len();
            table.values.retain(|tuple, _| !tuple.contains(node));
            if table.values.len() != before {
                self.modified.insert(Self::id(index));
            }
        }
        self.modified.insert(Vocabulary::ACTIVE);
    }

    /// Bifurcates `node`: adds a new node whose every tuple copies the value of the
    /// corresponding tuple of `node` (including `sm` and self-loops).
    ///
    /// # Panics
    ///
    /// Panics if `node` is not in the universe.
    pub fn duplicate_node(&mut self, node: Node) -> Node {
        assert!(self.contains(node), "Node {} is not in the universe", node);
        let copy = Node::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(copy);

        for (index, table) in self.tables.iter_mut().enumerate() {
            if table.arity == 0 {
                continue;
            }
            let mut added = Vec::new();
            for (tuple, &value) in table.values.iter() {
                let positions: Vec<usize> = (0..tuple.arity()).filter(|&i| tuple[i] == node).collect();
                // Every non-empty subset of occurrences may refer to the copy
                for mask in 1u64..(1u64 << positions.len()) {
                    let mut nodes = tuple.nodes().to_vec();
                    for (bit, &pos) in positions.iter().enumerate() {
                        if mask & (1 << bit) != 0 {
                            nodes[pos] = copy;
                        }
                    }
                    added.push((NodeTuple::new(nodes), value));
                }
            }
            if !added.is_empty() {
                self.modified.insert(Self::id(index));
            }
            table.values.extend(added);
        }
        self.modified.insert(Vocabulary::ACTIVE);
        trace!("duplicate_node({}) -> {}", node, copy);
        copy
    }

    /// Merges `nodes` into the first one and returns it.
    ///
    /// Every tuple over the merged universe takes the join of the values of all tuples it
    /// stands for, so merging only loses precision. The representative becomes a summary
    /// node (`sm = 1/2`) when more than one node is merged.
    ///
    /// # Panics
    ///
    /// Panics if `nodes` is empty or mentions a node outside the universe.
    pub fn merge_nodes(&mut self, nodes: &[Node]) -> Node {
        assert!(!nodes.is_empty(), "Cannot merge an empty set of nodes");
        for &n in nodes {
            assert!(self.contains(n), "Node {} is not in the universe", n);
        }
        let repr = nodes[0];
        let merged: BTreeSet<Node> = nodes.iter().copied().collect();
        if merged.len() == 1 {
            return repr;
        }
        trace!("merge_nodes({:?}) -> {}", nodes, repr);

        let project = |n: Node| if merged.contains(&n) { repr } else { n };
        for (index, table) in self.tables.iter_mut().enumerate() {
            if table.arity == 0 {
                continue;
            }
            let mut joined: BTreeMap<NodeTuple, Kleene> = BTreeMap::new();
            // Image tuples with the number of their stored preimages
            let mut touched: BTreeMap<NodeTuple, usize> = BTreeMap::new();
            for (tuple, &value) in table.values.iter() {
                let image = tuple.map(project);
                if !image.contains(repr) {
                    joined.insert(image, value);
                    continue;
                }
                *touched.entry(image.clone()).or_insert(0) += 1;
                joined
                    .entry(image)
                    .and_modify(|v| *v = Kleene::join(*v, value))
                    .or_insert(value);
            }
            // A touched image tuple with a false (absent) preimage joins to 1/2
            for (image, present) in touched {
                let preimages = preimage_count(&image, repr, merged.len());
                if present < preimages {
                    if let Some(v) = joined.get_mut(&image) {
                        *v = Kleene::join(*v, Kleene::False);
                    }
                }
            }
            joined.retain(|_, v| *v != Kleene::False);
            if joined != table.values {
                self.modified.insert(Self::id(index));
            }
            table.values = joined;
        }
        for n in &merged {
            if *n != repr {
                self.nodes.remove(n);
            }
        }
        self.update(Vocabulary::SM, &[repr], Kleene::Unknown);
        self.modified.insert(Vocabulary::ACTIVE);
        repr
    }

    fn id(index: usize) -> PredicateId {
        // Tables are created in vocabulary order
        PredicateId::from_index(index)
    }

    /// Returns the value of `predicate` on `tuple`.
    ///
    /// # Panics
    ///
    /// Panics if the tuple's arity does not match the predicate's arity.
    pub fn eval(&self, predicate: PredicateId, tuple: &[Node]) -> Kleene {
        let table = self.table(predicate);
        assert_eq!(
            table.arity,
            tuple.len(),
            "Arity mismatch for predicate {}: expected {}, got {}",
            predicate,
            table.arity,
            tuple.len()
        );
        debug_assert!(
            tuple.iter().all(|n| self.nodes.contains(n)),
            "Tuple {:?} mentions a node outside the universe",
            tuple
        );
        table.values.get(tuple).copied().unwrap_or(Kleene::False)
    }

    /// Sets the value of `predicate` on `tuple`.
    ///
    /// # Panics
    ///
    /// Panics on an arity mismatch, or if the tuple mentions a node outside the universe.
    pub fn update(&mut self, predicate: PredicateId, tuple: &[Node], value: Kleene) {
        for n in tuple {
            assert!(self.nodes.contains(n), "Node {} is not in the universe", n);
        }
        let table = self.table_mut(predicate);
        assert_eq!(
            table.arity,
            tuple.len(),
            "Arity mismatch for predicate {}: expected {}, got {}",
            predicate,
            table.arity,
            tuple.len()
        );
        let changed = if value == Kleene::False {
            table.values.remove(tuple).is_some()
        } else {
            table.values.insert(NodeTuple::from(tuple), value) != Some(value)
        };
        if changed {
            self.modified.insert(predicate);
        }
    }

    /// Sets every entry of `predicate` to `0`.
    pub fn clear_predicate(&mut self, predicate: PredicateId) {
        let table = self.table_mut(predicate);
        if !table.values.is_empty() {
            table.values.clear();
            self.modified.insert(predicate);
        }
    }

    /// Returns true if `node` is a summary node (`sm = 1/2`).
    pub fn is_summary(&self, node: Node) -> bool {
        self.eval(Vocabulary::SM, &[node]) == Kleene::Unknown
    }

    /// Non-false entries of `predicate`, in tuple order.
    pub fn satisfying(&self, predicate: PredicateId) -> impl Iterator<Item = (&NodeTuple, Kleene)> {
        self.table(predicate).values.iter().map(|(t, &v)| (t, v))
    }

    pub fn count_satisfying(&self, predicate: PredicateId) -> usize {
        self.table(predicate).values.len()
    }

    /// Predicates changed since the last [`clear_modified`][Self::clear_modified].
    pub fn modified(&self) -> &BTreeSet<PredicateId> {
        &self.modified
    }

    pub fn is_modified(&self, predicate: PredicateId) -> bool {
        self.modified.contains(&predicate)
    }

    pub fn mark_modified(&mut self, predicate: PredicateId) {
        self.modified.insert(predicate);
    }

    pub fn mark_all_modified(&mut self) {
        self.modified = (0..self.tables.len()).map(Self::id).collect();
    }

    pub fn clear_modified(&mut self) {
        self.modified.clear();
    }
}

/// Number of tuples mapping onto `image` when `size` nodes are merged into `repr`.
fn preimage_count(image: &NodeTuple, repr: Node, size: usize) -> usize {
    let occurrences = image.nodes().iter().filter(|&&n| n == repr).count();
    size.pow(occurrences as u32)
}

impl PartialEq for Structure {
    /// Structures are equal when they have the same universe and interpretation.
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
            && self.tables.len() == other.tables.len()
            && self.tables.iter().zip(&other.tables).all(|(a, b)| a.values == b.values)
    }
}

impl Eq for Structure {}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::predicate::Properties;

    fn setup() -> (Vocabulary, PredicateId, PredicateId) {
        let mut vocab = Vocabulary::new();
        let x = vocab.add("x", 1, Properties::abstraction()).unwrap();
        let n = vocab.add("n", 2, Properties::default()).unwrap();
        (vocab, x, n)
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Structure>();
        assert_send_sync::<crate::context::AnalysisContext>();
    }

    #[test]
    fn test_new_node() {
        let (vocab, _, _) = setup();
        let mut s = Structure::new(&vocab);
        let a = s.new_node();
        let b = s.new_node();
        assert_ne!(a, b);
        assert_eq!(s.node_count(), 2);
        assert_eq!(s.eval(Vocabulary::ACTIVE, &[a]), Kleene::True);
        assert_eq!(s.eval(Vocabulary::SM, &[a]), Kleene::False);
        assert!(s.is_modified(Vocabulary::ACTIVE));
    }

    #[test]
    fn test_update_and_eval() {
        let (vocab, x, n) = setup();
        let mut s = Structure::new(&vocab);
        let a = s.new_node();
        let b = s.new_node();
        s.clear_modified();

        s.update(n, &[a, b], Kleene::Unknown);
        assert_eq!(s.eval(n, &[a, b]), Kleene::Unknown);
        assert_eq!(s.eval(n, &[b, a]), Kleene::False);
        assert!(s.is_modified(n));
        assert!(!s.is_modified(x));

        s.update(n, &[a, b], Kleene::False);
        assert_eq!(s.count_satisfying(n), 0);
    }

    #[test]
    #[should_panic(expected = "Arity mismatch")]
    fn test_arity_mismatch_panics() {
        let (vocab, x, _) = setup();
        let mut s = Structure::new(&vocab);
        let a = s.new_node();
        s.update(x, &[a, a], Kleene::True);
    }

    #[test]
    #[should_panic(expected = "is not in the universe")]
    fn test_update_inactive_node_panics() {
        let (vocab, x, _) = setup();
        let mut s = Structure::new(&vocab);
        let a = s.new_node();
        s.remove_node(a);
        s.update(x, &[a], Kleene::True);
    }

    #[test]
    fn test_remove_node() {
        let (vocab, x, n) = setup();
        let mut s = Structure::new(&vocab);
        let a = s.new_node();
        let b = s.new_node();
        s.update(x, &[a], Kleene::True);
        s.update(n, &[a, b], Kleene::True);
        s.update(n, &[b, b], Kleene::True);
        s.remove_node(a);
        assert_eq!(s.node_list(), vec![b]);
        assert_eq!(s.count_satisfying(x), 0);
        assert_eq!(s.count_satisfying(n), 1);
    }

    #[test]
    fn test_duplicate_node_copies_tuples() {
        let (vocab, x, n) = setup();
        let mut s = Structure::new(&vocab);
        let a = s.new_node();
        let b = s.new_node();
        s.update(Vocabulary::SM, &[a], Kleene::Unknown);
        s.update(x, &[a], Kleene::Unknown);
        s.update(n, &[a, a], Kleene::Unknown);
        s.update(n, &[b, a], Kleene::True);

        let c = s.duplicate_node(a);
        assert_eq!(s.node_count(), 3);
        assert_eq!(s.eval(x, &[c]), Kleene::Unknown);
        assert_eq!(s.eval(Vocabulary::SM, &[c]), Kleene::Unknown);
        assert_eq!(s.eval(Vocabulary::ACTIVE, &[c]), Kleene::True);
        assert_eq!(s.eval(n, &[c, c]), Kleene::Unknown);
        assert_eq!(s.eval(n, &[a, c]), Kleene::Unknown);
        assert_eq!(s.eval(n, &[c, a]), Kleene::Unknown);
        assert_eq!(s.eval(n, &[b, c]), Kleene::True);
        assert_eq!(s.eval(n, &[c, b]), Kleene::False);
    }

    #[test]
    fn test_merge_nodes_joins() {
        let (vocab, x, n) = setup();
        let mut s = Structure::new(&vocab);
        let a = s.new_node();
        let b = s.new_node();
        let c = s.new_node();
        s.update(x, &[a], Kleene::True);
        s.update(x, &[b], Kleene::True);
        s.update(n, &[a, b], Kleene::True);
        s.update(n, &[c, a], Kleene::True);
        s.update(n, &[c, b], Kleene::True);

        let r = s.merge_nodes(&[a, b]);
        assert_eq!(r, a);
        assert_eq!(s.node_list(), vec![a, c]);
        assert_eq!(s.eval(x, &[a]), Kleene::True);
        assert_eq!(s.eval(Vocabulary::SM, &[a]), Kleene::Unknown);
        // n(a,b)=1 but n(a,a)=n(b,b)=n(b,a)=0
        assert_eq!(s.eval(n, &[a, a]), Kleene::Unknown);
        // both c->a and c->b were 1
        assert_eq!(s.eval(n, &[c, a]), Kleene::True);
        assert_eq!(s.eval(n, &[a, c]), Kleene::False);
    }

    #[test]
    fn test_merge_counts_preimages() {
        let (vocab, x, n) = setup();
        let mut s = Structure::new(&vocab);
        let nodes: Vec<Node> = (0..3).map(|_| s.new_node()).collect();
        let outside = s.new_node();
        for &u in &nodes {
            s.update(x, &[u], Kleene::True);
            s.update(n, &[u, outside], Kleene::True);
            for &w in &nodes {
                s.update(n, &[u, w], Kleene::True);
            }
        }
        let mut partial = s.clone();
        partial.update(n, &[nodes[2], nodes[1]], Kleene::False);
        partial.update(n, &[nodes[1], outside], Kleene::False);

        // All 3 (resp. 9) preimages present
        let r = s.merge_nodes(&nodes);
        assert_eq!(s.eval(x, &[r]), Kleene::True);
        assert_eq!(s.eval(n, &[r, r]), Kleene::True);
        assert_eq!(s.eval(n, &[r, outside]), Kleene::True);

        let r = partial.merge_nodes(&nodes);
        assert_eq!(partial.eval(x, &[r]), Kleene::True);
        assert_eq!(partial.eval(n, &[r, r]), Kleene::Unknown);
        assert_eq!(partial.eval(n, &[r, outside]), Kleene::Unknown);
        assert_eq!(partial.eval(n, &[outside, r]), Kleene::False);
    }

    #[test]
    fn test_equality_ignores_modified() {
        let (vocab, x, _) = setup();
        let mut s = Structure::new(&vocab);
        let a = s.new_node();
        s.update(x, &[a], Kleene::True);
        let mut t = s.clone();
        t.clear_modified();
        assert_eq!(s, t);
        t.update(x, &[a], Kleene::Unknown);
        assert_ne!(s, t);
    }
}
