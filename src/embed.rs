//! Embedding and isomorphism of structures.
//!
//! `S` embeds into `T` when some surjective map `f` from the nodes of `S` onto the
//! definitely active nodes of `T` (and possibly some maybe-active ones) satisfies
//! `S(p)(t) ⊑ T(p)(f(t))` for every predicate `p` and tuple `t`, where a node of `T` with
//! several preimages is a summary node. Every concrete store represented by `S` is then also
//! represented by `T`. This is the soundness relation the engine's tests check Blur and
//! Focus against.
//!
//! The search is a plain backtracking over node maps, intended for the small structures of
//! tests and diagnostics.

use log::trace;

use crate::kleene::Kleene;
use crate::predicate::{PredicateId, Vocabulary};
use crate::structure::Structure;
use crate::types::{Node, NodeTuple};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Mode {
    Embedding,
    Isomorphism,
}

struct Search<'a> {
    from: &'a Structure,
    to: &'a Structure,
    mode: Mode,
    predicates: Vec<PredicateId>,
    from_nodes: Vec<Node>,
    to_nodes: Vec<Node>,
    /// Image of `from_nodes[i]`, for the first `assigned` nodes.
    image: Vec<Node>,
}

impl<'a> Search<'a> {
    fn new(from: &'a Structure, to: &'a Structure, mode: Mode) -> Self {
        Search {
            from,
            to,
            mode,
            predicates: from.predicates().collect(),
            from_nodes: from.node_list(),
            to_nodes: to.node_list(),
            image: Vec::new(),
        }
    }

    fn compatible(&self, a: Kleene, b: Kleene) -> bool {
        match self.mode {
            Mode::Embedding => a.less_or_equal(b),
            Mode::Isomorphism => a == b,
        }
    }

    fn map(&self, node: Node) -> Node {
        let i = self
            .from_nodes
            .iter()
            .position(|&n| n == node)
            .unwrap_or_else(|| panic!("Node {} is not mapped", node));
        self.image[i]
    }

    /// Checks every tuple over the mapped nodes that mentions the last mapped node.
    fn consistent_with_last(&self) -> bool {
        let count = self.image.len();
        let last = self.from_nodes[count - 1];
        let mapped = &self.from_nodes[..count];
        for &p in &self.predicates {
            let arity = self.from.arity(p);
            if arity == 0 {
                continue;
            }
            for tuple in NodeTuple::all(mapped, arity) {
                if !tuple.contains(last) {
                    continue;
                }
                let image = tuple.map(|n| self.map(n));
                if !self.compatible(self.from.eval(p, tuple.nodes()), self.to.eval(p, image.nodes())) {
                    return false;
                }
            }
        }
        true
    }

    fn complete(&self) -> bool {
        match self.mode {
            // Definitely active nodes must be covered
            Mode::Embedding => self.to_nodes.iter().all(|&u| {
                self.to.eval(Vocabulary::ACTIVE, &[u]) != Kleene::True || self.image.contains(&u)
            }),
            Mode::Isomorphism => true,
        }
    }

    fn run(&mut self) -> bool {
        if self.image.len() == self.from_nodes.len() {
            return self.complete();
        }
        for k in 0..self.to_nodes.len() {
            let u = self.to_nodes[k];
            if self.image.contains(&u) {
                match self.mode {
                    Mode::Isomorphism => continue,
                    Mode::Embedding if !self.to.is_summary(u) => continue,
                    Mode::Embedding => {}
                }
            }
            self.image.push(u);
            if self.consistent_with_last() && self.run() {
                return true;
            }
            self.image.pop();
        }
        false
    }

    fn nullary_compatible(&self) -> bool {
        self.predicates
            .iter()
            .filter(|&&p| self.from.arity(p) == 0)
            .all(|&p| self.compatible(self.from.eval(p, &[]), self.to.eval(p, &[])))
    }
}

impl Structure {
    /// Returns true if `self` embeds into `other`.
    ///
    /// # Panics
    ///
    /// Panics if the structures interpret different numbers of predicates.
    pub fn embeds_into(&self, other: &Structure) -> bool {
        assert_eq!(
            self.predicate_count(),
            other.predicate_count(),
            "Structures over different vocabularies"
        );
        let mut search = Search::new(self, other, Mode::Embedding);
        let found = search.nullary_compatible() && search.run();
        trace!("embeds_into: {} -> {} nodes: {}", self.node_count(), other.node_count(), found);
        found
    }

    /// Returns true if `self` and `other` are equal up to a renaming of nodes.
    ///
    /// # Panics
    ///
    /// Panics if the structures interpret different numbers of predicates.
    pub fn is_isomorphic(&self, other: &Structure) -> bool {
        assert_eq!(
            self.predicate_count(),
            other.predicate_count(),
            "Structures over different vocabularies"
        );
        if self.node_count() != other.node_count()
            || self.predicates().any(|p| self.count_satisfying(p) != other.count_satisfying(p))
        {
            return false;
        }
        let mut search = Search::new(self, other, Mode::Isomorphism);
        search.nullary_compatible() && search.run()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::predicate::Properties;

    fn list_vocab() -> (Vocabulary, PredicateId, PredicateId) {
        let mut vocab = Vocabulary::new();
        let x = vocab.add("x", 1, Properties::abstraction()).unwrap();
        let n = vocab.add("n", 2, Properties::default()).unwrap();
        (vocab, x, n)
    }

    #[test]
    fn test_concrete_list_embeds_into_summary() {
        let (vocab, x, n) = list_vocab();
        // x -> a -> b -> c
        let mut concrete = Structure::new(&vocab);
        let a = concrete.new_node();
        let b = concrete.new_node();
        let c = concrete.new_node();
        concrete.update(x, &[a], Kleene::True);
        concrete.update(n, &[a, b], Kleene::True);
        concrete.update(n, &[b, c], Kleene::True);

        // x -> h -> t*, with unknown edges inside the summary
        let mut abs = Structure::new(&vocab);
        let h = abs.new_node();
        let t = abs.new_node();
        abs.update(x, &[h], Kleene::True);
        abs.update(n, &[h, t], Kleene::Unknown);
        abs.update(n, &[t, t], Kleene::Unknown);
        abs.update(Vocabulary::SM, &[t], Kleene::Unknown);

        assert!(concrete.embeds_into(&abs));
        assert!(!abs.embeds_into(&concrete));
        assert!(abs.embeds_into(&abs));
    }

    #[test]
    fn test_merge_onto_concrete_node_fails() {
        let (vocab, x, _) = list_vocab();
        let mut two = Structure::new(&vocab);
        let a = two.new_node();
        let b = two.new_node();
        two.update(x, &[a], Kleene::True);
        two.update(x, &[b], Kleene::True);

        let mut one = Structure::new(&vocab);
        let u = one.new_node();
        one.update(x, &[u], Kleene::True);
        assert!(!two.embeds_into(&one));

        one.update(Vocabulary::SM, &[u], Kleene::Unknown);
        assert!(two.embeds_into(&one));
    }

    #[test]
    fn test_uncovered_node_fails() {
        let (vocab, _, _) = list_vocab();
        let mut one = Structure::new(&vocab);
        one.new_node();
        let mut two = Structure::new(&vocab);
        two.new_node();
        two.new_node();
        assert!(!one.embeds_into(&two));
    }

    #[test]
    fn test_isomorphism_ignores_ids() {
        let (vocab, x, n) = list_vocab();
        let mut s1 = Structure::new(&vocab);
        let a = s1.new_node();
        let b = s1.new_node();
        s1.update(x, &[a], Kleene::True);
        s1.update(n, &[a, b], Kleene::Unknown);

        let mut s2 = Structure::new(&vocab);
        let gap = s2.new_node();
        let c = s2.new_node();
        let d = s2.new_node();
        s2.remove_node(gap);
        s2.update(x, &[d], Kleene::True);
        s2.update(n, &[d, c], Kleene::Unknown);

        assert!(s1.is_isomorphic(&s2));
        s2.update(n, &[d, c], Kleene::True);
        assert!(!s1.is_isomorphic(&s2));
    }
}
