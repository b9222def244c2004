//! Canonical abstraction.
//!
//! Blur is the join operator of the domain: nodes with equal canonical names
//! ([`Structure::canonic_name`]) are indistinguishable for the abstraction and are merged
//! into one representative, bounding the size of every structure by the number of distinct
//! names ([`Vocabulary::canonic_bound`][crate::predicate::Vocabulary::canonic_bound]).
//!
//! Merging only loses precision: a merged tuple keeps a definite value only if every tuple
//! it stands for had that value, and is `1/2` otherwise.
//!
//! ```
//! use shape_rs::context::AnalysisContext;
//! use shape_rs::kleene::Kleene;
//! use shape_rs::predicate::{Properties, Vocabulary};
//!
//! let mut vocab = Vocabulary::new();
//! let x = vocab.add("x", 1, Properties::abstraction()).unwrap();
//! let ctx = AnalysisContext::new(vocab).unwrap();
//!
//! let mut s = ctx.new_structure();
//! let a = s.new_node();
//! let b = s.new_node();
//! let c = s.new_node();
//! s.update(x, &[c], Kleene::True);
//!
//! ctx.blur(&mut s);
//! assert_eq!(s.node_count(), 2);
//! assert!(s.is_summary(a));
//! assert!(!s.contains(b));
//! assert!(!s.is_summary(c));
//! ```

use std::collections::BTreeMap;

use log::debug;

use crate::canonic::Canonic;
use crate::context::AnalysisContext;
use crate::structure::Structure;
use crate::types::Node;

impl AnalysisContext {
    /// Merges every class of nodes sharing a canonical name into its smallest node.
    pub fn blur(&self, structure: &mut Structure) {
        let vocab = self.vocabulary();
        let three_way = self.config().three_way_canonic;
        // Merging may change the self-loop of a representative, and with it its name
        let iterate = vocab.abstraction().any(|p| p.arity() >= 2);

        let before = structure.node_count();
        loop {
            let mut classes: BTreeMap<Canonic, Vec<Node>> = BTreeMap::new();
            for (node, name) in structure.canonic_names(vocab, three_way) {
                classes.entry(name).or_default().push(node);
            }
            let mut merged = false;
            for class in classes.values().filter(|c| c.len() > 1) {
                structure.merge_nodes(class);
                merged = true;
            }
            if !merged || !iterate {
                break;
            }
        }
        if structure.node_count() != before {
            debug!("blur: {} -> {} nodes", before, structure.node_count());
        }
    }

    /// Blurs every structure in place.
    ///
    /// No blurred structure has more nodes than there are canonical names, see
    /// [`Vocabulary::canonic_bound`][crate::predicate::Vocabulary::canonic_bound].
    pub fn blur_all(&self, structures: &mut [Structure]) {
        let bound = self.vocabulary().canonic_bound(self.config().three_way_canonic);
        let mut largest = 0;
        for s in structures.iter_mut() {
            self.blur(s);
            largest = largest.max(s.node_count());
        }
        debug!(
            "blur_all: {} structure(s), largest has {} of at most {} node(s)",
            structures.len(),
            largest,
            bound
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use num_bigint::BigUint;
    use test_log::test;

    use super::*;
    use crate::kleene::Kleene;
    use crate::predicate::{PredicateId, Properties, Vocabulary};

    fn list_ctx() -> (AnalysisContext, PredicateId, PredicateId) {
        let mut vocab = Vocabulary::new();
        let x = vocab.add("x", 1, Properties::abstraction()).unwrap();
        let n = vocab.add("n", 2, Properties::default()).unwrap();
        (AnalysisContext::new(vocab).unwrap(), x, n)
    }

    /// `x -> 0 -> 1 -> ... -> len-1`
    fn list(ctx: &AnalysisContext, x: PredicateId, n: PredicateId, len: usize) -> Structure {
        let mut s = ctx.new_structure();
        let nodes: Vec<Node> = (0..len).map(|_| s.new_node()).collect();
        s.update(x, &[nodes[0]], Kleene::True);
        for w in nodes.windows(2) {
            s.update(n, &[w[0], w[1]], Kleene::True);
        }
        s
    }

    #[test]
    fn test_list_blur() {
        let (ctx, x, n) = list_ctx();
        let original = list(&ctx, x, n, 4);
        let mut s = original.clone();
        ctx.blur(&mut s);

        assert_eq!(s.node_count(), 2);
        let (h, t) = (Node::new(0), Node::new(1));
        assert!(!s.is_summary(h));
        assert!(s.is_summary(t));
        assert_eq!(s.eval(n, &[h, t]), Kleene::Unknown);
        assert_eq!(s.eval(n, &[t, t]), Kleene::Unknown);
        assert_eq!(s.eval(n, &[t, h]), Kleene::False);
        assert!(original.embeds_into(&s));
    }

    #[test]
    fn test_blur_keeps_distinct_nodes() {
        let (ctx, x, n) = list_ctx();
        let mut s = list(&ctx, x, n, 2);
        let before = s.clone();
        ctx.blur(&mut s);
        assert_eq!(s, before);
    }

    #[test]
    fn test_blur_idempotent() {
        let (ctx, x, n) = list_ctx();
        let mut s = list(&ctx, x, n, 5);
        ctx.blur(&mut s);
        let once = s.clone();
        ctx.blur(&mut s);
        assert!(s.is_isomorphic(&once));
    }

    #[test]
    fn test_binary_abstraction_iterates() {
        let mut vocab = Vocabulary::new();
        let r = vocab.add("r", 2, Properties::abstraction()).unwrap();
        let ctx = AnalysisContext::new(vocab).unwrap();
        let mut s = ctx.new_structure();
        let a = s.new_node();
        let b = s.new_node();
        let c = s.new_node();
        // a and b have no self-loop, but are connected; c has a definite self-loop
        s.update(r, &[a, b], Kleene::True);
        s.update(r, &[c, c], Kleene::True);
        ctx.blur(&mut s);

        let names = s.canonic_names(ctx.vocabulary(), true);
        let distinct: BTreeSet<_> = names.values().collect();
        assert_eq!(distinct.len(), names.len());
        // The merged a/b node has an unknown self-loop now
        assert_eq!(s.eval(r, &[a, a]), Kleene::Unknown);
        assert_eq!(s.node_count(), 2);
    }

    #[test]
    fn test_two_way_names_merge_more() {
        let mut vocab = Vocabulary::new();
        let x = vocab.add("x", 1, Properties::abstraction()).unwrap();
        let ctx = AnalysisContext::with_config(
            vocab,
            crate::context::Config {
                three_way_canonic: false,
                ..Default::default()
            },
        )
        .unwrap();
        let mut s = ctx.new_structure();
        let a = s.new_node();
        let b = s.new_node();
        s.update(x, &[b], Kleene::Unknown);
        ctx.blur(&mut s);
        assert_eq!(s.node_count(), 1);
        assert_eq!(s.eval(x, &[a]), Kleene::Unknown);
    }

    #[test]
    fn test_blur_all() {
        let (ctx, x, n) = list_ctx();
        let mut structures = vec![list(&ctx, x, n, 3), list(&ctx, x, n, 4)];
        ctx.blur_all(&mut structures);
        assert!(structures.iter().all(|s| s.node_count() == 2));
        let bound = ctx.vocabulary().canonic_bound(true);
        assert!(structures.iter().all(|s| BigUint::from(s.node_count()) <= bound));
        assert!(structures[0].is_isomorphic(&structures[1]));
    }
}
