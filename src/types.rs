//! Type-safe wrappers for structure individuals.
//!
//! This module provides the [`Node`] newtype, identifying an abstract individual
//! inside one structure's universe, and [`NodeTuple`], the key into a predicate's
//! interpretation.
use std::borrow::Borrow;
use std::fmt;
use std::ops::Index;

/// An abstract individual of a structure.
///
/// Nodes carry no data besides their identity. The owning
/// [`Structure`][crate::structure::Structure] hands out dense ids and never reuses one,
/// so a node id is stable for the lifetime of the structure and its copies.
///
/// # Invariants
///
/// - A node is only meaningful within the structure (or copies of the structure) that created it
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Node(u32);

impl Node {
    /// Creates a node with the given id.
    pub fn new(id: u32) -> Self {
        Node(id)
    }

    /// Returns the raw node id.
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Node> for u32 {
    fn from(node: Node) -> Self {
        node.0
    }
}

impl From<u32> for Node {
    fn from(id: u32) -> Self {
        Node(id)
    }
}

/// An immutable ordered sequence of nodes.
///
/// The ordering (derived) is lexicographic, identical to the ordering of `[Node]`,
/// so a `BTreeMap<NodeTuple, _>` can be queried with a plain slice.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct NodeTuple(Vec<Node>);

impl NodeTuple {
    /// The nullary tuple.
    pub fn empty() -> Self {
        NodeTuple(Vec::new())
    }

    pub fn new(nodes: Vec<Node>) -> Self {
        NodeTuple(nodes)
    }

    pub fn unary(node: Node) -> Self {
        NodeTuple(vec![node])
    }

    pub fn pair(left: Node, right: Node) -> Self {
        NodeTuple(vec![left, right])
    }

    /// Creates the tuple `(node, node, ..., node)` of the given arity.
    pub fn self_loop(node: Node, arity: usize) -> Self {
        NodeTuple(vec![node; arity])
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Node {
        self.0[index]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.0
    }

    pub fn contains(&self, node: Node) -> bool {
        self.0.contains(&node)
    }

    /// Returns a copy with every occurrence of `from` replaced by `to`.
    pub fn substitute(&self, from: Node, to: Node) -> Self {
        NodeTuple(self.0.iter().map(|&n| if n == from { to } else { n }).collect())
    }

    /// Returns a copy with each node replaced by `f(node)`.
    pub fn map(&self, f: impl Fn(Node) -> Node) -> Self {
        NodeTuple(self.0.iter().map(|&n| f(n)).collect())
    }

    /// Enumerates all tuples of `arity` over `nodes`, in lexicographic order of positions.
    pub fn all(nodes: &[Node], arity: usize) -> TupleIter {
        TupleIter::new(nodes.to_vec(), arity)
    }
}

impl Borrow<[Node]> for NodeTuple {
    fn borrow(&self) -> &[Node] {
        &self.0
    }
}

impl Index<usize> for NodeTuple {
    type Output = Node;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<Vec<Node>> for NodeTuple {
    fn from(nodes: Vec<Node>) -> Self {
        NodeTuple(nodes)
    }
}

impl From<&[Node]> for NodeTuple {
    fn from(nodes: &[Node]) -> Self {
        NodeTuple(nodes.to_vec())
    }
}

impl fmt::Display for NodeTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "()"),
            [n] => write!(f, "{}", n),
            [l, r] => write!(f, "{}->{}", l, r),
            nodes => {
                write!(f, "(")?;
                for (i, n) in nodes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", n)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Odometer-style iterator over all tuples of a fixed arity.
pub struct TupleIter {
    nodes: Vec<Node>,
    positions: Vec<usize>,
    done: bool,
}

impl TupleIter {
    fn new(nodes: Vec<Node>, arity: usize) -> Self {
        let done = arity > 0 && nodes.is_empty();
        TupleIter {
            nodes,
            positions: vec![0; arity],
            done,
        }
    }
}

impl Iterator for TupleIter {
    type Item = NodeTuple;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let tuple = NodeTuple(self.positions.iter().map(|&i| self.nodes[i]).collect());

        // Advance the odometer, rightmost position first
        let mut k = self.positions.len();
        loop {
            if k == 0 {
                self.done = true;
                break;
            }
            k -= 1;
            self.positions[k] += 1;
            if self.positions[k] < self.nodes.len() {
                break;
            }
            self.positions[k] = 0;
        }

        Some(tuple)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_node_creation() {
        let n1 = Node::new(1);
        let n2 = Node::new(2);
        assert_eq!(n1.id(), 1);
        assert!(n1 < n2);
        assert_eq!(n2.to_string(), "2");
    }

    #[test]
    fn test_tuple_substitute() {
        let a = Node::new(0);
        let b = Node::new(1);
        let t = NodeTuple::new(vec![a, b, a]);
        assert_eq!(t.substitute(a, b), NodeTuple::new(vec![b, b, b]));
        assert!(t.contains(b));
        assert!(!t.substitute(b, a).contains(b));
    }

    #[test]
    fn test_tuple_display() {
        let a = Node::new(3);
        let b = Node::new(7);
        assert_eq!(NodeTuple::empty().to_string(), "()");
        assert_eq!(NodeTuple::unary(a).to_string(), "3");
        assert_eq!(NodeTuple::pair(a, b).to_string(), "3->7");
        assert_eq!(NodeTuple::new(vec![a, b, a]).to_string(), "(3, 7, 3)");
    }

    #[test]
    fn test_all_tuples() {
        let nodes = [Node::new(0), Node::new(1), Node::new(2)];
        assert_eq!(NodeTuple::all(&nodes, 0).count(), 1);
        assert_eq!(NodeTuple::all(&nodes, 1).count(), 3);
        assert_eq!(NodeTuple::all(&nodes, 2).count(), 9);
        assert_eq!(NodeTuple::all(&nodes, 3).count(), 27);
        assert_eq!(NodeTuple::all(&[], 2).count(), 0);

        let pairs: Vec<_> = NodeTuple::all(&nodes[..2], 2).collect();
        assert_eq!(pairs[0], NodeTuple::pair(nodes[0], nodes[0]));
        assert_eq!(pairs[1], NodeTuple::pair(nodes[0], nodes[1]));
        assert_eq!(pairs[3], NodeTuple::pair(nodes[1], nodes[1]));
    }

    #[test]
    fn test_slice_lookup() {
        use std::collections::BTreeMap;
        let a = Node::new(0);
        let b = Node::new(1);
        let mut map = BTreeMap::new();
        map.insert(NodeTuple::pair(a, b), 42);
        assert_eq!(map.get(&[a, b][..]), Some(&42));
        assert_eq!(map.get(&[b, a][..]), None);
    }
}
