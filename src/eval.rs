//! Formula evaluation over a structure.
//!
//! This is the evaluator capability Coerce and Focus are built on: evaluate a
//! [`Formula`] under an [`Assign`]ment of nodes to its free variables, and enumerate the
//! assignments (extending a partial one) under which a formula takes a given value.
//!
//! Quantifiers range over the universe, weighted by `active`: `E v. f` is the disjunction of
//! `active(n) & f[v := n]`, and `A v. f` the conjunction of `!active(n) | f[v := n]`.
//! Transitive closure is the Kleene max-min closure of the body's edge relation, where a path
//! through an intermediate node is only as certain as that node's `active` value.
//!
//! ```
//! use shape_rs::eval::Assign;
//! use shape_rs::formula::{Formula, Var};
//! use shape_rs::kleene::Kleene;
//! use shape_rs::predicate::{Properties, Vocabulary};
//! use shape_rs::structure::Structure;
//!
//! let mut vocab = Vocabulary::new();
//! let x = vocab.add("x", 1, Properties::default()).unwrap();
//! let mut s = Structure::new(&vocab);
//! let a = s.new_node();
//! let b = s.new_node();
//! s.update(x, &[a], Kleene::True);
//! s.update(x, &[b], Kleene::Unknown);
//!
//! let v = Var::new("v");
//! let f = Formula::atom(x, [v.clone()]);
//! assert_eq!(s.eval_formula(&f, &Assign::single(v.clone(), b)), Kleene::Unknown);
//!
//! let unknown = s.assignments_with(&f, &Assign::new(), Kleene::Unknown);
//! assert_eq!(unknown, vec![Assign::single(v, b)]);
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use log::trace;

use crate::formula::{Closure, Formula, Var};
use crate::kleene::Kleene;
use crate::predicate::Vocabulary;
use crate::structure::Structure;
use crate::types::{Node, NodeTuple};

/// A (partial) mapping from variables to nodes.
#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Assign(BTreeMap<Var, Node>);

impl Assign {
    pub fn new() -> Self {
        Assign(BTreeMap::new())
    }

    pub fn single(var: Var, node: Node) -> Self {
        let mut assign = Assign::new();
        assign.put(var, node);
        assign
    }

    pub fn get(&self, var: &Var) -> Option<Node> {
        self.0.get(var).copied()
    }

    pub fn contains(&self, var: &Var) -> bool {
        self.0.contains_key(var)
    }

    pub fn put(&mut self, var: Var, node: Node) {
        self.0.insert(var, node);
    }

    /// Adds every binding of `other`, overriding existing ones.
    pub fn extend(&mut self, other: &Assign) {
        for (v, &n) in &other.0 {
            self.0.insert(v.clone(), n);
        }
    }

    /// Keeps only the bindings of `vars`.
    pub fn project(&self, vars: &BTreeSet<Var>) -> Assign {
        Assign(
            self.0
                .iter()
                .filter(|(v, _)| vars.contains(*v))
                .map(|(v, &n)| (v.clone(), n))
                .collect(),
        )
    }

    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.0.keys()
    }

    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.0.values().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var, Node)> {
        self.0.iter().map(|(v, &n)| (v, n))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn lookup(&self, var: &Var) -> Node {
        match self.0.get(var) {
            Some(&n) => n,
            None => panic!("Variable {} missing from assignment {}", var, self),
        }
    }
}

impl fmt::Display for Assign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (v, n)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", v, n)?;
        }
        write!(f, "}}")
    }
}

/// Evaluates subformulas of one root formula on one structure.
///
/// Transitive closures whose body has no outside free variables are computed once per
/// evaluator and cached by address; the root borrow keeps those addresses valid.
struct Evaluator<'a> {
    structure: &'a Structure,
    nodes: Vec<Node>,
    closures: RefCell<HashMap<*const Closure, Rc<ClosureMatrix>>>,
}

struct ClosureMatrix {
    index: HashMap<Node, usize>,
    size: usize,
    values: Vec<Kleene>,
}

impl ClosureMatrix {
    fn get(&self, left: Node, right: Node) -> Kleene {
        let i = self.index[&left];
        let j = self.index[&right];
        self.values[i * self.size + j]
    }
}

impl<'a> Evaluator<'a> {
    fn new(structure: &'a Structure) -> Self {
        Evaluator {
            structure,
            nodes: structure.node_list(),
            closures: RefCell::new(HashMap::new()),
        }
    }

    fn active(&self, node: Node) -> Kleene {
        self.structure.eval(Vocabulary::ACTIVE, &[node])
    }

    fn eval(&self, formula: &Formula, assign: &Assign) -> Kleene {
        match formula {
            Formula::Value(k) => *k,
            Formula::Atomic(p, vars) => {
                let tuple: Vec<Node> = vars.iter().map(|v| assign.lookup(v)).collect();
                self.structure.eval(*p, &tuple)
            }
            Formula::Equality(l, r) => {
                if l == r {
                    return Kleene::True;
                }
                let left = assign.lookup(l);
                let right = assign.lookup(r);
                if left != right {
                    Kleene::False
                } else {
                    !self.structure.eval(Vocabulary::SM, &[left])
                }
            }
            Formula::Not(f) => !self.eval(f, assign),
            Formula::And(a, b) => {
                let left = self.eval(a, assign);
                if left == Kleene::False {
                    return Kleene::False;
                }
                left & self.eval(b, assign)
            }
            Formula::Or(a, b) => {
                let left = self.eval(a, assign);
                if left == Kleene::True {
                    return Kleene::True;
                }
                left | self.eval(b, assign)
            }
            Formula::Equivalence(a, b) => self.eval(a, assign).equiv(self.eval(b, assign)),
            Formula::If(c, t, e) => match self.eval(c, assign) {
                Kleene::True => self.eval(t, assign),
                Kleene::False => self.eval(e, assign),
                Kleene::Unknown => Kleene::join(self.eval(t, assign), self.eval(e, assign)),
            },
            Formula::Exists(v, f) => {
                let mut local = assign.clone();
                let mut result = Kleene::False;
                for &n in &self.nodes {
                    local.put(v.clone(), n);
                    result = result | (self.active(n) & self.eval(f, &local));
                    if result == Kleene::True {
                        break;
                    }
                }
                result
            }
            Formula::Forall(v, f) => {
                let mut local = assign.clone();
                let mut result = Kleene::True;
                for &n in &self.nodes {
                    local.put(v.clone(), n);
                    result = result & (!self.active(n) | self.eval(f, &local));
                    if result == Kleene::False {
                        break;
                    }
                }
                result
            }
            Formula::TransitiveClosure(tc) => {
                let left = assign.lookup(&tc.left);
                let right = assign.lookup(&tc.right);
                self.closure(tc, assign).get(left, right)
            }
        }
    }

    fn closure(&self, tc: &Closure, assign: &Assign) -> Rc<ClosureMatrix> {
        let mut body_vars = tc.body.free_vars();
        body_vars.remove(&tc.sub_left);
        body_vars.remove(&tc.sub_right);
        let closed = body_vars.is_empty();
        let key = tc as *const Closure;
        if closed {
            if let Some(matrix) = self.closures.borrow().get(&key) {
                return Rc::clone(matrix);
            }
        }

        let size = self.nodes.len();
        let index: HashMap<Node, usize> = self.nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let mut values = vec![Kleene::False; size * size];
        let mut local = assign.clone();
        for (i, &l) in self.nodes.iter().enumerate() {
            for (j, &r) in self.nodes.iter().enumerate() {
                local.put(tc.sub_left.clone(), l);
                local.put(tc.sub_right.clone(), r);
                values[i * size + j] = self.eval(&tc.body, &local);
            }
        }
        for (k, &via) in self.nodes.iter().enumerate() {
            let active = self.active(via);
            for i in 0..size {
                let ik = values[i * size + k];
                if ik == Kleene::False {
                    continue;
                }
                for j in 0..size {
                    let through = ik & values[k * size + j] & active;
                    values[i * size + j] = values[i * size + j] | through;
                }
            }
        }
        trace!("closure over {} nodes computed (closed = {})", size, closed);

        let matrix = Rc::new(ClosureMatrix { index, size, values });
        if closed {
            self.closures.borrow_mut().insert(key, Rc::clone(&matrix));
        }
        matrix
    }

    /// Enumerates extensions of `partial` to all free variables of `formula`, calling
    /// `visit` with each assignment and the formula's value under it.
    fn enumerate(&self, formula: &Formula, partial: &Assign, mut visit: impl FnMut(Assign, Kleene)) {
        let free: Vec<Var> = formula.free_vars().into_iter().filter(|v| !partial.contains(v)).collect();
        for tuple in NodeTuple::all(&self.nodes, free.len()) {
            let mut assign = partial.clone();
            for (v, &n) in free.iter().zip(tuple.nodes()) {
                assign.put(v.clone(), n);
            }
            let value = self.eval(formula, &assign);
            visit(assign, value);
        }
    }
}

impl Structure {
    /// Evaluates `formula` under `assign`.
    ///
    /// # Panics
    ///
    /// Panics if a free variable of `formula` is not bound by `assign`.
    pub fn eval_formula(&self, formula: &Formula, assign: &Assign) -> Kleene {
        Evaluator::new(self).eval(formula, assign)
    }

    /// All extensions of `partial` to the free variables of `formula`, with the formula's
    /// value under each. The order is deterministic (variables sorted, nodes ascending).
    pub fn assignments(&self, formula: &Formula, partial: &Assign) -> Vec<(Assign, Kleene)> {
        let evaluator = Evaluator::new(self);
        let mut out = Vec::new();
        evaluator.enumerate(formula, partial, |a, k| out.push((a, k)));
        out
    }

    /// Extensions of `partial` under which `formula` evaluates to a non-false value.
    pub fn satisfying_assignments(&self, formula: &Formula, partial: &Assign) -> Vec<(Assign, Kleene)> {
        if let Some(found) = self.atomic_assignments(formula, partial, None) {
            return found;
        }
        let evaluator = Evaluator::new(self);
        let mut out = Vec::new();
        evaluator.enumerate(formula, partial, |a, k| {
            if k != Kleene::False {
                out.push((a, k));
            }
        });
        out
    }

    /// Extensions of `partial` under which `formula` evaluates to exactly `value`.
    pub fn assignments_with(&self, formula: &Formula, partial: &Assign, value: Kleene) -> Vec<Assign> {
        if value != Kleene::False {
            if let Some(found) = self.atomic_assignments(formula, partial, Some(value)) {
                return found.into_iter().map(|(a, _)| a).collect();
            }
        }
        let evaluator = Evaluator::new(self);
        let mut out = Vec::new();
        evaluator.enumerate(formula, partial, |a, k| {
            if k == value {
                out.push(a);
            }
        });
        out
    }

    /// Fast path for a single atom: walk the predicate's non-false entries instead of all tuples.
    fn atomic_assignments(
        &self,
        formula: &Formula,
        partial: &Assign,
        value: Option<Kleene>,
    ) -> Option<Vec<(Assign, Kleene)>> {
        let Formula::Atomic(p, vars) = formula else {
            return None;
        };
        let mut out = Vec::new();
        'entries: for (tuple, k) in self.satisfying(*p) {
            if value.is_some_and(|value| value != k) {
                continue;
            }
            let mut assign = partial.clone();
            for (v, &n) in vars.iter().zip(tuple.nodes()) {
                match assign.get(v) {
                    Some(bound) if bound != n => continue 'entries,
                    Some(_) => {}
                    None => assign.put(v.clone(), n),
                }
            }
            out.push((assign, k));
        }
        out.sort();
        Some(out)
    }
}
