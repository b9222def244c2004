//! First-order formulas over a [`Vocabulary`].
//!
//! [`Formula`] is a closed tagged union. Every consumer (the evaluator, constraint
//! compilation, focus-formula compilation) matches on it exhaustively.
//!
//! Formulas are built with smart constructors that perform a few cheap local
//! simplifications (double negation, negated constants):
//!
//! ```
//! use shape_rs::formula::{Formula, Var};
//! use shape_rs::predicate::{Properties, Vocabulary};
//!
//! let mut vocab = Vocabulary::new();
//! let n = vocab.add("n", 2, Properties::default()).unwrap();
//!
//! let v1 = Var::new("v1");
//! let v2 = Var::new("v2");
//! // E v2. n(v1, v2) & v1 != v2
//! let f = Formula::exists(
//!     v2.clone(),
//!     Formula::and(Formula::atom(n, [v1.clone(), v2.clone()]), Formula::not(Formula::eq(v1.clone(), v2))),
//! );
//! assert_eq!(f.free_vars().into_iter().collect::<Vec<_>>(), vec![v1]);
//! assert_eq!(f.display(&vocab).to_string(), "E(v2). (n(v1, v2) & v1 != v2)");
//! ```

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::kleene::Kleene;
use crate::predicate::{PredicateId, Vocabulary};

/// A logical variable.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(String);

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Var(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns a variable derived from `self` that does not occur in `avoid`.
    pub fn fresh(&self, avoid: &BTreeSet<Var>) -> Var {
        let mut k = 1;
        loop {
            let candidate = Var(format!("{}_{}", self.0, k));
            if !avoid.contains(&candidate) {
                return candidate;
            }
            k += 1;
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Var {
    fn from(name: &str) -> Self {
        Var::new(name)
    }
}

/// Transitive closure `TC(left, right; sub_left, sub_right) body`.
///
/// Holds when `right` is reachable from `left` by one or more `body`-edges, where an edge
/// `(a, b)` is `body` evaluated with `sub_left = a` and `sub_right = b`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Closure {
    pub left: Var,
    pub right: Var,
    pub sub_left: Var,
    pub sub_right: Var,
    pub body: Formula,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Formula {
    Value(Kleene),
    Atomic(PredicateId, Vec<Var>),
    Equality(Var, Var),
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Equivalence(Box<Formula>, Box<Formula>),
    /// `If(cond, then, else)`.
    If(Box<Formula>, Box<Formula>, Box<Formula>),
    Exists(Var, Box<Formula>),
    Forall(Var, Box<Formula>),
    TransitiveClosure(Box<Closure>),
}

impl Formula {
    pub const TRUE: Formula = Formula::Value(Kleene::True);
    pub const FALSE: Formula = Formula::Value(Kleene::False);

    pub fn value(value: Kleene) -> Self {
        Formula::Value(value)
    }

    pub fn atom(predicate: PredicateId, vars: impl IntoIterator<Item = Var>) -> Self {
        Formula::Atomic(predicate, vars.into_iter().collect())
    }

    pub fn eq(left: Var, right: Var) -> Self {
        Formula::Equality(left, right)
    }

    pub fn not(value: Self) -> Self {
        match value {
            Formula::Value(k) => Formula::Value(!k),
            Formula::Not(inner) => *inner,
            _ => Formula::Not(Box::new(value)),
        }
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        Formula::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Formula::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Conjunction of all formulas; `1` when empty.
    pub fn and_all(terms: impl IntoIterator<Item = Self>) -> Self {
        terms
            .into_iter()
            .reduce(Formula::and)
            .unwrap_or(Formula::TRUE)
    }

    /// Disjunction of all formulas; `0` when empty.
    pub fn or_all(terms: impl IntoIterator<Item = Self>) -> Self {
        terms
            .into_iter()
            .reduce(Formula::or)
            .unwrap_or(Formula::FALSE)
    }

    /// `lhs -> rhs`, encoded as `!lhs | rhs`.
    pub fn implies(lhs: Self, rhs: Self) -> Self {
        Formula::or(Formula::not(lhs), rhs)
    }

    pub fn equiv(lhs: Self, rhs: Self) -> Self {
        Formula::Equivalence(Box::new(lhs), Box::new(rhs))
    }

    pub fn ite(cond: Self, then: Self, else_: Self) -> Self {
        Formula::If(Box::new(cond), Box::new(then), Box::new(else_))
    }

    pub fn exists(var: Var, body: Self) -> Self {
        Formula::Exists(var, Box::new(body))
    }

    pub fn forall(var: Var, body: Self) -> Self {
        Formula::Forall(var, Box::new(body))
    }

    pub fn tc(left: Var, right: Var, sub_left: Var, sub_right: Var, body: Self) -> Self {
        Formula::TransitiveClosure(Box::new(Closure {
            left,
            right,
            sub_left,
            sub_right,
            body,
        }))
    }

    /// Free variables, in sorted order.
    pub fn free_vars(&self) -> BTreeSet<Var> {
        let mut out = BTreeSet::new();
        self.collect_free_vars(&mut Vec::new(), &mut out);
        out
    }

    fn collect_free_vars(&self, bound: &mut Vec<Var>, out: &mut BTreeSet<Var>) {
        fn visit(v: &Var, bound: &[Var], out: &mut BTreeSet<Var>) {
            if !bound.contains(v) {
                out.insert(v.clone());
            }
        }
        match self {
            Formula::Value(_) => {}
            Formula::Atomic(_, vars) => {
                for v in vars {
                    visit(v, bound, out);
                }
            }
            Formula::Equality(l, r) => {
                visit(l, bound, out);
                visit(r, bound, out);
            }
            Formula::Not(f) => f.collect_free_vars(bound, out),
            Formula::And(a, b) | Formula::Or(a, b) | Formula::Equivalence(a, b) => {
                a.collect_free_vars(bound, out);
                b.collect_free_vars(bound, out);
            }
            Formula::If(c, t, e) => {
                c.collect_free_vars(bound, out);
                t.collect_free_vars(bound, out);
                e.collect_free_vars(bound, out);
            }
            Formula::Exists(v, f) | Formula::Forall(v, f) => {
                bound.push(v.clone());
                f.collect_free_vars(bound, out);
                bound.pop();
            }
            Formula::TransitiveClosure(tc) => {
                visit(&tc.left, bound, out);
                visit(&tc.right, bound, out);
                bound.push(tc.sub_left.clone());
                bound.push(tc.sub_right.clone());
                tc.body.collect_free_vars(bound, out);
                bound.pop();
                bound.pop();
            }
        }
    }

    /// All variables, free or bound.
    pub fn all_vars(&self) -> BTreeSet<Var> {
        let mut out = BTreeSet::new();
        self.visit(&mut |f| match f {
            Formula::Atomic(_, vars) => out.extend(vars.iter().cloned()),
            Formula::Equality(l, r) => {
                out.insert(l.clone());
                out.insert(r.clone());
            }
            Formula::Exists(v, _) | Formula::Forall(v, _) => {
                out.insert(v.clone());
            }
            Formula::TransitiveClosure(tc) => {
                out.extend([tc.left.clone(), tc.right.clone(), tc.sub_left.clone(), tc.sub_right.clone()]);
            }
            _ => {}
        });
        out
    }

    /// Pre-order traversal of all subformulas.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Formula)) {
        f(self);
        match self {
            Formula::Value(_) | Formula::Atomic(..) | Formula::Equality(..) => {}
            Formula::Not(a) | Formula::Exists(_, a) | Formula::Forall(_, a) => a.visit(f),
            Formula::And(a, b) | Formula::Or(a, b) | Formula::Equivalence(a, b) => {
                a.visit(f);
                b.visit(f);
            }
            Formula::If(c, t, e) => {
                c.visit(f);
                t.visit(f);
                e.visit(f);
            }
            Formula::TransitiveClosure(tc) => tc.body.visit(f),
        }
    }

    /// Predicates mentioned by the formula.
    pub fn predicates(&self) -> BTreeSet<PredicateId> {
        let mut out = BTreeSet::new();
        self.visit(&mut |f| {
            if let Formula::Atomic(p, _) = f {
                out.insert(*p);
            }
        });
        out
    }

    /// Predicates whose values can influence the formula's value.
    ///
    /// Besides the mentioned predicates, an equality reads `sm` and quantifiers and
    /// transitive closures read `active`.
    pub fn reads(&self) -> BTreeSet<PredicateId> {
        let mut out = BTreeSet::new();
        self.visit(&mut |f| match f {
            Formula::Atomic(p, _) => {
                out.insert(*p);
            }
            Formula::Equality(..) => {
                out.insert(Vocabulary::SM);
            }
            Formula::Exists(..) | Formula::Forall(..) | Formula::TransitiveClosure(_) => {
                out.insert(Vocabulary::ACTIVE);
            }
            _ => {}
        });
        out
    }

    /// Checks that every atom names a declared predicate with matching arity.
    pub fn check(&self, vocab: &Vocabulary) -> Result<()> {
        let mut result = Ok(());
        self.visit(&mut |f| {
            if result.is_err() {
                return;
            }
            if let Formula::Atomic(p, vars) = f {
                if !vocab.contains(*p) {
                    result = Err(Error::UndeclaredPredicate(p.to_string()));
                } else if vocab.arity(*p) != vars.len() {
                    result = Err(Error::ArityMismatch {
                        name: vocab.name(*p).to_string(),
                        expected: vocab.arity(*p),
                        actual: vars.len(),
                    });
                }
            }
        });
        result
    }

    /// Replaces free occurrences of `from` by `to`, renaming bound variables that would capture `to`.
    pub fn substitute(&self, from: &Var, to: &Var) -> Formula {
        let rename = |v: &Var| if v == from { to.clone() } else { v.clone() };
        match self {
            Formula::Value(k) => Formula::Value(*k),
            Formula::Atomic(p, vars) => Formula::Atomic(*p, vars.iter().map(rename).collect()),
            Formula::Equality(l, r) => Formula::Equality(rename(l), rename(r)),
            Formula::Not(f) => Formula::Not(Box::new(f.substitute(from, to))),
            Formula::And(a, b) => Formula::and(a.substitute(from, to), b.substitute(from, to)),
            Formula::Or(a, b) => Formula::or(a.substitute(from, to), b.substitute(from, to)),
            Formula::Equivalence(a, b) => Formula::equiv(a.substitute(from, to), b.substitute(from, to)),
            Formula::If(c, t, e) => Formula::ite(
                c.substitute(from, to),
                t.substitute(from, to),
                e.substitute(from, to),
            ),
            Formula::Exists(v, f) | Formula::Forall(v, f) => {
                let (v, f) = if v == from {
                    (v.clone(), (**f).clone())
                } else if v == to {
                    let mut avoid = f.all_vars();
                    avoid.insert(from.clone());
                    avoid.insert(to.clone());
                    let fresh = v.fresh(&avoid);
                    (fresh.clone(), f.substitute(v, &fresh).substitute(from, to))
                } else {
                    (v.clone(), f.substitute(from, to))
                };
                if matches!(self, Formula::Exists(..)) {
                    Formula::exists(v, f)
                } else {
                    Formula::forall(v, f)
                }
            }
            Formula::TransitiveClosure(tc) => {
                let mut tc = (**tc).clone();
                tc.left = rename(&tc.left);
                tc.right = rename(&tc.right);
                if tc.sub_left != *from && tc.sub_right != *from {
                    for sub in [tc.sub_left.clone(), tc.sub_right.clone()] {
                        if sub == *to {
                            let mut avoid = tc.body.all_vars();
                            avoid.insert(from.clone());
                            let fresh = sub.fresh(&avoid);
                            tc.body = tc.body.substitute(&sub, &fresh);
                            if tc.sub_left == sub {
                                tc.sub_left = fresh;
                            } else {
                                tc.sub_right = fresh;
                            }
                        }
                    }
                    tc.body = tc.body.substitute(from, to);
                }
                Formula::TransitiveClosure(Box::new(tc))
            }
        }
    }

    /// Negation normal form: negations only on atoms, no `Equivalence`, no `If`.
    pub fn to_nnf(&self) -> Formula {
        self.nnf(false)
    }

    fn nnf(&self, negate: bool) -> Formula {
        match self {
            Formula::Value(k) => Formula::Value(if negate { !*k } else { *k }),
            Formula::Atomic(..) | Formula::Equality(..) | Formula::TransitiveClosure(_) => {
                if negate {
                    Formula::Not(Box::new(self.clone()))
                } else {
                    self.clone()
                }
            }
            Formula::Not(f) => f.nnf(!negate),
            Formula::And(a, b) => {
                if negate {
                    Formula::or(a.nnf(true), b.nnf(true))
                } else {
                    Formula::and(a.nnf(false), b.nnf(false))
                }
            }
            Formula::Or(a, b) => {
                if negate {
                    Formula::and(a.nnf(true), b.nnf(true))
                } else {
                    Formula::or(a.nnf(false), b.nnf(false))
                }
            }
            Formula::Equivalence(a, b) => {
                // (a & b) | (!a & !b), negated: (a & !b) | (!a & b)
                let (b_pos, b_neg) = if negate { (b.nnf(true), b.nnf(false)) } else { (b.nnf(false), b.nnf(true)) };
                Formula::or(Formula::and(a.nnf(false), b_pos), Formula::and(a.nnf(true), b_neg))
            }
            Formula::If(c, t, e) => {
                // (c & t) | (!c & e)
                Formula::or(
                    Formula::and(c.nnf(false), t.nnf(negate)),
                    Formula::and(c.nnf(true), e.nnf(negate)),
                )
            }
            Formula::Exists(v, f) => {
                if negate {
                    Formula::forall(v.clone(), f.nnf(true))
                } else {
                    Formula::exists(v.clone(), f.nnf(false))
                }
            }
            Formula::Forall(v, f) => {
                if negate {
                    Formula::exists(v.clone(), f.nnf(true))
                } else {
                    Formula::forall(v.clone(), f.nnf(false))
                }
            }
        }
    }

    /// Renames every quantified variable so that it is distinct from all free variables and
    /// from every other quantified variable.
    pub fn rename_apart(&self) -> Formula {
        let mut used = self.all_vars();
        let mut seen = self.free_vars();
        self.rename_apart_rec(&mut used, &mut seen)
    }

    fn rename_apart_rec(&self, used: &mut BTreeSet<Var>, seen: &mut BTreeSet<Var>) -> Formula {
        match self {
            Formula::Value(_) | Formula::Atomic(..) | Formula::Equality(..) | Formula::TransitiveClosure(_) => {
                self.clone()
            }
            Formula::Not(f) => Formula::Not(Box::new(f.rename_apart_rec(used, seen))),
            Formula::And(a, b) => Formula::and(a.rename_apart_rec(used, seen), b.rename_apart_rec(used, seen)),
            Formula::Or(a, b) => Formula::or(a.rename_apart_rec(used, seen), b.rename_apart_rec(used, seen)),
            Formula::Equivalence(a, b) => {
                Formula::equiv(a.rename_apart_rec(used, seen), b.rename_apart_rec(used, seen))
            }
            Formula::If(c, t, e) => Formula::ite(
                c.rename_apart_rec(used, seen),
                t.rename_apart_rec(used, seen),
                e.rename_apart_rec(used, seen),
            ),
            Formula::Exists(v, f) | Formula::Forall(v, f) => {
                let (v, body) = if seen.contains(v) {
                    let fresh = v.fresh(used);
                    used.insert(fresh.clone());
                    (fresh.clone(), f.substitute(v, &fresh))
                } else {
                    (v.clone(), (**f).clone())
                };
                seen.insert(v.clone());
                let body = body.rename_apart_rec(used, seen);
                if matches!(self, Formula::Exists(..)) {
                    Formula::exists(v, body)
                } else {
                    Formula::forall(v, body)
                }
            }
        }
    }

    /// Disjunctive normal form of the quantifier-free matrix of the prenex form.
    ///
    /// Returns the list of disjuncts, each a list of literals. Quantifiers are dropped after
    /// renaming their variables apart, so the quantified variables become free variables of
    /// the literals.
    pub fn to_prenex_dnf(&self) -> Vec<Vec<Literal>> {
        self.rename_apart().to_nnf().matrix_dnf()
    }

    fn matrix_dnf(&self) -> Vec<Vec<Literal>> {
        match self {
            Formula::Exists(_, f) | Formula::Forall(_, f) => f.matrix_dnf(),
            Formula::Or(a, b) => {
                let mut out = a.matrix_dnf();
                out.extend(b.matrix_dnf());
                out
            }
            Formula::And(a, b) => {
                let left = a.matrix_dnf();
                let right = b.matrix_dnf();
                let mut out = Vec::with_capacity(left.len() * right.len());
                for l in &left {
                    for r in &right {
                        let mut conj = l.clone();
                        conj.extend(r.iter().cloned());
                        out.push(conj);
                    }
                }
                out
            }
            Formula::Not(f) => vec![vec![Literal {
                atom: (**f).clone(),
                negated: true,
            }]],
            _ => vec![vec![Literal {
                atom: self.clone(),
                negated: false,
            }]],
        }
    }

    /// Returns a [`Display`][fmt::Display] adapter that prints predicate names.
    pub fn display<'a>(&'a self, vocab: &'a Vocabulary) -> FormulaDisplay<'a> {
        FormulaDisplay { formula: self, vocab }
    }
}

/// A possibly negated atomic formula: an atom, an equality, a constant or a transitive closure.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Literal {
    pub atom: Formula,
    pub negated: bool,
}

impl Literal {
    /// The value the atom must take for the literal to hold.
    pub fn polarity(&self) -> Kleene {
        Kleene::from_bool(!self.negated)
    }

    pub fn to_formula(&self) -> Formula {
        if self.negated {
            Formula::not(self.atom.clone())
        } else {
            self.atom.clone()
        }
    }
}

pub struct FormulaDisplay<'a> {
    formula: &'a Formula,
    vocab: &'a Vocabulary,
}

impl FormulaDisplay<'_> {
    fn sub<'b>(&'b self, formula: &'b Formula) -> FormulaDisplay<'b> {
        FormulaDisplay {
            formula,
            vocab: self.vocab,
        }
    }
}

impl fmt::Display for FormulaDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.formula {
            Formula::Value(k) => write!(f, "{}", k),
            Formula::Atomic(p, vars) => {
                let name = if self.vocab.contains(*p) {
                    self.vocab.name(*p).to_string()
                } else {
                    p.to_string()
                };
                write!(f, "{}(", name)?;
                for (i, v) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Formula::Equality(l, r) => write!(f, "{} == {}", l, r),
            Formula::Not(inner) => match inner.as_ref() {
                Formula::Equality(l, r) => write!(f, "{} != {}", l, r),
                _ => write!(f, "!{}", self.sub(inner)),
            },
            Formula::And(a, b) => write!(f, "({} & {})", self.sub(a), self.sub(b)),
            Formula::Or(a, b) => write!(f, "({} | {})", self.sub(a), self.sub(b)),
            Formula::Equivalence(a, b) => write!(f, "({} <-> {})", self.sub(a), self.sub(b)),
            Formula::If(c, t, e) => write!(f, "({} ? {} : {})", self.sub(c), self.sub(t), self.sub(e)),
            Formula::Exists(v, body) => write!(f, "E({}). {}", v, self.sub(body)),
            Formula::Forall(v, body) => write!(f, "A({}). {}", v, self.sub(body)),
            Formula::TransitiveClosure(tc) => write!(
                f,
                "TC({}, {}; {}, {}) {}",
                tc.left,
                tc.right,
                tc.sub_left,
                tc.sub_right,
                self.sub(&tc.body)
            ),
        }
    }
}
