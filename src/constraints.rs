//! Constraint registry.
//!
//! A [`Constraint`] `body ==> head` states that whenever `body` holds, `head` must hold too;
//! free variables are implicitly universally quantified. A [`ConstraintSet`] collects the
//! constraints of one analysis: those implied by the vocabulary's predicate properties and
//! instrumentation definitions ([`ConstraintSet::from_vocabulary`]) plus user rules added
//! with [`ConstraintSet::add`].
//!
//! ```
//! use shape_rs::constraints::ConstraintSet;
//! use shape_rs::predicate::{Properties, Vocabulary};
//!
//! let mut vocab = Vocabulary::new();
//! vocab.add("x", 1, Properties { unique: true, ..Default::default() }).unwrap();
//! let constraints = ConstraintSet::from_vocabulary(&vocab);
//! let rendered: Vec<String> = constraints.iter().map(|c| c.display(&vocab).to_string()).collect();
//! assert_eq!(
//!     rendered,
//!     [
//!         "sm(v) ==> 0",
//!         "(x(v1) & x(v2)) ==> v1 == v2",
//!         "E(v1). (x(v1) & v1 != v2) ==> !x(v2)",
//!     ]
//! );
//! ```

use std::fmt;

use log::debug;

use crate::error::{Error, Result};
use crate::formula::{Formula, Literal, Var};
use crate::kleene::Kleene;
use crate::predicate::{Definition, Predicate, PredicateId, Vocabulary};

/// An implication `body ==> head`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Constraint {
    pub body: Formula,
    pub head: Formula,
}

impl Constraint {
    pub fn new(body: Formula, head: Formula) -> Self {
        Constraint { body, head }
    }

    pub fn display<'a>(&'a self, vocab: &'a Vocabulary) -> ConstraintDisplay<'a> {
        ConstraintDisplay { constraint: self, vocab }
    }
}

pub struct ConstraintDisplay<'a> {
    constraint: &'a Constraint,
    vocab: &'a Vocabulary,
}

impl fmt::Display for ConstraintDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ==> {}",
            self.constraint.body.display(self.vocab),
            self.constraint.head.display(self.vocab)
        )
    }
}

/// Checks that `head` is a constant, a possibly negated atom, or a possibly negated equality.
pub(crate) fn check_head(head: &Formula, vocab: &Vocabulary) -> Result<()> {
    let inner = match head {
        Formula::Not(inner) => inner.as_ref(),
        other => other,
    };
    match inner {
        Formula::Value(Kleene::True) | Formula::Value(Kleene::False) => Ok(()),
        Formula::Atomic(..) | Formula::Equality(..) => Ok(()),
        _ => Err(Error::UnsupportedConstraintHead(head.display(vocab).to_string())),
    }
}

/// The constraints of one analysis.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        ConstraintSet {
            constraints: Vec::new(),
        }
    }

    /// Generates the constraints implied by the declared properties and definitions of
    /// every predicate of `vocab`, including the built-in `sm(v) ==> 0`.
    pub fn from_vocabulary(vocab: &Vocabulary) -> Self {
        let mut set = ConstraintSet::new();
        let v = Var::new("v");
        set.push(Formula::atom(Vocabulary::SM, [v]), Formula::FALSE);

        for p in vocab.iter() {
            let before = set.len();
            set.add_property_constraints(vocab, p);
            if let Some(def) = p.definition() {
                set.add_definition_constraints(p, def);
            }
            if set.len() > before {
                debug!("from_vocabulary: {} constraint(s) for '{}'", set.len() - before, p.name());
            }
        }
        set
    }

    fn push(&mut self, body: Formula, head: Formula) {
        self.constraints.push(Constraint::new(body, head));
    }

    /// `φ ==> p` and `!φ ==> !p` for `p := φ`, and the closure of the definition.
    ///
    /// When `φ` (or `!φ`) is an existentially quantified conjunction of literals, every
    /// literal is implied false (true) by the other literals together with `!p` (`p`). When
    /// `φ` is a universally quantified atom `q`, `p` implies every instance of `q`.
    fn add_definition_constraints(&mut self, p: &Predicate, def: &Definition) {
        let atom = Formula::atom(p.id(), def.params.iter().cloned());
        self.push(def.formula.clone(), atom.clone());
        self.push(Formula::not(def.formula.clone()), Formula::not(atom.clone()));

        let nnf = def.formula.to_nnf();
        let mut matrix = &nnf;
        let mut universal = false;
        while let Formula::Forall(_, body) = matrix {
            matrix = body.as_ref();
            universal = true;
        }
        if universal && matches!(matrix, Formula::Atomic(..)) {
            // Both sides share the free variables of the head
            self.push(Formula::or(atom.clone(), matrix.clone()), matrix.clone());
        }

        let (terms, own) = match existential_conjunction(&def.formula) {
            Some(terms) => (terms, Formula::not(atom)),
            None => match existential_conjunction(&Formula::not(def.formula.clone())) {
                Some(terms) => (terms, atom),
                None => return,
            },
        };
        if terms.len() < 2 {
            return;
        }
        for (i, term) in terms.iter().enumerate() {
            let head = match (&term.atom, term.negated) {
                (Formula::Atomic(..), false) => Formula::not(term.atom.clone()),
                (Formula::Atomic(..), true) | (Formula::Equality(..), true) => term.atom.clone(),
                _ => continue,
            };
            let others = terms
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, t)| t.to_formula());
            let mut body = Formula::and_all(std::iter::once(own.clone()).chain(others));
            let head_vars = head.free_vars();
            let hidden: Vec<Var> = body.free_vars().into_iter().filter(|v| !head_vars.contains(v)).collect();
            for var in hidden {
                body = Formula::exists(var, body);
            }
            self.push(body, head);
        }
    }

    fn add_property_constraints(&mut self, vocab: &Vocabulary, p: &Predicate) {
        let props = *p.properties();
        let id = p.id();
        let var = |name: &str| Var::new(name);
        let [v, v1, v2, v3, v4] = ["v", "v1", "v2", "v3", "v4"].map(var);
        let atom = |vars: &[&Var]| Formula::atom(id, vars.iter().map(|&x| x.clone()));
        let eq = |a: &Var, b: &Var| Formula::eq(a.clone(), b.clone());
        let neq = |a: &Var, b: &Var| Formula::not(Formula::eq(a.clone(), b.clone()));

        match p.arity() {
            1 => {
                if props.unique {
                    self.push(Formula::and(atom(&[&v1]), atom(&[&v2])), eq(&v1, &v2));
                    self.push(
                        Formula::exists(v1.clone(), Formula::and(atom(&[&v1]), neq(&v1, &v2))),
                        Formula::not(atom(&[&v2])),
                    );
                }
                if let Some(cc) = props.unique_per_cc {
                    let rtc = find_rtc(vocab, cc);
                    let reach = match rtc {
                        Some(r) => Formula::atom(r, [v1.clone(), v2.clone()]),
                        None => {
                            let step = Formula::atom(cc, [v3.clone(), v4.clone()]);
                            Formula::or(eq(&v1, &v2), Formula::tc(v1.clone(), v2.clone(), v3.clone(), v4.clone(), step))
                        }
                    };
                    self.push(Formula::and_all([atom(&[&v1]), reach.clone(), atom(&[&v2])]), eq(&v1, &v2));
                    self.push(
                        Formula::exists(v1.clone(), Formula::and_all([atom(&[&v1]), reach.clone(), neq(&v1, &v2)])),
                        Formula::not(atom(&[&v2])),
                    );
                    self.push(
                        Formula::exists(v2.clone(), Formula::and_all([neq(&v1, &v2), reach.clone(), atom(&[&v2])])),
                        Formula::not(atom(&[&v1])),
                    );
                    // Only a predicate can be the head
                    if rtc.is_some() {
                        self.push(Formula::and_all([atom(&[&v1]), neq(&v1, &v2), atom(&[&v2])]), Formula::not(reach));
                    }
                }
            }
            2 => {
                if props.function {
                    self.push(Formula::and(atom(&[&v, &v1]), atom(&[&v, &v2])), eq(&v1, &v2));
                    self.push(
                        Formula::exists(v1.clone(), Formula::and(atom(&[&v, &v1]), neq(&v1, &v2))),
                        Formula::not(atom(&[&v, &v2])),
                    );
                }
                if props.invfunction {
                    self.push(Formula::and(atom(&[&v1, &v]), atom(&[&v2, &v])), eq(&v1, &v2));
                    self.push(
                        Formula::exists(v1.clone(), Formula::and(atom(&[&v1, &v]), neq(&v1, &v2))),
                        Formula::not(atom(&[&v2, &v])),
                    );
                }
                if props.symmetric {
                    self.push(atom(&[&v1, &v2]), atom(&[&v2, &v1]));
                }
                if props.antisymmetric {
                    self.push(Formula::and(atom(&[&v1, &v2]), atom(&[&v2, &v1])), eq(&v1, &v2));
                    self.push(Formula::and(atom(&[&v1, &v2]), neq(&v1, &v2)), Formula::not(atom(&[&v2, &v1])));
                }
                if props.reflexive {
                    self.push(eq(&v1, &v2), atom(&[&v1, &v2]));
                }
                if props.antireflexive {
                    self.push(eq(&v1, &v2), Formula::not(atom(&[&v1, &v2])));
                }
                if props.transitive {
                    self.push(
                        Formula::exists(v2.clone(), Formula::and(atom(&[&v1, &v2]), atom(&[&v2, &v3]))),
                        atom(&[&v1, &v3]),
                    );
                }
                if props.acyclic {
                    self.push(atom(&[&v, &v]), Formula::FALSE);
                    if let Some(rtc) = find_rtc(vocab, id) {
                        let reach = |from: &Var, to: &Var| Formula::atom(rtc, [from.clone(), to.clone()]);
                        self.push(Formula::and(reach(&v1, &v2), reach(&v2, &v1)), eq(&v1, &v2));
                        self.push(Formula::and(reach(&v1, &v2), neq(&v1, &v2)), Formula::not(reach(&v2, &v1)));
                    } else {
                        let reach = |from: &Var, to: &Var| {
                            Formula::or(
                                eq(from, to),
                                Formula::tc(from.clone(), to.clone(), v3.clone(), v4.clone(), atom(&[&v3, &v4])),
                            )
                        };
                        self.push(Formula::and(reach(&v1, &v2), reach(&v2, &v1)), eq(&v1, &v2));
                    }
                }
            }
            k if k >= 3 && props.function => {
                let args: Vec<Var> = (1..k).map(|i| Var::new(format!("x{}", i))).collect();
                let with_last = |last: &Var| {
                    Formula::atom(id, args.iter().cloned().chain(std::iter::once(last.clone())))
                };
                self.push(Formula::and(with_last(&v1), with_last(&v2)), eq(&v1, &v2));
                self.push(
                    Formula::exists(v1.clone(), Formula::and(with_last(&v1), neq(&v1, &v2))),
                    Formula::not(with_last(&v2)),
                );
            }
            _ => {}
        }
    }

    /// Adds a user constraint `body ==> head`.
    ///
    /// Fails if either side mentions an undeclared predicate or applies one to the wrong
    /// number of arguments, or if `head` is not a constant, a literal or an equality.
    pub fn add(&mut self, vocab: &Vocabulary, body: Formula, head: Formula) -> Result<()> {
        body.check(vocab)?;
        head.check(vocab)?;
        check_head(&head, vocab)?;
        debug!("add: {} ==> {}", body.display(vocab), head.display(vocab));
        self.push(body, head);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// The binary instrumentation predicate holding the reflexive transitive closure of `p`:
/// either one named `rtc[p]`, or one defined as `v1 == v2 | TC(v1, v2; a, b) p(a, b)`.
fn find_rtc(vocab: &Vocabulary, p: PredicateId) -> Option<PredicateId> {
    if let Some(id) = vocab.lookup(&format!("rtc[{}]", vocab.name(p))) {
        if vocab.arity(id) == 2 {
            return Some(id);
        }
    }
    vocab.instrumentation().filter(|q| q.arity() == 2).find_map(|q| {
        let def = q.definition()?;
        let Formula::Or(a, b) = &def.formula else {
            return None;
        };
        let ((l, r), tc) = match (a.as_ref(), b.as_ref()) {
            (Formula::Equality(l, r), Formula::TransitiveClosure(tc))
            | (Formula::TransitiveClosure(tc), Formula::Equality(l, r)) => ((l, r), tc),
            _ => return None,
        };
        let same_ends = (*l == tc.left && *r == tc.right) || (*l == tc.right && *r == tc.left);
        let params_in_order = def.params == [tc.left.clone(), tc.right.clone()];
        let body = Formula::atom(p, [tc.sub_left.clone(), tc.sub_right.clone()]);
        (same_ends && params_in_order && tc.body == body).then(|| q.id())
    })
}

/// The literals of `formula` if it is a conjunction under existential quantifiers only.
fn existential_conjunction(formula: &Formula) -> Option<Vec<Literal>> {
    fn conjunctive(f: &Formula) -> bool {
        match f {
            Formula::Exists(_, body) => conjunctive(body),
            Formula::And(a, b) => conjunctive(a) && conjunctive(b),
            Formula::Forall(..) | Formula::Or(..) | Formula::Equivalence(..) | Formula::If(..) => false,
            _ => true,
        }
    }
    if !conjunctive(&formula.to_nnf()) {
        return None;
    }
    let mut dnf = formula.to_prenex_dnf();
    if dnf.len() == 1 {
        dnf.pop()
    } else {
        None
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::predicate::Properties;

    fn rendered(set: &ConstraintSet, vocab: &Vocabulary) -> Vec<String> {
        set.iter().map(|c| c.display(vocab).to_string()).collect()
    }

    #[test]
    fn test_builtin_only() {
        let vocab = Vocabulary::new();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(rendered(&set, &vocab), ["sm(v) ==> 0"]);
    }

    #[test]
    fn test_function_acyclic() {
        let mut vocab = Vocabulary::new();
        vocab
            .add(
                "n",
                2,
                Properties {
                    function: true,
                    acyclic: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(
            rendered(&set, &vocab),
            [
                "sm(v) ==> 0",
                "(n(v, v1) & n(v, v2)) ==> v1 == v2",
                "E(v1). (n(v, v1) & v1 != v2) ==> !n(v, v2)",
                "n(v, v) ==> 0",
                "((v1 == v2 | TC(v1, v2; v3, v4) n(v3, v4)) & (v2 == v1 | TC(v2, v1; v3, v4) n(v3, v4))) ==> v1 == v2",
            ]
        );
    }

    #[test]
    fn test_relation_properties() {
        let mut vocab = Vocabulary::new();
        vocab
            .add(
                "r",
                2,
                Properties {
                    invfunction: true,
                    symmetric: true,
                    reflexive: true,
                    transitive: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(
            rendered(&set, &vocab)[1..],
            [
                "(r(v1, v) & r(v2, v)) ==> v1 == v2",
                "E(v1). (r(v1, v) & v1 != v2) ==> !r(v2, v)",
                "r(v1, v2) ==> r(v2, v1)",
                "v1 == v2 ==> r(v1, v2)",
                "E(v2). (r(v1, v2) & r(v2, v3)) ==> r(v1, v3)",
            ]
        );
    }

    #[test]
    fn test_ternary_function() {
        let mut vocab = Vocabulary::new();
        vocab
            .add(
                "f",
                3,
                Properties {
                    function: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(
            rendered(&set, &vocab)[1..],
            [
                "(f(x1, x2, v1) & f(x1, x2, v2)) ==> v1 == v2",
                "E(v1). (f(x1, x2, v1) & v1 != v2) ==> !f(x1, x2, v2)",
            ]
        );
    }

    #[test]
    fn test_instrumentation_constraints() {
        let mut vocab = Vocabulary::new();
        let n = vocab.add("n", 2, Properties::default()).unwrap();
        let (v, w) = (Var::new("v"), Var::new("w"));
        let body = Formula::exists(w.clone(), Formula::atom(n, [w, v.clone()]));
        vocab
            .add_instrumentation("has_pred", vec![v], Properties::abstraction(), body)
            .unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(
            rendered(&set, &vocab)[1..],
            [
                "E(w). n(w, v) ==> has_pred(v)",
                "!E(w). n(w, v) ==> !has_pred(v)",
            ]
        );
    }

    #[test]
    fn test_conjunction_closure() {
        let mut vocab = Vocabulary::new();
        let x = vocab.add("x", 1, Properties::default()).unwrap();
        let y = vocab.add("y", 1, Properties::default()).unwrap();
        let v = Var::new("v");
        let body = Formula::and(Formula::atom(x, [v.clone()]), Formula::atom(y, [v.clone()]));
        vocab.add_instrumentation("h", vec![v], Properties::default(), body).unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(
            rendered(&set, &vocab)[1..],
            [
                "(x(v) & y(v)) ==> h(v)",
                "!(x(v) & y(v)) ==> !h(v)",
                "(!h(v) & y(v)) ==> !x(v)",
                "(!h(v) & x(v)) ==> !y(v)",
            ]
        );
    }

    #[test]
    fn test_negated_disjunction_closure() {
        let mut vocab = Vocabulary::new();
        let x = vocab.add("x", 1, Properties::default()).unwrap();
        let n = vocab.add("n", 2, Properties::default()).unwrap();
        let (v, w) = (Var::new("v"), Var::new("w"));
        // x(v) | n(v, w) for some w: its negation is a conjunction under a universal
        let body = Formula::or(
            Formula::atom(x, [v.clone()]),
            Formula::exists(w.clone(), Formula::atom(n, [v.clone(), w])),
        );
        vocab.add_instrumentation("g", vec![v], Properties::default(), body).unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(set.len(), 1 + 2);

        // Without quantifiers the negation is a plain conjunction
        let mut vocab = Vocabulary::new();
        let x = vocab.add("x", 1, Properties::default()).unwrap();
        let y = vocab.add("y", 1, Properties::default()).unwrap();
        let v = Var::new("v");
        let body = Formula::or(Formula::atom(x, [v.clone()]), Formula::atom(y, [v.clone()]));
        vocab.add_instrumentation("g", vec![v], Properties::default(), body).unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(
            rendered(&set, &vocab)[3..],
            ["(g(v) & !y(v)) ==> x(v)", "(g(v) & !x(v)) ==> y(v)"]
        );
    }

    #[test]
    fn test_existential_closure_hides_variables() {
        let mut vocab = Vocabulary::new();
        let x = vocab.add("x", 1, Properties::default()).unwrap();
        let n = vocab.add("n", 2, Properties::default()).unwrap();
        let (v, w) = (Var::new("v"), Var::new("w"));
        let body = Formula::exists(
            w.clone(),
            Formula::and(Formula::atom(x, [w.clone()]), Formula::atom(n, [w, v.clone()])),
        );
        vocab.add_instrumentation("pointed", vec![v], Properties::default(), body).unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(
            rendered(&set, &vocab)[3..],
            [
                "E(v). (!pointed(v) & n(w, v)) ==> !x(w)",
                "(!pointed(v) & x(w)) ==> !n(w, v)",
            ]
        );
    }

    #[test]
    fn test_universal_subset() {
        let mut vocab = Vocabulary::new();
        let q = vocab.add("q", 2, Properties::default()).unwrap();
        let (v, w) = (Var::new("v"), Var::new("w"));
        let body = Formula::forall(w.clone(), Formula::atom(q, [v.clone(), w]));
        vocab.add_instrumentation("all_q", vec![v], Properties::default(), body).unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(
            rendered(&set, &vocab)[1..],
            [
                "A(w). q(v, w) ==> all_q(v)",
                "!A(w). q(v, w) ==> !all_q(v)",
                "(all_q(v) | q(v, w)) ==> q(v, w)",
            ]
        );
    }

    #[test]
    fn test_acyclic_with_reachability() {
        let mut vocab = Vocabulary::new();
        let n = vocab
            .add(
                "n",
                2,
                Properties {
                    acyclic: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let [v1, v2, a, b] = ["v1", "v2", "a", "b"].map(Var::new);
        let star = Formula::or(
            Formula::eq(v1.clone(), v2.clone()),
            Formula::tc(v1.clone(), v2.clone(), a.clone(), b.clone(), Formula::atom(n, [a, b])),
        );
        vocab.add_instrumentation("r_n", vec![v1, v2], Properties::default(), star).unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(
            rendered(&set, &vocab)[1..4],
            [
                "n(v, v) ==> 0",
                "(r_n(v1, v2) & r_n(v2, v1)) ==> v1 == v2",
                "(r_n(v1, v2) & v1 != v2) ==> !r_n(v2, v1)",
            ]
        );
    }

    #[test]
    fn test_unique_per_component() {
        let mut vocab = Vocabulary::new();
        let n = vocab.add("n", 2, Properties::default()).unwrap();
        vocab
            .add(
                "head",
                1,
                Properties {
                    unique_per_cc: Some(n),
                    ..Default::default()
                },
            )
            .unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        let reach = "(v1 == v2 | TC(v1, v2; v3, v4) n(v3, v4))";
        assert_eq!(
            rendered(&set, &vocab)[1..],
            [
                format!("((head(v1) & {}) & head(v2)) ==> v1 == v2", reach),
                format!("E(v1). ((head(v1) & {}) & v1 != v2) ==> !head(v2)", reach),
                format!("E(v2). ((v1 != v2 & {}) & head(v2)) ==> !head(v1)", reach),
            ]
        );

        // With a named closure, the closure itself can be refuted
        let [v1, v2] = ["v1", "v2"].map(Var::new);
        vocab
            .add_instrumentation("rtc[n]", vec![v1, v2], Properties::default(), Formula::TRUE)
            .unwrap();
        let set = ConstraintSet::from_vocabulary(&vocab);
        assert_eq!(
            rendered(&set, &vocab)[4],
            "((head(v1) & v1 != v2) & head(v2)) ==> !rtc[n](v1, v2)"
        );
    }

    #[test]
    fn test_add_validates() {
        let mut vocab = Vocabulary::new();
        let x = vocab.add("x", 1, Properties::default()).unwrap();
        let n = vocab.add("n", 2, Properties::default()).unwrap();
        let (v, w) = (Var::new("v"), Var::new("w"));
        let mut set = ConstraintSet::new();

        assert!(set
            .add(&vocab, Formula::atom(x, [v.clone()]), Formula::not(Formula::atom(n, [v.clone(), v.clone()])))
            .is_ok());
        assert_eq!(
            set.add(&vocab, Formula::atom(n, [v.clone()]), Formula::FALSE),
            Err(Error::ArityMismatch {
                name: "n".to_string(),
                expected: 2,
                actual: 1
            })
        );
        assert!(matches!(
            set.add(
                &vocab,
                Formula::atom(x, [v.clone()]),
                Formula::or(Formula::atom(x, [v.clone()]), Formula::atom(x, [w.clone()]))
            ),
            Err(Error::UnsupportedConstraintHead(_))
        ));
        assert!(matches!(
            set.add(&vocab, Formula::atom(x, [v.clone()]), Formula::value(Kleene::Unknown)),
            Err(Error::UnsupportedConstraintHead(_))
        ));

        let mut bigger = vocab.clone();
        let y = bigger.add("y", 1, Properties::default()).unwrap();
        assert!(matches!(
            set.add(&vocab, Formula::atom(y, [v]), Formula::FALSE),
            Err(Error::UndeclaredPredicate(_))
        ));
        assert_eq!(set.len(), 1);
    }
}
