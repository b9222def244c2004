//! Constraint propagation.
//!
//! Coerce sharpens a structure with the constraints of its [`AnalysisContext`]: whenever a
//! constraint body is definitely true, its head must hold, so an unknown head atom is forced
//! to the required value. A head that is definitely violated makes the structure infeasible.
//!
//! Propagation is incremental. A structure records which predicates changed since it was
//! last coerced, and only constraints reading one of those predicates are checked first.
//! Every forced value re-queues the constraints that read the forced predicate, until a
//! fixpoint is reached.
//!
//! ```
//! use shape_rs::context::AnalysisContext;
//! use shape_rs::kleene::Kleene;
//! use shape_rs::predicate::{Properties, Vocabulary};
//!
//! let mut vocab = Vocabulary::new();
//! let x = vocab.add("x", 1, Properties { unique: true, ..Default::default() }).unwrap();
//! let ctx = AnalysisContext::new(vocab).unwrap();
//!
//! let mut s = ctx.new_structure();
//! let a = s.new_node();
//! let b = s.new_node();
//! s.update(x, &[a], Kleene::True);
//! s.update(x, &[b], Kleene::Unknown);
//!
//! assert!(ctx.coerce(&mut s));
//! assert_eq!(s.eval(x, &[b]), Kleene::False);
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::{debug, trace, warn};

use crate::constraints::{check_head, Constraint, ConstraintSet};
use crate::context::AnalysisContext;
use crate::error::{Error, Result};
use crate::eval::Assign;
use crate::formula::{Formula, Var};
use crate::kleene::Kleene;
use crate::predicate::{PredicateId, Vocabulary};
use crate::structure::Structure;
use crate::types::NodeTuple;

/// What must hold whenever a body is definitely true.
#[derive(Debug, Clone)]
enum Head {
    /// Never satisfiable.
    Breach,
    /// `p(vars) = value`.
    Literal {
        predicate: PredicateId,
        vars: Vec<Var>,
        value: Kleene,
    },
    /// `left == right`, or `left != right` when negated.
    Equality { left: Var, right: Var, negated: bool },
}

#[derive(Debug, Clone)]
struct Rule {
    body: Formula,
    head: Head,
    /// Head variables not bound by the body, ranging over all nodes.
    only_head: Vec<Var>,
    reads: BTreeSet<PredicateId>,
    label: String,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Outcome {
    Unmodified,
    Modified,
    Invalid,
}

/// The compiled constraints of one analysis.
#[derive(Debug, Clone)]
pub(crate) struct Coercer {
    rules: Vec<Rule>,
    /// For each predicate, the rules reading it.
    dependents: BTreeMap<PredicateId, Vec<usize>>,
}

impl Coercer {
    pub(crate) fn new(vocab: &Vocabulary, constraints: &ConstraintSet) -> Result<Self> {
        let mut rules = Vec::new();
        for constraint in constraints {
            if let Some(rule) = Self::compile(vocab, constraint)? {
                rules.push(rule);
            }
        }
        let mut dependents: BTreeMap<PredicateId, Vec<usize>> = BTreeMap::new();
        for (i, rule) in rules.iter().enumerate() {
            for &p in &rule.reads {
                dependents.entry(p).or_default().push(i);
            }
        }
        debug!("Coercer::new: {} rule(s) from {} constraint(s)", rules.len(), constraints.len());
        Ok(Coercer { rules, dependents })
    }

    fn compile(vocab: &Vocabulary, constraint: &Constraint) -> Result<Option<Rule>> {
        let label = constraint.display(vocab).to_string();
        constraint.body.check(vocab)?;
        constraint.head.check(vocab)?;
        check_head(&constraint.head, vocab)?;

        let (inner, negated) = match &constraint.head {
            Formula::Not(inner) => (inner.as_ref(), true),
            other => (other, false),
        };
        let mut reads = constraint.body.reads();
        reads.insert(Vocabulary::ACTIVE);
        let head = match inner {
            Formula::Value(k) => {
                if (*k == Kleene::True) != negated {
                    debug!("compile: dropping trivially satisfied constraint {}", label);
                    return Ok(None);
                }
                Head::Breach
            }
            Formula::Atomic(p, vars) => {
                reads.insert(*p);
                Head::Literal {
                    predicate: *p,
                    vars: vars.clone(),
                    value: Kleene::from_bool(!negated),
                }
            }
            Formula::Equality(l, r) => {
                reads.insert(Vocabulary::SM);
                Head::Equality {
                    left: l.clone(),
                    right: r.clone(),
                    negated,
                }
            }
            _ => return Err(Error::UnsupportedConstraintHead(label)),
        };
        let body_vars = constraint.body.free_vars();
        let only_head = constraint
            .head
            .free_vars()
            .into_iter()
            .filter(|v| !body_vars.contains(v))
            .collect();

        Ok(Some(Rule {
            body: constraint.body.clone(),
            head,
            only_head,
            reads,
            label,
        }))
    }

    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }

    /// Runs propagation to a fixpoint. Returns false if the structure is infeasible.
    pub(crate) fn coerce(&self, structure: &mut Structure) -> bool {
        let mut queued = vec![false; self.rules.len()];
        let mut worklist = VecDeque::new();
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.reads.iter().any(|p| structure.is_modified(*p)) {
                queued[i] = true;
                worklist.push_back(i);
            }
        }
        trace!("coerce: {} of {} rule(s) initially queued", worklist.len(), self.rules.len());

        while let Some(i) = worklist.pop_front() {
            queued[i] = false;
            let before = structure.modified().clone();
            structure.clear_modified();
            let outcome = self.apply(&self.rules[i], structure);
            let forced = structure.modified().clone();
            for p in before {
                structure.mark_modified(p);
            }
            match outcome {
                Outcome::Invalid => return false,
                Outcome::Unmodified => {}
                Outcome::Modified => {
                    for p in &forced {
                        for &j in self.dependents.get(p).into_iter().flatten() {
                            if !queued[j] {
                                queued[j] = true;
                                worklist.push_back(j);
                            }
                        }
                    }
                }
            }
        }
        structure.clear_modified();
        true
    }

    fn apply(&self, rule: &Rule, structure: &mut Structure) -> Outcome {
        let mut total = Outcome::Unmodified;
        let nodes = structure.node_list();
        'bodies: for body_assign in structure.assignments_with(&rule.body, &Assign::new(), Kleene::True) {
            for n in body_assign.nodes() {
                if structure.eval(Vocabulary::ACTIVE, &[n]) == Kleene::Unknown {
                    continue 'bodies;
                }
            }
            for tuple in NodeTuple::all(&nodes, rule.only_head.len()) {
                let mut assign = body_assign.clone();
                for (v, &n) in rule.only_head.iter().zip(tuple.nodes()) {
                    assign.put(v.clone(), n);
                }
                match Self::enforce(rule, structure, &assign) {
                    Outcome::Invalid => {
                        debug!("Constraint breached: {} on assignment {}", rule.label, assign);
                        return Outcome::Invalid;
                    }
                    Outcome::Modified => total = Outcome::Modified,
                    Outcome::Unmodified => {}
                }
            }
        }
        total
    }

    fn enforce(rule: &Rule, structure: &mut Structure, assign: &Assign) -> Outcome {
        let lookup = |v: &Var| {
            assign
                .get(v)
                .unwrap_or_else(|| panic!("Variable {} missing from assignment {}", v, assign))
        };
        match &rule.head {
            Head::Breach => Outcome::Invalid,
            Head::Literal { predicate, vars, value } => {
                let tuple: Vec<_> = vars.iter().map(lookup).collect();
                let current = structure.eval(*predicate, &tuple);
                if current == *value {
                    Outcome::Unmodified
                } else if current == Kleene::Unknown {
                    trace!("enforce: {} forces {:?} to {}", rule.label, tuple, value);
                    structure.update(*predicate, &tuple, *value);
                    Outcome::Modified
                } else {
                    Outcome::Invalid
                }
            }
            Head::Equality { left, right, negated } => {
                let l = lookup(left);
                let r = lookup(right);
                match (*negated, l == r) {
                    (true, true) => Outcome::Invalid,
                    (true, false) => Outcome::Unmodified,
                    (false, false) => Outcome::Invalid,
                    (false, true) => {
                        if structure.eval(Vocabulary::SM, &[l]) == Kleene::Unknown {
                            structure.update(Vocabulary::SM, &[l], Kleene::False);
                            Outcome::Modified
                        } else {
                            Outcome::Unmodified
                        }
                    }
                }
            }
        }
    }
}

impl AnalysisContext {
    /// Propagates the context's constraints on `structure` in place.
    ///
    /// Returns `false` if some constraint cannot hold however the remaining unknown values
    /// are resolved; the caller must then discard the structure. On success the
    /// structure's modified set is cleared, so coercing it again is a no-op.
    pub fn coerce(&self, structure: &mut Structure) -> bool {
        self.coercer().coerce(structure)
    }

    /// Coerces every structure, removing the infeasible ones. Returns the number removed.
    pub fn coerce_all(&self, structures: &mut Vec<Structure>) -> usize {
        let before = structures.len();
        structures.retain_mut(|s| {
            let diagnostic = self.config().coerce_diagnostics.then(|| s.clone());
            let feasible = self.coerce(s);
            if !feasible {
                if let Some(original) = diagnostic {
                    debug!("coerce_all: rejected structure\n{}", original.display(self.vocabulary()));
                }
            }
            feasible
        });
        before - structures.len()
    }

    /// Coerces the first structures of an analysis, checking every constraint regardless
    /// of what the structures record as modified.
    ///
    /// Rejected structures are reported with a `warn` listing. Returns the number removed.
    pub fn coerce_initial(&self, structures: &mut Vec<Structure>) -> usize {
        let total = structures.len();
        let mut rejected = Vec::new();
        structures.retain_mut(|s| {
            s.mark_all_modified();
            let original = s.clone();
            let feasible = self.coerce(s);
            if !feasible {
                rejected.push(original);
            }
            feasible
        });

        if !rejected.is_empty() {
            let mut listing = String::new();
            for s in &rejected {
                listing.push_str(&s.display(self.vocabulary()).to_string());
            }
            warn!(
                "The following {} structures are inconsistent with the instrumentation constraints:\n{}",
                rejected.len(),
                listing
            );
            if rejected.len() == total {
                warn!("All input structures are inconsistent with the instrumentation constraints!");
            }
        }
        rejected.len()
    }
}
