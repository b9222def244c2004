//! Focus: case splits that make a formula definite.
//!
//! Focusing a structure `S` on a formula `φ` returns structures `S1..Sk` that together
//! represent exactly the concrete stores of `S`, and under every assignment where `φ` was
//! `1/2` in `S`, it is definite in each `Si`. Summary nodes are bifurcated when a single
//! individual has to be singled out.
//!
//! A formula is compiled once into a [`FocusFormula`]: its prenex DNF, with each disjunct
//! turned into an ordered list of atomic steps. The order makes later literals bind their
//! variables through earlier ones wherever the predicate properties allow it, so that
//! `x(v) & n(v, w)` with a unique `x` and a function `n` only splits the successors of the
//! node pointed to by `x`.
//!
//! # Examples
//!
//! ```
//! use shape_rs::context::AnalysisContext;
//! use shape_rs::formula::{Formula, Var};
//! use shape_rs::kleene::Kleene;
//! use shape_rs::predicate::{Properties, Vocabulary};
//!
//! let mut vocab = Vocabulary::new();
//! let x = vocab.add("x", 1, Properties::abstraction()).unwrap();
//! let ctx = AnalysisContext::new(vocab).unwrap();
//!
//! let mut s = ctx.new_structure();
//! let a = s.new_node();
//! s.update(x, &[a], Kleene::Unknown);
//!
//! let formula = ctx.focus_formula(&Formula::atom(x, [Var::new("v")])).unwrap();
//! let focused = ctx.focus(&s, &formula).unwrap();
//! assert_eq!(focused.len(), 2);
//! assert!(focused.iter().all(|t| t.eval(x, &[a]).is_definite()));
//! ```

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use log::{debug, trace, warn};

use crate::context::AnalysisContext;
use crate::error::{Error, Result};
use crate::eval::Assign;
use crate::formula::{Formula, Literal, Var};
use crate::kleene::Kleene;
use crate::predicate::{PredicateId, Properties, Vocabulary};
use crate::structure::Structure;
use crate::types::{Node, NodeTuple};

/// One atomic literal of a disjunct, with the variable sets of its position.
#[derive(Debug, Clone)]
struct FocusStep {
    predicate: PredicateId,
    properties: Properties,
    vars: Vec<Var>,
    negated: bool,
    /// Variables not mentioned by any earlier step.
    new_vars: BTreeSet<Var>,
    /// Variables already mentioned by an earlier step.
    bound_vars: BTreeSet<Var>,
    /// Variables mentioned by some later step.
    future_vars: BTreeSet<Var>,
    /// Variables mentioned by this or a later step.
    now_and_future_vars: BTreeSet<Var>,
}

impl FocusStep {
    fn new(vocab: &Vocabulary, predicate: PredicateId, vars: Vec<Var>, negated: bool) -> Self {
        FocusStep {
            predicate,
            properties: *vocab.get(predicate).properties(),
            vars,
            negated,
            new_vars: BTreeSet::new(),
            bound_vars: BTreeSet::new(),
            future_vars: BTreeSet::new(),
            now_and_future_vars: BTreeSet::new(),
        }
    }

    fn arity(&self) -> usize {
        self.vars.len()
    }

    fn atom(&self) -> Formula {
        Formula::atom(self.predicate, self.vars.iter().cloned())
    }

    fn literal(&self) -> Formula {
        let atom = self.atom();
        if self.negated {
            Formula::not(atom)
        } else {
            atom
        }
    }

    /// The value of the atom under which the literal holds.
    fn desired(&self) -> Kleene {
        Kleene::from_bool(!self.negated)
    }

    /// Node tuple of the atom under `assign`.
    fn tuple(&self, assign: &Assign) -> NodeTuple {
        NodeTuple::new(self.vars.iter().map(|v| assign.lookup(v)).collect())
    }
}

/// A formula compiled for Focus.
#[derive(Debug, Clone)]
pub struct FocusFormula {
    disjuncts: Vec<Vec<FocusStep>>,
    text: String,
}

impl FocusFormula {
    /// Compiles `formula`, logging a warning for literals whose focus may not terminate.
    ///
    /// Fails on a non-trivial equality, on the constant `1/2`, or on a transitive closure
    /// whose body is not a literal.
    pub fn new(vocab: &Vocabulary, formula: &Formula) -> Result<Self> {
        Self::compile(vocab, formula, false)
    }

    pub(crate) fn compile(vocab: &Vocabulary, formula: &Formula, strict: bool) -> Result<Self> {
        formula.check(vocab)?;
        let dnf = formula.to_prenex_dnf();

        let mut avoid = formula.all_vars();
        for conj in &dnf {
            for literal in conj {
                avoid.extend(literal.atom.all_vars());
            }
        }

        let mut disjuncts = Vec::with_capacity(dnf.len());
        let mut unbound = Vec::new();
        for conj in dnf {
            let (steps, loose) = order_steps(vocab, conj, &mut avoid)?;
            unbound.extend(loose.iter().map(|s| s.literal().display(vocab).to_string()));
            disjuncts.push(steps);
        }
        let text = render(vocab, &disjuncts);

        if !unbound.is_empty() {
            if strict {
                return Err(Error::FocusNonTermination(format!(
                    "unbound literal(s) {} in {}",
                    unbound.join(", "),
                    text
                )));
            }
            warn!(
                "Focus formula {} has unbound literal(s) {}; focusing may produce an unbounded number of structures",
                text,
                unbound.join(", ")
            );
        }
        debug!("Compiled focus formula {} into {}", formula.display(vocab), text);
        Ok(FocusFormula { disjuncts, text })
    }

    pub fn disjunct_count(&self) -> usize {
        self.disjuncts.len()
    }

    /// Total number of atomic steps over all disjuncts.
    pub fn step_count(&self) -> usize {
        self.disjuncts.iter().map(Vec::len).sum()
    }
}

impl fmt::Display for FocusFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn render(vocab: &Vocabulary, disjuncts: &[Vec<FocusStep>]) -> String {
    let parts: Vec<String> = disjuncts
        .iter()
        .map(|steps| {
            if steps.is_empty() {
                "1".to_string()
            } else {
                let literals: Vec<String> = steps.iter().map(|s| s.literal().display(vocab).to_string()).collect();
                literals.join(" & ")
            }
        })
        .collect();
    parts.join(" | ")
}

/// Rewrites a literal into an atomic one, or `None` when it can be dropped.
fn rewrite(vocab: &Vocabulary, literal: Literal, avoid: &mut BTreeSet<Var>) -> Result<Option<FocusStep>> {
    let (atom, negated) = match literal.atom {
        Formula::TransitiveClosure(tc) => {
            let sub_left = tc.sub_left.fresh(avoid);
            avoid.insert(sub_left.clone());
            let sub_right = tc.sub_right.fresh(avoid);
            avoid.insert(sub_right.clone());
            let body = tc
                .body
                .substitute(&tc.sub_left, &sub_left)
                .substitute(&tc.sub_right, &sub_right);
            match body {
                Formula::Not(inner) => (*inner, true),
                body => (body, false),
            }
        }
        atom => (atom, literal.negated),
    };
    match atom {
        Formula::Value(Kleene::Unknown) => Err(Error::IndefiniteFocusConstant),
        Formula::Value(_) => Ok(None),
        Formula::Equality(left, right) if left == right => Ok(None),
        Formula::Equality(..) => Err(Error::NonTrivialFocusEquality(atom.display(vocab).to_string())),
        Formula::Atomic(predicate, vars) => Ok(Some(FocusStep::new(vocab, predicate, vars, negated))),
        other => Err(Error::UnsupportedFocusLiteral(other.display(vocab).to_string())),
    }
}

/// Orders the literals of one disjunct and computes their variable sets.
///
/// Returns the steps and, separately, the unbound steps among them.
fn order_steps(
    vocab: &Vocabulary,
    conj: Vec<Literal>,
    avoid: &mut BTreeSet<Var>,
) -> Result<(Vec<FocusStep>, Vec<FocusStep>)> {
    let mut nullary = Vec::new();
    let mut unique = Vec::new();
    let mut unary = Vec::new();
    let mut rest = Vec::new();
    let mut bound: BTreeSet<Var> = BTreeSet::new();

    for literal in conj {
        let Some(step) = rewrite(vocab, literal, avoid)? else {
            continue;
        };
        match step.arity() {
            0 => nullary.push(step),
            1 if step.properties.unique => {
                if !step.negated {
                    bound.insert(step.vars[0].clone());
                }
                unique.push(step);
            }
            1 => unary.push(step),
            _ => rest.push(step),
        }
    }

    // Binary and k-ary literals, as their variables become bound
    let mut chained = Vec::new();
    loop {
        let mut changed = false;
        let mut i = 0;
        while i < rest.len() {
            let step = &rest[i];
            let take = if step.arity() == 2 {
                if bound.contains(&step.vars[0]) {
                    if step.properties.function && !step.negated {
                        bound.insert(step.vars[1].clone());
                    }
                    true
                } else if bound.contains(&step.vars[1]) {
                    if step.properties.invfunction && !step.negated {
                        bound.insert(step.vars[0].clone());
                    }
                    true
                } else {
                    false
                }
            } else {
                step.vars.iter().all(|v| bound.contains(v))
            };
            if take {
                chained.push(rest.remove(i));
                changed = true;
            } else {
                i += 1;
            }
        }
        if !changed {
            break;
        }
    }

    let (mut seeded, loose): (Vec<FocusStep>, Vec<FocusStep>) = rest
        .into_iter()
        .partition(|s| s.arity() == 2 && !s.negated && (s.properties.function || s.properties.invfunction));
    chained.append(&mut seeded);

    let mut steps: Vec<FocusStep> = nullary
        .into_iter()
        .chain(unique)
        .chain(unary)
        .chain(chained)
        .chain(loose.iter().cloned())
        .collect();

    let mut seen: BTreeSet<Var> = BTreeSet::new();
    for step in steps.iter_mut() {
        let vars: BTreeSet<Var> = step.vars.iter().cloned().collect();
        step.new_vars = vars.difference(&seen).cloned().collect();
        step.bound_vars = vars.intersection(&seen).cloned().collect();
        seen.extend(vars);
    }
    let mut later: BTreeSet<Var> = BTreeSet::new();
    for step in steps.iter_mut().rev() {
        step.future_vars = later.clone();
        later.extend(step.vars.iter().cloned());
        step.now_and_future_vars = later.clone();
    }

    Ok((steps, loose))
}

/// Distinct assignments, in first-seen order.
fn distinct(assigns: impl IntoIterator<Item = Assign>) -> Vec<Assign> {
    let mut seen = BTreeSet::new();
    assigns.into_iter().filter(|a| seen.insert(a.clone())).collect()
}

/// At most one summary node per tuple can be bifurcated.
fn focusable(structure: &Structure, tuple: &NodeTuple) -> bool {
    tuple.nodes().iter().filter(|&&n| structure.is_summary(n)).count() <= 1
}

impl AnalysisContext {
    /// Compiles `formula`, honoring [`Config::strict_focus`][crate::context::Config::strict_focus].
    pub fn focus_formula(&self, formula: &Formula) -> Result<FocusFormula> {
        FocusFormula::compile(self.vocabulary(), formula, self.config().strict_focus)
    }

    /// Focuses `structure` on `formula`.
    ///
    /// The input is not modified. Fails only under
    /// [`Config::strict_focus`][crate::context::Config::strict_focus], when a tuple cannot be
    /// materialized in a bounded number of structures.
    pub fn focus(&self, structure: &Structure, formula: &FocusFormula) -> Result<Vec<Structure>> {
        let mut pending = vec![structure.clone()];
        for steps in &formula.disjuncts {
            let mut next = Vec::new();
            for s in pending {
                self.focus_steps(steps, s, vec![Assign::new()], &mut next)?;
            }
            pending = next;
        }
        debug!("focus on {}: {} structure(s)", formula, pending.len());
        Ok(pending)
    }

    /// Applies `formulas` in order, each to every output of the previous one.
    ///
    /// Before each formula, structures in which `filter` has no non-false assignment are
    /// dropped, so a branch that falsifies the filter is never materialized further.
    pub fn focus_all(
        &self,
        structure: &Structure,
        formulas: &[FocusFormula],
        filter: Option<&Formula>,
    ) -> Result<Vec<Structure>> {
        let passes = |s: &Structure| match filter {
            Some(filter) => !s.satisfying_assignments(filter, &Assign::new()).is_empty(),
            None => true,
        };
        if !passes(structure) {
            trace!("focus_all: filter does not hold on the input");
            return Ok(Vec::new());
        }

        let mut work = vec![structure.clone()];
        if self.config().focus_on_active {
            let maybe: Vec<Node> = structure
                .nodes()
                .filter(|&n| structure.eval(Vocabulary::ACTIVE, &[n]) == Kleene::Unknown)
                .collect();
            work = self.split_active(structure.clone(), &maybe);
        }

        for (i, formula) in formulas.iter().enumerate() {
            let before = work.len();
            work.retain(|s| passes(s));
            if work.len() < before {
                trace!("focus_all: filter drops {} structure(s) before {}", before - work.len(), formula);
            }
            let mut next = Vec::new();
            for s in &work {
                next.extend(self.focus(s, formula)?);
            }
            if self.config().coerce_after_focus && i + 1 < formulas.len() {
                self.coerce_all(&mut next);
            }
            work = next;
        }
        Ok(work)
    }

    fn focus_steps(&self, steps: &[FocusStep], s: Structure, assigns: Vec<Assign>, out: &mut Vec<Structure>) -> Result<()> {
        let Some((step, rest)) = steps.split_first() else {
            out.push(s);
            return Ok(());
        };
        for (t, next) in self.focus_step(step, s, assigns)? {
            self.focus_steps(rest, t, next, out)?;
        }
        Ok(())
    }

    /// Focuses one literal under every relevant assignment, and extends the assignments
    /// with the bindings under which the literal holds.
    fn focus_step(&self, step: &FocusStep, s: Structure, assigns: Vec<Assign>) -> Result<Vec<(Structure, Vec<Assign>)>> {
        let assigns = distinct(assigns.iter().map(|a| a.project(&step.now_and_future_vars)));
        if assigns.is_empty() {
            return Ok(vec![(s, assigns)]);
        }
        let relevants = distinct(assigns.iter().map(|a| a.project(&step.bound_vars)));

        let mut work = vec![s];
        for relevant in &relevants {
            let mut next = Vec::new();
            for t in work {
                if !relevant.nodes().all(|n| t.contains(n)) {
                    next.push(t);
                    continue;
                }
                let split = if self.config().focus_on_active {
                    self.focus_active(step, t, relevant)
                } else {
                    vec![t]
                };
                for u in split {
                    next.extend(self.focus_literal(step, u, relevant)?);
                }
            }
            work = next;
        }

        let atom = step.atom();
        let mut out = Vec::with_capacity(work.len());
        for t in work {
            let mut next = Vec::new();
            for a in &assigns {
                if !a.nodes().all(|n| t.contains(n)) {
                    continue;
                }
                for e in t.assignments_with(&atom, &a.project(&step.bound_vars), step.desired()) {
                    let mut combined = e;
                    combined.extend(a);
                    next.push(combined.project(&step.future_vars));
                }
            }
            out.push((t, distinct(next)));
        }
        Ok(out)
    }

    fn focus_literal(&self, step: &FocusStep, t: Structure, relevant: &Assign) -> Result<Vec<Structure>> {
        let props = &step.properties;
        match step.arity() {
            0 => Ok(self.focus_nullary(step, t)),
            1 if props.unique => Ok(self.focus_unique(step, t, relevant)),
            1 => Ok(self.focus_unary(step, t, relevant)),
            2 => {
                let left = relevant.contains(&step.vars[0]);
                let right = relevant.contains(&step.vars[1]);
                if props.function && left && !right {
                    self.focus_function(step, t, relevant)
                } else if props.invfunction && right && !left {
                    self.focus_invfunction(step, t, relevant)
                } else {
                    self.focus_worklist(step, t, relevant)
                }
            }
            _ => self.focus_worklist(step, t, relevant),
        }
    }

    /// Unknown tuples of the step's atom under `relevant`.
    fn problems(&self, step: &FocusStep, t: &Structure, relevant: &Assign) -> Vec<NodeTuple> {
        t.assignments_with(&step.atom(), relevant, Kleene::Unknown)
            .iter()
            .map(|a| step.tuple(a))
            .collect()
    }

    /// Splits the maybe-active nodes bound to the step's new variables.
    fn focus_active(&self, step: &FocusStep, t: Structure, relevant: &Assign) -> Vec<Structure> {
        let mut maybe = BTreeSet::new();
        for (a, _) in t.satisfying_assignments(&step.literal(), relevant) {
            for v in &step.new_vars {
                let n = a.lookup(v);
                if t.eval(Vocabulary::ACTIVE, &[n]) == Kleene::Unknown && !relevant.nodes().any(|m| m == n) {
                    maybe.insert(n);
                }
            }
        }
        let maybe: Vec<Node> = maybe.into_iter().collect();
        self.split_active(t, &maybe)
    }

    /// One structure per subset of `nodes`: the subset is kept and made active, the rest removed.
    fn split_active(&self, t: Structure, nodes: &[Node]) -> Vec<Structure> {
        let mut out = vec![t];
        for &n in nodes {
            let mut next = Vec::with_capacity(out.len() * 2);
            for s in out {
                let mut gone = s.clone();
                gone.remove_node(n);
                next.push(gone);
                let mut kept = s;
                kept.update(Vocabulary::ACTIVE, &[n], Kleene::True);
                next.push(kept);
            }
            out = next;
        }
        if !nodes.is_empty() {
            trace!("split {} maybe-active node(s) into {} structure(s)", nodes.len(), out.len());
        }
        out
    }

    fn focus_nullary(&self, step: &FocusStep, t: Structure) -> Vec<Structure> {
        if t.eval(step.predicate, &[]) != Kleene::Unknown {
            return vec![t];
        }
        let mut yes = t.clone();
        yes.update(step.predicate, &[], Kleene::True);
        let mut no = t;
        no.update(step.predicate, &[], Kleene::False);
        vec![yes, no]
    }

    fn focus_unique(&self, step: &FocusStep, t: Structure, relevant: &Assign) -> Vec<Structure> {
        let p = step.predicate;
        let problems: Vec<Node> = self.problems(step, &t, relevant).iter().map(|u| u.get(0)).collect();
        if problems.is_empty() {
            return vec![t];
        }

        let mut without = t.clone();
        for &n in &problems {
            without.update(p, &[n], Kleene::False);
        }
        if !t.assignments_with(&step.atom(), relevant, Kleene::True).is_empty() {
            return vec![without];
        }

        // Once one node definitely has `p`, no other node can
        let mut cleared = without.clone();
        let unknown: Vec<Node> = t
            .satisfying(p)
            .filter(|(_, v)| *v == Kleene::Unknown)
            .map(|(u, _)| u.get(0))
            .collect();
        for &n in &unknown {
            cleared.update(p, &[n], Kleene::False);
        }

        let mut answer = vec![without];
        for &n in &problems {
            let mut with = cleared.clone();
            with.update(p, &[n], Kleene::True);
            with.update(Vocabulary::SM, &[n], Kleene::False);
            answer.push(with);
            if t.is_summary(n) {
                let mut split = cleared.clone();
                let copy = split.duplicate_node(n);
                split.update(p, &[copy], Kleene::True);
                split.update(Vocabulary::SM, &[copy], Kleene::False);
                answer.push(split);
            }
        }
        answer
    }

    fn focus_unary(&self, step: &FocusStep, t: Structure, relevant: &Assign) -> Vec<Structure> {
        let p = step.predicate;
        let mut work = VecDeque::from([t]);
        let mut answer = Vec::new();
        while let Some(cur) = work.pop_front() {
            let Some(n) = self.problems(step, &cur, relevant).first().map(|u| u.get(0)) else {
                answer.push(cur);
                continue;
            };
            let mut without = cur.clone();
            without.update(p, &[n], Kleene::False);
            let split = cur.is_summary(n).then(|| {
                let mut split = cur.clone();
                let copy = split.duplicate_node(n);
                split.update(p, &[copy], Kleene::True);
                split.update(p, &[n], Kleene::False);
                split
            });
            let mut with = cur;
            with.update(p, &[n], Kleene::True);

            work.push_back(without);
            work.push_back(with);
            work.extend(split);
        }
        answer
    }

    /// The general case: split the first focusable unknown tuple until none is left.
    fn focus_worklist(&self, step: &FocusStep, t: Structure, relevant: &Assign) -> Result<Vec<Structure>> {
        let mut work = VecDeque::from([t]);
        let mut answer = Vec::new();
        let mut reported = false;
        while let Some(cur) = work.pop_front() {
            let mut chosen = None;
            for tuple in self.problems(step, &cur, relevant) {
                if focusable(&cur, &tuple) {
                    chosen = Some(tuple);
                    break;
                }
                if !reported {
                    self.report_unfocusable(step, &cur, &tuple)?;
                    reported = true;
                }
            }
            match chosen {
                Some(tuple) => work.extend(self.split_tuple(step, &cur, &tuple)),
                None => answer.push(cur),
            }
        }
        Ok(answer)
    }

    fn split_tuple(&self, step: &FocusStep, cur: &Structure, tuple: &NodeTuple) -> Vec<Structure> {
        let p = step.predicate;
        let props = &step.properties;
        let mut out = Vec::new();
        let self_loop = tuple.nodes().iter().all(|&n| n == tuple.get(0));
        if !(props.reflexive && self_loop) {
            let mut without = cur.clone();
            without.update(p, tuple.nodes(), Kleene::False);
            out.push(without);
        }

        if tuple.arity() != 2 {
            let mut with = cur.clone();
            with.update(p, tuple.nodes(), Kleene::True);
            out.push(with);
            if let Some(&n) = tuple.nodes().iter().find(|&&n| cur.is_summary(n)) {
                let mut split = cur.clone();
                let copy = split.duplicate_node(n);
                split.update(p, tuple.substitute(n, copy).nodes(), Kleene::True);
                split.update(p, tuple.nodes(), Kleene::False);
                out.push(split);
            }
            return out;
        }

        let (l, r) = (tuple.get(0), tuple.get(1));
        let mut base = cur.clone();
        if props.function && !cur.is_summary(l) {
            for (u, v) in cur.satisfying(p) {
                if u.get(0) == l && u.get(1) != r && v == Kleene::Unknown {
                    base.update(p, u.nodes(), Kleene::False);
                }
            }
        } else if props.invfunction && !cur.is_summary(r) {
            for (u, v) in cur.satisfying(p) {
                if u.get(1) == r && u.get(0) != l && v == Kleene::Unknown {
                    base.update(p, u.nodes(), Kleene::False);
                }
            }
        }
        self.focus_edge(step, &base, l, r, &mut out);
        out
    }

    /// Materializes the edge `(l, r)`. At most one endpoint may be a summary node.
    fn focus_edge(&self, step: &FocusStep, s: &Structure, l: Node, r: Node, out: &mut Vec<Structure>) {
        let p = step.predicate;
        let props = &step.properties;
        let (left_summary, right_summary) = (s.is_summary(l), s.is_summary(r));
        debug_assert!(!(left_summary && right_summary), "Edge {}->{} joins two summary nodes", l, r);

        let mut with = s.clone();
        with.update(p, &[l, r], Kleene::True);
        if props.function && right_summary {
            with.update(Vocabulary::SM, &[r], Kleene::False);
        }
        if props.invfunction && left_summary {
            with.update(Vocabulary::SM, &[l], Kleene::False);
        }
        out.push(with);

        if right_summary {
            let mut split = s.clone();
            let copy = split.duplicate_node(r);
            split.update(p, &[l, copy], Kleene::True);
            split.update(p, &[l, r], Kleene::False);
            if props.function {
                split.update(Vocabulary::SM, &[copy], Kleene::False);
            }
            out.push(split);
        }
        if left_summary {
            let mut split = s.clone();
            let copy = split.duplicate_node(l);
            split.update(p, &[copy, r], Kleene::True);
            split.update(p, &[l, r], Kleene::False);
            if props.invfunction {
                split.update(Vocabulary::SM, &[copy], Kleene::False);
            }
            out.push(split);
        }
    }

    /// Function predicate with a bound, non-summary left side: it has no successor, or
    /// exactly one of the unknown ones.
    fn focus_function(&self, step: &FocusStep, t: Structure, relevant: &Assign) -> Result<Vec<Structure>> {
        let l = relevant.lookup(&step.vars[0]);
        if t.is_summary(l) {
            return self.focus_worklist(step, t, relevant);
        }
        let problems = self.problems(step, &t, relevant);
        if problems.is_empty() {
            return Ok(vec![t]);
        }
        let targets: Vec<Node> = problems.iter().map(|u| u.get(1)).collect();
        self.focus_single(step, t, l, &targets, true)
    }

    /// Invfunction predicate with a bound, non-summary right side.
    fn focus_invfunction(&self, step: &FocusStep, t: Structure, relevant: &Assign) -> Result<Vec<Structure>> {
        let r = relevant.lookup(&step.vars[1]);
        if t.is_summary(r) {
            return self.focus_worklist(step, t, relevant);
        }
        let problems = self.problems(step, &t, relevant);
        if problems.is_empty() {
            return Ok(vec![t]);
        }
        let sources: Vec<Node> = problems.iter().map(|u| u.get(0)).collect();
        self.focus_single(step, t, r, &sources, false)
    }

    /// Shared body of the function and invfunction cases: `fixed` is the bound endpoint
    /// (the source when `forward`), `others` the far endpoints of its unknown edges.
    fn focus_single(
        &self,
        step: &FocusStep,
        t: Structure,
        fixed: Node,
        others: &[Node],
        forward: bool,
    ) -> Result<Vec<Structure>> {
        let p = step.predicate;
        let at = if forward { 0 } else { 1 };
        let edge = |other: Node| if forward { (fixed, other) } else { (other, fixed) };

        let mut without = t.clone();
        let mut definite = false;
        for (u, v) in t.satisfying(p) {
            if u.get(at) != fixed {
                continue;
            }
            match v {
                Kleene::Unknown => without.update(p, u.nodes(), Kleene::False),
                Kleene::True => definite = true,
                Kleene::False => {}
            }
        }
        if definite {
            return Ok(vec![without]);
        }

        let mut answer = vec![without.clone()];
        for &other in others {
            let (l, r) = edge(other);
            let tuple = NodeTuple::pair(l, r);
            if focusable(&t, &tuple) {
                self.focus_edge(step, &without, l, r, &mut answer);
            } else {
                self.report_unfocusable(step, &t, &tuple)?;
                let mut kept = without.clone();
                kept.update(p, &[l, r], Kleene::Unknown);
                answer.push(kept);
            }
        }
        Ok(answer)
    }

    fn report_unfocusable(&self, step: &FocusStep, s: &Structure, tuple: &NodeTuple) -> Result<()> {
        let what = format!("{} on {}", self.vocabulary().name(step.predicate), tuple);
        if self.config().strict_focus {
            return Err(Error::FocusNonTermination(what));
        }
        warn!(
            "Focusing {} would produce an unbounded number of structures; leaving it indefinite in:\n{}",
            what,
            s.display(self.vocabulary())
        );
        Ok(())
    }
}
