//! Predicates and the analysis vocabulary.
//!
//! A [`Vocabulary`] is the ordered list of relations a structure interprets. Its order is
//! significant: canonical signatures add predicate contributions in vocabulary order, so
//! signatures of different nodes (and of different structures built over the same
//! vocabulary) are comparable.
//!
//! Two predicates are always present:
//!
//! - [`Vocabulary::SM`] (`sm`): a node with `sm = 1/2` is a *summary node* that may stand for
//!   more than one concrete individual.
//! - [`Vocabulary::ACTIVE`] (`active`): whether the node exists. It is `1` for every node
//!   created by [`Structure::new_node`][crate::structure::Structure::new_node]; it is only
//!   `1/2` in structures produced by join strategies that admit maybe-absent nodes.
//!
//! # Examples
//!
//! ```
//! use shape_rs::predicate::{Properties, Vocabulary};
//!
//! let mut vocab = Vocabulary::new();
//! let x = vocab.add("x", 1, Properties { unique: true, abstraction: true, ..Default::default() }).unwrap();
//! let next = vocab.add("n", 2, Properties { function: true, acyclic: true, ..Default::default() }).unwrap();
//!
//! assert_eq!(vocab.get(x).arity(), 1);
//! assert!(vocab.get(next).properties().function);
//! assert_eq!(vocab.lookup("n"), Some(next));
//! assert!(vocab.add("x", 1, Properties::default()).is_err());
//! ```

use std::collections::HashMap;
use std::fmt;

use num_bigint::BigUint;

use crate::error::{Error, Result};
use crate::formula::{Formula, Var};

/// Index of a predicate in its [`Vocabulary`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PredicateId(usize);

impl PredicateId {
    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        PredicateId(index)
    }
}

impl fmt::Display for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declared properties of a predicate.
///
/// These drive both the automatically generated constraints (see
/// [`ConstraintSet::from_vocabulary`][crate::constraints::ConstraintSet::from_vocabulary])
/// and the choice of materialization strategy in Focus.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Properties {
    /// Participates in canonical signatures (Blur).
    pub abstraction: bool,
    /// Unary: true for at most one individual.
    pub unique: bool,
    /// Binary (or k-ary): each left side has at most one right side.
    pub function: bool,
    /// Binary: each right side has at most one left side.
    pub invfunction: bool,
    pub reflexive: bool,
    pub antireflexive: bool,
    pub symmetric: bool,
    pub antisymmetric: bool,
    pub transitive: bool,
    pub acyclic: bool,
    /// Unary: true for at most one individual of each component connected by the given
    /// binary predicate.
    pub unique_per_cc: Option<PredicateId>,
}

impl Properties {
    /// Shorthand for an abstraction predicate with no other property.
    pub fn abstraction() -> Self {
        Properties {
            abstraction: true,
            ..Default::default()
        }
    }
}

/// A named relation of fixed arity.
#[derive(Debug, Clone)]
pub struct Predicate {
    id: PredicateId,
    name: String,
    arity: usize,
    properties: Properties,
    definition: Option<Definition>,
}

/// The defining formula of an instrumentation predicate, `p(params) := formula`.
#[derive(Debug, Clone)]
pub struct Definition {
    pub params: Vec<Var>,
    pub formula: Formula,
}

impl Predicate {
    pub fn id(&self) -> PredicateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn is_abstraction(&self) -> bool {
        self.properties.abstraction
    }

    pub fn is_instrumentation(&self) -> bool {
        self.definition.is_some()
    }

    pub fn definition(&self) -> Option<&Definition> {
        self.definition.as_ref()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The ordered set of predicates of one analysis.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    predicates: Vec<Predicate>,
    by_name: HashMap<String, PredicateId>,
}

impl Vocabulary {
    /// The summary predicate `sm`.
    pub const SM: PredicateId = PredicateId(0);
    /// The existence predicate `active`.
    pub const ACTIVE: PredicateId = PredicateId(1);

    /// Creates a vocabulary holding only the built-in predicates.
    pub fn new() -> Self {
        let mut vocab = Vocabulary {
            predicates: Vec::new(),
            by_name: HashMap::new(),
        };
        vocab.push("sm", 1, Properties::default(), None);
        vocab.push("active", 1, Properties::default(), None);
        debug_assert_eq!(vocab.lookup("sm"), Some(Self::SM));
        debug_assert_eq!(vocab.lookup("active"), Some(Self::ACTIVE));
        vocab
    }

    fn push(&mut self, name: &str, arity: usize, properties: Properties, definition: Option<Definition>) -> PredicateId {
        let id = PredicateId(self.predicates.len());
        self.predicates.push(Predicate {
            id,
            name: name.to_string(),
            arity,
            properties,
            definition,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Declares a new core predicate.
    pub fn add(&mut self, name: &str, arity: usize, properties: Properties) -> Result<PredicateId> {
        if self.by_name.contains_key(name) {
            return Err(Error::DuplicatePredicate(name.to_string()));
        }
        self.check_properties(name, arity, &properties)?;
        Ok(self.push(name, arity, properties, None))
    }

    fn check_properties(&self, name: &str, arity: usize, properties: &Properties) -> Result<()> {
        if let Some(cc) = properties.unique_per_cc {
            if arity != 1 {
                return Err(Error::InvalidProperty {
                    name: name.to_string(),
                    reason: "uniqueness per component applies to unary predicates".to_string(),
                });
            }
            if !self.contains(cc) {
                return Err(Error::UndeclaredPredicate(cc.to_string()));
            }
            if self.arity(cc) != 2 {
                return Err(Error::InvalidProperty {
                    name: name.to_string(),
                    reason: format!("components are connected by '{}', which is not binary", self.name(cc)),
                });
            }
        }
        Ok(())
    }

    /// Declares an instrumentation predicate `name(params) := formula`.
    ///
    /// The defining formula must only mention declared predicates, and its free variables
    /// must be among `params`.
    pub fn add_instrumentation(
        &mut self,
        name: &str,
        params: Vec<Var>,
        properties: Properties,
        formula: Formula,
    ) -> Result<PredicateId> {
        if self.by_name.contains_key(name) {
            return Err(Error::DuplicatePredicate(name.to_string()));
        }
        formula.check(self)?;
        self.check_properties(name, params.len(), &properties)?;
        if let Some(var) = formula.free_vars().into_iter().find(|v| !params.contains(v)) {
            return Err(Error::UnboundDefinitionVariable {
                name: name.to_string(),
                var: var.to_string(),
            });
        }
        let arity = params.len();
        Ok(self.push(name, arity, properties, Some(Definition { params, formula })))
    }

    /// Returns the predicate with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this vocabulary.
    pub fn get(&self, id: PredicateId) -> &Predicate {
        assert!(id.0 < self.predicates.len(), "Unknown predicate {}", id);
        &self.predicates[id.0]
    }

    pub fn contains(&self, id: PredicateId) -> bool {
        id.0 < self.predicates.len()
    }

    pub fn lookup(&self, name: &str) -> Option<PredicateId> {
        self.by_name.get(name).copied()
    }

    /// Like [`lookup`][Self::lookup], but reports a missing name as an error.
    pub fn predicate(&self, name: &str) -> Result<PredicateId> {
        self.lookup(name)
            .ok_or_else(|| Error::UndeclaredPredicate(name.to_string()))
    }

    pub fn name(&self, id: PredicateId) -> &str {
        self.get(id).name()
    }

    pub fn arity(&self, id: PredicateId) -> usize {
        self.get(id).arity()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// All predicates in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }

    pub fn nullary(&self) -> impl Iterator<Item = &Predicate> {
        self.iter().filter(|p| p.arity == 0)
    }

    pub fn positive_arity(&self) -> impl Iterator<Item = &Predicate> {
        self.iter().filter(|p| p.arity > 0)
    }

    /// Abstraction predicates of positive arity, in the fixed order used by canonical signatures.
    pub fn abstraction(&self) -> impl Iterator<Item = &Predicate> {
        self.iter().filter(|p| p.arity > 0 && p.properties.abstraction)
    }

    pub fn instrumentation(&self) -> impl Iterator<Item = &Predicate> {
        self.iter().filter(|p| p.is_instrumentation())
    }

    /// Upper bound on the number of distinct canonical names.
    ///
    /// Every abstraction predicate contributes one slot with three possible values (two when
    /// unknown is not distinguished), which also bounds the number of nodes of a blurred
    /// structure.
    pub fn canonic_bound(&self, three_way: bool) -> BigUint {
        let base = BigUint::from(if three_way { 3u32 } else { 2u32 });
        base.pow(self.abstraction().count() as u32)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary::new()
    }
}
