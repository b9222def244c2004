//! Configuration and semantic errors.
//!
//! Ordinary imprecision never produces an error: an infeasible structure is reported by
//! [`coerce`][crate::context::AnalysisContext::coerce] returning `false`. The variants below
//! describe mistakes in what a collaborator hands to the engine (a badly shaped constraint,
//! a focus formula that cannot be made definite, ...).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Predicate '{0}' is already declared")]
    DuplicatePredicate(String),

    #[error("Predicate '{0}' is not declared in the vocabulary")]
    UndeclaredPredicate(String),

    #[error("Predicate '{name}' has arity {expected}, but is applied to {actual} argument(s)")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid property of '{name}': {reason}")]
    InvalidProperty { name: String, reason: String },

    #[error("Free variable '{var}' of the definition of '{name}' is not one of its parameters")]
    UnboundDefinitionVariable { name: String, var: String },

    #[error("The head of a constraint must be the constant 0, a literal or a negated literal; got '{0}'")]
    UnsupportedConstraintHead(String),

    #[error("Focusing on the non-trivial equality '{0}' may produce infinitely many structures")]
    NonTrivialFocusEquality(String),

    #[error("Cannot focus on '{0}': a transitive closure must have a literal body")]
    UnsupportedFocusLiteral(String),

    #[error("Cannot focus on the constant 1/2")]
    IndefiniteFocusConstant,

    #[error("Focusing on '{0}' may produce infinitely many structures")]
    FocusNonTermination(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
