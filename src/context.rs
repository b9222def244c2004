//! The analysis context.
//!
//! An [`AnalysisContext`] is the manager every engine operation goes through. It owns the
//! [`Vocabulary`], the [`ConstraintSet`] (compiled once for Coerce) and the [`Config`] of
//! one analysis, and is passed by reference, so independent analyses never share state.
//!
//! # Examples
//!
//! ```
//! use shape_rs::context::{AnalysisContext, Config};
//! use shape_rs::predicate::{Properties, Vocabulary};
//!
//! let mut vocab = Vocabulary::new();
//! vocab.add("x", 1, Properties::abstraction()).unwrap();
//!
//! let config = Config {
//!     coerce_after_focus: true,
//!     ..Config::default()
//! };
//! let ctx = AnalysisContext::with_config(vocab, config).unwrap();
//! assert!(ctx.config().three_way_canonic);
//! assert_eq!(ctx.constraints().len(), 1); // sm(v) ==> 0
//! ```

use log::debug;

use crate::coerce::Coercer;
use crate::constraints::ConstraintSet;
use crate::error::Result;
use crate::predicate::Vocabulary;
use crate::structure::Structure;

/// Engine options.
#[derive(Debug, Clone)]
pub struct Config {
    /// Distinguish unknown from false in canonical names (default: true)
    pub three_way_canonic: bool,
    /// Split maybe-active nodes before focusing (default: false)
    pub focus_on_active: bool,
    /// Coerce between the steps of a focus sequence (default: false)
    pub coerce_after_focus: bool,
    /// Report focus literals that may not terminate as errors instead of warnings (default: false)
    pub strict_focus: bool,
    /// Log the table of every structure rejected by `coerce_all` (default: false)
    pub coerce_diagnostics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            three_way_canonic: true,
            focus_on_active: false,
            coerce_after_focus: false,
            strict_focus: false,
            coerce_diagnostics: false,
        }
    }
}

/// Vocabulary, constraints and configuration of one analysis.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    vocab: Vocabulary,
    constraints: ConstraintSet,
    coercer: Coercer,
    config: Config,
}

impl AnalysisContext {
    /// Creates a context with the constraints implied by `vocab` and the default config.
    pub fn new(vocab: Vocabulary) -> Result<Self> {
        Self::with_config(vocab, Config::default())
    }

    /// Creates a context with the constraints implied by `vocab`.
    pub fn with_config(vocab: Vocabulary, config: Config) -> Result<Self> {
        let constraints = ConstraintSet::from_vocabulary(&vocab);
        Self::with_constraints(vocab, constraints, config)
    }

    /// Creates a context with an explicit constraint set.
    ///
    /// Fails if some constraint does not fit `vocab` or has an unsupported head.
    pub fn with_constraints(vocab: Vocabulary, constraints: ConstraintSet, config: Config) -> Result<Self> {
        let coercer = Coercer::new(&vocab, &constraints)?;
        debug!(
            "AnalysisContext: {} predicate(s), {} constraint(s), {:?}",
            vocab.len(),
            constraints.len(),
            config
        );
        Ok(AnalysisContext {
            vocab,
            constraints,
            coercer,
            config,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn coercer(&self) -> &Coercer {
        &self.coercer
    }

    /// Creates an empty structure over the context's vocabulary.
    pub fn new_structure(&self) -> Structure {
        Structure::new(&self.vocab)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::error::Error;
    use crate::formula::{Formula, Var};
    use crate::predicate::Properties;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.three_way_canonic);
        assert!(!config.focus_on_active);
        assert!(!config.coerce_after_focus);
        assert!(!config.strict_focus);
        assert!(!config.coerce_diagnostics);
    }

    #[test]
    fn test_constraints_from_properties() {
        let mut vocab = Vocabulary::new();
        vocab
            .add(
                "n",
                2,
                Properties {
                    function: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let ctx = AnalysisContext::new(vocab).unwrap();
        assert_eq!(ctx.constraints().len(), 3);
        assert_eq!(ctx.new_structure().predicate_count(), 3);
    }

    #[test]
    fn test_foreign_constraint_rejected() {
        let mut big = Vocabulary::new();
        let x = big.add("x", 1, Properties::default()).unwrap();
        let mut constraints = ConstraintSet::new();
        constraints
            .add(&big, Formula::atom(x, [Var::new("v")]), Formula::FALSE)
            .unwrap();
        let result = AnalysisContext::with_constraints(Vocabulary::new(), constraints, Config::default());
        assert!(matches!(result, Err(Error::UndeclaredPredicate(_))));
    }
}
