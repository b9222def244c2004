//! Human-readable structure tables.
//!
//! This is the one boundary format of the crate, used by Coerce diagnostics and by the demo.
//! Nodes print as their integer ids and only non-false entries are listed:
//!
//! ```text
//! %n = {0, 1, 2}
//! %p = {
//!   sm = {2:1/2}
//!   x = {0:1}
//!   n = {0->1:1, 1->2:1, 2->2:1/2}
//! }
//! ```
//!
//! Predicates without any non-false entry are omitted. Nullary predicates come first and
//! print as `name = value`; the tables of the other predicates follow in vocabulary order.
//!
//! # Examples
//!
//! ```
//! use shape_rs::kleene::Kleene;
//! use shape_rs::predicate::{Properties, Vocabulary};
//! use shape_rs::structure::Structure;
//!
//! let mut vocab = Vocabulary::new();
//! let x = vocab.add("x", 1, Properties::abstraction()).unwrap();
//! let mut s = Structure::new(&vocab);
//! let a = s.new_node();
//! s.update(x, &[a], Kleene::Unknown);
//!
//! let table = s.to_table_string(&vocab).unwrap();
//! assert_eq!(table, "%n = {0}\n%p = {\n  x = {0:1/2}\n}\n");
//! ```

use std::fmt;

use crate::kleene::Kleene;
use crate::predicate::Vocabulary;
use crate::structure::Structure;

/// Options for table rendering.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Whether to list the `active` predicate (default: false)
    pub show_active: bool,
    /// Indentation of predicate lines (default: 2 spaces)
    pub indent: &'static str,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_active: false,
            indent: "  ",
        }
    }
}

impl Structure {
    /// Renders the structure as a predicate table.
    pub fn to_table_string(&self, vocab: &Vocabulary) -> Result<String, fmt::Error> {
        self.to_table_string_with_config(vocab, &RenderConfig::default())
    }

    /// Renders the structure as a predicate table with custom options.
    pub fn to_table_string_with_config(&self, vocab: &Vocabulary, config: &RenderConfig) -> Result<String, fmt::Error> {
        use std::fmt::Write as _;

        let mut out = String::new();
        write!(out, "%n = {{")?;
        for (i, n) in self.nodes().enumerate() {
            if i > 0 {
                write!(out, ", ")?;
            }
            write!(out, "{}", n)?;
        }
        writeln!(out, "}}")?;

        writeln!(out, "%p = {{")?;
        for p in vocab.nullary().chain(vocab.positive_arity()) {
            if p.id() == Vocabulary::ACTIVE && !config.show_active {
                continue;
            }
            if p.arity() == 0 {
                let value = self.eval(p.id(), &[]);
                if value != Kleene::False {
                    writeln!(out, "{}{} = {}", config.indent, p.name(), value)?;
                }
                continue;
            }
            if self.count_satisfying(p.id()) == 0 {
                continue;
            }
            write!(out, "{}{} = {{", config.indent, p.name())?;
            for (i, (tuple, value)) in self.satisfying(p.id()).enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                write!(out, "{}:{}", tuple, value)?;
            }
            writeln!(out, "}}")?;
        }
        writeln!(out, "}}")?;

        Ok(out)
    }

    /// Returns a [`Display`][fmt::Display] adapter printing the table.
    pub fn display<'a>(&'a self, vocab: &'a Vocabulary) -> StructureDisplay<'a> {
        StructureDisplay {
            structure: self,
            vocab,
            config: RenderConfig::default(),
        }
    }
}

pub struct StructureDisplay<'a> {
    structure: &'a Structure,
    vocab: &'a Vocabulary,
    config: RenderConfig,
}

impl StructureDisplay<'_> {
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Display for StructureDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.structure.to_table_string_with_config(self.vocab, &self.config)?;
        f.write_str(&table)
    }
}
