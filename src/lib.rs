//! # shape-rs: three-valued shape analysis in Rust
//!
//! **`shape-rs`** is the abstract-domain core of a shape analysis in the style of TVLA.
//! A program store is modelled as a *three-valued logical structure*: a finite universe of
//! nodes (heap individuals) and an interpretation of every predicate over tuples of nodes in
//! Kleene's logic, where `1/2` means "unknown". A *summary node* stands for one or more
//! concrete individuals.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: All engine operations go through an
//!   [`AnalysisContext`][crate::context::AnalysisContext], which owns the vocabulary, the
//!   compiled constraints and the configuration of one analysis.
//! - **Blur**: canonical abstraction merges nodes with equal canonical names
//!   ([`Canonic`][crate::canonic::Canonic]), bounding every structure's size.
//! - **Coerce**: a constraint solver sharpens unknown values and rejects infeasible structures.
//! - **Focus**: case splits that make a formula definite by materializing individuals out of
//!   summary nodes.
//!
//! ## Basic Usage
//!
//! ```rust
//! use shape_rs::context::AnalysisContext;
//! use shape_rs::formula::{Formula, Var};
//! use shape_rs::kleene::Kleene;
//! use shape_rs::predicate::{Properties, Vocabulary};
//!
//! // 1. Declare the vocabulary: a unique pointer variable and a `next` field
//! let mut vocab = Vocabulary::new();
//! let x = vocab.add("x", 1, Properties { abstraction: true, unique: true, ..Default::default() }).unwrap();
//! let n = vocab.add("n", 2, Properties { function: true, ..Default::default() }).unwrap();
//! let ctx = AnalysisContext::new(vocab).unwrap();
//!
//! // 2. Build the list x -> a -> b -> c
//! let mut s = ctx.new_structure();
//! let a = s.new_node();
//! let b = s.new_node();
//! let c = s.new_node();
//! s.update(x, &[a], Kleene::True);
//! s.update(n, &[a, b], Kleene::True);
//! s.update(n, &[b, c], Kleene::True);
//!
//! // 3. Abstract it: the tail collapses into one summary node
//! ctx.blur(&mut s);
//! assert_eq!(s.node_count(), 2);
//! assert!(ctx.coerce(&mut s));
//!
//! // 4. Materialize the successor of `x`
//! let v = Var::new("v");
//! let w = Var::new("w");
//! let next = Formula::and(Formula::atom(x, [v.clone()]), Formula::atom(n, [v, w]));
//! let focused = ctx.focus(&s, &ctx.focus_formula(&next).unwrap()).unwrap();
//! assert_eq!(focused.len(), 3);
//! ```
//!
//! ## Core Components
//!
//! - **[`structure`]**: three-valued structures and their primitive edits.
//! - **[`formula`]** and **[`eval`]**: first-order formulas with transitive closure and their
//!   evaluation.
//! - **[`blur`]**, **[`coerce`]** and **[`focus`]**: the engine operations.
//! - **[`render`]**: the textual table format of structures.

pub mod blur;
pub mod canonic;
pub mod coerce;
pub mod constraints;
pub mod context;
pub mod embed;
pub mod error;
pub mod eval;
pub mod focus;
pub mod formula;
pub mod kleene;
pub mod predicate;
pub mod render;
pub mod structure;
pub mod types;
