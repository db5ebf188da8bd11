//! Kanon Core - Terms, Domains, and Justifications for the Kanon decision procedure
//!
//! This crate provides the foundational types for the Kanon engine:
//! - Hash-consed terms with cheap [`TermId`] references
//! - The interpreted symbol family and its theory ownership
//! - Arithmetic domains: the sign lattice and exact rational intervals
//! - Justifications (dependency sets over input atoms)
//! - Atoms, errors, configuration, and statistics
//!
//! # Examples
//!
//! ```
//! use kanon_core::term::{Terms, VarKind};
//!
//! let mut terms = Terms::new();
//! let x = terms.mk_var("x", VarKind::External);
//! let y = terms.mk_var("y", VarKind::External);
//! let fx = terms.mk_uninterp("f", vec![x]);
//!
//! // Terms are hash-consed: structural equality is id equality.
//! assert_eq!(fx, terms.mk_uninterp("f", vec![x]));
//! assert_ne!(fx, terms.mk_uninterp("f", vec![y]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod atom;
pub mod bits;
pub mod config;
pub mod dom;
pub mod error;
pub mod justify;
pub mod rational;
pub mod stats;
pub mod term;

pub use atom::Atom;
pub use bits::Bits;
pub use config::Config;
pub use dom::{Dom, DomLookup, Interval, Sign};
pub use error::{EvalError, Inconsistency, SolveError};
pub use justify::{AtomId, Justification};
pub use stats::Stats;
pub use term::{NameId, Sym, TermId, TermKind, Terms, TheoryId, VarKind};
