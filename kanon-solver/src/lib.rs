//! Kanon Solver - The Shostak-Style Combination Engine.
//!
//! This crate assembles the decision procedure:
//! - [`partition::Partition`] - union-find, disequalities, domains
//! - [`cc::Funs`] - congruence closure over uninterpreted symbols
//! - [`solution::SolutionSet`] - one triangular solved form per theory
//! - [`context::Context`] - the atom-processing pipeline and fixpoint
//! - [`rename::Rename`] - the propositional alias layer
//!
//! # Examples
//!
//! ```
//! use kanon_core::{Atom, VarKind};
//! use kanon_solver::{Context, Status};
//!
//! let mut ctx = Context::empty();
//! let x = ctx.terms_mut().mk_var("x", VarKind::External);
//! let y = ctx.terms_mut().mk_var("y", VarKind::External);
//! let fx = ctx.terms_mut().mk_uninterp("f", vec![x]);
//! let fy = ctx.terms_mut().mk_uninterp("f", vec![y]);
//!
//! let ctx = match ctx.add(&Atom::Equal(x, y)) {
//!     Status::Ok(next) => next,
//!     s => panic!("unexpected {s:?}"),
//! };
//! assert!(ctx.is_valid(&Atom::Equal(fx, fy)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cc;
pub mod context;
pub mod invariants;
pub mod partition;
pub mod rename;
pub mod solution;

pub use cc::Funs;
pub use context::{Context, Status};
pub use partition::Partition;
pub use rename::{Deduction, Payload, PropVar, Rename};
pub use solution::SolutionSet;

/// Process exit codes for hosts embedding the engine in a CLI.
pub mod exit {
    /// All input processed consistently.
    pub const OK: i32 = 0;
    /// Malformed input.
    pub const SYNTAX: i32 = 1;
    /// The input is unsatisfiable.
    pub const UNSAT: i32 = 2;
    /// The engine could not decide (incomplete fragment).
    pub const UNKNOWN: i32 = 3;
}
