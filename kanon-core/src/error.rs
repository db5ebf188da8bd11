//! Error Taxonomy.
//!
//! Semantic contradictions are values ([`Inconsistency`]) that the
//! engine converts into a verdict at the top of `add`; solver
//! failures ([`SolveError`]) are caught internally; evaluation gaps
//! ([`EvalError`]) exist only for the randomized checker. Contract
//! violations by callers are debug assertions, not error values.

use crate::justify::Justification;
use thiserror::Error;

/// A semantic contradiction, carrying the input atoms implicated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("inconsistent (atoms {justification})")]
pub struct Inconsistency {
    /// The dependency set of the contradiction.
    pub justification: Justification,
}

impl Inconsistency {
    /// Wrap a dependency set.
    #[must_use]
    pub fn new(justification: Justification) -> Self {
        Self { justification }
    }
}

/// Failure modes of a theory solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SolveError {
    /// The solver cannot orient the equality; the engine falls back
    /// to naming both sides. Never user-visible.
    #[error("equality not solvable in this theory")]
    Unsolvable,
    /// The equality is unsatisfiable in the theory (e.g. `0 = 1`);
    /// the engine attaches the justification.
    #[error("equality unsatisfiable in this theory")]
    Unsat,
}

/// Failure modes of concrete evaluation under a partial assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A leaf has no assigned value, or an operation is undefined on
    /// the given values.
    #[error("evaluation undefined under partial assignment")]
    Partial,
}
