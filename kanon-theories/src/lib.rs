//! Kanon Theories - Canonizer/Solver Pairs.
//!
//! One module per Shostak theory. Each theory supplies:
//! - `canon` (σ) - the unique normal form of an application of an
//!   owned symbol to canonized arguments;
//! - `norm` - substitute-and-recanonize;
//! - `solve` - rewrite an equality into a triangular list of oriented
//!   variable definitions, or fail;
//! - `vars` - the leaves of a pure term.
//!
//! The combination engine holds the theories in the fixed order of
//! [`TheoryId::ALL`]; that order is the deterministic drain order for
//! cross-theory propagation.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod array;
pub mod bitvec;
pub mod coproduct;
pub mod eval;
pub mod linarith;
pub mod nonlin;
pub mod tuple;

use kanon_core::{Config, DomLookup, SolveError, Sym, TermId, TermKind, Terms, TheoryId};
use smallvec::SmallVec;
use std::collections::BTreeMap;

pub use array::Arrays;
pub use bitvec::BitVec;
pub use coproduct::Coproduct;
pub use linarith::{LinArith, LinExpr};
pub use nonlin::NonLin;
pub use tuple::Tuples;

/// Read access to a variable-to-term substitution.
pub trait VarMap {
    /// The image of `v`, or `None` to leave it fixed.
    fn image(&self, v: TermId) -> Option<TermId>;
}

impl VarMap for BTreeMap<TermId, TermId> {
    fn image(&self, v: TermId) -> Option<TermId> {
        self.get(&v).copied()
    }
}

impl VarMap for (TermId, TermId) {
    fn image(&self, v: TermId) -> Option<TermId> {
        (v == self.0).then_some(self.1)
    }
}

/// A Shostak theory: canonizer, normalizer, and solver.
pub trait Theory: Sync {
    /// The theory's id.
    fn id(&self) -> TheoryId;

    /// Short display name.
    fn name(&self) -> &'static str {
        self.id().name()
    }

    /// Whether this theory owns `sym`.
    fn owns(&self, sym: &Sym) -> bool {
        sym.theory() == Some(self.id())
    }

    /// σ - canonize an application of an owned symbol to canonized
    /// arguments.
    fn canon(&self, terms: &mut Terms, sym: &Sym, args: &[TermId]) -> TermId;

    /// Solve `a = b` into oriented equalities `x = t` in triangular
    /// form.
    fn solve(
        &self,
        terms: &mut Terms,
        cfg: &Config,
        doms: &dyn DomLookup,
        a: TermId,
        b: TermId,
    ) -> Result<Vec<(TermId, TermId)>, SolveError>;

    /// Substitute leaves through `map` and recanonize.
    fn norm(&self, terms: &mut Terms, map: &dyn VarMap, t: TermId) -> TermId {
        match terms.kind(t).clone() {
            TermKind::App { sym, args } if self.owns(&sym) => {
                let new: SmallVec<[TermId; 4]> =
                    args.iter().map(|&a| self.norm(terms, map, a)).collect();
                self.canon(terms, &sym, &new)
            }
            _ => map.image(t).unwrap_or(t),
        }
    }

    /// Collect the leaves of a pure term: variables and opaque
    /// foreign subterms; owned applications are entered.
    fn vars(&self, terms: &Terms, t: TermId, out: &mut Vec<TermId>) {
        match terms.kind(t) {
            TermKind::Num(_) => {}
            TermKind::App { sym, args } if self.owns(sym) => {
                for &a in args.iter() {
                    self.vars(terms, a, out);
                }
            }
            _ => {
                if !out.contains(&t) {
                    out.push(t);
                }
            }
        }
    }
}

/// The theories in processing order.
pub static THEORIES: [&'static dyn Theory; 6] =
    [&LinArith, &Tuples, &BitVec, &NonLin, &Coproduct, &Arrays];

/// Look up a theory by id.
#[must_use]
pub fn theory(id: TheoryId) -> &'static dyn Theory {
    THEORIES[id.index()]
}
