//! Functional Arrays.
//!
//! Read-over-write canonization: a read of a store at the same
//! (canonized) index yields the stored element; at a provably
//! different constant index the store is skipped. Store chains
//! collapse overwritten and redundant writes. Arrays have no
//! triangular solver beyond orientation - structural equalities
//! between stores require case splits and fall back.

use crate::Theory;
use kanon_core::{Config, DomLookup, SolveError, Sym, TermId, TermKind, Terms, TheoryId};

/// The array theory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Arrays;

/// Indices provably distinct without partition help: distinct
/// numeric or bitvector constants.
fn distinct_constants(terms: &Terms, i: TermId, j: TermId) -> bool {
    if i == j {
        return false;
    }
    let constant = |t: TermId| {
        matches!(
            terms.kind(t),
            TermKind::Num(_)
                | TermKind::App {
                    sym: Sym::BvConst(_),
                    ..
                }
        )
    };
    constant(i) && constant(j)
}

impl Theory for Arrays {
    fn id(&self) -> TheoryId {
        TheoryId::Arr
    }

    fn canon(&self, terms: &mut Terms, sym: &Sym, args: &[TermId]) -> TermId {
        match sym {
            Sym::Select => {
                let (mut a, i) = (args[0], args[1]);
                // Walk the store chain as far as index knowledge allows.
                loop {
                    match terms.kind(a) {
                        TermKind::App {
                            sym: Sym::Store,
                            args: st,
                        } => {
                            let (b, j, e) = (st[0], st[1], st[2]);
                            if i == j {
                                return e;
                            }
                            if distinct_constants(terms, i, j) {
                                a = b;
                                continue;
                            }
                        }
                        _ => {}
                    }
                    return terms.mk_select(a, i);
                }
            }
            Sym::Store => {
                let (a, i, e) = (args[0], args[1], args[2]);
                // store(a, i, select(a, i)) = a
                if let TermKind::App {
                    sym: Sym::Select,
                    args: sel,
                } = terms.kind(e)
                {
                    if sel[0] == a && sel[1] == i {
                        return a;
                    }
                }
                // store(store(b, i, _), i, e) = store(b, i, e)
                if let TermKind::App {
                    sym: Sym::Store,
                    args: st,
                } = terms.kind(a)
                {
                    if st[1] == i {
                        let b = st[0];
                        return terms.mk_store(b, i, e);
                    }
                }
                terms.mk_store(a, i, e)
            }
            _ => unreachable!("not an array symbol: {sym:?}"),
        }
    }

    fn solve(
        &self,
        terms: &mut Terms,
        _cfg: &Config,
        _doms: &dyn DomLookup,
        a: TermId,
        b: TermId,
    ) -> Result<Vec<(TermId, TermId)>, SolveError> {
        if a == b {
            return Ok(Vec::new());
        }
        let (x, r) = match (terms.is_var(a), terms.is_var(b)) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            (true, true) => {
                if terms.var_order(a, b) == std::cmp::Ordering::Less {
                    (a, b)
                } else {
                    (b, a)
                }
            }
            (false, false) => return Err(SolveError::Unsolvable),
        };
        if terms.occurs(x, r) {
            return Err(SolveError::Unsolvable);
        }
        Ok(vec![(x, r)])
    }
}
