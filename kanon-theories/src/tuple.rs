//! Tuples.
//!
//! Finite products with projections. Canonization reduces projections
//! of constructors and collapses surjective-pairing patterns; solving
//! decomposes constructor equalities and orients variable
//! definitions. Tuples are acyclic: a variable equated to a
//! constructor term containing it under constructors only is
//! unsatisfiable.

use crate::Theory;
use kanon_core::{Config, DomLookup, SolveError, Sym, TermId, TermKind, Terms, TheoryId};
use smallvec::{smallvec, SmallVec};
use std::collections::BTreeMap;

/// The tuple theory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tuples;

/// Occurrence of `v` in `t` along constructor spines only.
fn constructor_occurs(terms: &Terms, v: TermId, t: TermId) -> bool {
    if v == t {
        return true;
    }
    match terms.kind(t) {
        TermKind::App {
            sym: Sym::Tuple(_),
            args,
        } => args.iter().any(|&a| constructor_occurs(terms, v, a)),
        _ => false,
    }
}

impl Theory for Tuples {
    fn id(&self) -> TheoryId {
        TheoryId::Tup
    }

    fn canon(&self, terms: &mut Terms, sym: &Sym, args: &[TermId]) -> TermId {
        match sym {
            Sym::Proj(i, n) => {
                if let TermKind::App {
                    sym: Sym::Tuple(m),
                    args: ts,
                } = terms.kind(args[0])
                {
                    if m == n {
                        return ts[*i as usize];
                    }
                }
                terms.mk_app(Sym::Proj(*i, *n), smallvec![args[0]])
            }
            Sym::Tuple(n) => {
                // tuple(proj[0/n](x), ..., proj[n-1/n](x)) = x
                let mut common: Option<TermId> = None;
                let surjective = args.iter().enumerate().all(|(i, &a)| {
                    if let TermKind::App {
                        sym: Sym::Proj(j, m),
                        args: inner,
                    } = terms.kind(a)
                    {
                        if *j == i as u32 && m == n {
                            return match common {
                                None => {
                                    common = Some(inner[0]);
                                    true
                                }
                                Some(x) => x == inner[0],
                            };
                        }
                    }
                    false
                });
                if surjective {
                    if let Some(x) = common {
                        return x;
                    }
                }
                terms.mk_app(Sym::Tuple(*n), SmallVec::from_slice(args))
            }
            _ => unreachable!("not a tuple symbol: {sym:?}"),
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
        let mut pairs = vec![(a, b)];
        let mut out: Vec<(TermId, TermId)> = Vec::new();

        while let Some((s0, t0)) = pairs.pop() {
            let map: BTreeMap<TermId, TermId> = out.iter().copied().collect();
            let s = self.norm(terms, &map, s0);
            let t = self.norm(terms, &map, t0);
            if s == t {
                continue;
            }
            let sk = terms.kind(s).clone();
            let tk = terms.kind(t).clone();
            match (&sk, &tk) {
                (
                    TermKind::App {
                        sym: Sym::Tuple(n),
                        args: ss,
                    },
                    TermKind::App {
                        sym: Sym::Tuple(m),
                        args: ts,
                    },
                ) => {
                    if n != m {
                        return Err(SolveError::Unsat);
                    }
                    pairs.extend(ss.iter().copied().zip(ts.iter().copied()));
                }
                _ if terms.is_var(s) || terms.is_var(t) => {
                    let (x, r) = orient(terms, s, t);
                    if constructor_occurs(terms, x, r) {
                        return Err(SolveError::Unsat);
                    }
                    if terms.occurs(x, r) {
                        return Err(SolveError::Unsolvable);
                    }
                    for (_, rhs) in out.iter_mut() {
                        *rhs = self.norm(terms, &(x, r), *rhs);
                    }
                    out.push((x, r));
                }
                (
                    TermKind::App {
                        sym: Sym::Proj(i, n),
                        args: inner,
                    },
                    _,
                ) if terms.is_var(inner[0]) => {
                    // proj[i/n](u) = t  ==>  u = tuple(.., t at i, ..)
                    let tuple = eta_expand(terms, *i, *n, inner[0], t);
                    pairs.push((inner[0], tuple));
                }
                (
                    _,
                    TermKind::App {
                        sym: Sym::Proj(i, n),
                        args: inner,
                    },
                ) if terms.is_var(inner[0]) => {
                    let tuple = eta_expand(terms, *i, *n, inner[0], s);
                    pairs.push((inner[0], tuple));
                }
                _ => return Err(SolveError::Unsolvable),
            }
        }
        Ok(out)
    }
}

/// Choose the simpler side as lhs: external before rename before
/// slack, ties on id; a lone variable always beats a non-variable.
fn orient(terms: &Terms, s: TermId, t: TermId) -> (TermId, TermId) {
    match (terms.is_var(s), terms.is_var(t)) {
        (true, false) => (s, t),
        (false, true) => (t, s),
        (true, true) => {
            if terms.var_order(s, t) == std::cmp::Ordering::Less {
                (s, t)
            } else {
                (t, s)
            }
        }
        (false, false) => unreachable!("orient requires a variable side"),
    }
}

fn eta_expand(terms: &mut Terms, i: u32, n: u32, _u: TermId, t: TermId) -> TermId {
    let slots: SmallVec<[TermId; 4]> = (0..n)
        .map(|j| {
            if j == i {
                t
            } else {
                terms.mk_fresh(kanon_core::VarKind::Label)
            }
        })
        .collect();
    terms.mk_app(Sym::Tuple(n), slots)
}
