//! Coproducts.
//!
//! Binary sums with injections `inl`/`inr` and projections
//! `outl`/`outr`. Injections are injective, disjoint, and acyclic;
//! projections are partial inverses (`outl(inl(x)) = x`), and an
//! equality rooted in a projection is not solved - projecting an
//! unknown injection has no sound inverse, so such equalities orient
//! or fall back.

use crate::Theory;
use kanon_core::{Config, DomLookup, SolveError, Sym, TermId, TermKind, Terms, TheoryId};
use smallvec::smallvec;
use std::collections::BTreeMap;

/// The coproduct theory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coproduct;

fn injection_occurs(terms: &Terms, v: TermId, t: TermId) -> bool {
    if v == t {
        return true;
    }
    match terms.kind(t) {
        TermKind::App {
            sym: Sym::InL | Sym::InR,
            args,
        } => injection_occurs(terms, v, args[0]),
        _ => false,
    }
}

impl Theory for Coproduct {
    fn id(&self) -> TheoryId {
        TheoryId::Cop
    }

    fn canon(&self, terms: &mut Terms, sym: &Sym, args: &[TermId]) -> TermId {
        let arg = args[0];
        match (sym, terms.kind(arg)) {
            (
                Sym::OutL,
                TermKind::App {
                    sym: Sym::InL,
                    args: inner,
                },
            )
            | (
                Sym::OutR,
                TermKind::App {
                    sym: Sym::InR,
                    args: inner,
                },
            ) => inner[0],
            _ => terms.mk_app(sym.clone(), smallvec![arg]),
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
                    TermKind::App { sym: f, args: ss },
                    TermKind::App { sym: g, args: ts },
                ) if is_injection(f) && is_injection(g) => {
                    if f != g {
                        return Err(SolveError::Unsat);
                    }
                    pairs.push((ss[0], ts[0]));
                }
                _ if terms.is_var(s) || terms.is_var(t) => {
                    let (x, r) = orient(terms, s, t);
                    if injection_occurs(terms, x, r) {
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
                _ => return Err(SolveError::Unsolvable),
            }
        }
        Ok(out)
    }
}

fn is_injection(sym: &Sym) -> bool {
    matches!(sym, Sym::InL | Sym::InR)
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use kanon_core::dom::NoDoms;
    use kanon_core::VarKind;

    #[test]
    fn test_out_of_in() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let inl = terms.mk_app(Sym::InL, smallvec![x]);
        assert_eq!(Coproduct.canon(&mut terms, &Sym::OutL, &[inl]), x);
        // Mismatched projection is stuck.
        let stuck = Coproduct.canon(&mut terms, &Sym::OutR, &[inl]);
        assert_ne!(stuck, x);
    }

    #[test]
    fn test_solve_injectivity() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let a = terms.mk_app(Sym::InL, smallvec![x]);
        let b = terms.mk_app(Sym::InL, smallvec![y]);
        let sol = Coproduct
            .solve(&mut terms, &Config::default(), &NoDoms, a, b)
            .unwrap();
        assert_eq!(sol.len(), 1);
        assert!(terms.is_var(sol[0].0) && terms.is_var(sol[0].1));
    }

    #[test]
    fn test_solve_clash() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let a = terms.mk_app(Sym::InL, smallvec![x]);
        let b = terms.mk_app(Sym::InR, smallvec![y]);
        assert_eq!(
            Coproduct.solve(&mut terms, &Config::default(), &NoDoms, a, b),
            Err(SolveError::Unsat)
        );
    }

    #[test]
    fn test_solve_acyclicity() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let inx = terms.mk_app(Sym::InR, smallvec![x]);
        assert_eq!(
            Coproduct.solve(&mut terms, &Config::default(), &NoDoms, x, inx),
            Err(SolveError::Unsat)
        );
    }

    #[test]
    fn test_projection_orients_but_does_not_invert() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let outx = terms.mk_app(Sym::OutL, smallvec![x]);
        let sol = Coproduct
            .solve(&mut terms, &Config::default(), &NoDoms, outx, y)
            .unwrap();
        // y = outl(x), not x = inl(y).
        assert_eq!(sol, vec![(y, outx)]);
    }
}
