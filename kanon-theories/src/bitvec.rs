//! Fixed-Width Bitvectors.
//!
//! Canonization folds constants, flattens concatenations (merging
//! adjacent constant parts), composes nested extractions, and
//! normalizes the bitwise operations. Without a sort layer only
//! constants and extractions carry known widths, so the solver is
//! deliberately partial: constant/constant decides, variable/term
//! orients, everything else falls back to the engine's
//! name-both-sides treatment.

use crate::Theory;
use kanon_core::{Bits, Config, DomLookup, SolveError, Sym, TermId, TermKind, Terms, TheoryId};
use smallvec::{smallvec, SmallVec};

/// The bitvector theory.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitVec;

/// Intern a bitvector constant.
pub fn mk_const(terms: &mut Terms, bits: Bits) -> TermId {
    terms.mk_app(Sym::BvConst(bits), smallvec![])
}

fn as_const(terms: &Terms, t: TermId) -> Option<&Bits> {
    match terms.kind(t) {
        TermKind::App {
            sym: Sym::BvConst(b),
            ..
        } => Some(b),
        _ => None,
    }
}

impl Theory for BitVec {
    fn id(&self) -> TheoryId {
        TheoryId::Bv
    }

    fn canon(&self, terms: &mut Terms, sym: &Sym, args: &[TermId]) -> TermId {
        match sym {
            Sym::BvConst(b) => mk_const(terms, b.clone()),
            Sym::BvConcat => {
                // Flatten, then merge adjacent constants.
                let mut flat: Vec<TermId> = Vec::new();
                for &a in args {
                    match terms.kind(a) {
                        TermKind::App {
                            sym: Sym::BvConcat,
                            args: inner,
                        } => flat.extend(inner.iter().copied()),
                        _ => flat.push(a),
                    }
                }
                let mut merged: Vec<TermId> = Vec::new();
                for part in flat {
                    if let (Some(last), Some(b)) = (merged.last().copied(), as_const(terms, part))
                    {
                        if let Some(a) = as_const(terms, last) {
                            let joined = a.concat(b);
                            merged.pop();
                            merged.push(mk_const(terms, joined));
                            continue;
                        }
                    }
                    merged.push(part);
                }
                match merged.len() {
                    1 => merged[0],
                    _ => terms.mk_app(Sym::BvConcat, SmallVec::from_vec(merged)),
                }
            }
            Sym::BvExtract(hi, lo) => {
                let arg = args[0];
                if let Some(b) = as_const(terms, arg) {
                    if *hi < b.width() {
                        let sliced = b.extract(*hi, *lo);
                        return mk_const(terms, sliced);
                    }
                }
                if let TermKind::App {
                    sym: Sym::BvExtract(_, lo2),
                    args: inner,
                } = terms.kind(arg)
                {
                    let (lo2, inner0) = (*lo2, inner[0]);
                    return terms.mk_app(Sym::BvExtract(lo2 + hi, lo2 + lo), smallvec![inner0]);
                }
                terms.mk_app(Sym::BvExtract(*hi, *lo), smallvec![arg])
            }
            Sym::BvNot => {
                let arg = args[0];
                if let Some(b) = as_const(terms, arg) {
                    let flipped = b.not();
                    return mk_const(terms, flipped);
                }
                if let TermKind::App {
                    sym: Sym::BvNot,
                    args: inner,
                } = terms.kind(arg)
                {
                    return inner[0];
                }
                terms.mk_app(Sym::BvNot, smallvec![arg])
            }
            Sym::BvAnd | Sym::BvOr => self.canon_bitwise(terms, sym, args),
            _ => unreachable!("not a bitvector symbol: {sym:?}"),
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
        if let (Some(x), Some(y)) = (as_const(terms, a), as_const(terms, b)) {
            return if x == y {
                Ok(Vec::new())
            } else {
                Err(SolveError::Unsat)
            };
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

impl BitVec {
    fn canon_bitwise(&self, terms: &mut Terms, sym: &Sym, args: &[TermId]) -> TermId {
        let is_and = matches!(sym, Sym::BvAnd);
        let mut acc: Option<Bits> = None;
        let mut rest: Vec<TermId> = Vec::new();
        for &a in args {
            match terms.kind(a) {
                TermKind::App {
                    sym: s2,
                    args: inner,
                } if *s2 == *sym => {
                    for &i in inner.iter() {
                        push_operand(terms, i, is_and, &mut acc, &mut rest);
                    }
                }
                _ => push_operand(terms, a, is_and, &mut acc, &mut rest),
            }
        }
        rest.sort_unstable();
        rest.dedup();
        if let Some(c) = &acc {
            // Absorbing element short-circuits the whole application.
            let absorbing = if is_and {
                *c == Bits::zeros(c.width())
            } else {
                *c == Bits::ones(c.width())
            };
            let identity = if is_and {
                *c == Bits::ones(c.width())
            } else {
                *c == Bits::zeros(c.width())
            };
            if absorbing || rest.is_empty() {
                return mk_const(terms, c.clone());
            }
            if !identity {
                rest.insert(0, mk_const(terms, c.clone()));
            }
        }
        match rest.len() {
            0 => unreachable!("bitwise application with no operands"),
            1 => rest[0],
            _ => terms.mk_app(sym.clone(), SmallVec::from_vec(rest)),
        }
    }
}

fn push_operand(
    terms: &Terms,
    t: TermId,
    is_and: bool,
    acc: &mut Option<Bits>,
    rest: &mut Vec<TermId>,
) {
    if let Some(b) = as_const(terms, t) {
        *acc = Some(match acc.take() {
            None => b.clone(),
            Some(a) => {
                if is_and {
                    a.and(b)
                } else {
                    a.or(b)
                }
            }
        });
    } else {
        rest.push(t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanon_core::dom::NoDoms;
    use kanon_core::VarKind;

    #[test]
    fn test_concat_constants() {
        let mut terms = Terms::new();
        let hi = mk_const(&mut terms, Bits::from_u64(4, 0b1010));
        let lo = mk_const(&mut terms, Bits::from_u64(4, 0b0011));
        let c = BitVec.canon(&mut terms, &Sym::BvConcat, &[hi, lo]);
        assert_eq!(as_const(&terms, c), Some(&Bits::from_u64(8, 0b1010_0011)));
    }

    #[test]
    fn test_concat_flattens_around_vars() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let a = mk_const(&mut terms, Bits::from_u64(2, 0b01));
        let b = mk_const(&mut terms, Bits::from_u64(2, 0b10));
        let inner = terms.mk_app(Sym::BvConcat, smallvec![a, b]);
        let c = BitVec.canon(&mut terms, &Sym::BvConcat, &[inner, x]);
        match terms.kind(c) {
            TermKind::App {
                sym: Sym::BvConcat,
                args,
            } => {
                assert_eq!(args.len(), 2);
                assert_eq!(as_const(&terms, args[0]), Some(&Bits::from_u64(4, 0b0110)));
                assert_eq!(args[1], x);
            }
            k => panic!("expected concat, got {k:?}"),
        }
    }

    #[test]
    fn test_extract_of_extract() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let e1 = terms.mk_app(Sym::BvExtract(11, 4), smallvec![x]);
        let c = BitVec.canon(&mut terms, &Sym::BvExtract(3, 0), &[e1]);
        match terms.kind(c) {
            TermKind::App {
                sym: Sym::BvExtract(hi, lo),
                args,
            } => {
                assert_eq!((*hi, *lo), (7, 4));
                assert_eq!(args[0], x);
            }
            k => panic!("expected extract, got {k:?}"),
        }
    }

    #[test]
    fn test_not_involutive_and_const() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let nx = BitVec.canon(&mut terms, &Sym::BvNot, &[x]);
        assert_eq!(BitVec.canon(&mut terms, &Sym::BvNot, &[nx]), x);
        let c = mk_const(&mut terms, Bits::from_u64(4, 0b0101));
        let nc = BitVec.canon(&mut terms, &Sym::BvNot, &[c]);
        assert_eq!(as_const(&terms, nc), Some(&Bits::from_u64(4, 0b1010)));
    }

    #[test]
    fn test_bitwise_absorption() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let zeros = mk_const(&mut terms, Bits::zeros(8));
        let c = BitVec.canon(&mut terms, &Sym::BvAnd, &[x, zeros]);
        assert_eq!(as_const(&terms, c), Some(&Bits::zeros(8)));
        let ones = mk_const(&mut terms, Bits::ones(8));
        let c = BitVec.canon(&mut terms, &Sym::BvAnd, &[x, ones]);
        assert_eq!(c, x);
    }

    #[test]
    fn test_solve_constants_and_orientation() {
        let mut terms = Terms::new();
        let a = mk_const(&mut terms, Bits::from_u64(4, 3));
        let b = mk_const(&mut terms, Bits::from_u64(4, 5));
        assert_eq!(
            BitVec.solve(&mut terms, &Config::default(), &NoDoms, a, b),
            Err(SolveError::Unsat)
        );
        let x = terms.mk_var("x", VarKind::External);
        let sol = BitVec
            .solve(&mut terms, &Config::default(), &NoDoms, a, x)
            .unwrap();
        assert_eq!(sol, vec![(x, a)]);
    }

    #[test]
    fn test_solve_structural_fallback() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let nx = terms.mk_app(Sym::BvNot, smallvec![x]);
        let ny = terms.mk_app(Sym::BvNot, smallvec![y]);
        assert_eq!(
            BitVec.solve(&mut terms, &Config::default(), &NoDoms, nx, ny),
            Err(SolveError::Unsolvable)
        );
    }
}
