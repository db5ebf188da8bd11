//! Nonlinear Arithmetic.
//!
//! Power products: `NlMul` of `NlPow(k)` factors with leaves ordered
//! by term id and exponents collected. Constant factors fold into a
//! rational coefficient, which is re-expressed through the linear
//! layer (`Multq`) so that a canonical term never hides a constant
//! inside a product. The solver handles only directly oriented
//! equalities; products are not inverted.

use crate::Theory;
use kanon_core::{Config, DomLookup, SolveError, Sym, TermId, TermKind, Terms, TheoryId};
use num_rational::BigRational;
use num_traits::{One, Zero};
use smallvec::{smallvec, SmallVec};

/// The nonlinear theory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonLin;

/// A flattened product: coefficient and `leaf -> exponent`.
#[derive(Debug, Default)]
struct PowerProduct {
    coeff: BigRational,
    powers: Vec<(TermId, u32)>,
}

impl PowerProduct {
    fn one() -> Self {
        Self {
            coeff: BigRational::one(),
            powers: Vec::new(),
        }
    }

    fn mul_leaf(&mut self, t: TermId, k: u32) {
        match self.powers.binary_search_by_key(&t, |&(l, _)| l) {
            Ok(i) => self.powers[i].1 += k,
            Err(i) => self.powers.insert(i, (t, k)),
        }
    }

    fn mul_term(&mut self, terms: &Terms, t: TermId, k: u32) {
        if k == 0 {
            return;
        }
        match terms.kind(t) {
            TermKind::Num(q) => {
                let mut p = BigRational::one();
                for _ in 0..k {
                    p *= q;
                }
                self.coeff *= p;
            }
            TermKind::App {
                sym: Sym::NlMul,
                args,
            } => {
                for &a in args.clone().iter() {
                    self.mul_term(terms, a, k);
                }
            }
            TermKind::App {
                sym: Sym::NlPow(k2),
                args,
            } => {
                let (k2, inner) = (*k2, args[0]);
                self.mul_term(terms, inner, k * k2);
            }
            _ => self.mul_leaf(t, k),
        }
    }

    fn to_term(&self, terms: &mut Terms) -> TermId {
        if self.coeff.is_zero() {
            return terms.mk_num(BigRational::zero());
        }
        let mut factors: SmallVec<[TermId; 4]> = SmallVec::new();
        for &(leaf, k) in &self.powers {
            let f = match k {
                0 => continue,
                1 => leaf,
                _ => terms.mk_app(Sym::NlPow(k), smallvec![leaf]),
            };
            factors.push(f);
        }
        let pp = match factors.len() {
            0 => return terms.mk_num(self.coeff.clone()),
            1 => factors[0],
            _ => terms.mk_app(Sym::NlMul, factors),
        };
        if self.coeff.is_one() {
            pp
        } else {
            terms.mk_multq(self.coeff.clone(), pp)
        }
    }
}

impl Theory for NonLin {
    fn id(&self) -> TheoryId {
        TheoryId::Nl
    }

    fn canon(&self, terms: &mut Terms, sym: &Sym, args: &[TermId]) -> TermId {
        let mut pp = PowerProduct::one();
        match sym {
            Sym::NlMul => {
                for &a in args {
                    pp.mul_term(terms, a, 1);
                }
            }
            Sym::NlPow(k) => pp.mul_term(terms, args[0], *k),
            _ => unreachable!("not a nonlinear symbol: {sym:?}"),
        }
        pp.to_term(terms)
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
        if let (Some(x), Some(y)) = (terms.num(a), terms.num(b)) {
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
