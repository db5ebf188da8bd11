//! Linear Arithmetic.
//!
//! Canonical form: a rational constant plus monomials `q * leaf` with
//! nonzero coefficients, leaves ordered by term id. The solver
//! isolates a single variable, preferring non-slack variables, and
//! applies gcd/divisibility checks on Diophantine equalities when
//! integer solving is enabled.

use crate::{Theory, VarMap};
use kanon_core::dom::{Dom, DomLookup};
use kanon_core::rational::{divides, integral_gcd, is_integral};
use kanon_core::{Config, SolveError, Sym, TermId, TermKind, Terms, TheoryId, VarKind};
use num_rational::BigRational;
use num_traits::{One, Zero};
use smallvec::SmallVec;

/// A linear expression in canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinExpr {
    /// Constant part.
    pub constant: BigRational,
    /// `(leaf, coefficient)` pairs, sorted by leaf id, no zeros.
    pub monomials: Vec<(TermId, BigRational)>,
}

impl LinExpr {
    /// The zero expression.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// A constant expression.
    #[must_use]
    pub fn of_num(q: BigRational) -> Self {
        Self {
            constant: q,
            monomials: Vec::new(),
        }
    }

    /// A single leaf with coefficient one.
    #[must_use]
    pub fn of_leaf(t: TermId) -> Self {
        Self {
            constant: BigRational::zero(),
            monomials: vec![(t, BigRational::one())],
        }
    }

    /// Read a term into linear shape, flattening owned symbols and
    /// treating everything else as an opaque leaf.
    #[must_use]
    pub fn of_term(terms: &Terms, t: TermId) -> Self {
        match terms.kind(t) {
            TermKind::Num(q) => Self::of_num(q.clone()),
            TermKind::App { sym: Sym::Add, args } => {
                let mut acc = Self::zero();
                for &a in args.iter() {
                    acc = acc.add(&Self::of_term(terms, a));
                }
                acc
            }
            TermKind::App {
                sym: Sym::Multq(q),
                args,
            } => Self::of_term(terms, args[0]).scale(q),
            _ => Self::of_leaf(t),
        }
    }

    /// Sum.
    #[must_use]
    pub fn add(&self, other: &LinExpr) -> LinExpr {
        let mut out = LinExpr {
            constant: &self.constant + &other.constant,
            monomials: Vec::with_capacity(self.monomials.len() + other.monomials.len()),
        };
        let (mut i, mut j) = (0, 0);
        while i < self.monomials.len() || j < other.monomials.len() {
            let pick_left = match (self.monomials.get(i), other.monomials.get(j)) {
                (Some((a, _)), Some((b, _))) => {
                    if a == b {
                        let c = &self.monomials[i].1 + &other.monomials[j].1;
                        if !c.is_zero() {
                            out.monomials.push((*a, c));
                        }
                        i += 1;
                        j += 1;
                        continue;
                    }
                    a < b
                }
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => unreachable!(),
            };
            if pick_left {
                out.monomials.push(self.monomials[i].clone());
                i += 1;
            } else {
                out.monomials.push(other.monomials[j].clone());
                j += 1;
            }
        }
        out
    }

    /// Multiply by a constant.
    #[must_use]
    pub fn scale(&self, q: &BigRational) -> LinExpr {
        if q.is_zero() {
            return LinExpr::zero();
        }
        LinExpr {
            constant: &self.constant * q,
            monomials: self
                .monomials
                .iter()
                .map(|(t, c)| (*t, c * q))
                .collect(),
        }
    }

    /// Difference.
    #[must_use]
    pub fn sub(&self, other: &LinExpr) -> LinExpr {
        self.add(&other.scale(&-BigRational::one()))
    }

    /// Whether the expression is a constant.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.monomials.is_empty()
    }

    /// Rebuild the canonical DAG form.
    pub fn to_term(&self, terms: &mut Terms) -> TermId {
        if self.monomials.is_empty() {
            return terms.mk_num(self.constant.clone());
        }
        let mut parts: SmallVec<[TermId; 4]> = SmallVec::new();
        if !self.constant.is_zero() {
            let c = terms.mk_num(self.constant.clone());
            parts.push(c);
        }
        for (leaf, coeff) in &self.monomials {
            let part = if coeff.is_one() {
                *leaf
            } else {
                terms.mk_multq(coeff.clone(), *leaf)
            };
            parts.push(part);
        }
        if parts.len() == 1 {
            parts[0]
        } else {
            terms.mk_add(parts)
        }
    }

    /// Conservative domain of the expression under per-leaf domains.
    #[must_use]
    pub fn dom(&self, terms: &Terms, doms: &dyn DomLookup) -> Dom {
        let mut interval = kanon_core::dom::Interval::point(self.constant.clone());
        let mut integer = is_integral(&self.constant);
        for (leaf, coeff) in &self.monomials {
            let d = if terms.is_var(*leaf) {
                doms.dom_of(*leaf)
            } else {
                Dom::any()
            };
            interval = interval.add(&d.interval.scale(coeff));
            integer = integer && d.integer && is_integral(coeff);
        }
        let mut out = Dom::of_interval(interval);
        out.integer = integer;
        out
    }
}

/// The linear-arithmetic theory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinArith;

impl Theory for LinArith {
    fn id(&self) -> TheoryId {
        TheoryId::La
    }

    fn canon(&self, terms: &mut Terms, sym: &Sym, args: &[TermId]) -> TermId {
        let e = match sym {
            Sym::Add => {
                let mut acc = LinExpr::zero();
                for &a in args {
                    acc = acc.add(&LinExpr::of_term(terms, a));
                }
                acc
            }
            Sym::Multq(q) => LinExpr::of_term(terms, args[0]).scale(q),
            _ => unreachable!("not a linear-arithmetic symbol: {sym:?}"),
        };
        e.to_term(terms)
    }

    fn solve(
        &self,
        terms: &mut Terms,
        cfg: &Config,
        doms: &dyn DomLookup,
        a: TermId,
        b: TermId,
    ) -> Result<Vec<(TermId, TermId)>, SolveError> {
        let e = LinExpr::of_term(terms, a).sub(&LinExpr::of_term(terms, b));
        if e.is_constant() {
            return if e.constant.is_zero() {
                Ok(Vec::new())
            } else {
                Err(SolveError::Unsat)
            };
        }

        // gcd check on Diophantine equalities: if every leaf is an
        // integer variable with integral coefficient, the gcd of the
        // coefficients must divide the constant.
        if cfg.integer_solve
            && is_integral(&e.constant)
            && e.monomials
                .iter()
                .all(|(x, c)| is_integral(c) && terms.is_var(*x) && doms.dom_of(*x).integer)
        {
            let g = integral_gcd(e.monomials.iter().map(|(_, c)| c))
                .expect("integral coefficients");
            if !g.is_zero() && !divides(&g, &-e.constant.clone()) {
                tracing::debug!(gcd = %g, constant = %e.constant, "diophantine gcd infeasibility");
                return Err(SolveError::Unsat);
            }
        }

        // Pivot choice: a variable leaf, non-slack when possible,
        // external before rename, ties on id.
        let pivot = e
            .monomials
            .iter()
            .filter(|(x, _)| terms.is_var(*x))
            .min_by_key(|(x, _)| {
                let kind = terms.var_kind(*x).expect("variable");
                (kind == VarKind::Slack, kind, *x)
            })
            .cloned();
        let Some((x, c)) = pivot else {
            return Err(SolveError::Unsolvable);
        };

        let mut rest = e.clone();
        rest.monomials.retain(|(t, _)| *t != x);
        let rhs = rest.scale(&(-BigRational::one() / &c));

        // An integer variable equated to a non-integral constant is
        // unsatisfiable outright.
        if cfg.integer_solve
            && doms.dom_of(x).integer
            && rhs.is_constant()
            && !is_integral(&rhs.constant)
        {
            tracing::debug!(value = %rhs.constant, "non-integral value for integer variable");
            return Err(SolveError::Unsat);
        }

        Ok(vec![(x, rhs.to_term(terms))])
    }

    fn norm(&self, terms: &mut Terms, map: &dyn VarMap, t: TermId) -> TermId {
        let e = LinExpr::of_term(terms, t);
        let mut acc = LinExpr::of_num(e.constant.clone());
        for (leaf, coeff) in &e.monomials {
            let image = map.image(*leaf).unwrap_or(*leaf);
            acc = acc.add(&LinExpr::of_term(terms, image).scale(coeff));
        }
        acc.to_term(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanon_core::dom::NoDoms;
    use num_bigint::BigInt;

    fn q(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    struct IntVars;
    impl DomLookup for IntVars {
        fn dom_of(&self, _v: TermId) -> Dom {
            Dom::int()
        }
    }

    #[test]
    fn test_canon_collects_and_sorts() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        // y + x + y  ==>  x + 2y
        let t = terms.mk_add(vec![y, x, y]);
        let c = LinArith.canon(&mut terms, &Sym::Add, &[t]);
        let e = LinExpr::of_term(&terms, c);
        assert_eq!(e.monomials, vec![(x, q(1)), (y, q(2))]);
    }

    #[test]
    fn test_canon_idempotent() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let three = terms.mk_int(3);
        let half = terms.mk_multq(BigRational::new(BigInt::from(1), BigInt::from(2)), x);
        let t = terms.mk_add(vec![three, half, x]);
        let c1 = LinArith.canon(&mut terms, &Sym::Add, &[t]);
        let c2 = LinArith.canon(&mut terms, &Sym::Add, &[c1]);
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_cancellation_to_constant() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let neg = terms.mk_multq(q(-1), x);
        let t = terms.mk_add(vec![x, neg]);
        let c = LinArith.canon(&mut terms, &Sym::Add, &[t]);
        assert_eq!(terms.num(c), Some(&q(0)));
    }

    #[test]
    fn test_solve_isolates_external() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let sum = terms.mk_add(vec![x, y]);
        let three = terms.mk_int(3);
        let sol = LinArith
            .solve(&mut terms, &Config::default(), &NoDoms, sum, three)
            .unwrap();
        assert_eq!(sol.len(), 1);
        let (lhs, rhs) = sol[0];
        assert_eq!(lhs, x);
        // x = 3 - y
        let e = LinExpr::of_term(&terms, rhs);
        assert_eq!(e.constant, q(3));
        assert_eq!(e.monomials, vec![(y, q(-1))]);
    }

    #[test]
    fn test_solve_trivial_and_absurd() {
        let mut terms = Terms::new();
        let a = terms.mk_int(2);
        let b = terms.mk_int(2);
        assert_eq!(
            LinArith
                .solve(&mut terms, &Config::default(), &NoDoms, a, b)
                .unwrap(),
            vec![]
        );
        let c = terms.mk_int(3);
        assert_eq!(
            LinArith.solve(&mut terms, &Config::default(), &NoDoms, a, c),
            Err(SolveError::Unsat)
        );
    }

    #[test]
    fn test_gcd_infeasibility() {
        // 2x + 2y = 7 over the integers.
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let tx = terms.mk_multq(q(2), x);
        let ty = terms.mk_multq(q(2), y);
        let sum = terms.mk_add(vec![tx, ty]);
        let seven = terms.mk_int(7);
        assert_eq!(
            LinArith.solve(&mut terms, &Config::default(), &IntVars, sum, seven),
            Err(SolveError::Unsat)
        );
        // Over the rationals the same equality solves fine.
        assert!(LinArith
            .solve(&mut terms, &Config::default(), &NoDoms, sum, seven)
            .is_ok());
    }

    #[test]
    fn test_non_integral_rhs_for_integer_var() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let half = terms.mk_num(BigRational::new(BigInt::from(1), BigInt::from(2)));
        assert_eq!(
            LinArith.solve(&mut terms, &Config::default(), &IntVars, x, half),
            Err(SolveError::Unsat)
        );
    }

    #[test]
    fn test_norm_substitutes_and_recanonizes() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let z = terms.mk_var("z", VarKind::External);
        let sum = terms.mk_add(vec![x, y]);
        let sum = LinArith.canon(&mut terms, &Sym::Add, &[sum]);
        // x := z + 1
        let one = terms.mk_int(1);
        let z1 = terms.mk_add(vec![z, one]);
        let z1 = LinArith.canon(&mut terms, &Sym::Add, &[z1]);
        let normed = LinArith.norm(&mut terms, &(x, z1), sum);
        let e = LinExpr::of_term(&terms, normed);
        assert_eq!(e.constant, q(1));
        assert_eq!(e.monomials, vec![(y, q(1)), (z, q(1))]);
    }
}
