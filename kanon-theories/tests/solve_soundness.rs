//! Randomized solver-soundness checks.
//!
//! For a solved equality, any assignment that satisfies the solved
//! form must satisfy the original equality wherever evaluation is
//! total: draw uniform values for the free variables, derive values
//! for the solved variables from their right-hand sides, and compare
//! both sides.

use kanon_core::dom::NoDoms;
use kanon_core::{Config, TermId, Terms, VarKind};
use kanon_theories::eval::{eval, Assignment, Value};
use kanon_theories::{LinArith, Theory, Tuples};
use num_bigint::BigInt;
use num_rational::BigRational;
use proptest::prelude::*;

fn q(n: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(n))
}

/// Assign the solved variables from their right-hand sides, in
/// reverse binding order so later bindings feed earlier ones.
fn saturate(terms: &Terms, sol: &[(TermId, TermId)], asg: &mut Assignment) {
    for &(x, rhs) in sol.iter().rev() {
        if let Ok(v) = eval(terms, asg, rhs) {
            asg.insert(x, v);
        }
    }
}

proptest! {
    /// Linear solve is sound: a model of the solved form models the
    /// input equality.
    #[test]
    fn linear_solve_sound(
        cx in -5i64..=5,
        cy in -5i64..=5,
        cz in -5i64..=5,
        c0 in -10i64..=10,
        d0 in -10i64..=10,
        vx in -20i64..=20,
        vy in -20i64..=20,
        vz in -20i64..=20,
    ) {
        prop_assume!(cx != 0 || cy != 0 || cz != 0);

        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let z = terms.mk_var("z", VarKind::External);
        let mx = terms.mk_multq(q(cx), x);
        let my = terms.mk_multq(q(cy), y);
        let mz = terms.mk_multq(q(cz), z);
        let k = terms.mk_num(q(c0));
        let lhs = terms.mk_add(vec![mx, my, mz, k]);
        let rhs = terms.mk_num(q(d0));

        let sol = LinArith
            .solve(&mut terms, &Config::default(), &NoDoms, lhs, rhs)
            .expect("linear equalities with a variable always solve");
        prop_assert_eq!(sol.len(), 1);

        let mut asg = Assignment::default();
        for (v, val) in [(x, vx), (y, vy), (z, vz)] {
            if v != sol[0].0 {
                asg.insert(v, Value::Rat(q(val)));
            }
        }
        saturate(&terms, &sol, &mut asg);

        let el = eval(&terms, &asg, lhs);
        let er = eval(&terms, &asg, rhs);
        if let (Ok(a), Ok(b)) = (el, er) {
            prop_assert_eq!(a, b);
        }
    }

    /// Tuple solve is sound under the same discipline.
    #[test]
    fn tuple_solve_sound(
        vu in -10i64..=10,
        vv in -10i64..=10,
    ) {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let u = terms.mk_var("u", VarKind::External);
        let v = terms.mk_var("v", VarKind::External);
        let p = terms.mk_tuple(vec![x, y]);
        let r = terms.mk_tuple(vec![u, v]);

        let sol = Tuples
            .solve(&mut terms, &Config::default(), &NoDoms, p, r)
            .expect("constructor equality decomposes");

        let mut asg = Assignment::default();
        let solved: Vec<TermId> = sol.iter().map(|&(l, _)| l).collect();
        for (var, val) in [(x, vu), (y, vv), (u, vu), (v, vv)] {
            if !solved.contains(&var) {
                asg.insert(var, Value::Rat(q(val)));
            }
        }
        saturate(&terms, &sol, &mut asg);

        let ep = eval(&terms, &asg, p);
        let er = eval(&terms, &asg, r);
        if let (Ok(a), Ok(b)) = (ep, er) {
            prop_assert_eq!(a, b);
        }
    }

    /// Canonization is idempotent on linear terms.
    #[test]
    fn linear_canon_idempotent(
        cx in -5i64..=5,
        cy in -5i64..=5,
        c0 in -10i64..=10,
    ) {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let mx = terms.mk_multq(q(cx), x);
        let my = terms.mk_multq(q(cy), y);
        let k = terms.mk_num(q(c0));
        let t = terms.mk_add(vec![mx, k, my]);
        let c1 = LinArith.canon(&mut terms, &kanon_core::Sym::Add, &[t]);
        let c2 = LinArith.canon(&mut terms, &kanon_core::Sym::Add, &[c1]);
        prop_assert_eq!(c1, c2);
    }
}
