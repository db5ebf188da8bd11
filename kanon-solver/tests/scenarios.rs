//! End-to-end scenarios for the combination engine.

use kanon_core::dom::{Dom, Sign};
use kanon_core::{Atom, Config, VarKind};
use kanon_solver::invariants::check_all;
use kanon_solver::{Context, Status};

fn ok(ctx: &Context, atom: &Atom) -> Box<Context> {
    match ctx.add(atom) {
        Status::Ok(next) => {
            check_all(&next).unwrap();
            next
        }
        s => panic!("expected Ok for {}, got {s:?}", atom.pp(ctx.terms())),
    }
}

#[test]
fn uninterpreted_congruence_both_orders() {
    // x = y first, then f(x) = f(y) is already entailed.
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let fx = ctx.terms_mut().mk_uninterp("f", vec![x]);
    let fy = ctx.terms_mut().mk_uninterp("f", vec![y]);

    let s = ok(&ctx, &Atom::Equal(x, y));
    assert!(s.is_valid(&Atom::Equal(fx, fy)));

    // f(x) = f(y) first: consistent but not yet an equality of x, y;
    // re-adding the application equality is then entailed.
    let s = ok(&ctx, &Atom::Equal(fx, fy));
    assert!(!s.is_valid(&Atom::Equal(x, y)));
    assert!(s.is_valid(&Atom::Equal(fx, fy)));
    let s = ok(&s, &Atom::Equal(x, y));
    assert!(s.is_valid(&Atom::Equal(fx, fy)));
}

#[test]
fn array_read_over_write() {
    let mut ctx = Context::empty();
    let a = ctx.terms_mut().mk_var("a", VarKind::External);
    let i = ctx.terms_mut().mk_var("i", VarKind::External);
    let j = ctx.terms_mut().mk_var("j", VarKind::External);
    let e = ctx.terms_mut().mk_var("e", VarKind::External);
    let st = ctx.terms_mut().mk_store(a, i, e);
    let rd = ctx.terms_mut().mk_select(st, j);

    let s = ok(&ctx, &Atom::Equal(i, j));
    assert!(s.is_valid(&Atom::Equal(rd, e)));
}

#[test]
fn linear_arithmetic_chain() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let sum = ctx.terms_mut().mk_add(vec![x, y]);
    let one = ctx.terms_mut().mk_int(1);
    let two = ctx.terms_mut().mk_int(2);
    let three = ctx.terms_mut().mk_int(3);

    let s = ok(&ctx, &Atom::Equal(sum, three));
    let s = ok(&s, &Atom::Equal(x, one));
    assert!(s.is_valid(&Atom::Equal(y, two)));
    assert!(s.is_inconsistent(&Atom::Equal(y, three)));
}

#[test]
fn tuple_decomposition() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let u = ctx.terms_mut().mk_var("u", VarKind::External);
    let v = ctx.terms_mut().mk_var("v", VarKind::External);
    let p = ctx.terms_mut().mk_tuple(vec![x, y]);
    let q = ctx.terms_mut().mk_tuple(vec![u, v]);

    let s = ok(&ctx, &Atom::Equal(p, q));
    assert!(s.is_valid(&Atom::Equal(x, u)));
    assert!(s.is_valid(&Atom::Equal(y, v)));
    assert!(s.is_inconsistent(&Atom::Diseq(y, v)));
}

#[test]
fn combination_uninterpreted_fixpoint() {
    // f(x) = x and f(f(x)) = y entail y = x.
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let fx = ctx.terms_mut().mk_uninterp("f", vec![x]);
    let ffx = ctx.terms_mut().mk_uninterp("f", vec![fx]);

    let s = ok(&ctx, &Atom::Equal(fx, x));
    let s = ok(&s, &Atom::Equal(ffx, y));
    assert!(s.is_valid(&Atom::Equal(y, x)));
}

#[test]
fn sign_lattice_meets() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);

    let s = ok(&ctx, &Atom::sign(x, Sign::Nonneg));
    let s = ok(&s, &Atom::sign(y, Sign::Nonpos));
    let s = ok(&s, &Atom::Equal(x, y));
    assert!(s.is_inconsistent(&Atom::sign(x, Sign::Pos)));
    // The merged class is pinned to zero: both closures now hold.
    assert!(s.is_valid(&Atom::sign(x, Sign::Nonpos)));
    assert!(s.is_valid(&Atom::sign(y, Sign::Nonneg)));
}

#[test]
fn boundary_reflexive_equality() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    assert!(ctx.is_valid(&Atom::Equal(x, x)));
}

#[test]
fn boundary_equal_then_diseq() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let s = ok(&ctx, &Atom::Equal(x, y));
    assert!(s.is_inconsistent(&Atom::Diseq(x, y)));
}

#[test]
fn boundary_positive_then_zero() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let zero = ctx.terms_mut().mk_int(0);
    let s = ok(&ctx, &Atom::sign(x, Sign::Pos));
    assert!(s.is_inconsistent(&Atom::Equal(x, zero)));
}

#[test]
fn boundary_integer_against_fraction() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let half = ctx
        .terms_mut()
        .mk_num(num_rational::BigRational::new(1.into(), 2.into()));
    let s = ok(&ctx, &Atom::In(x, Dom::int()));
    assert!(s.is_inconsistent(&Atom::Equal(x, half)));
}

#[test]
fn integer_gcd_infeasibility() {
    // 2x + 2y = 7 has no integer solution.
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let two = num_rational::BigRational::from_integer(2.into());
    let tx = ctx.terms_mut().mk_multq(two.clone(), x);
    let ty = ctx.terms_mut().mk_multq(two, y);
    let sum = ctx.terms_mut().mk_add(vec![tx, ty]);
    let seven = ctx.terms_mut().mk_int(7);

    let s = ok(&ctx, &Atom::In(x, Dom::int()));
    let s = ok(&s, &Atom::In(y, Dom::int()));
    match s.add(&Atom::Equal(sum, seven)) {
        Status::Inconsistent(_) => {}
        s => panic!("expected Inconsistent, got {s:?}"),
    }

    // Without the integer constraints the same equality is fine.
    let s = ok(&ctx, &Atom::Equal(sum, seven));
    drop(s);
}

#[test]
fn idempotence_ok_then_valid() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let sum = ctx.terms_mut().mk_add(vec![x, y]);
    let three = ctx.terms_mut().mk_int(3);
    let fx = ctx.terms_mut().mk_uninterp("f", vec![x]);
    let fy = ctx.terms_mut().mk_uninterp("f", vec![y]);

    for atom in [
        Atom::Equal(x, y),
        Atom::Equal(sum, three),
        Atom::Equal(fx, fy),
        Atom::Diseq(fx, three),
        Atom::sign(x, Sign::Nonneg),
    ] {
        let s = ok(&ctx, &atom);
        assert!(
            s.is_valid(&atom),
            "re-adding {} should be valid",
            atom.pp(s.terms())
        );
    }
}

#[test]
fn negation_of_inconsistent_is_valid() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let s = ok(&ctx, &Atom::Equal(x, y));

    let bad = Atom::Diseq(x, y);
    assert!(s.is_inconsistent(&bad));
    for n in bad.negate().unwrap() {
        assert!(s.is_valid(&n));
    }

    let s = ok(&ctx, &Atom::sign(x, Sign::Pos));
    let bad = Atom::sign(x, Sign::Nonpos);
    assert!(s.is_inconsistent(&bad));
    for n in bad.negate().unwrap() {
        assert!(s.is_valid(&n));
    }
}

#[test]
fn addl_stops_at_first_inconsistency() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let z = ctx.terms_mut().mk_var("z", VarKind::External);

    match ctx.addl(&[Atom::Equal(x, y), Atom::Equal(y, z)]) {
        Status::Ok(s) => assert!(s.is_valid(&Atom::Equal(x, z))),
        s => panic!("expected Ok, got {s:?}"),
    }
    match ctx.addl(&[Atom::Equal(x, y), Atom::Diseq(x, y), Atom::Equal(y, z)]) {
        // The conflict depends on the equality already in the context.
        Status::Inconsistent(j) => assert_eq!(j.len(), 1),
        s => panic!("expected Inconsistent, got {s:?}"),
    }
}

#[test]
fn unsat_core_names_the_culprits() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let z = ctx.terms_mut().mk_var("z", VarKind::External);
    let w = ctx.terms_mut().mk_var("w", VarKind::External);

    // An irrelevant atom first, then the conflicting pair.
    let s = ok(&ctx, &Atom::Equal(z, w));
    let s = ok(&s, &Atom::Equal(x, y));
    match s.add(&Atom::Diseq(x, y)) {
        Status::Inconsistent(j) => {
            let core = s.core(&j);
            assert!(core.contains(&&Atom::Equal(x, y)));
            assert!(!core.contains(&&Atom::Equal(z, w)));
        }
        s => panic!("expected Inconsistent, got {s:?}"),
    }
}

#[test]
fn semantic_equality_ignores_build_order() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);

    let s1 = ok(&ctx, &Atom::Equal(x, y));
    let s2 = ok(&ctx, &Atom::Equal(y, x));
    assert!(s1.eq(&s2));
    assert!(s1.eq(&s1.copy()));
    assert!(!s1.eq(&ctx));

    let s3 = ok(&ctx, &Atom::Diseq(x, y));
    assert!(!s1.eq(&s3));
}

#[test]
fn check_sat_answers_without_splitting() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let s = ok(&ctx, &Atom::Equal(x, y));
    assert!(s.check_sat().is_some());
}

#[test]
fn renaming_layer_congruence_deductions() {
    use kanon_solver::Deduction;

    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let u = ctx.alias_monadic("p", x);
    let v = ctx.alias_monadic("p", y);
    assert_ne!(u, v);
    assert_eq!(ctx.alias_monadic("p", x), u);

    let mut s = *ok(&ctx, &Atom::Equal(x, y));
    let ds = s.take_deductions();
    assert!(
        ds.contains(&Deduction::Equiv(u, v)) || ds.contains(&Deduction::Equiv(v, u)),
        "expected an equivalence, got {ds:?}"
    );
}

#[test]
fn renaming_layer_equality_propvar_lifecycle() {
    use kanon_solver::Deduction;

    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let u = ctx.alias_equal(x, y);

    let mut s = *ok(&ctx, &Atom::Equal(x, y));
    assert!(s.take_deductions().contains(&Deduction::Valid0(u)));

    let mut s = *ok(&ctx, &Atom::Diseq(x, y));
    assert!(s.take_deductions().contains(&Deduction::Unsat0(u)));
}

#[test]
fn renaming_layer_verdicts_refine_theory() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);

    // Assert p(x), merge x with y, then refuting p(y) must clash.
    let u = ctx.alias_monadic("p", x);
    ctx.assert_valid0(u).unwrap();
    let mut s = *ok(&ctx, &Atom::Equal(x, y));
    let v = s.alias_monadic("p", y);
    assert_eq!(v, u);
    assert!(s.assert_unsat0(v).is_err());
}

#[test]
fn renaming_layer_upward_reports() {
    use kanon_solver::Deduction;

    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let u = ctx.assert_valid1("p", x);
    let ds = ctx.take_deductions();
    assert!(ds.contains(&Deduction::Valid0(u)));
}

#[test]
fn config_is_captured_at_creation() {
    let cfg = Config {
        integer_solve: false,
        ..Config::default()
    };
    let mut ctx = Context::with_config(cfg);
    assert!(!ctx.config().integer_solve);

    // Without integer solving, 2x + 2y = 7 stays consistent even for
    // integer-constrained variables.
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let two = num_rational::BigRational::from_integer(2.into());
    let tx = ctx.terms_mut().mk_multq(two.clone(), x);
    let ty = ctx.terms_mut().mk_multq(two, y);
    let sum = ctx.terms_mut().mk_add(vec![tx, ty]);
    let seven = ctx.terms_mut().mk_int(7);

    let s = ok(&ctx, &Atom::In(x, Dom::int()));
    let s = ok(&s, &Atom::In(y, Dom::int()));
    let s = ok(&s, &Atom::Equal(sum, seven));
    drop(s);
}

#[test]
fn stats_accumulate() {
    let mut ctx = Context::empty();
    let x = ctx.terms_mut().mk_var("x", VarKind::External);
    let y = ctx.terms_mut().mk_var("y", VarKind::External);
    let fx = ctx.terms_mut().mk_uninterp("f", vec![x]);
    let fy = ctx.terms_mut().mk_uninterp("f", vec![y]);

    let s = ok(&ctx, &Atom::Equal(fx, fy));
    let s = ok(&s, &Atom::Equal(x, y));
    assert!(s.stats().atoms >= 2);
    assert!(s.stats().merges >= 2);
}

#[test]
fn exit_codes_are_stable() {
    use kanon_solver::exit;
    assert_eq!(exit::OK, 0);
    assert_eq!(exit::SYNTAX, 1);
    assert_eq!(exit::UNSAT, 2);
    assert_eq!(exit::UNKNOWN, 3);
}
