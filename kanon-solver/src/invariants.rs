//! Runtime invariant checks for the combination engine.
//!
//! These are checked from tests (and may be called by embedders after
//! any `add`) to catch drift early.

use crate::context::Context;
use kanon_core::{TermKind, TheoryId};

/// Invariant: `find(find(x)) = find(x)` for every variable the
/// partition has seen, and representatives are preferred by kind.
pub fn check_partition_idempotent(ctx: &Context) -> Result<(), String> {
    let p = ctx.partition();
    for (v, root) in p.entries() {
        if p.find(root) != root {
            return Err(format!(
                "representative of {} is itself non-canonical",
                ctx.terms().pp(v)
            ));
        }
        let (Some(kv), Some(kr)) = (ctx.terms().var_kind(v), ctx.terms().var_kind(root)) else {
            return Err("partition contains a non-variable".to_string());
        };
        if kr > kv {
            return Err(format!(
                "representative {} is less preferred than member {}",
                ctx.terms().pp(root),
                ctx.terms().pp(v)
            ));
        }
    }
    Ok(())
}

/// Invariant: the congruence-closure configuration is closed - any
/// two bindings with the same symbol and pairwise-equal arguments
/// have equal alias variables.
pub fn check_congruence_closed(ctx: &Context) -> Result<(), String> {
    let p = ctx.partition();
    let funs = ctx.funs();
    let all: Vec<_> = funs.iter().collect();
    for (i, (u, bu)) in all.iter().enumerate() {
        for (v, bv) in all.iter().skip(i + 1) {
            if bu.sym != bv.sym || bu.args.len() != bv.args.len() {
                continue;
            }
            let args_equal = bu
                .args
                .iter()
                .zip(bv.args.iter())
                .all(|(&a, &b)| p.equal(a, b));
            if args_equal && !p.equal(*u, *v) {
                return Err(format!(
                    "congruence violation: {} and {} bind {:?} on equal arguments",
                    ctx.terms().pp(*u),
                    ctx.terms().pp(*v),
                    bu.sym
                ));
            }
        }
    }
    Ok(())
}

/// Invariant: every solution set is in triangular solved form - no
/// right-hand side contains any left-hand side, and left-hand sides
/// are variables.
pub fn check_triangular(ctx: &Context) -> Result<(), String> {
    for &i in TheoryId::ALL.iter() {
        let s = ctx.solution(i);
        let lhss: Vec<_> = s.iter().map(|(x, _, _)| x).collect();
        for (x, rhs, _) in s.iter() {
            if !matches!(ctx.terms().kind(x), TermKind::Var { .. }) {
                return Err(format!("{i}: lhs {} is not a variable", ctx.terms().pp(x)));
            }
            for &l in &lhss {
                if ctx.terms().occurs(l, rhs) {
                    return Err(format!(
                        "{i}: rhs of {} contains lhs {}",
                        ctx.terms().pp(x),
                        ctx.terms().pp(l)
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Run every invariant check.
pub fn check_all(ctx: &Context) -> Result<(), String> {
    check_partition_idempotent(ctx)?;
    check_congruence_closed(ctx)?;
    check_triangular(ctx)?;
    Ok(())
}
