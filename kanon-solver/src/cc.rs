//! Congruence Closure.
//!
//! The configuration `U`: bindings `u -> f(args)` from alias
//! variables to flat applications of uninterpreted symbols, with all
//! variables canonical. A signature table keyed on `(f, canonical
//! args)` detects congruent pairs; a use index drives re-keying when
//! a variable loses canonicity. `close` restores the invariant that
//! `V |= args = args'  =>  V |= u = u'` after a merge.

use crate::partition::Partition;
use kanon_core::{Inconsistency, Justification, Sym, TermId, Terms, VarKind};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

type Args = SmallVec<[TermId; 4]>;

/// One flat application bound to an alias variable.
#[derive(Debug, Clone)]
pub struct Binding {
    /// The applied symbol.
    pub sym: Sym,
    /// Canonical argument variables.
    pub args: Args,
    /// Dependencies accumulated through re-keying.
    pub just: Justification,
}

/// The congruence-closure configuration.
#[derive(Debug, Clone, Default)]
pub struct Funs {
    /// Bindings keyed by canonical alias variable. A class may carry
    /// several distinct applications.
    bindings: BTreeMap<TermId, Vec<Binding>>,
    /// Signature table: `(f, canonical args) -> alias`.
    sig: FxHashMap<(Sym, Args), TermId>,
    /// Use index: canonical argument variable -> binding keys.
    uses: FxHashMap<TermId, BTreeSet<TermId>>,
}

impl Funs {
    /// An empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The alias variable for `f(args)`, creating a fresh rename
    /// variable and binding if none exists up to `V`. Must be called
    /// in a congruence-closed state.
    pub fn alias(
        &mut self,
        terms: &mut Terms,
        partition: &Partition,
        sym: Sym,
        args: &[TermId],
    ) -> TermId {
        let cargs: Args = args.iter().map(|&a| partition.find(a)).collect();
        if let Some(&u) = self.sig.get(&(sym.clone(), cargs.clone())) {
            return partition.find(u);
        }
        let u = terms.mk_fresh(VarKind::Rename);
        tracing::trace!(alias = %terms.pp(u), sym = ?sym, "cc alias");
        self.insert(u, sym, cargs, Justification::empty());
        u
    }

    /// The binding of `x`'s class, if any.
    #[must_use]
    pub fn lookup(&self, partition: &Partition, x: TermId) -> Option<&Binding> {
        self.bindings
            .get(&partition.find(x))
            .and_then(|list| list.first())
    }

    /// The canonical alias of `f(args)` up to `V`, if bound.
    #[must_use]
    pub fn inv(
        &self,
        partition: &Partition,
        sym: &Sym,
        args: &[TermId],
    ) -> Option<(TermId, &Justification)> {
        let cargs: Args = args.iter().map(|&a| partition.find(a)).collect();
        let u = *self.sig.get(&(sym.clone(), cargs))?;
        let just = self
            .bindings
            .get(&partition.find(u))
            .and_then(|list| {
                list.iter()
                    .find(|b| b.sym == *sym)
                    .map(|b| &b.just)
            })?;
        Some((partition.find(u), just))
    }

    fn insert(&mut self, u: TermId, sym: Sym, args: Args, just: Justification) {
        for &a in args.iter() {
            self.uses.entry(a).or_default().insert(u);
        }
        self.sig.insert((sym.clone(), args.clone()), u);
        self.bindings
            .entry(u)
            .or_default()
            .push(Binding { sym, args, just });
    }

    /// Re-establish congruence closure after `old` merged into `new`.
    ///
    /// Re-keys every binding mentioning `old`; when two bindings
    /// collapse to the same signature their aliases are unioned in
    /// the partition (queueing further merge events for the engine).
    /// Returns the number of congruence pairs closed.
    pub fn close(
        &mut self,
        terms: &Terms,
        partition: &mut Partition,
        old: TermId,
        new: TermId,
        j: &Justification,
    ) -> Result<u64, Inconsistency> {
        debug_assert_eq!(partition.find(old), partition.find(new));
        let mut closed = 0;

        let mut stale: Vec<(TermId, Binding)> = Vec::new();
        if let Some(list) = self.bindings.remove(&old) {
            stale.extend(list.into_iter().map(|b| (old, b)));
        }
        if let Some(users) = self.uses.remove(&old) {
            for u in users {
                if let Some(list) = self.bindings.remove(&u) {
                    stale.extend(list.into_iter().map(|b| (u, b)));
                }
            }
        }

        for (u, binding) in stale {
            self.sig.remove(&(binding.sym.clone(), binding.args.clone()));
            let cu = partition.find(u);
            let cargs: Args = binding.args.iter().map(|&a| partition.find(a)).collect();
            let key = (binding.sym.clone(), cargs.clone());

            if let Some(&v) = self.sig.get(&key) {
                let cv = partition.find(v);
                if cv != cu {
                    // Congruent pair: close it.
                    let mut cj = Justification::dep2(j, &binding.just);
                    if let Some(other) = self
                        .bindings
                        .get(&cv)
                        .and_then(|list| list.iter().find(|b| b.sym == binding.sym))
                    {
                        cj.merge(&other.just);
                    }
                    cj.merge(&partition.class_just(cu));
                    cj.merge(&partition.class_just(cv));
                    tracing::debug!(
                        u = %terms.pp(cu),
                        v = %terms.pp(cv),
                        "congruence merge"
                    );
                    partition.union(terms, cu, cv, &cj)?;
                    closed += 1;
                }
                // Either way the surviving binding covers this one.
                continue;
            }

            let dup = self
                .bindings
                .get(&cu)
                .is_some_and(|list| list.iter().any(|b| b.sym == binding.sym && b.args == cargs));
            if dup {
                continue;
            }
            let mut bj = binding.just;
            bj.merge(j);
            self.insert(cu, binding.sym, cargs, bj);
        }
        Ok(closed)
    }

    /// Iterate bindings in key order (for invariant checks and
    /// semantic equality).
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &Binding)> + '_ {
        self.bindings
            .iter()
            .flat_map(|(&u, list)| list.iter().map(move |b| (u, b)))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    /// Whether the configuration is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanon_core::AtomId;

    fn j(n: u32) -> Justification {
        Justification::axiom(AtomId(n))
    }

    #[test]
    fn test_alias_reuses_up_to_v() {
        let mut terms = Terms::new();
        let mut p = Partition::new();
        let mut funs = Funs::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let f = terms.intern_name("f");

        let u1 = funs.alias(&mut terms, &p, Sym::Uninterp(f), &[x]);
        let u2 = funs.alias(&mut terms, &p, Sym::Uninterp(f), &[x]);
        assert_eq!(u1, u2);
        let u3 = funs.alias(&mut terms, &p, Sym::Uninterp(f), &[y]);
        assert_ne!(u1, u3);

        // After x = y the closed configuration reuses one alias.
        p.union(&terms, x, y, &j(0)).unwrap();
        let vc = p.pop_v().unwrap();
        funs.close(&terms, &mut p, vc.old, vc.new, &vc.just).unwrap();
        let u4 = funs.alias(&mut terms, &p, Sym::Uninterp(f), &[y]);
        assert!(p.equal(u4, u1) || p.equal(u4, u3));
    }

    #[test]
    fn test_close_unions_congruent_aliases() {
        let mut terms = Terms::new();
        let mut p = Partition::new();
        let mut funs = Funs::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let f = terms.intern_name("f");

        let u = funs.alias(&mut terms, &p, Sym::Uninterp(f), &[x]);
        let v = funs.alias(&mut terms, &p, Sym::Uninterp(f), &[y]);
        assert!(!p.equal(u, v));

        p.union(&terms, x, y, &j(7)).unwrap();
        let vc = p.pop_v().unwrap();
        let closed = funs
            .close(&terms, &mut p, vc.old, vc.new, &vc.just)
            .unwrap();
        assert_eq!(closed, 1);
        assert!(p.equal(u, v));
        // The congruence equality depends on the input atom.
        let uc = p.pop_v().unwrap();
        assert!(uc.just.contains(AtomId(7)));
    }

    #[test]
    fn test_inv_finds_up_to_v() {
        let mut terms = Terms::new();
        let mut p = Partition::new();
        let mut funs = Funs::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let g = terms.intern_name("g");

        let u = funs.alias(&mut terms, &p, Sym::Uninterp(g), &[x]);
        p.union(&terms, x, y, &j(0)).unwrap();
        let vc = p.pop_v().unwrap();
        funs.close(&terms, &mut p, vc.old, vc.new, &vc.just).unwrap();

        let hit = funs.inv(&p, &Sym::Uninterp(g), &[y]);
        assert_eq!(hit.map(|(a, _)| a), Some(p.find(u)));

        // lookup goes the other way: alias class to application.
        let binding = funs.lookup(&p, u).expect("binding for u");
        assert_eq!(binding.sym, Sym::Uninterp(g));
        assert_eq!(binding.args.len(), 1);
        assert_eq!(binding.args[0], p.find(x));
    }
}
