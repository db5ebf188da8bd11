//! Theory Solution Sets.
//!
//! One triangular solved form per theory: oriented bindings
//! `x -> t` with pairwise-distinct variable left-hand sides, no
//! right-hand side containing a left-hand side, and right-hand sides
//! canonical. `compose` applies a solved form and closes under the
//! propagations it triggers; `merge` fuses a single variable equality
//! through the set. Both return the variable equalities and fresh
//! bindings they generate; the engine feeds the former back into the
//! partition.

use kanon_core::dom::DomLookup;
use kanon_core::{Config, Inconsistency, Justification, SolveError, TermId, Terms, TheoryId};
use kanon_theories::{Theory, VarMap};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// What a composition produced, for the engine to act on.
#[derive(Debug, Default)]
pub struct MergeOut {
    /// Variable equalities to record in the partition.
    pub var_eqs: Vec<(TermId, TermId, Justification)>,
    /// Bindings (re)established, for domain refinement.
    pub bound: Vec<(TermId, TermId, Justification)>,
    /// Unsolvable equalities dropped (completeness loss).
    pub fallbacks: u64,
}

/// A triangular solved form for one theory.
#[derive(Debug, Clone)]
pub struct SolutionSet {
    th: TheoryId,
    bind: BTreeMap<TermId, (TermId, Justification)>,
    inv: FxHashMap<TermId, TermId>,
    uses: FxHashMap<TermId, BTreeSet<TermId>>,
}

struct BindMap<'a>(&'a BTreeMap<TermId, (TermId, Justification)>);

impl VarMap for BindMap<'_> {
    fn image(&self, v: TermId) -> Option<TermId> {
        self.0.get(&v).map(|(t, _)| *t)
    }
}

impl SolutionSet {
    /// An empty solution set for theory `th`.
    #[must_use]
    pub fn new(th: TheoryId) -> Self {
        Self {
            th,
            bind: BTreeMap::new(),
            inv: FxHashMap::default(),
            uses: FxHashMap::default(),
        }
    }

    /// The theory this set belongs to.
    #[must_use]
    pub fn theory_id(&self) -> TheoryId {
        self.th
    }

    /// The right-hand side of `x`, if bound.
    #[must_use]
    pub fn apply(&self, x: TermId) -> Option<(TermId, &Justification)> {
        self.bind.get(&x).map(|(t, j)| (*t, j))
    }

    /// The right-hand side of `x`, or `x` itself.
    #[must_use]
    pub fn find(&self, x: TermId) -> TermId {
        self.bind.get(&x).map_or(x, |(t, _)| *t)
    }

    /// The left-hand side bound to exactly `t`, if any.
    #[must_use]
    pub fn inv_var(&self, t: TermId) -> Option<TermId> {
        self.inv.get(&t).copied()
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bind.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bind.is_empty()
    }

    /// Iterate bindings in lhs order.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, TermId, &Justification)> + '_ {
        self.bind.iter().map(|(&x, (t, j))| (x, *t, j))
    }

    /// The bound variables whose right-hand sides mention `x`.
    #[must_use]
    pub fn users_of(&self, x: TermId) -> Vec<TermId> {
        self.uses
            .get(&x)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Normalize `t` through the current bindings, returning the
    /// result and the justifications of the bindings used.
    pub fn norm_through(&self, terms: &mut Terms, t: TermId) -> (TermId, Justification) {
        let th = kanon_theories::theory(self.th);
        let mut j = Justification::empty();
        let mut leaves = Vec::new();
        th.vars(terms, t, &mut leaves);
        for leaf in leaves {
            if let Some((_, lj)) = self.apply(leaf) {
                j.merge(lj);
            }
        }
        let normed = th.norm(terms, &BindMap(&self.bind), t);
        (normed, j)
    }

    fn remove_binding(&mut self, x: TermId, terms: &Terms) -> Option<(TermId, Justification)> {
        let (rhs, j) = self.bind.remove(&x)?;
        if self.inv.get(&rhs) == Some(&x) {
            self.inv.remove(&rhs);
        }
        let th = kanon_theories::theory(self.th);
        let mut leaves = Vec::new();
        th.vars(terms, rhs, &mut leaves);
        for leaf in leaves {
            if let Some(set) = self.uses.get_mut(&leaf) {
                set.remove(&x);
                if set.is_empty() {
                    self.uses.remove(&leaf);
                }
            }
        }
        Some((rhs, j))
    }

    fn insert_binding(&mut self, terms: &Terms, x: TermId, rhs: TermId, j: Justification) {
        debug_assert!(terms.is_var(x), "solution lhs must be a variable");
        debug_assert!(!self.bind.contains_key(&x), "lhs rebound without removal");
        let th = kanon_theories::theory(self.th);
        let mut leaves = Vec::new();
        th.vars(terms, rhs, &mut leaves);
        for leaf in leaves {
            self.uses.entry(leaf).or_default().insert(x);
        }
        self.inv.entry(rhs).or_insert(x);
        self.bind.insert(x, (rhs, j));
    }

    /// Compose a solved form `eqs` into the set, closing under the
    /// propagations it triggers.
    pub fn compose(
        &mut self,
        terms: &mut Terms,
        cfg: &Config,
        doms: &dyn DomLookup,
        eqs: Vec<(TermId, TermId, Justification)>,
    ) -> Result<MergeOut, Inconsistency> {
        let mut out = MergeOut::default();
        let mut wl: VecDeque<(TermId, TermId, Justification)> = eqs.into();
        let mut pending: VecDeque<(TermId, TermId, Justification)> = VecDeque::new();
        self.drain(terms, cfg, doms, &mut wl, &mut pending, &mut out)?;
        Ok(out)
    }

    /// Fuse the merge `old -> new` through the set: reconcile the two
    /// classes' bindings and re-normalize every right-hand side
    /// mentioning `old`.
    pub fn merge(
        &mut self,
        terms: &mut Terms,
        cfg: &Config,
        doms: &dyn DomLookup,
        old: TermId,
        new: TermId,
        j: &Justification,
    ) -> Result<MergeOut, Inconsistency> {
        let th = kanon_theories::theory(self.th);
        let mut out = MergeOut::default();
        let mut wl: VecDeque<(TermId, TermId, Justification)> = VecDeque::new();
        let mut pending: VecDeque<(TermId, TermId, Justification)> = VecDeque::new();

        if let Some((r_old, j_old)) = self.remove_binding(old, terms) {
            let mut jj = Justification::dep2(j, &j_old);
            match self.apply(new) {
                Some((r_new, j_new)) => {
                    jj.merge(j_new);
                    pending.push_back((r_old, r_new, jj));
                }
                None => wl.push_back((new, r_old, jj)),
            }
        }

        for y in self.users_of(old) {
            let Some((r_y, j_y)) = self.remove_binding(y, terms) else {
                continue;
            };
            let fused = th.norm(terms, &(old, new), r_y);
            wl.push_back((y, fused, Justification::dep2(j, &j_y)));
        }

        self.drain(terms, cfg, doms, &mut wl, &mut pending, &mut out)?;
        Ok(out)
    }

    fn drain(
        &mut self,
        terms: &mut Terms,
        cfg: &Config,
        doms: &dyn DomLookup,
        wl: &mut VecDeque<(TermId, TermId, Justification)>,
        pending: &mut VecDeque<(TermId, TermId, Justification)>,
        out: &mut MergeOut,
    ) -> Result<(), Inconsistency> {
        let th = kanon_theories::theory(self.th);
        loop {
            if let Some((x, t, j)) = wl.pop_front() {
                // Normalize through current bindings, charging their
                // justifications.
                let mut j = j;
                let mut leaves = Vec::new();
                th.vars(terms, t, &mut leaves);
                for leaf in leaves {
                    if let Some((_, lj)) = self.apply(leaf) {
                        j.merge(lj);
                    }
                }
                let t = th.norm(terms, &BindMap(&self.bind), t);

                if t == x {
                    continue;
                }
                if let Some((r_x, j_x)) = self.apply(x) {
                    // A second definition for x: reconcile the two
                    // right-hand sides instead of rebinding.
                    let jj = Justification::dep2(&j, j_x);
                    pending.push_back((r_x, t, jj));
                    continue;
                }
                if terms.is_var(t) {
                    out.var_eqs.push((x, t, j));
                    continue;
                }
                if let Some(x0) = self.inv_var(t) {
                    if x0 != x {
                        let mut jj = j;
                        if let Some((_, j0)) = self.apply(x0) {
                            jj.merge(j0);
                        }
                        out.var_eqs.push((x, x0, jj));
                        continue;
                    }
                }
                if terms.occurs(x, t) {
                    // Substitution re-introduced the lhs; re-solve.
                    pending.push_back((x, t, j));
                    continue;
                }
                tracing::trace!(th = %self.th, x = %terms.pp(x), t = %terms.pp(t), "bind");
                self.insert_binding(terms, x, t, j.clone());
                out.bound.push((x, t, j));
                // Re-normalize everything that mentioned x as a leaf.
                let users = self.users_of(x);
                for y in users {
                    let Some((r_y, j_y)) = self.remove_binding(y, terms) else {
                        continue;
                    };
                    wl.push_back((y, r_y, j_y));
                }
                continue;
            }
            if let Some((a, b, j)) = pending.pop_front() {
                match th.solve(terms, cfg, doms, a, b) {
                    Ok(pairs) => {
                        for (x, t) in pairs {
                            wl.push_back((x, t, j.clone()));
                        }
                    }
                    Err(SolveError::Unsat) => {
                        // Charge the domains consulted by the solver
                        // (integer constraints in particular).
                        let mut leaves = Vec::new();
                        th.vars(terms, a, &mut leaves);
                        th.vars(terms, b, &mut leaves);
                        let mut j = j;
                        for leaf in leaves {
                            j.merge(&doms.dom_deps(leaf));
                        }
                        return Err(Inconsistency::new(j));
                    }
                    Err(SolveError::Unsolvable) => {
                        tracing::debug!(
                            th = %self.th,
                            a = %terms.pp(a),
                            b = %terms.pp(b),
                            "unsolvable equality dropped after aliasing"
                        );
                        out.fallbacks += 1;
                    }
                }
                continue;
            }
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanon_core::dom::NoDoms;
    use kanon_core::{AtomId, VarKind};

    fn j(n: u32) -> Justification {
        Justification::axiom(AtomId(n))
    }

    fn no_subst() -> std::collections::BTreeMap<TermId, TermId> {
        std::collections::BTreeMap::new()
    }

    #[test]
    fn test_compose_binds_and_indexes() {
        let mut terms = Terms::new();
        let mut s = SolutionSet::new(TheoryId::La);
        let v = terms.mk_fresh(VarKind::Rename);
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let sum = terms.mk_add(vec![x, y]);
        let sum = kanon_theories::theory(TheoryId::La).norm(
            &mut terms,
            &no_subst(),
            sum,
        );

        let out = s
            .compose(&mut terms, &Config::default(), &NoDoms, vec![(v, sum, j(0))])
            .unwrap();
        assert!(out.var_eqs.is_empty());
        assert_eq!(out.bound.len(), 1);
        assert_eq!(s.find(v), sum);
        assert_eq!(s.inv_var(sum), Some(v));
        assert_eq!(s.users_of(x), vec![v]);
    }

    #[test]
    fn test_compose_inv_hit_emits_equality() {
        let mut terms = Terms::new();
        let mut s = SolutionSet::new(TheoryId::La);
        let v = terms.mk_fresh(VarKind::Rename);
        let w = terms.mk_fresh(VarKind::Rename);
        let x = terms.mk_var("x", VarKind::External);
        let two = terms.mk_int(2);
        let t = terms.mk_add(vec![x, two]);
        let t = kanon_theories::theory(TheoryId::La).norm(
            &mut terms,
            &no_subst(),
            t,
        );

        s.compose(&mut terms, &Config::default(), &NoDoms, vec![(v, t, j(0))])
            .unwrap();
        let out = s
            .compose(&mut terms, &Config::default(), &NoDoms, vec![(w, t, j(1))])
            .unwrap();
        assert_eq!(out.var_eqs.len(), 1);
        let (a, b, jj) = &out.var_eqs[0];
        assert_eq!((*a, *b), (w, v));
        assert!(jj.contains(AtomId(0)) && jj.contains(AtomId(1)));
    }

    #[test]
    fn test_compose_variable_rhs_is_external() {
        let mut terms = Terms::new();
        let mut s = SolutionSet::new(TheoryId::La);
        let v = terms.mk_fresh(VarKind::Rename);
        let x = terms.mk_var("x", VarKind::External);
        let out = s
            .compose(&mut terms, &Config::default(), &NoDoms, vec![(v, x, j(0))])
            .unwrap();
        assert_eq!(out.var_eqs.len(), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn test_merge_reconciles_two_bindings() {
        // v = x + y, w = 3; merging w into v forces x + y = 3,
        // which solves to x = 3 - y and rebinds v to 3.
        let mut terms = Terms::new();
        let mut s = SolutionSet::new(TheoryId::La);
        let la = kanon_theories::theory(TheoryId::La);
        let v = terms.mk_fresh(VarKind::Rename);
        let w = terms.mk_fresh(VarKind::Rename);
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let sum = terms.mk_add(vec![x, y]);
        let sum = la.norm(&mut terms, &no_subst(), sum);
        let three = terms.mk_int(3);

        s.compose(
            &mut terms,
            &Config::default(),
            &NoDoms,
            vec![(v, sum, j(0)), (w, three, j(1))],
        )
        .unwrap();

        let out = s
            .merge(&mut terms, &Config::default(), &NoDoms, w, v, &j(2))
            .unwrap();
        // w's binding is gone, v is now bound to the constant, and x
        // got an oriented definition.
        assert!(s.apply(w).is_none());
        assert_eq!(s.find(v), three);
        let (rx, _) = s.apply(x).expect("x solved");
        let e = kanon_theories::LinExpr::of_term(&terms, rx);
        assert_eq!(e.monomials.len(), 1);
        assert!(out.bound.iter().any(|(l, _, _)| *l == x));
    }

    #[test]
    fn test_triangularity_after_chained_compose() {
        let mut terms = Terms::new();
        let mut s = SolutionSet::new(TheoryId::La);
        let la = kanon_theories::theory(TheoryId::La);
        let v = terms.mk_fresh(VarKind::Rename);
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let sum = terms.mk_add(vec![x, y]);
        let sum = la.norm(&mut terms, &no_subst(), sum);
        s.compose(&mut terms, &Config::default(), &NoDoms, vec![(v, sum, j(0))])
            .unwrap();
        // Now x gets a definition; v's rhs must be re-normalized.
        let one = terms.mk_int(1);
        s.compose(&mut terms, &Config::default(), &NoDoms, vec![(x, one, j(1))])
            .unwrap();
        for (_, rhs, _) in s.iter() {
            for (lhs, _, _) in s.iter() {
                assert!(!terms.occurs(lhs, rhs), "triangularity violated");
            }
        }
        // v = 1 + y after fusing x = 1.
        let e = kanon_theories::LinExpr::of_term(&terms, s.find(v));
        assert_eq!(e.constant, num_rational::BigRational::from_integer(1.into()));
        assert_eq!(e.monomials.len(), 1);
    }
}
