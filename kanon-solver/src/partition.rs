//! The Variable Partition `(V, D, C)`.
//!
//! Union-find over variables with a disequality store and an
//! arithmetic-domain store, all keyed by canonical representatives.
//! Every mutation appends to an ordered change buffer; the
//! combination engine drains the buffers in a fixed order, so the
//! canonical form of a context never depends on hash-table iteration
//! order.

use kanon_core::dom::{Dom, DomLookup};
use kanon_core::{Inconsistency, Justification, TermId, Terms};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// A merge event: `old` lost canonicity to `new`.
#[derive(Debug, Clone)]
pub struct VChange {
    /// The variable that is no longer canonical.
    pub old: TermId,
    /// Its new representative.
    pub new: TermId,
    /// Why the classes merged.
    pub just: Justification,
}

/// A new disequality between two canonical variables.
#[derive(Debug, Clone)]
pub struct DChange {
    /// One endpoint.
    pub a: TermId,
    /// The other endpoint.
    pub b: TermId,
    /// Why they are distinct.
    pub just: Justification,
}

/// A domain refinement on a canonical variable.
#[derive(Debug, Clone)]
pub struct CChange {
    /// The refined variable.
    pub var: TermId,
    /// Why the domain narrowed.
    pub just: Justification,
}

/// The partition.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Union-find parents; a missing entry is its own root.
    parent: FxHashMap<TermId, TermId>,
    /// Accumulated justification per class, keyed by root.
    class_just: FxHashMap<TermId, Justification>,
    /// Symmetric disequalities, keyed by canonical endpoint.
    diseqs: FxHashMap<TermId, Vec<(TermId, Justification)>>,
    /// Arithmetic domains, keyed by root.
    doms: FxHashMap<TermId, (Dom, Justification)>,
    v_changed: VecDeque<VChange>,
    d_changed: VecDeque<DChange>,
    c_changed: VecDeque<CChange>,
}

impl Partition {
    /// An empty partition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical representative of `x`.
    #[must_use]
    pub fn find(&self, x: TermId) -> TermId {
        let mut cur = x;
        while let Some(&p) = self.parent.get(&cur) {
            if p == cur {
                break;
            }
            cur = p;
        }
        cur
    }

    /// Whether `x` is canonical.
    #[must_use]
    pub fn is_canonical(&self, x: TermId) -> bool {
        self.find(x) == x
    }

    /// Whether `x` and `y` are known equal.
    #[must_use]
    pub fn equal(&self, x: TermId, y: TermId) -> bool {
        self.find(x) == self.find(y)
    }

    /// Whether `x` and `y` are known distinct.
    #[must_use]
    pub fn diseq(&self, x: TermId, y: TermId) -> bool {
        self.diseq_just(x, y).is_some()
    }

    /// The justification of a recorded disequality between the
    /// classes of `x` and `y`.
    #[must_use]
    pub fn diseq_just(&self, x: TermId, y: TermId) -> Option<&Justification> {
        let (rx, ry) = (self.find(x), self.find(y));
        self.diseqs
            .get(&rx)
            .and_then(|list| list.iter().find(|(o, _)| *o == ry))
            .map(|(_, j)| j)
    }

    /// The accumulated justification of the class of `x`.
    #[must_use]
    pub fn class_just(&self, x: TermId) -> Justification {
        self.class_just
            .get(&self.find(x))
            .cloned()
            .unwrap_or_default()
    }

    /// The domain of the class of `x`.
    #[must_use]
    pub fn dom(&self, x: TermId) -> Dom {
        self.doms
            .get(&self.find(x))
            .map(|(d, _)| d.clone())
            .unwrap_or_default()
    }

    /// The domain of the class of `x` with its justification.
    #[must_use]
    pub fn dom_just(&self, x: TermId) -> (Dom, Justification) {
        self.doms
            .get(&self.find(x))
            .cloned()
            .unwrap_or_else(|| (Dom::any(), Justification::empty()))
    }

    /// Merge the classes of `x` and `y`.
    ///
    /// The representative of the merged class is chosen by variable
    /// kind (external before rename before slack), ties on id.
    /// Returns the `(old, new)` pair when a merge actually happened.
    pub fn union(
        &mut self,
        terms: &Terms,
        x: TermId,
        y: TermId,
        j: &Justification,
    ) -> Result<Option<(TermId, TermId)>, Inconsistency> {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx == ry {
            return Ok(None);
        }
        if let Some(dj) = self.diseq_just(rx, ry) {
            let mut conflict = Justification::dep2(j, dj);
            conflict.merge(&self.class_just(rx));
            conflict.merge(&self.class_just(ry));
            return Err(Inconsistency::new(conflict));
        }

        let (new, old) = if terms.var_order(rx, ry) == std::cmp::Ordering::Less {
            (rx, ry)
        } else {
            (ry, rx)
        };
        self.parent.insert(old, new);

        let mut cj = self.class_just.remove(&old).unwrap_or_default();
        cj.merge(j);
        if let Some(prev) = self.class_just.get(&new) {
            cj.merge(prev);
        }
        self.class_just.insert(new, cj);

        // Migrate the loser's domain by meet.
        if let Some((dom_old, j_old)) = self.doms.remove(&old) {
            let (dom_new, j_new) = self.dom_just(new);
            let met = dom_new.meet(&dom_old);
            let mut mj = Justification::dep2(&j_old, &j_new);
            mj.merge(j);
            if met.is_empty() {
                mj.merge(&self.class_just(new));
                return Err(Inconsistency::new(mj));
            }
            let narrowed = met != dom_new;
            self.doms.insert(new, (met, mj.clone()));
            if narrowed {
                self.c_changed.push_back(CChange { var: new, just: mj });
            }
        }

        // Re-point the loser's disequality edges at the winner.
        if let Some(edges) = self.diseqs.remove(&old) {
            for (other, dj) in edges {
                debug_assert_ne!(other, new, "disequality with the merge target");
                if let Some(list) = self.diseqs.get_mut(&other) {
                    for entry in list.iter_mut() {
                        if entry.0 == old {
                            entry.0 = new;
                        }
                    }
                }
                let list = self.diseqs.entry(new).or_default();
                if !list.iter().any(|(o, _)| *o == other) {
                    list.push((other, dj));
                }
            }
        }

        self.v_changed.push_back(VChange {
            old,
            new,
            just: j.clone(),
        });
        Ok(Some((old, new)))
    }

    /// Record `x /= y`.
    pub fn separate(
        &mut self,
        x: TermId,
        y: TermId,
        j: &Justification,
    ) -> Result<(), Inconsistency> {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx == ry {
            let mut conflict = j.clone();
            conflict.merge(&self.class_just(rx));
            return Err(Inconsistency::new(conflict));
        }
        if self.diseq(rx, ry) {
            return Ok(());
        }
        self.diseqs.entry(rx).or_default().push((ry, j.clone()));
        self.diseqs.entry(ry).or_default().push((rx, j.clone()));
        self.d_changed.push_back(DChange {
            a: rx,
            b: ry,
            just: j.clone(),
        });
        Ok(())
    }

    /// Meet the domain of `x`'s class with `d`. Returns whether the
    /// domain narrowed.
    pub fn refine(
        &mut self,
        x: TermId,
        d: &Dom,
        j: &Justification,
    ) -> Result<bool, Inconsistency> {
        let r = self.find(x);
        let (cur, cur_j) = self.dom_just(r);
        let met = cur.meet(d);
        if met.is_empty() {
            let mut conflict = Justification::dep2(j, &cur_j);
            conflict.merge(&self.class_just(r));
            return Err(Inconsistency::new(conflict));
        }
        if met == cur {
            return Ok(false);
        }
        let mut mj = Justification::dep2(j, &cur_j);
        mj.merge(&self.class_just(r));
        self.doms.insert(r, (met, mj.clone()));
        self.c_changed.push_back(CChange { var: r, just: mj });
        Ok(true)
    }

    /// Next pending merge event.
    pub fn pop_v(&mut self) -> Option<VChange> {
        self.v_changed.pop_front()
    }

    /// Next pending disequality event.
    pub fn pop_d(&mut self) -> Option<DChange> {
        self.d_changed.pop_front()
    }

    /// Next pending domain event.
    pub fn pop_c(&mut self) -> Option<CChange> {
        self.c_changed.pop_front()
    }

    /// Whether any change buffer is non-empty.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.v_changed.is_empty() || !self.d_changed.is_empty() || !self.c_changed.is_empty()
    }

    /// All variables the partition has seen as non-roots, with their
    /// representatives (for invariant checks and semantic equality).
    pub fn entries(&self) -> impl Iterator<Item = (TermId, TermId)> + '_ {
        self.parent.iter().map(|(&v, _)| (v, self.find(v)))
    }

    /// Disequality edges over canonical endpoints, deduplicated and
    /// ordered.
    #[must_use]
    pub fn diseq_pairs(&self) -> Vec<(TermId, TermId)> {
        let mut out: Vec<(TermId, TermId)> = Vec::new();
        for (&a, list) in self.diseqs.iter() {
            if !self.is_canonical(a) {
                continue;
            }
            for (b, _) in list {
                let (lo, hi) = if a < *b { (a, *b) } else { (*b, a) };
                out.push((lo, hi));
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

impl DomLookup for Partition {
    fn dom_of(&self, v: TermId) -> Dom {
        self.dom(v)
    }

    fn dom_deps(&self, v: TermId) -> Justification {
        self.dom_just(v).1
    }
}
