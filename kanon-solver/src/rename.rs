//! The Renaming Layer.
//!
//! Bridges monadic predicate applications `p(x)` and variable
//! equalities `x = y` to propositional variables for an external
//! Boolean solver. A dependency index keyed by canonical variables
//! makes alias lookup O(deg(x)) and drives the deductions emitted
//! when classes merge or separate. The layer only *emits*
//! implications; consuming them into a search is the collaborator's
//! business.

use crate::partition::Partition;
use kanon_core::{NameId, TermId};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// A propositional variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropVar(u32);

impl PropVar {
    /// The raw index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PropVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// What a propositional variable stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// `u` iff `p(x)`.
    Monadic(NameId, TermId),
    /// `u` iff `x = y`.
    Equal(TermId, TermId),
}

/// A propositional-level deduction emitted to the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deduction {
    /// The two propvars are equivalent.
    Equiv(PropVar, PropVar),
    /// The first implies the second.
    Implies(PropVar, PropVar),
    /// At most one of the two holds.
    Disjoint(PropVar, PropVar),
    /// The propvar holds in the current context.
    Valid0(PropVar),
    /// The propvar is refuted by the current context.
    Unsat0(PropVar),
}

/// The renaming state.
#[derive(Debug, Clone, Default)]
pub struct Rename {
    next: u32,
    payloads: BTreeMap<PropVar, Payload>,
    /// Canonical variable -> propvars whose payload mentions it.
    deps: FxHashMap<TermId, BTreeSet<PropVar>>,
    /// Subsumption between predicate symbols: `p(x) => q(x)`.
    sub: BTreeSet<(NameId, NameId)>,
    /// Disjointness between predicate symbols, stored normalized.
    disjoint: BTreeSet<(NameId, NameId)>,
    out: VecDeque<Deduction>,
}

impl Rename {
    /// An empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `p(x) => q(x)` for all `x`.
    pub fn declare_sub(&mut self, p: NameId, q: NameId) {
        self.sub.insert((p, q));
    }

    /// Declare `p` and `q` disjoint.
    pub fn declare_disjoint(&mut self, p: NameId, q: NameId) {
        let key = if p <= q { (p, q) } else { (q, p) };
        self.disjoint.insert(key);
    }

    fn is_sub(&self, p: NameId, q: NameId) -> bool {
        self.sub.contains(&(p, q))
    }

    fn is_disjoint(&self, p: NameId, q: NameId) -> bool {
        let key = if p <= q { (p, q) } else { (q, p) };
        self.disjoint.contains(&key)
    }

    /// The payload of `u`.
    #[must_use]
    pub fn payload(&self, u: PropVar) -> Option<Payload> {
        self.payloads.get(&u).copied()
    }

    /// Drain the emitted deductions, in emission order.
    pub fn take_deductions(&mut self) -> Vec<Deduction> {
        self.out.drain(..).collect()
    }

    /// Number of deductions waiting to be drained.
    #[must_use]
    pub fn pending_deductions(&self) -> usize {
        self.out.len()
    }

    fn fresh(&mut self) -> PropVar {
        let u = PropVar(self.next);
        self.next += 1;
        u
    }

    /// The propvar for `p(x)`, reusing a semantically equivalent
    /// binding when one exists. Symbol relations against propvars
    /// already living on the class are emitted immediately.
    pub fn alias_monadic(&mut self, partition: &Partition, p: NameId, x: TermId) -> PropVar {
        let cx = partition.find(x);
        let mut peers: Vec<(PropVar, NameId)> = Vec::new();
        if let Some(set) = self.deps.get(&cx) {
            for &u in set {
                if let Some(Payload::Monadic(q, y)) = self.payloads.get(&u) {
                    if partition.find(*y) == cx {
                        if *q == p {
                            return u;
                        }
                        peers.push((u, *q));
                    }
                }
            }
        }
        let u = self.fresh();
        self.payloads.insert(u, Payload::Monadic(p, cx));
        self.deps.entry(cx).or_default().insert(u);
        for (v, q) in peers {
            if self.is_sub(p, q) {
                self.out.push_back(Deduction::Implies(u, v));
            }
            if self.is_sub(q, p) {
                self.out.push_back(Deduction::Implies(v, u));
            }
            if self.is_disjoint(p, q) {
                self.out.push_back(Deduction::Disjoint(u, v));
            }
        }
        u
    }

    /// The propvar for `x = y`, reusing a semantically equivalent
    /// binding when one exists. Emits `Valid0`/`Unsat0` immediately
    /// when the context already decides the equality.
    pub fn alias_equal(&mut self, partition: &Partition, x: TermId, y: TermId) -> PropVar {
        let (cx, cy) = (partition.find(x), partition.find(y));
        if let Some(set) = self.deps.get(&cx) {
            for &u in set {
                if let Some(Payload::Equal(a, b)) = self.payloads.get(&u) {
                    let (ca, cb) = (partition.find(*a), partition.find(*b));
                    if (ca == cx && cb == cy) || (ca == cy && cb == cx) {
                        return u;
                    }
                }
            }
        }
        let u = self.fresh();
        self.payloads.insert(u, Payload::Equal(cx, cy));
        self.deps.entry(cx).or_default().insert(u);
        self.deps.entry(cy).or_default().insert(u);
        if cx == cy {
            self.out.push_back(Deduction::Valid0(u));
        } else if partition.diseq(cx, cy) {
            self.out.push_back(Deduction::Unsat0(u));
        }
        u
    }

    /// Called after the partition merged `old` into `new`: pair the
    /// dependency sets, emit the implied propositional facts, and
    /// merge the entries under the surviving representative.
    pub fn propagate_eq(&mut self, partition: &Partition, old: TermId, new: TermId) {
        let Some(old_set) = self.deps.remove(&old) else {
            return;
        };
        let new_set = self.deps.get(&new).cloned().unwrap_or_default();

        for &u in &old_set {
            let Some(pu) = self.payloads.get(&u).copied() else {
                continue;
            };
            // An equality payload may have become trivially true.
            if let Payload::Equal(a, b) = pu {
                if partition.equal(a, b) {
                    self.out.push_back(Deduction::Valid0(u));
                }
            }
            for &v in &new_set {
                if u == v {
                    continue;
                }
                let Some(pv) = self.payloads.get(&v).copied() else {
                    continue;
                };
                self.relate(partition, u, pu, v, pv);
            }
        }
        self.deps.entry(new).or_default().extend(old_set);
    }

    fn relate(&mut self, partition: &Partition, u: PropVar, pu: Payload, v: PropVar, pv: Payload) {
        match (pu, pv) {
            (Payload::Monadic(p, x), Payload::Monadic(q, y)) => {
                if !partition.equal(x, y) {
                    return;
                }
                if p == q {
                    self.out.push_back(Deduction::Equiv(u, v));
                } else {
                    if self.is_sub(p, q) {
                        self.out.push_back(Deduction::Implies(u, v));
                    }
                    if self.is_sub(q, p) {
                        self.out.push_back(Deduction::Implies(v, u));
                    }
                    if self.is_disjoint(p, q) {
                        self.out.push_back(Deduction::Disjoint(u, v));
                    }
                }
            }
            (Payload::Equal(a, b), Payload::Equal(c, d)) => {
                let (ca, cb) = (partition.find(a), partition.find(b));
                let (cc, cd) = (partition.find(c), partition.find(d));
                if (ca == cc && cb == cd) || (ca == cd && cb == cc) {
                    self.out.push_back(Deduction::Equiv(u, v));
                }
            }
            _ => {}
        }
    }

    /// Called after the partition separated `a` from `b`: refute
    /// every propvar encoding that equality.
    pub fn propagate_deq(&mut self, partition: &Partition, a: TermId, b: TermId) {
        let (ca, cb) = (partition.find(a), partition.find(b));
        let mut hits: Vec<PropVar> = Vec::new();
        for side in [ca, cb] {
            if let Some(set) = self.deps.get(&side) {
                for &u in set {
                    if let Some(Payload::Equal(x, y)) = self.payloads.get(&u) {
                        let (cx, cy) = (partition.find(*x), partition.find(*y));
                        if (cx == ca && cy == cb) || (cx == cb && cy == ca) {
                            hits.push(u);
                        }
                    }
                }
            }
        }
        hits.sort_unstable();
        hits.dedup();
        for u in hits {
            self.out.push_back(Deduction::Unsat0(u));
        }
    }

    /// Look up the propvar for `p(x)` and report it valid upward.
    pub fn propagate_valid1(&mut self, partition: &Partition, p: NameId, x: TermId) -> PropVar {
        let u = self.alias_monadic(partition, p, x);
        self.out.push_back(Deduction::Valid0(u));
        u
    }

    /// Look up the propvar for `p(x)` and report it refuted upward.
    pub fn propagate_unsat1(&mut self, partition: &Partition, p: NameId, x: TermId) -> PropVar {
        let u = self.alias_monadic(partition, p, x);
        self.out.push_back(Deduction::Unsat0(u));
        u
    }
}
