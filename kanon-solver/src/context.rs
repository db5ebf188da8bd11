//! The Combination Engine.
//!
//! A [`Context`] owns the term arena, the variable partition, the
//! congruence-closure configuration, one solution set per theory,
//! and the renaming layer. `add` canonizes an atom against the
//! context, reports `Valid`/`Inconsistent` without committing, or
//! abstracts it into variable-level facts and drains the change
//! buffers to a fixpoint in a fixed theory order.
//!
//! `add` never mutates its receiver: it works on a private clone and
//! returns the clone on success, so failed additions cannot leak
//! partial state (the `protect` discipline as value semantics).

use crate::cc::Funs;
use crate::partition::{CChange, Partition};
use crate::rename::{Deduction, Payload, PropVar, Rename};
use crate::solution::{MergeOut, SolutionSet};
use kanon_core::dom::Dom;
use kanon_core::{
    Atom, AtomId, Config, Inconsistency, Justification, NameId, Stats, Sym, TermId, TermKind,
    Terms, TheoryId, VarKind,
};
use kanon_theories::{theory, LinExpr, Theory};
use smallvec::smallvec;

/// The verdict of `add`.
#[derive(Debug)]
pub enum Status {
    /// The atom is already entailed; the context is unchanged.
    Valid(Justification),
    /// The atom contradicts the context; the context is unchanged.
    Inconsistent(Justification),
    /// The atom was consistently added, producing a new context.
    Ok(Box<Context>),
}

enum Verdict {
    Valid(Justification),
    Inconsistent(Justification),
}

/// A logical context: the canonical representation of a conjunction
/// of atoms.
#[derive(Debug, Clone)]
pub struct Context {
    cfg: Config,
    terms: Terms,
    partition: Partition,
    funs: Funs,
    solutions: Vec<SolutionSet>,
    rename: Rename,
    ctxt: Vec<Atom>,
    stats: Stats,
    tt: TermId,
    ff: TermId,
}

impl Context {
    /// The initial context (top), with default configuration.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_config(Config::default())
    }

    /// The initial context with an explicit configuration.
    ///
    /// Configuration is captured here and never re-read.
    #[must_use]
    pub fn with_config(cfg: Config) -> Self {
        let mut terms = Terms::new();
        let tt = terms.mk_var("tt", VarKind::Label);
        let ff = terms.mk_var("ff", VarKind::Label);
        let mut partition = Partition::new();
        partition
            .separate(tt, ff, &Justification::empty())
            .expect("fresh partition");
        // The seeding event predates any observer.
        let _ = partition.pop_d();
        Self {
            cfg,
            terms,
            partition,
            funs: Funs::new(),
            solutions: TheoryId::ALL.iter().map(|&i| SolutionSet::new(i)).collect(),
            rename: Rename::new(),
            ctxt: Vec::new(),
            stats: Stats::default(),
            tt,
            ff,
        }
    }

    /// The term arena, for building atoms against this context.
    #[must_use]
    pub fn terms(&self) -> &Terms {
        &self.terms
    }

    /// Mutable access to the term arena.
    pub fn terms_mut(&mut self) -> &mut Terms {
        &mut self.terms
    }

    /// The atoms added so far, in order.
    #[must_use]
    pub fn atoms(&self) -> &[Atom] {
        &self.ctxt
    }

    /// Engine counters.
    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// The configuration captured at creation.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The distinguished always-true variable of the renaming layer.
    #[must_use]
    pub fn tt(&self) -> TermId {
        self.tt
    }

    /// The distinguished always-false variable of the renaming layer.
    #[must_use]
    pub fn ff(&self) -> TermId {
        self.ff
    }

    /// Deep copy for branching.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Always answers with the current context; no case splitting is
    /// performed.
    #[must_use]
    pub fn check_sat(&self) -> Option<&Context> {
        Some(self)
    }

    /// Add an atom.
    pub fn add(&self, atom: &Atom) -> Status {
        let mut work = self.clone();
        if let Some(v) = work.check(atom) {
            return match v {
                Verdict::Valid(j) => {
                    tracing::debug!(atom = %atom.pp(&work.terms), "valid");
                    Status::Valid(j)
                }
                Verdict::Inconsistent(j) => {
                    tracing::debug!(atom = %atom.pp(&work.terms), "inconsistent");
                    Status::Inconsistent(j)
                }
            };
        }
        let id = AtomId(work.ctxt.len() as u32);
        work.ctxt.push(atom.clone());
        work.stats.atoms += 1;
        let j = Justification::axiom(id);
        tracing::debug!(atom = %atom.pp(&work.terms), id = id.0, "process");
        match work.process(atom, &j) {
            Ok(()) => Status::Ok(Box::new(work)),
            Err(inc) => Status::Inconsistent(inc.justification),
        }
    }

    /// Add atoms in sequence, stopping at the first inconsistency.
    pub fn addl(&self, atoms: &[Atom]) -> Status {
        let mut cur = Box::new(self.clone());
        for a in atoms {
            match cur.add(a) {
                Status::Ok(next) => cur = next,
                Status::Valid(_) => {}
                inc @ Status::Inconsistent(_) => return inc,
            }
        }
        Status::Ok(cur)
    }

    /// Whether `atom` is entailed by the context.
    #[must_use]
    pub fn is_valid(&self, atom: &Atom) -> bool {
        matches!(self.add(atom), Status::Valid(_))
    }

    /// Whether `atom` contradicts the context.
    #[must_use]
    pub fn is_inconsistent(&self, atom: &Atom) -> bool {
        matches!(self.add(atom), Status::Inconsistent(_))
    }

    /// Map a justification back to input atoms, optionally narrowing
    /// to the cone of influence of its last atom.
    #[must_use]
    pub fn core(&self, j: &Justification) -> Vec<&Atom> {
        let mut ids: Vec<AtomId> = j.iter().collect();
        if self.cfg.cone_of_influence {
            if let Some(&seed) = ids.last() {
                let kept = self.cone_of(seed, &ids);
                if kept.len() < ids.len() {
                    tracing::warn!(
                        dropped = ids.len() - kept.len(),
                        "cone-of-influence core reduction may drop needed atoms"
                    );
                    ids = kept;
                }
            }
        }
        ids.iter().map(|id| &self.ctxt[id.0 as usize]).collect()
    }

    fn cone_of(&self, seed: AtomId, ids: &[AtomId]) -> Vec<AtomId> {
        let atom_vars = |a: &Atom| -> Vec<TermId> {
            let mut out = Vec::new();
            match a {
                Atom::Equal(s, t) | Atom::Diseq(s, t) => {
                    self.terms.vars_of(*s, &mut out);
                    self.terms.vars_of(*t, &mut out);
                }
                Atom::In(t, _) => self.terms.vars_of(*t, &mut out),
                Atom::True | Atom::False => {}
            }
            out
        };
        let mut cone: Vec<TermId> = atom_vars(&self.ctxt[seed.0 as usize]);
        let mut kept = vec![seed];
        loop {
            let mut grew = false;
            for &id in ids {
                if kept.contains(&id) {
                    continue;
                }
                let vars = atom_vars(&self.ctxt[id.0 as usize]);
                if vars.iter().any(|v| cone.contains(v)) {
                    for v in vars {
                        if !cone.contains(&v) {
                            cone.push(v);
                        }
                    }
                    kept.push(id);
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }
        kept.sort_unstable();
        kept
    }

    // ------------------------------------------------------------------
    // Canonization and the entailment check
    // ------------------------------------------------------------------

    /// The canonical form of `t` under the context, with the
    /// dependencies read along the way. Performs no aliasing: only
    /// lookups against existing bindings.
    fn can(&mut self, t: TermId) -> (TermId, Justification) {
        match self.terms.kind(t).clone() {
            TermKind::Var { .. } => (self.partition.find(t), self.partition.class_just(t)),
            TermKind::Num(_) => self.resolve_interp(TheoryId::La, t, Justification::empty()),
            TermKind::App { sym, args } => {
                if sym == Sym::Apply {
                    if let Some(reduced) = beta_reduce(&mut self.terms, args[0], args[1]) {
                        return self.can(reduced);
                    }
                }
                let mut j = Justification::empty();
                let mut cargs = Vec::with_capacity(args.len());
                for &a in args.iter() {
                    let (ca, ja) = self.can(a);
                    j.merge(&ja);
                    cargs.push(ca);
                }
                match sym.theory() {
                    Some(i) => {
                        let canon = theory(i).canon(&mut self.terms, &sym, &cargs);
                        let (normed, nj) = self.solutions[i.index()]
                            .norm_through(&mut self.terms, canon);
                        j.merge(&nj);
                        self.resolve_interp(i, normed, j)
                    }
                    None => {
                        if let Some((u, bj)) = self.funs.inv(&self.partition, &sym, &cargs) {
                            j.merge(bj);
                            j.merge(&self.partition.class_just(u));
                            (self.partition.find(u), j)
                        } else {
                            (self.terms.mk_app(sym, cargs), j)
                        }
                    }
                }
            }
        }
    }

    /// Map an interpreted canonical term back to a variable when the
    /// solution set knows one.
    fn resolve_interp(
        &self,
        i: TheoryId,
        t: TermId,
        mut j: Justification,
    ) -> (TermId, Justification) {
        if self.terms.is_var(t) {
            j.merge(&self.partition.class_just(t));
            return (self.partition.find(t), j);
        }
        if let Some(x) = self.solutions[i.index()].inv_var(t) {
            if let Some((_, bj)) = self.solutions[i.index()].apply(x) {
                j.merge(bj);
            }
            j.merge(&self.partition.class_just(x));
            return (self.partition.find(x), j);
        }
        (t, j)
    }

    /// The arithmetic domain of a canonical term.
    fn dom_of_term(&self, t: TermId) -> (Dom, Justification) {
        match self.terms.kind(t) {
            TermKind::Num(q) => (Dom::point(q.clone()), Justification::empty()),
            TermKind::Var { .. } => self.partition.dom_just(t),
            TermKind::App { sym, .. } if sym.theory() == Some(TheoryId::La) => {
                let e = LinExpr::of_term(&self.terms, t);
                let mut j = Justification::empty();
                for (leaf, _) in &e.monomials {
                    j.merge(&self.partition.dom_just(*leaf).1);
                }
                (e.dom(&self.terms, &self.partition), j)
            }
            _ => (Dom::any(), Justification::empty()),
        }
    }

    /// Decide an atom against the context without committing
    /// anything, when possible.
    fn check(&mut self, atom: &Atom) -> Option<Verdict> {
        match atom {
            Atom::True => Some(Verdict::Valid(Justification::empty())),
            Atom::False => Some(Verdict::Inconsistent(Justification::empty())),
            Atom::Equal(a, b) => {
                let (ca, ja) = self.can(*a);
                let (cb, jb) = self.can(*b);
                let mut j = Justification::dep2(&ja, &jb);
                if ca == cb {
                    return Some(Verdict::Valid(j));
                }
                if self.terms.is_var(ca) && self.terms.is_var(cb) {
                    if let Some(dj) = self.partition.diseq_just(ca, cb) {
                        j.merge(dj);
                        return Some(Verdict::Inconsistent(j));
                    }
                }
                if distinct_bv_constants(&self.terms, ca, cb) {
                    return Some(Verdict::Inconsistent(j));
                }
                let (da, dja) = self.dom_of_term(ca);
                let (db, djb) = self.dom_of_term(cb);
                if da.disjoint(&db) {
                    j.merge(&dja);
                    j.merge(&djb);
                    return Some(Verdict::Inconsistent(j));
                }
                // A variable pinned to exactly the constant on the
                // other side is already equal to it.
                for (v, q) in [(ca, cb), (cb, ca)] {
                    if self.terms.is_var(v) {
                        if let Some(qn) = self.terms.num(q) {
                            if da.interval.as_point().is_some() || db.interval.as_point().is_some()
                            {
                                let (dv, djv) = self.dom_of_term(v);
                                if dv.interval.as_point() == Some(qn) {
                                    j.merge(&djv);
                                    return Some(Verdict::Valid(j));
                                }
                            }
                        }
                    }
                }
                None
            }
            Atom::Diseq(a, b) => {
                let (ca, ja) = self.can(*a);
                let (cb, jb) = self.can(*b);
                let mut j = Justification::dep2(&ja, &jb);
                if ca == cb {
                    return Some(Verdict::Inconsistent(j));
                }
                if self.terms.is_var(ca) && self.terms.is_var(cb) {
                    if let Some(dj) = self.partition.diseq_just(ca, cb) {
                        j.merge(dj);
                        return Some(Verdict::Valid(j));
                    }
                }
                if distinct_bv_constants(&self.terms, ca, cb) {
                    return Some(Verdict::Valid(j));
                }
                let (da, dja) = self.dom_of_term(ca);
                let (db, djb) = self.dom_of_term(cb);
                if da.disjoint(&db) {
                    j.merge(&dja);
                    j.merge(&djb);
                    return Some(Verdict::Valid(j));
                }
                None
            }
            Atom::In(t, d) => {
                let (ct, jt) = self.can(*t);
                let (cur, dj) = self.dom_of_term(ct);
                let mut j = jt;
                j.merge(&dj);
                if cur.implies(d) {
                    return Some(Verdict::Valid(j));
                }
                if cur.meet(d).is_empty() {
                    return Some(Verdict::Inconsistent(j));
                }
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Abstraction
    // ------------------------------------------------------------------

    /// Abstract `t` down to a canonical variable, introducing
    /// aliases and definitional bindings as needed.
    fn abstract_alias(&mut self, t: TermId) -> Result<TermId, Inconsistency> {
        match self.terms.kind(t).clone() {
            TermKind::Var { .. } => Ok(self.partition.find(t)),
            TermKind::Num(_) => self.solution_alias(TheoryId::La, t),
            TermKind::App { sym, args } => {
                if sym == Sym::Apply {
                    if let Some(reduced) = beta_reduce(&mut self.terms, args[0], args[1]) {
                        return self.abstract_alias(reduced);
                    }
                }
                match sym.theory() {
                    Some(i) => {
                        let pure = self.abstract_pure(i, t)?;
                        if self.terms.is_var(pure) {
                            Ok(self.partition.find(pure))
                        } else {
                            self.solution_alias(i, pure)
                        }
                    }
                    None => {
                        let mut cargs = Vec::with_capacity(args.len());
                        for &a in args.iter() {
                            cargs.push(self.abstract_alias(a)?);
                        }
                        let u = self
                            .funs
                            .alias(&mut self.terms, &self.partition, sym, &cargs);
                        Ok(self.partition.find(u))
                    }
                }
            }
        }
    }

    /// Abstract `t` into a pure `i`-term: subterms of theory `i` are
    /// entered and canonized, everything else is replaced by its
    /// alias variable.
    fn abstract_pure(&mut self, i: TheoryId, t: TermId) -> Result<TermId, Inconsistency> {
        match self.terms.kind(t).clone() {
            TermKind::Var { .. } => Ok(self.partition.find(t)),
            TermKind::Num(_) => {
                if i == TheoryId::La {
                    Ok(t)
                } else {
                    self.solution_alias(TheoryId::La, t)
                }
            }
            TermKind::App { sym, args } => {
                if sym.theory() == Some(i) {
                    let mut pure_args = Vec::with_capacity(args.len());
                    for &a in args.iter() {
                        pure_args.push(self.abstract_pure(i, a)?);
                    }
                    Ok(theory(i).canon(&mut self.terms, &sym, &pure_args))
                } else {
                    self.abstract_alias(t)
                }
            }
        }
    }

    /// The variable standing for a pure `i`-term, creating a fresh
    /// rename variable and a definitional binding if none exists.
    fn solution_alias(&mut self, i: TheoryId, t: TermId) -> Result<TermId, Inconsistency> {
        let (normed, _) = self.solutions[i.index()].norm_through(&mut self.terms, t);
        if self.terms.is_var(normed) {
            return Ok(self.partition.find(normed));
        }
        if let Some(x) = self.solutions[i.index()].inv_var(normed) {
            return Ok(self.partition.find(x));
        }
        let v = self.terms.mk_fresh(VarKind::Rename);
        let out = {
            let Context {
                ref mut terms,
                ref mut solutions,
                ref partition,
                ref cfg,
                ..
            } = *self;
            solutions[i.index()].compose(
                terms,
                cfg,
                partition,
                vec![(v, normed, Justification::empty())],
            )?
        };
        self.apply_merge_out(i, out)?;
        Ok(self.partition.find(v))
    }

    // ------------------------------------------------------------------
    // Processing and the fixpoint
    // ------------------------------------------------------------------

    fn process(&mut self, atom: &Atom, j: &Justification) -> Result<(), Inconsistency> {
        match atom {
            Atom::True => return Ok(()),
            Atom::False => return Err(Inconsistency::new(j.clone())),
            Atom::Equal(a, b) => {
                let va = self.abstract_alias(*a)?;
                let vb = self.abstract_alias(*b)?;
                self.union_vars(va, vb, j)?;
            }
            Atom::Diseq(a, b) => {
                let va = self.abstract_alias(*a)?;
                let vb = self.abstract_alias(*b)?;
                self.partition.separate(va, vb, j)?;
            }
            Atom::In(t, d) => {
                let va = self.abstract_alias(*t)?;
                // A constrained compound arithmetic term gets a slack
                // name carrying the domain.
                let target = if matches!(
                    self.terms.kind(*t),
                    TermKind::App { sym, .. } if sym.theory() == Some(TheoryId::La)
                ) {
                    let k = self.terms.mk_fresh(VarKind::Slack);
                    self.union_vars(va, k, j)?;
                    k
                } else {
                    va
                };
                if self.partition.refine(target, d, j)? {
                    self.stats.refinements += 1;
                }
            }
        }
        self.close()
    }

    fn union_vars(&mut self, x: TermId, y: TermId, j: &Justification) -> Result<(), Inconsistency> {
        if self.partition.union(&self.terms, x, y, j)?.is_some() {
            self.stats.merges += 1;
        }
        Ok(())
    }

    fn apply_merge_out(&mut self, th: TheoryId, out: MergeOut) -> Result<(), Inconsistency> {
        self.stats.compositions += out.bound.len() as u64;
        self.stats.solver_fallbacks += out.fallbacks;
        for (x, y, j) in out.var_eqs {
            self.union_vars(x, y, &j)?;
        }
        if th == TheoryId::La {
            for (x, rhs, j) in out.bound {
                let e = LinExpr::of_term(&self.terms, rhs);
                let mut dj = j;
                for (leaf, _) in &e.monomials {
                    dj.merge(&self.partition.dom_just(*leaf).1);
                }
                let d = e.dom(&self.terms, &self.partition);
                if self.partition.refine(x, &d, &dj)? {
                    self.stats.refinements += 1;
                }
            }
        }
        Ok(())
    }

    /// Drain the change buffers to a fixpoint: merges first (each
    /// re-closing congruence and fusing every solution set in theory
    /// order), then disequalities, then domain refinements.
    fn close(&mut self) -> Result<(), Inconsistency> {
        loop {
            if let Some(vc) = self.partition.pop_v() {
                let closed = {
                    let Context {
                        ref terms,
                        ref mut partition,
                        ref mut funs,
                        ..
                    } = *self;
                    funs.close(terms, partition, vc.old, vc.new, &vc.just)?
                };
                self.stats.congruences += closed;

                for i in TheoryId::ALL {
                    let out = {
                        let Context {
                            ref mut terms,
                            ref mut solutions,
                            ref partition,
                            ref cfg,
                            ..
                        } = *self;
                        solutions[i.index()].merge(
                            terms,
                            cfg,
                            partition,
                            vc.old,
                            vc.new,
                            &vc.just,
                        )?
                    };
                    self.apply_merge_out(i, out)?;
                }

                let before = self.rename.pending_deductions();
                self.rename.propagate_eq(&self.partition, vc.old, vc.new);
                self.stats.deductions += (self.rename.pending_deductions() - before) as u64;
                continue;
            }
            if let Some(dc) = self.partition.pop_d() {
                let before = self.rename.pending_deductions();
                self.rename.propagate_deq(&self.partition, dc.a, dc.b);
                self.stats.deductions += (self.rename.pending_deductions() - before) as u64;
                continue;
            }
            if let Some(cc) = self.partition.pop_c() {
                self.refine_through_la(&cc)?;
                continue;
            }
            return Ok(());
        }
    }

    /// A refined domain propagates through the linear solution set:
    /// the refined variable's own binding and every binding using it
    /// re-evaluate their domains.
    fn refine_through_la(&mut self, cc: &CChange) -> Result<(), Inconsistency> {
        let la = &self.solutions[TheoryId::La.index()];
        let mut targets: Vec<(TermId, TermId, Justification)> = Vec::new();
        if let Some((rhs, bj)) = la.apply(cc.var) {
            targets.push((cc.var, rhs, Justification::dep2(&cc.just, bj)));
        }
        for y in la.users_of(cc.var) {
            if let Some((rhs, bj)) = la.apply(y) {
                targets.push((y, rhs, Justification::dep2(&cc.just, bj)));
            }
        }
        for (x, rhs, j) in targets {
            let e = LinExpr::of_term(&self.terms, rhs);
            let mut dj = j;
            for (leaf, _) in &e.monomials {
                dj.merge(&self.partition.dom_just(*leaf).1);
            }
            let d = e.dom(&self.terms, &self.partition);
            if self.partition.refine(x, &d, &dj)? {
                self.stats.refinements += 1;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // The renaming surface
    // ------------------------------------------------------------------

    /// The propositional variable standing for `p(x)`.
    pub fn alias_monadic(&mut self, p: &str, x: TermId) -> PropVar {
        let p = self.terms.intern_name(p);
        self.rename.alias_monadic(&self.partition, p, x)
    }

    /// The propositional variable standing for `x = y`.
    pub fn alias_equal(&mut self, x: TermId, y: TermId) -> PropVar {
        self.rename.alias_equal(&self.partition, x, y)
    }

    /// Declare `p(x) => q(x)`.
    pub fn declare_sub(&mut self, p: &str, q: &str) {
        let p = self.terms.intern_name(p);
        let q = self.terms.intern_name(q);
        self.rename.declare_sub(p, q);
    }

    /// Declare `p` and `q` disjoint.
    pub fn declare_disjoint(&mut self, p: &str, q: &str) {
        let p = self.terms.intern_name(p);
        let q = self.terms.intern_name(q);
        self.rename.declare_disjoint(p, q);
    }

    /// Drain the deductions emitted to the propositional layer.
    pub fn take_deductions(&mut self) -> Vec<Deduction> {
        self.rename.take_deductions()
    }

    /// Accept a propositional verdict: `u` holds.
    pub fn assert_valid0(&mut self, u: PropVar) -> Result<(), Inconsistency> {
        match self.rename.payload(u) {
            Some(Payload::Monadic(p, x)) => {
                let w = self.monadic_app(p, x);
                let tt = self.tt;
                self.union_vars(w, tt, &Justification::empty())?;
            }
            Some(Payload::Equal(x, y)) => {
                self.union_vars(x, y, &Justification::empty())?;
            }
            None => return Ok(()),
        }
        self.close()
    }

    /// Accept a propositional verdict: `u` is refuted.
    pub fn assert_unsat0(&mut self, u: PropVar) -> Result<(), Inconsistency> {
        match self.rename.payload(u) {
            Some(Payload::Monadic(p, x)) => {
                let w = self.monadic_app(p, x);
                let ff = self.ff;
                self.union_vars(w, ff, &Justification::empty())?;
            }
            Some(Payload::Equal(x, y)) => {
                self.partition.separate(x, y, &Justification::empty())?;
            }
            None => return Ok(()),
        }
        self.close()
    }

    /// Report `p(x)` valid from the theory side.
    pub fn assert_valid1(&mut self, p: &str, x: TermId) -> PropVar {
        let p = self.terms.intern_name(p);
        self.rename.propagate_valid1(&self.partition, p, x)
    }

    /// Report `p(x)` refuted from the theory side.
    pub fn assert_unsat1(&mut self, p: &str, x: TermId) -> PropVar {
        let p = self.terms.intern_name(p);
        self.rename.propagate_unsat1(&self.partition, p, x)
    }

    fn monadic_app(&mut self, p: NameId, x: TermId) -> TermId {
        let cx = self.partition.find(x);
        self.funs
            .alias(&mut self.terms, &self.partition, Sym::Uninterp(p), &[cx])
    }

    // ------------------------------------------------------------------
    // Semantic equality
    // ------------------------------------------------------------------

    /// Semantic identity of the partition and the solved forms,
    /// ignoring the input atom list and fresh-variable numbering.
    #[must_use]
    pub fn eq(&self, other: &Context) -> bool {
        self.snapshot() == other.snapshot()
    }

    fn external_name(&self, v: TermId) -> Option<String> {
        match self.terms.kind(v) {
            TermKind::Var { name, kind } if *kind == VarKind::External => {
                Some(self.terms.name(*name).to_string())
            }
            _ => None,
        }
    }

    /// The class of `v` rendered as the sorted set of external names
    /// it contains, when any.
    fn class_names(&self, v: TermId, externals: &[TermId]) -> Option<Vec<String>> {
        let mut names: Vec<String> = externals
            .iter()
            .filter(|&&x| self.partition.equal(x, v))
            .filter_map(|&x| self.external_name(x))
            .collect();
        names.sort();
        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }

    fn snapshot(&self) -> Vec<String> {
        let externals: Vec<TermId> = self
            .terms
            .iter()
            .filter(|(_, k)| matches!(k, TermKind::Var { kind, .. } if *kind == VarKind::External))
            .map(|(t, _)| t)
            .collect();

        let mut lines: Vec<String> = Vec::new();
        // Classes.
        let mut seen: Vec<TermId> = Vec::new();
        for &x in &externals {
            let r = self.partition.find(x);
            if seen.contains(&r) {
                continue;
            }
            seen.push(r);
            if let Some(names) = self.class_names(r, &externals) {
                if names.len() > 1 {
                    lines.push(format!("class {}", names.join("=")));
                }
                let dom = self.partition.dom(r);
                if dom != Dom::any() {
                    lines.push(format!("dom {} {}", names[0], dom));
                }
            }
        }
        // Disequalities.
        for (a, b) in self.partition.diseq_pairs() {
            if let (Some(na), Some(nb)) = (
                self.class_names(a, &externals),
                self.class_names(b, &externals),
            ) {
                let (lo, hi) = if na[0] <= nb[0] {
                    (na[0].clone(), nb[0].clone())
                } else {
                    (nb[0].clone(), na[0].clone())
                };
                lines.push(format!("diseq {lo} {hi}"));
            }
        }
        // Solved forms over externally-nameable bindings.
        for s in &self.solutions {
            for (lhs, rhs, _) in s.iter() {
                let Some(l) = self.class_names(lhs, &externals).map(|n| n[0].clone()) else {
                    continue;
                };
                if let Some(r) = self.render_external(rhs, &externals) {
                    lines.push(format!("{} {} = {}", s.theory_id(), l, r));
                }
            }
        }
        lines.sort();
        lines.dedup();
        lines
    }

    fn render_external(&self, t: TermId, externals: &[TermId]) -> Option<String> {
        match self.terms.kind(t) {
            TermKind::Var { .. } => self.class_names(t, externals).map(|n| n[0].clone()),
            TermKind::Num(q) => Some(q.to_string()),
            TermKind::App { sym, args } => {
                let parts: Option<Vec<String>> = args
                    .iter()
                    .map(|&a| self.render_external(a, externals))
                    .collect();
                parts.map(|p| format!("{sym:?}({})", p.join(",")))
            }
        }
    }

    /// Access to the partition for invariant checks.
    #[must_use]
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Access to the congruence-closure configuration for invariant
    /// checks.
    #[must_use]
    pub fn funs(&self) -> &Funs {
        &self.funs
    }

    /// Access to a solution set for invariant checks.
    #[must_use]
    pub fn solution(&self, i: TheoryId) -> &SolutionSet {
        &self.solutions[i.index()]
    }
}

fn distinct_bv_constants(terms: &Terms, a: TermId, b: TermId) -> bool {
    match (terms.kind(a), terms.kind(b)) {
        (
            TermKind::App {
                sym: Sym::BvConst(x),
                ..
            },
            TermKind::App {
                sym: Sym::BvConst(y),
                ..
            },
        ) => x != y,
        _ => false,
    }
}

/// Beta-reduce `apply(abstract(body), arg)`, substituting the
/// outermost bound index. Returns `None` when the head is not an
/// abstraction.
fn beta_reduce(terms: &mut Terms, head: TermId, arg: TermId) -> Option<TermId> {
    let body = match terms.kind(head) {
        TermKind::App {
            sym: Sym::Abstract,
            args,
        } => args[0],
        _ => return None,
    };
    Some(subst_bound(terms, body, 0, arg))
}

fn subst_bound(terms: &mut Terms, t: TermId, depth: u32, arg: TermId) -> TermId {
    match terms.kind(t).clone() {
        TermKind::App {
            sym: Sym::Bound(i), ..
        } => {
            if i == depth {
                arg
            } else {
                t
            }
        }
        TermKind::App {
            sym: Sym::Abstract,
            args,
        } => {
            let body = subst_bound(terms, args[0], depth + 1, arg);
            terms.mk_app(Sym::Abstract, smallvec![body])
        }
        TermKind::App { sym, args } => {
            let new: Vec<TermId> = args
                .iter()
                .map(|&a| subst_bound(terms, a, depth, arg))
                .collect();
            terms.mk_app(sym, smallvec::SmallVec::from_vec(new))
        }
        _ => t,
    }
}
