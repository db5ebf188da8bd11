//! Hash-Consed Term DAG.
//!
//! Terms are immutable once interned; a [`TermId`] is a cheap copyable
//! handle and structural equality is id equality. Construction order
//! induces the total order on terms used for tie-breaking throughout
//! the engine.

use crate::bits::Bits;
use num_bigint::BigInt;
use num_rational::BigRational;
use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};
use std::fmt;

/// An interned name (variable or uninterpreted symbol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameId(pub u32);

/// A term identifier into the owning [`Terms`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermId(u32);

impl TermId {
    /// Index into the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The provenance of a variable.
///
/// The derived order is the canonical-representative preference:
/// external variables win over rename variables, which win over
/// slacks, which win over labels. Ties break on [`TermId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarKind {
    /// Introduced by the user.
    External,
    /// Introduced by flattening/abstraction.
    Rename,
    /// Non-negative auxiliary introduced by the arithmetic solver.
    Slack,
    /// Anonymous extension variable.
    Label,
}

impl VarKind {
    fn fresh_prefix(self) -> &'static str {
        match self {
            VarKind::External => "x",
            VarKind::Rename => "v",
            VarKind::Slack => "k",
            VarKind::Label => "l",
        }
    }
}

/// The theories with canonizer/solver pairs, in their fixed
/// processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TheoryId {
    /// Linear arithmetic.
    La,
    /// Tuples (finite products with projections).
    Tup,
    /// Fixed-width bitvectors.
    Bv,
    /// Nonlinear arithmetic (power products).
    Nl,
    /// Coproducts (binary sums with injections/projections).
    Cop,
    /// Functional arrays (select/store).
    Arr,
}

impl TheoryId {
    /// All theories in processing order.
    pub const ALL: [TheoryId; 6] = [
        TheoryId::La,
        TheoryId::Tup,
        TheoryId::Bv,
        TheoryId::Nl,
        TheoryId::Cop,
        TheoryId::Arr,
    ];

    /// Short display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            TheoryId::La => "la",
            TheoryId::Tup => "tup",
            TheoryId::Bv => "bv",
            TheoryId::Nl => "nl",
            TheoryId::Cop => "cop",
            TheoryId::Arr => "arr",
        }
    }

    /// Index into per-theory arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TheoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The closed family of function symbols.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sym {
    /// n-ary addition.
    Add,
    /// Multiplication by a rational constant (unary).
    Multq(BigRational),
    /// n-ary tuple constructor.
    Tuple(u32),
    /// `Proj(i, n)` - i-th projection out of an n-tuple.
    Proj(u32, u32),
    /// Bitvector constant.
    BvConst(Bits),
    /// Bitvector concatenation (n-ary, msb first).
    BvConcat,
    /// `BvExtract(hi, lo)` - bit slice, inclusive, `hi >= lo`.
    BvExtract(u32, u32),
    /// Bitwise complement.
    BvNot,
    /// Bitwise conjunction.
    BvAnd,
    /// Bitwise disjunction.
    BvOr,
    /// Left injection into a coproduct.
    InL,
    /// Right injection into a coproduct.
    InR,
    /// Left projection out of a coproduct.
    OutL,
    /// Right projection out of a coproduct.
    OutR,
    /// Array read.
    Select,
    /// Array write.
    Store,
    /// Function application (binary, curried).
    Apply,
    /// Functional abstraction over the de Bruijn index 0.
    Abstract,
    /// Bound (de Bruijn) variable under an [`Sym::Abstract`].
    Bound(u32),
    /// n-ary nonlinear product.
    NlMul,
    /// `NlPow(k)` - k-th power, `k >= 2`.
    NlPow(u32),
    /// An uninterpreted function symbol.
    Uninterp(NameId),
}

impl Sym {
    /// The theory that owns this symbol; `None` for uninterpreted
    /// symbols and the apply/abstract family (handled by congruence
    /// closure).
    #[must_use]
    pub fn theory(&self) -> Option<TheoryId> {
        match self {
            Sym::Add | Sym::Multq(_) => Some(TheoryId::La),
            Sym::Tuple(_) | Sym::Proj(..) => Some(TheoryId::Tup),
            Sym::BvConst(_)
            | Sym::BvConcat
            | Sym::BvExtract(..)
            | Sym::BvNot
            | Sym::BvAnd
            | Sym::BvOr => Some(TheoryId::Bv),
            Sym::NlMul | Sym::NlPow(_) => Some(TheoryId::Nl),
            Sym::InL | Sym::InR | Sym::OutL | Sym::OutR => Some(TheoryId::Cop),
            Sym::Select | Sym::Store => Some(TheoryId::Arr),
            Sym::Apply | Sym::Abstract | Sym::Bound(_) | Sym::Uninterp(_) => None,
        }
    }
}

/// The payload of a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// A named variable.
    Var {
        /// Interned name.
        name: NameId,
        /// Provenance.
        kind: VarKind,
    },
    /// An exact rational constant.
    Num(BigRational),
    /// An application of a symbol to ordered arguments.
    App {
        /// The applied symbol.
        sym: Sym,
        /// Argument terms.
        args: SmallVec<[TermId; 4]>,
    },
}

/// The term arena: owns every term and the intern tables.
#[derive(Debug, Clone, Default)]
pub struct Terms {
    kinds: Vec<TermKind>,
    table: FxHashMap<TermKind, TermId>,
    names: Vec<String>,
    name_table: FxHashMap<String, NameId>,
    fresh: u32,
}

impl Terms {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name.
    pub fn intern_name(&mut self, name: &str) -> NameId {
        if let Some(&id) = self.name_table.get(name) {
            return id;
        }
        let id = NameId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.name_table.insert(name.to_string(), id);
        id
    }

    /// The string of an interned name.
    #[must_use]
    pub fn name(&self, id: NameId) -> &str {
        &self.names[id.0 as usize]
    }

    /// The payload of a term.
    #[must_use]
    pub fn kind(&self, t: TermId) -> &TermKind {
        &self.kinds[t.index()]
    }

    /// Number of interned terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Iterate every interned term in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &TermKind)> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .map(|(i, k)| (TermId(i as u32), k))
    }

    fn intern(&mut self, kind: TermKind) -> TermId {
        if let Some(&id) = self.table.get(&kind) {
            return id;
        }
        let id = TermId(self.kinds.len() as u32);
        self.kinds.push(kind.clone());
        self.table.insert(kind, id);
        id
    }

    /// Intern a named variable.
    pub fn mk_var(&mut self, name: &str, kind: VarKind) -> TermId {
        let name = self.intern_name(name);
        self.intern(TermKind::Var { name, kind })
    }

    /// Intern a fresh variable of the given kind.
    ///
    /// Fresh names carry a `!` so they can never collide with
    /// user-interned names.
    pub fn mk_fresh(&mut self, kind: VarKind) -> TermId {
        let n = self.fresh;
        self.fresh += 1;
        let name = format!("{}!{n}", kind.fresh_prefix());
        self.mk_var(&name, kind)
    }

    /// Intern a rational constant.
    pub fn mk_num(&mut self, q: BigRational) -> TermId {
        self.intern(TermKind::Num(q))
    }

    /// Intern an integer constant.
    pub fn mk_int(&mut self, n: i64) -> TermId {
        self.mk_num(BigRational::from_integer(BigInt::from(n)))
    }

    /// Intern an application.
    pub fn mk_app(&mut self, sym: Sym, args: impl Into<SmallVec<[TermId; 4]>>) -> TermId {
        self.intern(TermKind::App {
            sym,
            args: args.into(),
        })
    }

    /// Intern an uninterpreted application.
    pub fn mk_uninterp(&mut self, f: &str, args: impl Into<SmallVec<[TermId; 4]>>) -> TermId {
        let f = self.intern_name(f);
        self.mk_app(Sym::Uninterp(f), args)
    }

    /// `a + b` (uncanonized).
    pub fn mk_add(&mut self, args: impl Into<SmallVec<[TermId; 4]>>) -> TermId {
        self.mk_app(Sym::Add, args)
    }

    /// `q * t` (uncanonized).
    pub fn mk_multq(&mut self, q: BigRational, t: TermId) -> TermId {
        self.mk_app(Sym::Multq(q), smallvec![t])
    }

    /// n-ary tuple.
    pub fn mk_tuple(&mut self, args: impl Into<SmallVec<[TermId; 4]>>) -> TermId {
        let args = args.into();
        let n = args.len() as u32;
        self.mk_app(Sym::Tuple(n), args)
    }

    /// i-th projection out of an n-tuple.
    pub fn mk_proj(&mut self, i: u32, n: u32, t: TermId) -> TermId {
        self.mk_app(Sym::Proj(i, n), smallvec![t])
    }

    /// Array read.
    pub fn mk_select(&mut self, a: TermId, i: TermId) -> TermId {
        self.mk_app(Sym::Select, smallvec![a, i])
    }

    /// Array write.
    pub fn mk_store(&mut self, a: TermId, i: TermId, e: TermId) -> TermId {
        self.mk_app(Sym::Store, smallvec![a, i, e])
    }

    /// Whether `t` is a variable.
    #[must_use]
    pub fn is_var(&self, t: TermId) -> bool {
        matches!(self.kind(t), TermKind::Var { .. })
    }

    /// The kind of a variable term, if it is one.
    #[must_use]
    pub fn var_kind(&self, t: TermId) -> Option<VarKind> {
        match self.kind(t) {
            TermKind::Var { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The value of a numeric constant, if `t` is one.
    #[must_use]
    pub fn num(&self, t: TermId) -> Option<&BigRational> {
        match self.kind(t) {
            TermKind::Num(q) => Some(q),
            _ => None,
        }
    }

    /// Representative preference between two variables: external
    /// before rename before slack before label, ties on id.
    #[must_use]
    pub fn var_order(&self, a: TermId, b: TermId) -> std::cmp::Ordering {
        let ka = self.var_kind(a).expect("variable expected");
        let kb = self.var_kind(b).expect("variable expected");
        ka.cmp(&kb).then(a.cmp(&b))
    }

    /// Collect the leaves of `t` (variables and foreign opaque
    /// subterms are not entered; interpreted applications are).
    pub fn vars_of(&self, t: TermId, out: &mut Vec<TermId>) {
        match self.kind(t) {
            TermKind::Var { .. } => {
                if !out.contains(&t) {
                    out.push(t);
                }
            }
            TermKind::Num(_) => {}
            TermKind::App { args, .. } => {
                for &a in args.iter() {
                    self.vars_of(a, out);
                }
            }
        }
    }

    /// Whether variable `v` occurs anywhere inside `t`.
    #[must_use]
    pub fn occurs(&self, v: TermId, t: TermId) -> bool {
        if v == t {
            return true;
        }
        match self.kind(t) {
            TermKind::App { args, .. } => args.iter().any(|&a| self.occurs(v, a)),
            _ => false,
        }
    }

    /// Render a term for diagnostics.
    #[must_use]
    pub fn pp(&self, t: TermId) -> String {
        match self.kind(t) {
            TermKind::Var { name, .. } => self.name(*name).to_string(),
            TermKind::Num(q) => q.to_string(),
            TermKind::App { sym, args } => {
                let args: Vec<String> = args.iter().map(|&a| self.pp(a)).collect();
                let head = match sym {
                    Sym::Add => "+".to_string(),
                    Sym::Multq(q) => format!("*{q}"),
                    Sym::Tuple(_) => "tuple".to_string(),
                    Sym::Proj(i, n) => format!("proj[{i}/{n}]"),
                    Sym::BvConst(b) => return b.to_string(),
                    Sym::BvConcat => "++".to_string(),
                    Sym::BvExtract(hi, lo) => format!("extract[{hi}:{lo}]"),
                    Sym::BvNot => "bvnot".to_string(),
                    Sym::BvAnd => "bvand".to_string(),
                    Sym::BvOr => "bvor".to_string(),
                    Sym::InL => "inl".to_string(),
                    Sym::InR => "inr".to_string(),
                    Sym::OutL => "outl".to_string(),
                    Sym::OutR => "outr".to_string(),
                    Sym::Select => "select".to_string(),
                    Sym::Store => "store".to_string(),
                    Sym::Apply => "apply".to_string(),
                    Sym::Abstract => "lambda".to_string(),
                    Sym::Bound(i) => return format!("!{i}"),
                    Sym::NlMul => "*".to_string(),
                    Sym::NlPow(k) => format!("^{k}"),
                    Sym::Uninterp(f) => self.name(*f).to_string(),
                };
                format!("{head}({})", args.join(", "))
            }
        }
    }
}
