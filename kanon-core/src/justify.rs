//! Justifications.
//!
//! A justification is an opaque dependency set of input-atom ids with
//! union as the only combinator. It is the grain of unsat-core
//! extraction; no proof terms are produced.

use smallvec::SmallVec;
use std::fmt;

/// The index of an input atom in a context's assertion list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomId(pub u32);

/// A set of input atoms witnessing a derived fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Justification(SmallVec<[AtomId; 4]>);

impl Justification {
    /// The empty dependency set (facts true in every context).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The dependency set of a single input atom.
    #[must_use]
    pub fn axiom(a: AtomId) -> Self {
        Self(SmallVec::from_slice(&[a]))
    }

    /// Union of two dependency sets.
    #[must_use]
    pub fn dep2(a: &Justification, b: &Justification) -> Justification {
        let mut out = a.clone();
        out.merge(b);
        out
    }

    /// Union `other` into `self`.
    pub fn merge(&mut self, other: &Justification) {
        for &a in other.0.iter() {
            if let Err(pos) = self.0.binary_search(&a) {
                self.0.insert(pos, a);
            }
        }
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of atoms in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the atom ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.0.iter().copied()
    }

    /// Whether `a` is in the set.
    #[must_use]
    pub fn contains(&self, a: AtomId) -> bool {
        self.0.binary_search(&a).is_ok()
    }
}

impl FromIterator<AtomId> for Justification {
    fn from_iter<I: IntoIterator<Item = AtomId>>(iter: I) -> Self {
        let mut out = Justification::empty();
        for a in iter {
            out.merge(&Justification::axiom(a));
        }
        out
    }
}

impl fmt::Display for Justification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, a) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", a.0)?;
        }
        write!(f, "}}")
    }
}
