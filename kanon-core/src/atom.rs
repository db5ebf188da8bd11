//! Input Atoms.

use crate::dom::{Dom, Sign};
use crate::term::{TermId, Terms};

/// An atomic assertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    /// `a = b`.
    Equal(TermId, TermId),
    /// `a /= b`.
    Diseq(TermId, TermId),
    /// `t` lies in an arithmetic domain.
    In(TermId, Dom),
    /// The trivially true atom.
    True,
    /// The trivially false atom.
    False,
}

impl Atom {
    /// `t > 0`, `t >= 0`, etc., as membership atoms.
    #[must_use]
    pub fn sign(t: TermId, sign: Sign) -> Atom {
        Atom::In(t, Dom::of_sign(sign))
    }

    /// The negation as a finite conjunction of atoms, when
    /// expressible (`=0` has no atomic complement).
    #[must_use]
    pub fn negate(&self) -> Option<Vec<Atom>> {
        match self {
            Atom::Equal(a, b) => Some(vec![Atom::Diseq(*a, *b)]),
            Atom::Diseq(a, b) => Some(vec![Atom::Equal(*a, *b)]),
            Atom::True => Some(vec![Atom::False]),
            Atom::False => Some(vec![Atom::True]),
            Atom::In(t, d) => {
                let complement = match d.sign {
                    Sign::Pos => Sign::Nonpos,
                    Sign::Neg => Sign::Nonneg,
                    Sign::Nonneg => Sign::Neg,
                    Sign::Nonpos => Sign::Pos,
                    _ => return None,
                };
                if *d != Dom::of_sign(d.sign) {
                    // Interval or integrality payloads have no atomic
                    // complement either.
                    return None;
                }
                Some(vec![Atom::sign(*t, complement)])
            }
        }
    }

    /// Render for diagnostics.
    #[must_use]
    pub fn pp(&self, terms: &Terms) -> String {
        match self {
            Atom::Equal(a, b) => format!("{} = {}", terms.pp(*a), terms.pp(*b)),
            Atom::Diseq(a, b) => format!("{} /= {}", terms.pp(*a), terms.pp(*b)),
            Atom::In(t, d) => format!("{} in {}", terms.pp(*t), d),
            Atom::True => "true".to_string(),
            Atom::False => "false".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::VarKind;

    #[test]
    fn test_negate_roundtrip() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        let y = terms.mk_var("y", VarKind::External);
        let a = Atom::Equal(x, y);
        let n = a.negate().unwrap();
        assert_eq!(n, vec![Atom::Diseq(x, y)]);
        assert_eq!(n[0].negate().unwrap(), vec![a]);
    }

    #[test]
    fn test_negate_signs() {
        let mut terms = Terms::new();
        let x = terms.mk_var("x", VarKind::External);
        assert_eq!(
            Atom::sign(x, Sign::Pos).negate().unwrap(),
            vec![Atom::sign(x, Sign::Nonpos)]
        );
        // =0 needs a disjunction; not expressible.
        assert!(Atom::sign(x, Sign::Zero).negate().is_none());
    }
}
