//! Arithmetic Domains.
//!
//! The `C` component of the variable partition stores an element of
//! [`Dom`] per canonical variable: a point in the sign lattice
//! `{empty, =0, >0, <0, >=0, <=0, any}`, an exact rational interval,
//! and an integrality flag. Intersection is meet; an empty meet
//! signals inconsistency to the caller.
//!
//! Intervals are conservative in the usual sense: every operation
//! guarantees containment of all possible values.

use crate::rational::is_integral;
use crate::term::TermId;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use std::fmt;

/// The sign lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    /// Bottom: no value.
    Empty,
    /// Exactly zero.
    Zero,
    /// Strictly positive.
    Pos,
    /// Strictly negative.
    Neg,
    /// Non-negative.
    Nonneg,
    /// Non-positive.
    Nonpos,
    /// Top: unconstrained.
    Any,
}

impl Sign {
    /// Greatest lower bound.
    #[must_use]
    pub fn meet(self, other: Sign) -> Sign {
        use Sign::*;
        match (self, other) {
            (Any, s) | (s, Any) => s,
            (Empty, _) | (_, Empty) => Empty,
            (a, b) if a == b => a,
            (Zero, Nonneg) | (Nonneg, Zero) => Zero,
            (Zero, Nonpos) | (Nonpos, Zero) => Zero,
            (Pos, Nonneg) | (Nonneg, Pos) => Pos,
            (Neg, Nonpos) | (Nonpos, Neg) => Neg,
            (Nonneg, Nonpos) | (Nonpos, Nonneg) => Zero,
            _ => Empty,
        }
    }

    /// Lattice order: does `self` entail `other`?
    #[must_use]
    pub fn implies(self, other: Sign) -> bool {
        self.meet(other) == self
    }

    /// The sign of a rational.
    #[must_use]
    pub fn of_rational(q: &BigRational) -> Sign {
        if q.is_zero() {
            Sign::Zero
        } else if q.is_positive() {
            Sign::Pos
        } else {
            Sign::Neg
        }
    }

    fn to_interval(self) -> Interval {
        let zero = BigRational::zero();
        match self {
            Sign::Empty => Interval::empty(),
            Sign::Zero => Interval::point(zero),
            Sign::Pos => Interval::at_least(zero, true),
            Sign::Neg => Interval::at_most(zero, true),
            Sign::Nonneg => Interval::at_least(zero, false),
            Sign::Nonpos => Interval::at_most(zero, false),
            Sign::Any => Interval::full(),
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sign::Empty => "empty",
            Sign::Zero => "=0",
            Sign::Pos => ">0",
            Sign::Neg => "<0",
            Sign::Nonneg => ">=0",
            Sign::Nonpos => "<=0",
            Sign::Any => "any",
        };
        f.write_str(s)
    }
}

/// An endpoint: the bound value and whether it is strict.
type Endpoint = Option<(BigRational, bool)>;

/// An exact rational interval; `None` endpoints are unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Interval {
    lo: Endpoint,
    hi: Endpoint,
}

impl Interval {
    /// The full line.
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    /// A canonical empty interval.
    #[must_use]
    pub fn empty() -> Self {
        let zero = BigRational::zero();
        Self {
            lo: Some((zero.clone(), true)),
            hi: Some((zero, true)),
        }
    }

    /// The single point `q`.
    #[must_use]
    pub fn point(q: BigRational) -> Self {
        Self {
            lo: Some((q.clone(), false)),
            hi: Some((q, false)),
        }
    }

    /// `[q, +inf)` or `(q, +inf)`.
    #[must_use]
    pub fn at_least(q: BigRational, strict: bool) -> Self {
        Self {
            lo: Some((q, strict)),
            hi: None,
        }
    }

    /// `(-inf, q]` or `(-inf, q)`.
    #[must_use]
    pub fn at_most(q: BigRational, strict: bool) -> Self {
        Self {
            lo: None,
            hi: Some((q, strict)),
        }
    }

    /// Whether no rational lies in the interval.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match (&self.lo, &self.hi) {
            (Some((lo, slo)), Some((hi, shi))) => lo > hi || (lo == hi && (*slo || *shi)),
            _ => false,
        }
    }

    /// Whether `q` lies in the interval.
    #[must_use]
    pub fn contains(&self, q: &BigRational) -> bool {
        let above = match &self.lo {
            None => true,
            Some((lo, strict)) => {
                if *strict {
                    q > lo
                } else {
                    q >= lo
                }
            }
        };
        let below = match &self.hi {
            None => true,
            Some((hi, strict)) => {
                if *strict {
                    q < hi
                } else {
                    q <= hi
                }
            }
        };
        above && below
    }

    /// Greatest lower bound: intersect.
    #[must_use]
    pub fn meet(&self, other: &Interval) -> Interval {
        Interval {
            lo: tighter(&self.lo, &other.lo, true),
            hi: tighter(&self.hi, &other.hi, false),
        }
    }

    /// Interval sum.
    #[must_use]
    pub fn add(&self, other: &Interval) -> Interval {
        let ep = |a: &Endpoint, b: &Endpoint| -> Endpoint {
            match (a, b) {
                (Some((x, sx)), Some((y, sy))) => Some((x + y, *sx || *sy)),
                _ => None,
            }
        };
        Interval {
            lo: ep(&self.lo, &other.lo),
            hi: ep(&self.hi, &other.hi),
        }
    }

    /// Multiply by a constant; a negative factor flips the bounds.
    #[must_use]
    pub fn scale(&self, q: &BigRational) -> Interval {
        if q.is_zero() {
            return Interval::point(BigRational::zero());
        }
        let ep = |e: &Endpoint| -> Endpoint { e.as_ref().map(|(x, s)| (x * q, *s)) };
        if q.is_positive() {
            Interval {
                lo: ep(&self.lo),
                hi: ep(&self.hi),
            }
        } else {
            Interval {
                lo: ep(&self.hi),
                hi: ep(&self.lo),
            }
        }
    }

    /// The sign summary of the interval.
    #[must_use]
    pub fn sign(&self) -> Sign {
        if self.is_empty() {
            return Sign::Empty;
        }
        let zero = BigRational::zero();
        let lo_nonneg = matches!(&self.lo, Some((q, _)) if *q >= zero);
        let lo_pos = matches!(&self.lo, Some((q, s)) if *q > zero || (*q == zero && *s));
        let hi_nonpos = matches!(&self.hi, Some((q, _)) if *q <= zero);
        let hi_neg = matches!(&self.hi, Some((q, s)) if *q < zero || (*q == zero && *s));
        match (lo_pos, lo_nonneg, hi_neg, hi_nonpos) {
            _ if lo_nonneg && hi_nonpos => Sign::Zero,
            (true, ..) => Sign::Pos,
            (_, _, true, _) => Sign::Neg,
            (_, true, ..) => Sign::Nonneg,
            (.., true) => Sign::Nonpos,
            _ => Sign::Any,
        }
    }

    /// Whether the interval contains an integer point.
    #[must_use]
    pub fn has_integer(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        let lo_int: Option<BigInt> = self.lo.as_ref().map(|(q, strict)| {
            let f = q.ceil().to_integer();
            if *strict && is_integral(q) && f == *q.numer() {
                f + 1
            } else {
                f
            }
        });
        let hi_int: Option<BigInt> = self.hi.as_ref().map(|(q, strict)| {
            let f = q.floor().to_integer();
            if *strict && is_integral(q) && f == *q.numer() {
                f - 1
            } else {
                f
            }
        });
        match (lo_int, hi_int) {
            (Some(lo), Some(hi)) => lo <= hi,
            _ => true,
        }
    }

    /// The single value of a point interval, if it is one.
    #[must_use]
    pub fn as_point(&self) -> Option<&BigRational> {
        match (&self.lo, &self.hi) {
            (Some((lo, false)), Some((hi, false))) if lo == hi => Some(lo),
            _ => None,
        }
    }
}

fn tighter(a: &Endpoint, b: &Endpoint, is_lo: bool) -> Endpoint {
    match (a, b) {
        (None, e) | (e, None) => e.clone(),
        (Some((x, sx)), Some((y, sy))) => {
            if x == y {
                Some((x.clone(), *sx || *sy))
            } else if (x > y) == is_lo {
                Some((x.clone(), *sx))
            } else {
                Some((y.clone(), *sy))
            }
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lo {
            None => write!(f, "(-inf")?,
            Some((q, true)) => write!(f, "({q}")?,
            Some((q, false)) => write!(f, "[{q}")?,
        }
        write!(f, ", ")?;
        match &self.hi {
            None => write!(f, "+inf)"),
            Some((q, true)) => write!(f, "{q})"),
            Some((q, false)) => write!(f, "{q}]"),
        }
    }
}

/// An arithmetic domain: sign, interval, and integrality, kept
/// mutually normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dom {
    /// Sign component.
    pub sign: Sign,
    /// Interval component.
    pub interval: Interval,
    /// Whether the value is constrained to the integers.
    pub integer: bool,
}

impl Default for Dom {
    fn default() -> Self {
        Self::any()
    }
}

impl Dom {
    /// The unconstrained domain.
    #[must_use]
    pub fn any() -> Self {
        Self {
            sign: Sign::Any,
            interval: Interval::full(),
            integer: false,
        }
    }

    /// A pure sign constraint.
    #[must_use]
    pub fn of_sign(sign: Sign) -> Self {
        Self {
            sign,
            interval: sign.to_interval(),
            integer: false,
        }
    }

    /// The point domain of a rational.
    #[must_use]
    pub fn point(q: BigRational) -> Self {
        Self {
            sign: Sign::of_rational(&q),
            integer: is_integral(&q),
            interval: Interval::point(q),
        }
    }

    /// A pure interval constraint.
    #[must_use]
    pub fn of_interval(interval: Interval) -> Self {
        Self {
            sign: interval.sign(),
            interval,
            integer: false,
        }
    }

    /// The integer constraint.
    #[must_use]
    pub fn int() -> Self {
        Self {
            sign: Sign::Any,
            interval: Interval::full(),
            integer: true,
        }
    }

    /// Strictly positive.
    #[must_use]
    pub fn pos() -> Self {
        Self::of_sign(Sign::Pos)
    }

    /// Non-negative.
    #[must_use]
    pub fn nonneg() -> Self {
        Self::of_sign(Sign::Nonneg)
    }

    /// Strictly negative.
    #[must_use]
    pub fn neg() -> Self {
        Self::of_sign(Sign::Neg)
    }

    /// Non-positive.
    #[must_use]
    pub fn nonpos() -> Self {
        Self::of_sign(Sign::Nonpos)
    }

    /// Exactly zero.
    #[must_use]
    pub fn zero() -> Self {
        Self::of_sign(Sign::Zero)
    }

    /// Greatest lower bound: componentwise meet, renormalized.
    #[must_use]
    pub fn meet(&self, other: &Dom) -> Dom {
        let mut d = Dom {
            sign: self.sign.meet(other.sign),
            interval: self.interval.meet(&other.interval),
            integer: self.integer || other.integer,
        };
        d.normalize();
        d
    }

    fn normalize(&mut self) {
        self.interval = self.interval.meet(&self.sign.to_interval());
        self.sign = self.sign.meet(self.interval.sign());
    }

    /// Whether the domain has no element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sign == Sign::Empty
            || self.interval.is_empty()
            || (self.integer && !self.interval.has_integer())
    }

    /// Whether every element of `self` lies in `other`.
    #[must_use]
    pub fn implies(&self, other: &Dom) -> bool {
        if self.is_empty() {
            return true;
        }
        if other.integer && !self.integer {
            // Unless self is a single integral point.
            match self.interval.as_point() {
                Some(q) if is_integral(q) => {}
                _ => return false,
            }
        }
        self.sign.implies(other.sign) && {
            let m = self.interval.meet(&other.interval);
            m == self.interval
        }
    }

    /// Whether `self` and `other` share no element.
    #[must_use]
    pub fn disjoint(&self, other: &Dom) -> bool {
        self.meet(other).is_empty()
    }

    /// Whether `q` lies in the domain.
    #[must_use]
    pub fn contains(&self, q: &BigRational) -> bool {
        Sign::of_rational(q).implies(self.sign)
            && self.interval.contains(q)
            && (!self.integer || is_integral(q))
    }
}

impl fmt::Display for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sign, self.interval)?;
        if self.integer {
            write!(f, " int")?;
        }
        Ok(())
    }
}

/// Read access to the domain of a canonical variable; implemented by
/// the partition and consumed by theory solvers.
pub trait DomLookup {
    /// The current domain of `v` (top when unconstrained).
    fn dom_of(&self, v: TermId) -> Dom;

    /// The dependency set behind `v`'s domain, when tracked.
    fn dom_deps(&self, _v: TermId) -> crate::justify::Justification {
        crate::justify::Justification::empty()
    }
}

/// A [`DomLookup`] with no information, for tests and standalone
/// canonization.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDoms;

impl DomLookup for NoDoms {
    fn dom_of(&self, _v: TermId) -> Dom {
        Dom::any()
    }
}
