//! Exact-Rational Helpers.
//!
//! Thin additions over `num-rational` used by the arithmetic
//! canonizer and solver: integrality tests and gcd over the integer
//! parts of a coefficient list.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// Whether `q` denotes an integer.
#[must_use]
pub fn is_integral(q: &BigRational) -> bool {
    q.denom().is_one()
}

/// The gcd of the numerators of a list of integral rationals.
///
/// Returns `None` if the list is empty or any entry is non-integral.
#[must_use]
pub fn integral_gcd<'a, I>(qs: I) -> Option<BigInt>
where
    I: IntoIterator<Item = &'a BigRational>,
{
    let mut acc: Option<BigInt> = None;
    for q in qs {
        if !is_integral(q) {
            return None;
        }
        let n = q.numer().abs();
        acc = Some(match acc {
            None => n,
            Some(g) => gcd(g, n),
        });
    }
    acc
}

/// Whether integral `d` divides integral `q`.
#[must_use]
pub fn divides(d: &BigInt, q: &BigRational) -> bool {
    is_integral(q) && !d.is_zero() && (q.numer() % d).is_zero()
}

fn gcd(mut a: BigInt, mut b: BigInt) -> BigInt {
    while !b.is_zero() {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a.abs()
}
