//! Concrete Evaluation Under Partial Assignments.
//!
//! The instrument behind the randomized solver-soundness checks:
//! evaluate a pure term under an assignment of values to variables.
//! A missing leaf or an operation undefined on the given values
//! (projecting the wrong injection, reading an array) yields
//! [`EvalError::Partial`].

use kanon_core::{Bits, EvalError, Sym, TermId, TermKind, Terms};
use num_rational::BigRational;
use num_traits::{One, Zero};
use rustc_hash::FxHashMap;

/// A concrete value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// An exact rational.
    Rat(BigRational),
    /// A bitvector constant.
    Bits(Bits),
    /// A tuple of values.
    Tuple(Vec<Value>),
    /// A left injection.
    InL(Box<Value>),
    /// A right injection.
    InR(Box<Value>),
}

/// A partial assignment of values to variable terms.
pub type Assignment = FxHashMap<TermId, Value>;

/// Evaluate `t` under `asg`.
pub fn eval(terms: &Terms, asg: &Assignment, t: TermId) -> Result<Value, EvalError> {
    match terms.kind(t) {
        TermKind::Var { .. } => asg.get(&t).cloned().ok_or(EvalError::Partial),
        TermKind::Num(q) => Ok(Value::Rat(q.clone())),
        TermKind::App { sym, args } => {
            match sym {
                Sym::BvConst(b) => return Ok(Value::Bits(b.clone())),
                Sym::Store | Sym::Select | Sym::Apply | Sym::Abstract | Sym::Bound(_)
                | Sym::Uninterp(_) => return Err(EvalError::Partial),
                _ => {}
            }
            let vals: Vec<Value> = args
                .iter()
                .map(|&a| eval(terms, asg, a))
                .collect::<Result<_, _>>()?;
            apply(sym, vals)
        }
    }
}

fn apply(sym: &Sym, vals: Vec<Value>) -> Result<Value, EvalError> {
    match sym {
        Sym::Add => {
            let mut acc = BigRational::zero();
            for v in vals {
                acc += as_rat(v)?;
            }
            Ok(Value::Rat(acc))
        }
        Sym::Multq(q) => Ok(Value::Rat(q * as_rat(into_one(vals)?)?)),
        Sym::NlMul => {
            let mut acc = BigRational::one();
            for v in vals {
                acc *= as_rat(v)?;
            }
            Ok(Value::Rat(acc))
        }
        Sym::NlPow(k) => {
            let base = as_rat(into_one(vals)?)?;
            let mut acc = BigRational::one();
            for _ in 0..*k {
                acc *= &base;
            }
            Ok(Value::Rat(acc))
        }
        Sym::Tuple(_) => Ok(Value::Tuple(vals)),
        Sym::Proj(i, n) => match into_one(vals)? {
            Value::Tuple(ts) if ts.len() == *n as usize => Ok(ts[*i as usize].clone()),
            _ => Err(EvalError::Partial),
        },
        Sym::InL => Ok(Value::InL(Box::new(into_one(vals)?))),
        Sym::InR => Ok(Value::InR(Box::new(into_one(vals)?))),
        Sym::OutL => match into_one(vals)? {
            Value::InL(v) => Ok(*v),
            _ => Err(EvalError::Partial),
        },
        Sym::OutR => match into_one(vals)? {
            Value::InR(v) => Ok(*v),
            _ => Err(EvalError::Partial),
        },
        Sym::BvConcat => {
            let mut iter = vals.into_iter();
            let mut acc = as_bits(iter.next().ok_or(EvalError::Partial)?)?;
            for v in iter {
                acc = acc.concat(&as_bits(v)?);
            }
            Ok(Value::Bits(acc))
        }
        Sym::BvExtract(hi, lo) => {
            let b = as_bits(into_one(vals)?)?;
            if *hi < b.width() {
                Ok(Value::Bits(b.extract(*hi, *lo)))
            } else {
                Err(EvalError::Partial)
            }
        }
        Sym::BvNot => Ok(Value::Bits(as_bits(into_one(vals)?)?.not())),
        Sym::BvAnd | Sym::BvOr => {
            let mut iter = vals.into_iter();
            let mut acc = as_bits(iter.next().ok_or(EvalError::Partial)?)?;
            for v in iter {
                let b = as_bits(v)?;
                if b.width() != acc.width() {
                    return Err(EvalError::Partial);
                }
                acc = if matches!(sym, Sym::BvAnd) {
                    acc.and(&b)
                } else {
                    acc.or(&b)
                };
            }
            Ok(Value::Bits(acc))
        }
        _ => Err(EvalError::Partial),
    }
}

fn into_one(mut vals: Vec<Value>) -> Result<Value, EvalError> {
    if vals.len() == 1 {
        Ok(vals.pop().expect("length checked"))
    } else {
        Err(EvalError::Partial)
    }
}

fn as_rat(v: Value) -> Result<BigRational, EvalError> {
    match v {
        Value::Rat(q) => Ok(q),
        _ => Err(EvalError::Partial),
    }
}

fn as_bits(v: Value) -> Result<Bits, EvalError> {
    match v {
        Value::Bits(b) => Ok(b),
        _ => Err(EvalError::Partial),
    }
}
