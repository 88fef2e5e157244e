// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Value`] type: the dynamic value carried by every property cell.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Tolerance used when comparing real-valued properties for equality.
///
/// Two reals closer than this are considered the same value, so a write
/// that only perturbs a value below this threshold does not notify.
pub const REAL_PRECISION: f64 = 1e-9;

/// A dynamically typed property value.
///
/// Properties are declared with a [`Kind`](crate::Kind), which constrains
/// and casts the `Value`s a cell will accept. [`Value::Nothing`] is the
/// "no value" marker: it is what an empty string casts to, and what a
/// `required` validator rejects.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// No value.
    Nothing,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A real number.
    Real(f64),
    /// A string.
    Str(String),
    /// An ordered sequence of values (list-kind properties).
    List(Vec<Value>),
}

impl Value {
    /// Returns `true` if this is [`Value::Nothing`].
    #[must_use]
    #[inline]
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// Returns the boolean, if this is a [`Value::Bool`].
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is a [`Value::Int`].
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns this value as a float, widening integers.
    #[must_use]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(r) => Some(*r),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the string, if this is a [`Value::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items, if this is a [`Value::List`].
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Interprets this value as a truth value.
    ///
    /// [`Value::Nothing`], `false`, zero, the empty string, and the empty
    /// list are falsy; everything else is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Nothing => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Real(r) => *r != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
        }
    }

    /// Compares two values, treating reals within [`REAL_PRECISION`] of
    /// each other as equal. Lists are compared element-wise with the same
    /// rule.
    #[must_use]
    pub fn approx_eq(a: &Self, b: &Self) -> bool {
        match (a, b) {
            (Self::Real(x), Self::Real(y)) => {
                let diff = if x > y { x - y } else { y - x };
                diff < REAL_PRECISION
            }
            (Self::List(xs), Self::List(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| Self::approx_eq(x, y))
            }
            _ => a == b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => write!(f, "<nothing>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Self::Real(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(String::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::vec;

    #[test]
    fn truthiness() {
        assert!(!Value::Nothing.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Real(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());

        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(-3).is_truthy());
        assert!(Value::Real(0.5).is_truthy());
        assert!(Value::from("x").is_truthy());
    }

    #[test]
    fn approx_eq_reals() {
        assert!(Value::approx_eq(&Value::Real(1.0), &Value::Real(1.0 + 1e-12)));
        assert!(!Value::approx_eq(&Value::Real(1.0), &Value::Real(1.0 + 1e-6)));
    }

    #[test]
    fn approx_eq_lists() {
        let a = Value::List(vec![Value::Real(1.0), Value::Int(2)]);
        let b = Value::List(vec![Value::Real(1.0 + 1e-12), Value::Int(2)]);
        let c = Value::List(vec![Value::Real(1.0)]);
        assert!(Value::approx_eq(&a, &b));
        assert!(!Value::approx_eq(&a, &c));
    }

    #[test]
    fn as_real_widens_ints() {
        assert_eq!(Value::Int(3).as_real(), Some(3.0));
        assert_eq!(Value::Real(0.5).as_real(), Some(0.5));
        assert_eq!(Value::Bool(true).as_real(), None);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Value::Nothing), "<nothing>");
        assert_eq!(
            format!("{}", Value::List(vec![Value::Int(1), Value::Int(2)])),
            "[1, 2]"
        );
    }
}
