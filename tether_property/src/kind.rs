// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property kinds: the casting and validation policies layered on top
//! of the core cell machinery.
//!
//! A [`Kind`] is pure policy. It owns no state; the constraint
//! parameters it consults (`minval`, `choices`, ...) live in the
//! [`Attrs`] of the cell being written, so they can differ per instance
//! and change at runtime.

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::attrs::{AttrValue, Attrs, keys};
use crate::error::{CastError, InvalidValue};
use crate::value::Value;

/// The type of a property, fixing how raw values are cast and
/// validated.
#[derive(Clone, Debug, PartialEq)]
pub enum Kind {
    /// A boolean flag. Casting applies truthiness, so any value can be
    /// written.
    Bool,
    /// An integer, with optional `minval`/`maxval` range and a
    /// `clamped` mode that clips at cast time instead of rejecting at
    /// validation time.
    Int,
    /// A real number, with the same range constraints as [`Kind::Int`].
    Real,
    /// A real number constrained to `0..=100` by default.
    Percentage,
    /// A string. The empty string casts to [`Value::Nothing`]; optional
    /// `minlen`/`maxlen` bound its length.
    Str,
    /// One of a mutable, enumerated set of string choices, each
    /// independently enable/disable-able.
    Choice,
    /// A homogeneous sequence of another kind, with optional
    /// `minlen`/`maxlen`.
    List(Box<Kind>),
    /// `2 * ndims` reals, a `(low, high)` pair per dimension, with an
    /// optional `min_distance` separation enforced per dimension.
    Bounds {
        /// Number of dimensions.
        ndims: usize,
    },
    /// `ndims` reals, one coordinate per dimension.
    Point {
        /// Number of dimensions.
        ndims: usize,
    },
}

impl Kind {
    /// The constraint attributes this kind consults, with their
    /// starting values.
    #[must_use]
    pub fn default_attrs(&self) -> Attrs {
        match self {
            Self::Bool => Attrs::new(),
            Self::Int | Self::Real => Attrs::new()
                .with(keys::MINVAL, AttrValue::Nothing)
                .with(keys::MAXVAL, AttrValue::Nothing)
                .with(keys::CLAMPED, AttrValue::Bool(false)),
            Self::Percentage => Attrs::new()
                .with(keys::MINVAL, AttrValue::Real(0.0))
                .with(keys::MAXVAL, AttrValue::Real(100.0))
                .with(keys::CLAMPED, AttrValue::Bool(false)),
            Self::Str | Self::List(_) => Attrs::new()
                .with(keys::MINLEN, AttrValue::Nothing)
                .with(keys::MAXLEN, AttrValue::Nothing),
            Self::Choice => Attrs::new()
                .with(keys::CHOICES, AttrValue::StrList(Vec::new()))
                .with(keys::CHOICE_ENABLED, AttrValue::Flags(Vec::new())),
            Self::Bounds { .. } => {
                Attrs::new().with(keys::MIN_DISTANCE, AttrValue::Real(0.0))
            }
            Self::Point { .. } => Attrs::new(),
        }
    }

    /// The value a freshly created cell of this kind holds, before any
    /// explicit default or write.
    #[must_use]
    pub fn default_value(&self, attrs: &Attrs) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Real => Value::Real(0.0),
            Self::Percentage => Value::Real(50.0),
            Self::Str => Value::Nothing,
            Self::Choice => match attrs.get(keys::CHOICES).and_then(AttrValue::as_str_list) {
                Some([first, ..]) => Value::Str(first.clone()),
                _ => Value::Nothing,
            },
            Self::List(_) => Value::List(Vec::new()),
            Self::Bounds { ndims } => {
                let dist = attrs.real(keys::MIN_DISTANCE).unwrap_or(0.0);
                let mut items = Vec::with_capacity(ndims * 2);
                for _ in 0..*ndims {
                    items.push(Value::Real(0.0));
                    items.push(Value::Real(dist));
                }
                Value::List(items)
            }
            Self::Point { ndims } => {
                Value::List((0..*ndims).map(|_| Value::Real(0.0)).collect())
            }
        }
    }

    /// Coerces a raw value into this kind's representation.
    ///
    /// Casting is lossy but total where a sensible coercion exists
    /// (truthiness for booleans, truncation and string parsing for
    /// numbers) and fails with a [`CastError`] where none does. A cast
    /// failure always aborts the write, regardless of the property's
    /// `allow_invalid` flag.
    ///
    /// [`Value::Nothing`] passes through every kind unchanged; whether
    /// "no value" is acceptable is a validation question.
    pub fn cast(&self, attrs: &Attrs, value: Value) -> Result<Value, CastError> {
        if value.is_nothing() && !matches!(self, Self::Bool | Self::Str) {
            return Ok(Value::Nothing);
        }
        match self {
            Self::Bool => Ok(Value::Bool(value.is_truthy())),
            Self::Int => {
                let i = cast_int(&value)?;
                Ok(Value::Int(clamp_int(i, attrs)))
            }
            Self::Real | Self::Percentage => {
                let r = cast_real(&value)?;
                Ok(Value::Real(clamp_real(r, attrs)))
            }
            Self::Str => match value {
                Value::Nothing => Ok(Value::Nothing),
                Value::Str(s) if s.is_empty() => Ok(Value::Nothing),
                Value::Str(s) => Ok(Value::Str(s)),
                other => {
                    let s = other.to_string();
                    if s.is_empty() {
                        Ok(Value::Nothing)
                    } else {
                        Ok(Value::Str(s))
                    }
                }
            },
            Self::Choice => match value {
                Value::Str(s) => Ok(Value::Str(s)),
                other => Err(CastError::new(format!(
                    "choice value must be a string, got {other}"
                ))),
            },
            Self::List(item) => {
                let Value::List(items) = value else {
                    return Err(CastError::new(format!("expected a list, got {value}")));
                };
                let item_attrs = item.default_attrs();
                let items = items
                    .into_iter()
                    .map(|v| item.cast(&item_attrs, v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(items))
            }
            Self::Bounds { .. } | Self::Point { .. } => {
                let Value::List(items) = value else {
                    return Err(CastError::new(format!("expected a list, got {value}")));
                };
                let items = items
                    .into_iter()
                    .map(|v| cast_real(&v).map(Value::Real))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(items))
            }
        }
    }

    /// Checks a cast value against this kind's constraints.
    ///
    /// [`Value::Nothing`] is always valid here; rejecting "no value" is
    /// the job of the property's `required` setting.
    pub fn validate(&self, attrs: &Attrs, value: &Value) -> Result<(), InvalidValue> {
        if value.is_nothing() {
            return Ok(());
        }
        match self {
            Self::Bool => Ok(()),
            Self::Int | Self::Real | Self::Percentage => {
                let Some(r) = value.as_real() else {
                    return Err(InvalidValue::new(format!("{value} is not a number")));
                };
                validate_range(r, attrs)
            }
            Self::Str => {
                let Some(s) = value.as_str() else {
                    return Err(InvalidValue::new(format!("{value} is not a string")));
                };
                validate_length(s.chars().count(), attrs)
            }
            Self::Choice => {
                let Some(s) = value.as_str() else {
                    return Err(InvalidValue::new(format!("{value} is not a string")));
                };
                validate_choice(s, attrs)
            }
            Self::List(item) => {
                let Some(items) = value.as_list() else {
                    return Err(InvalidValue::new(format!("{value} is not a list")));
                };
                validate_length(items.len(), attrs)?;
                let item_attrs = item.default_attrs();
                for v in items {
                    item.validate(&item_attrs, v)?;
                }
                Ok(())
            }
            Self::Bounds { ndims } => {
                let Some(items) = value.as_list() else {
                    return Err(InvalidValue::new(format!("{value} is not a list")));
                };
                if items.len() != ndims * 2 {
                    return Err(InvalidValue::new(format!(
                        "bounds must have {} values, got {}",
                        ndims * 2,
                        items.len()
                    )));
                }
                let dist = attrs.real(keys::MIN_DISTANCE).unwrap_or(0.0);
                for dim in 0..*ndims {
                    let lo = items[dim * 2].as_real().ok_or_else(|| {
                        InvalidValue::new("bounds values must be numbers".to_owned())
                    })?;
                    let hi = items[dim * 2 + 1].as_real().ok_or_else(|| {
                        InvalidValue::new("bounds values must be numbers".to_owned())
                    })?;
                    if hi - lo < dist {
                        return Err(InvalidValue::new(format!(
                            "dimension {dim} low and high must be at least {dist} apart"
                        )));
                    }
                }
                Ok(())
            }
            Self::Point { ndims } => {
                let Some(items) = value.as_list() else {
                    return Err(InvalidValue::new(format!("{value} is not a list")));
                };
                if items.len() != *ndims {
                    return Err(InvalidValue::new(format!(
                        "point must have {ndims} values, got {}",
                        items.len()
                    )));
                }
                if items.iter().any(|v| v.as_real().is_none()) {
                    return Err(InvalidValue::new("point values must be numbers".to_owned()));
                }
                Ok(())
            }
        }
    }

    /// Whether properties of this kind store invalid values by default.
    ///
    /// `Choice` defaults to rejecting invalid writes; every other kind
    /// stores them and reports `valid = false` to listeners.
    #[must_use]
    pub fn default_allow_invalid(&self) -> bool {
        !matches!(self, Self::Choice)
    }

    /// Whether this kind stores a sequence of item cells.
    #[must_use]
    pub fn is_list_like(&self) -> bool {
        matches!(self, Self::List(_) | Self::Bounds { .. } | Self::Point { .. })
    }

    /// The kind of this kind's items, for list-like kinds.
    #[must_use]
    pub fn item_kind(&self) -> Option<Kind> {
        match self {
            Self::List(item) => Some((**item).clone()),
            Self::Bounds { .. } | Self::Point { .. } => Some(Self::Real),
            _ => None,
        }
    }

    /// The attributes item cells of this kind start with.
    ///
    /// `Bounds` and `Point` items clamp to their per-dimension limits,
    /// matching the container's clipped-edit behaviour.
    #[must_use]
    pub fn item_attrs(&self) -> Option<Attrs> {
        match self {
            Self::List(item) => Some(item.default_attrs()),
            Self::Bounds { .. } | Self::Point { .. } => Some(
                Kind::Real
                    .default_attrs()
                    .with(keys::CLAMPED, AttrValue::Bool(true)),
            ),
            _ => None,
        }
    }

    /// Compares two values of this kind, with real-number tolerance.
    #[must_use]
    pub fn values_equal(&self, a: &Value, b: &Value) -> bool {
        Value::approx_eq(a, b)
    }
}

fn cast_int(value: &Value) -> Result<i64, CastError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Real(r) => Ok(*r as i64),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .or_else(|_| s.trim().parse::<f64>().map(|r| r as i64))
            .map_err(|_| CastError::new(format!("'{s}' is not an integer"))),
        other => Err(CastError::new(format!("{other} is not an integer"))),
    }
}

fn cast_real(value: &Value) -> Result<f64, CastError> {
    match value {
        Value::Real(r) => Ok(*r),
        Value::Int(i) => Ok(*i as f64),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| CastError::new(format!("'{s}' is not a number"))),
        other => Err(CastError::new(format!("{other} is not a number"))),
    }
}

fn clamp_int(value: i64, attrs: &Attrs) -> i64 {
    if !attrs.flag(keys::CLAMPED) {
        return value;
    }
    let mut v = value;
    if let Some(min) = attrs.real(keys::MINVAL) {
        let min = min as i64;
        if v < min {
            v = min;
        }
    }
    if let Some(max) = attrs.real(keys::MAXVAL) {
        let max = max as i64;
        if v > max {
            v = max;
        }
    }
    v
}

fn clamp_real(value: f64, attrs: &Attrs) -> f64 {
    if !attrs.flag(keys::CLAMPED) {
        return value;
    }
    let mut v = value;
    if let Some(min) = attrs.real(keys::MINVAL) {
        if v < min {
            v = min;
        }
    }
    if let Some(max) = attrs.real(keys::MAXVAL) {
        if v > max {
            v = max;
        }
    }
    v
}

fn validate_range(value: f64, attrs: &Attrs) -> Result<(), InvalidValue> {
    if let Some(min) = attrs.real(keys::MINVAL) {
        if value < min {
            return Err(InvalidValue::new(format!("must be at least {min}")));
        }
    }
    if let Some(max) = attrs.real(keys::MAXVAL) {
        if value > max {
            return Err(InvalidValue::new(format!("must be at most {max}")));
        }
    }
    Ok(())
}

fn validate_length(len: usize, attrs: &Attrs) -> Result<(), InvalidValue> {
    if let Some(min) = attrs.length(keys::MINLEN) {
        if len < min {
            return Err(InvalidValue::new(format!("must have length at least {min}")));
        }
    }
    if let Some(max) = attrs.length(keys::MAXLEN) {
        if len > max {
            return Err(InvalidValue::new(format!("must have length at most {max}")));
        }
    }
    Ok(())
}

fn validate_choice(value: &str, attrs: &Attrs) -> Result<(), InvalidValue> {
    let choices = attrs
        .get(keys::CHOICES)
        .and_then(AttrValue::as_str_list)
        .unwrap_or(&[]);
    if !choices.iter().any(|c| c == value) {
        return Err(InvalidValue::new(format!("'{value}' is not a valid choice")));
    }
    let enabled = attrs
        .get(keys::CHOICE_ENABLED)
        .and_then(AttrValue::as_flags)
        .and_then(|flags| {
            flags
                .iter()
                .find(|(name, _)| name == value)
                .map(|(_, on)| *on)
        })
        // A choice with no flag entry counts as enabled.
        .unwrap_or(true);
    if !enabled {
        return Err(InvalidValue::new(format!("choice '{value}' is disabled")));
    }
    Ok(())
}

/// Builds the `choices`/`choice_enabled` attribute pair for a choice
/// set in which every choice is enabled.
#[must_use]
pub(crate) fn choice_attrs(choices: &[String]) -> (AttrValue, AttrValue) {
    (
        AttrValue::StrList(choices.to_owned()),
        AttrValue::Flags(choices.iter().map(|c| (c.clone(), true)).collect()),
    )
}
