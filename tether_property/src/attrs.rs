// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Constraint attributes.
//!
//! Every value cell carries a small, ordered map of named attributes:
//! the validation parameters of its kind (`minval`, `maxlen`, ...).
//! Attributes are seeded from the property definition and may be
//! overridden per instance; changing one notifies attribute listeners
//! and forces revalidation.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

/// Well-known attribute names used by the built-in kinds.
pub mod keys {
    /// Minimum numeric value (`Int`/`Real`/`Percentage` items).
    pub const MINVAL: &str = "minval";
    /// Maximum numeric value.
    pub const MAXVAL: &str = "maxval";
    /// Whether out-of-range numbers are clipped at cast time instead of
    /// rejected at validation time.
    pub const CLAMPED: &str = "clamped";
    /// Minimum length (strings and lists).
    pub const MINLEN: &str = "minlen";
    /// Maximum length (strings and lists).
    pub const MAXLEN: &str = "maxlen";
    /// The enumerated choice set (`Choice`).
    pub const CHOICES: &str = "choices";
    /// Per-choice enabled flags (`Choice`).
    pub const CHOICE_ENABLED: &str = "choice_enabled";
    /// Minimum separation between the low and high value of each
    /// dimension (`Bounds`).
    pub const MIN_DISTANCE: &str = "min_distance";
}

/// The value of a single constraint attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    /// Unset.
    Nothing,
    /// A boolean flag.
    Bool(bool),
    /// An integer parameter.
    Int(i64),
    /// A real parameter.
    Real(f64),
    /// A string parameter.
    Str(String),
    /// An ordered string list (e.g. the choice set).
    StrList(Vec<String>),
    /// Ordered named flags (e.g. per-choice enabled state).
    Flags(Vec<(String, bool)>),
}

impl AttrValue {
    /// Returns this attribute as a float, widening integers.
    #[must_use]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(r) => Some(*r),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns this attribute as a length, if it is a non-negative
    /// integer.
    #[must_use]
    pub fn as_len(&self) -> Option<usize> {
        match self {
            Self::Int(i) if *i >= 0 => usize::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Returns the boolean flag, if set.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string list, if this is a [`AttrValue::StrList`].
    #[must_use]
    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            Self::StrList(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the named flags, if this is a [`AttrValue::Flags`].
    #[must_use]
    pub fn as_flags(&self) -> Option<&[(String, bool)]> {
        match self {
            Self::Flags(flags) => Some(flags),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => write!(f, "<unset>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::StrList(items) => write!(f, "{items:?}"),
            Self::Flags(flags) => write!(f, "{flags:?}"),
        }
    }
}

/// Inline capacity for attribute maps; the built-in kinds declare at
/// most a handful of constraints.
const INLINE_ATTRS: usize = 4;

/// An ordered name -> [`AttrValue`] map.
///
/// Insertion order is preserved so attribute listeners observe
/// deterministic iteration. Lookup is a linear scan, which is fine for
/// the tiny attribute counts that occur in practice.
#[derive(Clone, Default, PartialEq)]
pub struct Attrs {
    entries: SmallVec<[(String, AttrValue); INLINE_ATTRS]>,
}

impl Attrs {
    /// Creates an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no attributes are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value of the named attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Returns `true` if the named attribute exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets the named attribute, returning `true` if the stored value
    /// actually changed.
    pub fn set(&mut self, name: impl Into<String>, value: AttrValue) -> bool {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            if entry.1 == value {
                return false;
            }
            entry.1 = value;
            true
        } else {
            self.entries.push((name, value));
            true
        }
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.set(name, value);
        self
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Convenience: the named attribute as a float, `None` if unset or
    /// not numeric.
    #[must_use]
    pub fn real(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(AttrValue::as_real)
    }

    /// Convenience: the named attribute as a length.
    #[must_use]
    pub fn length(&self, name: &str) -> Option<usize> {
        self.get(name).and_then(AttrValue::as_len)
    }

    /// Convenience: the named attribute as a boolean, defaulting to
    /// `false` when unset.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(AttrValue::as_bool).unwrap_or(false)
    }
}

impl fmt::Debug for Attrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(n, v)| (n, v)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn set_reports_change() {
        let mut attrs = Attrs::new();
        assert!(attrs.set(keys::MINVAL, AttrValue::Real(0.0)));
        assert!(!attrs.set(keys::MINVAL, AttrValue::Real(0.0)));
        assert!(attrs.set(keys::MINVAL, AttrValue::Real(1.0)));
        assert_eq!(attrs.real(keys::MINVAL), Some(1.0));
    }

    #[test]
    fn insertion_order_preserved() {
        let attrs = Attrs::new()
            .with("b", AttrValue::Int(2))
            .with("a", AttrValue::Int(1));
        let names: Vec<_> = attrs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn real_widens_int() {
        let attrs = Attrs::new().with(keys::MAXVAL, AttrValue::Int(5));
        assert_eq!(attrs.real(keys::MAXVAL), Some(5.0));
    }

    #[test]
    fn nothing_is_not_numeric() {
        let attrs = Attrs::new().with(keys::MINVAL, AttrValue::Nothing);
        assert_eq!(attrs.real(keys::MINVAL), None);
        assert!(attrs.contains(keys::MINVAL));
    }

    #[test]
    fn flag_defaults_false() {
        let attrs = Attrs::new();
        assert!(!attrs.flag(keys::CLAMPED));
    }
}
