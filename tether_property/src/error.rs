// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Data-dependent failures (cast and validation errors, malformed list
//! operations) flow as `Result`s. Programming misuse (duplicate
//! listener names, unknown properties, bind policy violations) panics
//! instead; see the `# Panics` sections on the offending methods.
//! Listener failures are a third channel: they are logged at the queue
//! drain and never propagate to the code that triggered the
//! notification.

use alloc::string::String;
use core::fmt;

/// A value could not be interpreted as the property's kind at all.
///
/// Cast errors always propagate to the caller of `set`; a value that
/// cannot even be coerced is fatal to that write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CastError {
    message: String,
}

impl CastError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cast failed: {}", self.message)
    }
}

impl core::error::Error for CastError {}

/// A cast value failed validation.
///
/// Whether this surfaces to the caller depends on the property's
/// `allow_invalid` flag: when `true` (the default) the invalid value is
/// still stored and listeners observe `valid = false`; when `false` the
/// error propagates and no state changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidValue {
    message: String,
}

impl InvalidValue {
    /// Creates a validation error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable reason the value is invalid.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value: {}", self.message)
    }
}

impl core::error::Error for InvalidValue {}

/// A failed property write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyError {
    /// The value could not be cast to the property's kind.
    Cast(CastError),
    /// The value failed validation and the property does not allow
    /// invalid values.
    Invalid(InvalidValue),
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cast(e) => e.fmt(f),
            Self::Invalid(e) => e.fmt(f),
        }
    }
}

impl core::error::Error for PropertyError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Cast(e) => Some(e),
            Self::Invalid(e) => Some(e),
        }
    }
}

impl From<CastError> for PropertyError {
    fn from(e: CastError) -> Self {
        Self::Cast(e)
    }
}

impl From<InvalidValue> for PropertyError {
    fn from(e: InvalidValue) -> Self {
        Self::Invalid(e)
    }
}

/// A failed list operation. The list is unchanged on error.
#[derive(Clone, Debug, PartialEq)]
pub enum ListError {
    /// A same-length slice assignment was given the wrong number of
    /// values.
    LengthMismatch {
        /// Number of slots being assigned.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
    /// `reorder` was given indices that are not a permutation of
    /// `0..len`.
    NotAPermutation {
        /// The list length the indices must cover.
        len: usize,
    },
    /// An index was out of range.
    OutOfRange {
        /// The offending index.
        index: usize,
        /// The list length.
        len: usize,
    },
    /// `remove` was given a value not present in the list.
    ValueNotFound,
    /// An item write failed.
    Item(PropertyError),
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { expected, actual } => {
                write!(f, "expected {expected} values, got {actual}")
            }
            Self::NotAPermutation { len } => {
                write!(f, "indices must be a permutation of 0..{len}")
            }
            Self::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for list of length {len}")
            }
            Self::ValueNotFound => write!(f, "value not found in list"),
            Self::Item(e) => write!(f, "item write failed: {e}"),
        }
    }
}

impl core::error::Error for ListError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Item(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PropertyError> for ListError {
    fn from(e: PropertyError) -> Self {
        Self::Item(e)
    }
}

/// A failure reported by a listener callback.
///
/// Listener errors are caught at the call-queue drain, logged, and
/// isolated: one failing listener never blocks its siblings or the
/// write that triggered it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    /// Creates a listener error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl core::error::Error for ListenerError {}

impl From<PropertyError> for ListenerError {
    fn from(e: PropertyError) -> Self {
        Self::new(alloc::format!("{e}"))
    }
}
