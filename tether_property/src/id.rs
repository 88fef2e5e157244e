// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handle types for objects, properties, and value cells.
//!
//! All relationships in the property graph (item -> owning list,
//! child -> parent, bind peer -> peer) are expressed as these plain
//! handles, resolved by lookup in the [`World`](crate::World). None of
//! them own anything; a handle whose target has been destroyed is simply
//! stale. Object and cell handles carry a generation alongside their
//! slot index, so a stale handle can never alias a later allocation
//! that reuses the slot.

use core::fmt;

/// Identifies one property-owning object within a [`World`](crate::World).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    #[must_use]
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the underlying slot index of this object id.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[must_use]
    #[inline]
    pub(crate) const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectId")
            .field(&self.index)
            .field(&self.generation)
            .finish()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.index)
    }
}

/// Identifies one declared property within a [`Schema`](crate::Schema).
///
/// A `PropId` is an index into the schema's declaration order, so it is
/// only meaningful together with the schema that issued it.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropId(u16);

impl PropId {
    #[must_use]
    #[inline]
    pub(crate) const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the underlying index of this property id.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropId").field(&self.0).finish()
    }
}

/// Identifies one value cell within a [`World`](crate::World).
///
/// Every property of every object has one cell; every item of a list
/// property has its own cell as well. Cell ids are the identity used by
/// the binding layer to match list items across structural changes.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId {
    index: u32,
    generation: u32,
}

impl CellId {
    #[must_use]
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the underlying slot index of this cell id.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[must_use]
    #[inline]
    pub(crate) const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CellId")
            .field(&self.index)
            .field(&self.generation)
            .finish()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.index)
    }
}
