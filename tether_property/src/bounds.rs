// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dimension-wise accessors for `Bounds` and `Point` properties.
//!
//! Both kinds are list-like underneath, so everything here is sugar
//! over the ordinary item operations: a `Bounds` of `ndims` dimensions
//! stores `(low, high)` item pairs, and per-dimension editing limits
//! are item-cell `minval`/`maxval` attributes, clamped at cast time.

use crate::attrs::{AttrValue, keys};
use crate::error::ListError;
use crate::id::ObjectId;
use crate::kind::Kind;
use crate::value::Value;
use crate::world::World;

impl World {
    /// Number of dimensions of a `Bounds` or `Point` property.
    ///
    /// # Panics
    ///
    /// Panics if the property is of any other kind.
    #[must_use]
    pub fn ndims(&self, object: ObjectId, name: &str) -> usize {
        let cell = self.property_cell(object, name);
        let c = self.cell(cell);
        match self.schema(c.owner).def(c.prop).kind() {
            Kind::Bounds { ndims } | Kind::Point { ndims } => *ndims,
            other => panic!("{name} is not a bounds or point property ({other:?})"),
        }
    }

    /// The low edge of one dimension.
    #[must_use]
    pub fn bounds_low(&self, object: ObjectId, name: &str, dim: usize) -> f64 {
        self.get_item(object, name, dim * 2).as_real().unwrap_or(0.0)
    }

    /// The high edge of one dimension.
    #[must_use]
    pub fn bounds_high(&self, object: ObjectId, name: &str, dim: usize) -> f64 {
        self.get_item(object, name, dim * 2 + 1)
            .as_real()
            .unwrap_or(0.0)
    }

    /// The extent of one dimension (`high - low`).
    #[must_use]
    pub fn bounds_len(&self, object: ObjectId, name: &str, dim: usize) -> f64 {
        self.bounds_high(object, name, dim) - self.bounds_low(object, name, dim)
    }

    /// The midpoint of one dimension.
    #[must_use]
    pub fn bounds_center(&self, object: ObjectId, name: &str, dim: usize) -> f64 {
        (self.bounds_high(object, name, dim) + self.bounds_low(object, name, dim)) / 2.0
    }

    /// Writes the low edge of one dimension.
    pub fn set_bounds_low(
        &mut self,
        object: ObjectId,
        name: &str,
        dim: usize,
        value: f64,
    ) -> Result<(), ListError> {
        self.set_item(object, name, dim * 2, Value::Real(value))
    }

    /// Writes the high edge of one dimension.
    pub fn set_bounds_high(
        &mut self,
        object: ObjectId,
        name: &str,
        dim: usize,
        value: f64,
    ) -> Result<(), ListError> {
        self.set_item(object, name, dim * 2 + 1, Value::Real(value))
    }

    /// Writes both edges of one dimension as a single pair.
    pub fn set_bounds_range(
        &mut self,
        object: ObjectId,
        name: &str,
        dim: usize,
        low: f64,
        high: f64,
    ) -> Result<(), ListError> {
        self.set_bounds_low(object, name, dim, low)?;
        self.set_bounds_high(object, name, dim, high)
    }

    /// The editing limits of one dimension, `(minval, maxval)`.
    #[must_use]
    pub fn bounds_limits(
        &self,
        object: ObjectId,
        name: &str,
        dim: usize,
    ) -> (Option<f64>, Option<f64>) {
        let min = self
            .item_attribute(object, name, dim * 2, keys::MINVAL)
            .and_then(AttrValue::as_real);
        let max = self
            .item_attribute(object, name, dim * 2, keys::MAXVAL)
            .and_then(AttrValue::as_real);
        (min, max)
    }

    /// Sets the editing limits of one dimension. Both the low and high
    /// edge clamp to them on every subsequent write.
    pub fn set_bounds_limits(
        &mut self,
        object: ObjectId,
        name: &str,
        dim: usize,
        min: f64,
        max: f64,
    ) {
        for index in [dim * 2, dim * 2 + 1] {
            self.set_item_attribute(object, name, index, keys::MINVAL, AttrValue::Real(min));
            self.set_item_attribute(object, name, index, keys::MAXVAL, AttrValue::Real(max));
        }
    }

    /// One coordinate of a `Point` property.
    #[must_use]
    pub fn point_coord(&self, object: ObjectId, name: &str, dim: usize) -> f64 {
        self.get_item(object, name, dim).as_real().unwrap_or(0.0)
    }

    /// Writes one coordinate of a `Point` property.
    pub fn set_point_coord(
        &mut self,
        object: ObjectId,
        name: &str,
        dim: usize,
        value: f64,
    ) -> Result<(), ListError> {
        self.set_item(object, name, dim, Value::Real(value))
    }

    /// Sets the editing limits of one `Point` dimension.
    pub fn set_point_limits(&mut self, object: ObjectId, name: &str, dim: usize, min: f64, max: f64) {
        self.set_item_attribute(object, name, dim, keys::MINVAL, AttrValue::Real(min));
        self.set_item_attribute(object, name, dim, keys::MAXVAL, AttrValue::Real(max));
    }
}
