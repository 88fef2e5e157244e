// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! List property operations.
//!
//! Every item of a list-like property is its own [`CellId`]-addressed
//! cell, with its own attributes and listeners. The operations here
//! preserve item-cell identity wherever the shape of the list allows
//! it: writing a whole list of the same length mutates the existing
//! item cells in place, and `reorder`/`move_item` shuffle cells without
//! recreating them. Only a length-changing whole-list write discards
//! identity and rebuilds every item cell. The binding layer relies on
//! exactly these rules to match items across replicas.

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use crate::attrs::{AttrValue, Attrs, keys};
use crate::cell::Cell;
use crate::error::{CastError, InvalidValue, ListError, PropertyError};
use crate::id::{CellId, ObjectId};
use crate::kind::Kind;
use crate::value::Value;
use crate::world::World;

impl World {
    /// Number of items in the named list property.
    ///
    /// # Panics
    ///
    /// Panics if `object` is stale or the property does not exist.
    #[must_use]
    pub fn list_len(&self, object: ObjectId, name: &str) -> usize {
        self.cell(self.property_cell(object, name)).items.len()
    }

    /// The item cells of the named list property, in order.
    #[must_use]
    pub fn item_cells(&self, object: ObjectId, name: &str) -> &[CellId] {
        &self.cell(self.property_cell(object, name)).items
    }

    /// The cell backing one item.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn item_cell(&self, object: ObjectId, name: &str, index: usize) -> CellId {
        let items = self.item_cells(object, name);
        match items.get(index) {
            Some(&cell) => cell,
            None => panic!("index {index} out of range for {name} of length {}", items.len()),
        }
    }

    /// The current value of one item.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn get_item(&self, object: ObjectId, name: &str, index: usize) -> &Value {
        &self.cell(self.item_cell(object, name, index)).value
    }

    /// Writes one item in place. The item cell, and any listeners on
    /// it, survive the write.
    pub fn set_item(
        &mut self,
        object: ObjectId,
        name: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), ListError> {
        let list = self.property_cell(object, name);
        let len = self.cell(list).items.len();
        let Some(&item) = self.cell(list).items.get(index) else {
            return Err(ListError::OutOfRange { index, len });
        };
        self.set_cell(item, value).map_err(ListError::Item)
    }

    /// The values of items `start..end`.
    pub fn get_slice(
        &self,
        object: ObjectId,
        name: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<Value>, ListError> {
        let list = self.property_cell(object, name);
        let items = &self.cell(list).items;
        let len = items.len();
        if end > len || start > end {
            return Err(ListError::OutOfRange { index: end, len });
        }
        Ok(items[start..end]
            .iter()
            .map(|&item| self.cell(item).value.clone())
            .collect())
    }

    /// Writes a run of items in place starting at `start`. Every target
    /// cell, and any listeners on it, survive the write; the list
    /// notifies once before the changed items notify, like a
    /// same-length whole-list write. Nothing is modified if the run
    /// does not fit or any value fails to cast or validate.
    pub fn set_slice(
        &mut self,
        object: ObjectId,
        name: &str,
        start: usize,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<(), ListError> {
        let list = self.property_cell(object, name);
        let items = self.cell(list).items.clone();
        let len = items.len();
        if start > len {
            return Err(ListError::OutOfRange { index: start, len });
        }
        let values: Vec<Value> = values.into_iter().collect();
        if values.len() > len - start {
            return Err(ListError::LengthMismatch {
                expected: len - start,
                actual: values.len(),
            });
        }
        let (kind, _, item_allow_invalid) = self.item_policy(list);
        let targets = &items[start..start + values.len()];
        let mut prepared = Vec::with_capacity(values.len());
        for (&item, value) in targets.iter().zip(values) {
            let attrs = &self.cell(item).attrs;
            let cast = kind.cast(attrs, value).map_err(PropertyError::from)?;
            let validity = kind.validate(attrs, &cast);
            if let Err(e) = &validity {
                if !item_allow_invalid {
                    return Err(ListError::Item(e.clone().into()));
                }
            }
            prepared.push((cast, validity.is_ok()));
        }
        self.commit_in_place(list, targets, prepared);
        Ok(())
    }

    /// A constraint attribute of one item's cell.
    #[must_use]
    pub fn item_attribute(
        &self,
        object: ObjectId,
        name: &str,
        index: usize,
        attribute: &str,
    ) -> Option<&AttrValue> {
        self.cell(self.item_cell(object, name, index))
            .attrs
            .get(attribute)
    }

    /// Changes a constraint attribute on one item's cell. This is how
    /// per-dimension limits of `Bounds` and `Point` properties are
    /// adjusted.
    pub fn set_item_attribute(
        &mut self,
        object: ObjectId,
        name: &str,
        index: usize,
        attribute: &str,
        value: AttrValue,
    ) {
        let cell = self.item_cell(object, name, index);
        self.set_cell_attribute(cell, attribute, value);
    }

    /// Appends one value.
    pub fn append(
        &mut self,
        object: ObjectId,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), ListError> {
        let len = self.list_len(object, name);
        self.insert(object, name, len, value)
    }

    /// Inserts one value at `index`.
    pub fn insert(
        &mut self,
        object: ObjectId,
        name: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), ListError> {
        self.insert_all(object, name, index, [value.into()])
    }

    /// Inserts a run of values at `index`, as one notification.
    pub fn insert_all(
        &mut self,
        object: ObjectId,
        name: &str,
        index: usize,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<(), ListError> {
        let list = self.property_cell(object, name);
        let len = self.cell(list).items.len();
        if index > len {
            return Err(ListError::OutOfRange { index, len });
        }
        let (kind, attrs, item_allow_invalid) = self.item_policy(list);
        let mut prepared = Vec::new();
        for value in values {
            let cast = kind.cast(&attrs, value).map_err(PropertyError::from)?;
            let validity = kind.validate(&attrs, &cast);
            if let Err(e) = &validity {
                if !item_allow_invalid {
                    return Err(ListError::Item(e.clone().into()));
                }
            }
            prepared.push((cast, validity.is_ok()));
        }
        if prepared.is_empty() {
            return Ok(());
        }
        self.check_prospective_len(list, len + prepared.len())?;
        let (owner, prop) = {
            let c = self.cell(list);
            (c.owner, c.prop)
        };
        let mut new_cells = Vec::with_capacity(prepared.len());
        for (value, valid) in prepared {
            let mut cell = Cell::new(owner, prop, value, attrs.clone());
            cell.valid = valid;
            cell.parent = Some(list);
            new_cells.push(self.alloc_cell(cell));
        }
        let mut items = self.cell(list).items.clone();
        items.splice(index..index, new_cells);
        self.commit_items(list, items);
        Ok(())
    }

    /// Removes and returns the item at `index`. Its cell is freed, so
    /// a bound replica treats this as the disappearance of that item.
    pub fn remove(&mut self, object: ObjectId, name: &str, index: usize) -> Result<Value, ListError> {
        let list = self.property_cell(object, name);
        let len = self.cell(list).items.len();
        if index >= len {
            return Err(ListError::OutOfRange { index, len });
        }
        self.check_prospective_len(list, len - 1)?;
        let mut items = self.cell(list).items.clone();
        let removed = items.remove(index);
        let value = self.cell(removed).value.clone();
        self.free_cell(removed);
        self.commit_items(list, items);
        Ok(value)
    }

    /// Removes the first item equal to `value`.
    pub fn remove_value(
        &mut self,
        object: ObjectId,
        name: &str,
        value: &Value,
    ) -> Result<usize, ListError> {
        let list = self.property_cell(object, name);
        let index = self
            .cell(list)
            .items
            .iter()
            .position(|&item| Value::approx_eq(&self.cell(item).value, value))
            .ok_or(ListError::ValueNotFound)?;
        self.remove(object, name, index)?;
        Ok(index)
    }

    /// Removes the first occurrence of each of `values`, raising one
    /// list-level notification. The list is unchanged if any value is
    /// missing or the resulting length would violate a constraint.
    pub fn remove_all(
        &mut self,
        object: ObjectId,
        name: &str,
        values: &[Value],
    ) -> Result<(), ListError> {
        let list = self.property_cell(object, name);
        let items = self.cell(list).items.clone();
        let mut doomed = vec![false; items.len()];
        for value in values {
            let index = items
                .iter()
                .enumerate()
                .position(|(i, &item)| {
                    !doomed[i] && Value::approx_eq(&self.cell(item).value, value)
                })
                .ok_or(ListError::ValueNotFound)?;
            doomed[index] = true;
        }
        self.check_prospective_len(list, items.len() - values.len())?;
        let mut kept = Vec::with_capacity(items.len() - values.len());
        for (i, &item) in items.iter().enumerate() {
            if doomed[i] {
                self.free_cell(item);
            } else {
                kept.push(item);
            }
        }
        self.commit_items(list, kept);
        Ok(())
    }

    /// Moves the item at `from` to position `to`, preserving its cell.
    pub fn move_item(
        &mut self,
        object: ObjectId,
        name: &str,
        from: usize,
        to: usize,
    ) -> Result<(), ListError> {
        let list = self.property_cell(object, name);
        let len = self.cell(list).items.len();
        if from >= len {
            return Err(ListError::OutOfRange { index: from, len });
        }
        if to >= len {
            return Err(ListError::OutOfRange { index: to, len });
        }
        if from == to {
            return Ok(());
        }
        let mut items = self.cell(list).items.clone();
        let cell = items.remove(from);
        items.insert(to, cell);
        self.commit_items(list, items);
        Ok(())
    }

    /// Reorders the list so that new position `i` holds the item
    /// previously at `order[i]`. All item cells survive.
    pub fn reorder(
        &mut self,
        object: ObjectId,
        name: &str,
        order: &[usize],
    ) -> Result<(), ListError> {
        let list = self.property_cell(object, name);
        let items = self.cell(list).items.clone();
        let len = items.len();
        if order.len() != len {
            return Err(ListError::NotAPermutation { len });
        }
        let mut seen = alloc::vec![false; len];
        for &i in order {
            if i >= len || seen[i] {
                return Err(ListError::NotAPermutation { len });
            }
            seen[i] = true;
        }
        let permuted: Vec<CellId> = order.iter().map(|&i| items[i]).collect();
        if permuted != items {
            self.commit_items(list, permuted);
        }
        Ok(())
    }

    /// Removes every item.
    pub fn clear(&mut self, object: ObjectId, name: &str) -> Result<(), ListError> {
        let list = self.property_cell(object, name);
        self.check_prospective_len(list, 0)?;
        let items = self.cell(list).items.clone();
        if items.is_empty() {
            return Ok(());
        }
        for item in &items {
            self.free_cell(*item);
        }
        self.commit_items(list, Vec::new());
        Ok(())
    }

    /// Whole-list write, reached through [`World::set`](World::set).
    ///
    /// A same-length write is an item-wise update: each existing item
    /// cell keeps its identity and is mutated in place, changed items
    /// notify their own listeners, and the list notifies once at the
    /// end. A length-changing write is a replacement: every old item
    /// cell is freed and fresh ones are created. Nothing is modified if
    /// any value fails to cast or validate.
    pub(crate) fn write_list_cell(
        &mut self,
        list: CellId,
        value: Value,
    ) -> Result<(), PropertyError> {
        let Value::List(values) = value else {
            return Err(CastError::new(format!("expected a list, got {value}")).into());
        };
        let (kind, default_attrs, item_allow_invalid) = self.item_policy(list);
        let items = self.cell(list).items.clone();
        if values.len() == items.len() {
            // Cast and validate everything against each item's own
            // attributes before touching any state.
            let mut prepared = Vec::with_capacity(values.len());
            for (&item, value) in items.iter().zip(values) {
                let attrs = &self.cell(item).attrs;
                let cast = kind.cast(attrs, value)?;
                let validity = kind.validate(attrs, &cast);
                if let Err(e) = &validity {
                    if !item_allow_invalid {
                        return Err(e.clone().into());
                    }
                }
                prepared.push((cast, validity.is_ok()));
            }
            self.commit_in_place(list, &items, prepared);
            Ok(())
        } else {
            let mut prepared = Vec::with_capacity(values.len());
            for value in values {
                let cast = kind.cast(&default_attrs, value)?;
                let validity = kind.validate(&default_attrs, &cast);
                if let Err(e) = &validity {
                    if !item_allow_invalid {
                        return Err(e.clone().into());
                    }
                }
                prepared.push((cast, validity.is_ok()));
            }
            if let Err(e) = self.prospective_len_error(list, prepared.len()) {
                return Err(e.into());
            }
            let (owner, prop) = {
                let c = self.cell(list);
                (c.owner, c.prop)
            };
            // Allocate before freeing so the replacement cells cannot
            // recycle the ids of the cells they replace.
            let mut new_cells = Vec::with_capacity(prepared.len());
            for (value, valid) in prepared {
                let mut cell = Cell::new(owner, prop, value, default_attrs.clone());
                cell.valid = valid;
                cell.parent = Some(list);
                new_cells.push(self.alloc_cell(cell));
            }
            for item in &items {
                self.free_cell(*item);
            }
            self.commit_items(list, new_cells);
            Ok(())
        }
    }

    /// Writes prepared values into existing item cells. Every target is
    /// mutated before anything notifies, then the list notifies once,
    /// then each changed item notifies its own listeners, so no
    /// listener ever observes a half-written list.
    fn commit_in_place(&mut self, list: CellId, targets: &[CellId], prepared: Vec<(Value, bool)>) {
        let mut changed = Vec::new();
        for (&item, (value, valid)) in targets.iter().zip(prepared) {
            let differs = {
                let c = self.cell(item);
                !Value::approx_eq(&c.value, &value) || c.valid != valid
            };
            if !differs {
                continue;
            }
            let c = self.cell_mut(item);
            c.value = value;
            c.valid = valid;
            changed.push(item);
        }
        if changed.is_empty() {
            return;
        }
        self.refresh_list_value(list);
        self.revalidate_list_valid(list);
        self.notify_cell(list);
        for item in changed {
            self.notify_cell(item);
        }
    }

    /// The item kind, starting attributes for new item cells, and the
    /// item invalid-value policy of a list cell.
    pub(crate) fn item_policy(&self, list: CellId) -> (Kind, Attrs, bool) {
        let (owner, prop) = {
            let c = self.cell(list);
            (c.owner, c.prop)
        };
        let schema = self.schema(owner);
        let def = schema.def(prop);
        let kind = match def.kind().item_kind() {
            Some(k) => k,
            None => panic!(
                "{} is not a list property",
                schema.prop_name(prop)
            ),
        };
        let attrs = def.item_attrs().cloned().unwrap_or_default();
        (kind, attrs, def.item_allows_invalid())
    }

    /// Rebuilds the list cell's stored `Value::List` from its item
    /// cells.
    fn refresh_list_value(&mut self, list: CellId) {
        let value = Value::List(
            self.cell(list)
                .items
                .iter()
                .map(|&item| self.cell(item).value.clone())
                .collect(),
        );
        self.cell_mut(list).value = value;
    }

    pub(crate) fn revalidate_list_valid(&mut self, list: CellId) {
        let (owner, prop) = {
            let c = self.cell(list);
            (c.owner, c.prop)
        };
        let schema = alloc::rc::Rc::clone(self.schema(owner));
        let def = schema.def(prop);
        let valid = {
            let c = self.cell(list);
            def.validate_value(self, owner, &c.attrs, &c.value).is_ok()
        };
        // Per-item constraints live on the item cells, invisible to the
        // list-level validate, so their verdicts are folded in here.
        let items_valid = {
            let c = self.cell(list);
            c.items.iter().all(|&item| self.cell(item).valid)
        };
        self.cell_mut(list).valid = valid && items_valid;
    }

    /// Installs a new item arrangement, refreshes the stored value, and
    /// notifies the list once.
    pub(crate) fn commit_items(&mut self, list: CellId, items: Vec<CellId>) {
        self.cell_mut(list).items = items;
        self.refresh_list_value(list);
        self.revalidate_list_valid(list);
        self.notify_cell(list);
    }

    /// Length constraints block a structural change only when the list
    /// does not allow invalid values; otherwise the change goes through
    /// and the list is simply marked invalid.
    fn prospective_len_error(&self, list: CellId, new_len: usize) -> Result<(), InvalidValue> {
        let (owner, prop) = {
            let c = self.cell(list);
            (c.owner, c.prop)
        };
        if self.schema(owner).def(prop).allows_invalid() {
            return Ok(());
        }
        let attrs = &self.cell(list).attrs;
        if let Some(min) = attrs.length(keys::MINLEN) {
            if new_len < min {
                return Err(InvalidValue::new(format!("must have length at least {min}")));
            }
        }
        if let Some(max) = attrs.length(keys::MAXLEN) {
            if new_len > max {
                return Err(InvalidValue::new(format!("must have length at most {max}")));
            }
        }
        Ok(())
    }

    fn check_prospective_len(&self, list: CellId, new_len: usize) -> Result<(), ListError> {
        self.prospective_len_error(list, new_len)
            .map_err(|e| ListError::Item(PropertyError::Invalid(e)))
    }
}
