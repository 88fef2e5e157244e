// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`World`]: the arena that owns every object, cell, and binding,
//! and the call queue their notifications drain through.
//!
//! All mutation flows through the world. A write casts and validates
//! the incoming value, stores it, and enqueues one task per enabled
//! listener plus a sibling-revalidation task; the queue then drains in
//! FIFO order. Listeners receive `&mut World`, so they can trigger
//! further writes; those enqueue behind the tasks already pending and
//! run in the same drain, never re-entrantly.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use tether_queue::CallQueue;

use crate::attrs::AttrValue;
use crate::cell::{AttrEvent, Cell, ChangeEvent};
use crate::error::{InvalidValue, ListenerError, PropertyError};
use crate::id::{CellId, ObjectId, PropId};
use crate::schema::Schema;
use crate::sync::BindRecord;
use crate::value::Value;

/// A queued notification: a one-shot closure run with the world.
pub(crate) type Invocation = Box<dyn FnOnce(&mut World) -> Result<(), ListenerError>>;

pub(crate) struct ObjectData {
    pub(crate) schema: Rc<Schema>,
    /// One cell per schema property, in declaration order.
    pub(crate) cells: Vec<CellId>,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: Vec<ObjectId>,
    /// Properties that may never be synchronised to the parent.
    pub(crate) nobind: Vec<PropId>,
    /// Properties that may never be unsynchronised from the parent.
    pub(crate) nounbind: Vec<PropId>,
}

/// Owns all property state and dispatches all notifications.
pub struct World {
    objects: Vec<Option<ObjectData>>,
    /// Per-slot generation, bumped when the slot is freed. An id whose
    /// generation does not match its slot's is stale, even if the slot
    /// has since been reused.
    object_generations: Vec<u32>,
    free_objects: Vec<u32>,
    cells: Vec<Option<Cell>>,
    cell_generations: Vec<u32>,
    free_cells: Vec<u32>,
    pub(crate) queue: CallQueue<Invocation>,
    pub(crate) bindings: Vec<BindRecord>,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            object_generations: Vec::new(),
            free_objects: Vec::new(),
            cells: Vec::new(),
            cell_generations: Vec::new(),
            free_cells: Vec::new(),
            queue: CallQueue::new(),
            bindings: Vec::new(),
        }
    }

    /// Creates a world whose queue drops a notification when one with
    /// the same name is already pending.
    #[must_use]
    pub fn with_skip_duplicates() -> Self {
        Self {
            queue: CallQueue::with_skip_duplicates(),
            ..Self::new()
        }
    }

    // ---- objects ---------------------------------------------------

    /// Instantiates an object of the given schema. Every property cell
    /// starts at its declared default and is valid.
    pub fn create(&mut self, schema: Rc<Schema>) -> ObjectId {
        let object = self.alloc_object();
        let mut cells = Vec::with_capacity(schema.len());
        for (prop, _, def) in schema.iter() {
            let value = def.initial_value();
            let id = self.alloc_cell(Cell::new(object, prop, value.clone(), def.attrs().clone()));
            if def.kind().is_list_like() {
                if let (Some(item_attrs), Value::List(items)) = (def.item_attrs(), value) {
                    let item_attrs = item_attrs.clone();
                    let mut ids = Vec::with_capacity(items.len());
                    for item in items {
                        let mut c = Cell::new(object, prop, item, item_attrs.clone());
                        c.parent = Some(id);
                        ids.push(self.alloc_cell(c));
                    }
                    self.cell_mut(id).items = ids;
                }
            }
            cells.push(id);
        }
        let slot = usize::try_from(object.index()).unwrap_or(usize::MAX);
        self.objects[slot] = Some(ObjectData {
            schema,
            cells,
            parent: None,
            children: Vec::new(),
            nobind: Vec::new(),
            nounbind: Vec::new(),
        });
        object
    }

    /// Destroys an object: its children are detached, every binding it
    /// participates in is silently dissolved, and its cells are freed.
    ///
    /// # Panics
    ///
    /// Panics if `object` is stale.
    pub fn destroy(&mut self, object: ObjectId) {
        let children = self.data(object).children.clone();
        for child in children {
            self.detach_from_parent(child);
        }
        if self.data(object).parent.is_some() {
            self.detach_from_parent(object);
        }
        self.dissolve_bindings_for(object);
        let cells = self.data(object).cells.clone();
        for cell in cells {
            let items = self.cell(cell).items.clone();
            for item in items {
                self.free_cell(item);
            }
            self.free_cell(cell);
        }
        let slot = usize::try_from(object.index()).unwrap_or(usize::MAX);
        self.objects[slot] = None;
        self.object_generations[slot] += 1;
        self.free_objects.push(object.index());
    }

    /// Returns `true` if `object` refers to a live object.
    #[must_use]
    pub fn is_alive(&self, object: ObjectId) -> bool {
        self.object_slot(object)
            .and_then(|i| self.objects.get(i))
            .is_some_and(Option::is_some)
    }

    /// The schema `object` was instantiated from.
    ///
    /// # Panics
    ///
    /// Panics if `object` is stale.
    #[must_use]
    pub fn schema(&self, object: ObjectId) -> &Rc<Schema> {
        &self.data(object).schema
    }

    // ---- reads -----------------------------------------------------

    /// The cell backing the named property.
    ///
    /// # Panics
    ///
    /// Panics if `object` is stale or the schema declares no such
    /// property.
    #[must_use]
    pub fn property_cell(&self, object: ObjectId, name: &str) -> CellId {
        let data = self.data(object);
        match data.schema.prop_id(name) {
            Some(prop) => data.cells[usize::from(prop.index())],
            None => panic!("schema {} has no property {name}", data.schema.name()),
        }
    }

    /// The current value of the named property.
    ///
    /// # Panics
    ///
    /// Panics if `object` is stale or the property does not exist.
    #[must_use]
    pub fn get(&self, object: ObjectId, name: &str) -> &Value {
        &self.cell(self.property_cell(object, name)).value
    }

    /// The current value of a cell.
    ///
    /// # Panics
    ///
    /// Panics if `cell` is stale.
    #[must_use]
    pub fn cell_value(&self, cell: CellId) -> &Value {
        &self.cell(cell).value
    }

    /// Whether the named property's current value satisfies its
    /// constraints. This is the stored verdict from the last write or
    /// revalidation, not a fresh check.
    #[must_use]
    pub fn is_valid(&self, object: ObjectId, name: &str) -> bool {
        self.cell(self.property_cell(object, name)).valid
    }

    /// Re-checks every property of `object` against its constraints,
    /// without touching any stored state. Returns the failures.
    #[must_use]
    pub fn validate_all(&self, object: ObjectId) -> Vec<(String, InvalidValue)> {
        let data = self.data(object);
        let mut errors = Vec::new();
        for (prop, name, def) in data.schema.iter() {
            let cell = self.cell(data.cells[usize::from(prop.index())]);
            if let Err(e) = def.validate_value(self, object, &cell.attrs, &cell.value) {
                errors.push((name.to_string(), e));
            }
        }
        errors
    }

    // ---- writes ----------------------------------------------------

    /// Writes the named property.
    ///
    /// The value is cast to the property's kind, validated, stored, and
    /// notified, in that order. A cast failure always propagates and
    /// leaves the property untouched; a validation failure propagates
    /// only when the property does not allow invalid values.
    ///
    /// # Panics
    ///
    /// Panics if `object` is stale or the property does not exist.
    pub fn set(
        &mut self,
        object: ObjectId,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), PropertyError> {
        let cell = self.property_cell(object, name);
        self.set_cell(cell, value)
    }

    /// Writes a cell directly. For list cells this is a whole-value
    /// write with the structural semantics described on
    /// [`World::set_list`](Self::set_list).
    ///
    /// # Panics
    ///
    /// Panics if `cell` is stale.
    pub fn set_cell(&mut self, cell: CellId, value: impl Into<Value>) -> Result<(), PropertyError> {
        let value = value.into();
        let (owner, prop, parent) = {
            let c = self.cell(cell);
            (c.owner, c.prop, c.parent)
        };
        let schema = Rc::clone(self.schema(owner));
        let def = schema.def(prop);
        if parent.is_none() && def.kind().is_list_like() {
            return self.write_list_cell(cell, value);
        }
        let (kind, allow_invalid) = match (parent, def.kind().item_kind()) {
            (Some(_), Some(item)) => (item, def.item_allows_invalid()),
            _ => (def.kind().clone(), def.allows_invalid()),
        };
        let cast = {
            let c = self.cell(cell);
            kind.cast(&c.attrs, value)?
        };
        let validity = {
            let c = self.cell(cell);
            if parent.is_some() {
                kind.validate(&c.attrs, &cast).err()
            } else {
                def.validate_value(self, owner, &c.attrs, &cast).err()
            }
        };
        let valid = validity.is_none();
        if let Some(err) = validity {
            if !allow_invalid {
                return Err(err.into());
            }
        }
        let (changed, validity_changed) = {
            let c = self.cell(cell);
            (!def.values_equal(&c.value, &cast), c.valid != valid)
        };
        if !changed && !validity_changed {
            return Ok(());
        }
        {
            let c = self.cell_mut(cell);
            c.value = cast.clone();
            c.valid = valid;
        }
        if let Some(list) = parent {
            if let Some(index) = self.item_index(list, cell) {
                if let Value::List(items) = &mut self.cell_mut(list).value {
                    items[index] = cast;
                }
            }
            self.revalidate_list_valid(list);
        }
        self.notify_cell(cell);
        if let Some(list) = parent {
            self.notify_cell(list);
        }
        Ok(())
    }

    /// Re-runs validation on the named property. If the verdict flipped
    /// since the last write (a constraint changed underneath the
    /// value), listeners are notified even though the value itself is
    /// unchanged.
    pub fn revalidate(&mut self, object: ObjectId, name: &str) {
        let cell = self.property_cell(object, name);
        self.revalidate_cell(cell);
    }

    pub(crate) fn revalidate_cell(&mut self, cell: CellId) {
        let (owner, prop, parent) = {
            let c = self.cell(cell);
            (c.owner, c.prop, c.parent)
        };
        let schema = Rc::clone(self.schema(owner));
        let def = schema.def(prop);
        let valid = {
            let c = self.cell(cell);
            match (parent, def.kind().item_kind()) {
                (Some(_), Some(item)) => item.validate(&c.attrs, &c.value).is_ok(),
                _ => def.validate_value(self, owner, &c.attrs, &c.value).is_ok(),
            }
        };
        if self.cell(cell).valid != valid {
            self.cell_mut(cell).valid = valid;
            // An item's verdict feeds the owning list's, so the list
            // revalidates and notifies alongside the item.
            if let Some(list) = parent {
                self.revalidate_list_valid(list);
            }
            self.notify_cell(cell);
            if let Some(list) = parent {
                self.notify_cell(list);
            }
        }
    }

    pub(crate) fn revalidate_siblings(&mut self, object: ObjectId, except: PropId) {
        if !self.is_alive(object) {
            return;
        }
        let cells = self.data(object).cells.clone();
        for (i, cell) in cells.into_iter().enumerate() {
            if PropId::new(i as u16) != except {
                self.revalidate_cell(cell);
            }
        }
    }

    /// Forces a notification of the named property's listeners, as if
    /// it had just been written.
    pub fn property_notify(&mut self, object: ObjectId, name: &str) {
        let cell = self.property_cell(object, name);
        self.notify_cell(cell);
    }

    // ---- attributes ------------------------------------------------

    /// The named constraint attribute, or `None` if the kind does not
    /// declare it.
    #[must_use]
    pub fn attribute(&self, object: ObjectId, name: &str, attribute: &str) -> Option<&AttrValue> {
        self.cell(self.property_cell(object, name)).attrs.get(attribute)
    }

    /// Changes a constraint attribute. Attribute listeners run
    /// immediately, then the property is revalidated; a constraint
    /// change can flip validity and so notify change listeners too.
    pub fn set_attribute(
        &mut self,
        object: ObjectId,
        name: &str,
        attribute: impl Into<String>,
        value: AttrValue,
    ) {
        let cell = self.property_cell(object, name);
        self.set_cell_attribute(cell, attribute, value);
    }

    /// [`World::set_attribute`](Self::set_attribute), addressed by
    /// cell. Item-cell attribute changes are also reported to the
    /// owning list's attribute listeners.
    pub fn set_cell_attribute(
        &mut self,
        cell: CellId,
        attribute: impl Into<String>,
        value: AttrValue,
    ) {
        let attribute = attribute.into();
        if !self.cell_mut(cell).attrs.set(attribute.clone(), value.clone()) {
            return;
        }
        let (owner, prop, parent) = {
            let c = self.cell(cell);
            (c.owner, c.prop, c.parent)
        };
        let event = AttrEvent {
            object: owner,
            property: prop,
            cell,
            attribute,
            value,
        };
        let mut listeners = self.cell(cell).attr_listener_snapshot();
        if let Some(list) = parent {
            listeners.extend(self.cell(list).attr_listener_snapshot());
        }
        for cb in listeners {
            if let Err(e) = cb(self, &event) {
                log::warn!("attribute listener failed: {e}");
            }
        }
        self.revalidate_cell(cell);
    }

    /// Registers an attribute listener. An existing listener with the
    /// same name is overwritten.
    pub fn add_attribute_listener(
        &mut self,
        object: ObjectId,
        property: &str,
        name: impl Into<String>,
        listener: impl Fn(&mut World, &AttrEvent) -> Result<(), ListenerError> + 'static,
    ) {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).set_attr_listener(name, Rc::new(listener));
    }

    /// Removes an attribute listener, returning `false` if it did not
    /// exist.
    pub fn remove_attribute_listener(
        &mut self,
        object: ObjectId,
        property: &str,
        name: &str,
    ) -> bool {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).remove_attr_listener(name)
    }

    // ---- change listeners ------------------------------------------

    /// Registers a change listener on the named property.
    ///
    /// # Panics
    ///
    /// Panics if a listener with this name is already registered there;
    /// use [`World::replace_listener`](Self::replace_listener) to
    /// overwrite.
    pub fn add_listener(
        &mut self,
        object: ObjectId,
        property: &str,
        name: impl Into<String>,
        listener: impl Fn(&mut World, &ChangeEvent) -> Result<(), ListenerError> + 'static,
    ) {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).add_listener(name, Rc::new(listener));
    }

    /// Registers or overwrites a change listener, preserving the
    /// enabled state of the listener it replaces.
    pub fn replace_listener(
        &mut self,
        object: ObjectId,
        property: &str,
        name: impl Into<String>,
        listener: impl Fn(&mut World, &ChangeEvent) -> Result<(), ListenerError> + 'static,
    ) {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).replace_listener(name, Rc::new(listener));
    }

    /// Removes a change listener, returning `false` if it did not
    /// exist. Already-enqueued notifications for it still run.
    pub fn remove_listener(&mut self, object: ObjectId, property: &str, name: &str) -> bool {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).remove_listener(name)
    }

    /// Returns `true` if the named change listener is registered.
    #[must_use]
    pub fn has_listener(&self, object: ObjectId, property: &str, name: &str) -> bool {
        self.cell(self.property_cell(object, property)).has_listener(name)
    }

    /// Enables or disables a change listener without removing it.
    /// Returns `false` if no such listener exists.
    pub fn set_listener_enabled(
        &mut self,
        object: ObjectId,
        property: &str,
        name: &str,
        enabled: bool,
    ) -> bool {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).set_listener_enabled(name, enabled)
    }

    /// Whether the named change listener is enabled.
    #[must_use]
    pub fn listener_enabled(&self, object: ObjectId, property: &str, name: &str) -> Option<bool> {
        self.cell(self.property_cell(object, property)).listener_enabled(name)
    }

    /// Installs the hook that runs before the registered listeners of
    /// every notification on the named property. At most one pre-notify
    /// hook exists per cell; installing replaces the previous one.
    pub fn set_pre_notify(
        &mut self,
        object: ObjectId,
        property: &str,
        hook: impl Fn(&mut World, &ChangeEvent) -> Result<(), ListenerError> + 'static,
    ) {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).pre_notify = Some(Rc::new(hook));
    }

    /// Removes the pre-notify hook, if any.
    pub fn clear_pre_notify(&mut self, object: ObjectId, property: &str) {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).pre_notify = None;
    }

    /// Installs the hook that runs after the registered listeners of
    /// every notification on the named property. At most one
    /// post-notify hook exists per cell; installing replaces the
    /// previous one.
    pub fn set_post_notify(
        &mut self,
        object: ObjectId,
        property: &str,
        hook: impl Fn(&mut World, &ChangeEvent) -> Result<(), ListenerError> + 'static,
    ) {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).post_notify = Some(Rc::new(hook));
    }

    /// Removes the post-notify hook, if any.
    pub fn clear_post_notify(&mut self, object: ObjectId, property: &str) {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).post_notify = None;
    }

    /// Registers a change listener directly on a cell, which is how
    /// individual list items are observed.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate listener name, like
    /// [`World::add_listener`](Self::add_listener).
    pub fn add_cell_listener(
        &mut self,
        cell: CellId,
        name: impl Into<String>,
        listener: impl Fn(&mut World, &ChangeEvent) -> Result<(), ListenerError> + 'static,
    ) {
        self.cell_mut(cell).add_listener(name, Rc::new(listener));
    }

    /// Removes a cell-addressed change listener.
    pub fn remove_cell_listener(&mut self, cell: CellId, name: &str) -> bool {
        self.cell_mut(cell).remove_listener(name)
    }

    /// Master switch for a property's notifications. While disabled,
    /// writes still cast, validate, and store, but nothing is enqueued.
    pub fn set_notification_enabled(&mut self, object: ObjectId, property: &str, enabled: bool) {
        let cell = self.property_cell(object, property);
        self.cell_mut(cell).notification_enabled = enabled;
    }

    /// Whether the named property's notifications are enabled.
    #[must_use]
    pub fn notification_enabled(&self, object: ObjectId, property: &str) -> bool {
        self.cell(self.property_cell(object, property)).notification_enabled
    }

    pub(crate) fn set_cell_notification_enabled(&mut self, cell: CellId, enabled: bool) {
        self.cell_mut(cell).notification_enabled = enabled;
    }

    pub(crate) fn cell_notification_enabled(&self, cell: CellId) -> bool {
        self.cell(cell).notification_enabled
    }

    // ---- notification machinery ------------------------------------

    /// Enqueues this cell's notification batch and drains the queue.
    ///
    /// The batch is, in order: the sibling-revalidation task (top-level
    /// cells only), then one task per enabled listener. Enabled-ness is
    /// sampled now, not at execution time, so a listener disabled
    /// around a write stays out of that write's batch even if it is
    /// re-enabled before the queue drains.
    pub(crate) fn notify_cell(&mut self, cell: CellId) {
        let (enabled, owner, prop, parent) = {
            let c = self.cell(cell);
            (c.notification_enabled, c.owner, c.prop, c.parent)
        };
        if !enabled {
            return;
        }
        let schema = Rc::clone(self.schema(owner));
        let prop_name = schema.prop_name(prop).to_string();
        let index = parent.and_then(|list| self.item_index(list, cell));
        let event = {
            let c = self.cell(cell);
            ChangeEvent {
                object: owner,
                property: prop,
                cell,
                index,
                value: c.value.clone(),
                valid: c.valid,
            }
        };
        if parent.is_none() {
            let name = format!("{}.{}.revalidate", schema.name(), prop_name);
            self.queue.enqueue(
                name,
                Box::new(move |world: &mut World| {
                    world.revalidate_siblings(owner, prop);
                    Ok(())
                }),
            );
        }
        if let Some(callback) = self.cell(cell).pre_notify.clone() {
            let name = format!("{}.{}.pre", schema.name(), prop_name);
            let event = event.clone();
            self.queue.enqueue(
                name,
                Box::new(move |world: &mut World| callback(world, &event)),
            );
        }
        for (listener_name, callback) in self.cell(cell).enabled_listeners() {
            let task_name = format!("{}.{}:{}", schema.name(), prop_name, listener_name);
            let event = event.clone();
            self.queue.enqueue(
                task_name,
                Box::new(move |world: &mut World| callback(world, &event)),
            );
        }
        if let Some(callback) = self.cell(cell).post_notify.clone() {
            let name = format!("{}.{}.post", schema.name(), prop_name);
            self.queue.enqueue(
                name,
                Box::new(move |world: &mut World| callback(world, &event)),
            );
        }
        self.flush();
    }

    /// Drains the call queue. A no-op when a drain is already running
    /// further up the stack; the tasks just enqueued will be delivered
    /// by that outer loop, preserving FIFO order.
    pub(crate) fn flush(&mut self) {
        if !self.queue.try_begin_drain() {
            return;
        }
        loop {
            let Some(task) = self.queue.pop_task() else {
                break;
            };
            if let Err(e) = (task.payload)(self) {
                log::warn!("listener task {} failed: {e}", task.name);
            }
        }
        self.queue.finish_drain();
    }

    // ---- internals -------------------------------------------------

    /// The slot behind `object`, or `None` when the id's generation no
    /// longer matches the slot's.
    fn object_slot(&self, object: ObjectId) -> Option<usize> {
        let i = usize::try_from(object.index()).ok()?;
        (self.object_generations.get(i) == Some(&object.generation())).then_some(i)
    }

    fn cell_slot(&self, cell: CellId) -> Option<usize> {
        let i = usize::try_from(cell.index()).ok()?;
        (self.cell_generations.get(i) == Some(&cell.generation())).then_some(i)
    }

    pub(crate) fn data(&self, object: ObjectId) -> &ObjectData {
        let slot = self.object_slot(object);
        match slot.and_then(|i| self.objects.get(i)).and_then(Option::as_ref) {
            Some(data) => data,
            None => panic!("stale {object}"),
        }
    }

    pub(crate) fn data_mut(&mut self, object: ObjectId) -> &mut ObjectData {
        let slot = self.object_slot(object);
        match slot
            .and_then(|i| self.objects.get_mut(i))
            .and_then(Option::as_mut)
        {
            Some(data) => data,
            None => panic!("stale {object}"),
        }
    }

    pub(crate) fn cell(&self, cell: CellId) -> &Cell {
        let slot = self.cell_slot(cell);
        match slot.and_then(|i| self.cells.get(i)).and_then(Option::as_ref) {
            Some(c) => c,
            None => panic!("stale {cell}"),
        }
    }

    pub(crate) fn cell_mut(&mut self, cell: CellId) -> &mut Cell {
        let slot = self.cell_slot(cell);
        match slot
            .and_then(|i| self.cells.get_mut(i))
            .and_then(Option::as_mut)
        {
            Some(c) => c,
            None => panic!("stale {cell}"),
        }
    }

    /// Returns `true` if `cell` refers to a live cell.
    #[must_use]
    pub fn cell_is_alive(&self, cell: CellId) -> bool {
        self.cell_slot(cell)
            .and_then(|i| self.cells.get(i))
            .is_some_and(Option::is_some)
    }

    pub(crate) fn item_index(&self, list: CellId, item: CellId) -> Option<usize> {
        self.cell(list).items.iter().position(|&c| c == item)
    }

    pub(crate) fn alloc_cell(&mut self, cell: Cell) -> CellId {
        if let Some(index) = self.free_cells.pop() {
            let id = CellId::new(index, self.cell_generations[index as usize]);
            self.cells[index as usize] = Some(cell);
            id
        } else {
            let id = CellId::new(self.cells.len() as u32, 0);
            self.cells.push(Some(cell));
            self.cell_generations.push(0);
            id
        }
    }

    pub(crate) fn free_cell(&mut self, cell: CellId) {
        if self.cell_is_alive(cell) {
            let slot = cell.index() as usize;
            self.cells[slot] = None;
            self.cell_generations[slot] += 1;
            self.free_cells.push(cell.index());
        }
    }

    fn alloc_object(&mut self) -> ObjectId {
        if let Some(index) = self.free_objects.pop() {
            ObjectId::new(index, self.object_generations[index as usize])
        } else {
            let id = ObjectId::new(self.objects.len() as u32, 0);
            self.objects.push(None);
            self.object_generations.push(0);
            id
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for World {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("World")
            .field("objects", &(self.objects.len() - self.free_objects.len()))
            .field("cells", &(self.cells.len() - self.free_cells.len()))
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::keys;
    use crate::kind::Kind;
    use crate::schema::{PropertyDef, Required, SchemaBuilder};
    use alloc::vec;
    use core::cell::RefCell;

    fn number_schema() -> Rc<Schema> {
        SchemaBuilder::new("thing")
            .property(
                "count",
                PropertyDef::new(Kind::Int).range(10.0, 50.0).clamped(true),
            )
            .property("label", PropertyDef::new(Kind::Str))
            .build()
    }

    #[test]
    fn defaults_and_reads() {
        let mut world = World::new();
        let t = world.create(number_schema());
        assert_eq!(world.get(t, "count"), &Value::Int(10));
        assert_eq!(world.get(t, "label"), &Value::Nothing);
        assert!(world.is_valid(t, "count"));
    }

    #[test]
    fn clamped_write() {
        let mut world = World::new();
        let t = world.create(number_schema());
        world.set(t, "count", 5_i64).unwrap();
        assert_eq!(world.get(t, "count"), &Value::Int(10));
        world.set(t, "count", 55_i64).unwrap();
        assert_eq!(world.get(t, "count"), &Value::Int(50));
        world.set(t, "count", 30_i64).unwrap();
        assert_eq!(world.get(t, "count"), &Value::Int(30));
        assert!(world.is_valid(t, "count"));
    }

    #[test]
    #[should_panic(expected = "has no property missing")]
    fn unknown_property_panics() {
        let mut world = World::new();
        let t = world.create(number_schema());
        let _ = world.get(t, "missing");
    }

    #[test]
    fn listener_fires_once_per_change() {
        let mut world = World::new();
        let t = world.create(number_schema());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        world.add_listener(t, "count", "watch", move |_, event| {
            log.borrow_mut().push(event.value.clone());
            Ok(())
        });
        world.set(t, "count", 20_i64).unwrap();
        world.set(t, "count", 20_i64).unwrap();
        world.set(t, "count", 25_i64).unwrap();
        assert_eq!(*seen.borrow(), vec![Value::Int(20), Value::Int(25)]);
    }

    #[test]
    fn listener_writes_run_in_same_drain() {
        let mut world = World::new();
        let t = world.create(number_schema());
        world.add_listener(t, "count", "mirror", move |world, event| {
            let text = format!("{}", event.value);
            world.set(event.object, "label", text.as_str())?;
            Ok(())
        });
        world.set(t, "count", 33_i64).unwrap();
        assert_eq!(world.get(t, "label"), &Value::from("33"));
    }

    #[test]
    fn disabled_listener_is_skipped() {
        let mut world = World::new();
        let t = world.create(number_schema());
        let count = Rc::new(RefCell::new(0usize));
        let c = Rc::clone(&count);
        world.add_listener(t, "count", "watch", move |_, _| {
            *c.borrow_mut() += 1;
            Ok(())
        });
        world.set(t, "count", 20_i64).unwrap();
        world.set_listener_enabled(t, "count", "watch", false);
        world.set(t, "count", 30_i64).unwrap();
        world.set_listener_enabled(t, "count", "watch", true);
        world.set(t, "count", 40_i64).unwrap();
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn disabled_notification_suppresses_everything() {
        let mut world = World::new();
        let t = world.create(number_schema());
        let count = Rc::new(RefCell::new(0usize));
        let c = Rc::clone(&count);
        world.add_listener(t, "count", "watch", move |_, _| {
            *c.borrow_mut() += 1;
            Ok(())
        });
        world.set_notification_enabled(t, "count", false);
        world.set(t, "count", 20_i64).unwrap();
        assert_eq!(*count.borrow(), 0);
        // The write itself still happened.
        assert_eq!(world.get(t, "count"), &Value::Int(20));
    }

    #[test]
    fn constraint_change_revalidates_and_notifies() {
        let mut world = World::new();
        let schema = SchemaBuilder::new("s")
            .property("n", PropertyDef::new(Kind::Int))
            .build();
        let t = world.create(schema);
        world.set(t, "n", 30_i64).unwrap();
        assert!(world.is_valid(t, "n"));

        let flips = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&flips);
        world.add_listener(t, "n", "watch", move |_, event| {
            log.borrow_mut().push(event.valid);
            Ok(())
        });
        world.set_attribute(t, "n", keys::MAXVAL, AttrValue::Real(20.0));
        assert!(!world.is_valid(t, "n"));
        assert_eq!(*flips.borrow(), vec![false]);
    }

    #[test]
    fn attribute_listener_runs_immediately() {
        let mut world = World::new();
        let t = world.create(number_schema());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        world.add_attribute_listener(t, "count", "watch", move |_, event| {
            log.borrow_mut().push(event.attribute.clone());
            Ok(())
        });
        world.set_attribute(t, "count", keys::MAXVAL, AttrValue::Real(60.0));
        // Unchanged attribute writes are silent.
        world.set_attribute(t, "count", keys::MAXVAL, AttrValue::Real(60.0));
        assert_eq!(*seen.borrow(), vec![keys::MAXVAL.to_string()]);
    }

    #[test]
    fn invalid_write_stored_when_allowed() {
        let mut world = World::new();
        let schema = SchemaBuilder::new("s")
            .property(
                "n",
                PropertyDef::new(Kind::Int).with_attr(keys::MAXVAL, AttrValue::Real(10.0)),
            )
            .build();
        let t = world.create(schema);
        world.set(t, "n", 99_i64).unwrap();
        assert_eq!(world.get(t, "n"), &Value::Int(99));
        assert!(!world.is_valid(t, "n"));
    }

    #[test]
    fn invalid_write_rejected_when_not_allowed() {
        let mut world = World::new();
        let schema = SchemaBuilder::new("s")
            .property(
                "n",
                PropertyDef::new(Kind::Int)
                    .with_attr(keys::MAXVAL, AttrValue::Real(10.0))
                    .allow_invalid(false),
            )
            .build();
        let t = world.create(schema);
        assert!(world.set(t, "n", 99_i64).is_err());
        assert_eq!(world.get(t, "n"), &Value::Int(0));
        assert!(world.is_valid(t, "n"));
    }

    #[test]
    fn cast_failure_always_propagates() {
        let mut world = World::new();
        let t = world.create(number_schema());
        assert!(matches!(
            world.set(t, "count", "not a number"),
            Err(PropertyError::Cast(_))
        ));
        assert_eq!(world.get(t, "count"), &Value::Int(10));
    }

    #[test]
    fn required_rejects_nothing() {
        let mut world = World::new();
        let schema = SchemaBuilder::new("s")
            .property(
                "label",
                PropertyDef::new(Kind::Str)
                    .with_default("x")
                    .required(Required::Always)
                    .allow_invalid(false),
            )
            .build();
        let t = world.create(schema);
        assert!(world.set(t, "label", "").is_err());
        assert_eq!(world.get(t, "label"), &Value::from("x"));
    }

    #[test]
    fn sibling_revalidation_cascade() {
        // "high" must be >= "low"; raising "low" invalidates "high".
        let mut world = World::new();
        let schema = SchemaBuilder::new("range")
            .property("low", PropertyDef::new(Kind::Int))
            .property(
                "high",
                PropertyDef::new(Kind::Int).with_validator(|world, object, _, value| {
                    let low = world.get(object, "low").as_int().unwrap_or(0);
                    match value.as_int() {
                        Some(v) if v < low => {
                            Err(InvalidValue::new("must not be below low"))
                        }
                        _ => Ok(()),
                    }
                }),
            )
            .build();
        let t = world.create(schema);
        world.set(t, "high", 5_i64).unwrap();
        assert!(world.is_valid(t, "high"));
        world.set(t, "low", 10_i64).unwrap();
        assert!(!world.is_valid(t, "high"));
        world.set(t, "low", 0_i64).unwrap();
        assert!(world.is_valid(t, "high"));
    }

    #[test]
    fn validate_all_reports_failures() {
        let mut world = World::new();
        let schema = SchemaBuilder::new("s")
            .property(
                "n",
                PropertyDef::new(Kind::Int).with_attr(keys::MAXVAL, AttrValue::Real(10.0)),
            )
            .property("ok", PropertyDef::new(Kind::Bool))
            .build();
        let t = world.create(schema);
        world.set(t, "n", 99_i64).unwrap();
        let errors = world.validate_all(t);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "n");
    }

    #[test]
    fn destroy_frees_and_invalidates() {
        let mut world = World::new();
        let t = world.create(number_schema());
        let cell = world.property_cell(t, "count");
        world.destroy(t);
        assert!(!world.is_alive(t));
        assert!(!world.cell_is_alive(cell));
    }

    #[test]
    fn stale_ids_do_not_alias_reused_slots() {
        let mut world = World::new();
        let t = world.create(number_schema());
        let cell = world.property_cell(t, "count");
        world.destroy(t);
        // The replacement reuses the freed slots but gets fresh ids.
        let replacement = world.create(number_schema());
        assert_eq!(replacement.index(), t.index());
        assert_ne!(replacement, t);
        assert!(world.is_alive(replacement));
        assert!(!world.is_alive(t));
        assert!(!world.cell_is_alive(cell));
        assert_ne!(world.property_cell(replacement, "count"), cell);
    }

    #[test]
    fn listener_error_is_isolated() {
        let mut world = World::new();
        let t = world.create(number_schema());
        let seen = Rc::new(RefCell::new(0usize));
        world.add_listener(t, "count", "broken", |_, _| {
            Err(ListenerError::new("boom"))
        });
        let c = Rc::clone(&seen);
        world.add_listener(t, "count", "working", move |_, _| {
            *c.borrow_mut() += 1;
            Ok(())
        });
        world.set(t, "count", 20_i64).unwrap();
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn removed_listener_no_longer_fires() {
        let mut world = World::new();
        let t = world.create(number_schema());
        let count = Rc::new(RefCell::new(0usize));
        let c = Rc::clone(&count);
        world.add_listener(t, "count", "watch", move |_, _| {
            *c.borrow_mut() += 1;
            Ok(())
        });
        world.set(t, "count", 20_i64).unwrap();
        assert!(world.remove_listener(t, "count", "watch"));
        world.set(t, "count", 30_i64).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn pre_and_post_hooks_bracket_listeners() {
        let mut world = World::new();
        let t = world.create(number_schema());
        let order = Rc::new(RefCell::new(Vec::new()));
        let o = Rc::clone(&order);
        world.set_pre_notify(t, "count", move |_, _| {
            o.borrow_mut().push("pre");
            Ok(())
        });
        let o = Rc::clone(&order);
        world.add_listener(t, "count", "watch", move |_, _| {
            o.borrow_mut().push("listener");
            Ok(())
        });
        let o = Rc::clone(&order);
        world.set_post_notify(t, "count", move |_, _| {
            o.borrow_mut().push("post");
            Ok(())
        });
        world.set(t, "count", 20_i64).unwrap();
        assert_eq!(*order.borrow(), ["pre", "listener", "post"]);

        world.clear_pre_notify(t, "count");
        world.clear_post_notify(t, "count");
        order.borrow_mut().clear();
        world.set(t, "count", 30_i64).unwrap();
        assert_eq!(*order.borrow(), ["listener"]);
    }
}
