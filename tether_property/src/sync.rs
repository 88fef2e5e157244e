// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property binding and parent/child synchronisation.
//!
//! [`World::bind`] couples two properties of the same kind so that a
//! write to either is replicated to the other, values and constraint
//! attributes both. Replication listeners suppress their own echo by
//! disabling the reverse listener for the duration of the push; since a
//! notification snapshots the enabled listeners at enqueue time, the
//! reverse listener stays out of that batch even though the push itself
//! runs from the queue.
//!
//! Bound lists additionally replicate structure. Items are matched by
//! cell identity, so in-place writes and reorders move values and
//! positions across without recreating the peer's item cells; only an
//! item that genuinely appears or disappears is created or removed on
//! the other side.
//!
//! On top of binding sits the parent/child layer: a child object of a
//! syncable schema starts with every property bound to its parent, and
//! each property's coupling can be released and re-established at
//! runtime, tracked by its `_sync_` shadow.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::cell::{Cell, ChangeEvent};
use crate::error::{ListenerError, PropertyError};
use crate::id::{CellId, ObjectId, PropId};
use crate::schema::sync_property_name;
use crate::value::Value;
use crate::world::World;

/// One live coupling between two property cells.
pub(crate) struct BindRecord {
    pub(crate) a: CellId,
    pub(crate) b: CellId,
    /// Item-cell pairs `(a_item, b_item)`, in the list order as of the
    /// last structural synchronisation. Empty for scalar bindings.
    pub(crate) items: Vec<(CellId, CellId)>,
}

/// Per-property sync policy for a child object.
#[derive(Clone, Debug)]
pub struct SyncOptions {
    /// Properties that may never be synchronised to the parent. They
    /// start unsynchronised.
    pub nobind: Vec<String>,
    /// Properties that may never be released from the parent.
    pub nounbind: Vec<String>,
    /// Initial synchronisation state, `true` by default. When `false`,
    /// every property that is neither `nobind` nor `nounbind` starts
    /// unsynchronised and can be synchronised later.
    pub start_synced: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            nobind: Vec::new(),
            nounbind: Vec::new(),
            start_synced: true,
        }
    }
}

fn bind_name(from: CellId, to: CellId) -> String {
    format!("bind_{}_{}", from.index(), to.index())
}

fn bind_att_name(from: CellId, to: CellId) -> String {
    format!("bind_att_{}_{}", from.index(), to.index())
}

fn bind_list_name(from: CellId, to: CellId) -> String {
    format!("bind_list_{}_{}", from.index(), to.index())
}

impl World {
    // ---- binding ---------------------------------------------------

    /// Couples two properties bidirectionally. The first property takes
    /// the second's constraint attributes and value, then writes to
    /// either side replicate to the other until
    /// [`World::unbind`](Self::unbind).
    ///
    /// Binding an already-bound pair is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the two properties are of different kinds, or if
    /// either object or property does not exist.
    pub fn bind(
        &mut self,
        object: ObjectId,
        name: &str,
        other: ObjectId,
        other_name: &str,
    ) -> Result<(), PropertyError> {
        let a = self.property_cell(object, name);
        let b = self.property_cell(other, other_name);
        self.bind_cells(a, b)
    }

    pub(crate) fn bind_cells(&mut self, a: CellId, b: CellId) -> Result<(), PropertyError> {
        if self.find_binding(a, b).is_some() {
            return Ok(());
        }
        let (a_kind, b_kind, list_like) = {
            let ac = self.cell(a);
            let bc = self.cell(b);
            let a_def = self.schema(ac.owner).def(ac.prop).kind().clone();
            let b_def = self.schema(bc.owner).def(bc.prop).kind().clone();
            let list_like = a_def.is_list_like();
            (a_def, b_def, list_like)
        };
        assert!(
            a_kind == b_kind,
            "cannot bind properties of different kinds ({a_kind:?} and {b_kind:?})"
        );
        // The first side adopts the second's attributes, then its
        // value. Replication listeners are not installed yet, so
        // nothing echoes while the two sides converge.
        let attrs: Vec<_> = self
            .cell(b)
            .attrs
            .iter()
            .map(|(n, v)| (String::from(n), v.clone()))
            .collect();
        for (attr, value) in attrs {
            self.set_cell_attribute(a, attr, value);
        }
        let value = self.cell(b).value.clone();
        self.set_cell(a, value)?;

        let mut items = Vec::new();
        if list_like {
            let a_items = self.cell(a).items.clone();
            let b_items = self.cell(b).items.clone();
            for (&ai, &bi) in a_items.iter().zip(&b_items) {
                self.bind_item_pair(ai, bi);
                items.push((ai, bi));
            }
            self.add_cell_listener(a, bind_list_name(a, b), move |world, event| {
                world.sync_bound_list(event.cell, b)
            });
            self.add_cell_listener(b, bind_list_name(b, a), move |world, event| {
                world.sync_bound_list(event.cell, a)
            });
        } else {
            self.add_cell_listener(a, bind_name(a, b), push_listener(a, b));
            self.add_cell_listener(b, bind_name(b, a), push_listener(b, a));
        }
        self.install_attr_mirror(a, b);
        self.install_attr_mirror(b, a);
        self.bindings.push(BindRecord { a, b, items });
        Ok(())
    }

    /// Releases a coupling established by [`World::bind`](Self::bind).
    /// A pair that is not bound is left alone.
    pub fn unbind(&mut self, object: ObjectId, name: &str, other: ObjectId, other_name: &str) {
        let a = self.property_cell(object, name);
        let b = self.property_cell(other, other_name);
        self.unbind_cells(a, b);
    }

    pub(crate) fn unbind_cells(&mut self, a: CellId, b: CellId) {
        let Some(index) = self.find_binding(a, b) else {
            return;
        };
        let record = self.bindings.swap_remove(index);
        self.remove_pair_listeners(record.a, record.b);
        for (ai, bi) in record.items {
            self.unbind_item_pair(ai, bi);
        }
    }

    /// Whether the two properties are currently bound to each other.
    #[must_use]
    pub fn is_bound(&self, object: ObjectId, name: &str, other: ObjectId, other_name: &str) -> bool {
        let a = self.property_cell(object, name);
        let b = self.property_cell(other, other_name);
        self.find_binding(a, b).is_some()
    }

    fn find_binding(&self, a: CellId, b: CellId) -> Option<usize> {
        self.bindings
            .iter()
            .position(|r| (r.a == a && r.b == b) || (r.a == b && r.b == a))
    }

    fn bind_item_pair(&mut self, a: CellId, b: CellId) {
        self.add_cell_listener(a, bind_name(a, b), push_listener(a, b));
        self.add_cell_listener(b, bind_name(b, a), push_listener(b, a));
        self.install_attr_mirror(a, b);
        self.install_attr_mirror(b, a);
    }

    fn unbind_item_pair(&mut self, a: CellId, b: CellId) {
        if self.cell_is_alive(a) {
            self.cell_mut(a).remove_listener(&bind_name(a, b));
            self.cell_mut(a).remove_attr_listener(&bind_att_name(a, b));
        }
        if self.cell_is_alive(b) {
            self.cell_mut(b).remove_listener(&bind_name(b, a));
            self.cell_mut(b).remove_attr_listener(&bind_att_name(b, a));
        }
    }

    fn remove_pair_listeners(&mut self, a: CellId, b: CellId) {
        if self.cell_is_alive(a) {
            self.cell_mut(a).remove_listener(&bind_name(a, b));
            self.cell_mut(a).remove_listener(&bind_list_name(a, b));
            self.cell_mut(a).remove_attr_listener(&bind_att_name(a, b));
        }
        if self.cell_is_alive(b) {
            self.cell_mut(b).remove_listener(&bind_name(b, a));
            self.cell_mut(b).remove_listener(&bind_list_name(b, a));
            self.cell_mut(b).remove_attr_listener(&bind_att_name(b, a));
        }
    }

    fn install_attr_mirror(&mut self, from: CellId, to: CellId) {
        self.cell_mut(from).set_attr_listener(
            bind_att_name(from, to),
            Rc::new(move |world: &mut World, event| {
                // Item attribute changes are forwarded to the list's
                // attribute listeners too; only mirror our own.
                if event.cell != from || !world.cell_is_alive(to) {
                    return Ok(());
                }
                world.set_cell_attribute(to, event.attribute.clone(), event.value.clone());
                Ok(())
            }),
        );
    }

    /// Re-establishes the slave list's structure from the master's,
    /// matching items by cell identity. A notification whose item set
    /// and order are unchanged (an in-place item write) is structural
    /// noise and synchronises nothing; item values travel through the
    /// per-item bindings.
    pub(crate) fn sync_bound_list(
        &mut self,
        master: CellId,
        slave: CellId,
    ) -> Result<(), ListenerError> {
        if !self.cell_is_alive(master) || !self.cell_is_alive(slave) {
            return Ok(());
        }
        let Some(index) = self.find_binding(master, slave) else {
            return Ok(());
        };
        // Orient the stored pairs as (master_item, slave_item).
        let oriented: Vec<(CellId, CellId)> = {
            let record = &self.bindings[index];
            if record.a == master {
                record.items.clone()
            } else {
                record.items.iter().map(|&(a, b)| (b, a)).collect()
            }
        };
        let master_items = self.cell(master).items.clone();
        let mapped: Vec<CellId> = oriented.iter().map(|&(m, _)| m).collect();
        if master_items == mapped {
            return Ok(());
        }

        let (kind, default_attrs, _) = self.item_policy(slave);
        let (slave_owner, slave_prop) = {
            let c = self.cell(slave);
            (c.owner, c.prop)
        };
        let mut new_items = Vec::with_capacity(master_items.len());
        let mut new_pairs = Vec::with_capacity(master_items.len());
        let mut fresh = Vec::new();
        for &m in &master_items {
            match oriented.iter().find(|&&(mm, _)| mm == m) {
                Some(&(_, s)) if self.cell_is_alive(s) => {
                    new_items.push(s);
                    new_pairs.push((m, s));
                }
                _ => {
                    let value = self.cell(m).value.clone();
                    let cast = kind.cast(&default_attrs, value).map_err(|e| {
                        ListenerError::new(format!("cannot replicate list item: {e}"))
                    })?;
                    let valid = kind.validate(&default_attrs, &cast).is_ok();
                    let mut cell = Cell::new(slave_owner, slave_prop, cast, default_attrs.clone());
                    cell.valid = valid;
                    cell.parent = Some(slave);
                    let s = self.alloc_cell(cell);
                    new_items.push(s);
                    new_pairs.push((m, s));
                    fresh.push((m, s));
                }
            }
        }
        // Slave items whose master disappeared go away with it.
        for &(m, s) in &oriented {
            if !master_items.contains(&m) {
                self.unbind_item_pair(m, s);
                self.free_cell(s);
            }
        }
        for (m, s) in fresh {
            self.bind_item_pair(m, s);
        }
        {
            let record = &mut self.bindings[index];
            record.items = if record.a == master {
                new_pairs
            } else {
                new_pairs.into_iter().map(|(m, s)| (s, m)).collect()
            };
        }
        // Commit without echoing back to the master.
        let reverse = bind_list_name(slave, master);
        let had = self.cell_mut(slave).set_listener_enabled(&reverse, false);
        self.commit_items(slave, new_items);
        if had {
            self.cell_mut(slave).set_listener_enabled(&reverse, true);
        }
        Ok(())
    }

    /// Silently removes every binding that touches one of `object`'s
    /// cells, leaving the surviving peers with their last replicated
    /// state.
    pub(crate) fn dissolve_bindings_for(&mut self, object: ObjectId) {
        let mut mine = self.data(object).cells.clone();
        let items: Vec<CellId> = mine
            .iter()
            .flat_map(|&c| self.cell(c).items.clone())
            .collect();
        mine.extend(items);
        let doomed: Vec<usize> = self
            .bindings
            .iter()
            .enumerate()
            .filter(|(_, r)| mine.contains(&r.a) || mine.contains(&r.b))
            .map(|(i, _)| i)
            .collect();
        for index in doomed.into_iter().rev() {
            let record = self.bindings.swap_remove(index);
            self.remove_pair_listeners(record.a, record.b);
            for (ai, bi) in record.items {
                self.unbind_item_pair(ai, bi);
            }
        }
    }

    // ---- parent/child synchronisation ------------------------------

    /// Creates a child of `parent`: a new object of the same schema
    /// with every property (except those in `nobind`) bound to the
    /// parent's.
    ///
    /// # Panics
    ///
    /// Panics if the schema is not syncable, or if `nobind`/`nounbind`
    /// name properties the schema does not declare.
    pub fn create_child(&mut self, parent: ObjectId, options: SyncOptions) -> ObjectId {
        let schema = Rc::clone(self.schema(parent));
        assert!(
            schema.is_syncable(),
            "schema {} is not syncable",
            schema.name()
        );
        let child = self.create(Rc::clone(&schema));
        let resolve = |names: &[String]| -> Vec<PropId> {
            names
                .iter()
                .map(|n| match schema.prop_id(n) {
                    Some(id) => id,
                    None => panic!("schema {} has no property {n}", schema.name()),
                })
                .collect()
        };
        let nobind = resolve(&options.nobind);
        let nounbind = resolve(&options.nounbind);
        {
            let data = self.data_mut(child);
            data.parent = Some(parent);
            data.nobind = nobind;
            data.nounbind = nounbind;
        }
        self.data_mut(parent).children.push(child);

        let names: Vec<String> = schema.property_names().map(String::from).collect();
        for name in names {
            let releasable = !options.nounbind.iter().any(|n| *n == name);
            if options.nobind.iter().any(|n| *n == name)
                || (!options.start_synced && releasable)
            {
                self.set_sync_shadow(child, &name, false);
            } else if let Err(e) = self.sync_to_parent(child, &name) {
                log::warn!("could not synchronise {name} to parent: {e}");
                self.set_sync_shadow(child, &name, false);
            }
        }
        child
    }

    /// The parent this object is a child of, if any.
    #[must_use]
    pub fn parent(&self, object: ObjectId) -> Option<ObjectId> {
        self.data(object).parent
    }

    /// This object's children.
    #[must_use]
    pub fn children(&self, object: ObjectId) -> &[ObjectId] {
        &self.data(object).children
    }

    /// Couples the named property to the parent's again. The child
    /// takes the parent's current value. A no-op when already
    /// synchronised.
    ///
    /// # Panics
    ///
    /// Panics if the object has no parent, or the property was declared
    /// `nobind`.
    pub fn sync_to_parent(&mut self, object: ObjectId, name: &str) -> Result<(), PropertyError> {
        let parent = self.require_parent(object);
        let prop = self.require_prop(object, name);
        assert!(
            !self.data(object).nobind.contains(&prop),
            "property {name} cannot be synchronised to the parent"
        );
        if self.is_synced_to_parent(object, name) {
            return Ok(());
        }
        self.bind(object, name, parent, name)?;
        self.set_sync_shadow(object, name, true);
        Ok(())
    }

    /// Releases the named property from the parent. The child keeps the
    /// last synchronised value. A no-op when already released.
    ///
    /// # Panics
    ///
    /// Panics if the object has no parent, or the property was declared
    /// `nounbind`.
    pub fn unsync_from_parent(&mut self, object: ObjectId, name: &str) {
        let parent = self.require_parent(object);
        let prop = self.require_prop(object, name);
        assert!(
            !self.data(object).nounbind.contains(&prop),
            "property {name} cannot be released from the parent"
        );
        self.unbind(object, name, parent, name);
        self.set_sync_shadow(object, name, false);
    }

    /// Whether the named property is currently synchronised to the
    /// parent. `false` for an object with no parent.
    #[must_use]
    pub fn is_synced_to_parent(&self, object: ObjectId, name: &str) -> bool {
        match self.data(object).parent {
            Some(parent) => self.is_bound(object, name, parent, name),
            None => false,
        }
    }

    /// Whether every non-`nobind` property is synchronised.
    #[must_use]
    pub fn all_synced_to_parent(&self, object: ObjectId) -> bool {
        let schema = Rc::clone(self.schema(object));
        schema.property_names().all(|name| {
            let prop = self.require_prop(object, name);
            self.data(object).nobind.contains(&prop) || self.is_synced_to_parent(object, name)
        })
    }

    /// Registers a listener on the property's `_sync_` shadow, fired
    /// whenever the property is synchronised to or released from the
    /// parent.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate listener name, like
    /// [`World::add_listener`](Self::add_listener).
    pub fn add_sync_listener(
        &mut self,
        object: ObjectId,
        name: &str,
        listener_name: impl Into<String>,
        listener: impl Fn(&mut World, &ChangeEvent) -> Result<(), ListenerError> + 'static,
    ) {
        let shadow = sync_property_name(name);
        self.add_listener(object, &shadow, listener_name, listener);
    }

    /// Removes a sync-change listener.
    pub fn remove_sync_listener(&mut self, object: ObjectId, name: &str, listener_name: &str) -> bool {
        let shadow = sync_property_name(name);
        self.remove_listener(object, &shadow, listener_name)
    }

    /// Whether any property is synchronised.
    #[must_use]
    pub fn any_synced_to_parent(&self, object: ObjectId) -> bool {
        let schema = Rc::clone(self.schema(object));
        schema
            .property_names()
            .any(|name| self.is_synced_to_parent(object, name))
    }

    /// Severs the parent/child relationship entirely. Every property is
    /// released, `nounbind` ones included, and the object becomes a
    /// root. A no-op for an object with no parent.
    pub fn detach_from_parent(&mut self, object: ObjectId) {
        let Some(parent) = self.data(object).parent else {
            return;
        };
        let schema = Rc::clone(self.schema(object));
        let names: Vec<String> = schema.property_names().map(String::from).collect();
        for name in names {
            self.unbind(object, &name, parent, &name);
            self.set_sync_shadow(object, &name, false);
        }
        self.data_mut(object).parent = None;
        self.data_mut(parent).children.retain(|&c| c != object);
    }

    fn require_parent(&self, object: ObjectId) -> ObjectId {
        match self.data(object).parent {
            Some(parent) => parent,
            None => panic!("{object} has no parent"),
        }
    }

    fn require_prop(&self, object: ObjectId, name: &str) -> PropId {
        let schema = self.schema(object);
        match schema.prop_id(name) {
            Some(prop) => prop,
            None => panic!("schema {} has no property {name}", schema.name()),
        }
    }

    fn set_sync_shadow(&mut self, object: ObjectId, name: &str, synced: bool) {
        let shadow = sync_property_name(name);
        if self.schema(object).prop_id(&shadow).is_some() {
            let cell = self.property_cell(object, &shadow);
            // Boolean writes cannot fail.
            let _ = self.set_cell(cell, Value::Bool(synced));
        }
    }
}

/// A replication listener: pushes the changed value into the peer cell,
/// with the peer's reverse listener muted so the write does not echo.
fn push_listener(
    from: CellId,
    to: CellId,
) -> impl Fn(&mut World, &ChangeEvent) -> Result<(), ListenerError> {
    move |world: &mut World, event: &ChangeEvent| {
        if !world.cell_is_alive(to) || !world.cell_is_alive(from) {
            return Ok(());
        }
        let reverse = bind_name(to, from);
        let had = world.cell_mut(to).set_listener_enabled(&reverse, false);
        let result = world.set_cell(to, event.value.clone());
        if had {
            world.cell_mut(to).set_listener_enabled(&reverse, true);
        }
        result.map_err(ListenerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::{AttrValue, keys};
    use crate::kind::Kind;
    use crate::schema::{PropertyDef, Schema, SchemaBuilder};
    use alloc::boxed::Box;
    use alloc::string::ToString;
    use alloc::vec;
    use core::cell::RefCell;

    fn int_schema() -> Rc<Schema> {
        SchemaBuilder::new("t")
            .property("n", PropertyDef::new(Kind::Int))
            .property("s", PropertyDef::new(Kind::Str))
            .build()
    }

    fn list_schema() -> Rc<Schema> {
        SchemaBuilder::new("doc")
            .property("tags", PropertyDef::new(Kind::List(Box::new(Kind::Int))))
            .build()
    }

    fn syncable_schema() -> Rc<Schema> {
        SchemaBuilder::new("layer")
            .property("opacity", PropertyDef::new(Kind::Int))
            .property("label", PropertyDef::new(Kind::Str))
            .syncable()
            .build()
    }

    fn ints(world: &World, object: ObjectId) -> Vec<i64> {
        world
            .get(object, "tags")
            .as_list()
            .unwrap()
            .iter()
            .map(|v| v.as_int().unwrap())
            .collect()
    }

    #[test]
    fn scalar_round_trip() {
        let mut world = World::new();
        let t1 = world.create(int_schema());
        let t2 = world.create(int_schema());
        world.set(t2, "n", 7_i64).unwrap();
        world.bind(t1, "n", t2, "n").unwrap();
        // t1 took t2's value at bind time.
        assert_eq!(world.get(t1, "n"), &Value::Int(7));

        world.set(t1, "n", 1_i64).unwrap();
        assert_eq!(world.get(t2, "n"), &Value::Int(1));
        world.set(t2, "n", 2_i64).unwrap();
        assert_eq!(world.get(t1, "n"), &Value::Int(2));
    }

    #[test]
    fn echo_does_not_renotify_the_writer() {
        let mut world = World::new();
        let t1 = world.create(int_schema());
        let t2 = world.create(int_schema());
        world.bind(t1, "n", t2, "n").unwrap();
        let count = Rc::new(RefCell::new(0usize));
        let c = Rc::clone(&count);
        world.add_listener(t1, "n", "watch", move |_, _| {
            *c.borrow_mut() += 1;
            Ok(())
        });
        world.set(t1, "n", 5_i64).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn unbind_stops_replication() {
        let mut world = World::new();
        let t1 = world.create(int_schema());
        let t2 = world.create(int_schema());
        world.bind(t1, "n", t2, "n").unwrap();
        world.unbind(t1, "n", t2, "n");
        world.set(t1, "n", 9_i64).unwrap();
        assert_eq!(world.get(t2, "n"), &Value::Int(0));
        assert!(!world.is_bound(t1, "n", t2, "n"));
    }

    #[test]
    fn bind_is_idempotent() {
        let mut world = World::new();
        let t1 = world.create(int_schema());
        let t2 = world.create(int_schema());
        world.bind(t1, "n", t2, "n").unwrap();
        world.bind(t1, "n", t2, "n").unwrap();
        world.bind(t2, "n", t1, "n").unwrap();
        world.set(t1, "n", 4_i64).unwrap();
        assert_eq!(world.get(t2, "n"), &Value::Int(4));
    }

    #[test]
    #[should_panic(expected = "different kinds")]
    fn kind_mismatch_panics() {
        let mut world = World::new();
        let t1 = world.create(int_schema());
        let t2 = world.create(int_schema());
        let _ = world.bind(t1, "n", t2, "s");
    }

    #[test]
    fn attributes_replicate() {
        let mut world = World::new();
        let t1 = world.create(int_schema());
        let t2 = world.create(int_schema());
        world.bind(t1, "n", t2, "n").unwrap();
        world.set_attribute(t1, "n", keys::MAXVAL, AttrValue::Real(10.0));
        assert_eq!(
            world.attribute(t2, "n", keys::MAXVAL),
            Some(&AttrValue::Real(10.0))
        );
    }

    #[test]
    fn chained_bindings_propagate() {
        let mut world = World::new();
        let t1 = world.create(int_schema());
        let t2 = world.create(int_schema());
        let t3 = world.create(int_schema());
        world.bind(t1, "n", t2, "n").unwrap();
        world.bind(t2, "n", t3, "n").unwrap();
        world.set(t1, "n", 6_i64).unwrap();
        assert_eq!(world.get(t2, "n"), &Value::Int(6));
        assert_eq!(world.get(t3, "n"), &Value::Int(6));
        world.set(t3, "n", 8_i64).unwrap();
        assert_eq!(world.get(t1, "n"), &Value::Int(8));
    }

    #[test]
    fn destroy_dissolves_silently() {
        let mut world = World::new();
        let t1 = world.create(int_schema());
        let t2 = world.create(int_schema());
        world.bind(t1, "n", t2, "n").unwrap();
        world.set(t1, "n", 3_i64).unwrap();
        world.destroy(t1);
        assert_eq!(world.get(t2, "n"), &Value::Int(3));
        // The survivor is writable; nothing dangles.
        world.set(t2, "n", 4_i64).unwrap();
        assert_eq!(world.get(t2, "n"), &Value::Int(4));
    }

    #[test]
    fn list_values_replicate_in_place() {
        let mut world = World::new();
        let d1 = world.create(list_schema());
        let d2 = world.create(list_schema());
        world
            .insert_all(d2, "tags", 0, vec![Value::Int(1), Value::Int(2)])
            .unwrap();
        world.bind(d1, "tags", d2, "tags").unwrap();
        assert_eq!(ints(&world, d1), vec![1, 2]);

        let d1_cells = world.item_cells(d1, "tags").to_vec();
        world.set_item(d2, "tags", 0, 9_i64).unwrap();
        assert_eq!(ints(&world, d1), vec![9, 2]);
        // In-place writes do not recreate the peer's item cells.
        assert_eq!(world.item_cells(d1, "tags"), d1_cells.as_slice());
    }

    #[test]
    fn list_growth_replicates() {
        let mut world = World::new();
        let d1 = world.create(list_schema());
        let d2 = world.create(list_schema());
        world.bind(d1, "tags", d2, "tags").unwrap();
        world.append(d2, "tags", 1_i64).unwrap();
        world.append(d1, "tags", 2_i64).unwrap();
        assert_eq!(ints(&world, d1), vec![1, 2]);
        assert_eq!(ints(&world, d2), vec![1, 2]);
    }

    #[test]
    fn list_removal_replicates() {
        let mut world = World::new();
        let d1 = world.create(list_schema());
        let d2 = world.create(list_schema());
        world
            .insert_all(d2, "tags", 0, vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        world.bind(d1, "tags", d2, "tags").unwrap();
        world.remove(d2, "tags", 1).unwrap();
        assert_eq!(ints(&world, d1), vec![1, 3]);
        assert_eq!(world.list_len(d1, "tags"), 2);
    }

    #[test]
    fn reorder_moves_peer_items_without_recreating_them() {
        let mut world = World::new();
        let d1 = world.create(list_schema());
        let d2 = world.create(list_schema());
        world
            .insert_all(d2, "tags", 0, vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        world.bind(d1, "tags", d2, "tags").unwrap();
        let before = world.item_cells(d1, "tags").to_vec();
        world.reorder(d2, "tags", &[2, 0, 1]).unwrap();
        assert_eq!(ints(&world, d1), vec![3, 1, 2]);
        let after = world.item_cells(d1, "tags").to_vec();
        assert_eq!(after, vec![before[2], before[0], before[1]]);
    }

    #[test]
    fn bound_item_listener_follows_reorder() {
        let mut world = World::new();
        let d1 = world.create(list_schema());
        let d2 = world.create(list_schema());
        world
            .insert_all(d2, "tags", 0, vec![Value::Int(1), Value::Int(2)])
            .unwrap();
        world.bind(d1, "tags", d2, "tags").unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        // Watch the replica of the master's first item.
        let watched = world.item_cell(d1, "tags", 0);
        world.add_cell_listener(watched, "watch", move |_, event| {
            log.borrow_mut().push(event.value.clone());
            Ok(())
        });
        world.reorder(d2, "tags", &[1, 0]).unwrap();
        // It moved to position 1; writing through the master's item at
        // its new position still reaches the same replica cell.
        world.set_item(d2, "tags", 1, 7_i64).unwrap();
        assert_eq!(*seen.borrow(), vec![Value::Int(7)]);
        assert_eq!(world.item_cell(d1, "tags", 1), watched);
    }

    #[test]
    fn child_starts_synchronised() {
        let mut world = World::new();
        let parent = world.create(syncable_schema());
        world.set(parent, "opacity", 80_i64).unwrap();
        let child = world.create_child(parent, SyncOptions::default());
        assert_eq!(world.get(child, "opacity"), &Value::Int(80));
        assert_eq!(world.parent(child), Some(parent));
        assert_eq!(world.children(parent), &[child]);
        assert!(world.is_synced_to_parent(child, "opacity"));
        assert_eq!(world.get(child, "_sync_opacity"), &Value::Bool(true));
        assert!(world.all_synced_to_parent(child));
    }

    #[test]
    fn sync_replicates_both_ways() {
        let mut world = World::new();
        let parent = world.create(syncable_schema());
        let child = world.create_child(parent, SyncOptions::default());
        world.set(parent, "opacity", 30_i64).unwrap();
        assert_eq!(world.get(child, "opacity"), &Value::Int(30));
        world.set(child, "opacity", 60_i64).unwrap();
        assert_eq!(world.get(parent, "opacity"), &Value::Int(60));
    }

    #[test]
    fn unsync_and_resync() {
        let mut world = World::new();
        let parent = world.create(syncable_schema());
        let child = world.create_child(parent, SyncOptions::default());
        world.unsync_from_parent(child, "opacity");
        assert!(!world.is_synced_to_parent(child, "opacity"));
        assert_eq!(world.get(child, "_sync_opacity"), &Value::Bool(false));

        world.set(parent, "opacity", 50_i64).unwrap();
        assert_eq!(world.get(child, "opacity"), &Value::Int(0));

        world.sync_to_parent(child, "opacity").unwrap();
        // Resynchronising pulls the parent's value back in.
        assert_eq!(world.get(child, "opacity"), &Value::Int(50));
    }

    #[test]
    fn start_unsynced_child() {
        let mut world = World::new();
        let parent = world.create(syncable_schema());
        world.set(parent, "opacity", 80_i64).unwrap();
        let child = world.create_child(
            parent,
            SyncOptions {
                start_synced: false,
                ..SyncOptions::default()
            },
        );
        assert!(!world.is_synced_to_parent(child, "opacity"));
        assert_eq!(world.get(child, "opacity"), &Value::Int(0));

        world.sync_to_parent(child, "opacity").unwrap();
        assert_eq!(world.get(child, "opacity"), &Value::Int(80));
    }

    #[test]
    fn sync_listener_observes_state_changes() {
        let mut world = World::new();
        let parent = world.create(syncable_schema());
        let child = world.create_child(parent, SyncOptions::default());
        let states = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&states);
        world.add_sync_listener(child, "opacity", "watch", move |_, event| {
            s.borrow_mut().push(event.value.clone());
            Ok(())
        });
        world.unsync_from_parent(child, "opacity");
        world.sync_to_parent(child, "opacity").unwrap();
        assert_eq!(
            *states.borrow(),
            [Value::Bool(false), Value::Bool(true)]
        );
        assert!(world.remove_sync_listener(child, "opacity", "watch"));
    }

    #[test]
    fn nobind_starts_unsynchronised() {
        let mut world = World::new();
        let parent = world.create(syncable_schema());
        world.set(parent, "label", "root").unwrap();
        let child = world.create_child(
            parent,
            SyncOptions {
                nobind: vec!["label".to_string()],
                ..SyncOptions::default()
            },
        );
        assert!(!world.is_synced_to_parent(child, "label"));
        assert_eq!(world.get(child, "label"), &Value::Nothing);
        assert!(world.is_synced_to_parent(child, "opacity"));
        // nobind properties do not count against full synchronisation.
        assert!(world.all_synced_to_parent(child));
    }

    #[test]
    #[should_panic(expected = "cannot be synchronised")]
    fn nobind_sync_panics() {
        let mut world = World::new();
        let parent = world.create(syncable_schema());
        let child = world.create_child(
            parent,
            SyncOptions {
                nobind: vec!["label".to_string()],
                ..SyncOptions::default()
            },
        );
        let _ = world.sync_to_parent(child, "label");
    }

    #[test]
    #[should_panic(expected = "cannot be released")]
    fn nounbind_unsync_panics() {
        let mut world = World::new();
        let parent = world.create(syncable_schema());
        let child = world.create_child(
            parent,
            SyncOptions {
                nounbind: vec!["opacity".to_string()],
                ..SyncOptions::default()
            },
        );
        world.unsync_from_parent(child, "opacity");
    }

    #[test]
    fn detach_releases_everything() {
        let mut world = World::new();
        let parent = world.create(syncable_schema());
        let child = world.create_child(
            parent,
            SyncOptions {
                nounbind: vec!["opacity".to_string()],
                ..SyncOptions::default()
            },
        );
        world.detach_from_parent(child);
        assert_eq!(world.parent(child), None);
        assert!(world.children(parent).is_empty());
        assert!(!world.any_synced_to_parent(child));

        world.set(parent, "opacity", 90_i64).unwrap();
        assert_eq!(world.get(child, "opacity"), &Value::Int(0));
    }

    #[test]
    #[should_panic(expected = "is not syncable")]
    fn create_child_requires_syncable_schema() {
        let mut world = World::new();
        let parent = world.create(int_schema());
        let _ = world.create_child(parent, SyncOptions::default());
    }

    #[test]
    fn destroying_parent_detaches_children() {
        let mut world = World::new();
        let parent = world.create(syncable_schema());
        let child = world.create_child(parent, SyncOptions::default());
        world.set(parent, "opacity", 25_i64).unwrap();
        world.destroy(parent);
        assert!(!world.is_alive(parent));
        assert_eq!(world.parent(child), None);
        assert_eq!(world.get(child, "opacity"), &Value::Int(25));
        world.set(child, "opacity", 26_i64).unwrap();
    }
}
