// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Value cells and their listener tables.
//!
//! A [`Cell`] is the unit of observable state: one validated value, its
//! constraint attributes, and the listeners watching it. Top-level
//! properties and list items are both cells; a list cell additionally
//! tracks the ids of its item cells, and an item cell points back at
//! its owning list.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::attrs::{AttrValue, Attrs};
use crate::error::ListenerError;
use crate::id::{CellId, ObjectId, PropId};
use crate::value::Value;
use crate::world::World;

/// Delivered to change listeners after a cell's value (or validity)
/// changes.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    /// The object owning the changed cell.
    pub object: ObjectId,
    /// The property the cell belongs to.
    pub property: PropId,
    /// The changed cell itself. For item changes this is the item
    /// cell, not the list cell.
    pub cell: CellId,
    /// The item's position, when the changed cell is a list item.
    pub index: Option<usize>,
    /// The value after the change.
    pub value: Value,
    /// Whether that value satisfies the cell's constraints.
    pub valid: bool,
}

/// Delivered to attribute listeners after a constraint attribute
/// changes.
#[derive(Clone, Debug)]
pub struct AttrEvent {
    /// The object owning the cell.
    pub object: ObjectId,
    /// The property the cell belongs to.
    pub property: PropId,
    /// The cell whose attribute changed.
    pub cell: CellId,
    /// The attribute's name.
    pub attribute: String,
    /// The attribute's new value.
    pub value: AttrValue,
}

/// A change listener callback.
///
/// Listeners run from the world's call queue, never re-entrantly, and
/// receive `&mut World` so they can freely read and write other
/// properties. A returned error is logged at the drain and isolated
/// from other listeners.
pub type ChangeListener = Rc<dyn Fn(&mut World, &ChangeEvent) -> Result<(), ListenerError>>;

/// An attribute listener callback. Attribute listeners run immediately,
/// not through the call queue.
pub type AttrListener = Rc<dyn Fn(&mut World, &AttrEvent) -> Result<(), ListenerError>>;

pub(crate) struct ListenerEntry {
    pub(crate) name: String,
    pub(crate) enabled: bool,
    pub(crate) callback: ChangeListener,
}

pub(crate) struct Cell {
    pub(crate) owner: ObjectId,
    pub(crate) prop: PropId,
    pub(crate) value: Value,
    pub(crate) valid: bool,
    pub(crate) attrs: Attrs,
    /// Master switch; a disabled cell enqueues no notifications at all.
    pub(crate) notification_enabled: bool,
    /// Runs before the registered listeners of each notification.
    pub(crate) pre_notify: Option<ChangeListener>,
    /// Runs after the registered listeners of each notification.
    pub(crate) post_notify: Option<ChangeListener>,
    pub(crate) listeners: Vec<ListenerEntry>,
    pub(crate) attr_listeners: Vec<(String, AttrListener)>,
    /// Item cells, in order, when this cell holds a list-like value.
    pub(crate) items: Vec<CellId>,
    /// The owning list cell, when this cell is an item.
    pub(crate) parent: Option<CellId>,
}

impl Cell {
    pub(crate) fn new(owner: ObjectId, prop: PropId, value: Value, attrs: Attrs) -> Self {
        Self {
            owner,
            prop,
            value,
            valid: true,
            attrs,
            notification_enabled: true,
            pre_notify: None,
            post_notify: None,
            listeners: Vec::new(),
            attr_listeners: Vec::new(),
            items: Vec::new(),
            parent: None,
        }
    }

    /// # Panics
    ///
    /// Panics if a listener with this name is already registered on
    /// this cell. Use [`Cell::replace_listener`] to overwrite.
    pub(crate) fn add_listener(&mut self, name: impl Into<String>, callback: ChangeListener) {
        let name = name.into();
        assert!(
            !self.listeners.iter().any(|l| l.name == name),
            "listener {name} is already registered"
        );
        self.listeners.push(ListenerEntry {
            name,
            enabled: true,
            callback,
        });
    }

    /// Registers or overwrites, preserving the slot (and enabled state)
    /// of an existing listener with the same name.
    pub(crate) fn replace_listener(&mut self, name: impl Into<String>, callback: ChangeListener) {
        let name = name.into();
        if let Some(entry) = self.listeners.iter_mut().find(|l| l.name == name) {
            entry.callback = callback;
        } else {
            self.listeners.push(ListenerEntry {
                name,
                enabled: true,
                callback,
            });
        }
    }

    pub(crate) fn remove_listener(&mut self, name: &str) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.name != name);
        self.listeners.len() != before
    }

    pub(crate) fn has_listener(&self, name: &str) -> bool {
        self.listeners.iter().any(|l| l.name == name)
    }

    /// Returns `false` if no such listener exists.
    pub(crate) fn set_listener_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.listeners.iter_mut().find(|l| l.name == name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub(crate) fn listener_enabled(&self, name: &str) -> Option<bool> {
        self.listeners
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.enabled)
    }

    /// Snapshots the currently enabled listeners for enqueueing. The
    /// snapshot is what runs: listeners disabled right now stay out of
    /// this notification even if re-enabled before the queue drains.
    pub(crate) fn enabled_listeners(&self) -> Vec<(String, ChangeListener)> {
        self.listeners
            .iter()
            .filter(|l| l.enabled)
            .map(|l| (l.name.clone(), Rc::clone(&l.callback)))
            .collect()
    }

    /// Attribute listeners overwrite silently on name collision.
    pub(crate) fn set_attr_listener(&mut self, name: impl Into<String>, callback: AttrListener) {
        let name = name.into();
        if let Some((_, cb)) = self.attr_listeners.iter_mut().find(|(n, _)| *n == name) {
            *cb = callback;
        } else {
            self.attr_listeners.push((name, callback));
        }
    }

    pub(crate) fn remove_attr_listener(&mut self, name: &str) -> bool {
        let before = self.attr_listeners.len();
        self.attr_listeners.retain(|(n, _)| n != name);
        self.attr_listeners.len() != before
    }

    pub(crate) fn attr_listener_snapshot(&self) -> Vec<AttrListener> {
        self.attr_listeners
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect()
    }
}

impl core::fmt::Debug for Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cell")
            .field("owner", &self.owner)
            .field("prop", &self.prop)
            .field("value", &self.value)
            .field("valid", &self.valid)
            .field("notification_enabled", &self.notification_enabled)
            .field("listeners", &self.listeners.len())
            .field("items", &self.items.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::Attrs;

    fn cell() -> Cell {
        Cell::new(
            ObjectId::new(0, 0),
            PropId::new(0),
            Value::Int(0),
            Attrs::new(),
        )
    }

    fn noop() -> ChangeListener {
        Rc::new(|_, _| Ok(()))
    }

    #[test]
    fn add_remove_listener() {
        let mut c = cell();
        c.add_listener("a", noop());
        assert!(c.has_listener("a"));
        assert!(c.remove_listener("a"));
        assert!(!c.remove_listener("a"));
    }

    #[test]
    #[should_panic(expected = "listener a is already registered")]
    fn duplicate_listener_panics() {
        let mut c = cell();
        c.add_listener("a", noop());
        c.add_listener("a", noop());
    }

    #[test]
    fn replace_listener_keeps_enabled_state() {
        let mut c = cell();
        c.add_listener("a", noop());
        assert!(c.set_listener_enabled("a", false));
        c.replace_listener("a", noop());
        assert_eq!(c.listener_enabled("a"), Some(false));
    }

    #[test]
    fn snapshot_skips_disabled() {
        let mut c = cell();
        c.add_listener("a", noop());
        c.add_listener("b", noop());
        c.set_listener_enabled("a", false);
        let names: Vec<_> = c.enabled_listeners().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["b"]);
    }

    #[test]
    fn attr_listeners_overwrite_silently() {
        let mut c = cell();
        c.set_attr_listener("a", Rc::new(|_, _| Ok(())));
        c.set_attr_listener("a", Rc::new(|_, _| Err(ListenerError::new("x"))));
        assert_eq!(c.attr_listeners.len(), 1);
    }
}
