// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scoped notification guards.
//!
//! Each guard saves a piece of notification state, disables it, and
//! restores the saved state when dropped. Restoring the *saved* state
//! rather than force-enabling means nested guards compose: an inner
//! guard on an already-suppressed property leaves it suppressed.

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

use crate::id::{CellId, ObjectId};
use crate::world::World;

/// Suppresses one property's notifications for the guard's lifetime.
/// Created with [`World::suppress`].
#[derive(Debug)]
pub struct Suppress<'a> {
    world: &'a mut World,
    cell: CellId,
    saved: bool,
    /// Fire one notification on exit. The restored enable state still
    /// applies, so an outer suppression keeps the exit silent.
    notify_on_exit: bool,
}

impl Drop for Suppress<'_> {
    fn drop(&mut self) {
        self.world.set_cell_notification_enabled(self.cell, self.saved);
        if self.notify_on_exit {
            self.world.notify_cell(self.cell);
        }
    }
}

impl Deref for Suppress<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        self.world
    }
}

impl DerefMut for Suppress<'_> {
    fn deref_mut(&mut self) -> &mut World {
        self.world
    }
}

/// Suppresses every property of one object. Created with
/// [`World::suppress_all`].
#[derive(Debug)]
pub struct SuppressAll<'a> {
    world: &'a mut World,
    saved: Vec<(CellId, bool)>,
}

impl Drop for SuppressAll<'_> {
    fn drop(&mut self) {
        for &(cell, enabled) in &self.saved {
            if self.world.cell_is_alive(cell) {
                self.world.set_cell_notification_enabled(cell, enabled);
            }
        }
    }
}

impl Deref for SuppressAll<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        self.world
    }
}

impl DerefMut for SuppressAll<'_> {
    fn deref_mut(&mut self) -> &mut World {
        self.world
    }
}

/// Disables one listener for the guard's lifetime. Created with
/// [`World::skip_listener`].
#[derive(Debug)]
pub struct SkipListener<'a> {
    world: &'a mut World,
    cell: CellId,
    listener: String,
    saved: Option<bool>,
}

impl Drop for SkipListener<'_> {
    fn drop(&mut self) {
        if let Some(enabled) = self.saved {
            if self.world.cell_is_alive(self.cell) {
                self.world
                    .cell_mut(self.cell)
                    .set_listener_enabled(&self.listener, enabled);
            }
        }
    }
}

impl Deref for SkipListener<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        self.world
    }
}

impl DerefMut for SkipListener<'_> {
    fn deref_mut(&mut self) -> &mut World {
        self.world
    }
}

impl World {
    /// Suppresses the named property's notifications until the returned
    /// guard is dropped. Writes through the guard still cast, validate,
    /// and store.
    ///
    /// # Examples
    ///
    /// ```
    /// use tether_property::{Kind, PropertyDef, SchemaBuilder, Value, World};
    ///
    /// let schema = SchemaBuilder::new("s")
    ///     .property("n", PropertyDef::new(Kind::Int))
    ///     .build();
    /// let mut world = World::new();
    /// let t = world.create(schema);
    /// {
    ///     let mut quiet = world.suppress(t, "n");
    ///     quiet.set(t, "n", 5_i64).unwrap();
    /// }
    /// assert_eq!(world.get(t, "n"), &Value::Int(5));
    /// ```
    pub fn suppress(&mut self, object: ObjectId, name: &str) -> Suppress<'_> {
        self.suppress_cell(object, name, false)
    }

    /// Like [`World::suppress`](Self::suppress), but fires exactly one
    /// notification when the guard is dropped, whether or not the value
    /// changed while it was held. A burst of writes collapses into a
    /// single event.
    pub fn suppress_then_notify(&mut self, object: ObjectId, name: &str) -> Suppress<'_> {
        self.suppress_cell(object, name, true)
    }

    fn suppress_cell(&mut self, object: ObjectId, name: &str, notify_on_exit: bool) -> Suppress<'_> {
        let cell = self.property_cell(object, name);
        let saved = self.cell_notification_enabled(cell);
        self.set_cell_notification_enabled(cell, false);
        Suppress {
            world: self,
            cell,
            saved,
            notify_on_exit,
        }
    }

    /// Suppresses every property of `object`, item cells included,
    /// until the returned guard is dropped.
    pub fn suppress_all(&mut self, object: ObjectId) -> SuppressAll<'_> {
        let mut cells = self.data(object).cells.clone();
        let items: Vec<CellId> = cells
            .iter()
            .flat_map(|&c| self.cell(c).items.clone())
            .collect();
        cells.extend(items);
        let saved: Vec<(CellId, bool)> = cells
            .into_iter()
            .map(|c| (c, self.cell_notification_enabled(c)))
            .collect();
        for &(cell, _) in &saved {
            self.set_cell_notification_enabled(cell, false);
        }
        SuppressAll { world: self, saved }
    }

    /// Disables one listener until the returned guard is dropped.
    /// Harmless when no such listener exists.
    pub fn skip_listener(
        &mut self,
        object: ObjectId,
        property: &str,
        listener: &str,
    ) -> SkipListener<'_> {
        let cell = self.property_cell(object, property);
        let saved = self.cell(cell).listener_enabled(listener);
        if saved.is_some() {
            self.cell_mut(cell).set_listener_enabled(listener, false);
        }
        SkipListener {
            world: self,
            cell,
            listener: String::from(listener),
            saved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Kind;
    use crate::schema::{PropertyDef, SchemaBuilder};
    use crate::value::Value;
    use alloc::rc::Rc;
    use core::cell::RefCell;

    fn world_with_counter() -> (World, ObjectId, Rc<RefCell<usize>>) {
        let schema = SchemaBuilder::new("s")
            .property("n", PropertyDef::new(Kind::Int))
            .property("m", PropertyDef::new(Kind::Int))
            .build();
        let mut world = World::new();
        let t = world.create(schema);
        let count = Rc::new(RefCell::new(0usize));
        let c = Rc::clone(&count);
        world.add_listener(t, "n", "watch", move |_, _| {
            *c.borrow_mut() += 1;
            Ok(())
        });
        (world, t, count)
    }

    #[test]
    fn suppress_silences_writes() {
        let (mut world, t, count) = world_with_counter();
        {
            let mut quiet = world.suppress(t, "n");
            quiet.set(t, "n", 1_i64).unwrap();
            quiet.set(t, "n", 2_i64).unwrap();
        }
        assert_eq!(*count.borrow(), 0);
        assert_eq!(world.get(t, "n"), &Value::Int(2));
        // State restored: later writes notify again.
        world.set(t, "n", 3_i64).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn suppress_then_notify_collapses_a_burst() {
        let (mut world, t, count) = world_with_counter();
        {
            let mut quiet = world.suppress_then_notify(t, "n");
            quiet.set(t, "n", 1_i64).unwrap();
            quiet.set(t, "n", 2_i64).unwrap();
        }
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn suppress_then_notify_fires_even_without_a_change() {
        let (mut world, t, count) = world_with_counter();
        {
            let mut quiet = world.suppress_then_notify(t, "n");
            quiet.set(t, "n", 0_i64).unwrap();
        }
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn suppress_then_notify_stays_silent_under_an_outer_guard() {
        let (mut world, t, count) = world_with_counter();
        {
            let mut outer = world.suppress(t, "n");
            {
                let mut inner = outer.suppress_then_notify(t, "n");
                inner.set(t, "n", 1_i64).unwrap();
            }
        }
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn nested_suppression_stays_suppressed() {
        let (mut world, t, count) = world_with_counter();
        {
            let mut outer = world.suppress(t, "n");
            {
                let mut inner = outer.suppress(t, "n");
                inner.set(t, "n", 1_i64).unwrap();
            }
            // The inner guard restored "suppressed", not "enabled".
            outer.set(t, "n", 2_i64).unwrap();
        }
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn suppress_all_covers_every_property() {
        let (mut world, t, count) = world_with_counter();
        let other = Rc::new(RefCell::new(0usize));
        let c = Rc::clone(&other);
        world.add_listener(t, "m", "watch", move |_, _| {
            *c.borrow_mut() += 1;
            Ok(())
        });
        {
            let mut quiet = world.suppress_all(t);
            quiet.set(t, "n", 1_i64).unwrap();
            quiet.set(t, "m", 1_i64).unwrap();
        }
        assert_eq!(*count.borrow(), 0);
        assert_eq!(*other.borrow(), 0);
        world.set(t, "m", 2_i64).unwrap();
        assert_eq!(*other.borrow(), 1);
    }

    #[test]
    fn skip_listener_spares_the_others() {
        let (mut world, t, count) = world_with_counter();
        let other = Rc::new(RefCell::new(0usize));
        let c = Rc::clone(&other);
        world.add_listener(t, "n", "second", move |_, _| {
            *c.borrow_mut() += 1;
            Ok(())
        });
        {
            let mut guard = world.skip_listener(t, "n", "watch");
            guard.set(t, "n", 1_i64).unwrap();
        }
        assert_eq!(*count.borrow(), 0);
        assert_eq!(*other.borrow(), 1);
        world.set(t, "n", 2_i64).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn skip_listener_tolerates_unknown_names() {
        let (mut world, t, _count) = world_with_counter();
        {
            let mut guard = world.skip_listener(t, "n", "missing");
            guard.set(t, "n", 1_i64).unwrap();
        }
        world.set(t, "n", 2_i64).unwrap();
    }
}
