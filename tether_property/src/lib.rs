// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tether Property: validated, observable properties with binding.
//!
//! This crate provides a reactive property system: objects declare typed
//! properties through a [`Schema`], every write is cast and validated
//! against mutable per-instance constraints, and changes are delivered to
//! listeners through a FIFO call queue rather than nested callbacks.
//! Properties of two objects can be bound so that values, constraint
//! attributes, and list structure replicate in both directions.
//!
//! ## Core Concepts
//!
//! ### The World
//!
//! A [`World`] owns every object, value cell, and binding. Objects and
//! cells are addressed by plain ids ([`ObjectId`], [`CellId`]); nothing
//! holds a reference into the arena, so listeners receive `&mut World`
//! and can freely read and write any property.
//!
//! ### Schemas and Kinds
//!
//! A [`Schema`] is an ordered set of named [`PropertyDef`]s built once
//! and shared by every object instantiated from it. Each definition has
//! a [`Kind`] (boolean, number, string, choice, list, bounds, point)
//! fixing how raw [`Value`]s are cast and validated, plus per-instance
//! constraint attributes such as `minval` or the choice set.
//!
//! ### Notification
//!
//! A write enqueues one task per enabled listener and drains the queue;
//! writes performed by listeners append behind the pending tasks and run
//! in the same drain, in FIFO order. Any top-level change also
//! revalidates the object's other properties, so validity that depends
//! on a sibling's value stays current.
//!
//! ## Quick Start
//!
//! ```rust
//! use tether_property::{Kind, PropertyDef, SchemaBuilder, Value, World};
//!
//! let schema = SchemaBuilder::new("scene")
//!     .property(
//!         "opacity",
//!         PropertyDef::new(Kind::Int).range(0.0, 100.0).clamped(true),
//!     )
//!     .property("label", PropertyDef::new(Kind::Str))
//!     .build();
//!
//! let mut world = World::new();
//! let scene = world.create(schema);
//!
//! world.add_listener(scene, "opacity", "echo", |world, event| {
//!     let text = format!("opacity is {}", event.value);
//!     world.set(event.object, "label", text.as_str())?;
//!     Ok(())
//! });
//!
//! world.set(scene, "opacity", 250_i64)?;
//! assert_eq!(world.get(scene, "opacity"), &Value::Int(100));
//! assert_eq!(world.get(scene, "label"), &Value::from("opacity is 100"));
//! # Ok::<(), tether_property::PropertyError>(())
//! ```
//!
//! ## Binding
//!
//! [`World::bind`] couples two properties of the same kind; a write to
//! either replicates to the other, with the echo suppressed. For list
//! properties the coupling is structural: items are matched by cell
//! identity, so reorders and in-place writes move across without
//! recreating the peer's item cells. [`World::create_child`] builds on
//! this to keep a whole object synchronised with a parent, property by
//! property, with each coupling individually releasable.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod attrs;
mod bounds;
mod cell;
mod choice;
mod error;
mod id;
mod kind;
mod list;
mod schema;
mod suppress;
mod sync;
mod value;
mod world;

pub use attrs::{AttrValue, Attrs, keys};
pub use cell::{AttrEvent, AttrListener, ChangeEvent, ChangeListener};
pub use error::{CastError, InvalidValue, ListError, ListenerError, PropertyError};
pub use id::{CellId, ObjectId, PropId};
pub use kind::Kind;
pub use schema::{
    EqualityFn, PropertyDef, Required, RequiredFn, Schema, SchemaBuilder, ValidateFn,
    sync_property_name,
};
pub use suppress::{SkipListener, Suppress, SuppressAll};
pub use sync::SyncOptions;
pub use value::{REAL_PRECISION, Value};
pub use world::World;
