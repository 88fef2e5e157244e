// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Choice property management.
//!
//! The choice set of a [`Kind::Choice`](crate::Kind::Choice) property
//! is just a pair of constraint attributes (`choices` and
//! `choice_enabled`), so it is mutable per instance and observable
//! through attribute listeners like any other constraint. The helpers
//! here keep the two attributes consistent and apply the reset rule:
//! when the set changes and the current value is no longer a valid
//! choice, the property falls back to the first enabled choice.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::attrs::{AttrValue, keys};
use crate::id::ObjectId;
use crate::kind::choice_attrs;
use crate::value::Value;
use crate::world::World;

impl World {
    /// The current choice set, in order.
    #[must_use]
    pub fn choices(&self, object: ObjectId, name: &str) -> Vec<String> {
        self.attribute(object, name, keys::CHOICES)
            .and_then(AttrValue::as_str_list)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    /// Replaces the choice set; every new choice starts enabled. If the
    /// current value is not in the new set, the property resets to the
    /// first choice (or to no value when the set is empty).
    pub fn set_choices(&mut self, object: ObjectId, name: &str, choices: &[&str]) {
        let owned: Vec<String> = choices.iter().map(|c| (*c).to_string()).collect();
        let (set, flags) = choice_attrs(&owned);
        self.set_attribute(object, name, keys::CHOICES, set);
        self.set_attribute(object, name, keys::CHOICE_ENABLED, flags);
        self.reset_if_invalid_choice(object, name);
    }

    /// Appends one choice, enabled.
    pub fn add_choice(&mut self, object: ObjectId, name: &str, choice: &str) {
        let mut choices = self.choices(object, name);
        if choices.iter().any(|c| c == choice) {
            return;
        }
        choices.push(choice.to_string());
        let mut flags = self.choice_flags(object, name);
        flags.push((choice.to_string(), true));
        self.set_attribute(object, name, keys::CHOICES, AttrValue::StrList(choices));
        self.set_attribute(object, name, keys::CHOICE_ENABLED, AttrValue::Flags(flags));
    }

    /// Removes one choice. Resets the value if it was the current one.
    pub fn remove_choice(&mut self, object: ObjectId, name: &str, choice: &str) {
        let mut choices = self.choices(object, name);
        let before = choices.len();
        choices.retain(|c| c != choice);
        if choices.len() == before {
            return;
        }
        let mut flags = self.choice_flags(object, name);
        flags.retain(|(c, _)| c != choice);
        self.set_attribute(object, name, keys::CHOICES, AttrValue::StrList(choices));
        self.set_attribute(object, name, keys::CHOICE_ENABLED, AttrValue::Flags(flags));
        self.reset_if_invalid_choice(object, name);
    }

    /// Enables or disables one choice without removing it. A disabled
    /// choice stays in the set but no longer validates.
    pub fn set_choice_enabled(&mut self, object: ObjectId, name: &str, choice: &str, enabled: bool) {
        let mut flags = self.choice_flags(object, name);
        match flags.iter_mut().find(|(c, _)| c == choice) {
            Some(entry) => entry.1 = enabled,
            None => flags.push((choice.to_string(), enabled)),
        }
        self.set_attribute(object, name, keys::CHOICE_ENABLED, AttrValue::Flags(flags));
    }

    /// Whether the given choice is currently enabled.
    #[must_use]
    pub fn choice_enabled(&self, object: ObjectId, name: &str, choice: &str) -> bool {
        self.choice_flags_ref(object, name)
            .and_then(|flags| flags.iter().find(|(c, _)| c == choice).map(|(_, on)| *on))
            .unwrap_or(false)
    }

    fn choice_flags(&self, object: ObjectId, name: &str) -> Vec<(String, bool)> {
        self.choice_flags_ref(object, name)
            .map(<[(String, bool)]>::to_vec)
            .unwrap_or_default()
    }

    fn choice_flags_ref(&self, object: ObjectId, name: &str) -> Option<&[(String, bool)]> {
        self.attribute(object, name, keys::CHOICE_ENABLED)
            .and_then(AttrValue::as_flags)
    }

    fn reset_if_invalid_choice(&mut self, object: ObjectId, name: &str) {
        let current = self.get(object, name).clone();
        let choices = self.choices(object, name);
        let still_valid = match current.as_str() {
            Some(s) => choices.iter().any(|c| c == s),
            None => true,
        };
        if still_valid {
            return;
        }
        let fallback = choices
            .iter()
            .find(|c| self.choice_enabled(object, name, c))
            .cloned()
            .map_or(Value::Nothing, Value::Str);
        if self.set(object, name, fallback).is_err() {
            // No enabled choice left at all; clear the value.
            let cell = self.property_cell(object, name);
            let _ = self.set_cell(cell, Value::Nothing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PropertyError;
    use crate::kind::Kind;
    use crate::schema::{PropertyDef, SchemaBuilder};
    use alloc::rc::Rc;
    use alloc::vec;

    fn choice_world() -> (World, ObjectId) {
        let schema = SchemaBuilder::new("view")
            .property(
                "mode",
                PropertyDef::new(Kind::Choice).choices(&["a", "b", "c"]),
            )
            .build();
        let mut world = World::new();
        let v = world.create(schema);
        (world, v)
    }

    #[test]
    fn starts_at_first_choice() {
        let (world, v) = choice_world();
        assert_eq!(world.get(v, "mode"), &Value::from("a"));
        assert_eq!(world.choices(v, "mode"), vec!["a", "b", "c"]);
    }

    #[test]
    fn disabled_choice_rejected() {
        let (mut world, v) = choice_world();
        world.set_choice_enabled(v, "mode", "b", false);
        assert!(matches!(
            world.set(v, "mode", "b"),
            Err(PropertyError::Invalid(_))
        ));
        world.set(v, "mode", "a").unwrap();
        assert_eq!(world.get(v, "mode"), &Value::from("a"));
    }

    #[test]
    fn unknown_choice_rejected() {
        let (mut world, v) = choice_world();
        assert!(world.set(v, "mode", "d").is_err());
    }

    #[test]
    fn replacing_the_set_resets_stale_values() {
        let (mut world, v) = choice_world();
        world.set(v, "mode", "c").unwrap();
        world.set_choices(v, "mode", &["x", "y"]);
        assert_eq!(world.get(v, "mode"), &Value::from("x"));
    }

    #[test]
    fn removing_the_current_choice_resets() {
        let (mut world, v) = choice_world();
        world.set(v, "mode", "b").unwrap();
        world.remove_choice(v, "mode", "b");
        assert_eq!(world.get(v, "mode"), &Value::from("a"));
        assert_eq!(world.choices(v, "mode"), vec!["a", "c"]);
    }

    #[test]
    fn add_choice_extends_the_set() {
        let (mut world, v) = choice_world();
        world.add_choice(v, "mode", "d");
        assert!(world.choice_enabled(v, "mode", "d"));
        world.set(v, "mode", "d").unwrap();
    }

    #[test]
    fn empty_set_clears_the_value() {
        let (mut world, v) = choice_world();
        world.set_choices(v, "mode", &[]);
        assert_eq!(world.get(v, "mode"), &Value::Nothing);
    }

    #[test]
    fn choice_set_change_is_observable() {
        let (mut world, v) = choice_world();
        let seen = Rc::new(core::cell::RefCell::new(0usize));
        let c = Rc::clone(&seen);
        world.add_attribute_listener(v, "mode", "watch", move |_, event| {
            if event.attribute == keys::CHOICES {
                *c.borrow_mut() += 1;
            }
            Ok(())
        });
        world.set_choices(v, "mode", &["p", "q"]);
        assert_eq!(*seen.borrow(), 1);
    }
}
