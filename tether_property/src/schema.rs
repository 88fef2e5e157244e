// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property schemas.
//!
//! A [`Schema`] is the declaration of an object shape: an ordered set
//! of named [`PropertyDef`]s. Schemas are built once with a
//! [`SchemaBuilder`], wrapped in an `Rc`, and shared by every object
//! instantiated from them; all per-instance state (values, attribute
//! overrides, listeners) lives in the object's cells, never in the
//! schema.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::attrs::{AttrValue, Attrs, keys};
use crate::error::InvalidValue;
use crate::id::{ObjectId, PropId};
use crate::kind::{Kind, choice_attrs};
use crate::value::Value;
use crate::world::World;

/// A custom validation hook, run after the kind's own validation.
pub type ValidateFn = Rc<dyn Fn(&World, ObjectId, &Attrs, &Value) -> Result<(), InvalidValue>>;

/// A custom equality predicate, used to decide whether a write changed
/// the value.
pub type EqualityFn = Rc<dyn Fn(&Value, &Value) -> bool>;

/// A conditional requiredness predicate.
pub type RequiredFn = Rc<dyn Fn(&World, ObjectId) -> bool>;

/// Whether a property may hold "no value".
#[derive(Clone, Default)]
pub enum Required {
    /// [`Value::Nothing`] is always acceptable.
    #[default]
    No,
    /// [`Value::Nothing`] is always invalid.
    Always,
    /// Requiredness depends on the owning object's current state.
    When(RequiredFn),
}

impl core::fmt::Debug for Required {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::No => f.write_str("Required::No"),
            Self::Always => f.write_str("Required::Always"),
            Self::When(_) => f.write_str("Required::When(..)"),
        }
    }
}

/// The declaration of a single property: its kind, default, constraint
/// attributes, and validation policy.
#[derive(Clone)]
pub struct PropertyDef {
    kind: Kind,
    default: Option<Value>,
    required: Required,
    allow_invalid: bool,
    validate: Option<ValidateFn>,
    equality: Option<EqualityFn>,
    attrs: Attrs,
    item_attrs: Option<Attrs>,
    item_allow_invalid: bool,
}

impl PropertyDef {
    /// Creates a definition of the given kind, seeded with the kind's
    /// default attributes and policies.
    #[must_use]
    pub fn new(kind: Kind) -> Self {
        let attrs = kind.default_attrs();
        let allow_invalid = kind.default_allow_invalid();
        let item_attrs = kind.item_attrs();
        let item_allow_invalid = kind
            .item_kind()
            .map_or(true, |k| k.default_allow_invalid());
        Self {
            kind,
            default: None,
            required: Required::No,
            allow_invalid,
            validate: None,
            equality: None,
            attrs,
            item_attrs,
            item_allow_invalid,
        }
    }

    /// Sets the initial value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the requiredness policy.
    #[must_use]
    pub fn required(mut self, required: Required) -> Self {
        self.required = required;
        self
    }

    /// Sets whether invalid values are stored (with `valid = false`) or
    /// rejected.
    #[must_use]
    pub fn allow_invalid(mut self, allow: bool) -> Self {
        self.allow_invalid = allow;
        self
    }

    /// Adds a custom validation hook, run after the kind's validation.
    #[must_use]
    pub fn with_validator(
        mut self,
        validate: impl Fn(&World, ObjectId, &Attrs, &Value) -> Result<(), InvalidValue> + 'static,
    ) -> Self {
        self.validate = Some(Rc::new(validate));
        self
    }

    /// Replaces the change-detection equality predicate.
    #[must_use]
    pub fn with_equality(mut self, equality: impl Fn(&Value, &Value) -> bool + 'static) -> Self {
        self.equality = Some(Rc::new(equality));
        self
    }

    /// Sets one constraint attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.set(name, value);
        self
    }

    /// Sets one constraint attribute on item cells of a list-like kind.
    #[must_use]
    pub fn with_item_attr(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        if let Some(item_attrs) = &mut self.item_attrs {
            item_attrs.set(name, value);
        }
        self
    }

    /// Sets whether item cells store invalid values.
    #[must_use]
    pub fn item_allow_invalid(mut self, allow: bool) -> Self {
        self.item_allow_invalid = allow;
        self
    }

    /// Convenience: sets `minval` and `maxval`.
    #[must_use]
    pub fn range(self, min: f64, max: f64) -> Self {
        self.with_attr(keys::MINVAL, AttrValue::Real(min))
            .with_attr(keys::MAXVAL, AttrValue::Real(max))
    }

    /// Convenience: sets the `clamped` flag.
    #[must_use]
    pub fn clamped(self, clamped: bool) -> Self {
        self.with_attr(keys::CLAMPED, AttrValue::Bool(clamped))
    }

    /// Convenience: sets the choice set, all choices enabled.
    #[must_use]
    pub fn choices(self, choices: &[&str]) -> Self {
        let choices: Vec<String> = choices.iter().map(|c| (*c).to_string()).collect();
        let (set, flags) = choice_attrs(&choices);
        self.with_attr(keys::CHOICES, set)
            .with_attr(keys::CHOICE_ENABLED, flags)
    }

    /// The property's kind.
    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// The declared constraint attributes.
    #[must_use]
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// The attributes item cells of a list-like property start with.
    #[must_use]
    pub fn item_attrs(&self) -> Option<&Attrs> {
        self.item_attrs.as_ref()
    }

    /// Whether invalid values are stored rather than rejected.
    #[must_use]
    pub fn allows_invalid(&self) -> bool {
        self.allow_invalid
    }

    /// Whether item cells store invalid values.
    #[must_use]
    pub fn item_allows_invalid(&self) -> bool {
        self.item_allow_invalid
    }

    /// The value a fresh cell of this property holds. The declared
    /// default goes through the kind's cast, so a clamped number's
    /// default lands inside its range.
    #[must_use]
    pub fn initial_value(&self) -> Value {
        let raw = match &self.default {
            Some(v) => v.clone(),
            None => self.kind.default_value(&self.attrs),
        };
        match self.kind.cast(&self.attrs, raw.clone()) {
            Ok(v) => v,
            Err(_) => raw,
        }
    }

    /// Whether `a` and `b` count as the same value for change
    /// detection.
    #[must_use]
    pub fn values_equal(&self, a: &Value, b: &Value) -> bool {
        match &self.equality {
            Some(eq) => eq(a, b),
            None => self.kind.values_equal(a, b),
        }
    }

    /// Full validation: requiredness, then the kind's constraints, then
    /// the custom hook.
    ///
    /// `attrs` is the owning cell's current attribute map, which may
    /// have diverged from the declared [`Self::attrs`].
    pub fn validate_value(
        &self,
        world: &World,
        object: ObjectId,
        attrs: &Attrs,
        value: &Value,
    ) -> Result<(), InvalidValue> {
        let required = match &self.required {
            Required::No => false,
            Required::Always => true,
            Required::When(f) => f(world, object),
        };
        if required && value.is_nothing() {
            return Err(InvalidValue::new("a value is required"));
        }
        self.kind.validate(attrs, value)?;
        if let Some(validate) = &self.validate {
            validate(world, object, attrs, value)?;
        }
        Ok(())
    }
}

impl core::fmt::Debug for PropertyDef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PropertyDef")
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("allow_invalid", &self.allow_invalid)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

/// Prefix used for the synchronisation shadow of each property in a
/// syncable schema.
pub(crate) const SYNC_PREFIX: &str = "_sync_";

/// Returns the name of the shadow property tracking whether `name` is
/// synchronised to the parent.
#[must_use]
pub fn sync_property_name(name: &str) -> String {
    let mut s = String::with_capacity(SYNC_PREFIX.len() + name.len());
    s.push_str(SYNC_PREFIX);
    s.push_str(name);
    s
}

/// An immutable, shareable description of an object shape.
pub struct Schema {
    name: String,
    props: Vec<(String, PropertyDef)>,
    by_name: HashMap<String, PropId>,
    syncable: bool,
}

impl Schema {
    /// The schema's name, used in logging.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of declared properties, shadows included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.props.len()
    }

    /// Returns `true` if the schema declares no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Whether objects of this schema can participate in parent/child
    /// synchronisation.
    #[must_use]
    pub fn is_syncable(&self) -> bool {
        self.syncable
    }

    /// Looks up a property by name, shadows included.
    #[must_use]
    pub fn prop_id(&self, name: &str) -> Option<PropId> {
        self.by_name.get(name).copied()
    }

    /// The definition of the given property.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this schema.
    #[must_use]
    pub fn def(&self, id: PropId) -> &PropertyDef {
        &self.props[usize::from(id.index())].1
    }

    /// The name of the given property.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this schema.
    #[must_use]
    pub fn prop_name(&self, id: PropId) -> &str {
        &self.props[usize::from(id.index())].0
    }

    /// Iterates over `(id, name, def)` for every declared property,
    /// shadows included, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (PropId, &str, &PropertyDef)> {
        self.props.iter().enumerate().map(|(i, (name, def))| {
            (PropId::new(i as u16), name.as_str(), def)
        })
    }

    /// The names of the user-declared properties, in declaration order.
    /// Synchronisation shadows are excluded.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.props
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| !name.starts_with('_'))
    }

    /// The shadow property tracking whether `name` is synchronised, if
    /// this schema is syncable.
    #[must_use]
    pub fn sync_prop_id(&self, name: &str) -> Option<PropId> {
        self.prop_id(&sync_property_name(name))
    }
}

impl core::fmt::Debug for Schema {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("props", &self.props.len())
            .field("syncable", &self.syncable)
            .finish()
    }
}

/// Builds a [`Schema`].
///
/// # Examples
///
/// ```
/// use tether_property::{Kind, PropertyDef, SchemaBuilder};
///
/// let schema = SchemaBuilder::new("scene")
///     .property("visible", PropertyDef::new(Kind::Bool).with_default(true))
///     .property("opacity", PropertyDef::new(Kind::Percentage))
///     .build();
/// assert_eq!(schema.len(), 2);
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    props: Vec<(String, PropertyDef)>,
    syncable: bool,
}

impl SchemaBuilder {
    /// Starts a schema with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: Vec::new(),
            syncable: false,
        }
    }

    /// Declares a property.
    ///
    /// # Panics
    ///
    /// Panics if a property with this name was already declared, or if
    /// the name starts with `_` (reserved for shadows).
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, def: PropertyDef) -> Self {
        let name = name.into();
        assert!(
            !name.starts_with('_'),
            "property names starting with '_' are reserved: {name}"
        );
        assert!(
            !self.props.iter().any(|(n, _)| *n == name),
            "duplicate property {name}"
        );
        self.props.push((name, def));
        self
    }

    /// Marks the schema as syncable: each declared property gains a
    /// boolean `_sync_<name>` shadow, and objects of this schema may be
    /// created as synchronised children of one another.
    #[must_use]
    pub fn syncable(mut self) -> Self {
        self.syncable = true;
        self
    }

    /// Finishes the schema.
    ///
    /// # Panics
    ///
    /// Panics if more than `u16::MAX` properties were declared.
    #[must_use]
    pub fn build(mut self) -> Rc<Schema> {
        if self.syncable {
            let shadows: Vec<String> = self
                .props
                .iter()
                .map(|(name, _)| sync_property_name(name))
                .collect();
            for shadow in shadows {
                self.props
                    .push((shadow, PropertyDef::new(Kind::Bool).with_default(true)));
            }
        }
        assert!(
            u16::try_from(self.props.len()).is_ok(),
            "schema {} declares too many properties",
            self.name
        );
        let by_name = self
            .props
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), PropId::new(i as u16)))
            .collect();
        Rc::new(Schema {
            name: self.name,
            props: self.props,
            by_name,
            syncable: self.syncable,
        })
    }
}
