//! Resolved contracts.
//!
//! A [`Contract`] is a [`Shape`] with policy applied: wire names from the
//! resolver's naming strategy, required-ness, ordering, per-member
//! overrides and converters. Contracts are immutable once published and
//! shared via `Arc` out of the resolver's cache.

use std::collections::HashMap;
use std::sync::Arc;

use jot_tokens::ScalarKind;

use crate::convert::Converter;
use crate::shape::{Construct, ObjectShape, Shape};

// -----------------------------------------------------------------------------
// Policies

/// What to do with `null`-valued members on write.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NullHandling {
    /// Write the member as `null`.
    #[default]
    Include,
    /// Omit the member.
    Ignore,
}

/// What to do when writing reaches a handle already on the open ancestor
/// stack.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LoopHandling {
    /// Fail the node.
    #[default]
    Error,
    /// Omit the cyclic edge and continue.
    Ignore,
    /// Write it anyway; the caller accepts unbounded output.
    Serialize,
}

/// When to embed `$type` discriminators.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TypeNameHandling {
    /// Never.
    #[default]
    None,
    /// On every object.
    Objects,
    /// Only when the runtime shape differs from the declared one.
    Auto,
    /// On objects, and on scalars and collections via `$value`/`$values`
    /// wrappers.
    All,
    /// On the root object only.
    Root,
}

// -----------------------------------------------------------------------------
// Contract

/// An immutable, policy-applied description of how a type maps to JSON.
#[derive(Debug)]
pub struct Contract {
    shape: &'static Shape,
    kind: ContractKind,
}

impl Contract {
    pub(crate) fn new(shape: &'static Shape, kind: ContractKind) -> Self {
        Self { shape, kind }
    }

    #[inline]
    pub fn shape(&self) -> &'static Shape {
        self.shape
    }

    #[inline]
    pub fn kind(&self) -> &ContractKind {
        &self.kind
    }

    pub fn as_object(&self) -> Option<&ObjectContract> {
        match &self.kind {
            ContractKind::Object(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ContractKind {
    Object(ObjectContract),
    Array(ArrayContract),
    Map(MapContract),
    Opt(OptContract),
    /// A leaf value; carries the wire kind it is written as.
    Primitive(ScalarKind),
    Shared(SharedContract),
    Dynamic,
}

// -----------------------------------------------------------------------------
// ObjectContract

/// The object half of a contract: ordered properties with wire names.
pub struct ObjectContract {
    pub(crate) shape: &'static ObjectShape,
    pub(crate) properties: Box<[Property]>,
    pub(crate) by_name: HashMap<String, usize>,
    pub(crate) extension_slot: Option<usize>,
}

impl ObjectContract {
    /// Properties in serialization order (explicit `order` first,
    /// ascending, then declaration order). Ignored members keep their
    /// entry so reads can drop their wire values silently.
    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Looks up a property by wire name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.by_name.get(name).map(|&i| &self.properties[i])
    }

    /// The extension-data property, if the type declared one.
    pub fn extension_slot(&self) -> Option<&Property> {
        self.extension_slot.map(|i| &self.properties[i])
    }

    #[inline]
    pub fn construct(&self) -> &'static Construct {
        self.shape.construct()
    }

    #[inline]
    pub fn object_shape(&self) -> &'static ObjectShape {
        self.shape
    }
}

impl core::fmt::Debug for ObjectContract {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectContract")
            .field("ty", &self.shape.ty())
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Collection contracts

/// Element contracts resolve lazily, on first use, so self-referential
/// generics terminate.
#[derive(Debug)]
pub struct ArrayContract {
    pub(crate) item: fn() -> &'static Shape,
}

impl ArrayContract {
    #[inline]
    pub fn item(&self) -> &'static Shape {
        (self.item)()
    }
}

#[derive(Debug)]
pub struct MapContract {
    pub(crate) value: fn() -> &'static Shape,
}

impl MapContract {
    #[inline]
    pub fn value(&self) -> &'static Shape {
        (self.value)()
    }
}

#[derive(Debug)]
pub struct OptContract {
    pub(crate) inner: fn() -> &'static Shape,
}

impl OptContract {
    #[inline]
    pub fn inner(&self) -> &'static Shape {
        (self.inner)()
    }
}

#[derive(Debug)]
pub struct SharedContract {
    pub(crate) inner: fn() -> &'static Shape,
    pub(crate) tracked: bool,
}

impl SharedContract {
    #[inline]
    pub fn inner(&self) -> &'static Shape {
        (self.inner)()
    }

    #[inline]
    pub fn tracked(&self) -> bool {
        self.tracked
    }
}

// -----------------------------------------------------------------------------
// Property

/// One serializable member of an object contract.
pub struct Property {
    pub(crate) declared: &'static str,
    pub(crate) name: String,
    pub(crate) required: bool,
    pub(crate) ignored: bool,
    pub(crate) order: Option<i32>,
    pub(crate) shape: fn() -> &'static Shape,
    pub(crate) null_handling: Option<NullHandling>,
    pub(crate) loop_handling: Option<LoopHandling>,
    pub(crate) preserve_refs: Option<bool>,
    pub(crate) type_names: Option<TypeNameHandling>,
    pub(crate) extension: bool,
    pub(crate) converter: Option<Arc<dyn Converter>>,
}

impl Property {
    /// The declared Rust field name.
    #[inline]
    pub fn declared(&self) -> &'static str {
        self.declared
    }

    /// The wire name, after rename and naming strategy.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required members missing on the wire are a fault.
    #[inline]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Ignored members are never written and their wire values are
    /// dropped on read.
    #[inline]
    pub fn ignored(&self) -> bool {
        self.ignored
    }

    #[inline]
    pub fn order(&self) -> Option<i32> {
        self.order
    }

    #[inline]
    pub fn shape(&self) -> &'static Shape {
        (self.shape)()
    }

    #[inline]
    pub fn null_handling(&self) -> Option<NullHandling> {
        self.null_handling
    }

    #[inline]
    pub fn loop_handling(&self) -> Option<LoopHandling> {
        self.loop_handling
    }

    #[inline]
    pub fn preserve_refs(&self) -> Option<bool> {
        self.preserve_refs
    }

    #[inline]
    pub fn type_names(&self) -> Option<TypeNameHandling> {
        self.type_names
    }

    /// Whether this member soaks up unmatched wire members.
    #[inline]
    pub fn extension(&self) -> bool {
        self.extension
    }

    #[inline]
    pub fn converter(&self) -> Option<&Arc<dyn Converter>> {
        self.converter.as_ref()
    }
}

impl core::fmt::Debug for Property {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Property")
            .field("declared", &self.declared)
            .field("name", &self.name)
            .field("required", &self.required)
            .field("order", &self.order)
            .field("extension", &self.extension)
            .field("converter", &self.converter.is_some())
            .finish_non_exhaustive()
    }
}
