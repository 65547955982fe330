use core::fmt;
use std::collections::HashMap;

use crate::node::Node;
use crate::shape::Shaped;

// -----------------------------------------------------------------------------
// Construct

/// How instances of an object type come into being during deserialization.
///
/// The derive macro picks the variant from the type's attributes:
/// `#[json(create_with = path)]` wins, then the generated member-bag
/// constructor, then `#[json(default)]` for create-then-populate. Types
/// that opt out of all three are non-instantiable and fail on first use.
pub enum Construct {
    /// Build the instance from collected member values.
    FromBag(fn(&mut MemberBag) -> Result<Box<dyn Node>, ConstructError>),
    /// A user factory producing a blank instance, populated afterwards.
    Factory(fn() -> Box<dyn Node>),
    /// `Default::default()`, populated afterwards.
    Empty(fn() -> Box<dyn Node>),
    NonInstantiable,
}

impl fmt::Debug for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Construct::FromBag(_) => "FromBag",
            Construct::Factory(_) => "Factory",
            Construct::Empty(_) => "Empty",
            Construct::NonInstantiable => "NonInstantiable",
        };
        f.write_str(label)
    }
}

// -----------------------------------------------------------------------------
// MemberBag

/// Member values collected from the wire, keyed by declared field name,
/// handed to a [`Construct::FromBag`] constructor.
#[derive(Default)]
pub struct MemberBag {
    entries: HashMap<&'static str, Box<dyn Node>>,
}

impl MemberBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, node: Box<dyn Node>) {
        self.entries.insert(name, node);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn take_node(&mut self, name: &str) -> Option<Box<dyn Node>> {
        self.entries.remove(name)
    }

    /// Removes and downcasts the value for `name`.
    pub fn take<T: Node + Shaped>(&mut self, name: &'static str) -> Result<T, ConstructError> {
        match self.take_node(name) {
            Some(node) => match node.into_any().downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(_) => Err(ConstructError::Mismatch {
                    member: name,
                    expected: T::type_path(),
                }),
            },
            None => Err(ConstructError::MissingMember(name)),
        }
    }

    /// Like [`take`](Self::take), but absent members yield `None`.
    pub fn take_opt<T: Node + Shaped>(
        &mut self,
        name: &'static str,
    ) -> Result<Option<T>, ConstructError> {
        if !self.contains(name) {
            return Ok(None);
        }
        self.take(name).map(Some)
    }
}

// -----------------------------------------------------------------------------
// ConstructError

#[derive(Debug)]
pub enum ConstructError {
    /// A member the constructor needs was not on the wire.
    MissingMember(&'static str),
    /// A collected member had the wrong runtime type.
    Mismatch {
        member: &'static str,
        expected: &'static str,
    },
    /// The type declared no way to build instances.
    NotInstantiable(&'static str),
    /// A user factory or scalar coercion refused the value.
    Failed(String),
}

impl fmt::Display for ConstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructError::MissingMember(name) => {
                write!(f, "member `{name}` is required to construct the value")
            }
            ConstructError::Mismatch { member, expected } => {
                write!(f, "member `{member}` is not a `{expected}`")
            }
            ConstructError::NotInstantiable(path) => {
                write!(f, "`{path}` cannot be instantiated")
            }
            ConstructError::Failed(msg) => f.write_str(msg),
        }
    }
}

impl core::error::Error for ConstructError {}
