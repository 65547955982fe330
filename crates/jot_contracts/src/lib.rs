#![doc = include_str!("../README.md")]

// -----------------------------------------------------------------------------
// Extern Self

// The derive macro emits `jot_contracts::...` paths; this alias lets the
// same expansion work inside this crate's own tests.
extern crate self as jot_contracts;

// -----------------------------------------------------------------------------
// Modules

mod cell;

pub mod contract;
pub mod convert;
pub mod handle;
pub mod impls;
pub mod naming;
pub mod node;
pub mod ops;
pub mod registry;
pub mod resolver;
pub mod shape;
pub mod value;

// -----------------------------------------------------------------------------
// Top-level exports

pub use contract::{
    ArrayContract, Contract, ContractKind, LoopHandling, MapContract, NullHandling,
    ObjectContract, OptContract, Property, SharedContract, TypeNameHandling,
};
pub use convert::{ConvertError, Converter};
pub use handle::Shared;
pub use jot_derive as derive;
pub use jot_derive::Mapped;
pub use naming::{
    CamelCaseNaming, IdentityNaming, KebabCaseNaming, NamingStrategy, SnakeCaseNaming,
};
pub use node::{Node, NodeMut, NodeRef};
pub use registry::{Registration, Registry};
pub use resolver::{ContractResolver, DefaultContractResolver, ResolveError};
pub use shape::{Named, Shape, Shaped, TypeIdent};
pub use value::{Number, Value};

#[cfg(feature = "auto_register")]
pub use registry::AutoRegistration;

// Re-exported for the code generated by `#[derive(Mapped)]`. Not public API.
#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use inventory;

    pub use crate::cell::StaticCell;
    pub use jot_tokens::{Scalar, ScalarKind};

    /// The kind of a scalar as error-message text.
    pub fn scalar_kind(scalar: &Scalar) -> &'static str {
        crate::impls::scalar_kind_str(scalar)
    }
}
