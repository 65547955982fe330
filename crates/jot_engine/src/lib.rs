#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod binder;
mod error;
mod identity;
mod read;
mod recover;
mod serializer;
mod settings;
mod trace;
mod write;

// -----------------------------------------------------------------------------
// Exports

pub use binder::{RegistryBinder, TypeBinder};
pub use error::{ErrorContext, Fault, FaultKind};
pub use serializer::Serializer;
pub use settings::{ErrorHook, MetadataHandling, MissingMemberHandling, Settings};
pub use trace::{NullSink, TraceLevel, TraceSink, TracingSink};
