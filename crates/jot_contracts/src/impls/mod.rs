//! Built-in [`Shaped`](crate::Shaped) / [`Node`](crate::Node) impls for
//! primitives, `String`, dates, `Option`, `Vec`, string-keyed maps and the
//! handle types.

mod boxed;
mod date;
mod list;
mod map;
mod option;
mod scalars;
mod shared;

pub(crate) use scalars::scalar_kind_str;
