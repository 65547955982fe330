//! The `#[derive(Mapped)]` macro.

use proc_macro::TokenStream;
use syn::{Data, DeriveInput, Fields, parse_macro_input, spanned::Spanned};

// -----------------------------------------------------------------------------
// Modules

mod attrs;
mod enum_kind;
mod policies;
mod struct_kind;

// -----------------------------------------------------------------------------
// Macro

/// # JSON Mapping Derivation
///
/// `#[derive(Mapped)]` implements `Named`, `Shaped`, `Node` and the
/// kind-specific operations for:
///
/// - structs with named fields (mapped to JSON objects), and
/// - enums whose variants are all units (mapped to JSON strings).
///
/// Generic types are not supported; implement `Shaped` by hand for those.
///
/// ## Container attributes
///
/// ```rust, ignore
/// #[derive(Mapped)]
/// #[json(default)]                      // create-then-populate via Default
/// #[json(create_with = Foo::blank)]     // or: a fn() -> Self factory
/// #[json(null = "ignore")]              // omit null members on write
/// #[json(loops = "ignore")]             // drop cyclic edges instead of failing
/// #[json(preserve_refs)]                // emit $id/$ref for this type
/// #[json(type_names = "auto")]          // $type policy for members
/// struct Foo { /* ... */ }
/// ```
///
/// Without `default` or `create_with`, deserialization collects member
/// values and builds the instance in one step; non-`Option` fields without
/// `#[json(default)]` must then be present on the wire.
///
/// ## Field attributes
///
/// ```rust, ignore
/// #[derive(Mapped)]
/// struct Foo {
///     #[json(rename = "ID", required, order = 1)]
///     id: u64,
///     #[json(ignore)]
///     cached: usize,
///     #[json(default)]
///     note: String,
///     #[json(extension)]
///     extra: jot_contracts::Value,
///     #[json(convert_with = HexConverter)]
///     color: u32,
/// }
/// ```
///
/// `ignore`d fields need a `Default` value; `extension` marks the member
/// that soaks up unmatched wire members.
///
/// ## Enum variants
///
/// ```rust, ignore
/// #[derive(Mapped)]
/// enum Color {
///     Red,
///     #[json(rename = "BLUE")]
///     Blue,
/// }
/// ```
///
/// Variants serialize as their name (or rename) in a JSON string.
#[proc_macro_derive(Mapped, attributes(json))]
pub fn derive_mapped(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    if !ast.generics.params.is_empty() {
        return syn::Error::new(
            ast.generics.span(),
            "`Mapped` cannot be derived for generic types; implement `Shaped` by hand",
        )
        .into_compile_error()
        .into();
    }

    let expanded = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => struct_kind::expand(&ast, fields),
            _ => Err(syn::Error::new(
                ast.ident.span(),
                "`Mapped` requires named fields; tuple and unit structs are not mappable",
            )),
        },
        Data::Enum(data) => enum_kind::expand(&ast, data),
        Data::Union(_) => Err(syn::Error::new(
            ast.ident.span(),
            "`Mapped` cannot be derived for unions",
        )),
    };

    match expanded {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}
