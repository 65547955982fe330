//! Expansion for unit-only enums, mapped to JSON strings.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DataEnum, DeriveInput, Fields, Ident};

use crate::attrs::VariantAttrs;
use crate::struct_kind::auto_register;

struct VariantModel<'a> {
    ident: &'a Ident,
    /// The declared name, or the `rename` override.
    wire: String,
}

pub(crate) fn expand(ast: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream> {
    let ident = &ast.ident;

    let mut models = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.ident.span(),
                "`Mapped` enums must have unit variants only",
            ));
        }
        let attrs = VariantAttrs::parse(&variant.attrs)?;
        models.push(VariantModel {
            ident: &variant.ident,
            wire: attrs.rename.unwrap_or_else(|| variant.ident.to_string()),
        });
    }
    if models.is_empty() {
        return Err(syn::Error::new(
            ident.span(),
            "`Mapped` enums must have at least one variant",
        ));
    }

    let named = impl_named(ident);
    let shaped = impl_shaped(ident, &models);
    let node = impl_node(ident);
    let scalar_node = impl_scalar_node(ident, &models);
    let register = auto_register(ident);

    Ok(quote! {
        const _: () = {
            #named
            #shaped
            #node
            #scalar_node
            #register
        };
    })
}

fn impl_named(ident: &Ident) -> TokenStream {
    let name = ident.to_string();
    quote! {
        impl jot_contracts::shape::Named for #ident {
            fn type_path() -> &'static str {
                ::core::concat!(::core::module_path!(), "::", #name)
            }

            fn type_name() -> &'static str {
                #name
            }
        }
    }
}

fn impl_shaped(ident: &Ident, models: &[VariantModel<'_>]) -> TokenStream {
    let arms = models.iter().map(|model| {
        let wire = &model.wire;
        let variant = model.ident;
        quote! {
            #wire => ::core::result::Result::Ok(::std::boxed::Box::new(#ident::#variant)),
        }
    });

    quote! {
        impl jot_contracts::shape::Shaped for #ident {
            fn shape() -> &'static jot_contracts::shape::Shape {
                static SHAPE: ::std::sync::OnceLock<jot_contracts::shape::Shape> =
                    ::std::sync::OnceLock::new();
                SHAPE.get_or_init(|| {
                    jot_contracts::shape::Shape::Scalar(
                        jot_contracts::shape::ScalarShape::new::<#ident>(
                            jot_contracts::__macro_exports::ScalarKind::String,
                            |scalar| match scalar {
                                jot_contracts::__macro_exports::Scalar::Str(text) => {
                                    match text.as_str() {
                                        #(#arms)*
                                        other => ::core::result::Result::Err(
                                            jot_contracts::shape::ConstructError::Failed(
                                                ::std::format!(
                                                    "`{other}` is not a variant of `{}`",
                                                    <#ident as jot_contracts::shape::Named>::type_path(),
                                                ),
                                            ),
                                        ),
                                    }
                                }
                                other => ::core::result::Result::Err(
                                    jot_contracts::shape::ConstructError::Failed(
                                        ::std::format!(
                                            "expected a string for `{}`, got {}",
                                            <#ident as jot_contracts::shape::Named>::type_path(),
                                            jot_contracts::__macro_exports::scalar_kind(&other),
                                        ),
                                    ),
                                ),
                            },
                        ),
                    )
                })
            }
        }
    }
}

fn impl_node(ident: &Ident) -> TokenStream {
    quote! {
        impl jot_contracts::node::Node for #ident {
            fn shape(&self) -> &'static jot_contracts::shape::Shape {
                <#ident as jot_contracts::shape::Shaped>::shape()
            }

            fn node_ref(&self) -> jot_contracts::node::NodeRef<'_> {
                jot_contracts::node::NodeRef::Scalar(
                    <#ident as jot_contracts::ops::ScalarNode>::get(self),
                )
            }

            fn node_mut(&mut self) -> jot_contracts::node::NodeMut<'_> {
                jot_contracts::node::NodeMut::Scalar(self)
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::core::any::Any> {
                self
            }
        }
    }
}

fn impl_scalar_node(ident: &Ident, models: &[VariantModel<'_>]) -> TokenStream {
    let get_arms = models.iter().map(|model| {
        let wire = &model.wire;
        let variant = model.ident;
        quote! {
            #ident::#variant => jot_contracts::__macro_exports::Scalar::Str(
                ::std::borrow::ToOwned::to_owned(#wire),
            ),
        }
    });

    let set_arms = models.iter().map(|model| {
        let wire = &model.wire;
        let variant = model.ident;
        quote! {
            #wire => {
                *self = #ident::#variant;
                ::core::result::Result::Ok(())
            }
        }
    });

    quote! {
        impl jot_contracts::ops::ScalarNode for #ident {
            fn get(&self) -> jot_contracts::__macro_exports::Scalar {
                match self {
                    #(#get_arms)*
                }
            }

            fn set(
                &mut self,
                value: jot_contracts::__macro_exports::Scalar,
            ) -> ::core::result::Result<(), jot_contracts::ops::OpsError> {
                match value {
                    jot_contracts::__macro_exports::Scalar::Str(text) => {
                        match text.as_str() {
                            #(#set_arms)*
                            other => ::core::result::Result::Err(
                                jot_contracts::ops::OpsError::UnknownVariant {
                                    value: other.to_owned(),
                                    target: <#ident as jot_contracts::shape::Named>::type_path(),
                                },
                            ),
                        }
                    }
                    other => ::core::result::Result::Err(
                        jot_contracts::ops::OpsError::TypeMismatch {
                            expected: <#ident as jot_contracts::shape::Named>::type_path(),
                            actual: jot_contracts::__macro_exports::scalar_kind(&other),
                        },
                    ),
                }
            }
        }
    }
}
