//! Expansion for structs with named fields.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, FieldsNamed, Ident, Type};

use crate::attrs::{ContainerAttrs, FieldAttrs};
use crate::policies;

struct FieldModel<'a> {
    ident: &'a Ident,
    name: String,
    ty: &'a Type,
    attrs: FieldAttrs,
}

pub(crate) fn expand(ast: &DeriveInput, fields: &FieldsNamed) -> syn::Result<TokenStream> {
    let ident = &ast.ident;
    let container = ContainerAttrs::parse(&ast.attrs)?;

    let mut models = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let field_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new(ident.span(), "expected a named field"))?;
        models.push(FieldModel {
            ident: field_ident,
            name: field_ident.to_string(),
            ty: &field.ty,
            attrs: FieldAttrs::parse(&field.attrs)?,
        });
    }

    let named = impl_named(ident);
    let shaped = impl_shaped(ident, &container, &models)?;
    let node = impl_node(ident);
    let object_node = impl_object_node(ident, &models);
    let register = auto_register(ident);

    Ok(quote! {
        const _: () = {
            #named
            #shaped
            #node
            #object_node
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

fn impl_shaped(
    ident: &Ident,
    container: &ContainerAttrs,
    models: &[FieldModel<'_>],
) -> syn::Result<TokenStream> {
    let field_shapes = models
        .iter()
        .map(|model| field_shape(model))
        .collect::<syn::Result<Vec<_>>>()?;
    let construct = construct_expr(ident, container, models);
    let container_attrs = container_attrs_expr(container)?;

    Ok(quote! {
        impl jot_contracts::shape::Shaped for #ident {
            fn shape() -> &'static jot_contracts::shape::Shape {
                static SHAPE: ::std::sync::OnceLock<jot_contracts::shape::Shape> =
                    ::std::sync::OnceLock::new();
                SHAPE.get_or_init(|| {
                    jot_contracts::shape::Shape::Object(
                        jot_contracts::shape::ObjectShape::new::<#ident>(
                            ::std::vec![#(#field_shapes),*],
                            #construct,
                        )
                        .with_attrs(#container_attrs),
                    )
                })
            }
        }
    })
}

fn field_shape(model: &FieldModel<'_>) -> syn::Result<TokenStream> {
    let name = &model.name;
    let ty = model.ty;
    let attrs = &model.attrs;

    let rename = match &attrs.rename {
        Some(rename) => quote!(::core::option::Option::Some(#rename)),
        None => quote!(::core::option::Option::None),
    };
    let required = attrs.required;
    let ignore = attrs.ignore;
    let order = match attrs.order {
        Some(order) => quote!(::core::option::Option::Some(#order)),
        None => quote!(::core::option::Option::None),
    };
    let extension = attrs.extension;
    let null_handling = policies::null_handling(&attrs.null)?;
    let loop_handling = policies::loop_handling(&attrs.loops)?;
    let preserve_refs = policies::optional_bool(&attrs.preserve_refs);
    let type_names = policies::type_name_handling(&attrs.type_names)?;
    let converter = match &attrs.convert_with {
        Some(path) => quote! {
            ::core::option::Option::Some(
                (|| {
                    let converter: ::std::sync::Arc<dyn jot_contracts::convert::Converter> =
                        ::std::sync::Arc::new(<#path as ::core::default::Default>::default());
                    converter
                }) as fn() -> ::std::sync::Arc<dyn jot_contracts::convert::Converter>
            )
        },
        None => quote!(::core::option::Option::None),
    };

    Ok(quote! {
        jot_contracts::shape::FieldShape::new(
            #name,
            <#ty as jot_contracts::shape::Shaped>::shape,
        )
        .with_attrs(jot_contracts::shape::FieldAttrs {
            rename: #rename,
            required: #required,
            ignore: #ignore,
            order: #order,
            extension: #extension,
            null_handling: #null_handling,
            loop_handling: #loop_handling,
            preserve_refs: #preserve_refs,
            type_names: #type_names,
            converter: #converter,
        })
    })
}

fn container_attrs_expr(container: &ContainerAttrs) -> syn::Result<TokenStream> {
    let null_handling = policies::null_handling(&container.null)?;
    let loop_handling = policies::loop_handling(&container.loops)?;
    let preserve_refs = policies::optional_bool(&container.preserve_refs);
    let type_names = policies::type_name_handling(&container.type_names)?;
    Ok(quote! {
        jot_contracts::shape::ContainerAttrs {
            null_handling: #null_handling,
            loop_handling: #loop_handling,
            preserve_refs: #preserve_refs,
            type_names: #type_names,
        }
    })
}

fn construct_expr(
    ident: &Ident,
    container: &ContainerAttrs,
    models: &[FieldModel<'_>],
) -> TokenStream {
    if let Some(path) = &container.create_with {
        return quote! {
            jot_contracts::shape::Construct::Factory(|| ::std::boxed::Box::new(#path()))
        };
    }
    if container.default {
        return quote! {
            jot_contracts::shape::Construct::Empty(|| {
                ::std::boxed::Box::new(<#ident as ::core::default::Default>::default())
            })
        };
    }

    let inits = models.iter().map(|model| {
        let field_ident = model.ident;
        let name = &model.name;
        let ty = model.ty;
        if model.attrs.ignore {
            quote! { #field_ident: ::core::default::Default::default() }
        } else if model.attrs.default || model.attrs.extension {
            quote! {
                #field_ident: match bag.take_opt::<#ty>(#name)? {
                    ::core::option::Option::Some(v) => v,
                    ::core::option::Option::None => ::core::default::Default::default(),
                }
            }
        } else if is_option(ty) {
            quote! {
                #field_ident: bag
                    .take_opt::<#ty>(#name)?
                    .unwrap_or(::core::option::Option::None)
            }
        } else {
            quote! { #field_ident: bag.take::<#ty>(#name)? }
        }
    });

    quote! {
        jot_contracts::shape::Construct::FromBag(
            |bag: &mut jot_contracts::shape::MemberBag| {
                ::core::result::Result::Ok(::std::boxed::Box::new(#ident {
                    #(#inits),*
                }))
            }
        )
    }
}

fn impl_node(ident: &Ident) -> TokenStream {
    quote! {
        impl jot_contracts::node::Node for #ident {
            fn shape(&self) -> &'static jot_contracts::shape::Shape {
                <#ident as jot_contracts::shape::Shaped>::shape()
            }

            fn node_ref(&self) -> jot_contracts::node::NodeRef<'_> {
                jot_contracts::node::NodeRef::Object(self)
            }

            fn node_mut(&mut self) -> jot_contracts::node::NodeMut<'_> {
                jot_contracts::node::NodeMut::Object(self)
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

fn impl_object_node(ident: &Ident, models: &[FieldModel<'_>]) -> TokenStream {
    let field_len = models.len();

    let ref_arms = models.iter().map(|model| {
        let name = &model.name;
        let field_ident = model.ident;
        quote! {
            #name => ::core::option::Option::Some(&self.#field_ident),
        }
    });

    let mut_arms = models.iter().map(|model| {
        let name = &model.name;
        let field_ident = model.ident;
        quote! {
            #name => ::core::option::Option::Some(&mut self.#field_ident),
        }
    });

    let set_arms = models.iter().map(|model| {
        let name = &model.name;
        let field_ident = model.ident;
        let ty = model.ty;
        quote! {
            #name => {
                let actual = value.type_path();
                match value.into_any().downcast::<#ty>() {
                    ::core::result::Result::Ok(v) => {
                        self.#field_ident = *v;
                        ::core::result::Result::Ok(())
                    }
                    ::core::result::Result::Err(_) => ::core::result::Result::Err(
                        jot_contracts::ops::OpsError::TypeMismatch {
                            expected: <#ty as jot_contracts::shape::Named>::type_path(),
                            actual,
                        },
                    ),
                }
            }
        }
    });

    let at_arms = models.iter().enumerate().map(|(index, model)| {
        let field_ident = model.ident;
        quote! {
            #index => ::core::option::Option::Some(&self.#field_ident),
        }
    });

    let name_at_arms = models.iter().enumerate().map(|(index, model)| {
        let name = &model.name;
        quote! {
            #index => ::core::option::Option::Some(#name),
        }
    });

    quote! {
        impl jot_contracts::ops::ObjectNode for #ident {
            fn field(&self, name: &str) -> ::core::option::Option<&dyn jot_contracts::node::Node> {
                match name {
                    #(#ref_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_mut(
                &mut self,
                name: &str,
            ) -> ::core::option::Option<&mut dyn jot_contracts::node::Node> {
                match name {
                    #(#mut_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: ::std::boxed::Box<dyn jot_contracts::node::Node>,
            ) -> ::core::result::Result<(), jot_contracts::ops::OpsError> {
                match name {
                    #(#set_arms)*
                    other => ::core::result::Result::Err(
                        jot_contracts::ops::OpsError::UnknownMember(other.to_owned()),
                    ),
                }
            }

            fn field_len(&self) -> usize {
                #field_len
            }

            fn field_at(
                &self,
                index: usize,
            ) -> ::core::option::Option<&dyn jot_contracts::node::Node> {
                match index {
                    #(#at_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_name_at(&self, index: usize) -> ::core::option::Option<&'static str> {
                match index {
                    #(#name_at_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    }
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

#[cfg(feature = "auto_register")]
pub(crate) fn auto_register(ident: &Ident) -> TokenStream {
    quote! {
        jot_contracts::__macro_exports::inventory::submit! {
            jot_contracts::registry::AutoRegistration {
                shape: <#ident as jot_contracts::shape::Shaped>::shape,
            }
        }
    }
}

#[cfg(not(feature = "auto_register"))]
pub(crate) fn auto_register(_ident: &Ident) -> TokenStream {
    TokenStream::new()
}
