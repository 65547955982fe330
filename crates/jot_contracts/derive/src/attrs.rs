//! `#[json(...)]` attribute parsing.

use syn::{Attribute, LitBool, LitInt, LitStr, Path};

pub(crate) static JSON_ATTRIBUTE_NAME: &str = "json";

/// Container-level attributes.
#[derive(Default)]
pub(crate) struct ContainerAttrs {
    /// `#[json(default)]`: build instances with `Default` and populate
    /// member by member instead of collecting a member bag.
    pub default: bool,
    /// `#[json(create_with = path)]`: a `fn() -> Self` factory.
    pub create_with: Option<Path>,
    pub null: Option<PolicyWord>,
    pub loops: Option<PolicyWord>,
    pub preserve_refs: Option<bool>,
    pub type_names: Option<PolicyWord>,
}

/// Field-level attributes.
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub rename: Option<String>,
    pub required: bool,
    pub ignore: bool,
    pub order: Option<i32>,
    pub default: bool,
    pub extension: bool,
    pub null: Option<PolicyWord>,
    pub loops: Option<PolicyWord>,
    pub preserve_refs: Option<bool>,
    pub type_names: Option<PolicyWord>,
    pub convert_with: Option<Path>,
}

/// Variant-level attributes on unit enums.
#[derive(Default)]
pub(crate) struct VariantAttrs {
    pub rename: Option<String>,
}

/// A policy name plus the span it was written at, validated later against
/// the policy enum it configures.
pub(crate) struct PolicyWord {
    pub word: String,
    pub span: proc_macro2::Span,
}

fn policy_word(meta: &syn::meta::ParseNestedMeta) -> syn::Result<PolicyWord> {
    let lit: LitStr = meta.value()?.parse()?;
    Ok(PolicyWord {
        word: lit.value(),
        span: lit.span(),
    })
}

impl ContainerAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(JSON_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    out.default = true;
                } else if meta.path.is_ident("create_with") {
                    out.create_with = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("null") {
                    out.null = Some(policy_word(&meta)?);
                } else if meta.path.is_ident("loops") {
                    out.loops = Some(policy_word(&meta)?);
                } else if meta.path.is_ident("preserve_refs") {
                    out.preserve_refs = Some(parse_optional_bool(&meta)?);
                } else if meta.path.is_ident("type_names") {
                    out.type_names = Some(policy_word(&meta)?);
                } else {
                    return Err(meta.error("unknown container attribute"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(JSON_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.rename = Some(lit.value());
                } else if meta.path.is_ident("required") {
                    out.required = true;
                } else if meta.path.is_ident("ignore") {
                    out.ignore = true;
                } else if meta.path.is_ident("order") {
                    let lit: LitInt = meta.value()?.parse()?;
                    out.order = Some(lit.base10_parse()?);
                } else if meta.path.is_ident("default") {
                    out.default = true;
                } else if meta.path.is_ident("extension") {
                    out.extension = true;
                } else if meta.path.is_ident("null") {
                    out.null = Some(policy_word(&meta)?);
                } else if meta.path.is_ident("loops") {
                    out.loops = Some(policy_word(&meta)?);
                } else if meta.path.is_ident("preserve_refs") {
                    out.preserve_refs = Some(parse_optional_bool(&meta)?);
                } else if meta.path.is_ident("type_names") {
                    out.type_names = Some(policy_word(&meta)?);
                } else if meta.path.is_ident("convert_with") {
                    out.convert_with = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unknown field attribute"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

impl VariantAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(JSON_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.rename = Some(lit.value());
                } else {
                    return Err(meta.error("unknown variant attribute"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

/// `preserve_refs` alone means `true`; `preserve_refs = false` turns the
/// inherited setting off for this scope.
fn parse_optional_bool(meta: &syn::meta::ParseNestedMeta) -> syn::Result<bool> {
    if meta.input.peek(syn::Token![=]) {
        let lit: LitBool = meta.value()?.parse()?;
        Ok(lit.value())
    } else {
        Ok(true)
    }
}
