//! Mapping from attribute words to policy enum expressions.

use proc_macro2::TokenStream;
use quote::quote;

use crate::attrs::PolicyWord;

fn unknown(word: &PolicyWord, expected: &str) -> syn::Error {
    syn::Error::new(
        word.span,
        format!("unknown policy `{}`; expected one of {expected}", word.word),
    )
}

pub(crate) fn null_handling(word: &Option<PolicyWord>) -> syn::Result<TokenStream> {
    let Some(word) = word else {
        return Ok(quote!(::core::option::Option::None));
    };
    let variant = match word.word.as_str() {
        "include" => quote!(Include),
        "ignore" => quote!(Ignore),
        _ => return Err(unknown(word, "`include`, `ignore`")),
    };
    Ok(quote! {
        ::core::option::Option::Some(jot_contracts::contract::NullHandling::#variant)
    })
}

pub(crate) fn loop_handling(word: &Option<PolicyWord>) -> syn::Result<TokenStream> {
    let Some(word) = word else {
        return Ok(quote!(::core::option::Option::None));
    };
    let variant = match word.word.as_str() {
        "error" => quote!(Error),
        "ignore" => quote!(Ignore),
        "serialize" => quote!(Serialize),
        _ => return Err(unknown(word, "`error`, `ignore`, `serialize`")),
    };
    Ok(quote! {
        ::core::option::Option::Some(jot_contracts::contract::LoopHandling::#variant)
    })
}

pub(crate) fn type_name_handling(word: &Option<PolicyWord>) -> syn::Result<TokenStream> {
    let Some(word) = word else {
        return Ok(quote!(::core::option::Option::None));
    };
    let variant = match word.word.as_str() {
        "none" => quote!(None),
        "objects" => quote!(Objects),
        "auto" => quote!(Auto),
        "all" => quote!(All),
        "root" => quote!(Root),
        _ => {
            return Err(unknown(
                word,
                "`none`, `objects`, `auto`, `all`, `root`",
            ));
        }
    };
    Ok(quote! {
        ::core::option::Option::Some(jot_contracts::contract::TypeNameHandling::#variant)
    })
}

pub(crate) fn optional_bool(value: &Option<bool>) -> TokenStream {
    match value {
        Some(v) => quote!(::core::option::Option::Some(#v)),
        None => quote!(::core::option::Option::None),
    }
}
