//! Implementation of `#[derive(Sensitive)]`.
//!
//! Emits two impls for a struct with named fields:
//!
//! - `Debug`, printing `[REDACTED]` in place of every `#[sensitive]` field;
//! - `Drop`, calling `zeroize::Zeroize::zeroize()` on every `#[sensitive]` field.
//!
//! The consuming crate must have `zeroize` as a dependency.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Field, Result};

fn is_sensitive(field: &Field) -> bool {
    field.attrs.iter().any(|a| a.path().is_ident("sensitive"))
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Sensitive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Sensitive can only be derived for structs",
            ));
        }
    };

    let mut field_debug = Vec::with_capacity(fields.len());
    let mut zeroize_calls = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let field_name_str = field_name.to_string();

        if is_sensitive(field) {
            field_debug.push(quote! {
                .field(#field_name_str, &"[REDACTED]")
            });
            zeroize_calls.push(quote! {
                ::zeroize::Zeroize::zeroize(&mut self.#field_name);
            });
        } else {
            field_debug.push(quote! {
                .field(#field_name_str, &self.#field_name)
            });
        }
    }

    if zeroize_calls.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "Sensitive requires at least one #[sensitive] field",
        ));
    }

    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::std::fmt::Debug for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(#name_str)
                    #(#field_debug)*
                    .finish()
            }
        }

        impl #impl_generics ::std::ops::Drop for #name #ty_generics #where_clause {
            fn drop(&mut self) {
                #(#zeroize_calls)*
            }
        }
    })
}
