#![deny(unsafe_code)]

//! Procedural macros for ndg.
//!
//! - `#[derive(Sensitive)]`: redact credential fields in `Debug` output and
//!   zeroize them on drop.

extern crate proc_macro;

mod sensitive;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derive macro for message payloads that carry credentials.
///
/// Fields annotated with `#[sensitive]` display as `[REDACTED]` in the
/// generated `Debug` implementation and are wiped with `zeroize` when the
/// value is dropped. At least one field must be marked.
///
/// Because the generated code implements `Drop`, fields cannot be moved out
/// of the struct by destructuring; borrow or clone them instead.
///
/// # Example
///
/// ```ignore
/// use ndg_macros::Sensitive;
///
/// #[derive(Sensitive)]
/// struct WifiConnect {
///     pub ssid: String,
///     #[sensitive]
///     pub password: String,
/// }
/// ```
#[proc_macro_derive(Sensitive, attributes(sensitive))]
pub fn derive_sensitive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    sensitive::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
