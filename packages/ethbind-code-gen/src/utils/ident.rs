use proc_macro2::{Ident, Span};

/// Expands a identifier string into an token.
pub fn ident(name: &str) -> Ident {
    Ident::new(name, Span::call_site())
}

/// Whether `name` can be used verbatim as a Rust identifier. Keywords, `_` and
/// anything syn refuses to parse as an `Ident` are rejected.
pub fn is_valid_ident(name: &str) -> bool {
    syn::parse_str::<Ident>(name).is_ok()
}
