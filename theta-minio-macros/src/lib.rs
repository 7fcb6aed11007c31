// lib.rs - Root of macro crate
use proc_macro::TokenStream;

mod persistence;

/// Implements `theta_minio::grain::PersistentGrain`.
///
/// The grain type tag defaults to the type's name and can be set with
/// `#[grain_type("...")]`. The persisted state defaults to `Self` and can be
/// set with `#[grain_state(Type)]`.
#[proc_macro_derive(PersistentGrain, attributes(grain_type, grain_state))]
pub fn derive_persistent_grain(input: TokenStream) -> TokenStream {
    persistence::derive_persistent_grain_impl(input)
}
