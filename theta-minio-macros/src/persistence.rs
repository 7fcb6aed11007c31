// persistence.rs - Implementation module
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr, parse_macro_input};

/// Internal implementation of the PersistentGrain derive macro.
pub(crate) fn derive_persistent_grain_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_persistent_grain_impl(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

/// Generates the implementation tokens for the PersistentGrain trait.
fn generate_persistent_grain_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let grain_type = find_grain_type(input)?;
    let state_type = find_state_type(input)?;

    let expanded = quote! {
        impl #impl_generics ::theta_minio::grain::PersistentGrain for #name #ty_generics #where_clause {
            const GRAIN_TYPE: &'static str = #grain_type;

            type State = #state_type;
        }
    };

    Ok(expanded)
}

/// Finds the grain type tag from the `#[grain_type("...")]` attribute.
/// If not found, defaults to the name of the deriving type.
fn find_grain_type(input: &DeriveInput) -> syn::Result<LitStr> {
    for attr in &input.attrs {
        if attr.path().is_ident("grain_type") {
            let lit = attr.parse_args::<LitStr>()?;
            if lit.value().trim().is_empty() {
                return Err(syn::Error::new(lit.span(), "grain type must not be empty"));
            }
            return Ok(lit);
        }
    }

    Ok(LitStr::new(&input.ident.to_string(), input.ident.span()))
}

/// Finds the state type from the `#[grain_state(Type)]` attribute.
/// If not found, defaults to `Self`.
fn find_state_type(input: &DeriveInput) -> syn::Result<syn::Type> {
    for attr in &input.attrs {
        if attr.path().is_ident("grain_state") {
            return attr.parse_args::<syn::Type>();
        }
    }

    Ok(syn::parse_quote! { Self })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use syn::parse_quote;

    #[test]
    fn test_find_grain_type_default() {
        let input: DeriveInput = parse_quote! {
            struct UserGrain;
        };

        assert_eq!(find_grain_type(&input).unwrap().value(), "UserGrain");
    }

    #[test]
    fn test_find_grain_type_with_attribute() {
        let input: DeriveInput = parse_quote! {
            #[grain_type("accounts.User")]
            struct UserGrain;
        };

        assert_eq!(find_grain_type(&input).unwrap().value(), "accounts.User");
    }

    #[test]
    fn test_find_grain_type_rejects_empty() {
        let input: DeriveInput = parse_quote! {
            #[grain_type("  ")]
            struct UserGrain;
        };

        assert!(find_grain_type(&input).is_err());
    }

    #[test]
    fn test_find_state_type() {
        let input: DeriveInput = parse_quote! {
            #[grain_state(Balance)]
            struct UserGrain;
        };
        let state_type = find_state_type(&input).unwrap();
        let expected: syn::Type = parse_quote!(Balance);

        assert_eq!(
            quote!(#state_type).to_string(),
            quote!(#expected).to_string()
        );

        let input: DeriveInput = parse_quote! {
            struct UserGrain;
        };
        let state_type = find_state_type(&input).unwrap();

        assert_eq!(quote!(#state_type).to_string(), "Self");
    }

    #[test]
    fn test_generate_persistent_grain_impl() {
        let input: DeriveInput = parse_quote! {
            #[grain_type("UserGrain")]
            #[grain_state(Balance)]
            struct User<T> {
                field: T,
            }
        };

        let tokens = generate_persistent_grain_impl(&input).unwrap();
        let token_string = tokens.to_string();

        // Verify key components are present (accounting for spacing in token stream)
        assert!(
            token_string
                .contains("impl < T > :: theta_minio :: grain :: PersistentGrain for User < T >")
        );
        assert!(token_string.contains("const GRAIN_TYPE : & 'static str = \"UserGrain\""));
        assert!(token_string.contains("type State = Balance"));
    }
}
