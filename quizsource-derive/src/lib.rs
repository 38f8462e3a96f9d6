//! A derive macro for the `Event` trait in the `quizsource` crate.
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Variant, parse_macro_input, spanned::Spanned};

/// Derives the `Event` trait for an enum.
///
/// Every variant must carry an explicit `#[event(name = "...")]` attribute.
/// That name is the wire discriminator: it is returned by `event_type`, listed
/// in `EVENT_TYPES` and matched by `from_payload`. Variants are either unit
/// variants (stored with an empty payload) or single-field tuple variants whose
/// field is serialized as the payload.
#[proc_macro_derive(Event, attributes(event))]
pub fn event_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct EventVariant<'a> {
    variant: &'a Variant,
    name: LitStr,
    has_payload: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;

    let data = match &input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "Event derive macro can only be used on enums",
            ));
        }
    };

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        let has_payload = match &variant.fields {
            Fields::Unit => false,
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => true,
            _ => {
                return Err(syn::Error::new(
                    variant.span(),
                    "event variants must be unit variants or single-field tuple variants",
                ));
            }
        };
        let name = event_name(variant)?;
        if variants
            .iter()
            .any(|v: &EventVariant<'_>| v.name.value() == name.value())
        {
            return Err(syn::Error::new(
                name.span(),
                format!("duplicate event name \"{}\"", name.value()),
            ));
        }
        variants.push(EventVariant {
            variant,
            name,
            has_payload,
        });
    }

    let names = variants.iter().map(|v| &v.name);

    let event_type_arms = variants.iter().map(|v| {
        let variant_ident = &v.variant.ident;
        let name = &v.name;
        if v.has_payload {
            quote! { #ident::#variant_ident(..) => #name }
        } else {
            quote! { #ident::#variant_ident => #name }
        }
    });

    let to_payload_arms = variants.iter().map(|v| {
        let variant_ident = &v.variant.ident;
        if v.has_payload {
            quote! {
                #ident::#variant_ident(payload) => ::quizsource::__private::serde_json::to_value(payload)
                    .map_err(|e| ::quizsource::Error::Store(e.to_string()))
            }
        } else {
            quote! {
                #ident::#variant_ident => ::std::result::Result::Ok(
                    ::quizsource::__private::serde_json::Value::Object(
                        ::quizsource::__private::serde_json::Map::new(),
                    ),
                )
            }
        }
    });

    let from_payload_arms = variants.iter().map(|v| {
        let variant_ident = &v.variant.ident;
        let name = &v.name;
        if v.has_payload {
            quote! {
                #name => ::quizsource::__private::serde_json::from_value(payload)
                    .map(#ident::#variant_ident)
                    .map_err(|e| ::quizsource::Error::Corruption(::std::format!(
                        "malformed payload for event type '{}': {}", #name, e
                    )))
            }
        } else {
            quote! { #name => ::std::result::Result::Ok(#ident::#variant_ident) }
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::quizsource::Event for #ident #ty_generics #where_clause {
            const EVENT_TYPES: &'static [&'static str] = &[#(#names),*];

            fn event_type(&self) -> &'static str {
                match self {
                    #(#event_type_arms),*
                }
            }

            fn to_payload(&self) -> ::quizsource::Result<::quizsource::__private::serde_json::Value> {
                match self {
                    #(#to_payload_arms),*
                }
            }

            fn from_payload(
                event_type: &str,
                payload: ::quizsource::__private::serde_json::Value,
            ) -> ::quizsource::Result<Self> {
                match event_type {
                    #(#from_payload_arms,)*
                    other => ::std::result::Result::Err(::quizsource::Error::Corruption(
                        ::std::format!("unknown event type '{}'", other),
                    )),
                }
            }
        }
    })
}

fn event_name(variant: &Variant) -> syn::Result<LitStr> {
    let mut name = None;
    for attr in variant.attrs.iter().filter(|a| a.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported event attribute, expected `name`"))
            }
        })?;
    }
    name.ok_or_else(|| {
        syn::Error::new(
            variant.span(),
            "missing #[event(name = \"...\")] attribute on event variant",
        )
    })
}
