//! Encode and decode expressions for properties.
//!
//! All generated code goes through the `kvmodel` runtime helpers by absolute
//! path, so units never depend on what the declaring module imports.

use proc_macro2::TokenStream;
use quote::quote;

use super::naming::field_ident;
use crate::model::{DiscriminatorModel, PropertyModel, TypeKind, TypeNode};

/// Expression of type `AttributeValue` for `expr: &T`.
pub fn encode_value(node: &TypeNode, expr: TokenStream) -> TokenStream {
    let ty = &node.ty;
    match &node.kind {
        TypeKind::Scalar(_) => quote!(::kvmodel::convert::ScalarAttribute::to_attribute(#expr)),
        TypeKind::DateTime { ttl: false } => {
            quote!(::kvmodel::utils::datetime::encode_datetime(#expr))
        }
        TypeKind::DateTime { ttl: true } => quote!(::kvmodel::utils::datetime::encode_ttl(#expr)),
        TypeKind::Optional(inner) => {
            let encoded = encode_value(inner, quote!(v));
            quote! {
                match #expr {
                    ::core::option::Option::Some(v) => #encoded,
                    ::core::option::Option::None => ::kvmodel::AttributeValue::Null(true),
                }
            }
        }
        TypeKind::List(element) => {
            let encoded = encode_value(element, quote!(v));
            quote!(::kvmodel::convert::encode_list(#expr, |v| #encoded))
        }
        // Sets below the top level cannot be omitted; an empty one is NULL.
        TypeKind::Set { .. } => quote! {
            ::kvmodel::convert::encode_set(#expr).unwrap_or(::kvmodel::AttributeValue::Null(true))
        },
        TypeKind::Map { value, .. } => {
            let encoded = encode_value(value, quote!(v));
            quote!(::kvmodel::convert::encode_map(#expr, |v| #encoded))
        }
        TypeKind::Nested(_) => quote!(::kvmodel::convert::encode_nested(#expr)),
        TypeKind::Custom { converter } => quote! {
            <#converter as ::kvmodel::convert::AttributeConverter<#ty>>::to_attribute(#expr)
        },
    }
}

/// Expression of type `Result<T, ConversionError>` for `value: &AttributeValue`.
pub fn decode_value(node: &TypeNode, value: TokenStream) -> TokenStream {
    let ty = &node.ty;
    match &node.kind {
        TypeKind::Scalar(_) => {
            quote!(<#ty as ::kvmodel::convert::ScalarAttribute>::from_attribute(#value))
        }
        TypeKind::DateTime { ttl: false } => {
            quote!(::kvmodel::utils::datetime::decode_datetime(#value))
        }
        TypeKind::DateTime { ttl: true } => quote!(::kvmodel::utils::datetime::decode_ttl(#value)),
        TypeKind::Optional(inner) => {
            let decoded = decode_value(inner, quote!(v));
            quote! {
                match #value {
                    v if v.is_null() => ::core::result::Result::Ok(::core::option::Option::None),
                    v => #decoded.map(::core::option::Option::Some),
                }
            }
        }
        TypeKind::List(element) => {
            let decoded = decode_value(element, quote!(v));
            quote!(::kvmodel::convert::decode_list(#value, |v| #decoded))
        }
        TypeKind::Set { element, .. } => {
            let element_ty = &element.ty;
            quote! {
                match #value {
                    v if v.is_null() => ::core::result::Result::Ok(::core::default::Default::default()),
                    v => ::kvmodel::convert::decode_set::<#ty, #element_ty>(v),
                }
            }
        }
        TypeKind::Map { value: entry, .. } => {
            let decoded = decode_value(entry, quote!(v));
            quote!(::kvmodel::convert::decode_map::<#ty, _, _>(#value, |v| #decoded))
        }
        TypeKind::Nested(_) => quote!(::kvmodel::convert::decode_nested::<#ty>(#value)),
        TypeKind::Custom { converter } => quote! {
            <#converter as ::kvmodel::convert::AttributeConverter<#ty>>::from_attribute(#value)
        },
    }
}

fn key_format_tokens(property: &PropertyModel) -> Option<(TokenStream, String)> {
    let format = property.key_format.as_ref()?;
    let prefix = format.prefix.as_ref()?;
    Some((quote!(::core::option::Option::Some(#prefix)), format.separator.clone()))
}

/// Expression of type `AttributeValue` for a non-optional property read
/// from `expr: &T`, key prefix applied.
pub fn encode_property_value(property: &PropertyModel, node: &TypeNode, expr: TokenStream) -> TokenStream {
    match key_format_tokens(property) {
        Some((prefix, separator)) => quote! {
            ::kvmodel::AttributeValue::S(::kvmodel::keys::format_key(#prefix, #separator, #expr))
        },
        None => encode_value(node, expr),
    }
}

/// Statement adding the property of `self` to `item`. Absent optional
/// values and empty sets are omitted.
pub fn encode_statement(property: &PropertyModel) -> TokenStream {
    let field = field_ident(&property.name);
    let attribute = &property.attribute;
    let node = &property.ty;

    let (inner, access, optional) = match &node.kind {
        TypeKind::Optional(inner) => (inner.as_ref(), quote!(v), true),
        _ => (node, quote!(&self.#field), false),
    };

    let insert = match &inner.kind {
        TypeKind::Set { .. } if !property.is_prefixed_key() => quote! {
            if let ::core::option::Option::Some(encoded) = ::kvmodel::convert::encode_set(#access) {
                item.insert(#attribute.to_string(), encoded);
            }
        },
        _ => {
            let encoded = encode_property_value(property, inner, access);
            quote!(item.insert(#attribute.to_string(), #encoded);)
        }
    };

    if optional {
        quote! {
            if let ::core::option::Option::Some(v) = &self.#field {
                #insert
            }
        }
    } else {
        insert
    }
}

/// Expression of type `Result<T, ConversionError>` decoding a property
/// value from `value: &AttributeValue`, key prefix removed.
fn decode_property_value(property: &PropertyModel, node: &TypeNode, value: TokenStream) -> TokenStream {
    match key_format_tokens(property) {
        Some((prefix, separator)) => {
            let ty = &node.ty;
            quote! {
                #value.as_s()
                    .and_then(|raw| ::kvmodel::keys::parse_key(#prefix, #separator, raw))
                    .and_then(::kvmodel::keys::parse_component::<#ty>)
            }
        }
        None => decode_value(node, value),
    }
}

/// Field initializer `name: <expr>` reading the property from `item`.
pub fn decode_field(property: &PropertyModel) -> TokenStream {
    let field = field_ident(&property.name);
    let attribute = &property.attribute;
    let node = &property.ty;

    match &node.kind {
        TypeKind::Optional(inner) => {
            let decoded = decode_property_value(property, inner, quote!(v));
            quote! {
                #field: match ::kvmodel::convert::optional(item, #attribute) {
                    ::core::option::Option::Some(v) => ::core::option::Option::Some(
                        (#decoded).map_err(|e| e.at(#attribute))?,
                    ),
                    ::core::option::Option::None => ::core::option::Option::None,
                }
            }
        }
        // Empty sets are never written, so a missing set is an empty one.
        TypeKind::Set { .. } => {
            let decoded = decode_value(node, quote!(v));
            quote! {
                #field: match ::kvmodel::convert::optional(item, #attribute) {
                    ::core::option::Option::Some(v) => (#decoded).map_err(|e| e.at(#attribute))?,
                    ::core::option::Option::None => ::core::default::Default::default(),
                }
            }
        }
        _ => {
            let decoded = decode_property_value(property, node, quote!(v));
            quote! {
                #field: ::kvmodel::convert::required(item, #attribute)
                    .and_then(|v| #decoded)
                    .map_err(|e| e.at(#attribute))?
            }
        }
    }
}

/// Statement inserting a discriminator no property holds.
pub fn encode_discriminator(discriminator: &DiscriminatorModel) -> Option<TokenStream> {
    if discriminator.property.is_some() {
        return None;
    }
    let attribute = &discriminator.attribute;
    let value = &discriminator.value;
    Some(quote! {
        item.insert(#attribute.to_string(), ::kvmodel::AttributeValue::S(#value.to_string()));
    })
}

/// Statement returning `DiscriminatorMismatch` unless `item` carries a
/// matching discriminator.
pub fn verify_discriminator(discriminator: &DiscriminatorModel) -> TokenStream {
    let attribute = &discriminator.attribute;
    let value = &discriminator.value;
    quote! {
        let tag = ::kvmodel::hydration::record_tag(item, ::core::option::Option::Some(#attribute));
        if !tag.is_some_and(|tag| ::kvmodel::hydration::pattern_matches(#value, tag)) {
            return ::core::result::Result::Err(::kvmodel::ConversionError::DiscriminatorMismatch {
                attribute: #attribute.to_string(),
                expected: #value.to_string(),
                found: tag.map(::std::string::ToString::to_string),
            });
        }
    }
}
