//! Projection units.

use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use super::GenerationContext;
use super::entity::{discriminator_literal, property_metadata};
use super::imports::module_scope;
use super::mapping::{decode_field, verify_discriminator};
use super::naming::{item_path, static_prefix};
use crate::model::ProjectionModel;

pub fn projection_unit(context: &GenerationContext<'_>, model: &ProjectionModel) -> TokenStream {
    let scope = module_scope(context.scan, &model.module_path);
    let projection = item_path(&model.module_path, &model.name);
    let source = item_path(&model.source_module_path, &model.source);

    let prefix = static_prefix(&model.name);
    let properties_ident = format_ident!("{}_PROPERTIES", prefix);
    let metadata_ident = format_ident!("{}_METADATA", prefix);
    let property_count = Literal::usize_unsuffixed(model.properties.len());
    let properties = model.properties.iter().map(property_metadata);

    let type_name = &model.name;
    let table = match context.entities.get(&model.source).and_then(|e| e.table_name()) {
        Some(table) => quote!(::core::option::Option::Some(#table)),
        None => quote!(::core::option::Option::None),
    };
    let discriminator = discriminator_literal(model.discriminator.as_ref());
    let attributes = &model.attributes;
    let verify = model.discriminator.as_ref().map(verify_discriminator);
    let decodes = model.properties.iter().map(decode_field);

    quote! {
        #scope

        pub static #properties_ident: [::kvmodel::traits::PropertyMetadata; #property_count] = [
            #(#properties),*
        ];

        pub static #metadata_ident: ::kvmodel::traits::EntityMetadata = ::kvmodel::traits::EntityMetadata {
            type_name: #type_name,
            table: #table,
            properties: &#properties_ident,
            discriminator: #discriminator,
            relations: &[],
        };

        impl ::kvmodel::Projection for #projection {
            type Source = #source;

            const TYPE_NAME: &'static str = #type_name;

            const ATTRIBUTES: &'static [&'static str] = &[#(#attributes),*];

            fn from_item(item: &::kvmodel::AttributeMap) -> ::core::result::Result<Self, ::kvmodel::ConversionError> {
                #verify
                ::core::result::Result::Ok(Self {
                    #(#decodes,)*
                })
            }

            fn metadata() -> &'static ::kvmodel::traits::EntityMetadata {
                &#metadata_ident
            }
        }
    }
}
