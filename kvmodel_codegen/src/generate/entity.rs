//! Entity units: conversion, metadata, field references, key builders and
//! hydration for one entity.

use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use super::GenerationContext;
use super::imports::module_scope;
use super::mapping::{decode_field, encode_discriminator, encode_property_value, encode_statement, verify_discriminator};
use super::naming::{attribute_const, field_ident, fields_struct, index_accessor, item_path, static_prefix};
use crate::model::{
    DiscriminatorModel, EntityModel, KeyFormat, KeyRole, PropertyModel, Relation, ScalarKind, TypeKind, TypeNode,
};

/// Value type a `Field` reference of this property compares against.
fn field_value_type(property: &PropertyModel, node: &TypeNode) -> TokenStream {
    match &node.kind {
        TypeKind::Optional(inner) => field_value_type(property, inner),
        _ if property.is_prefixed_key() => quote!(::std::string::String),
        TypeKind::DateTime { ttl: true } => quote!(i64),
        TypeKind::DateTime { ttl: false } => quote!(::std::string::String),
        _ => {
            let ty = &node.ty;
            quote!(#ty)
        }
    }
}

fn key_format_literal(format: Option<&KeyFormat>) -> TokenStream {
    match format {
        Some(KeyFormat { prefix, separator }) => {
            let prefix = match prefix {
                Some(prefix) => quote!(::core::option::Option::Some(#prefix)),
                None => quote!(::core::option::Option::None),
            };
            quote! {
                ::core::option::Option::Some(::kvmodel::traits::KeyFormat {
                    prefix: #prefix,
                    separator: #separator,
                })
            }
        }
        None => quote!(::core::option::Option::None),
    }
}

pub(crate) fn discriminator_literal(discriminator: Option<&DiscriminatorModel>) -> TokenStream {
    match discriminator {
        Some(DiscriminatorModel { attribute, value, .. }) => quote! {
            ::core::option::Option::Some(::kvmodel::traits::DiscriminatorMetadata {
                attribute: #attribute,
                value: #value,
            })
        },
        None => quote!(::core::option::Option::None),
    }
}

/// `PropertyMetadata` literal for one property.
pub(crate) fn property_metadata(property: &PropertyModel) -> TokenStream {
    let name = &property.name;
    let attribute = &property.attribute;
    let kind = format_ident!("{}", property.ty.attribute_kind());
    let nullable = property.nullable;
    let key_role = match property.key_role {
        Some(KeyRole::Partition) => quote!(::core::option::Option::Some(::kvmodel::traits::KeyRole::Partition)),
        Some(KeyRole::Sort) => quote!(::core::option::Option::Some(::kvmodel::traits::KeyRole::Sort)),
        None => quote!(::core::option::Option::None),
    };
    let key_format = key_format_literal(property.key_format.as_ref());
    let operations = format_ident!("{}", <&'static str>::from(property.operations));
    let indexes = &property.indexes;
    let sensitive = property.sensitive;
    let encrypted = property.encrypted;
    quote! {
        ::kvmodel::traits::PropertyMetadata {
            name: #name,
            attribute: #attribute,
            kind: ::kvmodel::traits::AttributeKind::#kind,
            nullable: #nullable,
            key_role: #key_role,
            key_format: #key_format,
            operations: ::kvmodel::traits::QueryOperator::#operations,
            indexes: &[#(#indexes),*],
            sensitive: #sensitive,
            encrypted: #encrypted,
        }
    }
}

fn relation_metadata(relation: &Relation) -> TokenStream {
    let name = &relation.field;
    let pattern = &relation.pattern;
    let target = &relation.target;
    let many = relation.many;
    quote! {
        ::kvmodel::traits::RelationMetadata {
            name: #name,
            pattern: #pattern,
            target: #target,
            many: #many,
        }
    }
}

/// `PROPERTIES`, `RELATIONS` and `METADATA` statics.
fn metadata_statics(model: &EntityModel) -> TokenStream {
    let prefix = static_prefix(&model.name);
    let properties_ident = format_ident!("{}_PROPERTIES", prefix);
    let relations_ident = format_ident!("{}_RELATIONS", prefix);
    let metadata_ident = format_ident!("{}_METADATA", prefix);

    let property_count = Literal::usize_unsuffixed(model.properties.len());
    let properties = model.properties.iter().map(property_metadata);
    let relation_count = Literal::usize_unsuffixed(model.relations.len());
    let relations = model.relations.iter().map(relation_metadata);

    let type_name = &model.name;
    let table = match model.table_name() {
        Some(table) => quote!(::core::option::Option::Some(#table)),
        None => quote!(::core::option::Option::None),
    };
    let discriminator = discriminator_literal(model.discriminator.as_ref());

    quote! {
        pub static #properties_ident: [::kvmodel::traits::PropertyMetadata; #property_count] = [
            #(#properties),*
        ];

        pub static #relations_ident: [::kvmodel::traits::RelationMetadata; #relation_count] = [
            #(#relations),*
        ];

        pub static #metadata_ident: ::kvmodel::traits::EntityMetadata = ::kvmodel::traits::EntityMetadata {
            type_name: #type_name,
            table: #table,
            properties: &#properties_ident,
            discriminator: #discriminator,
            relations: &#relations_ident,
        };
    }
}

fn item_convert(model: &EntityModel, entity: &TokenStream) -> TokenStream {
    let type_name = &model.name;
    let metadata_ident = format_ident!("{}_METADATA", static_prefix(&model.name));

    let encodes = model.properties.iter().map(encode_statement);
    let discriminator_insert = model.discriminator.as_ref().and_then(encode_discriminator);
    let verify = model.discriminator.as_ref().map(verify_discriminator);

    let decodes = model.properties.iter().map(decode_field);
    let defaults = model
        .relations
        .iter()
        .map(|r| r.field.as_str())
        .chain(model.skipped.iter().map(String::as_str))
        .map(field_ident);

    quote! {
        impl ::kvmodel::ItemConvert for #entity {
            const TYPE_NAME: &'static str = #type_name;

            fn to_item(&self) -> ::kvmodel::AttributeMap {
                let mut item = ::kvmodel::AttributeMap::new();
                #(#encodes)*
                #discriminator_insert
                item
            }

            fn from_item(item: &::kvmodel::AttributeMap) -> ::core::result::Result<Self, ::kvmodel::ConversionError> {
                #verify
                ::core::result::Result::Ok(Self {
                    #(#decodes,)*
                    #(#defaults: ::core::default::Default::default(),)*
                })
            }

            fn metadata() -> &'static ::kvmodel::traits::EntityMetadata {
                &#metadata_ident
            }
        }
    }
}

fn fields_struct_tokens(model: &EntityModel, entity: &TokenStream) -> TokenStream {
    let fields_ident = fields_struct(&model.name);
    let doc = format!("Typed attribute references of [`{}`].", model.name);
    let names: Vec<_> = model.properties.iter().map(|p| field_ident(&p.name)).collect();
    let types = model.properties.iter().map(|p| field_value_type(p, &p.ty));
    let attributes = model.properties.iter().map(|p| &p.attribute);

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Copy)]
        pub struct #fields_ident {
            #(pub #names: ::kvmodel::query::Field<#entity, #types>,)*
        }

        impl ::core::default::Default for #fields_ident {
            fn default() -> Self {
                Self {
                    #(#names: ::kvmodel::query::Field::new(#attributes),)*
                }
            }
        }

        impl ::kvmodel::EntityFields for #fields_ident {
            type Entity = #entity;
        }
    }
}

fn entity_impl(model: &EntityModel, entity: &TokenStream) -> TokenStream {
    let fields_ident = fields_struct(&model.name);
    let table = model.table_name().unwrap_or_default();
    let discriminator = discriminator_literal(model.discriminator.as_ref());

    let key_value = |property: &PropertyModel| {
        let field = field_ident(&property.name);
        encode_property_value(property, property.ty.non_optional(), quote!(&self.#field))
    };
    let partition_key = match model.partition_key_property() {
        Some(property) => key_value(property),
        None => quote!(::kvmodel::AttributeValue::Null(true)),
    };
    let partition_attribute = model
        .partition_key_property()
        .map(|p| p.attribute.as_str())
        .unwrap_or_default();
    let (sort_key, sort_insert) = match model.sort_key_property() {
        Some(property) => {
            let value = key_value(property);
            let attribute = &property.attribute;
            (
                quote!(::core::option::Option::Some(#value)),
                quote! {
                    if let ::core::option::Option::Some(sort_key) = ::kvmodel::Entity::sort_key(self) {
                        key.insert(#attribute.to_string(), sort_key);
                    }
                },
            )
        }
        None => (quote!(::core::option::Option::None), TokenStream::new()),
    };

    quote! {
        impl ::kvmodel::Entity for #entity {
            type Fields = #fields_ident;

            const TABLE: &'static str = #table;

            const DISCRIMINATOR: ::core::option::Option<::kvmodel::traits::DiscriminatorMetadata> = #discriminator;

            fn partition_key(&self) -> ::kvmodel::AttributeValue {
                #partition_key
            }

            fn sort_key(&self) -> ::core::option::Option<::kvmodel::AttributeValue> {
                #sort_key
            }

            fn key(&self) -> ::kvmodel::AttributeMap {
                let mut key = ::kvmodel::AttributeMap::new();
                key.insert(#partition_attribute.to_string(), ::kvmodel::Entity::partition_key(self));
                #sort_insert
                key
            }
        }
    }
}

/// A `build_*` routine, or nothing for binary keys.
fn key_builder(name: &syn::Ident, doc: &str, property: &PropertyModel, format: Option<&KeyFormat>) -> TokenStream {
    let prefix = format.and_then(|f| f.prefix.as_deref());
    if prefix.is_none() && property.ty.non_optional().key_scalar() == Some(ScalarKind::Binary) {
        return TokenStream::new();
    }
    let prefix = match prefix {
        Some(prefix) => quote!(::core::option::Option::Some(#prefix)),
        None => quote!(::core::option::Option::None),
    };
    let separator = format.map_or(crate::analyze::entity::DEFAULT_SEPARATOR, |f| f.separator.as_str());
    quote! {
        #[doc = #doc]
        pub fn #name(value: impl ::std::fmt::Display) -> ::std::string::String {
            ::kvmodel::keys::format_key(#prefix, #separator, value)
        }
    }
}

fn key_builders(model: &EntityModel) -> Vec<TokenStream> {
    let mut builders = Vec::new();
    if let Some(property) = model.partition_key_property() {
        builders.push(key_builder(
            &format_ident!("build_partition_key"),
            &format!("Formatted `{}` value.", property.attribute),
            property,
            property.key_format.as_ref(),
        ));
    }
    if let Some(property) = model.sort_key_property() {
        builders.push(key_builder(
            &format_ident!("build_sort_key"),
            &format!("Formatted `{}` value.", property.attribute),
            property,
            property.key_format.as_ref(),
        ));
    }
    for index in &model.indexes {
        let snake = index_accessor(&index.name);
        let keys = [("partition", Some(&index.partition_key)), ("sort", index.sort_key.as_ref())];
        for (role, binding) in keys {
            let Some(binding) = binding else {
                continue;
            };
            let property = &model.properties[binding.property];
            builders.push(key_builder(
                &format_ident!("build_{}_{}_key", snake, role),
                &format!("Formatted `{}` value for `{}`.", property.attribute, index.name),
                property,
                Some(&binding.format),
            ));
        }
    }
    builders
}

fn wire_constants(model: &EntityModel) -> TokenStream {
    let consts = model.properties.iter().map(|property| {
        let name = attribute_const(&property.attribute);
        let attribute = &property.attribute;
        quote!(pub const #name: &'static str = #attribute;)
    });
    let discriminator = model
        .discriminator
        .as_ref()
        .filter(|d| d.property.is_none())
        .map(|d| {
            let name = attribute_const(&d.attribute);
            let attribute = &d.attribute;
            quote!(pub const #name: &'static str = #attribute;)
        });
    quote! {
        #(#consts)*
        #discriminator
    }
}

fn hydrate(model: &EntityModel) -> TokenStream {
    if model.relations.is_empty() || !model.is_table_entity() {
        return TokenStream::new();
    }

    let slots: Vec<_> = model.relations.iter().map(|r| format_ident!("{}_records", r.field.trim_start_matches("r#"))).collect();
    let declarations = model.relations.iter().zip(&slots).map(|(relation, slot)| {
        let element = &relation.element;
        if relation.many {
            quote!(let mut #slot: ::std::vec::Vec<#element> = ::std::vec::Vec::new();)
        } else {
            quote!(let mut #slot: ::core::option::Option<#element> = ::core::option::Option::None;)
        }
    });
    let routes = model.relations.iter().zip(&slots).map(|(relation, slot)| {
        let element = &relation.element;
        let pattern = &relation.pattern;
        let decoded = quote!(<#element as ::kvmodel::ItemConvert>::from_item(item)?);
        let keep = if relation.many {
            quote!(#slot.push(#decoded);)
        } else {
            quote! {
                if #slot.is_none() {
                    #slot = ::core::option::Option::Some(#decoded);
                }
            }
        };
        quote! {
            if tag.is_some_and(|tag| ::kvmodel::hydration::pattern_matches(#pattern, tag)) {
                if options.include_relations {
                    #keep
                }
                continue;
            }
        }
    });
    let fields = model.relations.iter().map(|r| field_ident(&r.field));
    let doc = format!(
        "Assemble a [`{}`] from the records of one partition. Returns `None` when no root record is present.",
        model.name
    );

    quote! {
        #[doc = #doc]
        pub fn hydrate<'a, I>(
            items: I,
            options: &::kvmodel::config::HydrationOptions,
        ) -> ::core::result::Result<::core::option::Option<Self>, ::kvmodel::ConversionError>
        where
            I: ::core::iter::IntoIterator<Item = &'a ::kvmodel::AttributeMap>,
        {
            let metadata = <Self as ::kvmodel::ItemConvert>::metadata();
            let attribute = metadata.record_type_attribute();
            let mut root: ::core::option::Option<Self> = ::core::option::Option::None;
            #(#declarations)*

            for item in items {
                let tag = ::kvmodel::hydration::record_tag(item, attribute);
                #(#routes)*
                if root.is_none() && <Self as ::kvmodel::Entity>::is_record(item) {
                    root = ::core::option::Option::Some(<Self as ::kvmodel::ItemConvert>::from_item(item)?);
                    continue;
                }
                ::kvmodel::hydration::unknown_record(options, metadata, tag, item)?;
            }

            ::core::result::Result::Ok(root.map(|mut root| {
                #(root.#fields = #slots;)*
                root
            }))
        }
    }
}

/// Source of the unit for `model`.
pub fn entity_unit(context: &GenerationContext<'_>, model: &EntityModel) -> TokenStream {
    let scope = module_scope(context.scan, &model.module_path);
    let entity = item_path(&model.module_path, &model.name);

    let statics = metadata_statics(model);
    let convert = item_convert(model, &entity);
    let constants = wire_constants(model);
    let (fields, entity_impl, builders, hydrate) = if model.is_table_entity() {
        (
            fields_struct_tokens(model, &entity),
            entity_impl(model, &entity),
            key_builders(model),
            hydrate(model),
        )
    } else {
        (TokenStream::new(), TokenStream::new(), Vec::new(), TokenStream::new())
    };

    quote! {
        #scope

        #statics

        #fields

        #convert

        #entity_impl

        impl #entity {
            #constants

            #(#builders)*

            #hydrate
        }
    }
}
