//! Table units: the merged index descriptors of one table.

use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use crate::analyze::{IndexDescriptorModel, IndexKeyModel, TableModel};
use crate::model::{IndexProjectionModel, ScalarKind};

use super::naming::{index_accessor, table_struct};

fn index_key(key: &IndexKeyModel) -> TokenStream {
    let attribute = &key.attribute;
    let kind = match key.kind {
        ScalarKind::String | ScalarKind::Bool => quote!(String),
        ScalarKind::Number => quote!(Number),
        ScalarKind::Binary => quote!(Binary),
    };
    let prefix = match &key.format.prefix {
        Some(prefix) => quote!(::core::option::Option::Some(#prefix)),
        None => quote!(::core::option::Option::None),
    };
    let separator = &key.format.separator;
    quote! {
        ::kvmodel::index::IndexKey {
            attribute: #attribute,
            kind: ::kvmodel::traits::AttributeKind::#kind,
            format: ::kvmodel::traits::KeyFormat {
                prefix: #prefix,
                separator: #separator,
            },
        }
    }
}

fn descriptor(index: &IndexDescriptorModel) -> TokenStream {
    let name = &index.name;
    let table = &index.table;
    let entities = &index.entities;
    let partition_key = index_key(&index.partition_key);
    let sort_key = match &index.sort_key {
        Some(key) => {
            let key = index_key(key);
            quote!(::core::option::Option::Some(#key))
        }
        None => quote!(::core::option::Option::None),
    };
    let projection = match &index.projection {
        IndexProjectionModel::KeysOnly => quote!(::kvmodel::index::IndexProjection::KeysOnly),
        IndexProjectionModel::Attributes(attributes) => {
            quote!(::kvmodel::index::IndexProjection::Include(&[#(#attributes),*]))
        }
        // Unresolved type projections never reach a descriptor.
        IndexProjectionModel::All | IndexProjectionModel::Type(_) => {
            quote!(::kvmodel::index::IndexProjection::All)
        }
    };
    let projection_type = match &index.projection_type {
        Some(ty) => quote!(::core::option::Option::Some(#ty)),
        None => quote!(::core::option::Option::None),
    };
    quote! {
        ::kvmodel::index::IndexDescriptor {
            name: #name,
            table: #table,
            entities: &[#(#entities),*],
            partition_key: #partition_key,
            sort_key: #sort_key,
            projection: #projection,
            projection_type: #projection_type,
        }
    }
}

pub fn table_unit(table: &TableModel) -> TokenStream {
    let table_ident = table_struct(&table.name);
    let name = &table.name;
    let entities = &table.entities;
    let default_entity = match &table.default_entity {
        Some(entity) => quote!(::core::option::Option::Some(#entity)),
        None => quote!(::core::option::Option::None),
    };
    let count = Literal::usize_unsuffixed(table.indexes.len());
    let descriptors = table.indexes.values().map(descriptor);
    let accessors = table.indexes.values().enumerate().map(|(position, index)| {
        let position = Literal::usize_unsuffixed(position);
        let accessor = format_ident!("{}", index_accessor(&index.name));
        let doc = format!("The `{}` index.", index.name);
        quote! {
            #[doc = #doc]
            pub fn #accessor() -> &'static ::kvmodel::index::IndexDescriptor {
                &INDEXES[#position]
            }
        }
    });
    let doc = format!("Schema of the `{name}` table.");

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct #table_ident;

        static INDEXES: [::kvmodel::index::IndexDescriptor; #count] = [
            #(#descriptors),*
        ];

        impl ::kvmodel::index::TableSchema for #table_ident {
            const NAME: &'static str = #name;

            const ENTITIES: &'static [&'static str] = &[#(#entities),*];

            const DEFAULT_ENTITY: ::core::option::Option<&'static str> = #default_entity;

            fn indexes() -> &'static [::kvmodel::index::IndexDescriptor] {
                &INDEXES
            }
        }

        impl #table_ident {
            #(#accessors)*
        }
    }
}
