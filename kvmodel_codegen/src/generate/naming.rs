//! Names and paths of generated items.

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::Ident;

pub fn entity_unit_module(entity: &str) -> String {
    format!("entity_{}", entity.to_snake_case())
}

pub fn projection_unit_module(projection: &str) -> String {
    format!("projection_{}", projection.to_snake_case())
}

pub fn table_unit_module(table: &str) -> String {
    format!("table_{}", table.to_snake_case())
}

pub fn wrapper_unit_module(builder: &str) -> String {
    format!("wrappers_{}", builder.to_snake_case())
}

pub fn fields_struct(entity: &str) -> Ident {
    format_ident!("{}Fields", entity)
}

pub fn table_struct(table: &str) -> Ident {
    format_ident!("{}Table", table.to_upper_camel_case())
}

/// Accessor and key-builder stem for an index, e.g. `stage_index`.
pub fn index_accessor(index: &str) -> String {
    index.to_snake_case()
}

/// Prefix for the `static` items of a unit, e.g. `ORDER_LINE`.
pub fn static_prefix(name: &str) -> String {
    name.to_shouty_snake_case()
}

/// Constant name for a wire attribute.
pub fn attribute_const(attribute: &str) -> Ident {
    let name = attribute.to_shouty_snake_case();
    match name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => Ident::new(&name, Span::call_site()),
        _ => format_ident!("ATTR_{}", name),
    }
}

/// Identifier for a declared field name, raw identifiers included.
pub fn field_ident(name: &str) -> Ident {
    match name.strip_prefix("r#") {
        Some(raw) => Ident::new_raw(raw, Span::call_site()),
        None => Ident::new(name, Span::call_site()),
    }
}

/// `crate::a::b` for a module path.
pub fn module_tokens(module_path: &[String]) -> TokenStream {
    let segments = module_path.iter().map(|s| field_ident(s));
    quote!(crate #(:: #segments)*)
}

/// `crate::a::b::Item` for an item declared in `module_path`.
pub fn item_path(module_path: &[String], item: &str) -> TokenStream {
    let module = module_tokens(module_path);
    let item = field_ident(item);
    quote!(#module::#item)
}

/// Path to an item of a generated unit, as seen from anywhere in the crate.
pub fn unit_item_path(module_root: &str, unit_module: &str, item: &Ident) -> TokenStream {
    let root: TokenStream = module_root
        .parse()
        .unwrap_or_else(|_| quote!(crate));
    let unit = field_ident(unit_module);
    quote!(#root::#unit::#item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_names() {
        assert_eq!(entity_unit_module("OrderLine"), "entity_order_line");
        assert_eq!(projection_unit_module("OrderSummary"), "projection_order_summary");
        assert_eq!(table_unit_module("commerce-main"), "table_commerce_main");
        assert_eq!(table_struct("commerce").to_string(), "CommerceTable");
        assert_eq!(attribute_const("gsi1pk").to_string(), "GSI1PK");
        assert_eq!(attribute_const("order-id").to_string(), "ORDER_ID");
        assert_eq!(attribute_const("1st").to_string(), "ATTR_1ST");
        assert_eq!(field_ident("r#type").to_string(), "r#type");
        assert_eq!(index_accessor("StageIndex"), index_accessor("stage_index"));
    }

    #[test]
    fn paths() {
        let path = item_path(&["models".to_string()], "Order");
        assert_eq!(path.to_string(), "crate :: models :: Order");
        let fields = unit_item_path("crate", "entity_order", &fields_struct("Order"));
        assert_eq!(fields.to_string(), "crate :: entity_order :: OrderFields");
    }
}
