//! Attribute checks shared by the derives and the attribute macros.
//!
//! The build pipeline performs the full analysis and generates all code.
//! The macros only reject attribute syntax that the pipeline could not have
//! parsed either, so the error lands on the offending tokens in the editor.

use kvmodel_codegen::scan::attributes::{parse_entity_attrs, parse_field_attrs};
use proc_macro2::TokenStream;
use syn::{Data, DeriveInput, Fields};

fn fields(input: &DeriveInput) -> Option<&Fields> {
    match &input.data {
        Data::Struct(data) => Some(&data.fields),
        _ => None,
    }
}

/// Collect every malformed attribute on the item and its fields.
pub fn declaration_errors(input: &DeriveInput) -> Vec<syn::Error> {
    let (_, mut errors) = parse_entity_attrs(&input.attrs);
    if let Some(fields) = fields(input) {
        for field in fields {
            let (_, field_errors) = parse_field_attrs(&field.attrs);
            errors.extend(field_errors);
        }
    }
    errors
}

/// Fold the errors into `compile_error!` invocations.
pub fn into_tokens(errors: Vec<syn::Error>) -> TokenStream {
    errors.into_iter().map(|e| e.to_compile_error()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn well_formed_declaration() {
        let input: DeriveInput = parse_quote! {
            #[table(name = "commerce", default_entity)]
            #[secondary_index(name = "StageIndex", keys_only)]
            pub struct Order {
                #[partition_key(prefix = "ORDER")]
                #[attribute("pk")]
                pub id: String,
                #[index_partition_key(name = "StageIndex")]
                pub stage: String,
                #[ttl]
                pub expires: i64,
            }
        };
        assert!(declaration_errors(&input).is_empty());
    }

    #[test]
    fn malformed_attributes_are_collected() {
        let input: DeriveInput = parse_quote! {
            #[table(title = "commerce")]
            pub struct Order {
                #[partition_key(prefix = 3)]
                pub id: String,
                #[ttl(seconds)]
                pub expires: i64,
                #[attribute("")]
                pub stage: String,
            }
        };
        assert_eq!(declaration_errors(&input).len(), 4);
    }

    #[test]
    fn non_struct_items_only_check_type_attributes() {
        let input: DeriveInput = parse_quote! {
            #[table(name = "commerce")]
            pub enum Stage {
                Open,
                Closed,
            }
        };
        assert!(declaration_errors(&input).is_empty());
        assert!(into_tokens(Vec::new()).is_empty());
    }
}
