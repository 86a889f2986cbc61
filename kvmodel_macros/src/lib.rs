//! Declaration attributes for kvmodel data models.
//!
//! Nothing here generates code. `kvmodel_codegen` reads the annotated
//! sources from a build script and writes the generated units; these macros
//! register the helper attributes so the compiler accepts them, and report
//! malformed attribute syntax on the offending tokens.

use proc_macro::TokenStream;
use syn::{DeriveInput, Item, parse_macro_input};

mod validate;

/// Declares a struct as a kvmodel entity.
///
/// With a `#[table]` attribute the struct is a persisted entity and must
/// mark a partition key. Without one it is an embedded entity, stored as a
/// nested map inside the entities that hold it.
///
/// # Attributes
///
/// Type level:
///
/// - `#[table(name = "...", default_entity, discriminator(attribute = "...", value = "..."))]`
/// - `#[secondary_index(name = "...", projection(a, b) | projection_type = P | keys_only)]`
///
/// Field level:
///
/// - `#[partition_key(prefix = "...", separator = "...")]` - **Required** on persisted entities
/// - `#[sort_key(prefix = "...", separator = "...")]`
/// - `#[attribute("wire_name")]` - Overrides the stored attribute name
/// - `#[index_partition_key(name = "...")]` / `#[index_sort_key(name = "...")]`
/// - `#[related("PATTERN#*")]` - Hydrated from records whose tag matches the pattern
/// - `#[converter(path::To::Converter)]` - Custom `AttributeConverter`
/// - `#[ttl]` - Stored as epoch seconds
/// - `#[sensitive]` / `#[encrypted]`
/// - `#[skip]` - Never stored, restored with `Default`
///
/// # Examples
///
/// ```rust,ignore
/// use kvmodel::Entity;
///
/// #[derive(Debug, Clone, Entity)]
/// #[table(name = "commerce", default_entity)]
/// #[secondary_index(name = "StageIndex", keys_only)]
/// pub struct Order {
///     #[partition_key(prefix = "ORDER")]
///     #[attribute("pk")]
///     pub id: String,
///     #[sort_key]
///     #[attribute("sk")]
///     pub placed: String,
///     #[index_partition_key(name = "StageIndex")]
///     pub stage: String,
/// }
/// // Generated by the build script:
/// // impl ItemConvert for Order, impl Entity for Order,
/// // Order::build_partition_key(..), OrderFields, CommerceTable
/// ```
#[proc_macro_derive(
    Entity,
    attributes(
        table,
        secondary_index,
        partition_key,
        sort_key,
        attribute,
        index_partition_key,
        index_sort_key,
        related,
        converter,
        ttl,
        sensitive,
        encrypted,
        skip
    )
)]
pub fn entity_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    validate::into_tokens(validate::declaration_errors(&input)).into()
}

/// Declares a read-only subset of an entity's properties.
///
/// # Attributes
///
/// - `#[projection(source = Entity)]` - **Required**. The entity the properties come from
///
/// Every field must exist on the source with a compatible type. A field may
/// be made optional where the source property is required.
///
/// ```rust,ignore
/// #[derive(Debug, kvmodel::Projection)]
/// #[projection(source = Order)]
/// pub struct OrderSummary {
///     pub id: String,
///     pub amount: Option<u64>,
/// }
/// ```
#[proc_macro_derive(Projection, attributes(projection))]
pub fn projection_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    validate::into_tokens(validate::declaration_errors(&input)).into()
}

/// Marks a generic builder function as a template operation.
///
/// Template operations are forwarded as methods onto every
/// `#[entity_builder]` whose capabilities satisfy their bounds, with the
/// entity and its field struct substituted for the generic parameters.
/// `specialize = false` opts a template out of entity substitution.
///
/// ```rust,ignore
/// #[template_operation]
/// pub fn limit<B: RequestBuilder + Projectable>(mut builder: B, n: usize) -> B {
///     builder.request_mut().limit = Some(n);
///     builder
/// }
/// ```
#[proc_macro_attribute]
pub fn template_operation(args: TokenStream, input: TokenStream) -> TokenStream {
    if let Err(e) = kvmodel_codegen::scan::attributes::parse_template_operation_args(args.into()) {
        return with_error(e, input);
    }
    let item = parse_macro_input!(input as Item);
    match item {
        Item::Fn(_) => quote::quote!(#item).into(),
        other => with_error(
            syn::Error::new_spanned(&other, "#[template_operation] applies to functions"),
            quote::quote!(#other).into(),
        ),
    }
}

/// Binds a request builder to an entity.
///
/// # Attributes
///
/// - `entity = Type` - **Required**
/// - `operations(a, b)` - Restricts forwarding to the named templates
/// - `capabilities(Trait, ..)` - Capability traits implemented outside the scanned sources
///
/// ```rust,ignore
/// #[entity_builder(entity = Order, operations(limit, filter))]
/// pub struct OrderQuery {
///     request: Request<Order>,
/// }
/// ```
#[proc_macro_attribute]
pub fn entity_builder(args: TokenStream, input: TokenStream) -> TokenStream {
    match kvmodel_codegen::scan::attributes::parse_entity_builder_args(args.into()) {
        Ok(_) => input,
        Err(e) => with_error(e, input),
    }
}

fn with_error(error: syn::Error, input: TokenStream) -> TokenStream {
    let mut tokens: TokenStream = error.to_compile_error().into();
    tokens.extend(input);
    tokens
}
