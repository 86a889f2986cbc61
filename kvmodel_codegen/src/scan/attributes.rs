//! Parsers for the declaration attributes.
//!
//! Each parser returns a typed view of one attribute or a `syn::Error`
//! spanned on the offending tokens. The same parsers back both the build
//! time scanner and the derive macros, so a malformed attribute is reported
//! identically by both.

use syn::{Attribute, Ident, LitBool, LitStr, Meta, Path, Token, punctuated::Punctuated};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorAttr {
    pub attribute: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAttr {
    pub name: String,
    pub default_entity: bool,
    pub discriminator: Option<DiscriminatorAttr>,
}

/// `#[partition_key(...)]` / `#[sort_key(...)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyAttr {
    pub prefix: Option<String>,
    pub separator: Option<String>,
}

/// `#[index_partition_key(...)]` / `#[index_sort_key(...)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKeyAttr {
    pub index: String,
    pub format: KeyAttr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexProjectionDecl {
    KeysOnly,
    /// Rust property names.
    Properties(Vec<String>),
    /// A `#[derive(Projection)]` type supplying the attribute list.
    Type(Path),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryIndexAttr {
    pub name: String,
    pub projection: Option<IndexProjectionDecl>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityAttrs {
    pub table: Option<TableAttr>,
    pub secondary_indexes: Vec<SecondaryIndexAttr>,
    pub projection_source: Option<Path>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAttrs {
    pub partition_key: Option<KeyAttr>,
    pub sort_key: Option<KeyAttr>,
    pub attribute: Option<String>,
    pub index_partition_keys: Vec<IndexKeyAttr>,
    pub index_sort_keys: Vec<IndexKeyAttr>,
    pub related: Option<String>,
    pub converter: Option<Path>,
    pub ttl: bool,
    pub sensitive: bool,
    pub encrypted: bool,
    pub skip: bool,
}

impl FieldAttrs {
    pub fn has_key_marker(&self) -> bool {
        self.partition_key.is_some() || self.sort_key.is_some()
    }

    pub fn has_index_marker(&self) -> bool {
        !self.index_partition_keys.is_empty() || !self.index_sort_keys.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateOperationAttr {
    pub specialize: bool,
}

impl Default for TemplateOperationAttr {
    fn default() -> Self {
        Self { specialize: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityBuilderAttr {
    pub entity: Path,
    pub operations: Option<Vec<String>>,
    pub capabilities: Vec<String>,
}

fn is_bare(attr: &Attribute) -> bool {
    matches!(attr.meta, Meta::Path(_))
}

fn string_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<String> {
    Ok(meta.value()?.parse::<LitStr>()?.value())
}

fn last_segment_is(path: &Path, name: &str) -> bool {
    path.segments.last().is_some_and(|s| s.ident == name)
}

pub fn parse_table(attr: &Attribute) -> syn::Result<TableAttr> {
    let mut name = None;
    let mut default_entity = false;
    let mut discriminator = None;

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            name = Some(string_value(&meta)?);
        } else if meta.path.is_ident("default_entity") {
            default_entity = true;
        } else if meta.path.is_ident("discriminator") {
            let mut attribute = None;
            let mut value = None;
            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("attribute") {
                    attribute = Some(string_value(&inner)?);
                } else if inner.path.is_ident("value") {
                    value = Some(string_value(&inner)?);
                } else {
                    return Err(inner.error("expected `attribute` or `value`"));
                }
                Ok(())
            })?;
            discriminator = Some(DiscriminatorAttr {
                attribute: attribute.ok_or_else(|| meta.error("discriminator needs `attribute`"))?,
                value: value.ok_or_else(|| meta.error("discriminator needs `value`"))?,
            });
        } else {
            return Err(meta.error("expected `name`, `default_entity` or `discriminator`"));
        }
        Ok(())
    })?;

    let name = name.ok_or_else(|| syn::Error::new_spanned(attr, "#[table] requires `name = \"...\"`"))?;
    if name.is_empty() {
        return Err(syn::Error::new_spanned(attr, "table name cannot be empty"));
    }
    Ok(TableAttr {
        name,
        default_entity,
        discriminator,
    })
}

pub fn parse_key(attr: &Attribute) -> syn::Result<KeyAttr> {
    let mut key = KeyAttr::default();
    if is_bare(attr) {
        return Ok(key);
    }
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("prefix") {
            key.prefix = Some(string_value(&meta)?);
        } else if meta.path.is_ident("separator") {
            key.separator = Some(string_value(&meta)?);
        } else {
            return Err(meta.error("expected `prefix` or `separator`"));
        }
        Ok(())
    })?;
    Ok(key)
}

pub fn parse_index_key(attr: &Attribute) -> syn::Result<IndexKeyAttr> {
    let mut index = None;
    let mut format = KeyAttr::default();
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            index = Some(string_value(&meta)?);
        } else if meta.path.is_ident("prefix") {
            format.prefix = Some(string_value(&meta)?);
        } else if meta.path.is_ident("separator") {
            format.separator = Some(string_value(&meta)?);
        } else {
            return Err(meta.error("expected `name`, `prefix` or `separator`"));
        }
        Ok(())
    })?;
    let index = index.ok_or_else(|| syn::Error::new_spanned(attr, "index key requires `name = \"...\"`"))?;
    Ok(IndexKeyAttr { index, format })
}

pub fn parse_secondary_index(attr: &Attribute) -> syn::Result<SecondaryIndexAttr> {
    let mut name = None;
    let mut projection = None;
    let mut set_projection = |meta: &syn::meta::ParseNestedMeta, value| {
        if projection.is_some() {
            return Err(meta.error("only one of `projection`, `projection_type` and `keys_only` may be given"));
        }
        projection = Some(value);
        Ok(())
    };

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            name = Some(string_value(&meta)?);
        } else if meta.path.is_ident("keys_only") {
            set_projection(&meta, IndexProjectionDecl::KeysOnly)?;
        } else if meta.path.is_ident("projection_type") {
            let ty: Path = meta.value()?.parse()?;
            set_projection(&meta, IndexProjectionDecl::Type(ty))?;
        } else if meta.path.is_ident("projection") {
            let mut properties = Vec::new();
            meta.parse_nested_meta(|inner| {
                let ident = inner
                    .path
                    .get_ident()
                    .ok_or_else(|| inner.error("expected a property name"))?;
                properties.push(ident.to_string());
                Ok(())
            })?;
            set_projection(&meta, IndexProjectionDecl::Properties(properties))?;
        } else {
            return Err(meta.error(
                "expected `name`, `projection(...)`, `projection_type` or `keys_only`",
            ));
        }
        Ok(())
    })?;

    let name = name.ok_or_else(|| syn::Error::new_spanned(attr, "#[secondary_index] requires `name = \"...\"`"))?;
    Ok(SecondaryIndexAttr { name, projection })
}

/// `#[related("LINE#*")]` or `#[related(pattern = "LINE#*")]`.
pub fn parse_related(attr: &Attribute) -> syn::Result<String> {
    let mut pattern = None;
    if let Ok(lit) = attr.parse_args::<LitStr>() {
        pattern = Some(lit.value());
    } else {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("pattern") {
                pattern = Some(string_value(&meta)?);
                Ok(())
            } else {
                Err(meta.error("expected `pattern` or a string literal"))
            }
        })?;
    }
    match pattern {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(syn::Error::new_spanned(attr, "#[related] requires a non-empty `pattern`")),
    }
}

pub fn parse_projection(attr: &Attribute) -> syn::Result<Path> {
    let mut source = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("source") {
            source = Some(meta.value()?.parse::<Path>()?);
            Ok(())
        } else {
            Err(meta.error("expected `source`"))
        }
    })?;
    source.ok_or_else(|| syn::Error::new_spanned(attr, "#[projection] requires `source = Entity`"))
}

fn parse_flag(attr: &Attribute, name: &str) -> syn::Result<bool> {
    if is_bare(attr) {
        Ok(true)
    } else {
        Err(syn::Error::new_spanned(attr, format!("#[{name}] takes no arguments")))
    }
}

/// Parse the arguments of `#[template_operation(...)]`.
pub fn parse_template_operation_args(tokens: proc_macro2::TokenStream) -> syn::Result<TemplateOperationAttr> {
    let mut parsed = TemplateOperationAttr::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("specialize") {
            parsed.specialize = meta.value()?.parse::<LitBool>()?.value;
            Ok(())
        } else {
            Err(meta.error("expected `specialize = true|false`"))
        }
    });
    syn::parse::Parser::parse2(parser, tokens)?;
    Ok(parsed)
}

/// Parse the arguments of `#[entity_builder(...)]`.
pub fn parse_entity_builder_args(tokens: proc_macro2::TokenStream) -> syn::Result<EntityBuilderAttr> {
    let mut entity = None;
    let mut operations = None;
    let mut capabilities = Vec::new();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("entity") {
            entity = Some(meta.value()?.parse::<Path>()?);
        } else if meta.path.is_ident("operations") {
            let content;
            syn::parenthesized!(content in meta.input);
            let names = Punctuated::<Ident, Token![,]>::parse_terminated(&content)?;
            operations = Some(names.iter().map(Ident::to_string).collect());
        } else if meta.path.is_ident("capabilities") {
            let content;
            syn::parenthesized!(content in meta.input);
            let paths = Punctuated::<Path, Token![,]>::parse_terminated(&content)?;
            capabilities.extend(
                paths
                    .iter()
                    .filter_map(|p| p.segments.last())
                    .map(|s| s.ident.to_string()),
            );
        } else {
            return Err(meta.error("expected `entity`, `operations(...)` or `capabilities(...)`"));
        }
        Ok(())
    });
    syn::parse::Parser::parse2(parser, tokens.clone())?;
    let entity = entity.ok_or_else(|| syn::Error::new_spanned(&tokens, "#[entity_builder] requires `entity = Type`"))?;
    Ok(EntityBuilderAttr {
        entity,
        operations,
        capabilities,
    })
}

fn attribute_tokens(attr: &Attribute) -> proc_macro2::TokenStream {
    match &attr.meta {
        Meta::List(list) => list.tokens.clone(),
        _ => proc_macro2::TokenStream::new(),
    }
}

pub fn find_template_operation(attrs: &[Attribute]) -> Option<syn::Result<TemplateOperationAttr>> {
    attrs
        .iter()
        .find(|a| last_segment_is(a.path(), "template_operation"))
        .map(|a| parse_template_operation_args(attribute_tokens(a)))
}

pub fn find_entity_builder(attrs: &[Attribute]) -> Option<syn::Result<EntityBuilderAttr>> {
    attrs
        .iter()
        .find(|a| last_segment_is(a.path(), "entity_builder"))
        .map(|a| parse_entity_builder_args(attribute_tokens(a)))
}

/// Which kvmodel derives an item carries.
pub fn derives(attrs: &[Attribute]) -> (bool, bool) {
    let mut entity = false;
    let mut projection = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let Ok(paths) = attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated) else {
            continue;
        };
        for path in &paths {
            entity |= last_segment_is(path, "Entity");
            projection |= last_segment_is(path, "Projection");
        }
    }
    (entity, projection)
}

/// Parse the type-level attributes of an entity or projection.
pub fn parse_entity_attrs(attrs: &[Attribute]) -> (EntityAttrs, Vec<syn::Error>) {
    let mut parsed = EntityAttrs::default();
    let mut errors = Vec::new();

    for attr in attrs {
        let path = attr.path();
        if path.is_ident("table") {
            if parsed.table.is_some() {
                errors.push(syn::Error::new_spanned(attr, "duplicate #[table]"));
                continue;
            }
            match parse_table(attr) {
                Ok(table) => parsed.table = Some(table),
                Err(e) => errors.push(e),
            }
        } else if path.is_ident("secondary_index") {
            match parse_secondary_index(attr) {
                Ok(index) => parsed.secondary_indexes.push(index),
                Err(e) => errors.push(e),
            }
        } else if path.is_ident("projection") {
            match parse_projection(attr) {
                Ok(source) => parsed.projection_source = Some(source),
                Err(e) => errors.push(e),
            }
        }
    }

    (parsed, errors)
}

/// Parse the property-level attributes of one field.
pub fn parse_field_attrs(attrs: &[Attribute]) -> (FieldAttrs, Vec<syn::Error>) {
    let mut parsed = FieldAttrs::default();
    let mut errors = Vec::new();

    for attr in attrs {
        let Some(name) = attr.path().get_ident().map(Ident::to_string) else {
            continue;
        };
        let duplicate = || syn::Error::new_spanned(attr, format!("duplicate #[{name}]"));
        let result: syn::Result<()> = match name.as_str() {
            "partition_key" if parsed.partition_key.is_some() => Err(duplicate()),
            "partition_key" => parse_key(attr).map(|k| parsed.partition_key = Some(k)),
            "sort_key" if parsed.sort_key.is_some() => Err(duplicate()),
            "sort_key" => parse_key(attr).map(|k| parsed.sort_key = Some(k)),
            "attribute" if parsed.attribute.is_some() => Err(duplicate()),
            "attribute" => attr.parse_args::<LitStr>().and_then(|lit| {
                if lit.value().is_empty() {
                    Err(syn::Error::new_spanned(&lit, "attribute name cannot be empty"))
                } else {
                    parsed.attribute = Some(lit.value());
                    Ok(())
                }
            }),
            "index_partition_key" => {
                parse_index_key(attr).map(|k| parsed.index_partition_keys.push(k))
            }
            "index_sort_key" => parse_index_key(attr).map(|k| parsed.index_sort_keys.push(k)),
            "related" if parsed.related.is_some() => Err(duplicate()),
            "related" => parse_related(attr).map(|p| parsed.related = Some(p)),
            "converter" if parsed.converter.is_some() => Err(duplicate()),
            "converter" => attr.parse_args::<Path>().map(|p| parsed.converter = Some(p)),
            "ttl" => parse_flag(attr, "ttl").map(|f| parsed.ttl = f),
            "sensitive" => parse_flag(attr, "sensitive").map(|f| parsed.sensitive = f),
            "encrypted" => parse_flag(attr, "encrypted").map(|f| parsed.encrypted = f),
            "skip" => parse_flag(attr, "skip").map(|f| parsed.skip = f),
            _ => Ok(()),
        };
        if let Err(e) = result {
            errors.push(e);
        }
    }

    (parsed, errors)
}
