//! Classification of declared Rust types into wire shapes.

use quote::ToTokens;
use syn::{GenericArgument, PathArguments, Type};

use crate::config::{ConverterRegistry, normalize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Bool,
    Number,
    Binary,
}

impl ScalarKind {
    /// Wire tag of the scalar, as used for key attributes.
    pub fn tag(self) -> &'static str {
        match self {
            ScalarKind::String => "S",
            ScalarKind::Bool => "BOOL",
            ScalarKind::Number => "N",
            ScalarKind::Binary => "B",
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Scalar(ScalarKind),
    /// `DateTime<Utc>`; stored as epoch seconds when `ttl` is set.
    DateTime { ttl: bool },
    Optional(Box<TypeNode>),
    List(Box<TypeNode>),
    Set { element: Box<TypeNode>, ordered: bool },
    /// String-keyed map.
    Map { value: Box<TypeNode>, ordered: bool },
    /// Another `#[derive(Entity)]` type, by simple name.
    Nested(String),
    Custom { converter: syn::Path },
}

/// A resolved type together with the type as declared.
#[derive(Debug, Clone)]
pub struct TypeNode {
    pub kind: TypeKind,
    pub ty: Type,
}

impl TypeNode {
    pub fn is_optional(&self) -> bool {
        matches!(self.kind, TypeKind::Optional(_))
    }

    /// The node under an `Option`, or the node itself.
    pub fn non_optional(&self) -> &TypeNode {
        match &self.kind {
            TypeKind::Optional(inner) => inner,
            _ => self,
        }
    }

    pub fn scalar(&self) -> Option<ScalarKind> {
        match self.kind {
            TypeKind::Scalar(kind) => Some(kind),
            _ => None,
        }
    }

    /// Key-capable scalar category (string, number or binary).
    pub fn key_scalar(&self) -> Option<ScalarKind> {
        self.scalar().filter(|k| *k != ScalarKind::Bool)
    }

    pub fn is_datetime(&self) -> bool {
        matches!(self.kind, TypeKind::DateTime { .. })
    }

    pub fn is_integer(&self) -> bool {
        self.scalar() == Some(ScalarKind::Number)
            && !matches!(type_string(&self.ty).as_str(), "f32" | "f64")
    }

    /// Runtime `AttributeKind` variant name.
    pub fn attribute_kind(&self) -> &'static str {
        match &self.kind {
            TypeKind::Scalar(ScalarKind::String) => "String",
            TypeKind::Scalar(ScalarKind::Number) => "Number",
            TypeKind::Scalar(ScalarKind::Binary) => "Binary",
            TypeKind::Scalar(ScalarKind::Bool) => "Bool",
            TypeKind::DateTime { ttl: true } => "Ttl",
            TypeKind::DateTime { ttl: false } => "DateTime",
            TypeKind::Optional(inner) => inner.attribute_kind(),
            TypeKind::List(_) => "List",
            TypeKind::Set { element, .. } => match element.scalar() {
                Some(ScalarKind::Number) => "NumberSet",
                Some(ScalarKind::Binary) => "BinarySet",
                _ => "StringSet",
            },
            TypeKind::Map { .. } => "Map",
            TypeKind::Nested(_) => "Nested",
            TypeKind::Custom { .. } => "Custom",
        }
    }

    /// Names of every nested entity this type refers to.
    pub fn nested_names(&self) -> Vec<&str> {
        match &self.kind {
            TypeKind::Nested(name) => vec![name.as_str()],
            TypeKind::Optional(inner) | TypeKind::List(inner) => inner.nested_names(),
            TypeKind::Set { element, .. } => element.nested_names(),
            TypeKind::Map { value, .. } => value.nested_names(),
            _ => Vec::new(),
        }
    }

    pub fn display(&self) -> String {
        type_string(&self.ty)
    }

    /// Mark a datetime (optionally under `Option`) as a TTL attribute.
    pub fn mark_ttl(&mut self) {
        match &mut self.kind {
            TypeKind::DateTime { ttl } => *ttl = true,
            TypeKind::Optional(inner) => inner.mark_ttl(),
            _ => {}
        }
    }
}

/// Type text with whitespace removed, used for comparisons and messages.
pub fn type_string(ty: &Type) -> String {
    normalize(&ty.to_token_stream().to_string())
}

fn generic_args(segment: &syn::PathSegment) -> Vec<&Type> {
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn single_arg(segment: &syn::PathSegment) -> Result<&Type, String> {
    match generic_args(segment).as_slice() {
        [ty] => Ok(*ty),
        _ => Err(format!("{} takes exactly one type argument", segment.ident)),
    }
}

const NUMBER_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
    "f32", "f64",
];

/// Resolves declared field types using the registered converters.
pub struct TypeResolver<'a> {
    registry: &'a ConverterRegistry,
}

impl<'a> TypeResolver<'a> {
    pub fn new(registry: &'a ConverterRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a field type. A field-level converter takes precedence; on an
    /// `Option<T>` field it applies to `T`.
    pub fn resolve_field(&self, ty: &Type, converter: Option<&syn::Path>) -> Result<TypeNode, String> {
        let Some(converter) = converter else {
            return self.resolve(ty, true);
        };
        let custom = |ty: &Type| TypeNode {
            kind: TypeKind::Custom {
                converter: converter.clone(),
            },
            ty: ty.clone(),
        };
        match option_inner(ty) {
            Some(inner) => Ok(TypeNode {
                kind: TypeKind::Optional(Box::new(custom(inner))),
                ty: ty.clone(),
            }),
            None => Ok(custom(ty)),
        }
    }

    /// Resolve a type at any depth. `Option` is only valid at the top.
    pub fn resolve(&self, ty: &Type, top_level: bool) -> Result<TypeNode, String> {
        let node = |kind| TypeNode {
            kind,
            ty: ty.clone(),
        };

        if let Some(converter) = self.registry.lookup(ty) {
            return Ok(node(TypeKind::Custom {
                converter: converter.clone(),
            }));
        }

        let Type::Path(type_path) = ty else {
            return Err("only named types can be mapped".to_string());
        };
        if type_path.qself.is_some() {
            return Err("qualified self types cannot be mapped".to_string());
        }
        let Some(segment) = type_path.path.segments.last() else {
            return Err("empty type path".to_string());
        };
        let ident = segment.ident.to_string();

        match ident.as_str() {
            "Option" => {
                if !top_level {
                    return Err("Option is only supported at the top level of a property".to_string());
                }
                let inner = single_arg(segment)?;
                if option_inner(inner).is_some() {
                    return Err("nested Option is not supported".to_string());
                }
                let inner = self.resolve(inner, false)?;
                // An empty set is never stored, so `Some(empty)` would read back as `None`.
                if matches!(inner.kind, TypeKind::Set { .. }) {
                    return Err("an optional set cannot keep an empty value; use a plain set".to_string());
                }
                Ok(node(TypeKind::Optional(Box::new(inner))))
            }
            "String" => Ok(node(TypeKind::Scalar(ScalarKind::String))),
            "bool" => Ok(node(TypeKind::Scalar(ScalarKind::Bool))),
            number if NUMBER_TYPES.contains(&number) => {
                Ok(node(TypeKind::Scalar(ScalarKind::Number)))
            }
            "Vec" => {
                let element = single_arg(segment)?;
                if type_string(element) == "u8" {
                    return Ok(node(TypeKind::Scalar(ScalarKind::Binary)));
                }
                let element = self.resolve(element, false)?;
                Ok(node(TypeKind::List(Box::new(element))))
            }
            "HashSet" | "BTreeSet" => {
                let element = self.resolve(single_arg(segment)?, false)?;
                if element.key_scalar().is_none() {
                    return Err("set elements must be strings, numbers or binary values".to_string());
                }
                Ok(node(TypeKind::Set {
                    element: Box::new(element),
                    ordered: ident == "BTreeSet",
                }))
            }
            "HashMap" | "BTreeMap" => {
                let args = generic_args(segment);
                let [key, value] = args.as_slice() else {
                    return Err(format!("{ident} takes a key and a value type"));
                };
                if type_string(key) != "String" {
                    return Err("map keys must be String".to_string());
                }
                let value = self.resolve(value, false)?;
                Ok(node(TypeKind::Map {
                    value: Box::new(value),
                    ordered: ident == "BTreeMap",
                }))
            }
            "KvDateTime" => Ok(node(TypeKind::DateTime { ttl: false })),
            "DateTime" => match generic_args(segment).as_slice() {
                [zone] if type_string(zone).ends_with("Utc") => {
                    Ok(node(TypeKind::DateTime { ttl: false }))
                }
                _ => Err("only DateTime<Utc> is supported".to_string()),
            },
            _ if type_path
                .path
                .segments
                .iter()
                .all(|s| s.arguments.is_none()) =>
            {
                Ok(node(TypeKind::Nested(ident)))
            }
            _ => Err("no built-in mapping; register a converter for it".to_string()),
        }
    }
}

/// `T` of an `Option<T>` type.
pub fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    single_arg(segment).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodegenConfig;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;
    use syn::parse_quote;

    fn registry() -> ConverterRegistry {
        let config = CodegenConfig::builder()
            .converters(BTreeMap::from([(
                "Money".to_string(),
                "crate::MoneyConverter".to_string(),
            )]))
            .build();
        ConverterRegistry::from_config(&config).unwrap()
    }

    fn resolve(ty: Type) -> Result<TypeNode, String> {
        let registry = registry();
        TypeResolver::new(&registry).resolve_field(&ty, None)
    }

    #[test]
    fn scalars_and_collections() {
        assert_matches!(resolve(parse_quote!(String)).unwrap().kind, TypeKind::Scalar(ScalarKind::String));
        assert_matches!(resolve(parse_quote!(u64)).unwrap().kind, TypeKind::Scalar(ScalarKind::Number));
        assert_matches!(resolve(parse_quote!(Vec<u8>)).unwrap().kind, TypeKind::Scalar(ScalarKind::Binary));
        assert_eq!(resolve(parse_quote!(BTreeSet<i32>)).unwrap().attribute_kind(), "NumberSet");
        assert_eq!(resolve(parse_quote!(HashMap<String, Vec<Address>>)).unwrap().nested_names(), vec!["Address"]);
        assert_eq!(resolve(parse_quote!(Option<DateTime<Utc>>)).unwrap().attribute_kind(), "DateTime");
    }

    #[test]
    fn unsupported_shapes() {
        assert!(resolve(parse_quote!(Option<Option<String>>)).is_err());
        assert!(resolve(parse_quote!(Vec<Option<String>>)).is_err());
        assert!(resolve(parse_quote!(HashSet<bool>)).is_err());
        assert!(resolve(parse_quote!(HashMap<u32, String>)).is_err());
        assert!(resolve(parse_quote!((u32, u32))).is_err());
        assert!(resolve(parse_quote!(Wrapper<u32>)).is_err());
        let optional_set = resolve(parse_quote!(Option<BTreeSet<String>>)).unwrap_err();
        assert!(optional_set.contains("plain set"), "{optional_set}");
        assert!(resolve(parse_quote!(Option<HashSet<u64>>)).is_err());
    }

    #[test]
    fn converters_take_precedence() {
        assert_matches!(resolve(parse_quote!(Money)).unwrap().kind, TypeKind::Custom { .. });
        assert_matches!(resolve(parse_quote!(Vec<Money>)).unwrap().kind, TypeKind::List(inner) if matches!(inner.kind, TypeKind::Custom { .. }));

        let registry = ConverterRegistry::default();
        let converter: syn::Path = parse_quote!(crate::Cents);
        let node = TypeResolver::new(&registry)
            .resolve_field(&parse_quote!(Option<u64>), Some(&converter))
            .unwrap();
        assert_matches!(node.kind, TypeKind::Optional(inner) if matches!(inner.kind, TypeKind::Custom { .. }));
    }

    #[test]
    fn ttl_marking() {
        let mut node = resolve(parse_quote!(Option<KvDateTime>)).unwrap();
        node.mark_ttl();
        assert_eq!(node.attribute_kind(), "Ttl");
    }
}
