//! Specialization of template operations into wrapper methods on
//! entity-bound builders.
//!
//! A template operation is a free function generic over a builder `B`
//! (first argument and return type). Its signature is classified into one of
//! three shapes:
//!
//! - no-binding: only `B` is generic;
//! - entity-bound: an entity parameter `E` appears in another argument;
//! - dual-bound: `E`, the entity's field struct `X` and one open result
//!   parameter `R` appear in the other arguments.
//!
//! Each builder then gets inherent methods that substitute `Self` for `B`,
//! its entity for `E` and the generated `<Entity>Fields` for `X`, keep `R`
//! open and forward to the template.

use std::collections::{BTreeMap, BTreeSet};

use log::trace;
use proc_macro2::{TokenStream, TokenTree};
use quote::{ToTokens, format_ident, quote};
use strum::Display;
use syn::punctuated::Punctuated;
use syn::visit_mut::{self, VisitMut};
use syn::{FnArg, GenericArgument, GenericParam, Ident, Pat, PathArguments, ReturnType, Signature, Type, TypeParamBound, WherePredicate};

use super::GenerationContext;
use super::imports::module_scope;
use super::naming::{entity_unit_module, fields_struct, item_path, module_tokens, unit_item_path};
use crate::diagnostics::{DiagnosticId, Diagnostics};
use crate::scan::{BuilderDeclaration, TemplateDeclaration};

/// Traits every type may carry without being a builder capability.
const AUTO_TRAITS: &[&str] = &["Sized", "Send", "Sync", "Unpin", "Clone", "Debug"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SpecializationClass {
    #[strum(serialize = "no-binding")]
    NoBinding,
    #[strum(serialize = "entity-bound")]
    EntityBound,
    #[strum(serialize = "dual-bound")]
    DualBound,
}

/// The classified generic parameters of a template operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateShape {
    pub class: SpecializationClass,
    pub builder: Ident,
    pub entity: Option<Ident>,
    pub fields: Option<Ident>,
    pub result: Option<Ident>,
    /// Trait bounds on the builder parameter, by last path segment.
    pub capabilities: Vec<String>,
}

fn single_ident(ty: &Type) -> Option<&Ident> {
    match ty {
        Type::Path(p) if p.qself.is_none() && p.path.leading_colon.is_none() => p.path.get_ident(),
        _ => None,
    }
}

fn mentions(tokens: TokenStream, name: &Ident) -> bool {
    tokens.into_iter().any(|tree| match tree {
        TokenTree::Ident(ident) => ident == *name,
        TokenTree::Group(group) => mentions(group.stream(), name),
        _ => false,
    })
}

/// Inline and `where` bounds of every type parameter.
fn bounds_by_param(signature: &Signature) -> BTreeMap<String, Vec<TypeParamBound>> {
    let mut bounds: BTreeMap<String, Vec<TypeParamBound>> = BTreeMap::new();
    for param in signature.generics.type_params() {
        bounds
            .entry(param.ident.to_string())
            .or_default()
            .extend(param.bounds.iter().cloned());
    }
    if let Some(where_clause) = &signature.generics.where_clause {
        for predicate in &where_clause.predicates {
            if let WherePredicate::Type(predicate) = predicate
                && let Some(ident) = single_ident(&predicate.bounded_ty)
                && let Some(entry) = bounds.get_mut(&ident.to_string())
            {
                entry.extend(predicate.bounds.iter().cloned());
            }
        }
    }
    bounds
}

fn trait_name(bound: &TypeParamBound) -> Option<String> {
    match bound {
        TypeParamBound::Trait(bound) => bound.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// Type parameter named by an associated type binding `Name = T` in `bounds`.
fn bound_assoc(bounds: &[TypeParamBound], name: &str, params: &BTreeSet<String>) -> Option<Ident> {
    bounds.iter().find_map(|bound| {
        let TypeParamBound::Trait(bound) = bound else {
            return None;
        };
        let PathArguments::AngleBracketed(args) = &bound.path.segments.last()?.arguments else {
            return None;
        };
        args.args.iter().find_map(|arg| match arg {
            GenericArgument::AssocType(assoc) if assoc.ident == name => {
                single_ident(&assoc.ty).filter(|i| params.contains(&i.to_string())).cloned()
            }
            _ => None,
        })
    })
}

/// Classify a template operation's signature.
pub fn classify(signature: &Signature) -> Result<TemplateShape, String> {
    if signature.constness.is_some() || signature.asyncness.is_some() || signature.unsafety.is_some() {
        return Err("const, async and unsafe operations cannot be forwarded".to_string());
    }
    if signature.abi.is_some() || signature.variadic.is_some() {
        return Err("foreign operations cannot be forwarded".to_string());
    }
    if signature.inputs.iter().any(|arg| matches!(arg, FnArg::Receiver(_))) {
        return Err("operations taking self cannot be forwarded".to_string());
    }
    if signature.generics.const_params().next().is_some() {
        return Err("const generic parameters are not supported".to_string());
    }

    let params: BTreeSet<String> = signature
        .generics
        .type_params()
        .map(|p| p.ident.to_string())
        .collect();

    let Some(FnArg::Typed(first)) = signature.inputs.first() else {
        return Err("the first argument must be the builder".to_string());
    };
    let Some(builder) = single_ident(&first.ty).filter(|i| params.contains(&i.to_string())) else {
        return Err("the first argument must be a generic builder parameter".to_string());
    };
    let returns_builder = match &signature.output {
        ReturnType::Type(_, ty) => single_ident(ty) == Some(builder),
        ReturnType::Default => false,
    };
    if !returns_builder {
        return Err(format!("the return type must be the builder parameter `{builder}`"));
    }

    let bounds = bounds_by_param(signature);
    let bounds_of = |ident: &Ident| bounds.get(&ident.to_string()).map_or(&[][..], Vec::as_slice);
    let bounded_by = |name: &str| {
        signature
            .generics
            .type_params()
            .map(|p| &p.ident)
            .find(|ident| *ident != builder && bounds_of(*ident).iter().any(|b| trait_name(b).as_deref() == Some(name)))
            .cloned()
    };

    let entity = bounded_by("Entity").or_else(|| bound_assoc(bounds_of(builder), "Entity", &params));
    let fields = bounded_by("EntityFields").or_else(|| {
        entity
            .as_ref()
            .and_then(|e| bound_assoc(bounds_of(e), "Fields", &params))
    });
    let entity = entity.or_else(|| {
        fields
            .as_ref()
            .and_then(|x| bound_assoc(bounds_of(x), "Entity", &params))
    });

    let results: Vec<Ident> = signature
        .generics
        .type_params()
        .map(|p| p.ident.clone())
        .filter(|ident| ident != builder && Some(ident) != entity.as_ref() && Some(ident) != fields.as_ref())
        .collect();

    let capabilities = bounds_of(builder)
        .iter()
        .filter_map(trait_name)
        .filter(|name| !AUTO_TRAITS.contains(&name.as_str()))
        .collect();

    let rest: TokenStream = signature
        .inputs
        .iter()
        .skip(1)
        .map(|arg| arg.to_token_stream())
        .collect();
    let in_args = |ident: &Ident| mentions(rest.clone(), ident);

    let class = match (&entity, &fields, results.as_slice()) {
        (None, None, []) => SpecializationClass::NoBinding,
        (Some(e), None, []) if in_args(e) => SpecializationClass::EntityBound,
        (Some(_), Some(x), [r]) if in_args(x) && in_args(r) => SpecializationClass::DualBound,
        (None, _, [_, ..]) | (Some(_), None, [_, ..]) => {
            let names: Vec<String> = results.iter().map(Ident::to_string).collect();
            return Err(format!("unbound type parameters {}", names.join(", ")));
        }
        (Some(_), Some(_), results) if results.len() != 1 => {
            return Err("a dual-bound operation needs exactly one open result parameter".to_string());
        }
        _ => {
            return Err("no argument is shaped over the entity or its field struct".to_string());
        }
    };

    Ok(TemplateShape {
        class,
        builder: builder.clone(),
        entity,
        fields,
        result: results.into_iter().next(),
        capabilities,
    })
}

/// Replaces bound type parameters with concrete types; `P::Assoc` becomes
/// `<Concrete as Trait>::Assoc`.
struct Substitution {
    replacements: BTreeMap<String, (Type, TokenStream)>,
}

impl Substitution {
    fn replace(&self, ty: &Type) -> Option<Type> {
        let Type::Path(type_path) = ty else {
            return None;
        };
        if type_path.qself.is_some() || type_path.path.leading_colon.is_some() {
            return None;
        }
        let first = type_path.path.segments.first()?;
        if !first.arguments.is_none() {
            return None;
        }
        let (concrete, trait_path) = self.replacements.get(&first.ident.to_string())?;
        if type_path.path.segments.len() == 1 {
            return Some(concrete.clone());
        }
        let rest: Punctuated<syn::PathSegment, syn::Token![::]> =
            type_path.path.segments.iter().skip(1).cloned().collect();
        Some(syn::parse_quote!(<#concrete as #trait_path>::#rest))
    }
}

impl VisitMut for Substitution {
    fn visit_type_mut(&mut self, ty: &mut Type) {
        match self.replace(ty) {
            Some(replacement) => *ty = replacement,
            None => visit_mut::visit_type_mut(self, ty),
        }
    }
}

/// One forwarding method.
fn wrapper_method(
    template: &TemplateDeclaration,
    shape: &TemplateShape,
    entity: &TokenStream,
    fields: &TokenStream,
) -> TokenStream {
    let signature = &template.signature;
    let mut replacements = BTreeMap::new();
    replacements.insert(
        shape.builder.to_string(),
        (syn::parse_quote!(Self), quote!(::kvmodel::query::RequestBuilder)),
    );
    if let Some(e) = &shape.entity {
        replacements.insert(e.to_string(), (syn::parse_quote!(#entity), quote!(::kvmodel::Entity)));
    }
    if let Some(x) = &shape.fields {
        replacements.insert(x.to_string(), (syn::parse_quote!(#fields), quote!(::kvmodel::EntityFields)));
    }
    let mut substitution = Substitution { replacements };

    let result = shape.result.as_ref();
    let mut generics = Punctuated::<GenericParam, syn::Token![,]>::new();
    for param in &signature.generics.params {
        match param {
            GenericParam::Lifetime(_) => generics.push(param.clone()),
            GenericParam::Type(tp) if Some(&tp.ident) == result => {
                let mut tp = tp.clone();
                substitution.visit_type_param_mut(&mut tp);
                generics.push(GenericParam::Type(tp));
            }
            _ => {}
        }
    }
    let predicates: Vec<WherePredicate> = signature
        .generics
        .where_clause
        .iter()
        .flat_map(|w| w.predicates.iter())
        .filter(|predicate| match predicate {
            WherePredicate::Lifetime(_) => true,
            WherePredicate::Type(_) => result.is_some_and(|r| mentions(predicate.to_token_stream(), r)),
            _ => false,
        })
        .cloned()
        .map(|mut predicate| {
            substitution.visit_where_predicate_mut(&mut predicate);
            predicate
        })
        .collect();
    let where_clause = (!predicates.is_empty()).then(|| quote!(where #(#predicates),*));

    let mut params = Vec::new();
    let mut arguments = Vec::new();
    let mut uses_impl_trait = false;
    for (position, input) in signature.inputs.iter().enumerate().skip(1) {
        let FnArg::Typed(typed) = input else {
            continue;
        };
        let name = match typed.pat.as_ref() {
            Pat::Ident(pat) if pat.subpat.is_none() => pat.ident.clone(),
            _ => format_ident!("arg{}", position),
        };
        let mut ty = (*typed.ty).clone();
        uses_impl_trait |= mentions_impl_trait(&ty);
        substitution.visit_type_mut(&mut ty);
        params.push(quote!(#name: #ty));
        arguments.push(name);
    }

    let turbofish = (!uses_impl_trait).then(|| {
        let types = signature.generics.type_params().map(|p| {
            let ident = &p.ident;
            let mut ty: Type = syn::parse_quote!(#ident);
            substitution.visit_type_mut(&mut ty);
            ty
        });
        quote!(::<#(#types),*>)
    });

    let name = &signature.ident;
    let target = match &template.owner {
        Some(owner) => quote!(<#owner>::#name),
        None => {
            let module = module_tokens(&template.module_path);
            quote!(#module::#name)
        }
    };
    let docs = &template.docs;
    let generics = (!generics.is_empty()).then(|| quote!(<#generics>));

    quote! {
        #(#docs)*
        pub fn #name #generics (self, #(#params),*) -> Self #where_clause {
            #target #turbofish (self, #(#arguments),*)
        }
    }
}

fn mentions_impl_trait(ty: &Type) -> bool {
    struct Finder(bool);
    impl<'ast> syn::visit::Visit<'ast> for Finder {
        fn visit_type_impl_trait(&mut self, _: &'ast syn::TypeImplTrait) {
            self.0 = true;
        }
    }
    let mut finder = Finder(false);
    syn::visit::Visit::visit_type(&mut finder, ty);
    finder.0
}

/// A classified template operation.
#[derive(Debug, Clone)]
pub struct ClassifiedTemplate<'a> {
    pub template: &'a TemplateDeclaration,
    pub shape: TemplateShape,
}

/// Classify every template operation; failures are reported once each.
pub fn classify_templates(templates: &[TemplateDeclaration]) -> (Vec<ClassifiedTemplate<'_>>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut classified = Vec::new();
    for template in templates {
        match classify(&template.signature) {
            Ok(shape) if !template.specialize && shape.class != SpecializationClass::NoBinding => {
                let needs = match shape.class {
                    SpecializationClass::DualBound => "entity and field-struct",
                    _ => "entity",
                };
                diagnostics.report(
                    DiagnosticId::SpecializationNotRequested,
                    [template.name.as_str(), needs],
                    &template.location,
                );
            }
            Ok(shape) => {
                trace!("template {} is {}", template.name, shape.class);
                classified.push(ClassifiedTemplate { template, shape });
            }
            Err(reason) => diagnostics.report(
                DiagnosticId::UnclassifiableTemplate,
                [template.name.clone(), reason],
                &template.location,
            ),
        }
    }
    (classified, diagnostics)
}

/// Wrapper source for one builder.
#[derive(Debug, Clone)]
pub struct WrapperUnit {
    pub builder: String,
    pub tokens: TokenStream,
    /// Names of the forwarded operations, in emission order.
    pub operations: Vec<String>,
}

fn builder_capabilities(context: &GenerationContext<'_>, builder: &BuilderDeclaration) -> BTreeSet<String> {
    builder
        .capabilities
        .iter()
        .cloned()
        .chain(context.scan.implemented_traits(&builder.name))
        .collect()
}

fn wrapper_unit(
    context: &GenerationContext<'_>,
    builder: &BuilderDeclaration,
    classified: &[ClassifiedTemplate<'_>],
    unclassifiable: &BTreeSet<&str>,
    diagnostics: &mut Diagnostics,
) -> Option<WrapperUnit> {
    let entity_name = builder
        .entity
        .segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default();
    let Some(entity) = context
        .entities
        .get(&entity_name)
        .filter(|e| e.is_table_entity())
    else {
        let path = builder.entity.to_token_stream().to_string().replace(' ', "");
        diagnostics.report(
            DiagnosticId::UnknownBuilderEntity,
            [builder.name.as_str(), path.as_str()],
            &builder.location,
        );
        return None;
    };

    let capabilities = builder_capabilities(context, builder);
    let missing = |shape: &TemplateShape| -> Vec<String> {
        shape
            .capabilities
            .iter()
            .filter(|c| !capabilities.contains(*c))
            .cloned()
            .collect()
    };

    let selected: Vec<&ClassifiedTemplate<'_>> = match &builder.operations {
        Some(names) => {
            let mut selected = Vec::new();
            for name in names {
                let matches: Vec<_> = classified.iter().filter(|c| &c.template.name == name).collect();
                if matches.is_empty() {
                    if !unclassifiable.contains(name.as_str()) {
                        diagnostics.report(
                            DiagnosticId::UnknownTemplateOperation,
                            [builder.name.as_str(), name.as_str()],
                            &builder.location,
                        );
                    }
                    continue;
                }
                for candidate in matches {
                    let absent = missing(&candidate.shape);
                    if absent.is_empty() {
                        selected.push(candidate);
                    } else {
                        diagnostics.report(
                            DiagnosticId::MissingCapability,
                            [name.clone(), builder.name.clone(), absent.join(", ")],
                            &builder.location,
                        );
                    }
                }
            }
            selected
        }
        None => classified.iter().filter(|c| missing(&c.shape).is_empty()).collect(),
    };

    let entity_path = item_path(&entity.module_path, &entity.name);
    let fields_path = unit_item_path(
        context.module_root,
        &entity_unit_module(&entity.name),
        &fields_struct(&entity.name),
    );
    let builder_path = item_path(&builder.module_path, &builder.name);

    // Methods grouped by the template's module so each group sees that
    // module's imports.
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut operations = Vec::new();
    let mut groups: BTreeMap<&[String], Vec<TokenStream>> = BTreeMap::new();
    for candidate in selected {
        let name = candidate.template.name.as_str();
        if !seen.insert(name) {
            diagnostics.report(
                DiagnosticId::DuplicateWrapper,
                [builder.name.as_str(), name],
                &candidate.template.location,
            );
            continue;
        }
        trace!("forwarding {} to {}", name, builder.name);
        operations.push(name.to_string());
        groups
            .entry(candidate.template.module_path.as_slice())
            .or_default()
            .push(wrapper_method(candidate.template, &candidate.shape, &entity_path, &fields_path));
    }
    if operations.is_empty() {
        return None;
    }

    let modules = groups.into_iter().map(|(module_path, methods)| {
        let module = if module_path.is_empty() {
            format_ident!("from_crate_root")
        } else {
            format_ident!("from_{}", module_path.join("_"))
        };
        let scope = module_scope(context.scan, module_path);
        quote! {
            mod #module {
                #scope

                impl #builder_path {
                    #(#methods)*
                }
            }
        }
    });

    Some(WrapperUnit {
        builder: builder.name.clone(),
        tokens: quote!(#(#modules)*),
        operations,
    })
}

/// Wrapper units for every builder, plus classification and binding
/// diagnostics.
pub fn wrapper_units(context: &GenerationContext<'_>) -> (Vec<WrapperUnit>, Diagnostics) {
    let (classified, mut diagnostics) = classify_templates(&context.scan.templates);
    let accepted: BTreeSet<&str> = classified.iter().map(|c| c.template.name.as_str()).collect();
    let unclassifiable: BTreeSet<&str> = context
        .scan
        .templates
        .iter()
        .map(|t| t.name.as_str())
        .filter(|name| !accepted.contains(name))
        .collect();

    let units = context
        .scan
        .builders
        .iter()
        .filter_map(|builder| wrapper_unit(context, builder, &classified, &unclassifiable, &mut diagnostics))
        .collect();
    (units, diagnostics)
}
