//! Import headers for generated units.
//!
//! Generated code is included at the module root, away from the modules the
//! declarations live in. To let declared types be used exactly as written,
//! every unit re-creates the declaring module's scope: a glob import of the
//! module plus a copy of its `use` items with relative paths made absolute.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{Ident, ItemUse, UseTree};

use super::naming::module_tokens;
use crate::scan::ScanOutput;

/// Scope of one declaring module.
pub fn module_scope(scan: &ScanOutput, module_path: &[String]) -> TokenStream {
    let glob = module_tokens(module_path);
    let uses = scan
        .uses_of(module_path)
        .iter()
        .filter_map(|item| qualify_use(scan, module_path, item));
    quote! {
        #[allow(unused_imports)]
        use #glob::*;
        #(
            #[allow(unused_imports)]
            #uses
        )*
    }
}

fn ident(name: &str) -> Ident {
    Ident::new(name, Span::call_site())
}

fn prefix_tree(prefix: &[String], tree: UseTree) -> UseTree {
    prefix.iter().rev().fold(tree, |tree, segment| {
        UseTree::Path(syn::UsePath {
            ident: ident(segment),
            colon2_token: Default::default(),
            tree: Box::new(tree),
        })
    })
}

/// Rewrite one `use` item so it resolves from any module of the crate.
///
/// `self::` and `super::` are resolved against `module_path`; a bare first
/// segment naming a scanned child module is made `crate::`-relative; any
/// other bare first segment is taken to be an external crate.
pub fn qualify_use(scan: &ScanOutput, module_path: &[String], item: &ItemUse) -> Option<ItemUse> {
    let tree = if item.leading_colon.is_some() {
        item.tree.clone()
    } else {
        qualify_tree(scan, module_path, item.tree.clone())?
    };
    Some(ItemUse {
        attrs: item
            .attrs
            .iter()
            .filter(|a| a.path().is_ident("cfg"))
            .cloned()
            .collect(),
        vis: syn::Visibility::Inherited,
        use_token: item.use_token,
        leading_colon: item.leading_colon,
        tree,
        semi_token: item.semi_token,
    })
}

fn qualify_tree(scan: &ScanOutput, module_path: &[String], tree: UseTree) -> Option<UseTree> {
    match tree {
        UseTree::Group(group) => {
            let items: syn::punctuated::Punctuated<UseTree, syn::Token![,]> = group
                .items
                .into_iter()
                .filter_map(|tree| qualify_tree(scan, module_path, tree))
                .collect();
            (!items.is_empty()).then(|| {
                UseTree::Group(syn::UseGroup {
                    brace_token: group.brace_token,
                    items,
                })
            })
        }
        UseTree::Path(path) => {
            let first = path.ident.to_string();
            match first.as_str() {
                "crate" => Some(UseTree::Path(path)),
                "self" => Some(prefix_tree(
                    &crate_prefixed(module_path),
                    *path.tree,
                )),
                "super" => {
                    let mut base = module_path.to_vec();
                    let mut rest = *path.tree;
                    base.pop()?;
                    while let UseTree::Path(inner) = &rest
                        && inner.ident == "super"
                    {
                        base.pop()?;
                        rest = *inner.tree.clone();
                    }
                    Some(prefix_tree(&crate_prefixed(&base), rest))
                }
                _ => {
                    let mut child = module_path.to_vec();
                    child.push(first);
                    if scan.modules.contains(&child) {
                        Some(prefix_tree(&crate_prefixed(module_path), UseTree::Path(path)))
                    } else {
                        Some(UseTree::Path(path))
                    }
                }
            }
        }
        // `use self;`-style leaves and renames of bare names refer to the
        // declaring module itself; the glob import already covers them.
        UseTree::Name(_) | UseTree::Rename(_) | UseTree::Glob(_) => None,
    }
}

fn crate_prefixed(module_path: &[String]) -> Vec<String> {
    std::iter::once("crate".to_string())
        .chain(module_path.iter().cloned())
        .collect()
}
