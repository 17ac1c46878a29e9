//! Formatting and import normalization of rendered Rust source.
//!
//! The raw rendered buffer is parsed with `syn`. Its `use` items are pruned
//! of names the file never mentions, sorted and de-duplicated, and the
//! result is pretty-printed with `prettyplease`.
//! The leading `//` comment block (the generated-code banner) is carried
//! over as is, since the pretty printer does not keep plain comments.
//!
//! Errors are reported as `line:column: message` against the raw buffer.

use std::collections::HashSet;

use proc_macro2::{TokenStream, TokenTree};
use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::{Item, ItemUse, Token, UseGroup, UsePath, UseTree, Visibility};
use thiserror::Error;
use tracing::debug;

/// The rendered buffer is not valid Rust
#[derive(Debug, Clone, Error)]
#[error("{line}:{column}: {message}")]
pub struct FormatError {
    /// 1-based line in the raw buffer
    pub line: usize,
    /// 1-based column in the raw buffer
    pub column: usize,
    pub message: String,
}

/// Normalize rendered source. Normalizing the output again is a no-op.
pub fn normalize(raw: &[u8]) -> Result<Vec<u8>, FormatError> {
    let text = std::str::from_utf8(raw).map_err(|err| {
        let (line, column) = position_of(raw, err.valid_up_to());
        FormatError {
            line,
            column,
            message: "invalid UTF-8 in generated source".to_string(),
        }
    })?;

    let parsed = syn::parse_file(text).map_err(|err| {
        let start = err.span().start();
        FormatError {
            line: start.line,
            column: start.column + 1,
            message: err.to_string(),
        }
    });
    let mut file = match parsed {
        Ok(file) => file,
        Err(err) => {
            release_spans();
            return Err(err);
        }
    };

    prune_imports(&mut file.items);
    normalize_imports(&mut file.items);

    let header = leading_comments(text);
    let mut body = prettyplease::unparse(&file);
    drop(file);
    release_spans();
    if body.trim().is_empty() {
        body.clear();
    }

    debug!(
        raw_bytes = raw.len(),
        header_lines = header.len(),
        "Normalized generated source"
    );

    let out = match (header.is_empty(), body.is_empty()) {
        (true, _) => body,
        (false, true) => format!("{}\n", header.join("\n")),
        (false, false) => format!("{}\n\n{body}", header.join("\n")),
    };

    Ok(out.into_bytes())
}

/// Drop the source text proc-macro2 keeps per thread for span locations.
/// No span of this parse may be used afterwards.
fn release_spans() {
    proc_macro2::extra::invalidate_current_thread_spans();
}

/// Plain `//` comment lines at the very top of the file.
fn leading_comments(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .take_while(|line| {
            line.starts_with("//") && !line.starts_with("///") && !line.starts_with("//!")
        })
        .collect()
}

/// Sort and de-duplicate `use` items, placing them where the first one was.
/// Inline modules are normalized recursively.
fn normalize_imports(items: &mut Vec<Item>) {
    for item in items.iter_mut() {
        if let Item::Mod(module) = item {
            if let Some((_, inner)) = module.content.as_mut() {
                normalize_imports(inner);
            }
        }
    }

    let Some(first) = items.iter().position(|i| matches!(i, Item::Use(_))) else {
        return;
    };

    let mut uses = Vec::new();
    let mut rest = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        match item {
            Item::Use(ref u) => uses.push((u.to_token_stream().to_string(), item)),
            other => rest.push(other),
        }
    }

    uses.sort_by(|a, b| a.0.cmp(&b.0));
    uses.dedup_by(|a, b| a.0 == b.0);

    let tail = rest.split_off(first);
    items.extend(rest);
    items.extend(uses.into_iter().map(|(_, item)| item));
    items.extend(tail);
}

/// Remove top-level private `use` leaves whose name (or alias) never
/// appears as an identifier in the other items. Globs, `self` and `as _`
/// imports are kept; trait imports used only for method calls must be
/// written `as _` to survive.
fn prune_imports(items: &mut Vec<Item>) {
    let mut used = HashSet::new();
    for item in items.iter().filter(|i| !matches!(i, Item::Use(_))) {
        collect_idents(item.to_token_stream(), &mut used);
    }

    let kept: Vec<Item> = items
        .drain(..)
        .filter_map(|item| match item {
            Item::Use(u) => prune_use(u, &used).map(Item::Use),
            other => Some(other),
        })
        .collect();
    *items = kept;
}

fn collect_idents(tokens: TokenStream, used: &mut HashSet<String>) {
    for tt in tokens {
        match tt {
            TokenTree::Ident(ident) => {
                used.insert(ident.to_string());
            }
            TokenTree::Group(group) => collect_idents(group.stream(), used),
            _ => {}
        }
    }
}

fn prune_use(item: ItemUse, used: &HashSet<String>) -> Option<ItemUse> {
    if !matches!(item.vis, Visibility::Inherited) {
        return Some(item);
    }
    let tree = prune_tree(item.tree, used)?;
    Some(ItemUse { tree, ..item })
}

fn prune_tree(tree: UseTree, used: &HashSet<String>) -> Option<UseTree> {
    match tree {
        UseTree::Path(path) => {
            let inner = prune_tree(*path.tree, used)?;
            Some(UseTree::Path(UsePath {
                tree: Box::new(inner),
                ..path
            }))
        }
        UseTree::Name(name) => {
            (name.ident == "self" || used.contains(&name.ident.to_string()))
                .then_some(UseTree::Name(name))
        }
        UseTree::Rename(rename) => {
            (rename.rename == "_" || used.contains(&rename.rename.to_string()))
                .then_some(UseTree::Rename(rename))
        }
        UseTree::Glob(glob) => Some(UseTree::Glob(glob)),
        UseTree::Group(group) => {
            let items: Punctuated<UseTree, Token![,]> = group
                .items
                .into_iter()
                .filter_map(|t| prune_tree(t, used))
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(UseTree::Group(UseGroup { items, ..group }))
            }
        }
    }
}

fn position_of(raw: &[u8], offset: usize) -> (usize, usize) {
    let before = &raw[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    (line, offset - line_start + 1)
}
