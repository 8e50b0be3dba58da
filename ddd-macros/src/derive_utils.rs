use quote::ToTokens;
use std::collections::HashSet;
use syn::{Attribute, Path, Token, punctuated::Punctuated};

/// 把 `required` 派生合并进已有的 `#[derive(..)]`
///
/// 所有 derive 属性被折叠为最前面的一条，其余属性保持原顺序；
/// `Serialize` 与 `serde::Serialize` 视为同一个派生。
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<Path>) {
    let mut retained = Vec::with_capacity(attrs.len());
    let mut existing = Vec::new();
    for attr in attrs.drain(..) {
        if !attr.path().is_ident("derive") {
            retained.push(attr);
            continue;
        }
        if let Ok(list) = attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated) {
            existing.extend(list);
        }
    }

    let mut seen = HashSet::new();
    let merged: Vec<Path> = required
        .into_iter()
        .chain(existing)
        .filter(|path| seen.insert(derive_key(path)))
        .collect();

    attrs.push(syn::parse_quote!(#[derive(#(#merged),*)]));
    attrs.extend(retained);
}

// 归一化 derive 的 key：只看最后一段，serde 派生统一加前缀
fn derive_key(path: &Path) -> String {
    match path.segments.last() {
        Some(last) => match last.ident.to_string().as_str() {
            name @ ("Serialize" | "Deserialize") => format!("serde::{name}"),
            name => name.to_string(),
        },
        None => path.to_token_stream().to_string(),
    }
}
