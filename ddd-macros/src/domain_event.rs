use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use quote::{ToTokens, quote};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, Result, Token, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[event] 宏实现
/// - 支持结构体与枚举，事件载荷即该类型的 JSON 形态
/// - 合并默认派生：Debug, Clone, serde::Serialize, serde::Deserialize
/// - 生成 `::ddd_persist::domain_event::DomainEvent` 实现，`EVENT_TYPE` 默认取类型名
/// - 支持：`#[event(event_type = "...")]` 覆写类型标签
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EventAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];

    let (ident, generics) = match &mut input {
        Item::Struct(s) => {
            apply_derives(&mut s.attrs, required);
            (s.ident.clone(), s.generics.clone())
        }
        Item::Enum(e) => {
            apply_derives(&mut e.attrs, required);
            (e.ident.clone(), e.generics.clone())
        }
        other => {
            return syn::Error::new(
                other.span(),
                "#[event] can only be used on struct or enum types",
            )
            .to_compile_error()
            .into();
        }
    };

    if !generics.params.is_empty() {
        return syn::Error::new(
            generics.span(),
            "#[event] does not support generic types; the event type tag must be stable",
        )
        .to_compile_error()
        .into();
    }

    let event_type = cfg
        .event_type
        .unwrap_or_else(|| syn::LitStr::new(&ident.to_string(), ident.span()));

    let out = quote! {
        #input

        impl ::ddd_persist::domain_event::DomainEvent for #ident {
            const EVENT_TYPE: &'static str = #event_type;
        }
    };

    TokenStream::from(out)
}

// 解析 event 宏键值参数：event_type = "<tag>"
struct EventAttrConfig {
    event_type: Option<syn::LitStr>,
}

impl Parse for EventAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut event_type: Option<syn::LitStr> = None;

        if input.is_empty() {
            return Ok(Self { event_type });
        }

        let pairs: Punctuated<syn::ExprAssign, Token![,]> =
            Punctuated::<syn::ExprAssign, Token![,]>::parse_terminated(input)?;

        for assign in pairs.into_iter() {
            let key_ident = match *assign.left {
                syn::Expr::Path(p) if p.path.segments.len() == 1 => {
                    p.path.segments[0].ident.clone()
                }
                other => {
                    return Err(syn::Error::new(other.span(), "invalid attribute key"));
                }
            };
            match key_ident.to_string().as_str() {
                "event_type" => {
                    if event_type.is_some() {
                        return Err(syn::Error::new(
                            key_ident.span(),
                            "duplicate key 'event_type' in attribute",
                        ));
                    }
                    let lit: syn::LitStr = syn::parse2(assign.right.to_token_stream())?;
                    if lit.value().is_empty() {
                        return Err(syn::Error::new(lit.span(), "event_type must not be empty"));
                    }
                    event_type = Some(lit);
                }
                _ => {
                    return Err(syn::Error::new(
                        key_ident.span(),
                        "unknown key; expected 'event_type'",
                    ));
                }
            }
        }

        Ok(Self { event_type })
    }
}
