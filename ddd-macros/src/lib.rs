use proc_macro::TokenStream;

mod derive_utils;
mod domain_event;

/// 领域事件宏：为结构体或枚举实现 `DomainEvent`
///
/// 事件类型标签默认取类型名，写入存储的 `event_type` 列并用于反序列化分发。
/// 支持键值形式：
/// - #[event(event_type = "...")] 覆写类型标签（重命名类型时保持存储兼容）
///
/// 同时合并必要的派生：Debug, Clone, serde::Serialize, serde::Deserialize。
#[proc_macro_attribute]
pub fn event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr, item)
}
