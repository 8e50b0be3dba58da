use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// 领域事件载荷需要满足的通用能力边界
///
/// `EVENT_TYPE` 是写入 `event_type` 列的稳定标签，读取时据此在
/// [`EventRegistry`](super::EventRegistry) 中找到反序列化函数与处理器。
/// 通常由 `#[ddd_macros::event]` 生成，默认取结构体名。
pub trait DomainEvent:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// 事件类型标签（形如 `AddedNameEvent` 或自定义名称）
    const EVENT_TYPE: &'static str;
}
