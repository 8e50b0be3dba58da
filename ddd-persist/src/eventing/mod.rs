//! 事件发布（eventing）
//!
//! 仓储在事件持久化成功后，按提交顺序逐个发布：
//! - `EventPublisher`：发布协议，由应用接入消息总线；
//! - `InMemoryEventBus`：基于 broadcast 的内存实现，支持订阅事件流。
//!
mod bus;
#[cfg(feature = "eventing")]
mod bus_inmemory;

pub use bus::EventPublisher;
#[cfg(feature = "eventing")]
pub use bus_inmemory::InMemoryEventBus;
