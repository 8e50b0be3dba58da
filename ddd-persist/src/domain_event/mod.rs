//! 领域事件（Domain Event）与事件注册
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`）、类型擦除后的事件句柄
//! `AnyEvent`、带提交位置的 `EventNode`，以及按类型标签分发的 `EventRegistry`。

mod any_event;
mod domain_event_trait;
mod event_node;
mod registry;

pub use any_event::AnyEvent;
pub use domain_event_trait::DomainEvent;
pub use event_node::{EventNode, NodeMetadata};
pub use registry::EventRegistry;
