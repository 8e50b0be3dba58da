//! 事件注册表（EventRegistry）
//!
//! 以稳定的事件类型标签为键，登记：
//! - 反序列化函数：把存储中的 `(event_type, event_data)` 还原为 `AnyEvent`；
//! - 处理器（可选）：把事件投影到聚合状态。
//!
//! 注册表在聚合定义处（`Aggregate::register`）一次性构建，
//! 重复登记同一标签视为定义错误。
//!
use super::{AnyEvent, DomainEvent};
use crate::aggregate::Aggregate;
use crate::error::{DomainError, DomainResult};
use std::collections::HashMap;
use std::fmt;

type Decoder = fn(&str) -> DomainResult<AnyEvent>;

type Handler<A> = Box<dyn Fn(&mut A, &AnyEvent) -> DomainResult<()> + Send + Sync>;

struct Binding<A> {
    decode: Decoder,
    handler: Option<Handler<A>>,
}

fn decode<E>(event_data: &str) -> DomainResult<AnyEvent>
where
    E: DomainEvent,
{
    let event: E = serde_json::from_str(event_data)?;
    Ok(AnyEvent::new(event))
}

/// 聚合 `A` 的事件类型表
pub struct EventRegistry<A> {
    bindings: HashMap<&'static str, Binding<A>>,
}

impl<A> Default for EventRegistry<A> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<A> EventRegistry<A>
where
    A: Aggregate,
{
    /// 按聚合定义构建注册表
    pub fn of() -> Self {
        let mut registry = Self::default();
        A::register(&mut registry);
        registry
    }

    /// 仅登记反序列化（应用时不改变状态）
    pub fn event<E>(&mut self) -> &mut Self
    where
        E: DomainEvent,
    {
        self.bind::<E>(None)
    }

    /// 登记事件及其状态处理器
    pub fn on<E, F>(&mut self, handler: F) -> &mut Self
    where
        E: DomainEvent,
        F: Fn(&mut A, &E) + Send + Sync + 'static,
    {
        self.try_on::<E, _>(move |state: &mut A, event: &E| {
            handler(state, event);
            Ok(())
        })
    }

    /// 登记事件及其可失败的状态处理器，失败会交由聚合的 `fail` 处理
    pub fn try_on<E, F>(&mut self, handler: F) -> &mut Self
    where
        E: DomainEvent,
        F: Fn(&mut A, &E) -> DomainResult<()> + Send + Sync + 'static,
    {
        let handler: Handler<A> = Box::new(move |state: &mut A, event: &AnyEvent| {
            match event.downcast_ref::<E>() {
                Some(event) => handler(state, event),
                None => Err(DomainError::EventHandler {
                    event_type: event.event_type().to_string(),
                    reason: format!("payload is not {}", std::any::type_name::<E>()),
                }),
            }
        });
        self.bind::<E>(Some(handler))
    }

    fn bind<E>(&mut self, handler: Option<Handler<A>>) -> &mut Self
    where
        E: DomainEvent,
    {
        let previous = self.bindings.insert(
            E::EVENT_TYPE,
            Binding {
                decode: decode::<E>,
                handler,
            },
        );
        if previous.is_some() {
            panic!(
                "event type `{}` registered twice for aggregate `{}`",
                E::EVENT_TYPE,
                A::TYPE
            );
        }
        self
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.bindings.contains_key(event_type)
    }

    pub fn has_handler(&self, event_type: &str) -> bool {
        self.bindings
            .get(event_type)
            .is_some_and(|binding| binding.handler.is_some())
    }

    /// 已登记的事件类型标签（无序）
    pub fn event_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.keys().copied()
    }

    /// 将存储中的事件行还原为事件实例
    pub fn decode(&self, event_type: &str, event_data: &str) -> DomainResult<AnyEvent> {
        let binding =
            self.bindings
                .get(event_type)
                .ok_or_else(|| DomainError::UnknownEventType {
                    event_type: event_type.to_string(),
                })?;
        (binding.decode)(event_data)
    }

    /// 按事件类型分发到处理器；没有处理器的事件被静默接受
    pub(crate) fn dispatch(&self, state: &mut A, event: &AnyEvent) -> DomainResult<()> {
        match self
            .bindings
            .get(event.event_type())
            .and_then(|binding| binding.handler.as_ref())
        {
            Some(handler) => handler(state, event),
            None => {
                tracing::trace!(
                    aggregate_type = A::TYPE,
                    event_type = event.event_type(),
                    "no handler registered, event accepted without state change"
                );
                Ok(())
            }
        }
    }
}

impl<A> fmt::Debug for EventRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut event_types: Vec<_> = self.bindings.keys().collect();
        event_types.sort();
        f.debug_struct("EventRegistry")
            .field("event_types", &event_types)
            .finish()
    }
}
