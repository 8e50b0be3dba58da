use super::DomainEvent;
use crate::error::DomainResult;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

trait ErasedEvent: Any + fmt::Debug + Send + Sync {
    fn event_type(&self) -> &'static str;

    fn event_data(&self) -> serde_json::Result<String>;

    fn as_any(&self) -> &dyn Any;
}

impl<E> ErasedEvent for E
where
    E: DomainEvent,
{
    fn event_type(&self) -> &'static str {
        E::EVENT_TYPE
    }

    fn event_data(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 类型擦除后的事件句柄
///
/// 聚合的未提交/已加载事件、发布器都以 `AnyEvent` 传递事件；
/// 克隆只增加引用计数，可通过 `downcast_ref` 取回具体类型。
#[derive(Clone)]
pub struct AnyEvent {
    inner: Arc<dyn ErasedEvent>,
}

impl AnyEvent {
    pub fn new<E>(event: E) -> Self
    where
        E: DomainEvent,
    {
        Self {
            inner: Arc::new(event),
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.inner.event_type()
    }

    /// 事件载荷的 JSON 文本（写入 `event_data` 列）
    pub fn event_data(&self) -> DomainResult<String> {
        Ok(self.inner.event_data()?)
    }

    pub fn is<E>(&self) -> bool
    where
        E: DomainEvent,
    {
        self.inner.as_any().is::<E>()
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: DomainEvent,
    {
        self.inner.as_any().downcast_ref::<E>()
    }
}

impl<E> From<E> for AnyEvent
where
    E: DomainEvent,
{
    fn from(event: E) -> Self {
        AnyEvent::new(event)
    }
}

impl fmt::Debug for AnyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyEvent").field(&self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddd_macros::event;

    #[event]
    struct Renamed {
        name: String,
    }

    #[event(event_type = "mix.described")]
    struct Described {
        description: String,
    }

    #[test]
    fn erased_event_keeps_tag_and_payload() {
        let event = AnyEvent::new(Renamed {
            name: "Cassandra".into(),
        });

        assert_eq!(event.event_type(), "Renamed");
        assert_eq!(event.event_data().unwrap(), r#"{"name":"Cassandra"}"#);
        assert!(event.is::<Renamed>());
        assert!(!event.is::<Described>());
        assert_eq!(event.downcast_ref::<Renamed>().unwrap().name, "Cassandra");
    }

    #[test]
    fn custom_event_type_overrides_struct_name() {
        let event: AnyEvent = Described {
            description: "wide-column store".into(),
        }
        .into();

        assert_eq!(event.event_type(), "mix.described");
        assert!(event.downcast_ref::<Renamed>().is_none());
    }

    #[test]
    fn clones_share_the_same_event() {
        let event = AnyEvent::new(Renamed { name: "a".into() });
        let copy = event.clone();
        assert!(std::ptr::eq(
            event.downcast_ref::<Renamed>().unwrap(),
            copy.downcast_ref::<Renamed>().unwrap()
        ));
    }
}
