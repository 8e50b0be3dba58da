//! 事件发布协议（EventPublisher）
//!
use crate::{domain_event::AnyEvent, error::DomainResult as Result};
use async_trait::async_trait;
use std::sync::Arc;

/// 事件发布器：每个已持久化事件调用一次，顺序与提交顺序一致
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &AnyEvent) -> Result<()>;

    async fn publish_batch(&self, events: &[AnyEvent]) -> Result<()> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T> EventPublisher for Arc<T>
where
    T: EventPublisher + ?Sized,
{
    async fn publish(&self, event: &AnyEvent) -> Result<()> {
        (**self).publish(event).await
    }

    async fn publish_batch(&self, events: &[AnyEvent]) -> Result<()> {
        (**self).publish_batch(events).await
    }
}
