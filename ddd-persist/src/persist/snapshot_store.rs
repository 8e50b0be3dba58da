//! 快照存储（SnapshotStore）
//!
//! 只保存每个聚合最近一次的快照事件，不保留历史、不维护提交链、不加锁。
//! 表名即流名称，每个聚合一行，每次提交整体覆盖。
//!
use super::{
    event_state::EventState,
    id_generator::{IdGenerator, UlidGenerator},
    statement::{Insert, Select},
    storage::StorageEngine,
};
use crate::{
    aggregate::Aggregate,
    aggregate_root::AggregateRoot,
    domain_event::EventRegistry,
    error::{DomainError, DomainResult as Result},
    eventing::EventPublisher,
};
use bon::Builder;
use chrono::Utc;
use std::sync::Arc;

#[derive(Builder)]
pub struct SnapshotStore<A>
where
    A: Aggregate,
{
    #[builder(into)]
    stream: String,
    storage: Arc<dyn StorageEngine>,
    publisher: Arc<dyn EventPublisher>,
    #[builder(default = Arc::new(UlidGenerator::new()) as Arc<dyn IdGenerator>)]
    id_generator: Arc<dyn IdGenerator>,
    #[builder(skip = Arc::new(EventRegistry::<A>::of()))]
    registry: Arc<EventRegistry<A>>,
}

impl<A> SnapshotStore<A>
where
    A: Aggregate,
{
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// 创建空聚合，不做任何 I/O；未给定标识时由标识生成器分配
    pub fn create(&self, aggregate_id: Option<&str>) -> AggregateRoot<A> {
        let id = match aggregate_id {
            Some(id) => id.to_string(),
            None => self.id_generator.next_id(),
        };
        AggregateRoot::with_registry(id, self.registry.clone())
    }

    /// 读取聚合唯一的状态行并把其中的快照事件作为唯一历史回放
    #[tracing::instrument(skip(self), fields(stream = %self.stream))]
    pub async fn load(&self, aggregate_id: &str) -> Result<AggregateRoot<A>> {
        let mut rows = self
            .storage
            .execute(Select::from(self.stream.as_str(), aggregate_id).limit(1).into())
            .await?;
        let Some(row) = rows.pop() else {
            return Err(DomainError::not_found(format!(
                "state of {aggregate_id} in {}",
                self.stream
            )));
        };

        let state: EventState = serde_json::from_value(row)?;
        let event = self.registry.decode(state.event_type(), state.event_data())?;

        let mut aggregate = AggregateRoot::with_registry(aggregate_id, self.registry.clone());
        aggregate.load_from_history([event])?;
        Ok(aggregate)
    }

    /// 覆盖写入当前快照，再按原顺序发布全部未提交事件
    ///
    /// 聚合不产出快照时什么也不做。
    #[tracing::instrument(skip_all, fields(stream = %self.stream, aggregate_id = %aggregate.id()))]
    pub async fn commit(&self, aggregate: &mut AggregateRoot<A>) -> Result<()> {
        let Some(snapshot) = aggregate.snapshot() else {
            tracing::debug!("aggregate produced no snapshot, nothing written");
            return Ok(());
        };

        let state = EventState::builder()
            .stream(self.stream.as_str())
            .aggregate_id(aggregate.id())
            .updated_at(Utc::now())
            .event_type(snapshot.event_type())
            .event_data(snapshot.event_data()?)
            .build();
        self.storage
            .execute(Insert::into_table(self.stream.as_str(), serde_json::to_value(&state)?).into())
            .await?;

        let events = aggregate.uncommitted_events().to_vec();
        aggregate.commit();
        self.publisher.publish_batch(&events).await
    }
}
