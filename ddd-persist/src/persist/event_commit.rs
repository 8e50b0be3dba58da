//! 主事件流的提交记录（EventCommit）
//!
//! 一条记录对应聚合事件流中的一次提交：
//! - `commit_index` 从 1 开始、逐次加 1；
//! - `commit_link` 指向上一条提交的 `commit_id`，首条为 `null`，构成单向链；
//! - 快照记录与之同形，复用触发它的那条提交的 `commit_id/index/link`。
//!
use crate::{
    domain_event::{AnyEvent, EventNode, EventRegistry},
    error::DomainResult,
};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
pub struct EventCommit {
    /// 流名称，决定存储表
    #[builder(into)]
    stream: String,
    /// 聚合 ID
    #[builder(into)]
    aggregate_id: String,
    /// 提交标识，按生成顺序单调递增
    #[builder(into)]
    commit_id: String,
    /// 在聚合事件流中的位置（从 1 开始）
    #[serde(default, deserialize_with = "index_or_zero")]
    commit_index: u64,
    /// 上一条提交的 `commit_id`
    commit_link: Option<String>,
    /// 写入时间
    created_at: DateTime<Utc>,
    /// 事件类型标签
    #[builder(into)]
    event_type: String,
    /// 事件载荷（JSON 文本）
    #[builder(into)]
    event_data: String,
}

// 缺失或为 null 的位置按 0 处理
fn index_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

impl EventCommit {
    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn commit_id(&self) -> &str {
        &self.commit_id
    }

    pub fn commit_index(&self) -> u64 {
        self.commit_index
    }

    pub fn commit_link(&self) -> Option<&str> {
        self.commit_link.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_data(&self) -> &str {
        &self.event_data
    }

    /// 以事件与提交位置构建记录
    pub fn for_event(
        stream: &str,
        aggregate_id: &str,
        commit_id: String,
        commit_index: u64,
        commit_link: Option<String>,
        event: &AnyEvent,
    ) -> DomainResult<Self> {
        Ok(Self {
            stream: stream.to_string(),
            aggregate_id: aggregate_id.to_string(),
            commit_id,
            commit_index,
            commit_link,
            created_at: Utc::now(),
            event_type: event.event_type().to_string(),
            event_data: event.event_data()?,
        })
    }

    /// 由触发快照的提交派生快照记录（同一 `commit_id/index/link`）
    pub fn snapshot_of(&self, snapshot: &AnyEvent) -> DomainResult<Self> {
        Self::for_event(
            &self.stream,
            &self.aggregate_id,
            self.commit_id.clone(),
            self.commit_index,
            self.commit_link.clone(),
            snapshot,
        )
    }

    /// 反序列化事件并附上提交位置
    pub fn to_event_node<A>(&self, registry: &EventRegistry<A>) -> DomainResult<EventNode>
    where
        A: crate::aggregate::Aggregate,
    {
        let event = registry.decode(&self.event_type, &self.event_data)?;
        Ok(EventNode::new(event, self.commit_id.clone(), self.commit_index))
    }
}
