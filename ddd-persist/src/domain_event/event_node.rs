use super::AnyEvent;
use serde::{Deserialize, Serialize};

/// 事件节点在提交链中的位置信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// 存储层分配的提交标识（`commit_id`）
    pub id: String,
    /// 在聚合事件流中的位置，从 1 开始；缺失或新建时为 0
    pub index: u64,
}

/// 已回放的事件及其提交位置
#[derive(Debug, Clone)]
pub struct EventNode {
    pub event: AnyEvent,
    pub metadata: NodeMetadata,
}

impl EventNode {
    pub fn new(event: AnyEvent, id: impl Into<String>, index: u64) -> Self {
        Self {
            event,
            metadata: NodeMetadata {
                id: id.into(),
                index,
            },
        }
    }
}
