use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 快照存储中每个聚合唯一的一行状态，每次提交整体覆盖
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
pub struct EventState {
    #[builder(into)]
    stream: String,
    #[builder(into)]
    aggregate_id: String,
    updated_at: DateTime<Utc>,
    #[builder(into)]
    event_type: String,
    #[builder(into)]
    event_data: String,
}

impl EventState {
    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_data(&self) -> &str {
        &self.event_data
    }
}
