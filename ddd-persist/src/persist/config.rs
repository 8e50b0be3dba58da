//! 仓储配置与快照策略
//!
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPolicy {
    Never,
    Every(u64),
}

impl SnapshotPolicy {
    /// 提交位置是否落在快照点上
    pub fn should_snapshot(&self, commit_index: u64) -> bool {
        match self {
            SnapshotPolicy::Never => false,
            SnapshotPolicy::Every(interval) => {
                let interval = (*interval).max(1);
                commit_index > 0 && commit_index.is_multiple_of(interval)
            }
        }
    }
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        SnapshotPolicy::Every(10)
    }
}

/// 事件流仓储的运行参数
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// 快照落点（按提交位置）
    pub snapshot_policy: SnapshotPolicy,
    /// 从快照加载时读取的尾部事件上限
    pub snapshot_tail_limit: usize,
    /// 聚合锁的存活时间
    pub lock_ttl: Duration,
    /// 从快照加载遇到锁冲突时的额外重试次数
    pub lock_retries: u32,
    /// 第 k 次重试前等待 `lock_retry_backoff × k`
    pub lock_retry_backoff: Duration,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            snapshot_policy: SnapshotPolicy::default(),
            snapshot_tail_limit: 10,
            lock_ttl: Duration::from_secs(5),
            lock_retries: 2,
            lock_retry_backoff: Duration::from_millis(200),
        }
    }
}

/// 单次加载选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// 为 true 时不加锁（只读场景）
    pub unlocked: bool,
}

impl LoadOptions {
    pub fn unlocked() -> Self {
        Self { unlocked: true }
    }
}
