//! 聚合锁（advisory lock）
//!
//! `LockClient` 抽象键值锁服务的三个原语（带 TTL 的 set、get、del），
//! `AggregateLock` 在其上实现按 `{stream}:{aggregate_id}` 加锁、解锁与检查。
//! 锁带 TTL，持有者崩溃后自动失效；提交耗时超过 TTL 时锁可能提前过期。
//!
use crate::error::DomainResult as Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// `set` 的过期单位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// 以秒为单位（Redis `EX`）
    Ex,
    /// 以毫秒为单位（Redis `PX`）
    Px,
}

impl SetMode {
    /// 按过期单位截断后的 TTL
    pub fn truncate(self, ttl: Duration) -> Duration {
        match self {
            SetMode::Ex => Duration::from_secs(ttl.as_secs()),
            SetMode::Px => Duration::from_millis(ttl.as_millis() as u64),
        }
    }
}

#[async_trait]
pub trait LockClient: Send + Sync {
    async fn set(&self, key: &str, value: &str, mode: SetMode, ttl: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn del(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T> LockClient for Arc<T>
where
    T: LockClient + ?Sized,
{
    async fn set(&self, key: &str, value: &str, mode: SetMode, ttl: Duration) -> Result<()> {
        (**self).set(key, value, mode, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn del(&self, key: &str) -> Result<()> {
        (**self).del(key).await
    }
}

/// 某条事件流上的聚合锁
#[derive(Clone)]
pub struct AggregateLock {
    client: Arc<dyn LockClient>,
    stream: String,
    ttl: Duration,
}

impl AggregateLock {
    pub fn new(client: Arc<dyn LockClient>, stream: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            stream: stream.into(),
            ttl,
        }
    }

    pub fn key(&self, aggregate_id: &str) -> String {
        format!("{}:{}", self.stream, aggregate_id)
    }

    pub async fn lock(&self, aggregate_id: &str) -> Result<()> {
        let key = self.key(aggregate_id);
        self.client.set(&key, &key, SetMode::Ex, self.ttl).await?;
        tracing::debug!(lock = %key, ttl_secs = self.ttl.as_secs(), "aggregate locked");
        Ok(())
    }

    pub async fn unlock(&self, aggregate_id: &str) -> Result<()> {
        let key = self.key(aggregate_id);
        self.client.del(&key).await?;
        tracing::debug!(lock = %key, "aggregate unlocked");
        Ok(())
    }

    pub async fn is_locked(&self, aggregate_id: &str) -> Result<bool> {
        Ok(self.client.get(&self.key(aggregate_id)).await?.is_some())
    }

    /// 在失败路径上释放锁：释放失败只记录日志，不覆盖原始错误
    pub async fn release_quietly(&self, aggregate_id: &str) {
        if let Err(err) = self.unlock(aggregate_id).await {
            tracing::warn!(
                lock = %self.key(aggregate_id),
                error = %err,
                "failed to release aggregate lock"
            );
        }
    }

    /// 同步上下文（如失败处理器）中后台释放锁
    pub fn release_in_background(&self, aggregate_id: &str) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let lock = self.clone();
                let aggregate_id = aggregate_id.to_string();
                handle.spawn(async move { lock.release_quietly(&aggregate_id).await });
            }
            Err(_) => tracing::warn!(
                lock = %self.key(aggregate_id),
                "no async runtime, aggregate lock left to expire"
            ),
        }
    }
}
