//! 内存版锁服务（InMemoryLockClient）
//!
//! 键值对带过期时间，过期判定基于 `tokio::time::Instant`，
//! 在暂停时间的测试中可通过 `tokio::time::advance` 观察 TTL 失效。
//!
use super::lock::{LockClient, SetMode};
use crate::error::{DomainError, DomainResult as Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

type Entries = HashMap<String, (String, Instant)>;

#[derive(Default)]
pub struct InMemoryLockClient {
    entries: Mutex<Entries>,
}

impl InMemoryLockClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| DomainError::lock("in-memory lock client poisoned"))
    }
}

#[async_trait]
impl LockClient for InMemoryLockClient {
    async fn set(&self, key: &str, value: &str, mode: SetMode, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now() + mode.truncate(ttl);
        self.guard()?
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.guard()?;
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.guard()?.remove(key);
        Ok(())
    }
}
