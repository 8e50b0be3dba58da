//! 事件流仓储（Repository）
//!
//! 以聚合为单位读写主事件流与快照流：
//! - 加载：完整历史回放（`load`），或最近快照 + 尾部事件回放（`load_from_snapshot`）；
//! - 提交：为未提交事件分配位置与链接，按快照策略插入快照记录，整批原子写入后发布；
//! - 并发：加载时获取 `{stream}:{aggregate_id}` 聚合锁，提交结束或出错时释放。
//!
//! 表名约定：主事件流 `domain_{stream}_stream`，快照流 `domain_{stream}_snapshot`。
//!
use super::{
    config::{LoadOptions, RepositoryConfig},
    event_commit::EventCommit,
    id_generator::{IdGenerator, UlidGenerator},
    lock::{AggregateLock, LockClient},
    statement::{BatchOptions, Insert, Order, Select, Statement},
    storage::StorageEngine,
};
use crate::{
    aggregate::Aggregate,
    aggregate_root::AggregateRoot,
    domain_event::{EventNode, EventRegistry},
    error::{DomainError, DomainResult as Result},
    eventing::EventPublisher,
};
use bon::Builder;
use serde_json::Value;
use std::sync::Arc;

#[derive(Builder)]
pub struct Repository<A>
where
    A: Aggregate,
{
    /// 流名称
    #[builder(into)]
    stream: String,
    storage: Arc<dyn StorageEngine>,
    lock_client: Arc<dyn LockClient>,
    publisher: Arc<dyn EventPublisher>,
    #[builder(default)]
    config: RepositoryConfig,
    #[builder(default = Arc::new(UlidGenerator::new()) as Arc<dyn IdGenerator>)]
    id_generator: Arc<dyn IdGenerator>,
    #[builder(skip = Arc::new(EventRegistry::<A>::of()))]
    registry: Arc<EventRegistry<A>>,
}

impl<A> Repository<A>
where
    A: Aggregate,
{
    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn stream_table(&self) -> String {
        format!("domain_{}_stream", self.stream)
    }

    pub fn snapshot_table(&self) -> String {
        format!("domain_{}_snapshot", self.stream)
    }

    fn lock(&self) -> AggregateLock {
        AggregateLock::new(
            self.lock_client.clone(),
            self.stream.clone(),
            self.config.lock_ttl,
        )
    }

    /// 创建空聚合，不做任何 I/O；未给定标识时生成新 ULID
    pub fn create(&self, aggregate_id: Option<&str>) -> AggregateRoot<A> {
        let id = match aggregate_id {
            Some(id) => id.to_string(),
            None => self.id_generator.next_id(),
        };
        AggregateRoot::with_registry(id, self.registry.clone())
    }

    /// 回放完整历史加载聚合
    ///
    /// 聚合已被锁定时立即返回 `LockConflict`，不重试、不读取存储。
    #[tracing::instrument(skip(self, options), fields(stream = %self.stream))]
    pub async fn load(&self, aggregate_id: &str, options: LoadOptions) -> Result<AggregateRoot<A>> {
        let lock = self.lock();
        if !options.unlocked {
            if lock.is_locked(aggregate_id).await? {
                return Err(DomainError::lock_conflict(aggregate_id));
            }
            lock.lock(aggregate_id).await?;
        }

        let nodes = match self.read_stream(aggregate_id).await {
            Ok(nodes) => nodes,
            Err(err) => return Err(self.abort(&lock, aggregate_id, options, err).await),
        };
        tracing::debug!(events = nodes.len(), "history loaded");

        self.replay(aggregate_id, nodes, options)
    }

    /// 从最近快照加载聚合，再回放快照之后的尾部事件
    ///
    /// 锁冲突时按 `lock_retry_backoff × 次数` 递增等待并重试，
    /// 重试耗尽返回 `LockConflict`；没有快照时退化为 `load`，
    /// 两者都找不到任何记录时返回 `NotFound`。
    #[tracing::instrument(skip(self, options), fields(stream = %self.stream))]
    pub async fn load_from_snapshot(
        &self,
        aggregate_id: &str,
        options: LoadOptions,
    ) -> Result<AggregateRoot<A>> {
        let lock = self.lock();
        if !options.unlocked {
            self.acquire_with_retry(&lock, aggregate_id).await?;
        }

        let snapshot = match self.read_latest_snapshot(aggregate_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => return Err(self.abort(&lock, aggregate_id, options, err).await),
        };

        let Some(snapshot) = snapshot else {
            tracing::debug!("no snapshot, falling back to full history");
            if !options.unlocked {
                lock.unlock(aggregate_id).await?;
            }
            let aggregate = self.load(aggregate_id, options).await?;
            if aggregate.loaded_event_nodes().is_empty() {
                if !options.unlocked {
                    lock.release_quietly(aggregate_id).await;
                }
                return Err(DomainError::not_found(format!(
                    "aggregate {aggregate_id} in stream {}",
                    self.stream
                )));
            }
            return Ok(aggregate);
        };

        let nodes = match self.read_tail(aggregate_id, &snapshot).await {
            Ok(nodes) => nodes,
            Err(err) => return Err(self.abort(&lock, aggregate_id, options, err).await),
        };
        tracing::debug!(
            snapshot_index = snapshot.metadata.index,
            tail = nodes.len(),
            "snapshot loaded"
        );

        let history = std::iter::once(snapshot).chain(nodes).collect();
        self.replay(aggregate_id, history, options)
    }

    /// 持久化聚合的未提交事件
    ///
    /// 顺序：构建提交记录 → 影子聚合重放并按策略生成快照 → 原子批量写入
    /// → 清空未提交事件 → 释放锁 → 按原顺序发布。
    /// 写入前的任何失败都会释放锁并返回原始错误，且不发布任何事件；
    /// 写入成功后解锁失败不影响发布。
    #[tracing::instrument(skip_all, fields(stream = %self.stream, aggregate_id = %aggregate.id()))]
    pub async fn commit(&self, aggregate: &mut AggregateRoot<A>) -> Result<()> {
        let lock = self.lock();
        let events = aggregate.uncommitted_events().to_vec();

        if events.is_empty() {
            tracing::debug!("nothing to commit");
            return lock.unlock(aggregate.id()).await;
        }

        let statements = match self.prepare_commit(aggregate) {
            Ok(statements) => statements,
            Err(err) => {
                lock.release_quietly(aggregate.id()).await;
                return Err(err);
            }
        };

        if let Err(err) = self
            .storage
            .batch(statements, BatchOptions { prepare: true })
            .await
        {
            lock.release_quietly(aggregate.id()).await;
            return Err(err);
        }

        // 数据已落盘：先清空未提交事件，解锁失败只记录日志，交由 TTL 兜底
        aggregate.commit();
        lock.release_quietly(aggregate.id()).await;
        tracing::debug!(events = events.len(), "events committed");

        self.publisher.publish_batch(&events).await
    }

    /// 在聚合锁窗口内执行业务回调；回调出错时先释放锁再返回错误
    pub async fn run<T, F>(&self, aggregate: &mut AggregateRoot<A>, callback: F) -> Result<T>
    where
        F: FnOnce(&mut AggregateRoot<A>) -> Result<T>,
    {
        match callback(aggregate) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.lock().release_quietly(aggregate.id()).await;
                Err(err)
            }
        }
    }

    async fn acquire_with_retry(&self, lock: &AggregateLock, aggregate_id: &str) -> Result<()> {
        let mut attempt = 0;
        while lock.is_locked(aggregate_id).await? {
            if attempt >= self.config.lock_retries {
                return Err(DomainError::lock_conflict(aggregate_id));
            }
            attempt += 1;
            let delay = self.config.lock_retry_backoff * attempt;
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "aggregate locked, retrying");
            tokio::time::sleep(delay).await;
        }
        lock.lock(aggregate_id).await
    }

    async fn read_stream(&self, aggregate_id: &str) -> Result<Vec<EventNode>> {
        let rows = self
            .storage
            .execute(Select::from(self.stream_table(), aggregate_id).into())
            .await?;
        self.to_nodes(rows)
    }

    async fn read_latest_snapshot(&self, aggregate_id: &str) -> Result<Option<EventNode>> {
        let rows = self
            .storage
            .execute(
                Select::from(self.snapshot_table(), aggregate_id)
                    .order_by_commit(Order::Desc)
                    .limit(1)
                    .into(),
            )
            .await?;
        Ok(self.to_nodes(rows)?.pop())
    }

    async fn read_tail(&self, aggregate_id: &str, snapshot: &EventNode) -> Result<Vec<EventNode>> {
        let limit = self.config.snapshot_tail_limit;
        let rows = self
            .storage
            .execute(
                Select::from(self.stream_table(), aggregate_id)
                    .after(snapshot.metadata.id.clone())
                    .order_by_commit(Order::Asc)
                    .limit(limit)
                    .into(),
            )
            .await?;
        if rows.len() >= limit {
            tracing::warn!(limit, "snapshot tail reached the read limit, later events are not replayed");
        }
        self.to_nodes(rows)
    }

    /// 反序列化记录并按 `commit_id` 升序排列
    fn to_nodes(&self, rows: Vec<Value>) -> Result<Vec<EventNode>> {
        let mut commits = rows
            .into_iter()
            .map(serde_json::from_value::<EventCommit>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        commits.sort_by(|a, b| a.commit_id().cmp(b.commit_id()));
        commits
            .iter()
            .map(|commit| commit.to_event_node(&self.registry))
            .collect()
    }

    /// 在新聚合上回放历史；持锁时安装失败处理器，回放出错即后台释放锁
    fn replay(
        &self,
        aggregate_id: &str,
        nodes: Vec<EventNode>,
        options: LoadOptions,
    ) -> Result<AggregateRoot<A>> {
        let mut aggregate = AggregateRoot::with_registry(aggregate_id, self.registry.clone());
        if !options.unlocked {
            let lock = self.lock();
            let owned_id = aggregate_id.to_string();
            aggregate.set_failure_handler(move |err| {
                lock.release_in_background(&owned_id);
                Err(err)
            });
        }
        aggregate.load_from_event_nodes(nodes)?;
        Ok(aggregate)
    }

    async fn abort(
        &self,
        lock: &AggregateLock,
        aggregate_id: &str,
        options: LoadOptions,
        err: DomainError,
    ) -> DomainError {
        if !options.unlocked {
            lock.release_quietly(aggregate_id).await;
        }
        err
    }

    /// 构建本次提交的全部写语句：主流插入在前，快照插入在后
    fn prepare_commit(&self, aggregate: &AggregateRoot<A>) -> Result<Vec<Statement>> {
        let events = aggregate.uncommitted_events();
        if let Some(unknown) = events
            .iter()
            .find(|event| !self.registry.contains(event.event_type()))
        {
            return Err(DomainError::UnknownEventType {
                event_type: unknown.event_type().to_string(),
            });
        }

        let loaded = aggregate.loaded_event_nodes();
        let (initial_index, initial_link) = match loaded.last() {
            Some(node) => (node.metadata.index, Some(node.metadata.id.clone())),
            None => (0, None),
        };

        let mut commits: Vec<EventCommit> = Vec::with_capacity(events.len());
        for (position, event) in events.iter().enumerate() {
            let link = match commits.last() {
                Some(previous) => Some(previous.commit_id().to_string()),
                None => initial_link.clone(),
            };
            commits.push(EventCommit::for_event(
                &self.stream,
                aggregate.id(),
                self.id_generator.next_id(),
                initial_index + 1 + position as u64,
                link,
                event,
            )?);
        }

        let mut scratch = AggregateRoot::with_registry(aggregate.id(), self.registry.clone());
        scratch.load_from_event_nodes(loaded.iter().cloned())?;

        let mut snapshots = Vec::new();
        for (event, commit) in events.iter().zip(&commits) {
            scratch.apply(event.clone())?;
            if !self.config.snapshot_policy.should_snapshot(commit.commit_index()) {
                continue;
            }
            if let Some(snapshot) = scratch.snapshot() {
                tracing::debug!(commit_index = commit.commit_index(), "snapshot produced");
                snapshots.push(commit.snapshot_of(&snapshot)?);
            }
        }

        let stream_table = self.stream_table();
        let snapshot_table = self.snapshot_table();
        let mut statements = Vec::with_capacity(commits.len() + snapshots.len());
        for commit in &commits {
            statements.push(insert(&stream_table, commit)?);
        }
        for snapshot in &snapshots {
            statements.push(insert(&snapshot_table, snapshot)?);
        }
        Ok(statements)
    }
}

fn insert(table: &str, record: &EventCommit) -> Result<Statement> {
    Ok(Insert::into_table(table, serde_json::to_value(record)?).into())
}
