#![allow(dead_code)]

use async_trait::async_trait;
use ddd_macros::event;
use ddd_persist::aggregate::Aggregate;
use ddd_persist::aggregate_root::AggregateRoot;
use ddd_persist::domain_event::{AnyEvent, EventRegistry};
use ddd_persist::error::{DomainError, DomainResult};
use ddd_persist::eventing::EventPublisher;
use ddd_persist::persist::{
    BatchOptions, InMemoryLockClient, InMemoryStorage, LockClient, Repository, SetMode,
    SnapshotStore, Statement, StorageEngine, UlidGenerator,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const STREAM: &str = "mix";
pub const AGGREGATE_ID: &str = "1234567890";
pub const STREAM_TABLE: &str = "domain_mix_stream";
pub const SNAPSHOT_TABLE: &str = "domain_mix_snapshot";

#[event]
pub struct AddedNameEvent {
    pub name: String,
}

#[event]
pub struct AddedDescriptionEvent {
    pub description: String,
}

#[event]
pub struct SnapshotEvent {
    pub name: String,
    pub description: String,
}

/// 处理器总是失败
#[event]
pub struct RejectedEvent {
    pub reason: String,
}

/// 未在聚合上登记
#[event]
pub struct StrayEvent {
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mix {
    pub name: String,
    pub description: String,
}

impl Aggregate for Mix {
    const TYPE: &'static str = "mix";

    fn register(registry: &mut EventRegistry<Self>) {
        registry
            .on(|state: &mut Self, event: &AddedNameEvent| state.name = event.name.clone())
            .on(|state: &mut Self, event: &AddedDescriptionEvent| {
                state.description = event.description.clone()
            })
            .on(|state: &mut Self, event: &SnapshotEvent| {
                state.name = event.name.clone();
                state.description = event.description.clone();
            })
            .try_on(|_: &mut Self, event: &RejectedEvent| {
                Err(DomainError::InvalidState {
                    reason: event.reason.clone(),
                })
            });
    }

    fn snapshot(&self) -> Option<AnyEvent> {
        Some(AnyEvent::new(SnapshotEvent {
            name: self.name.clone(),
            description: self.description.clone(),
        }))
    }
}

pub trait MixCommands {
    fn add_name(&mut self, name: &str) -> DomainResult<()>;

    fn add_description(&mut self, description: &str) -> DomainResult<()>;
}

impl MixCommands for AggregateRoot<Mix> {
    fn add_name(&mut self, name: &str) -> DomainResult<()> {
        self.apply(AddedNameEvent {
            name: name.to_string(),
        })
    }

    fn add_description(&mut self, description: &str) -> DomainResult<()> {
        self.apply(AddedDescriptionEvent {
            description: description.to_string(),
        })
    }
}

/// 记录每条语句的存储引擎，可注入批量写入失败
#[derive(Default)]
pub struct RecordingStorage {
    inner: InMemoryStorage,
    executed: Mutex<Vec<Statement>>,
    batches: Mutex<Vec<Vec<Statement>>>,
    fail_batches: AtomicBool,
}

impl RecordingStorage {
    pub fn executed(&self) -> Vec<Statement> {
        self.executed.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Vec<Statement>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn fail_batches(&self) {
        self.fail_batches.store(true, Ordering::SeqCst);
    }

    /// 按 `commit_id` 升序排列的表内容
    pub fn rows(&self, table: &str) -> Vec<Value> {
        let mut rows = self.inner.rows(table);
        rows.sort_by(|a, b| a["commit_id"].as_str().cmp(&b["commit_id"].as_str()));
        rows
    }

    /// 绕过记录直接写入
    pub async fn seed(&self, statement: Statement) {
        self.inner.execute(statement).await.unwrap();
    }

    pub fn reset(&self) {
        self.executed.lock().unwrap().clear();
        self.batches.lock().unwrap().clear();
    }
}

#[async_trait]
impl StorageEngine for RecordingStorage {
    async fn execute(&self, statement: Statement) -> DomainResult<Vec<Value>> {
        self.executed.lock().unwrap().push(statement.clone());
        self.inner.execute(statement).await
    }

    async fn batch(&self, statements: Vec<Statement>, options: BatchOptions) -> DomainResult<()> {
        assert!(options.prepare, "batches are submitted as prepared statements");
        self.batches.lock().unwrap().push(statements.clone());
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(DomainError::storage("batch rejected"));
        }
        self.inner.batch(statements, options).await
    }
}

/// 记录每次调用的锁服务
#[derive(Default)]
pub struct RecordingLocks {
    inner: InMemoryLockClient,
    calls: Mutex<Vec<String>>,
    fail_next_del: AtomicBool,
}

impl RecordingLocks {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(op))
            .count()
    }

    pub async fn hold(&self, key: &str) {
        self.inner
            .set(key, key, SetMode::Ex, Duration::from_secs(5))
            .await
            .unwrap();
    }

    pub async fn release(&self, key: &str) {
        self.inner.del(key).await.unwrap();
    }

    pub async fn is_held(&self, key: &str) -> bool {
        self.inner.get(key).await.unwrap().is_some()
    }

    /// 下一次 `del` 返回锁服务错误
    pub fn fail_next_del(&self) {
        self.fail_next_del.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl LockClient for RecordingLocks {
    async fn set(&self, key: &str, value: &str, mode: SetMode, ttl: Duration) -> DomainResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("set {key} {value} {mode:?} {}", ttl.as_secs()));
        self.inner.set(key, value, mode, ttl).await
    }

    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        self.calls.lock().unwrap().push(format!("get {key}"));
        self.inner.get(key).await
    }

    async fn del(&self, key: &str) -> DomainResult<()> {
        self.calls.lock().unwrap().push(format!("del {key}"));
        if self.fail_next_del.swap(false, Ordering::SeqCst) {
            return Err(DomainError::lock("del refused"));
        }
        self.inner.del(key).await
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<AnyEvent>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<AnyEvent> {
        self.published.lock().unwrap().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.published().iter().map(AnyEvent::event_type).collect()
    }

    pub fn reset(&self) {
        self.published.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &AnyEvent) -> DomainResult<()> {
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// 共享同一组协作方的仓储/存储装配
pub struct Fixture {
    pub storage: Arc<RecordingStorage>,
    pub locks: Arc<RecordingLocks>,
    pub publisher: Arc<RecordingPublisher>,
    ids: Arc<UlidGenerator>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RecordingStorage::default()),
            locks: Arc::new(RecordingLocks::default()),
            publisher: Arc::new(RecordingPublisher::default()),
            ids: Arc::new(UlidGenerator::new()),
        }
    }

    pub fn repository(&self) -> Repository<Mix> {
        Repository::builder()
            .stream(STREAM)
            .storage(self.storage.clone())
            .lock_client(self.locks.clone())
            .publisher(self.publisher.clone())
            .id_generator(self.ids.clone())
            .build()
    }

    pub fn store(&self) -> SnapshotStore<Mix> {
        SnapshotStore::builder()
            .stream(STREAM)
            .storage(self.storage.clone())
            .publisher(self.publisher.clone())
            .build()
    }

    pub fn lock_key(&self) -> String {
        format!("{STREAM}:{AGGREGATE_ID}")
    }

    /// 以 `name-1..=name-n` 写入 n 条历史（一次提交），然后清空所有记录
    pub async fn seed_names(&self, count: usize) {
        let repository = self.repository();
        let mut mix = repository.create(Some(AGGREGATE_ID));
        for n in 1..=count {
            mix.add_name(&format!("name-{n}")).unwrap();
        }
        repository.commit(&mut mix).await.unwrap();
        self.reset();
    }

    pub fn reset(&self) {
        self.storage.reset();
        self.locks.reset();
        self.publisher.reset();
    }
}

pub fn insert_row(statement: &Statement) -> &Value {
    match statement {
        Statement::Insert(insert) => &insert.row,
        Statement::Select(select) => panic!("expected insert, got select on {}", select.table),
    }
}
