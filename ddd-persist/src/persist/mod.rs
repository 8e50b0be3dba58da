//! 持久化与事件溯源（persist）
//!
//! 定义聚合持久化所需的记录、语句与外部协作方协议，以及两种持久化方式：
//! - 事件流仓储（`Repository`）：完整历史 + 周期快照，带聚合锁与提交链；
//! - 快照存储（`SnapshotStore`）：每个聚合只保留最近快照，无历史、无锁。
//!
//! 存储引擎（`StorageEngine`）、锁服务（`LockClient`）由上层注入；
//! 本模块附带内存实现，便于测试与本地运行。
//!
mod aggregate_repository;
mod config;
mod event_commit;
mod event_state;
mod id_generator;
mod lock;
mod lock_inmemory;
mod snapshot_store;
mod statement;
mod storage;
mod storage_inmemory;

pub use aggregate_repository::Repository;
pub use config::{LoadOptions, RepositoryConfig, SnapshotPolicy};
pub use event_commit::EventCommit;
pub use event_state::EventState;
pub use id_generator::{IdGenerator, UlidGenerator};
pub use lock::{AggregateLock, LockClient, SetMode};
pub use lock_inmemory::InMemoryLockClient;
pub use snapshot_store::SnapshotStore;
pub use statement::{BatchOptions, Insert, Order, Select, Statement};
pub use storage::StorageEngine;
pub use storage_inmemory::InMemoryStorage;
