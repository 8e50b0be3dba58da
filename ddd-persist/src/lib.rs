//! 事件溯源聚合持久化库（ddd-persist）
//!
//! 聚合状态由按序回放的不可变事件推导得出，并通过周期快照限制回放长度：
//! - 聚合（`aggregate`）与事件应用引擎（`aggregate_root`）
//! - 领域事件、类型擦除句柄与按类型标签分发的注册表（`domain_event`）
//! - 事件流仓储与快照存储，以及存储引擎、锁服务协议（`persist`）
//! - 持久化后的事件发布（`eventing`）
//!
//! 本 crate 不绑定具体存储与锁实现，仅定义协议并附带内存实现，
//! 以便在不同基础设施（例如宽列数据库、Redis、消息中间件等）上适配。
//!
//! 典型用法：
//! 1. 用 `#[ddd_macros::event]` 定义事件，为状态模型实现 `Aggregate::register`；
//! 2. 通过 `Repository::builder()` 注入存储引擎、锁服务与发布器；
//! 3. `load`/`load_from_snapshot` 取得 `AggregateRoot`，调用 `apply` 记录事件；
//! 4. `commit` 原子写入事件（必要时附带快照），释放锁后发布事件。
//!
pub mod aggregate;
pub mod aggregate_root;
pub mod domain_event;
pub mod error;
pub mod eventing;
pub mod persist;

// 允许在本 crate 内部通过 ::ddd_persist 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::ddd_persist 路径。
extern crate self as ddd_persist;
