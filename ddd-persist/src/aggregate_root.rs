//! 聚合根（AggregateRoot）事件应用引擎
//!
//! 持有聚合标识、状态与三份事件簿记：
//! - 未提交事件：自上次 `commit/uncommit` 以来应用的事件；
//! - 已加载事件：从历史回放进来的事件；
//! - 已加载节点：带提交位置的历史事件，为提交链的续接提供 `index/link`。
//!
//! 事件通过注册表按类型标签分发到处理器；处理器失败时交给失败处理器，
//! 仓储借此在回放失败时释放聚合锁。
//!
use crate::{
    aggregate::Aggregate,
    domain_event::{AnyEvent, EventNode, EventRegistry},
    error::{DomainError, DomainResult},
};
use std::fmt;
use std::sync::Arc;

/// 失败处理器：返回 `Ok` 表示吞掉错误继续执行，返回 `Err` 表示继续上抛
pub type FailureHandler = Arc<dyn Fn(DomainError) -> DomainResult<()> + Send + Sync>;

pub struct AggregateRoot<A>
where
    A: Aggregate,
{
    id: String,
    state: A,
    registry: Arc<EventRegistry<A>>,
    uncommitted_events: Vec<AnyEvent>,
    loaded_events: Vec<AnyEvent>,
    loaded_event_nodes: Vec<EventNode>,
    failure_handler: Option<FailureHandler>,
}

impl<A> AggregateRoot<A>
where
    A: Aggregate,
{
    /// 使用给定标识创建空聚合
    pub fn new(aggregate_id: impl Into<String>) -> Self {
        Self::with_registry(aggregate_id, Arc::new(EventRegistry::of()))
    }

    /// 使用新生成的 ULID 标识创建空聚合
    pub fn generate() -> Self {
        Self::new(ulid::Ulid::new().to_string())
    }

    /// 复用已构建的注册表（仓储为每个聚合类型只构建一次）
    pub fn with_registry(aggregate_id: impl Into<String>, registry: Arc<EventRegistry<A>>) -> Self {
        let id = aggregate_id.into();
        Self {
            state: A::initial(&id),
            id,
            registry,
            uncommitted_events: Vec::new(),
            loaded_events: Vec::new(),
            loaded_event_nodes: Vec::new(),
            failure_handler: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &A {
        &self.state
    }

    pub fn registry(&self) -> &Arc<EventRegistry<A>> {
        &self.registry
    }

    pub fn uncommitted_events(&self) -> &[AnyEvent] {
        &self.uncommitted_events
    }

    pub fn loaded_events(&self) -> &[AnyEvent] {
        &self.loaded_events
    }

    pub fn loaded_event_nodes(&self) -> &[EventNode] {
        &self.loaded_event_nodes
    }

    /// 应用一个新事件：记入未提交列表并分发到处理器
    pub fn apply(&mut self, event: impl Into<AnyEvent>) -> DomainResult<()> {
        self.apply_event(event.into(), false)
    }

    /// 应用一个历史事件：只分发，不记入未提交列表
    pub fn apply_from_history(&mut self, event: impl Into<AnyEvent>) -> DomainResult<()> {
        self.apply_event(event.into(), true)
    }

    fn apply_event(&mut self, event: AnyEvent, from_history: bool) -> DomainResult<()> {
        if !from_history {
            self.uncommitted_events.push(event.clone());
        }

        match self.registry.dispatch(&mut self.state, &event) {
            Ok(()) => Ok(()),
            Err(err) => self.fail(err),
        }
    }

    /// 按给定顺序回放历史事件，并记入已加载事件
    pub fn load_from_history<I>(&mut self, history: I) -> DomainResult<()>
    where
        I: IntoIterator<Item = AnyEvent>,
    {
        for event in history {
            self.apply_event(event.clone(), true)?;
            self.loaded_events.push(event);
        }
        Ok(())
    }

    /// 回放带提交位置的历史节点
    ///
    /// 先逐个应用节点事件并记入已加载节点，再把同一批事件经
    /// `load_from_history` 再回放一遍，使两份历史保持一致；
    /// 因此处理器必须是状态的纯函数（重复回放结果不变）。
    pub fn load_from_event_nodes<I>(&mut self, nodes: I) -> DomainResult<()>
    where
        I: IntoIterator<Item = EventNode>,
    {
        let mut events = Vec::new();
        for node in nodes {
            self.apply_event(node.event.clone(), true)?;
            events.push(node.event.clone());
            self.loaded_event_nodes.push(node);
        }
        self.load_from_history(events)
    }

    /// 当前状态的快照事件
    pub fn snapshot(&self) -> Option<AnyEvent> {
        self.state.snapshot()
    }

    /// 标记未提交事件已持久化
    pub fn commit(&mut self) {
        self.uncommitted_events.clear();
    }

    /// 丢弃未提交事件
    pub fn uncommit(&mut self) {
        self.uncommitted_events.clear();
    }

    pub fn set_failure_handler<F>(&mut self, handler: F)
    where
        F: Fn(DomainError) -> DomainResult<()> + Send + Sync + 'static,
    {
        self.failure_handler = Some(Arc::new(handler));
    }

    /// 交给失败处理器处理；未设置处理器时直接上抛
    pub fn fail(&self, error: DomainError) -> DomainResult<()> {
        match &self.failure_handler {
            Some(handler) => handler(error),
            None => Err(error),
        }
    }
}

impl<A> fmt::Debug for AggregateRoot<A>
where
    A: Aggregate + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateRoot")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("uncommitted_events", &self.uncommitted_events)
            .field("loaded_events", &self.loaded_events.len())
            .field("loaded_event_nodes", &self.loaded_event_nodes.len())
            .finish()
    }
}
