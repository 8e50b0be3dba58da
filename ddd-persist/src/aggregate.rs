//! 聚合（Aggregate）抽象
//!
//! 约束一个聚合状态模型的核心行为：
//! - `register` 在定义处登记全部事件类型及其处理器（处理器直接修改状态）；
//! - `snapshot` 可选地把当前状态压缩为一个快照事件；
//! - 运行期的事件簿记（未提交、已加载、提交链位置）由 `AggregateRoot` 负责。
//!
use crate::domain_event::{AnyEvent, EventRegistry};

/// 事件溯源聚合的状态模型
pub trait Aggregate: Default + Clone + Send + Sync + 'static {
    const TYPE: &'static str;

    /// 新聚合的初始状态
    fn initial(aggregate_id: &str) -> Self {
        let _ = aggregate_id;
        Self::default()
    }

    /// 登记该聚合使用的全部事件类型
    ///
    /// 从事件节点加载时每个事件会被回放两次，处理器必须可重复执行：
    /// 事件应携带结果值（如变更后的余额），处理器赋值而非累加。
    fn register(registry: &mut EventRegistry<Self>);

    /// 生成表示当前状态的快照事件，默认不生成
    fn snapshot(&self) -> Option<AnyEvent> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::Aggregate;
    use crate::aggregate_root::AggregateRoot;
    use crate::domain_event::{AnyEvent, EventRegistry};
    use ddd_macros::event;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Profile {
        id: String,
        name: String,
    }

    #[event]
    struct NameSet {
        name: String,
    }

    #[event]
    struct ProfileSnapshot {
        name: String,
    }

    impl Aggregate for Profile {
        const TYPE: &'static str = "profile";

        fn initial(aggregate_id: &str) -> Self {
            Self {
                id: aggregate_id.to_string(),
                ..Default::default()
            }
        }

        fn register(registry: &mut EventRegistry<Self>) {
            registry
                .on::<NameSet, _>(|state, event| state.name = event.name.clone())
                .on::<ProfileSnapshot, _>(|state, event| state.name = event.name.clone());
        }

        fn snapshot(&self) -> Option<AnyEvent> {
            Some(
                ProfileSnapshot {
                    name: self.name.clone(),
                }
                .into(),
            )
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Silent;

    impl Aggregate for Silent {
        const TYPE: &'static str = "silent";

        fn register(_registry: &mut EventRegistry<Self>) {}
    }

    #[test]
    fn initial_state_receives_the_aggregate_id() {
        let root = AggregateRoot::<Profile>::new("p-1");
        assert_eq!(root.state().id, "p-1");
        assert_eq!(root.state().name, "");
    }

    #[test]
    fn snapshot_condenses_current_state() {
        let mut root = AggregateRoot::<Profile>::new("p-1");
        root.apply(NameSet {
            name: "alice".into(),
        })
        .unwrap();

        let snapshot = root.snapshot().unwrap();
        assert_eq!(snapshot.event_type(), "ProfileSnapshot");

        let mut restored = AggregateRoot::<Profile>::new("p-1");
        restored.load_from_history(vec![snapshot]).unwrap();
        assert_eq!(restored.state(), root.state());
    }

    #[test]
    fn default_snapshot_is_none() {
        let root = AggregateRoot::<Silent>::new("s-1");
        assert!(root.snapshot().is_none());
    }
}
