//! 持久化层统一错误定义
//!
//! 聚焦序列化/事件注册、并发锁、存储与发布等最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/事件注册 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("unknown event type: {event_type}")]
    UnknownEventType { event_type: String },

    // --- 事件处理 ---
    #[error("event handler error: event_type={event_type}, reason={reason}")]
    EventHandler { event_type: String, reason: String },
    #[error("event publish error: {reason}")]
    Publish { reason: String },

    // --- 仓储/持久化 ---
    #[error("aggregate is locked: {aggregate_id}")]
    LockConflict { aggregate_id: String },
    #[error("storage error: {reason}")]
    Storage { reason: String },
    #[error("lock service error: {reason}")]
    Lock { reason: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },

    // --- 领域规则 ---
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn storage(reason: impl Into<String>) -> Self {
        DomainError::Storage {
            reason: reason.into(),
        }
    }

    pub fn lock(reason: impl Into<String>) -> Self {
        DomainError::Lock {
            reason: reason.into(),
        }
    }

    pub fn publish(reason: impl Into<String>) -> Self {
        DomainError::Publish {
            reason: reason.into(),
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        DomainError::NotFound {
            reason: reason.into(),
        }
    }

    pub fn lock_conflict(aggregate_id: impl Into<String>) -> Self {
        DomainError::LockConflict {
            aggregate_id: aggregate_id.into(),
        }
    }

    /// 聚合正被其他进程持有锁
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, DomainError::LockConflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound { .. })
    }

    /// 存储引擎或锁服务的读写失败（核心不做重试）
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, DomainError::Storage { .. } | DomainError::Lock { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_classified() {
        assert!(DomainError::lock_conflict("a-1").is_lock_conflict());
        assert!(DomainError::not_found("a-1").is_not_found());
        assert!(DomainError::storage("timeout").is_persistence_failure());
        assert!(DomainError::lock("refused").is_persistence_failure());
        assert!(!DomainError::publish("closed").is_persistence_failure());
    }

    #[test]
    fn serde_errors_convert_with_question_mark() {
        fn parse() -> DomainResult<serde_json::Value> {
            Ok(serde_json::from_str("{not json")?)
        }

        match parse().unwrap_err() {
            DomainError::Serde { .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn messages_carry_context() {
        let err = DomainError::lock_conflict("mix:1234567890");
        assert_eq!(err.to_string(), "aggregate is locked: mix:1234567890");
    }
}
