//! 存储引擎协议（StorageEngine）
//!
//! 仓储只依赖两个原语：单语句执行与原子批量写入。
//! 查询结果以 JSON 行返回（与 `SELECT JSON` 的行形态一致），由调用方反序列化。
//!
use super::statement::{BatchOptions, Statement};
use crate::error::DomainResult as Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// 执行单条语句并返回结果行
    async fn execute(&self, statement: Statement) -> Result<Vec<Value>>;

    /// 原子地执行多条写语句
    async fn batch(&self, statements: Vec<Statement>, options: BatchOptions) -> Result<()>;
}

#[async_trait]
impl<T> StorageEngine for Arc<T>
where
    T: StorageEngine + ?Sized,
{
    async fn execute(&self, statement: Statement) -> Result<Vec<Value>> {
        (**self).execute(statement).await
    }

    async fn batch(&self, statements: Vec<Statement>, options: BatchOptions) -> Result<()> {
        (**self).batch(statements, options).await
    }
}
