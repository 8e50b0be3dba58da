//! 内存版存储引擎（InMemoryStorage）
//!
//! 以表名为键保存 JSON 行，满足 `StorageEngine` 协议：
//! - 插入按 `(aggregate_id, commit_id)` 覆盖（与宽列存储的 upsert 语义一致）；
//! - 查询支持聚合过滤、`commit_id >` 游标、排序与条数限制；
//! - `batch` 先校验全部语句再统一写入，保证原子性。
//!
//! 典型用途：测试环境、示例与本地开发。
//!
use super::statement::{BatchOptions, Insert, Order, Select, Statement};
use super::storage::StorageEngine;
use crate::error::{DomainError, DomainResult as Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

type Tables = HashMap<String, Vec<Value>>;

#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某张表当前的全部行（插入顺序）
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.guard()
            .map(|tables| tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| DomainError::storage("in-memory storage poisoned"))
    }

    fn select(tables: &Tables, select: &Select) -> Vec<Value> {
        let mut rows: Vec<Value> = tables
            .get(&select.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| field(row, "aggregate_id") == Some(select.aggregate_id.as_str()))
                    .filter(|row| match &select.after_commit_id {
                        Some(cursor) => {
                            field(row, "commit_id").is_some_and(|id| id > cursor.as_str())
                        }
                        None => true,
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = select.order {
            rows.sort_by(|a, b| field(a, "commit_id").cmp(&field(b, "commit_id")));
            if order == Order::Desc {
                rows.reverse();
            }
        }
        if let Some(limit) = select.limit {
            rows.truncate(limit);
        }
        rows
    }

    fn upsert(tables: &mut Tables, insert: Insert) {
        let rows = tables.entry(insert.table).or_default();
        let key = |row: &Value| {
            (
                field(row, "aggregate_id").map(str::to_owned),
                field(row, "commit_id").map(str::to_owned),
            )
        };
        let new_key = key(&insert.row);
        match rows.iter_mut().find(|row| key(row) == new_key) {
            Some(existing) => *existing = insert.row,
            None => rows.push(insert.row),
        }
    }
}

fn field<'a>(row: &'a Value, name: &str) -> Option<&'a str> {
    row.get(name).and_then(Value::as_str)
}

fn validate(insert: &Insert) -> Result<()> {
    if field(&insert.row, "aggregate_id").is_none() {
        return Err(DomainError::storage(format!(
            "row for {} is missing aggregate_id",
            insert.table
        )));
    }
    Ok(())
}

#[async_trait]
impl StorageEngine for InMemoryStorage {
    async fn execute(&self, statement: Statement) -> Result<Vec<Value>> {
        let mut tables = self.guard()?;
        match statement {
            Statement::Select(select) => Ok(Self::select(&tables, &select)),
            Statement::Insert(insert) => {
                validate(&insert)?;
                Self::upsert(&mut tables, insert);
                Ok(Vec::new())
            }
        }
    }

    async fn batch(&self, statements: Vec<Statement>, _options: BatchOptions) -> Result<()> {
        let inserts = statements
            .into_iter()
            .map(|statement| match statement {
                Statement::Insert(insert) => validate(&insert).map(|_| insert),
                Statement::Select(select) => Err(DomainError::storage(format!(
                    "batch only accepts writes, got select on {}",
                    select.table
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut tables = self.guard()?;
        for insert in inserts {
            Self::upsert(&mut tables, insert);
        }
        Ok(())
    }
}
