//! 参数化语句（Statement）
//!
//! 仓储只产出结构化语句，由存储引擎决定如何执行：
//! - `Select`：按聚合 ID 查询，可附带 `commit_id >` 游标、排序与条数限制；
//! - `Insert`：整行以 JSON 作为唯一绑定参数写入（`INSERT ... JSON ?`）。
//!
//! 事件载荷从不拼接进语句文本。
//!
use serde_json::Value;
use std::fmt;

/// 按 `commit_id` 排序的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: String,
    pub aggregate_id: String,
    pub after_commit_id: Option<String>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Select {
    pub fn from(table: impl Into<String>, aggregate_id: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            aggregate_id: aggregate_id.into(),
            after_commit_id: None,
            order: None,
            limit: None,
        }
    }

    pub fn after(mut self, commit_id: impl Into<String>) -> Self {
        self.after_commit_id = Some(commit_id.into());
        self
    }

    pub fn order_by_commit(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub row: Value,
}

impl Insert {
    pub fn into_table(table: impl Into<String>, row: Value) -> Self {
        Self {
            table: table.into(),
            row,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
}

impl Statement {
    pub fn table(&self) -> &str {
        match self {
            Statement::Select(select) => &select.table,
            Statement::Insert(insert) => &insert.table,
        }
    }

    /// CQL 文本，参数以 `?` 占位
    pub fn cql(&self) -> String {
        match self {
            Statement::Select(select) => {
                let mut cql = format!("SELECT * FROM {} WHERE aggregate_id = ?", select.table);
                if select.after_commit_id.is_some() {
                    cql.push_str(" AND commit_id > ?");
                }
                match select.order {
                    Some(Order::Asc) => cql.push_str(" ORDER BY commit_id ASC"),
                    Some(Order::Desc) => cql.push_str(" ORDER BY commit_id DESC"),
                    None => {}
                }
                if select.limit.is_some() {
                    cql.push_str(" LIMIT ?");
                }
                cql
            }
            Statement::Insert(insert) => format!("INSERT INTO {} JSON ?", insert.table),
        }
    }

    /// 按占位符顺序排列的绑定参数
    pub fn values(&self) -> Vec<Value> {
        match self {
            Statement::Select(select) => {
                let mut values = vec![Value::from(select.aggregate_id.as_str())];
                if let Some(cursor) = &select.after_commit_id {
                    values.push(Value::from(cursor.as_str()));
                }
                if let Some(limit) = select.limit {
                    values.push(Value::from(limit));
                }
                values
            }
            Statement::Insert(insert) => vec![Value::from(insert.row.to_string())],
        }
    }
}

impl From<Select> for Statement {
    fn from(select: Select) -> Self {
        Statement::Select(select)
    }
}

impl From<Insert> for Statement {
    fn from(insert: Insert) -> Self {
        Statement::Insert(insert)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cql())
    }
}

/// 批量写入选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// 是否使用预编译语句
    pub prepare: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { prepare: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_renders_placeholders_in_binding_order() {
        let stmt: Statement = Select::from("domain_mix_stream", "1234567890")
            .after("01H0000000000000000000000A")
            .order_by_commit(Order::Asc)
            .limit(10)
            .into();

        assert_eq!(
            stmt.cql(),
            "SELECT * FROM domain_mix_stream WHERE aggregate_id = ? AND commit_id > ? ORDER BY commit_id ASC LIMIT ?"
        );
        assert_eq!(
            stmt.values(),
            vec![
                json!("1234567890"),
                json!("01H0000000000000000000000A"),
                json!(10)
            ]
        );
    }

    #[test]
    fn insert_binds_row_json_instead_of_interpolating() {
        let row = json!({ "aggregate_id": "a'); DROP TABLE x; --", "event_data": "{}" });
        let stmt: Statement = Insert::into_table("domain_mix_stream", row.clone()).into();

        assert_eq!(stmt.cql(), "INSERT INTO domain_mix_stream JSON ?");
        assert!(!stmt.cql().contains("DROP"));
        assert_eq!(stmt.values(), vec![Value::from(row.to_string())]);
        assert_eq!(stmt.table(), "domain_mix_stream");
    }
}
