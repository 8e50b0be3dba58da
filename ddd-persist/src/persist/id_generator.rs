use std::sync::Mutex;
use ulid::{Generator, Ulid};

/// 标识生成器：聚合 ID 与提交 ID 均由此生成
///
/// 生成的标识需大致按时间有序；历史按 `commit_id` 排序后即为提交顺序。
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// 单调 ULID 生成器：同一毫秒内连续生成的标识也严格递增
pub struct UlidGenerator {
    inner: Mutex<Generator>,
}

impl UlidGenerator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }
}

impl Default for UlidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for UlidGenerator {
    fn next_id(&self) -> String {
        let generated = match self.inner.lock() {
            Ok(mut generator) => generator.generate(),
            Err(poisoned) => poisoned.into_inner().generate(),
        };

        match generated {
            Ok(id) => id.to_string(),
            Err(err) => {
                // 同一毫秒内随机位溢出，退化为非单调 ULID
                tracing::warn!(error = %err, "monotonic ulid overflow");
                Ulid::new().to_string()
            }
        }
    }
}
