use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 操作元数据
///
/// 命令/查询/内部事件在构造时生成，生成后不可变：
/// - `operation_id`：全局唯一的不透明标识，用于日志与追踪关联；
/// - `created_at`：构造时刻的 UTC 时间戳。
#[derive(Debug, Clone)]
pub struct OperationMeta {
    operation_id: Uuid,
    created_at: DateTime<Utc>,
}

impl OperationMeta {
    pub fn new() -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }
}

impl Default for OperationMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// 操作（Operation）
///
/// 命令、查询与内部事件共同满足的能力边界，仅暴露元数据访问。
pub trait Operation: Send + Sync + 'static {
    fn meta(&self) -> &OperationMeta;

    fn operation_id(&self) -> Uuid {
        self.meta().operation_id()
    }

    fn created_at(&self) -> &DateTime<Utc> {
        self.meta().created_at()
    }
}
