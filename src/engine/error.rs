// ==========================================
// 数据管理平台 - 查询引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 用途: 作为 DataError 的 source 保留原始失败原因
// ==========================================

use thiserror::Error;

/// 查询引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    #[error("SQLite 执行失败: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("数据行映射失败: {0}")]
    Mapping(#[from] serde_json::Error),

    #[error("引擎不支持该操作: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 约束类失败单独归类，其余保留原始 rusqlite 错误
impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                EngineError::UniqueConstraintViolation(msg.clone())
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("FOREIGN KEY") => {
                EngineError::ForeignKeyViolation(msg.clone())
            }
            _ => EngineError::Sqlite(err),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
