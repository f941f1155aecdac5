// ==========================================
// 数据管理平台 - 数据访问层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束: 保留底层引擎错误作为 source，不吞异常、不统一改写
// ==========================================

use crate::engine::EngineError;
use thiserror::Error;

/// 数据访问层错误类型
#[derive(Error, Debug)]
pub enum DataError {
    // ===== 配置错误 =====
    #[error("数据库连接配置错误: {0}")]
    Configuration(String),

    // ===== 查询描述错误 =====
    #[error("无效的查询条件: {0}")]
    InvalidCondition(String),

    #[error("无效的字段名: '{field}'")]
    InvalidFieldName { field: String },

    // ===== 执行错误 =====
    #[error("写入失败 ({operation}): {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: EngineError,
    },

    #[error("查询失败 ({operation}): {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: EngineError,
    },

    // ===== 事务错误 =====
    #[error("事务状态错误: {message}")]
    Transaction {
        message: String,
        #[source]
        source: Option<EngineError>,
    },
}

impl DataError {
    pub fn persistence(operation: &'static str, source: impl Into<EngineError>) -> Self {
        DataError::Persistence {
            operation,
            source: source.into(),
        }
    }

    pub fn query(operation: &'static str, source: impl Into<EngineError>) -> Self {
        DataError::Query {
            operation,
            source: source.into(),
        }
    }

    /// 非法状态转换（无底层原因）
    pub fn transaction(message: impl Into<String>) -> Self {
        DataError::Transaction {
            message: message.into(),
            source: None,
        }
    }

    /// 引擎侧事务操作失败
    pub fn transaction_failed(message: impl Into<String>, source: EngineError) -> Self {
        DataError::Transaction {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn invalid_field(field: &str) -> Self {
        DataError::InvalidFieldName {
            field: field.to_string(),
        }
    }

    /// 底层引擎错误（如有）
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            DataError::Persistence { source, .. } | DataError::Query { source, .. } => Some(source),
            DataError::Transaction { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}

/// Result 类型别名
pub type DataResult<T> = Result<T, DataError>;
