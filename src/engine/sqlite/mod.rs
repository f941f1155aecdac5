// ==========================================
// 数据管理平台 - SQLite 查询引擎
// ==========================================
// 职责: QueryEngine 的 SQLite 实现
// 约束:
// - 连接串即数据库文件路径
// - 每个会话打开独立连接；从库以只读方式打开
// ==========================================

mod convert;
mod session;

pub use session::SqliteSession;

use crate::db::{open_sqlite_connection, DEFAULT_BUSY_TIMEOUT_MS};
use crate::domain::ConnectionEndpoint;
use crate::engine::{EngineResult, QueryEngine, Session};
use crate::perf::{install_sqlite_tracing, SqlTraceSettings};
use anyhow::Context;
use std::time::Duration;
use tracing::debug;

/// SQLite 查询引擎
#[derive(Debug, Clone)]
pub struct SqliteEngine {
    busy_timeout: Duration,
    trace: SqlTraceSettings,
}

impl SqliteEngine {
    /// 创建引擎（SQL 追踪配置读取环境变量）
    ///
    /// # 参数
    /// - `statement_timeout`: 语句超时（作为 busy_timeout）
    pub fn new(statement_timeout: Duration) -> Self {
        Self {
            busy_timeout: statement_timeout,
            trace: SqlTraceSettings::from_env(),
        }
    }

    pub fn with_trace(mut self, trace: SqlTraceSettings) -> Self {
        self.trace = trace;
        self
    }

    pub fn statement_timeout(&self) -> Duration {
        self.busy_timeout
    }
}

impl Default for SqliteEngine {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
    }
}

impl QueryEngine for SqliteEngine {
    fn open_session(&self, endpoint: &ConnectionEndpoint) -> EngineResult<Box<dyn Session>> {
        let read_only = !endpoint.is_primary();
        // 打开失败时附带端点角色（连接串不进入错误信息）
        let mut conn =
            open_sqlite_connection(&endpoint.connection_string, read_only, self.busy_timeout)
                .with_context(|| format!("打开 SQLite 连接失败: {}", endpoint))?;
        install_sqlite_tracing(&mut conn, &self.trace);

        debug!(endpoint = %endpoint, read_only, "打开 SQLite 会话");
        Ok(Box::new(SqliteSession::new(conn)))
    }
}
