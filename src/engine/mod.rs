// ==========================================
// 数据管理平台 - 查询引擎边界
// ==========================================
// 职责: 定义仓储层依赖的外部查询/执行引擎接口
// 约束: 仓储只依赖 QueryEngine / Session，与具体数据库无关
// ==========================================

pub mod error;
pub mod sqlite;

pub use error::{EngineError, EngineResult};
pub use sqlite::SqliteEngine;

use crate::domain::{AggregateFn, ConnectionEndpoint, FieldValue, IsolationLevel, LockMode, Row};
use crate::query::Predicate;

// ==========================================
// SelectQuery - 单表查询参数
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectQuery<'a> {
    pub filter: Option<&'a Predicate>,
    /// 已校验的排序子句（例如 "name asc,age desc"）
    pub order_by: Option<&'a str>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl<'a> SelectQuery<'a> {
    pub fn filtered(filter: &'a Predicate) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// 查询引擎：按端点打开会话
///
/// 每个逻辑操作或事务独占一个会话，会话不在线程间共享。
pub trait QueryEngine: Send + Sync {
    fn open_session(&self, endpoint: &ConnectionEndpoint) -> EngineResult<Box<dyn Session>>;
}

/// 引擎会话（一个底层连接）
///
/// `table` / 列名 / 排序子句在到达会话前已通过标识符校验。
pub trait Session: Send {
    // ===== 事务 =====
    fn begin(&mut self, level: IsolationLevel) -> EngineResult<()>;
    fn commit(&mut self) -> EngineResult<()>;
    fn rollback(&mut self) -> EngineResult<()>;

    // ===== 写入 =====
    fn insert(&mut self, table: &str, rows: &[Row], lock: LockMode) -> EngineResult<usize>;

    /// 插入单行并返回生成的主键
    fn insert_returning_key(&mut self, table: &str, row: &Row, lock: LockMode)
        -> EngineResult<i64>;

    fn update(
        &mut self,
        table: &str,
        set: &Row,
        filter: &Predicate,
        lock: LockMode,
    ) -> EngineResult<usize>;

    fn delete(&mut self, table: &str, filter: &Predicate, lock: LockMode) -> EngineResult<usize>;

    // ===== 查询 =====
    fn select(&mut self, table: &str, query: SelectQuery<'_>) -> EngineResult<Vec<Row>>;

    /// 分页查询：返回 (当前页数据, 总行数)，两者基于同一过滤条件
    fn select_page(
        &mut self,
        table: &str,
        query: SelectQuery<'_>,
    ) -> EngineResult<(Vec<Row>, u64)>;

    fn count(&mut self, table: &str, filter: Option<&Predicate>) -> EngineResult<u64>;

    fn aggregate(
        &mut self,
        table: &str,
        func: AggregateFn,
        field: &str,
        filter: Option<&Predicate>,
    ) -> EngineResult<FieldValue>;

    // ===== 原生 SQL / 存储过程 =====
    fn raw_query(&mut self, sql: &str, params: &[FieldValue]) -> EngineResult<Vec<Row>>;

    fn call_procedure(&mut self, name: &str, params: &[FieldValue]) -> EngineResult<Vec<Row>>;
}
