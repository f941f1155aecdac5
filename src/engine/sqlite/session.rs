// ==========================================
// 数据管理平台 - SQLite 会话
// ==========================================
// 职责: 在单个 SQLite 连接上执行参数化语句
// 约束:
// - 显式事务由调用方 begin/commit/rollback 控制
// - 无显式事务时，独占锁写入与批量写入包裹隐式事务
// - 分页查询的计数与取数在同一读事务内完成（同一快照）
// ==========================================

use super::convert::{execute, field_value_from_ref, query_rows};
use crate::domain::{AggregateFn, FieldValue, IsolationLevel, LockMode, Row};
use crate::engine::{EngineError, EngineResult, SelectQuery, Session};
use crate::query::sql_builder::{build_insert_sql, SqlQueryBuilder};
use crate::query::Predicate;
use rusqlite::Connection;
use tracing::warn;

/// SQLite 会话（持有一个独立连接）
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// 是否处于显式事务中
    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// 在隐式事务中执行（已有事务时直接执行）
    ///
    /// # 参数
    /// - `begin_sql`: 隐式事务的 BEGIN 语句
    fn scoped<T>(
        &self,
        begin_sql: &str,
        f: impl FnOnce(&Connection) -> EngineResult<T>,
    ) -> EngineResult<T> {
        if self.in_transaction() {
            return f(&self.conn);
        }

        self.conn.execute_batch(begin_sql)?;
        match f(&self.conn) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback_err, "隐式事务回滚失败");
                }
                Err(e)
            }
        }
    }

    /// 写入范围：独占锁或批量写入时包裹 BEGIN IMMEDIATE / BEGIN DEFERRED
    fn write_scoped<T>(
        &self,
        lock: LockMode,
        batch: bool,
        f: impl FnOnce(&Connection) -> EngineResult<T>,
    ) -> EngineResult<T> {
        if lock.is_exclusive() {
            self.scoped("BEGIN IMMEDIATE", f)
        } else if batch {
            self.scoped("BEGIN DEFERRED", f)
        } else {
            f(&self.conn)
        }
    }
}

fn insert_row(conn: &Connection, table: &str, row: &Row) -> EngineResult<usize> {
    if row.is_empty() {
        return Ok(conn.execute(&format!("INSERT INTO {} DEFAULT VALUES", table), [])?);
    }
    let columns: Vec<&str> = row.column_names().collect();
    let params: Vec<FieldValue> = row.values().cloned().collect();
    Ok(execute(conn, &build_insert_sql(table, &columns), &params)?)
}

fn select_builder(table: &str, query: &SelectQuery<'_>) -> SqlQueryBuilder {
    let mut builder = SqlQueryBuilder::new(&format!("SELECT * FROM {}", table))
        .filter_if(query.filter)
        .order_by(query.order_by.unwrap_or(""));
    if let Some(limit) = query.limit {
        builder = builder.limit(limit);
    }
    if let Some(offset) = query.offset {
        builder = builder.offset(offset);
    }
    builder
}

fn count_rows(conn: &Connection, table: &str, filter: Option<&Predicate>) -> EngineResult<u64> {
    let (sql, params) = SqlQueryBuilder::new(&format!("SELECT COUNT(*) FROM {}", table))
        .filter_if(filter)
        .build();
    let count: i64 = conn.query_row(&sql, rusqlite::params_from_iter(params.iter()), |row| {
        row.get(0)
    })?;
    Ok(count.max(0) as u64)
}

impl Session for SqliteSession {
    // ===== 事务 =====

    fn begin(&mut self, level: IsolationLevel) -> EngineResult<()> {
        // SQLite 只有锁粒度，隔离级别映射为 BEGIN 类型
        let sql = match level {
            IsolationLevel::RepeatableRead => "BEGIN IMMEDIATE",
            IsolationLevel::Serializable => "BEGIN EXCLUSIVE",
            IsolationLevel::Unspecified
            | IsolationLevel::ReadUncommitted
            | IsolationLevel::ReadCommitted => "BEGIN DEFERRED",
        };
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn commit(&mut self) -> EngineResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> EngineResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    // ===== 写入 =====

    fn insert(&mut self, table: &str, rows: &[Row], lock: LockMode) -> EngineResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.write_scoped(lock, rows.len() > 1, |conn| {
            let mut affected = 0;
            for row in rows {
                affected += insert_row(conn, table, row)?;
            }
            Ok(affected)
        })
    }

    fn insert_returning_key(
        &mut self,
        table: &str,
        row: &Row,
        lock: LockMode,
    ) -> EngineResult<i64> {
        self.write_scoped(lock, false, |conn| {
            insert_row(conn, table, row)?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn update(
        &mut self,
        table: &str,
        set: &Row,
        filter: &Predicate,
        lock: LockMode,
    ) -> EngineResult<usize> {
        if set.is_empty() {
            return Err(EngineError::Unsupported("UPDATE 语句缺少 SET 列".to_string()));
        }

        let assignments: Vec<String> = set.column_names().map(|c| format!("{} = ?", c)).collect();
        let (sql, where_params) =
            SqlQueryBuilder::new(&format!("UPDATE {} SET {}", table, assignments.join(", ")))
                .filter(filter)
                .build();

        let mut params: Vec<FieldValue> = set.values().cloned().collect();
        params.extend(where_params);

        self.write_scoped(lock, false, |conn| Ok(execute(conn, &sql, &params)?))
    }

    fn delete(&mut self, table: &str, filter: &Predicate, lock: LockMode) -> EngineResult<usize> {
        let (sql, params) = SqlQueryBuilder::new(&format!("DELETE FROM {}", table))
            .filter(filter)
            .build();
        self.write_scoped(lock, false, |conn| Ok(execute(conn, &sql, &params)?))
    }

    // ===== 查询 =====

    fn select(&mut self, table: &str, query: SelectQuery<'_>) -> EngineResult<Vec<Row>> {
        let (sql, params) = select_builder(table, &query).build();
        Ok(query_rows(&self.conn, &sql, &params)?)
    }

    fn select_page(
        &mut self,
        table: &str,
        query: SelectQuery<'_>,
    ) -> EngineResult<(Vec<Row>, u64)> {
        let (sql, params) = select_builder(table, &query).build();
        self.scoped("BEGIN DEFERRED", |conn| {
            let total = count_rows(conn, table, query.filter)?;
            let rows = query_rows(conn, &sql, &params)?;
            Ok((rows, total))
        })
    }

    fn count(&mut self, table: &str, filter: Option<&Predicate>) -> EngineResult<u64> {
        count_rows(&self.conn, table, filter)
    }

    fn aggregate(
        &mut self,
        table: &str,
        func: AggregateFn,
        field: &str,
        filter: Option<&Predicate>,
    ) -> EngineResult<FieldValue> {
        let (sql, params) = SqlQueryBuilder::new(&format!(
            "SELECT {}({}) FROM {}",
            func.sql_name(),
            field,
            table
        ))
        .filter_if(filter)
        .build();

        let value = self
            .conn
            .query_row(&sql, rusqlite::params_from_iter(params.iter()), |row| {
                Ok(field_value_from_ref(row.get_ref(0)?))
            })?;
        Ok(value)
    }

    // ===== 原生 SQL / 存储过程 =====

    fn raw_query(&mut self, sql: &str, params: &[FieldValue]) -> EngineResult<Vec<Row>> {
        Ok(query_rows(&self.conn, sql, params)?)
    }

    fn call_procedure(&mut self, name: &str, _params: &[FieldValue]) -> EngineResult<Vec<Row>> {
        Err(EngineError::Unsupported(format!(
            "SQLite 不支持存储过程调用: {}",
            name
        )))
    }
}
