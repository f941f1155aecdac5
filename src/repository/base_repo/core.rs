use crate::config::DataSourceConfig;
use crate::domain::{ConnectionEndpoint, Entity, FieldValue, IsolationLevel, Row, TransactionState};
use crate::engine::{EngineResult, QueryEngine, Session};
use crate::query::{ensure_identifier, Predicate};
use crate::repository::error::{DataError, DataResult};
use crate::routing::ConnectionRouter;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// 活动事务：独占一个主库会话
pub(super) struct ActiveTransaction {
    pub(super) session: Box<dyn Session>,
    pub(super) level: IsolationLevel,
}

// ==========================================
// Repository - 通用实体仓储
// ==========================================
// 红线: 一个仓储实例在生命周期内绑定同一个路由器
// 约束: 方法均为 &mut self；带活动事务的仓储即一个工作单元，
//       跨线程共享需调用方自行同步
pub struct Repository<T: Entity> {
    router: Arc<ConnectionRouter>,
    engine: Arc<dyn QueryEngine>,
    pub(super) tx: Option<ActiveTransaction>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Repository<T> {
    /// 创建仓储
    ///
    /// # 参数
    /// - `router`: 连接路由器（可在多个仓储间共享）
    /// - `engine`: 查询引擎
    pub fn new(router: Arc<ConnectionRouter>, engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            router,
            engine,
            tx: None,
            _marker: PhantomData,
        }
    }

    /// 按数据源配置创建（SQLite 引擎）
    pub fn from_config(config: &DataSourceConfig) -> DataResult<Self> {
        let router = config.build_router()?;
        Ok(Self::new(Arc::new(router), Arc::new(config.sqlite_engine())))
    }

    pub fn router(&self) -> &ConnectionRouter {
        &self.router
    }

    /// 当前事务状态
    pub fn transaction_state(&self) -> TransactionState {
        if self.tx.is_some() {
            TransactionState::Active
        } else {
            TransactionState::Idle
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// 活动事务的隔离级别
    pub fn isolation_level(&self) -> Option<IsolationLevel> {
        self.tx.as_ref().map(|tx| tx.level)
    }

    // ==========================================
    // 会话调度
    // ==========================================

    /// 执行写操作
    ///
    /// 事务内使用事务会话，失败时回滚并置为 Idle；
    /// 事务外向主库打开独立会话
    pub(super) fn run_write<R>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut dyn Session) -> EngineResult<R>,
    ) -> DataResult<R> {
        if let Some(tx) = self.tx.as_mut() {
            debug!(operation, table = T::table_name(), "事务内写操作");
            return match f(tx.session.as_mut()) {
                Ok(value) => Ok(value),
                Err(e) => {
                    self.abort_transaction(operation);
                    Err(DataError::persistence(operation, e))
                }
            };
        }

        let endpoint = self.router.select_for_write();
        debug!(operation, table = T::table_name(), endpoint = %endpoint, "写操作路由");
        let mut session = self
            .engine
            .open_session(endpoint)
            .map_err(|e| DataError::persistence(operation, e))?;
        f(session.as_mut()).map_err(|e| DataError::persistence(operation, e))
    }

    /// 执行多语句写操作（事务外时包裹隐式事务，保证全部成功或全部撤销）
    pub(super) fn run_write_atomic<R>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut dyn Session) -> EngineResult<R>,
    ) -> DataResult<R> {
        if self.tx.is_some() {
            return self.run_write(operation, f);
        }

        self.run_write(operation, |session| {
            session.begin(IsolationLevel::ReadCommitted)?;
            match f(&mut *session) {
                Ok(value) => {
                    session.commit()?;
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rollback_err) = session.rollback() {
                        warn!(operation, error = %rollback_err, "隐式事务回滚失败");
                    }
                    Err(e)
                }
            }
        })
    }

    /// 写操作入口：事务内任何失败（含映射与校验）都回滚事务并置为 Idle
    pub(super) fn write_guarded<R>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut Self) -> DataResult<R>,
    ) -> DataResult<R> {
        let result = f(self);
        if result.is_err() && self.tx.is_some() {
            self.abort_transaction(operation);
        }
        result
    }

    /// 执行读操作
    ///
    /// 事务内读主库事务会话（读到自己的写入），失败不改变事务状态；
    /// 事务外按权重选择端点
    pub(super) fn run_read<R>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut dyn Session) -> EngineResult<R>,
    ) -> DataResult<R> {
        if let Some(tx) = self.tx.as_mut() {
            debug!(operation, table = T::table_name(), "事务内读操作");
            return f(tx.session.as_mut()).map_err(|e| DataError::query(operation, e));
        }

        let endpoint = self.router.select_for_read(false);
        debug!(operation, table = T::table_name(), endpoint = %endpoint, "读操作路由");
        let mut session = self
            .engine
            .open_session(endpoint)
            .map_err(|e| DataError::query(operation, e))?;
        f(session.as_mut()).map_err(|e| DataError::query(operation, e))
    }

    /// 在主库上执行查询类操作（存储过程等可能带副作用的调用）
    pub(super) fn run_primary_query<R>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut dyn Session) -> EngineResult<R>,
    ) -> DataResult<R> {
        if let Some(tx) = self.tx.as_mut() {
            return f(tx.session.as_mut()).map_err(|e| DataError::query(operation, e));
        }

        let endpoint = self.router.select_for_write();
        debug!(operation, endpoint = %endpoint, "主库查询");
        let mut session = self
            .engine
            .open_session(endpoint)
            .map_err(|e| DataError::query(operation, e))?;
        f(session.as_mut()).map_err(|e| DataError::query(operation, e))
    }

    /// 向指定端点打开引擎会话
    pub(super) fn engine_session(
        &self,
        endpoint: &ConnectionEndpoint,
    ) -> EngineResult<Box<dyn Session>> {
        self.engine.open_session(endpoint)
    }

    /// 写入失败后回滚活动事务（回滚失败仅记录日志）
    fn abort_transaction(&mut self, operation: &'static str) {
        if let Some(mut tx) = self.tx.take() {
            match tx.session.rollback() {
                Ok(()) => warn!(operation, table = T::table_name(), "写入失败，事务已回滚"),
                Err(e) => warn!(
                    operation,
                    table = T::table_name(),
                    error = %e,
                    "写入失败，事务回滚失败"
                ),
            }
        }
    }

    // ==========================================
    // 实体映射
    // ==========================================

    /// 实体 → 待写入数据行（自增主键为空时省略主键列）
    pub(super) fn insert_row(operation: &'static str, entity: &T) -> DataResult<Row> {
        let mut row = Self::entity_row(operation, entity)?;
        if T::key_generated() && row.get(T::key_column()).map_or(false, FieldValue::is_null) {
            row.remove(T::key_column());
        }
        Ok(row)
    }

    /// 实体 → 数据行（列名已校验）
    pub(super) fn entity_row(operation: &'static str, entity: &T) -> DataResult<Row> {
        let row = entity
            .to_row()
            .map_err(|e| DataError::persistence(operation, e))?;
        check_columns(&row)?;
        Ok(row)
    }

    /// 实体主键条件（主键为空时报错）
    pub(super) fn key_predicate(operation: &'static str, entity: &T) -> DataResult<Predicate> {
        let key = entity
            .key_value()
            .map_err(|e| DataError::persistence(operation, e))?;
        if key.is_null() {
            return Err(DataError::InvalidCondition(format!(
                "{}: 实体主键 {}.{} 为空",
                operation,
                T::table_name(),
                T::key_column()
            )));
        }
        Ok(Predicate::eq(T::key_column(), key))
    }

    /// 数据行 → 实体
    pub(super) fn map_rows(operation: &'static str, rows: &[Row]) -> DataResult<Vec<T>> {
        rows.iter()
            .map(|row| T::from_row(row).map_err(|e| DataError::query(operation, e)))
            .collect()
    }

    /// 表名与主键列校验
    pub(super) fn table() -> DataResult<&'static str> {
        ensure_identifier(T::key_column())?;
        ensure_identifier(T::table_name())
    }
}

/// 行内所有列名必须为合法标识符
pub(super) fn check_columns(row: &Row) -> DataResult<()> {
    for column in row.column_names() {
        ensure_identifier(column)?;
    }
    Ok(())
}

/// 谓词中所有字段名必须为合法标识符
pub(super) fn check_predicate(predicate: &Predicate) -> DataResult<()> {
    let mut result = Ok(());
    predicate.visit_leaves(&mut |field, _, _| {
        if result.is_ok() {
            result = ensure_identifier(field).map(|_| ());
        }
    });
    result
}

// 未提交的事务在仓储释放时回滚
impl<T: Entity> Drop for Repository<T> {
    fn drop(&mut self) {
        if let Some(mut tx) = self.tx.take() {
            match tx.session.rollback() {
                Ok(()) => debug!(table = T::table_name(), "仓储释放，未提交事务已回滚"),
                Err(e) => warn!(table = T::table_name(), error = %e, "仓储释放时回滚失败"),
            }
        }
    }
}
