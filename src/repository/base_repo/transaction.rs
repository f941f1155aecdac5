use super::core::{ActiveTransaction, Repository};
use crate::domain::{Entity, IsolationLevel};
use crate::repository::error::{DataError, DataResult};
use tracing::{debug, warn};

impl<T: Entity> Repository<T> {
    // ==========================================
    // 事务边界
    // ==========================================
    // 状态机: Idle --begin--> Active --commit/rollback--> Idle
    // 红线: 不支持嵌套事务

    /// 开启事务（在主库打开专用会话）
    ///
    /// # 返回
    /// - `Err(Transaction)`: 已有活动事务 / 引擎开启失败
    pub fn begin_transaction(&mut self, level: IsolationLevel) -> DataResult<()> {
        if self.tx.is_some() {
            return Err(DataError::transaction("已存在活动事务，不支持嵌套事务"));
        }

        let endpoint = self.router().select_for_write();
        let mut session = self
            .engine_session(endpoint)
            .map_err(|e| DataError::transaction_failed("打开事务会话失败", e))?;
        session
            .begin(level)
            .map_err(|e| DataError::transaction_failed("开启事务失败", e))?;

        debug!(table = T::table_name(), isolation = %level, "事务开始");
        self.tx = Some(ActiveTransaction { session, level });
        Ok(())
    }

    /// 提交事务
    ///
    /// 提交失败时尝试回滚；无论成功与否事务都回到 Idle
    pub fn commit(&mut self) -> DataResult<()> {
        let mut tx = self
            .tx
            .take()
            .ok_or_else(|| DataError::transaction("没有活动事务，无法提交"))?;

        if let Err(e) = tx.session.commit() {
            if let Err(rollback_err) = tx.session.rollback() {
                warn!(error = %rollback_err, "提交失败后回滚失败");
            }
            return Err(DataError::transaction_failed("提交事务失败", e));
        }

        debug!(table = T::table_name(), "事务提交");
        Ok(())
    }

    /// 回滚事务
    pub fn rollback(&mut self) -> DataResult<()> {
        let mut tx = self
            .tx
            .take()
            .ok_or_else(|| DataError::transaction("没有活动事务，无法回滚"))?;

        tx.session
            .rollback()
            .map_err(|e| DataError::transaction_failed("回滚事务失败", e))?;

        debug!(table = T::table_name(), "事务回滚");
        Ok(())
    }

    /// 释放仓储：回滚未提交事务并返回回滚结果
    ///
    /// 直接 drop 仓储同样会回滚，但回滚失败只记录日志
    pub fn dispose(mut self) -> DataResult<()> {
        match self.tx.take() {
            Some(mut tx) => tx
                .session
                .rollback()
                .map_err(|e| DataError::transaction_failed("释放时回滚事务失败", e)),
            None => Ok(()),
        }
    }
}
