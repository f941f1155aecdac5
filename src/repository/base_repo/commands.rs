use super::core::{check_columns, check_predicate, Repository};
use crate::domain::{Entity, LockMode, Row};
use crate::query::Predicate;
use crate::repository::error::{DataError, DataResult};

impl<T: Entity> Repository<T> {
    // ==========================================
    // 写入操作
    // ==========================================
    // 红线: 全部经由 write_guarded，事务内失败先回滚再返回错误

    /// 插入实体
    ///
    /// # 参数
    /// - `entity`: 待插入实体（自增主键为空时由数据库生成）
    /// - `lock`: 锁模式（Exclusive 时语句持有写锁）
    ///
    /// # 返回
    /// - `Ok(rows)`: 影响行数
    /// - `Err(Persistence)`: 约束违反等写入失败
    pub fn insert(&mut self, entity: &T, lock: LockMode) -> DataResult<usize> {
        self.write_guarded("insert", |repo| {
            let table = Self::table()?;
            let row = Self::insert_row("insert", entity)?;
            repo.run_write("insert", |session| session.insert(table, &[row], lock))
        })
    }

    /// 批量插入（全部成功或全部撤销）
    pub fn insert_batch(&mut self, entities: &[T], lock: LockMode) -> DataResult<usize> {
        if entities.is_empty() {
            return Ok(0);
        }
        self.write_guarded("insert_batch", |repo| {
            let table = Self::table()?;
            let rows = entities
                .iter()
                .map(|entity| Self::insert_row("insert_batch", entity))
                .collect::<DataResult<Vec<_>>>()?;
            repo.run_write("insert_batch", |session| session.insert(table, &rows, lock))
        })
    }

    /// 插入实体并返回回填了生成主键的实体
    pub fn insert_returning(&mut self, entity: &T, lock: LockMode) -> DataResult<T> {
        self.write_guarded("insert_returning", |repo| {
            let table = Self::table()?;
            let row = Self::insert_row("insert_returning", entity)?;
            let generated = row.get(T::key_column()).is_none();

            let key = repo.run_write("insert_returning", |session| {
                session.insert_returning_key(table, &row, lock)
            })?;

            let mut stored = Self::entity_row("insert_returning", entity)?;
            if generated {
                stored.set(T::key_column(), key);
            }
            T::from_row(&stored).map_err(|e| DataError::persistence("insert_returning", e))
        })
    }

    /// 按主键更新实体（主键列以外的全部列）
    pub fn update(&mut self, entity: &T, lock: LockMode) -> DataResult<usize> {
        self.write_guarded("update", |repo| {
            let table = Self::table()?;
            let (set, filter) = Self::update_parts("update", entity)?;
            repo.run_write("update", |session| session.update(table, &set, &filter, lock))
        })
    }

    /// 按主键批量更新（全部成功或全部撤销）
    pub fn update_batch(&mut self, entities: &[T], lock: LockMode) -> DataResult<usize> {
        if entities.is_empty() {
            return Ok(0);
        }
        self.write_guarded("update_batch", |repo| {
            let table = Self::table()?;
            let parts = entities
                .iter()
                .map(|entity| Self::update_parts("update_batch", entity))
                .collect::<DataResult<Vec<_>>>()?;

            repo.run_write_atomic("update_batch", |session| {
                let mut affected = 0;
                for (set, filter) in &parts {
                    affected += session.update(table, set, filter, lock)?;
                }
                Ok(affected)
            })
        })
    }

    /// 按条件更新指定列
    ///
    /// # 参数
    /// - `set`: 待更新的列与新值
    /// - `filter`: 过滤条件（`Predicate::all()` 表示全表）
    pub fn update_where(
        &mut self,
        set: &Row,
        filter: &Predicate,
        lock: LockMode,
    ) -> DataResult<usize> {
        self.write_guarded("update_where", |repo| {
            let table = Self::table()?;
            if set.is_empty() {
                return Err(DataError::InvalidCondition("更新列不能为空".to_string()));
            }
            check_columns(set)?;
            check_predicate(filter)?;
            repo.run_write("update_where", |session| session.update(table, set, filter, lock))
        })
    }

    /// 按主键删除实体
    pub fn delete(&mut self, entity: &T, lock: LockMode) -> DataResult<usize> {
        self.write_guarded("delete", |repo| {
            let table = Self::table()?;
            let filter = Self::key_predicate("delete", entity)?;
            repo.run_write("delete", |session| session.delete(table, &filter, lock))
        })
    }

    /// 按条件删除
    pub fn delete_where(&mut self, filter: &Predicate, lock: LockMode) -> DataResult<usize> {
        self.write_guarded("delete_where", |repo| {
            let table = Self::table()?;
            check_predicate(filter)?;
            repo.run_write("delete_where", |session| session.delete(table, filter, lock))
        })
    }

    /// 更新语句的 SET 列与主键条件
    fn update_parts(operation: &'static str, entity: &T) -> DataResult<(Row, Predicate)> {
        let filter = Self::key_predicate(operation, entity)?;
        let mut set = Self::entity_row(operation, entity)?;
        set.remove(T::key_column());
        if set.is_empty() {
            return Err(DataError::InvalidCondition(format!(
                "{}: 实体除主键外没有可更新的列",
                operation
            )));
        }
        Ok((set, filter))
    }
}
