use super::core::{check_predicate, Repository};
use crate::domain::{AggregateFn, Entity, FieldValue, Page, QueryDescriptor, Row};
use crate::engine::SelectQuery;
use crate::perf::PerfGuard;
use crate::query::{ensure_identifier, ConditionTranslator, OrderTranslator, Predicate};
use crate::repository::error::{DataError, DataResult};
use tracing::instrument;

impl<T: Entity> Repository<T> {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询第一个匹配的实体
    pub fn find_one(&mut self, filter: &Predicate) -> DataResult<Option<T>> {
        let mut items = self.take(filter, 1)?;
        Ok(items.pop())
    }

    /// 查询全部匹配的实体
    pub fn find_many(&mut self, filter: &Predicate) -> DataResult<Vec<T>> {
        let table = Self::table()?;
        check_predicate(filter)?;
        let rows = self.run_read("find_many", |session| {
            session.select(table, SelectQuery::filtered(filter))
        })?;
        Self::map_rows("find_many", &rows)
    }

    /// 查询前 n 个匹配的实体
    pub fn take(&mut self, filter: &Predicate, n: u64) -> DataResult<Vec<T>> {
        let table = Self::table()?;
        check_predicate(filter)?;
        let rows = self.run_read("take", |session| {
            session.select(table, SelectQuery::filtered(filter).limit(n))
        })?;
        Self::map_rows("take", &rows)
    }

    /// 分页查询
    ///
    /// # 返回
    /// - `Ok(Page)`: 当前页实体 + 满足条件的总行数
    /// - `Err(InvalidCondition)`: pageSize <= 0 / pageIndex < 0 / 条件值不合法
    /// - `Err(InvalidFieldName)`: 条件或排序字段名不合法
    pub fn find_page(&mut self, descriptor: &QueryDescriptor) -> DataResult<Page<T>> {
        let page = self.find_page_rows(descriptor)?;
        let items = Self::map_rows("find_page", &page.items)?;
        Ok(Page::new(items, page.total_count, descriptor))
    }

    /// 分页查询（返回原始数据行）
    #[instrument(
        skip(self, descriptor),
        fields(
            table = T::table_name(),
            page_index = descriptor.page_index,
            page_size = descriptor.page_size
        )
    )]
    pub fn find_page_rows(&mut self, descriptor: &QueryDescriptor) -> DataResult<Page<Row>> {
        let _perf = PerfGuard::new("find_page");

        descriptor.validate()?;
        let table = Self::table()?;

        let filter = match &descriptor.conditions {
            Some(conditions) if !conditions.is_empty() => {
                Some(ConditionTranslator::translate(conditions)?)
            }
            _ => None,
        };
        let order_by = match &descriptor.order_bys {
            Some(order_bys) => OrderTranslator::translate(order_bys)?,
            None => String::new(),
        };

        let query = SelectQuery {
            filter: filter.as_ref(),
            order_by: (!order_by.is_empty()).then_some(order_by.as_str()),
            limit: Some(descriptor.limit()),
            offset: Some(descriptor.offset()),
        };

        let (rows, total) =
            self.run_read("find_page", |session| session.select_page(table, query))?;
        Ok(Page::new(rows, total, descriptor))
    }

    /// 是否存在匹配行
    pub fn exists(&mut self, filter: &Predicate) -> DataResult<bool> {
        let table = Self::table()?;
        check_predicate(filter)?;
        let rows = self.run_read("exists", |session| {
            session.select(table, SelectQuery::filtered(filter).limit(1))
        })?;
        Ok(!rows.is_empty())
    }

    /// 匹配行数
    pub fn count(&mut self, filter: &Predicate) -> DataResult<u64> {
        let table = Self::table()?;
        check_predicate(filter)?;
        self.run_read("count", |session| session.count(table, Some(filter)))
    }

    /// 全表聚合（SUM / MIN / MAX / AVG）
    ///
    /// 空表时 SUM / MIN / MAX / AVG 均返回 Null
    pub fn aggregate(&mut self, field: &str, func: AggregateFn) -> DataResult<FieldValue> {
        self.aggregate_where(field, func, &Predicate::all())
    }

    /// 按条件聚合
    pub fn aggregate_where(
        &mut self,
        field: &str,
        func: AggregateFn,
        filter: &Predicate,
    ) -> DataResult<FieldValue> {
        let table = Self::table()?;
        let field = ensure_identifier(field)?;
        check_predicate(filter)?;
        let filter = (!filter.is_trivial()).then_some(filter);
        self.run_read("aggregate", |session| {
            session.aggregate(table, func, field, filter)
        })
    }

    // ==========================================
    // 原生 SQL / JSON / 存储过程
    // ==========================================

    /// 原生 SQL 查询并映射为实体（仅用于读取）
    pub fn query_sql(&mut self, sql: &str, params: &[FieldValue]) -> DataResult<Vec<T>> {
        let rows = self.query_rows(sql, params)?;
        Self::map_rows("query_sql", &rows)
    }

    /// 原生 SQL 查询，返回数据行（仅用于读取）
    pub fn query_rows(&mut self, sql: &str, params: &[FieldValue]) -> DataResult<Vec<Row>> {
        if sql.trim().is_empty() {
            return Err(DataError::InvalidCondition("SQL 语句不能为空".to_string()));
        }
        self.run_read("query_sql", |session| session.raw_query(sql, params))
    }

    /// 条件查询，结果序列化为 JSON 数组
    pub fn query_json(&mut self, filter: &Predicate) -> DataResult<serde_json::Value> {
        let table = Self::table()?;
        check_predicate(filter)?;
        let rows = self.run_read("query_json", |session| {
            session.select(table, SelectQuery::filtered(filter))
        })?;
        Ok(serde_json::Value::Array(
            rows.iter().map(Row::to_json).collect(),
        ))
    }

    /// 调用存储过程（在主库执行）
    pub fn query_procedure(
        &mut self,
        name: &str,
        params: &[FieldValue],
    ) -> DataResult<Vec<Row>> {
        let name = ensure_identifier(name)?;
        self.run_primary_query("query_procedure", |session| {
            session.call_procedure(name, params)
        })
    }
}
