// ==========================================
// 数据管理平台 - 查询描述对象
// ==========================================
// 职责: 分页查询条件 (QueryDescriptor) / 排序 / 动态条件 / 分页结果
// JSON 结构与旧版 Web 层 DTO 一致:
//   {"pageSize":10,"pageIndex":0,
//    "orderBys":[{"sort":"name","order":"Asc"}],
//    "conditions":[{"fieldName":"a,b","conditionalType":"Equal","fieldValue":5}]}
// ==========================================

use crate::domain::types::{ConditionalType, OrderDirection};
use crate::domain::value::FieldValue;
use crate::repository::error::{DataError, DataResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// LIMIT / OFFSET 可表示的最大行数
const MAX_SQL_ROW_COUNT: u64 = i64::MAX as u64;

// ==========================================
// Condition - 动态查询条件
// ==========================================
/// 字段/运算符/值 三元组
///
/// `field_names` 多于一个时表示"这些字段之间 OR"，
/// 与同级其他条件之间 AND
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(
        rename = "fieldName",
        serialize_with = "serialize_field_names",
        deserialize_with = "deserialize_field_names"
    )]
    pub field_names: Vec<String>,
    #[serde(rename = "conditionalType")]
    pub operator: ConditionalType,
    #[serde(rename = "fieldValue", default = "null_value")]
    pub value: FieldValue,
}

impl Condition {
    /// 创建条件
    ///
    /// # 参数
    /// - `fields`: 字段名，逗号分隔表示多字段 OR（例如 "name,code"）
    pub fn new(fields: &str, operator: ConditionalType, value: impl Into<FieldValue>) -> Self {
        Self {
            field_names: split_field_names(fields),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(fields: &str, value: impl Into<FieldValue>) -> Self {
        Self::new(fields, ConditionalType::Equal, value)
    }

    pub fn like(fields: &str, pattern: &str) -> Self {
        Self::new(fields, ConditionalType::Like, pattern)
    }

    pub fn in_list(fields: &str, values: impl Into<FieldValue>) -> Self {
        Self::new(fields, ConditionalType::In, values)
    }

    /// 是否为多字段 OR 条件
    pub fn is_multi_field(&self) -> bool {
        self.field_names.len() > 1
    }
}

fn null_value() -> FieldValue {
    FieldValue::Null
}

/// 拆分逗号分隔的字段名（去除空白，保留空段以便校验报错）
fn split_field_names(fields: &str) -> Vec<String> {
    if fields.trim().is_empty() {
        return Vec::new();
    }
    fields.split(',').map(|s| s.trim().to_string()).collect()
}

fn serialize_field_names<S: Serializer>(names: &[String], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&names.join(","))
}

fn deserialize_field_names<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FieldNames {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match FieldNames::deserialize(d)? {
        FieldNames::Joined(s) => split_field_names(&s),
        FieldNames::List(list) => list.into_iter().map(|s| s.trim().to_string()).collect(),
    })
}

// ==========================================
// OrderClause - 排序子句
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderClause {
    #[serde(rename = "sort")]
    pub field_name: String,
    #[serde(rename = "order", default)]
    pub direction: OrderDirection,
}

impl OrderClause {
    pub fn asc(field: &str) -> Self {
        Self {
            field_name: field.to_string(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field_name: field.to_string(),
            direction: OrderDirection::Desc,
        }
    }
}

// ==========================================
// QueryDescriptor - 分页查询条件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    /// 行数
    pub page_size: i64,
    /// 页码（从 0 开始）
    pub page_index: i64,
    /// 排序
    #[serde(default)]
    pub order_bys: Option<Vec<OrderClause>>,
    /// 条件
    #[serde(default)]
    pub conditions: Option<Vec<Condition>>,
}

impl QueryDescriptor {
    pub fn new(page_size: i64, page_index: i64) -> Self {
        Self {
            page_size,
            page_index,
            order_bys: None,
            conditions: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.get_or_insert_with(Vec::new).push(condition);
        self
    }

    pub fn with_order(mut self, clause: OrderClause) -> Self {
        self.order_bys.get_or_insert_with(Vec::new).push(clause);
        self
    }

    /// 校验分页参数
    ///
    /// # 返回
    /// - Err(InvalidCondition): page_size <= 0 或 page_index < 0
    pub fn validate(&self) -> DataResult<()> {
        if self.page_size <= 0 {
            return Err(DataError::InvalidCondition(format!(
                "pageSize 必须大于 0，实际为 {}",
                self.page_size
            )));
        }
        if self.page_index < 0 {
            return Err(DataError::InvalidCondition(format!(
                "pageIndex 不能为负数，实际为 {}",
                self.page_index
            )));
        }
        Ok(())
    }

    /// 偏移量 = page_index * page_size（调用前需通过 validate）
    ///
    /// 上限为 i64::MAX：SQLite 的 LIMIT / OFFSET 只接受 64 位有符号整数
    pub fn offset(&self) -> u64 {
        (self.page_index.max(0) as u64)
            .saturating_mul(self.page_size.max(0) as u64)
            .min(MAX_SQL_ROW_COUNT)
    }

    pub fn limit(&self) -> u64 {
        (self.page_size.max(0) as u64).min(MAX_SQL_ROW_COUNT)
    }
}

// ==========================================
// Page - 分页结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page_index: i64,
    pub page_size: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, descriptor: &QueryDescriptor) -> Self {
        Self {
            items,
            total_count,
            page_index: descriptor.page_index,
            page_size: descriptor.page_size,
        }
    }

    /// 总页数（向上取整）
    pub fn total_pages(&self) -> u64 {
        if self.page_size <= 0 {
            return 0;
        }
        let size = self.page_size as u64;
        (self.total_count + size - 1) / size
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_index: self.page_index,
            page_size: self.page_size,
        }
    }
}
