// ==========================================
// 数据管理平台 - 实体映射接口
// ==========================================
// 职责: 实体 ⇄ 数据行 的窄接口
// 约束: 映射经由 serde_json 完成，不做反射式 ORM
// ==========================================

use crate::domain::value::{FieldValue, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// 可由 `Repository<T>` 管理的实体
///
/// 实现者只需声明表名与主键列，行映射默认通过 serde 完成。
///
/// # 示例
/// ```
/// use data_manager::domain::Entity;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Article {
///     id: Option<i64>,
///     title: String,
/// }
///
/// impl Entity for Article {
///     fn table_name() -> &'static str { "article" }
///     fn key_column() -> &'static str { "id" }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + 'static {
    /// 表名
    fn table_name() -> &'static str;

    /// 主键列名
    fn key_column() -> &'static str;

    /// 主键是否由数据库生成（自增）
    ///
    /// 为 true 时，插入时主键为 Null 的列会被省略
    fn key_generated() -> bool {
        true
    }

    /// 实体 → 数据行
    fn to_row(&self) -> Result<Row, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        Row::from_json(value).ok_or_else(|| {
            <serde_json::Error as serde::ser::Error>::custom("实体必须序列化为 JSON 对象")
        })
    }

    /// 数据行 → 实体
    fn from_row(row: &Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(row.to_json())
    }

    /// 当前主键值
    fn key_value(&self) -> Result<FieldValue, serde_json::Error> {
        Ok(self
            .to_row()?
            .get(Self::key_column())
            .cloned()
            .unwrap_or(FieldValue::Null))
    }
}
