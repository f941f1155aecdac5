// ==========================================
// 数据管理平台 - 查询转换层
// ==========================================
// 职责: 动态条件 / 排序描述 → 引擎可消费的谓词树与排序子句
// 红线: 所有字段名必须经过标识符校验后才能进入 SQL 文本
// ==========================================

pub mod condition;
pub mod identifier;
pub mod order;
pub mod predicate;
pub mod sql_builder;

pub use condition::ConditionTranslator;
pub use identifier::{ensure_identifier, is_valid_identifier};
pub use order::OrderTranslator;
pub use predicate::Predicate;
pub use sql_builder::SqlQueryBuilder;
