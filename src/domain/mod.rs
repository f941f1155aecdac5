// ==========================================
// 数据管理平台 - 领域模型层
// ==========================================
// 职责: 定义数据访问层的值对象、查询描述、实体映射接口
// 红线: 不含数据访问逻辑
// ==========================================

pub mod endpoint;
pub mod entity;
pub mod query;
pub mod types;
pub mod value;

// 重导出核心类型
pub use endpoint::ConnectionEndpoint;
pub use entity::Entity;
pub use query::{Condition, OrderClause, Page, QueryDescriptor};
pub use types::{
    AggregateFn, ConditionalType, EndpointRole, IsolationLevel, LockMode, OrderDirection,
    TransactionState,
};
pub use value::{FieldValue, Row};
