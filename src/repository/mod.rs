// ==========================================
// 数据管理平台 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有值使用参数化绑定,字段名经标识符校验,防止 SQL 注入
// ==========================================

pub mod base_repo;
pub mod error;

// 重导出核心仓储
pub use base_repo::Repository;
pub use error::{DataError, DataResult};
