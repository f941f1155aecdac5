// ==========================================
// 数据管理平台 - 通用实体仓储
// ==========================================
// 职责: 任意 Entity 的增删改查、分页、聚合、事务边界
// 红线:
// - 写操作只走主库
// - 事务内所有读写共用同一主库会话
// - 事务内写入失败先回滚再返回错误
// ==========================================

mod commands;
mod core;
mod queries;
mod transaction;

#[cfg(test)]
mod tests;

pub use core::Repository;
