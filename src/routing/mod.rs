// ==========================================
// 数据管理平台 - 读写分离路由
// ==========================================
// 职责: 主库写入 / 按权重分发读流量
// ==========================================

pub mod router;

pub use router::ConnectionRouter;
