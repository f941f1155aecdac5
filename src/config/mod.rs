// ==========================================
// 数据管理平台 - 配置层
// ==========================================
// 职责: 数据源配置解析，产出已校验的连接路由器
// ==========================================

pub mod data_source;

pub use data_source::{env_keys, DataSourceConfig, ReplicaConfig};
