// ==========================================
// 数据管理平台 - 核心库
// ==========================================
// 系统定位: 通用数据访问层
// - 通用仓储 Repository<T>（增删改查 / 分页 / 聚合 / 事务）
// - 动态查询条件 → 谓词树
// - 主库写入、从库按权重读取
// 技术栈: Rust + rusqlite (SQLite 引擎适配)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 值对象与查询描述
pub mod domain;

// 查询转换层 - 条件 / 排序 / SQL 构建
pub mod query;

// 路由层 - 读写分离
pub mod routing;

// 引擎层 - 查询引擎边界与 SQLite 适配
pub mod engine;

// 数据仓储层 - 通用仓储
pub mod repository;

// 配置层 - 数据源配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// SQL 性能追踪
pub mod perf;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::DataSourceConfig;
pub use domain::{
    AggregateFn, Condition, ConditionalType, ConnectionEndpoint, EndpointRole, Entity, FieldValue,
    IsolationLevel, LockMode, OrderClause, OrderDirection, Page, QueryDescriptor, Row,
    TransactionState,
};
pub use engine::{EngineError, QueryEngine, Session, SqliteEngine};
pub use query::{ConditionTranslator, OrderTranslator, Predicate};
pub use repository::{DataError, DataResult, Repository};
pub use routing::ConnectionRouter;

// ==========================================
// 常量定义
// ==========================================

// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "数据管理平台";
