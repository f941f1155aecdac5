// ==========================================
// 数据管理平台 - 领域类型定义
// ==========================================
// 职责: 数据访问层公共枚举（端点角色/排序/条件运算符/事务/聚合）
// 序列化格式: 与旧版 Web DTO 保持一致（PascalCase 变体名）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 连接端点角色 (Endpoint Role)
// ==========================================
// 红线: 每个路由器有且仅有一个主库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointRole {
    Primary, // 主库（读写）
    Replica, // 从库（只读）
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::Primary => write!(f, "PRIMARY"),
            EndpointRole::Replica => write!(f, "REPLICA"),
        }
    }
}

// ==========================================
// 排序方向 (Order Sequence)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// 排序子句中的关键字（小写）
    pub fn keyword(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

// ==========================================
// 条件运算符 (Conditional Type)
// ==========================================
// Like 系列语义: Like=包含, LikeLeft=前缀匹配, LikeRight=后缀匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionalType {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    LikeLeft,
    LikeRight,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl ConditionalType {
    /// 是否为集合运算符（要求值为列表）
    pub fn is_collection(&self) -> bool {
        matches!(self, ConditionalType::In | ConditionalType::NotIn)
    }

    /// 是否为模糊匹配运算符（要求值为文本）
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            ConditionalType::Like
                | ConditionalType::LikeLeft
                | ConditionalType::LikeRight
                | ConditionalType::NotLike
        )
    }

    /// 是否为空值判断（忽略值）
    pub fn is_null_check(&self) -> bool {
        matches!(self, ConditionalType::IsNull | ConditionalType::IsNotNull)
    }

    /// 是否为大小比较（值不可为 Null）
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            ConditionalType::GreaterThan
                | ConditionalType::GreaterThanOrEqual
                | ConditionalType::LessThan
                | ConditionalType::LessThanOrEqual
        )
    }

    /// 运算符文本（用于谓词树展示与 SQL 渲染）
    pub fn symbol(&self) -> &'static str {
        match self {
            ConditionalType::Equal => "=",
            ConditionalType::NotEqual => "<>",
            ConditionalType::GreaterThan => ">",
            ConditionalType::GreaterThanOrEqual => ">=",
            ConditionalType::LessThan => "<",
            ConditionalType::LessThanOrEqual => "<=",
            ConditionalType::Like | ConditionalType::LikeLeft | ConditionalType::LikeRight => {
                "LIKE"
            }
            ConditionalType::NotLike => "NOT LIKE",
            ConditionalType::In => "IN",
            ConditionalType::NotIn => "NOT IN",
            ConditionalType::IsNull => "IS NULL",
            ConditionalType::IsNotNull => "IS NOT NULL",
        }
    }
}

impl fmt::Display for ConditionalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ==========================================
// 事务隔离级别 (Isolation Level)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IsolationLevel {
    Unspecified,
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::Unspecified => write!(f, "UNSPECIFIED"),
            IsolationLevel::ReadUncommitted => write!(f, "READ_UNCOMMITTED"),
            IsolationLevel::ReadCommitted => write!(f, "READ_COMMITTED"),
            IsolationLevel::RepeatableRead => write!(f, "REPEATABLE_READ"),
            IsolationLevel::Serializable => write!(f, "SERIALIZABLE"),
        }
    }
}

// ==========================================
// 聚合函数 (Aggregate Function)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFn {
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateFn {
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFn::Sum => "SUM",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
            AggregateFn::Avg => "AVG",
        }
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

// ==========================================
// 写入锁模式 (isLock)
// ==========================================
// Exclusive: 语句执行期间阻塞其他写入者（如库存扣减）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    #[default]
    Shared,
    Exclusive,
}

impl LockMode {
    pub fn is_exclusive(&self) -> bool {
        matches!(self, LockMode::Exclusive)
    }
}

// ==========================================
// 仓储事务状态
// ==========================================
// 状态机: Idle → Active (begin) → Idle (commit | rollback)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Active,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Idle => write!(f, "IDLE"),
            TransactionState::Active => write!(f, "ACTIVE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditional_type_from_legacy_json() {
        let op: ConditionalType = serde_json::from_str("\"GreaterThanOrEqual\"").unwrap();
        assert_eq!(op, ConditionalType::GreaterThanOrEqual);
        assert_eq!(op.symbol(), ">=");
    }

    #[test]
    fn test_conditional_type_classification() {
        assert!(ConditionalType::In.is_collection());
        assert!(ConditionalType::NotIn.is_collection());
        assert!(!ConditionalType::Equal.is_collection());
        assert!(ConditionalType::LikeLeft.is_pattern());
        assert!(ConditionalType::IsNull.is_null_check());
        assert!(ConditionalType::LessThan.is_ordering());
    }

    #[test]
    fn test_order_direction_keyword() {
        assert_eq!(OrderDirection::Asc.to_string(), "asc");
        assert_eq!(OrderDirection::Desc.to_string(), "desc");
        assert_eq!(OrderDirection::default(), OrderDirection::Asc);
    }

    #[test]
    fn test_lock_mode_default_is_shared() {
        assert_eq!(LockMode::default(), LockMode::Shared);
        assert!(LockMode::Exclusive.is_exclusive());
    }
}
