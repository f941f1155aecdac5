// ==========================================
// 数据管理平台 - 数据库连接端点
// ==========================================
// 职责: 描述主库 / 从库连接及读流量权重
// 红线: 创建后不可变（进程生命周期内）
// ==========================================

use crate::domain::types::EndpointRole;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ConnectionEndpoint - 连接端点
// ==========================================
// weight = 0 表示不承接读流量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEndpoint {
    pub connection_string: String,
    pub role: EndpointRole,
    pub weight: u32,
}

impl ConnectionEndpoint {
    pub fn primary(connection_string: &str, weight: u32) -> Self {
        Self {
            connection_string: connection_string.to_string(),
            role: EndpointRole::Primary,
            weight,
        }
    }

    pub fn replica(connection_string: &str, weight: u32) -> Self {
        Self {
            connection_string: connection_string.to_string(),
            role: EndpointRole::Replica,
            weight,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.role == EndpointRole::Primary
    }

    /// 是否承接读流量
    pub fn accepts_reads(&self) -> bool {
        self.weight > 0
    }
}

// 日志中不输出完整连接串（可能包含口令）
impl fmt::Display for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(weight={})", self.role, self.weight)
    }
}
