// ==========================================
// 数据管理平台 - 数据源配置
// ==========================================
// 职责: 解析主库/从库连接串、读权重、语句超时
// 来源: 环境变量 / JSON / 旧版连接串列表
// 红线: 未配置主库直接报 Configuration 错误，不做默认回退
// ==========================================

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use crate::domain::ConnectionEndpoint;
use crate::engine::SqliteEngine;
use crate::repository::error::{DataError, DataResult};
use crate::routing::ConnectionRouter;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 配置键（环境变量名）
pub mod env_keys {
    /// 主库连接串
    pub const CONN_MAIN: &str = "DATA_MANAGER_CONN_MAIN";
    /// 从库连接串列表（逗号分隔）
    pub const CONN_FROM: &str = "DATA_MANAGER_CONN_FROM";
    /// 从库权重列表（逗号分隔，与 CONN_FROM 一一对应）
    pub const CONN_FROM_WEIGHT: &str = "DATA_MANAGER_CONN_FROM_WEIGHT";
    /// 语句超时（毫秒）
    pub const STATEMENT_TIMEOUT_MS: &str = "DATA_MANAGER_STATEMENT_TIMEOUT_MS";
}

fn default_statement_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_replica_weight() -> u32 {
    1
}

/// 旧版从库权重规则：第 i 个从库（从 1 开始）权重 i * 2
fn legacy_replica_weight(index: usize) -> u32 {
    (index as u32 + 1) * 2
}

// ==========================================
// ReplicaConfig - 从库配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaConfig {
    pub connection_string: String,
    #[serde(default = "default_replica_weight")]
    pub weight: u32,
}

// ==========================================
// DataSourceConfig - 数据源配置
// ==========================================
/// JSON 示例:
/// ```json
/// {"primary": "main.db", "primaryWeight": 0,
///  "replicas": [{"connectionString": "r1.db", "weight": 2}],
///  "statementTimeoutMs": 30000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceConfig {
    #[serde(default)]
    pub primary: Option<String>,
    /// 主库读权重（0 表示主库不承接事务外读流量）
    #[serde(default)]
    pub primary_weight: u32,
    #[serde(default)]
    pub replicas: Vec<ReplicaConfig>,
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            primary: None,
            primary_weight: 0,
            replicas: Vec::new(),
            statement_timeout_ms: default_statement_timeout_ms(),
        }
    }
}

impl DataSourceConfig {
    /// 从进程环境变量读取
    pub fn from_env() -> DataResult<Self> {
        Self::from_env_lookup(|key| std::env::var(key).ok())
    }

    /// 从自定义查找函数读取（便于测试）
    ///
    /// # 规则
    /// - CONN_FROM 为空或缺失时没有从库
    /// - CONN_FROM_WEIGHT 缺失时使用旧版规则 i * 2
    /// - 权重个数与从库个数不一致时报错
    pub fn from_env_lookup(lookup: impl Fn(&str) -> Option<String>) -> DataResult<Self> {
        let primary = lookup(env_keys::CONN_MAIN)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let replica_conns = split_list(lookup(env_keys::CONN_FROM).as_deref());
        let weights = match lookup(env_keys::CONN_FROM_WEIGHT) {
            Some(raw) => {
                let parsed = split_list(Some(raw.as_str()))
                    .iter()
                    .map(|w| {
                        w.parse::<u32>().map_err(|_| {
                            DataError::Configuration(format!(
                                "{} 包含无效权重: '{}'",
                                env_keys::CONN_FROM_WEIGHT,
                                w
                            ))
                        })
                    })
                    .collect::<DataResult<Vec<_>>>()?;
                if parsed.len() != replica_conns.len() {
                    return Err(DataError::Configuration(format!(
                        "从库权重个数 ({}) 与从库个数 ({}) 不一致",
                        parsed.len(),
                        replica_conns.len()
                    )));
                }
                parsed
            }
            None => (0..replica_conns.len()).map(legacy_replica_weight).collect(),
        };

        let statement_timeout_ms = match lookup(env_keys::STATEMENT_TIMEOUT_MS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                DataError::Configuration(format!(
                    "{} 不是有效的毫秒数: '{}'",
                    env_keys::STATEMENT_TIMEOUT_MS,
                    raw
                ))
            })?,
            None => default_statement_timeout_ms(),
        };

        Ok(Self {
            primary,
            primary_weight: 0,
            replicas: replica_conns
                .into_iter()
                .zip(weights)
                .map(|(connection_string, weight)| ReplicaConfig {
                    connection_string,
                    weight,
                })
                .collect(),
            statement_timeout_ms,
        })
    }

    /// 从 JSON 文本读取
    pub fn from_json_str(json: &str) -> DataResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DataError::Configuration(format!("数据源配置 JSON 解析失败: {}", e)))
    }

    /// 从旧版连接串列表构建（第一个为主库）
    pub fn from_connection_list<S: AsRef<str>>(connections: &[S]) -> Self {
        let mut iter = connections.iter().map(|s| s.as_ref().to_string());
        let primary = iter.next();
        Self {
            primary,
            replicas: iter
                .enumerate()
                .map(|(i, connection_string)| ReplicaConfig {
                    connection_string,
                    weight: legacy_replica_weight(i),
                })
                .collect(),
            ..Self::default()
        }
    }

    /// 语句超时
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    /// 端点列表（主库在前）
    pub fn endpoints(&self) -> DataResult<Vec<ConnectionEndpoint>> {
        let primary = self
            .primary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DataError::Configuration("未配置主库连接串".to_string()))?;

        let mut endpoints = vec![ConnectionEndpoint::primary(primary, self.primary_weight)];
        for replica in &self.replicas {
            let conn = replica.connection_string.trim();
            if conn.is_empty() {
                return Err(DataError::Configuration("从库连接串不能为空".to_string()));
            }
            endpoints.push(ConnectionEndpoint::replica(conn, replica.weight));
        }
        Ok(endpoints)
    }

    /// 构建路由器
    pub fn build_router(&self) -> DataResult<ConnectionRouter> {
        ConnectionRouter::new(self.endpoints()?)
    }

    /// 构建 SQLite 引擎（语句超时作为 busy_timeout）
    pub fn sqlite_engine(&self) -> SqliteEngine {
        SqliteEngine::new(self.statement_timeout())
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_env_with_explicit_weights() {
        let config = DataSourceConfig::from_env_lookup(lookup(&[
            (env_keys::CONN_MAIN, "main.db"),
            (env_keys::CONN_FROM, "r1.db, r2.db"),
            (env_keys::CONN_FROM_WEIGHT, "3,1"),
            (env_keys::STATEMENT_TIMEOUT_MS, "1500"),
        ]))
        .unwrap();

        assert_eq!(config.primary.as_deref(), Some("main.db"));
        assert_eq!(config.replicas.len(), 2);
        assert_eq!(config.replicas[0].weight, 3);
        assert_eq!(config.statement_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_from_env_legacy_weights_and_default_timeout() {
        let config = DataSourceConfig::from_env_lookup(lookup(&[
            (env_keys::CONN_MAIN, "main.db"),
            (env_keys::CONN_FROM, "r1.db,r2.db,r3.db"),
        ]))
        .unwrap();

        let weights: Vec<u32> = config.replicas.iter().map(|r| r.weight).collect();
        assert_eq!(weights, vec![2, 4, 6]);
        assert_eq!(config.statement_timeout_ms, 30_000);
    }

    #[test]
    fn test_from_env_weight_count_mismatch() {
        let result = DataSourceConfig::from_env_lookup(lookup(&[
            (env_keys::CONN_MAIN, "main.db"),
            (env_keys::CONN_FROM, "r1.db,r2.db"),
            (env_keys::CONN_FROM_WEIGHT, "1"),
        ]));
        assert!(matches!(result, Err(DataError::Configuration(_))));
    }

    #[test]
    fn test_from_env_invalid_timeout() {
        let result = DataSourceConfig::from_env_lookup(lookup(&[
            (env_keys::CONN_MAIN, "main.db"),
            (env_keys::STATEMENT_TIMEOUT_MS, "soon"),
        ]));
        assert!(matches!(result, Err(DataError::Configuration(_))));
    }

    #[test]
    fn test_missing_primary_rejected() {
        let config = DataSourceConfig::from_env_lookup(lookup(&[])).unwrap();
        assert!(matches!(
            config.build_router(),
            Err(DataError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_json() {
        let config = DataSourceConfig::from_json_str(
            r#"{"primary":"main.db","primaryWeight":1,
                "replicas":[{"connectionString":"r1.db","weight":2},{"connectionString":"r2.db"}]}"#,
        )
        .unwrap();

        assert_eq!(config.statement_timeout_ms, 30_000);
        assert_eq!(config.replicas[1].weight, 1);

        let router = config.build_router().unwrap();
        assert_eq!(router.endpoints().len(), 3);
        assert_eq!(router.read_candidates().count(), 3);
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(
            DataSourceConfig::from_json_str("{\"primary\": 3"),
            Err(DataError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_connection_list() {
        let config = DataSourceConfig::from_connection_list(&["main.db", "r1.db", "r2.db"]);
        let endpoints = config.endpoints().unwrap();
        assert!(endpoints[0].is_primary());
        assert_eq!(endpoints[0].weight, 0);
        assert_eq!(endpoints[1].weight, 2);
        assert_eq!(endpoints[2].weight, 4);
    }
}
