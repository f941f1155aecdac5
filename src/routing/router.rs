// ==========================================
// 数据管理平台 - 连接路由器
// ==========================================
// 职责: 根据操作类型选择连接端点
// 红线:
// - 写操作只走主库
// - 事务内的读操作走主库（读到自己的写入）
// - 事务外的读操作按权重随机分发，权重为 0 的端点不承接读流量
// 约束: 端点配置创建后不可变；可选的种子 RNG 置于 Mutex 之后
// ==========================================

use crate::domain::{ConnectionEndpoint, EndpointRole};
use crate::repository::error::{DataError, DataResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tracing::debug;

/// 连接路由器
#[derive(Debug)]
pub struct ConnectionRouter {
    endpoints: Vec<ConnectionEndpoint>,
    primary_idx: usize,
    seeded_rng: Option<Mutex<StdRng>>,
}

impl ConnectionRouter {
    /// 创建路由器
    ///
    /// # 返回
    /// - Err(Configuration): 端点列表为空 / 没有主库 / 多于一个主库
    pub fn new(endpoints: Vec<ConnectionEndpoint>) -> DataResult<Self> {
        let primary_idx = validate_endpoints(&endpoints)?;
        Ok(Self {
            endpoints,
            primary_idx,
            seeded_rng: None,
        })
    }

    /// 创建使用固定种子的路由器（读分发结果可复现）
    pub fn with_seed(endpoints: Vec<ConnectionEndpoint>, seed: u64) -> DataResult<Self> {
        let primary_idx = validate_endpoints(&endpoints)?;
        Ok(Self {
            endpoints,
            primary_idx,
            seeded_rng: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        })
    }

    /// 按旧版连接串列表创建
    ///
    /// 第一个为主库（权重 0），其后第 i 个为从库，权重 i * 2
    pub fn from_connection_list<S: AsRef<str>>(connections: &[S]) -> DataResult<Self> {
        let endpoints = connections
            .iter()
            .enumerate()
            .map(|(i, conn)| {
                if i == 0 {
                    ConnectionEndpoint::primary(conn.as_ref(), 0)
                } else {
                    ConnectionEndpoint::replica(conn.as_ref(), (i as u32) * 2)
                }
            })
            .collect();
        Self::new(endpoints)
    }

    pub fn primary(&self) -> &ConnectionEndpoint {
        &self.endpoints[self.primary_idx]
    }

    pub fn endpoints(&self) -> &[ConnectionEndpoint] {
        &self.endpoints
    }

    /// 承接读流量的端点（权重 > 0，配置顺序）
    pub fn read_candidates(&self) -> impl Iterator<Item = &ConnectionEndpoint> {
        self.endpoints.iter().filter(|e| e.accepts_reads())
    }

    /// 写操作端点（总是主库）
    pub fn select_for_write(&self) -> &ConnectionEndpoint {
        self.primary()
    }

    /// 读操作端点
    ///
    /// # 参数
    /// - `in_transaction`: 调用方是否处于活动事务中
    pub fn select_for_read(&self, in_transaction: bool) -> &ConnectionEndpoint {
        match &self.seeded_rng {
            Some(rng) => {
                // 锁中毒时 RNG 状态仍然可用
                let mut guard = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                self.select_for_read_with(in_transaction, &mut *guard)
            }
            None => self.select_for_read_with(in_transaction, &mut rand::thread_rng()),
        }
    }

    /// 使用调用方提供的随机源选择读端点
    pub fn select_for_read_with<R: Rng + ?Sized>(
        &self,
        in_transaction: bool,
        rng: &mut R,
    ) -> &ConnectionEndpoint {
        if in_transaction {
            return self.primary();
        }

        let total: u64 = self.read_candidates().map(|e| u64::from(e.weight)).sum();
        if total == 0 {
            return self.primary();
        }

        // 按配置顺序累加权重，返回第一个累计值超过抽样值的端点
        let draw = rng.gen_range(0..total);
        let mut cumulative = 0u64;
        for endpoint in self.read_candidates() {
            cumulative += u64::from(endpoint.weight);
            if draw < cumulative {
                debug!(endpoint = %endpoint, "读操作路由");
                return endpoint;
            }
        }

        self.primary()
    }
}

/// 校验端点列表，返回主库下标
fn validate_endpoints(endpoints: &[ConnectionEndpoint]) -> DataResult<usize> {
    if endpoints.is_empty() {
        return Err(DataError::Configuration("未配置任何数据库连接".to_string()));
    }

    let primaries: Vec<usize> = endpoints
        .iter()
        .enumerate()
        .filter(|(_, e)| e.role == EndpointRole::Primary)
        .map(|(i, _)| i)
        .collect();

    match primaries.as_slice() {
        [idx] => Ok(*idx),
        [] => Err(DataError::Configuration("未配置主库连接".to_string())),
        many => Err(DataError::Configuration(format!(
            "主库连接只能有一个，实际为 {} 个",
            many.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_endpoints() -> Vec<ConnectionEndpoint> {
        vec![
            ConnectionEndpoint::primary("main.db", 0),
            ConnectionEndpoint::replica("a.db", 2),
            ConnectionEndpoint::replica("b.db", 4),
        ]
    }

    #[test]
    fn test_write_always_primary() {
        let router = ConnectionRouter::new(three_endpoints()).unwrap();
        for _ in 0..20 {
            assert!(router.select_for_write().is_primary());
        }
    }

    #[test]
    fn test_read_in_transaction_uses_primary() {
        let router = ConnectionRouter::with_seed(three_endpoints(), 7).unwrap();
        for _ in 0..20 {
            assert_eq!(router.select_for_read(true).connection_string, "main.db");
        }
    }

    #[test]
    fn test_weighted_distribution() {
        let router = ConnectionRouter::with_seed(three_endpoints(), 42).unwrap();
        let (mut a, mut b, mut primary) = (0u32, 0u32, 0u32);
        for _ in 0..6000 {
            match router.select_for_read(false).connection_string.as_str() {
                "a.db" => a += 1,
                "b.db" => b += 1,
                _ => primary += 1,
            }
        }
        assert_eq!(primary, 0);
        let ratio = f64::from(b) / f64::from(a);
        assert!((1.7..=2.3).contains(&ratio), "ratio = {}", ratio);
    }

    #[test]
    fn test_all_zero_weights_fall_back_to_primary() {
        let router = ConnectionRouter::new(vec![
            ConnectionEndpoint::primary("main.db", 0),
            ConnectionEndpoint::replica("a.db", 0),
        ])
        .unwrap();
        assert!(router.select_for_read(false).is_primary());
        assert_eq!(router.read_candidates().count(), 0);
    }

    #[test]
    fn test_primary_with_weight_receives_reads() {
        let router = ConnectionRouter::with_seed(
            vec![ConnectionEndpoint::primary("main.db", 1)],
            1,
        )
        .unwrap();
        assert!(router.select_for_read(false).is_primary());
    }

    #[test]
    fn test_seeded_router_is_deterministic() {
        let first = ConnectionRouter::with_seed(three_endpoints(), 99).unwrap();
        let second = ConnectionRouter::with_seed(three_endpoints(), 99).unwrap();
        for _ in 0..50 {
            assert_eq!(
                first.select_for_read(false).connection_string,
                second.select_for_read(false).connection_string
            );
        }
    }

    #[test]
    fn test_invalid_configurations() {
        assert!(matches!(
            ConnectionRouter::new(vec![]),
            Err(DataError::Configuration(_))
        ));
        assert!(matches!(
            ConnectionRouter::new(vec![
                ConnectionEndpoint::primary("a.db", 0),
                ConnectionEndpoint::primary("b.db", 0),
            ]),
            Err(DataError::Configuration(_))
        ));
        assert!(matches!(
            ConnectionRouter::new(vec![ConnectionEndpoint::replica("a.db", 1)]),
            Err(DataError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_connection_list_weights() {
        let router = ConnectionRouter::from_connection_list(&["main.db", "r1.db", "r2.db"]).unwrap();
        let weights: Vec<u32> = router.endpoints().iter().map(|e| e.weight).collect();
        assert_eq!(weights, vec![0, 2, 4]);
        assert!(router.primary().is_primary());
        assert_eq!(router.primary().connection_string, "main.db");
    }
}
