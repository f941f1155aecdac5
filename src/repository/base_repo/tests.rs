use super::Repository;
use crate::domain::{
    AggregateFn, Condition, ConditionalType, ConnectionEndpoint, EndpointRole, Entity, FieldValue,
    IsolationLevel, LockMode, OrderClause, QueryDescriptor, Row, TransactionState,
};
use crate::engine::{EngineError, EngineResult, QueryEngine, Session, SqliteEngine};
use crate::perf::SqlTraceSettings;
use crate::query::Predicate;
use crate::repository::error::DataError;
use crate::routing::ConnectionRouter;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Article {
    id: Option<i64>,
    code: String,
    title: String,
    views: i64,
}

impl Entity for Article {
    fn table_name() -> &'static str {
        "article"
    }
    fn key_column() -> &'static str {
        "id"
    }
}

fn article(code: &str, views: i64) -> Article {
    Article {
        id: None,
        code: code.to_string(),
        title: format!("title {}", code),
        views,
    }
}

/// 记录每次打开会话的端点角色
struct RecordingEngine {
    inner: SqliteEngine,
    opened: Mutex<Vec<EndpointRole>>,
}

impl RecordingEngine {
    fn new() -> Self {
        Self {
            inner: SqliteEngine::default().with_trace(SqlTraceSettings::disabled()),
            opened: Mutex::new(Vec::new()),
        }
    }

    fn take_opened(&self) -> Vec<EndpointRole> {
        std::mem::take(&mut *self.opened.lock().unwrap())
    }
}

impl QueryEngine for RecordingEngine {
    fn open_session(&self, endpoint: &ConnectionEndpoint) -> EngineResult<Box<dyn Session>> {
        self.opened.lock().unwrap().push(endpoint.role);
        self.inner.open_session(endpoint)
    }
}

fn setup_test_db() -> (NamedTempFile, String) {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_str().unwrap().to_string();
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE article (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            views INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .unwrap();
    (file, path)
}

/// 主库 + 同一文件的只读从库（主库不承接事务外读流量）
fn setup_repo() -> (NamedTempFile, Arc<RecordingEngine>, Repository<Article>) {
    let (file, path) = setup_test_db();
    let router = ConnectionRouter::with_seed(
        vec![
            ConnectionEndpoint::primary(&path, 0),
            ConnectionEndpoint::replica(&path, 1),
        ],
        11,
    )
    .unwrap();
    let engine = Arc::new(RecordingEngine::new());
    let repo = Repository::new(Arc::new(router), engine.clone());
    (file, engine, repo)
}

// ==========================================
// 写入
// ==========================================

#[test]
fn test_insert_returning_populates_key() {
    let (_file, _engine, mut repo) = setup_repo();

    let first = repo.insert_returning(&article("A1", 3), LockMode::Shared).unwrap();
    let second = repo.insert_returning(&article("A2", 5), LockMode::Exclusive).unwrap();

    assert!(first.id.is_some());
    assert_eq!(second.id, first.id.map(|id| id + 1));

    let found = repo.find_one(&Predicate::eq("id", first.id)).unwrap();
    assert_eq!(found, Some(first));
}

#[test]
fn test_insert_batch_is_atomic() {
    let (_file, _engine, mut repo) = setup_repo();

    let err = repo
        .insert_batch(&[article("A1", 1), article("A1", 2)], LockMode::Shared)
        .unwrap_err();
    assert!(matches!(
        err,
        DataError::Persistence {
            source: EngineError::UniqueConstraintViolation(_),
            ..
        }
    ));
    assert_eq!(repo.count(&Predicate::all()).unwrap(), 0);

    assert_eq!(repo.insert_batch(&[], LockMode::Shared).unwrap(), 0);
}

#[test]
fn test_update_by_key() {
    let (_file, _engine, mut repo) = setup_repo();
    let mut stored = repo.insert_returning(&article("A1", 1), LockMode::Shared).unwrap();

    stored.title = "changed".to_string();
    assert_eq!(repo.update(&stored, LockMode::Shared).unwrap(), 1);

    let found = repo.find_one(&Predicate::eq("code", "A1")).unwrap().unwrap();
    assert_eq!(found.title, "changed");
}

#[test]
fn test_update_without_key_rejected() {
    let (_file, _engine, mut repo) = setup_repo();
    let err = repo.update(&article("A1", 1), LockMode::Shared).unwrap_err();
    assert!(matches!(err, DataError::InvalidCondition(_)));
}

#[test]
fn test_update_batch_rolls_back_on_failure() {
    let (_file, _engine, mut repo) = setup_repo();
    let mut a = repo.insert_returning(&article("A1", 1), LockMode::Shared).unwrap();
    let mut b = repo.insert_returning(&article("B1", 1), LockMode::Shared).unwrap();

    a.views = 100;
    b.code = "A1".to_string();
    let err = repo.update_batch(&[a, b], LockMode::Shared).unwrap_err();
    assert!(matches!(err, DataError::Persistence { .. }));

    let views = repo.aggregate("views", AggregateFn::Max).unwrap();
    assert_eq!(views, FieldValue::Integer(1));
}

#[test]
fn test_update_where_and_delete_where() {
    let (_file, _engine, mut repo) = setup_repo();
    repo.insert_batch(
        &[article("A1", 1), article("A2", 20), article("B1", 30)],
        LockMode::Shared,
    )
    .unwrap();

    let updated = repo
        .update_where(
            &Row::new().with("title", "popular"),
            &Predicate::ge("views", 20),
            LockMode::Exclusive,
        )
        .unwrap();
    assert_eq!(updated, 2);

    let deleted = repo
        .delete_where(&Predicate::like("code", "A"), LockMode::Shared)
        .unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(repo.count(&Predicate::all()).unwrap(), 1);
}

#[test]
fn test_update_where_rejects_bad_column() {
    let (_file, _engine, mut repo) = setup_repo();
    let err = repo
        .update_where(
            &Row::new().with("title = 'x' --", "y"),
            &Predicate::all(),
            LockMode::Shared,
        )
        .unwrap_err();
    assert!(matches!(err, DataError::InvalidFieldName { .. }));

    let err = repo
        .delete_where(&Predicate::eq("1=1 OR id", 1), LockMode::Shared)
        .unwrap_err();
    assert!(matches!(err, DataError::InvalidFieldName { .. }));
}

#[test]
fn test_delete_entity() {
    let (_file, _engine, mut repo) = setup_repo();
    let stored = repo.insert_returning(&article("A1", 1), LockMode::Shared).unwrap();

    assert_eq!(repo.delete(&stored, LockMode::Shared).unwrap(), 1);
    assert!(!repo.exists(&Predicate::eq("code", "A1")).unwrap());
}

// ==========================================
// 查询
// ==========================================

#[test]
fn test_find_many_take_exists_count() {
    let (_file, _engine, mut repo) = setup_repo();
    let items: Vec<Article> = (0..5).map(|i| article(&format!("C{}", i), i)).collect();
    repo.insert_batch(&items, LockMode::Shared).unwrap();

    let filter = Predicate::gt("views", 1);
    assert_eq!(repo.find_many(&filter).unwrap().len(), 3);
    assert_eq!(repo.take(&filter, 2).unwrap().len(), 2);
    assert!(repo.exists(&filter).unwrap());
    assert!(!repo.exists(&Predicate::gt("views", 100)).unwrap());
    assert_eq!(repo.count(&filter).unwrap(), 3);
}

#[test]
fn test_find_page_over_25_rows() {
    let (_file, _engine, mut repo) = setup_repo();
    let items: Vec<Article> = (0..25).map(|i| article(&format!("P{:02}", i), i)).collect();
    repo.insert_batch(&items, LockMode::Shared).unwrap();

    let first = repo
        .find_page(&QueryDescriptor::new(10, 0).with_order(OrderClause::asc("views")))
        .unwrap();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.total_count, 25);
    assert_eq!(first.total_pages(), 3);
    assert_eq!(first.items[0].views, 0);

    let last = repo
        .find_page(&QueryDescriptor::new(10, 2).with_order(OrderClause::asc("views")))
        .unwrap();
    assert_eq!(last.items.len(), 5);
    assert_eq!(last.total_count, 25);
    assert_eq!(last.items[0].views, 20);
}

#[test]
fn test_find_page_with_multi_field_condition() {
    let (_file, _engine, mut repo) = setup_repo();
    let mut special = article("X1", 7);
    special.title = "rust notes".to_string();
    repo.insert_batch(
        &[special, article("rust-01", 1), article("go-01", 2)],
        LockMode::Shared,
    )
    .unwrap();

    let descriptor = QueryDescriptor::new(10, 0)
        .with_condition(Condition::like("code,title", "rust"))
        .with_order(OrderClause::desc("views"));
    let page = repo.find_page(&descriptor).unwrap();

    assert_eq!(page.total_count, 2);
    let codes: Vec<&str> = page.items.iter().map(|a| a.code.as_str()).collect();
    assert_eq!(codes, vec!["X1", "rust-01"]);
}

#[test]
fn test_find_page_invalid_descriptor() {
    let (_file, engine, mut repo) = setup_repo();

    let err = repo.find_page(&QueryDescriptor::new(0, 0)).unwrap_err();
    assert!(matches!(err, DataError::InvalidCondition(_)));

    let err = repo
        .find_page(&QueryDescriptor::new(10, 0).with_order(OrderClause::asc("views; DROP")))
        .unwrap_err();
    assert!(matches!(err, DataError::InvalidFieldName { .. }));

    let err = repo
        .find_page(&QueryDescriptor::new(10, 0).with_condition(Condition::new(
            "views",
            ConditionalType::In,
            5,
        )))
        .unwrap_err();
    assert!(matches!(err, DataError::InvalidCondition(_)));

    // 校验失败不触达引擎
    assert!(engine.take_opened().is_empty());
}

#[test]
fn test_aggregate() {
    let (_file, _engine, mut repo) = setup_repo();
    assert!(repo.aggregate("views", AggregateFn::Sum).unwrap().is_null());

    repo.insert_batch(&[article("A", 2), article("B", 4), article("C", 9)], LockMode::Shared)
        .unwrap();
    assert_eq!(
        repo.aggregate("views", AggregateFn::Sum).unwrap(),
        FieldValue::Integer(15)
    );
    assert_eq!(
        repo.aggregate("views", AggregateFn::Min).unwrap(),
        FieldValue::Integer(2)
    );
    assert_eq!(
        repo.aggregate_where("views", AggregateFn::Avg, &Predicate::lt("views", 9))
            .unwrap(),
        FieldValue::Real(3.0)
    );

    let err = repo.aggregate("views)", AggregateFn::Max).unwrap_err();
    assert!(matches!(err, DataError::InvalidFieldName { .. }));
}

#[test]
fn test_raw_sql_and_json() {
    let (_file, _engine, mut repo) = setup_repo();
    repo.insert_batch(&[article("A", 2), article("B", 4)], LockMode::Shared)
        .unwrap();

    let items = repo
        .query_sql(
            "SELECT * FROM article WHERE views > ? ORDER BY id",
            &[FieldValue::Integer(3)],
        )
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].code, "B");

    let rows = repo
        .query_rows("SELECT COUNT(*) AS total FROM article", &[])
        .unwrap();
    assert_eq!(rows[0].get("total"), Some(&FieldValue::Integer(2)));

    let json = repo.query_json(&Predicate::eq("code", "A")).unwrap();
    assert_eq!(json[0]["views"], serde_json::json!(2));
}

#[test]
fn test_procedure_surfaces_query_error() {
    let (_file, engine, mut repo) = setup_repo();
    let err = repo.query_procedure("sp_report", &[]).unwrap_err();
    assert!(matches!(
        err,
        DataError::Query {
            source: EngineError::Unsupported(_),
            ..
        }
    ));
    assert_eq!(engine.take_opened(), vec![EndpointRole::Primary]);
}

// ==========================================
// 路由
// ==========================================

#[test]
fn test_routing_reads_and_writes() {
    let (_file, engine, mut repo) = setup_repo();

    repo.insert(&article("A", 1), LockMode::Shared).unwrap();
    assert_eq!(engine.take_opened(), vec![EndpointRole::Primary]);

    repo.count(&Predicate::all()).unwrap();
    assert_eq!(engine.take_opened(), vec![EndpointRole::Replica]);

    // 事务内只打开一次主库会话，读写都复用
    repo.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
    repo.insert(&article("B", 2), LockMode::Shared).unwrap();
    assert_eq!(repo.count(&Predicate::all()).unwrap(), 2);
    repo.commit().unwrap();
    assert_eq!(engine.take_opened(), vec![EndpointRole::Primary]);
}

// ==========================================
// 事务
// ==========================================

#[test]
fn test_transaction_commit_and_rollback() {
    let (_file, _engine, mut repo) = setup_repo();

    repo.begin_transaction(IsolationLevel::Serializable).unwrap();
    assert_eq!(repo.transaction_state(), TransactionState::Active);
    assert_eq!(repo.isolation_level(), Some(IsolationLevel::Serializable));
    repo.insert(&article("A", 1), LockMode::Shared).unwrap();
    repo.rollback().unwrap();
    assert_eq!(repo.transaction_state(), TransactionState::Idle);
    assert_eq!(repo.count(&Predicate::all()).unwrap(), 0);

    repo.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
    repo.insert(&article("A", 1), LockMode::Shared).unwrap();
    repo.commit().unwrap();
    assert_eq!(repo.count(&Predicate::all()).unwrap(), 1);
}

#[test]
fn test_invalid_transaction_transitions() {
    let (_file, _engine, mut repo) = setup_repo();

    assert!(matches!(repo.rollback(), Err(DataError::Transaction { .. })));
    assert!(matches!(repo.commit(), Err(DataError::Transaction { .. })));

    repo.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
    assert!(matches!(
        repo.begin_transaction(IsolationLevel::ReadCommitted),
        Err(DataError::Transaction { .. })
    ));
    repo.commit().unwrap();
    assert!(matches!(repo.commit(), Err(DataError::Transaction { .. })));
}

#[test]
fn test_write_failure_in_transaction_rolls_back() {
    let (_file, _engine, mut repo) = setup_repo();

    repo.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
    repo.insert(&article("A", 1), LockMode::Shared).unwrap();
    let err = repo.insert(&article("A", 2), LockMode::Shared).unwrap_err();
    assert!(matches!(err, DataError::Persistence { .. }));

    assert_eq!(repo.transaction_state(), TransactionState::Idle);
    assert_eq!(repo.count(&Predicate::all()).unwrap(), 0);

    repo.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
    repo.rollback().unwrap();
}

#[test]
fn test_drop_rolls_back_active_transaction() {
    let (file, path) = setup_test_db();
    let router = Arc::new(ConnectionRouter::new(vec![ConnectionEndpoint::primary(&path, 1)]).unwrap());
    let engine: Arc<dyn QueryEngine> =
        Arc::new(SqliteEngine::default().with_trace(SqlTraceSettings::disabled()));

    {
        let mut repo: Repository<Article> = Repository::new(router.clone(), engine.clone());
        repo.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
        repo.insert(&article("A", 1), LockMode::Shared).unwrap();
    }

    let mut repo: Repository<Article> = Repository::new(router.clone(), engine.clone());
    assert_eq!(repo.count(&Predicate::all()).unwrap(), 0);

    repo.begin_transaction(IsolationLevel::ReadCommitted).unwrap();
    repo.insert(&article("B", 1), LockMode::Shared).unwrap();
    repo.dispose().unwrap();

    let mut repo: Repository<Article> = Repository::new(router, engine);
    assert_eq!(repo.count(&Predicate::all()).unwrap(), 0);
    drop(file);
}
