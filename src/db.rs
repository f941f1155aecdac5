// ==========================================
// 数据管理平台 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有连接的 PRAGMA 行为（外键约束每个连接单独开启）
// - 统一 busy_timeout（对应语句超时配置）
// - 从库连接以只读方式打开，防止误写
// ==========================================

use rusqlite::{Connection, OpenFlags};
use std::time::Duration;

/// 默认语句超时（毫秒），与旧版命令超时一致
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
///
/// # 参数
/// - `db_path`: 数据库文件路径
/// - `read_only`: 为 true 时以只读方式打开（文件必须已存在）
/// - `busy_timeout`: 锁等待超时
pub fn open_sqlite_connection(
    db_path: &str,
    read_only: bool,
    busy_timeout: Duration,
) -> rusqlite::Result<Connection> {
    let conn = if read_only {
        Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?
    } else {
        Connection::open(db_path)?
    };
    configure_sqlite_connection(&conn, busy_timeout)?;
    Ok(conn)
}
