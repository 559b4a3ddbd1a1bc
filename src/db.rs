// ==========================================
// 到货核对系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键必须开启，否则订单删除无法级联）
// - 统一 busy_timeout
// - 建表/库状态检查
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 核心业务表（三张表齐全才视为已初始化）
const CORE_TABLES: [&str; 3] = ["products", "orders", "scanned_products"];

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库（测试用），同样应用统一配置
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// 表结构:
/// - products: 条码 → 产品编码
/// - orders: 客户订单号 + 内部参考号（参考号不唯一）
/// - scanned_products: 订单行（应到/实扫数量），随订单级联删除
/// - config_kv: 系统配置
/// - schema_version: 版本记录
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS products (
            barcode TEXT NOT NULL,
            product_code TEXT NOT NULL,
            last_update TEXT NOT NULL,
            primary_code INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (barcode)
        );

        CREATE TABLE IF NOT EXISTS orders (
            order_number INTEGER NOT NULL,
            internal_reference TEXT NOT NULL,
            PRIMARY KEY (order_number)
        );

        CREATE INDEX IF NOT EXISTS idx_orders_reference
            ON orders (internal_reference);

        CREATE TABLE IF NOT EXISTS scanned_products (
            order_number INTEGER NOT NULL,
            product_code TEXT NOT NULL,
            expected_quantity INTEGER NOT NULL,
            scanned_quantity INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (order_number, product_code),
            FOREIGN KEY (order_number) REFERENCES orders(order_number)
                ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    tracing::info!(schema_version = CURRENT_SCHEMA_VERSION, "数据库 schema 初始化完成");
    Ok(())
}

/// 检查核心业务表是否齐全
pub fn is_initialised(conn: &Connection) -> rusqlite::Result<bool> {
    for table in CORE_TABLES {
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1 LIMIT 1",
                [table],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        if !exists {
            return Ok(false);
        }
    }
    Ok(true)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_database_not_initialised() {
        let conn = open_in_memory().unwrap();
        assert!(!is_initialised(&conn).unwrap());
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }

    #[test]
    fn test_init_schema_idempotent() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert!(is_initialised(&conn).unwrap());
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_in_memory().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
