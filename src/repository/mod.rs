// ==========================================
// 到货核对系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: 每个仓储同时提供
//   - 实例方法（自行加锁，单语句操作）
//   - `*_tx` 关联函数（接收 &Connection，供引擎在同一事务内组合读写）
// ==========================================

pub mod error;
pub mod order_line_repo;
pub mod order_repo;
pub mod product_repo;

use rusqlite::{Connection, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use order_line_repo::OrderLineRepository;
pub use order_repo::OrderRepository;
pub use product_repo::ProductRepository;

/// 共享存储句柄（进程内唯一连接）
pub type SharedConnection = Arc<Mutex<Connection>>;

/// 获取数据库连接
pub fn lock_connection(conn: &SharedConnection) -> RepositoryResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))
}

/// 在单个事务中执行一组读写
///
/// 闭包返回 Ok 时提交；返回 Err（或提交前 panic）时事务随 drop 回滚，
/// 不会有半截数量写入落库。
pub fn with_transaction<T, E, F>(conn: &SharedConnection, f: F) -> Result<T, E>
where
    E: From<RepositoryError>,
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
{
    let guard = lock_connection(conn)?;
    let tx = guard
        .unchecked_transaction()
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

    let value = f(&tx)?;

    tx.commit()
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
    Ok(value)
}
