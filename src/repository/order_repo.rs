// ==========================================
// 到货核对系统 - 订单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 对应表: orders（删除时级联 scanned_products）
// ==========================================

use crate::domain::order::Order;
use crate::domain::types::ReferenceMatchMode;
use crate::repository::error::RepositoryResult;
use crate::repository::{lock_connection, SharedConnection};
use rusqlite::{params, Connection, OptionalExtension, Row};

fn map_order_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        order_number: row.get(0)?,
        internal_reference: row.get(1)?,
    })
}

/// 参考号比较条件
fn reference_predicate(mode: ReferenceMatchMode) -> &'static str {
    match mode {
        ReferenceMatchMode::CaseFold => "upper(internal_reference) = upper(?1)",
        ReferenceMatchMode::Exact => "internal_reference = ?1",
    }
}

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: SharedConnection,
}

impl OrderRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub fn find_by_number(&self, order_number: i64) -> RepositoryResult<Option<Order>> {
        let conn = lock_connection(&self.conn)?;
        Self::find_by_number_tx(&conn, order_number)
    }

    /// 查询全部订单，按订单号升序
    pub fn list_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = lock_connection(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT order_number, internal_reference FROM orders ORDER BY order_number ASC",
        )?;
        let orders = stmt
            .query_map([], map_order_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(orders)
    }

    // ===== 事务内操作 =====

    pub fn find_by_number_tx(conn: &Connection, order_number: i64) -> RepositoryResult<Option<Order>> {
        let order = conn
            .query_row(
                "SELECT order_number, internal_reference FROM orders WHERE order_number = ?1",
                params![order_number],
                map_order_row,
            )
            .optional()?;
        Ok(order)
    }

    pub fn exists_tx(conn: &Connection, order_number: i64) -> RepositoryResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE order_number = ?1",
            params![order_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 按参考号查询订单号（升序）
    pub fn find_numbers_by_reference_tx(
        conn: &Connection,
        reference: &str,
        mode: ReferenceMatchMode,
    ) -> RepositoryResult<Vec<i64>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT order_number FROM orders WHERE {} ORDER BY order_number ASC",
            reference_predicate(mode)
        ))?;
        let numbers = stmt
            .query_map(params![reference], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(numbers)
    }

    pub fn insert_tx(conn: &Connection, order: &Order) -> RepositoryResult<()> {
        conn.execute(
            "INSERT INTO orders (order_number, internal_reference) VALUES (?1, ?2)",
            params![order.order_number, order.internal_reference],
        )?;
        Ok(())
    }

    /// 删除订单（订单行随外键级联删除）
    pub fn delete_tx(conn: &Connection, order_number: i64) -> RepositoryResult<bool> {
        let affected = conn.execute(
            "DELETE FROM orders WHERE order_number = ?1",
            params![order_number],
        )?;
        Ok(affected > 0)
    }
}
