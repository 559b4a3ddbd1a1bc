// ==========================================
// 到货核对系统 - 订单行仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 对应表: scanned_products
// 约束: 数量增减使用单条 UPDATE ... SET x = x + ?；溢出检查由调用方在同一事务内完成
// ==========================================

use crate::domain::order::OrderLine;
use crate::domain::types::ProductCode;
use crate::repository::error::RepositoryResult;
use crate::repository::{lock_connection, SharedConnection};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn map_line_row(row: &Row<'_>) -> rusqlite::Result<OrderLine> {
    let raw_code: String = row.get(1)?;
    let product_code = ProductCode::parse(&raw_code)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(OrderLine {
        order_number: row.get(0)?,
        product_code,
        expected_quantity: row.get(2)?,
        scanned_quantity: row.get(3)?,
    })
}

// ==========================================
// OrderLineRepository - 订单行仓储
// ==========================================
pub struct OrderLineRepository {
    conn: SharedConnection,
}

impl OrderLineRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub fn find(&self, order_number: i64, product_code: &ProductCode) -> RepositoryResult<Option<OrderLine>> {
        let conn = lock_connection(&self.conn)?;
        Self::find_tx(&conn, order_number, product_code)
    }

    /// 查询订单全部订单行，按产品编码升序
    pub fn list_by_order(&self, order_number: i64) -> RepositoryResult<Vec<OrderLine>> {
        let conn = lock_connection(&self.conn)?;
        Self::list_by_order_tx(&conn, order_number)
    }

    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = lock_connection(&self.conn)?;
        let count = conn.query_row("SELECT COUNT(*) FROM scanned_products", [], |row| row.get(0))?;
        Ok(count)
    }

    // ===== 事务内操作 =====

    pub fn find_tx(
        conn: &Connection,
        order_number: i64,
        product_code: &ProductCode,
    ) -> RepositoryResult<Option<OrderLine>> {
        let line = conn
            .query_row(
                r#"
                SELECT order_number, product_code, expected_quantity, scanned_quantity
                FROM scanned_products
                WHERE order_number = ?1 AND product_code = ?2
                "#,
                params![order_number, product_code.as_str()],
                map_line_row,
            )
            .optional()?;
        Ok(line)
    }

    pub fn list_by_order_tx(conn: &Connection, order_number: i64) -> RepositoryResult<Vec<OrderLine>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT order_number, product_code, expected_quantity, scanned_quantity
            FROM scanned_products
            WHERE order_number = ?1
            ORDER BY product_code ASC
            "#,
        )?;
        let lines = stmt
            .query_map(params![order_number], map_line_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lines)
    }

    pub fn insert_tx(conn: &Connection, line: &OrderLine) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO scanned_products (order_number, product_code, expected_quantity, scanned_quantity)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                line.order_number,
                line.product_code.as_str(),
                line.expected_quantity,
                line.scanned_quantity,
            ],
        )?;
        Ok(())
    }

    /// 实扫数量增加 delta（可为负）
    ///
    /// # 返回
    /// - Ok(true): 已更新
    /// - Ok(false): 订单行不存在
    pub fn add_scanned_tx(
        conn: &Connection,
        order_number: i64,
        product_code: &ProductCode,
        delta: i64,
    ) -> RepositoryResult<bool> {
        let affected = conn.execute(
            r#"
            UPDATE scanned_products
            SET scanned_quantity = scanned_quantity + ?3
            WHERE order_number = ?1 AND product_code = ?2
            "#,
            params![order_number, product_code.as_str(), delta],
        )?;
        Ok(affected > 0)
    }

    /// 应到数量累加（导入合并）
    pub fn add_expected_tx(
        conn: &Connection,
        order_number: i64,
        product_code: &ProductCode,
        delta: i64,
    ) -> RepositoryResult<bool> {
        let affected = conn.execute(
            r#"
            UPDATE scanned_products
            SET expected_quantity = expected_quantity + ?3
            WHERE order_number = ?1 AND product_code = ?2
            "#,
            params![order_number, product_code.as_str(), delta],
        )?;
        Ok(affected > 0)
    }

    /// 应到数量改为指定值（人工调整）
    pub fn set_expected_tx(
        conn: &Connection,
        order_number: i64,
        product_code: &ProductCode,
        expected_quantity: i64,
    ) -> RepositoryResult<bool> {
        let affected = conn.execute(
            r#"
            UPDATE scanned_products
            SET expected_quantity = ?3
            WHERE order_number = ?1 AND product_code = ?2
            "#,
            params![order_number, product_code.as_str(), expected_quantity],
        )?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_schema, open_in_memory};
    use std::sync::{Arc, Mutex};

    fn code(raw: &str) -> ProductCode {
        ProductCode::parse(raw).unwrap()
    }

    fn setup() -> (SharedConnection, OrderLineRepository) {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute("INSERT INTO orders VALUES (1, 'SJ1')", []).unwrap();
        conn.execute("INSERT INTO orders VALUES (2, 'SJ2')", []).unwrap();
        let shared = Arc::new(Mutex::new(conn));
        (shared.clone(), OrderLineRepository::from_connection(shared))
    }

    #[test]
    fn test_add_scanned_signed_delta() {
        let (shared, repo) = setup();
        {
            let conn = shared.lock().unwrap();
            OrderLineRepository::insert_tx(&conn, &OrderLine::expected(1, code("AB1234"), 10)).unwrap();
            assert!(OrderLineRepository::add_scanned_tx(&conn, 1, &code("AB1234"), 3).unwrap());
            assert!(OrderLineRepository::add_scanned_tx(&conn, 1, &code("AB1234"), -1).unwrap());
            assert!(!OrderLineRepository::add_scanned_tx(&conn, 1, &code("CD0000"), 1).unwrap());
        }
        let line = repo.find(1, &code("AB1234")).unwrap().unwrap();
        assert_eq!(line.scanned_quantity, 2);
        assert_eq!(line.expected_quantity, 10);
    }

    #[test]
    fn test_cascade_delete_keeps_other_orders() {
        let (shared, repo) = setup();
        {
            let conn = shared.lock().unwrap();
            OrderLineRepository::insert_tx(&conn, &OrderLine::expected(1, code("AB1234"), 1)).unwrap();
            OrderLineRepository::insert_tx(&conn, &OrderLine::expected(2, code("AB1234"), 1)).unwrap();
            conn.execute("DELETE FROM orders WHERE order_number = 1", []).unwrap();
        }
        assert!(repo.list_by_order(1).unwrap().is_empty());
        assert_eq!(repo.list_by_order(2).unwrap().len(), 1);
        assert_eq!(repo.count_all().unwrap(), 1);
    }

    #[test]
    fn test_list_sorted_by_product_code() {
        let (shared, repo) = setup();
        {
            let conn = shared.lock().unwrap();
            OrderLineRepository::insert_tx(&conn, &OrderLine::expected(1, code("ZZ0001"), 1)).unwrap();
            OrderLineRepository::insert_tx(&conn, &OrderLine::expected(1, code("AA0001"), 1)).unwrap();
        }
        let codes: Vec<String> = repo
            .list_by_order(1)
            .unwrap()
            .into_iter()
            .map(|l| l.product_code.to_string())
            .collect();
        assert_eq!(codes, vec!["AA0001", "ZZ0001"]);
    }
}
