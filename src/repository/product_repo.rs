// ==========================================
// 到货核对系统 - 产品条码仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 对应表: products
// ==========================================

use crate::domain::product::Product;
use crate::domain::types::ProductCode;
use crate::repository::error::RepositoryResult;
use crate::repository::{lock_connection, SharedConnection};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_COLUMNS: &str = "SELECT barcode, product_code, last_update, primary_code FROM products";

/// 行映射: products → Product
///
/// product_code 在写入时已校验；读出时再校验一次，历史脏数据按转换失败上报。
fn map_product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    let raw_code: String = row.get(1)?;
    let product_code = ProductCode::parse(&raw_code)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(Product {
        barcode: row.get(0)?,
        product_code,
        last_update: row.get(2)?,
        is_primary: row.get(3)?,
    })
}

// ==========================================
// ProductRepository - 条码仓储
// ==========================================
/// 条码仓储
/// 职责: 管理 products 表的 CRUD 操作
pub struct ProductRepository {
    conn: SharedConnection,
}

impl ProductRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 按条码查询
    pub fn find_by_barcode(&self, barcode: &str) -> RepositoryResult<Option<Product>> {
        let conn = lock_connection(&self.conn)?;
        Self::find_by_barcode_tx(&conn, barcode)
    }

    /// 查询全部条码，按产品编码、条码升序
    pub fn list_all(&self) -> RepositoryResult<Vec<Product>> {
        let conn = lock_connection(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY product_code ASC, barcode ASC",
            SELECT_COLUMNS
        ))?;
        let products = stmt
            .query_map([], map_product_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    /// 查询全部条码，按条码升序（导出用）
    pub fn list_all_by_barcode(&self) -> RepositoryResult<Vec<Product>> {
        let conn = lock_connection(&self.conn)?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY barcode ASC", SELECT_COLUMNS))?;
        let products = stmt
            .query_map([], map_product_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = lock_connection(&self.conn)?;
        let count = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count)
    }

    // ===== 事务内操作 =====

    pub fn find_by_barcode_tx(conn: &Connection, barcode: &str) -> RepositoryResult<Option<Product>> {
        let product = conn
            .query_row(
                &format!("{} WHERE barcode = ?1", SELECT_COLUMNS),
                params![barcode],
                map_product_row,
            )
            .optional()?;
        Ok(product)
    }

    pub fn exists_tx(conn: &Connection, barcode: &str) -> RepositoryResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM products WHERE barcode = ?1",
            params![barcode],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_tx(conn: &Connection, product: &Product) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO products (barcode, product_code, last_update, primary_code)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                product.barcode,
                product.product_code.as_str(),
                product.last_update,
                product.is_primary,
            ],
        )?;
        Ok(())
    }

    /// 条码不存在时插入，已存在时保持原记录不变
    ///
    /// # 返回
    /// - Ok(true): 已插入
    /// - Ok(false): 条码已存在，跳过
    pub fn insert_if_absent_tx(conn: &Connection, product: &Product) -> RepositoryResult<bool> {
        let affected = conn.execute(
            r#"
            INSERT OR IGNORE INTO products (barcode, product_code, last_update, primary_code)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                product.barcode,
                product.product_code.as_str(),
                product.last_update,
                product.is_primary,
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn delete_tx(conn: &Connection, barcode: &str) -> RepositoryResult<bool> {
        let affected = conn.execute("DELETE FROM products WHERE barcode = ?1", params![barcode])?;
        Ok(affected > 0)
    }
}
