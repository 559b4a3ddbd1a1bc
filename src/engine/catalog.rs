// ==========================================
// 到货核对系统 - 产品目录
// ==========================================
// 职责: 条码 → 产品编码的身份解析；条码登记/删除
// 约束:
// - 条码精确匹配，无模糊回退
// - 每次写入都校验产品编码格式并规范为大写
// - 条码已存在时不做原地更新
// ==========================================

use crate::domain::product::Product;
use crate::domain::types::ProductCode;
use crate::engine::error::{EngineError, EngineResult, Entity};
use crate::repository::{with_transaction, ProductRepository, SharedConnection};
use chrono::NaiveDate;
use tracing::{debug, info};

// ==========================================
// ProductCatalog - 产品目录
// ==========================================
pub struct ProductCatalog {
    conn: SharedConnection,
    product_repo: ProductRepository,
}

impl ProductCatalog {
    pub fn new(conn: SharedConnection) -> Self {
        Self {
            product_repo: ProductRepository::from_connection(conn.clone()),
            conn,
        }
    }

    /// 按条码查询产品编码（未登记返回 None）
    pub fn lookup_barcode(&self, barcode: &str) -> EngineResult<Option<ProductCode>> {
        let product = self.product_repo.find_by_barcode(barcode.trim())?;
        Ok(product.map(|p| p.product_code))
    }

    /// 解析条码
    ///
    /// # 返回
    /// - Ok(ProductCode): 已登记
    /// - Err(NotFound): 未登记
    pub fn resolve_barcode(&self, barcode: &str) -> EngineResult<ProductCode> {
        let trimmed = barcode.trim();
        self.lookup_barcode(trimmed)?
            .ok_or_else(|| EngineError::not_found(Entity::Barcode, trimmed))
    }

    /// 登记条码
    ///
    /// # 参数
    /// - barcode: 条码
    /// - product_code: 产品编码（大小写不敏感）
    /// - today: 登记日期
    ///
    /// # 返回
    /// - Ok(Product): 已登记（编码已规范为大写）
    /// - Err(InvalidFormat): 编码格式错误
    /// - Err(AlreadyExists): 条码已登记
    pub fn add_product(
        &self,
        barcode: &str,
        product_code: &str,
        today: NaiveDate,
    ) -> EngineResult<Product> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Err(EngineError::InvalidInput(barcode.to_string()));
        }
        let code = ProductCode::parse(product_code.trim())?;
        let product = Product::new(barcode, code, today);

        with_transaction(&self.conn, |tx| -> EngineResult<()> {
            if ProductRepository::exists_tx(tx, barcode)? {
                return Err(EngineError::already_exists(Entity::Barcode, barcode));
            }
            ProductRepository::insert_tx(tx, &product)?;
            Ok(())
        })?;

        info!(
            barcode = %product.barcode,
            product_code = %product.product_code,
            "条码已登记"
        );
        Ok(product)
    }

    /// 删除条码
    pub fn remove_product(&self, barcode: &str) -> EngineResult<()> {
        let barcode = barcode.trim();
        let removed = with_transaction(&self.conn, |tx| {
            ProductRepository::delete_tx(tx, barcode).map_err(EngineError::from)
        })?;

        if !removed {
            debug!(barcode, "删除条码失败: 未登记");
            return Err(EngineError::not_found(Entity::Barcode, barcode));
        }

        info!(barcode, "条码已删除");
        Ok(())
    }

    /// 全部条码，按产品编码升序
    pub fn list_products(&self) -> EngineResult<Vec<Product>> {
        Ok(self.product_repo.list_all()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_schema, open_in_memory};
    use std::sync::{Arc, Mutex};

    fn setup() -> ProductCatalog {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ProductCatalog::new(Arc::new(Mutex::new(conn)))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    #[test]
    fn test_add_product_canonicalizes_code() {
        let catalog = setup();
        let product = catalog.add_product("5012345678900", "ab1234", today()).unwrap();
        assert_eq!(product.product_code.as_str(), "AB1234");
        assert_eq!(product.last_update, today());

        let code = catalog.resolve_barcode("5012345678900").unwrap();
        assert_eq!(code.as_str(), "AB1234");
    }

    #[test]
    fn test_add_product_invalid_format() {
        let catalog = setup();
        let err = catalog.add_product("111", "A12345", today()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidFormat(_)));
        assert!(catalog.lookup_barcode("111").unwrap().is_none());
    }

    #[test]
    fn test_add_product_already_exists_no_update() {
        let catalog = setup();
        catalog.add_product("111", "AB1234", today()).unwrap();
        let err = catalog.add_product("111", "CD5678", today()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::AlreadyExists {
                entity: Entity::Barcode,
                ..
            }
        ));
        assert_eq!(catalog.resolve_barcode("111").unwrap().as_str(), "AB1234");
    }

    #[test]
    fn test_resolve_unknown_barcode() {
        let catalog = setup();
        let err = catalog.resolve_barcode("999").unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: Entity::Barcode, .. }));
    }

    #[test]
    fn test_remove_product() {
        let catalog = setup();
        catalog.add_product("111", "AB1234", today()).unwrap();
        catalog.remove_product("111").unwrap();
        assert!(catalog.lookup_barcode("111").unwrap().is_none());

        let err = catalog.remove_product("111").unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
