// ==========================================
// 到货核对系统 - 产品条码实体
// ==========================================
// 对应表: products
// 约束: 每个条码至多一条记录；创建后不修改，只能删除
// ==========================================

use crate::domain::types::ProductCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 条码 → 产品编码映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub barcode: String,
    pub product_code: ProductCode,
    pub last_update: NaiveDate,
    pub is_primary: bool,
}

impl Product {
    /// 手工登记的条码（非主条码）
    pub fn new(barcode: impl Into<String>, product_code: ProductCode, today: NaiveDate) -> Self {
        Self {
            barcode: barcode.into(),
            product_code,
            last_update: today,
            is_primary: false,
        }
    }
}
