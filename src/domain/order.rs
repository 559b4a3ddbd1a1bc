// ==========================================
// 到货核对系统 - 订单与订单行实体
// ==========================================
// 对应表: orders / scanned_products
// 约束:
// - 订单号唯一；内部参考号不保证唯一
// - 订单行 (order_number, product_code) 唯一，随订单级联删除
// - 差异 = 实扫 - 应到，只派生不落库
// ==========================================

use crate::domain::types::ProductCode;
use serde::{Deserialize, Serialize};

/// 订单（一次到货批次）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_number: i64,
    pub internal_reference: String,
}

/// 订单行（某订单内某产品的应到/实扫数量）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_number: i64,
    pub product_code: ProductCode,
    pub expected_quantity: i64,
    pub scanned_quantity: i64,
}

impl OrderLine {
    /// 导入生成的订单行（实扫为 0）
    pub fn expected(order_number: i64, product_code: ProductCode, expected_quantity: i64) -> Self {
        Self {
            order_number,
            product_code,
            expected_quantity,
            scanned_quantity: 0,
        }
    }

    /// 强制追加的订单行（应到为 0）
    pub fn forced(order_number: i64, product_code: ProductCode, scanned_quantity: i64) -> Self {
        Self {
            order_number,
            product_code,
            expected_quantity: 0,
            scanned_quantity,
        }
    }

    /// 差异 = 实扫 - 应到；负数为缺货，正数为多到
    ///
    /// 两个 i64 之差可能超出 i64，按 i128 计算
    pub fn discrepancy(&self) -> i128 {
        i128::from(self.scanned_quantity) - i128::from(self.expected_quantity)
    }

    pub fn is_reconciled(&self) -> bool {
        self.discrepancy() == 0
    }
}
