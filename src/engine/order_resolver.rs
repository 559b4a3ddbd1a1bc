// ==========================================
// 到货核对系统 - 订单解析器
// ==========================================
// 输入: 人工输入的订单号或到货参考号
// 顺序:
// 1. 取消口令 → Cancelled
// 2. 按参考号计数（比较规则由 ReferenceMatchMode 决定，所有调用方一致）
// 3. 多于 1 个 → AmbiguousReference（需改用订单号）
// 4. 0 个 → 按订单号回退查询；不存在 → NotFound
// 5. 恰好 1 个 → 该订单
// 无隐藏状态：同样的库内容和输入总是得到同样结果
// ==========================================

use crate::domain::types::ReferenceMatchMode;
use crate::engine::error::{EngineError, EngineResult, Entity};
use crate::engine::input::is_one_of;
use crate::repository::{lock_connection, OrderRepository, SharedConnection};
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

/// 订单解析的取消口令
pub const ORDER_CANCEL_TOKENS: [&str; 2] = ["exit", "back"];

/// 命中方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchedBy {
    Reference,
    OrderNumber,
}

/// 解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderResolution {
    Cancelled,
    Resolved {
        order_number: i64,
        matched_by: MatchedBy,
    },
}

impl OrderResolution {
    pub fn order_number(&self) -> Option<i64> {
        match self {
            OrderResolution::Cancelled => None,
            OrderResolution::Resolved { order_number, .. } => Some(*order_number),
        }
    }
}

// ==========================================
// OrderResolver - 订单解析器
// ==========================================
pub struct OrderResolver {
    conn: SharedConnection,
    match_mode: ReferenceMatchMode,
}

impl OrderResolver {
    pub fn new(conn: SharedConnection, match_mode: ReferenceMatchMode) -> Self {
        Self { conn, match_mode }
    }

    pub fn match_mode(&self) -> ReferenceMatchMode {
        self.match_mode
    }

    /// 解析订单输入
    pub fn resolve(&self, token: &str) -> EngineResult<OrderResolution> {
        let conn = lock_connection(&self.conn)?;
        Self::resolve_tx(&conn, token, self.match_mode)
    }

    /// 解析订单输入，取消时返回 Declined
    pub fn resolve_order_number(&self, token: &str) -> EngineResult<i64> {
        self.resolve(token)?
            .order_number()
            .ok_or(EngineError::Declined)
    }

    pub fn resolve_tx(
        conn: &Connection,
        token: &str,
        match_mode: ReferenceMatchMode,
    ) -> EngineResult<OrderResolution> {
        let token = token.trim();
        if is_one_of(token, &ORDER_CANCEL_TOKENS) {
            return Ok(OrderResolution::Cancelled);
        }

        let by_reference = OrderRepository::find_numbers_by_reference_tx(conn, token, match_mode)?;
        match by_reference.as_slice() {
            [order_number] => {
                debug!(token, order_number, "按参考号命中订单");
                Ok(OrderResolution::Resolved {
                    order_number: *order_number,
                    matched_by: MatchedBy::Reference,
                })
            }
            [] => {
                let order_number = token
                    .parse::<i64>()
                    .map_err(|_| EngineError::not_found(Entity::Order, token))?;

                if OrderRepository::exists_tx(conn, order_number)? {
                    debug!(token, order_number, "按订单号命中订单");
                    Ok(OrderResolution::Resolved {
                        order_number,
                        matched_by: MatchedBy::OrderNumber,
                    })
                } else {
                    Err(EngineError::not_found(Entity::Order, token))
                }
            }
            many => Err(EngineError::AmbiguousReference {
                reference: token.to_string(),
                count: many.len(),
            }),
        }
    }
}
