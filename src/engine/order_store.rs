// ==========================================
// 到货核对系统 - 订单存储服务
// ==========================================
// 职责: 订单与订单行的查询/删除（删除级联订单行）
// ==========================================

use crate::domain::order::{Order, OrderLine};
use crate::engine::error::{EngineError, EngineResult, Entity};
use crate::repository::{
    with_transaction, OrderLineRepository, OrderRepository, SharedConnection,
};
use tracing::info;

pub struct OrderStore {
    conn: SharedConnection,
    order_repo: OrderRepository,
    line_repo: OrderLineRepository,
}

impl OrderStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self {
            order_repo: OrderRepository::from_connection(conn.clone()),
            line_repo: OrderLineRepository::from_connection(conn.clone()),
            conn,
        }
    }

    pub fn get_order(&self, order_number: i64) -> EngineResult<Order> {
        self.order_repo
            .find_by_number(order_number)?
            .ok_or_else(|| EngineError::not_found(Entity::Order, order_number))
    }

    pub fn list_orders(&self) -> EngineResult<Vec<Order>> {
        Ok(self.order_repo.list_all()?)
    }

    pub fn list_lines(&self, order_number: i64) -> EngineResult<Vec<OrderLine>> {
        Ok(self.line_repo.list_by_order(order_number)?)
    }

    /// 删除订单（订单行级联删除，其他订单不受影响）
    ///
    /// # 返回
    /// - Ok(n): 删除的订单行数
    /// - Err(NotFound): 订单不存在
    pub fn remove_order(&self, order_number: i64) -> EngineResult<usize> {
        let removed_lines = with_transaction(&self.conn, |tx| -> EngineResult<usize> {
            let lines = OrderLineRepository::list_by_order_tx(tx, order_number)?;
            if !OrderRepository::delete_tx(tx, order_number)? {
                return Err(EngineError::not_found(Entity::Order, order_number));
            }
            Ok(lines.len())
        })?;

        info!(order_number, removed_lines, "订单已删除");
        Ok(removed_lines)
    }
}
