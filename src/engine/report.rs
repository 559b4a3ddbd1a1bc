// ==========================================
// 到货核对系统 - 报表生成
// ==========================================
// 职责: 输出订单行状态 + 派生差异；目录/订单全表
// 约束: 差异每次现算（实扫 - 应到），从不落库
// ==========================================

use crate::domain::order::{Order, OrderLine};
use crate::domain::product::Product;
use crate::domain::types::{ProductCode, ReportMode};
use crate::engine::error::{EngineError, EngineResult, Entity};
use crate::repository::{
    with_transaction, OrderLineRepository, OrderRepository, ProductRepository, SharedConnection,
};
use serde::Serialize;

/// 报表行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReportRow {
    pub product_code: ProductCode,
    pub expected_quantity: i64,
    pub scanned_quantity: i64,
    pub discrepancy: i128,
}

impl From<&OrderLine> for OrderReportRow {
    fn from(line: &OrderLine) -> Self {
        Self {
            product_code: line.product_code.clone(),
            expected_quantity: line.expected_quantity,
            scanned_quantity: line.scanned_quantity,
            discrepancy: line.discrepancy(),
        }
    }
}

/// 报表汇总（始终基于订单全部订单行，与显示模式无关）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub line_count: usize,
    pub reconciled_lines: usize,
    /// 缺货数量合计（差异 < 0 的行，取绝对值）
    pub missing_units: i128,
    /// 多到数量合计（差异 > 0 的行）
    pub excess_units: i128,
}

impl ReportSummary {
    fn from_lines(lines: &[OrderLine]) -> Self {
        lines.iter().fold(Self::default(), |mut acc, line| {
            acc.line_count += 1;
            match line.discrepancy() {
                0 => acc.reconciled_lines += 1,
                d if d < 0 => acc.missing_units = acc.missing_units.saturating_add(-d),
                d => acc.excess_units = acc.excess_units.saturating_add(d),
            }
            acc
        })
    }

    pub fn is_fully_reconciled(&self) -> bool {
        self.line_count == self.reconciled_lines
    }
}

/// 订单报表
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReport {
    pub order: Order,
    pub mode: ReportMode,
    pub rows: Vec<OrderReportRow>,
    pub summary: ReportSummary,
}

// ==========================================
// ReportGenerator - 报表生成器
// ==========================================
pub struct ReportGenerator {
    conn: SharedConnection,
    product_repo: ProductRepository,
    order_repo: OrderRepository,
}

impl ReportGenerator {
    pub fn new(conn: SharedConnection) -> Self {
        Self {
            product_repo: ProductRepository::from_connection(conn.clone()),
            order_repo: OrderRepository::from_connection(conn.clone()),
            conn,
        }
    }

    /// 订单报表，按产品编码升序
    ///
    /// # 参数
    /// - mode: Full 全部行；DiscrepanciesOnly 只保留差异 ≠ 0 的行（核对模式）
    pub fn render_order(&self, order_number: i64, mode: ReportMode) -> EngineResult<OrderReport> {
        let (order, lines) = with_transaction(&self.conn, |tx| {
            let order = OrderRepository::find_by_number_tx(tx, order_number)?
                .ok_or_else(|| EngineError::not_found(Entity::Order, order_number))?;
            let lines = OrderLineRepository::list_by_order_tx(tx, order_number)?;
            Ok::<_, EngineError>((order, lines))
        })?;

        let summary = ReportSummary::from_lines(&lines);
        let rows = lines
            .iter()
            .filter(|line| match mode {
                ReportMode::Full => true,
                ReportMode::DiscrepanciesOnly => !line.is_reconciled(),
            })
            .map(OrderReportRow::from)
            .collect();

        Ok(OrderReport {
            order,
            mode,
            rows,
            summary,
        })
    }

    /// 条码目录全表（按产品编码、条码升序）
    pub fn render_catalog(&self) -> EngineResult<Vec<Product>> {
        Ok(self.product_repo.list_all()?)
    }

    /// 订单全表（按订单号升序）
    pub fn render_orders(&self) -> EngineResult<Vec<Order>> {
        Ok(self.order_repo.list_all()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_schema, open_in_memory};
    use std::sync::{Arc, Mutex};

    fn setup() -> ReportGenerator {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO orders VALUES (7, 'SJ7');
            INSERT INTO orders VALUES (3, 'SJ3');
            INSERT INTO scanned_products VALUES (7, 'ZZ0001', 10, 7);
            INSERT INTO scanned_products VALUES (7, 'AA0001', 5, 5);
            INSERT INTO scanned_products VALUES (7, 'MM0001', 0, 2);
            "#,
        )
        .unwrap();
        ReportGenerator::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_render_order_full_sorted_with_discrepancy() {
        let generator = setup();
        let report = generator.render_order(7, ReportMode::Full).unwrap();

        let codes: Vec<&str> = report.rows.iter().map(|r| r.product_code.as_str()).collect();
        assert_eq!(codes, vec!["AA0001", "MM0001", "ZZ0001"]);
        assert_eq!(report.rows[2].discrepancy, -3);
        assert_eq!(report.rows[1].discrepancy, 2);

        assert_eq!(
            report.summary,
            ReportSummary {
                line_count: 3,
                reconciled_lines: 1,
                missing_units: 3,
                excess_units: 2,
            }
        );
        assert!(!report.summary.is_fully_reconciled());
    }

    #[test]
    fn test_render_order_verification_mode() {
        let generator = setup();
        let report = generator.render_order(7, ReportMode::DiscrepanciesOnly).unwrap();
        let codes: Vec<&str> = report.rows.iter().map(|r| r.product_code.as_str()).collect();
        assert_eq!(codes, vec!["MM0001", "ZZ0001"]);
        assert_eq!(report.summary.line_count, 3);
    }

    #[test]
    fn test_render_order_empty_and_missing() {
        let generator = setup();
        let report = generator.render_order(3, ReportMode::Full).unwrap();
        assert!(report.rows.is_empty());
        assert!(report.summary.is_fully_reconciled());

        let err = generator.render_order(99, ReportMode::Full).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: Entity::Order, .. }));
    }

    #[test]
    fn test_render_order_with_extreme_quantities() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute("INSERT INTO orders VALUES (1, 'SJ1')", []).unwrap();
        conn.execute(
            "INSERT INTO scanned_products VALUES (1, 'AB1234', ?1, ?2)",
            rusqlite::params![i64::MIN, i64::MAX],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO scanned_products VALUES (1, 'CD5678', ?1, ?2)",
            rusqlite::params![i64::MAX, i64::MIN],
        )
        .unwrap();
        let generator = ReportGenerator::new(Arc::new(Mutex::new(conn)));

        let report = generator.render_order(1, ReportMode::Full).unwrap();
        let span = i128::from(i64::MAX) - i128::from(i64::MIN);
        assert_eq!(report.rows[0].discrepancy, span);
        assert_eq!(report.rows[1].discrepancy, -span);
        assert_eq!(report.summary.excess_units, span);
        assert_eq!(report.summary.missing_units, span);
    }

    #[test]
    fn test_render_orders_sorted() {
        let generator = setup();
        let numbers: Vec<i64> = generator
            .render_orders()
            .unwrap()
            .iter()
            .map(|o| o.order_number)
            .collect();
        assert_eq!(numbers, vec![3, 7]);
    }
}
