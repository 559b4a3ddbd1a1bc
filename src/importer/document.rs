// ==========================================
// 到货核对系统 - 订单单据行结构
// ==========================================
// 职责: 把抽取器给出的原始行（按列号取值）一次性校验为强类型记录，
//       业务逻辑只接触 HeaderRecord / LineItemRecord
// 单据布局:
// - 表头区: 首列为 "Customer Ord" 的行，列 1 = 客户订单号，列 3 = 到货参考号
// - 明细区: 列 0 = 行号，列 1 = 产品编码，列 4 = 供货数量；
//           编码不合法的行（小计/页脚等）直接跳过
// ==========================================

use crate::domain::types::ProductCode;
use crate::importer::error::{ImportError, ImportResult};
use serde::Serialize;
use tracing::warn;

/// 表头行标记
pub const HEADER_TAG: &str = "Customer Ord";

const HEADER_ORDER_NUMBER_COL: usize = 1;
const HEADER_REFERENCE_COL: usize = 3;

const LINE_NUMBER_COL: usize = 0;
const LINE_PRODUCT_CODE_COL: usize = 1;
const LINE_QUANTITY_COL: usize = 4;

/// 原始行（单元格文本，按列号访问）
pub type RawRow = Vec<String>;

/// 抽取器输出: 同一单据的表头区与明细区
#[derive(Debug, Clone, Default)]
pub struct OrderDocument {
    pub header_rows: Vec<RawRow>,
    pub line_rows: Vec<RawRow>,
}

/// 表头记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderRecord {
    pub order_number: i64,
    pub internal_reference: String,
}

/// 明细记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemRecord {
    pub line: String,
    pub product_code: ProductCode,
    pub quantity: i64,
    /// 数量单元格无法解析（已按 0 处理）
    pub quantity_defaulted: bool,
}

/// 明细解析结果
#[derive(Debug, Clone, Default)]
pub struct LineItems {
    pub records: Vec<LineItemRecord>,
    pub skipped_rows: usize,
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(|s| s.trim()).unwrap_or("")
}

/// 解析整数单元格
///
/// 电子表格导出的整数可能带 ".0"，只接受小数部分为 0 的值
pub fn parse_integer_cell(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// 表头解析: 找到第一条标记行并取订单号/参考号
///
/// # 错误
/// - HeaderNotFound: 没有标记行
/// - InvalidHeader: 标记行的订单号不是整数
pub fn parse_header(rows: &[RawRow]) -> ImportResult<HeaderRecord> {
    let (row_idx, row) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| cell(row, 0) == HEADER_TAG)
        .ok_or_else(|| ImportError::HeaderNotFound(HEADER_TAG.to_string()))?;

    let raw_number = cell(row, HEADER_ORDER_NUMBER_COL);
    let order_number = parse_integer_cell(raw_number).ok_or_else(|| ImportError::InvalidHeader {
        row: row_idx + 1,
        message: format!("订单号不是整数: {:?}", raw_number),
    })?;

    Ok(HeaderRecord {
        order_number,
        internal_reference: cell(row, HEADER_REFERENCE_COL).to_string(),
    })
}

/// 明细解析: 编码合法的行转为记录，其余跳过；数量无法解析时记 0
pub fn parse_line_items(rows: &[RawRow]) -> LineItems {
    let mut items = LineItems::default();

    for (row_idx, row) in rows.iter().enumerate() {
        let Ok(product_code) = ProductCode::parse(cell(row, LINE_PRODUCT_CODE_COL)) else {
            items.skipped_rows += 1;
            continue;
        };

        let raw_quantity = cell(row, LINE_QUANTITY_COL);
        let (quantity, quantity_defaulted) = match parse_integer_cell(raw_quantity) {
            Some(q) => (q, false),
            None => {
                warn!(
                    row = row_idx + 1,
                    product_code = %product_code,
                    raw_quantity,
                    "供货数量无法解析，按 0 处理"
                );
                (0, true)
            }
        };

        items.records.push(LineItemRecord {
            line: cell(row, LINE_NUMBER_COL).to_string(),
            product_code,
            quantity,
            quantity_defaulted,
        });
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> RawRow {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_header() {
        let rows = vec![
            row(&["Invoice", "x"]),
            row(&["Customer Ord", "40408133", "", " SJ532017 "]),
        ];
        let header = parse_header(&rows).unwrap();
        assert_eq!(header.order_number, 40408133);
        assert_eq!(header.internal_reference, "SJ532017");
    }

    #[test]
    fn test_parse_header_float_cell() {
        let rows = vec![row(&["Customer Ord", "40408133.0", "", "SJ1"])];
        assert_eq!(parse_header(&rows).unwrap().order_number, 40408133);
    }

    #[test]
    fn test_parse_header_missing_or_invalid() {
        let err = parse_header(&[row(&["Nothing"])]).unwrap_err();
        assert!(matches!(err, ImportError::HeaderNotFound(_)));

        let err = parse_header(&[row(&["Customer Ord", "ABC"])]).unwrap_err();
        assert!(matches!(err, ImportError::InvalidHeader { row: 1, .. }));
    }

    #[test]
    fn test_parse_line_items_skips_and_defaults() {
        let rows = vec![
            row(&["1", "ab1234", "desc", "x", "12"]),
            row(&["", "Subtotal", "", "", "12"]),
            row(&["2", "CD5678", "desc", "x", "n/a"]),
            row(&["3"]),
            row(&["4", "EF9012", "desc", "x", "3.0"]),
        ];
        let items = parse_line_items(&rows);

        assert_eq!(items.skipped_rows, 2);
        assert_eq!(items.records.len(), 3);
        assert_eq!(items.records[0].product_code.as_str(), "AB1234");
        assert_eq!(items.records[0].quantity, 12);
        assert_eq!(items.records[1].quantity, 0);
        assert!(items.records[1].quantity_defaulted);
        assert_eq!(items.records[2].quantity, 3);
    }

    #[test]
    fn test_parse_integer_cell() {
        assert_eq!(parse_integer_cell("-4"), Some(-4));
        assert_eq!(parse_integer_cell("7.0"), Some(7));
        assert_eq!(parse_integer_cell("7.5"), None);
        assert_eq!(parse_integer_cell("nan"), None);
        assert_eq!(parse_integer_cell(""), None);
    }
}
