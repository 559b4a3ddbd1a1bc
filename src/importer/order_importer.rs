// ==========================================
// 到货核对系统 - 订单单据导入
// ==========================================
// 流程:
// 1. 表头: 定位标记行 → 订单号 + 参考号
//    订单已存在 → 按决策 Ask(返回 OrderExists, 不写库) / Continue(追加到原订单) / Abort(Declined)
// 2. 明细: 合法编码行逐条写入
//    订单行已存在 → 按策略 Sum(应到累加) / Keep(保持原值)；不存在 → 新建 (实扫 = 0)
//    累加超出数量范围的行保持原值并计数，不中止导入
// 整个导入在一个事务内完成
// ==========================================

use crate::domain::order::{Order, OrderLine};
use crate::importer::document::{parse_header, parse_line_items, HeaderRecord, OrderDocument};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::DocumentExtractor;
use crate::repository::{with_transaction, OrderLineRepository, OrderRepository, SharedConnection};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// 订单已存在时的决策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingOrderDecision {
    /// 尚未询问；订单已存在时返回 OrderExists
    #[default]
    Ask,
    /// 明细追加到已有订单
    Continue,
    Abort,
}

/// 订单行已存在时的合并策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicateLinePolicy {
    /// 应到数量累加
    #[default]
    Sum,
    /// 保持原应到数量
    Keep,
}

impl DuplicateLinePolicy {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "SUM" => Some(DuplicateLinePolicy::Sum),
            "KEEP" => Some(DuplicateLinePolicy::Keep),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DuplicateLinePolicy::Sum => "SUM",
            DuplicateLinePolicy::Keep => "KEEP",
        }
    }
}

/// 导入选项
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    pub existing_order: ExistingOrderDecision,
    pub duplicate_lines: DuplicateLinePolicy,
}

/// 导入汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderImportSummary {
    pub batch_id: String,
    pub order_number: i64,
    pub internal_reference: String,
    pub order_created: bool,
    pub lines_created: usize,
    pub lines_merged: usize,
    pub lines_kept: usize,
    pub lines_out_of_range: usize,
    pub quantities_defaulted: usize,
    pub rows_skipped: usize,
}

/// 导入结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportOutcome {
    Imported(OrderImportSummary),
    /// 订单已存在，需人工决定是否继续；未写库
    OrderExists {
        order_number: i64,
        internal_reference: String,
    },
}

// ==========================================
// OrderImporter - 订单单据导入器
// ==========================================
pub struct OrderImporter {
    conn: SharedConnection,
}

impl OrderImporter {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 从文件导入
    ///
    /// # 错误
    /// - FileNotFound: 文件不存在（整次导入中止）
    /// - HeaderNotFound / InvalidHeader: 单据无有效表头（不写库）
    pub fn import_file(
        &self,
        path: &Path,
        extractor: &dyn DocumentExtractor,
        options: ImportOptions,
    ) -> ImportResult<ImportOutcome> {
        let document = extractor.extract(path)?;
        self.import_document(&document, options)
    }

    /// 导入已抽取的单据
    pub fn import_document(
        &self,
        document: &OrderDocument,
        options: ImportOptions,
    ) -> ImportResult<ImportOutcome> {
        let header = parse_header(&document.header_rows)?;
        let items = parse_line_items(&document.line_rows);
        let batch_id = Uuid::new_v4().to_string();

        let outcome = with_transaction(&self.conn, |tx| -> ImportResult<ImportOutcome> {
            let order_created = match Self::prepare_order_tx(tx, &header, options.existing_order)? {
                Some(created) => created,
                None => {
                    return Ok(ImportOutcome::OrderExists {
                        order_number: header.order_number,
                        internal_reference: header.internal_reference.clone(),
                    })
                }
            };

            let mut summary = OrderImportSummary {
                batch_id: batch_id.clone(),
                order_number: header.order_number,
                internal_reference: header.internal_reference.clone(),
                order_created,
                lines_created: 0,
                lines_merged: 0,
                lines_kept: 0,
                lines_out_of_range: 0,
                quantities_defaulted: 0,
                rows_skipped: items.skipped_rows,
            };

            for record in &items.records {
                if record.quantity_defaulted {
                    summary.quantities_defaulted += 1;
                }

                let existing =
                    OrderLineRepository::find_tx(tx, header.order_number, &record.product_code)?;
                let Some(existing) = existing else {
                    OrderLineRepository::insert_tx(
                        tx,
                        &OrderLine::expected(
                            header.order_number,
                            record.product_code.clone(),
                            record.quantity,
                        ),
                    )?;
                    summary.lines_created += 1;
                    continue;
                };

                match options.duplicate_lines {
                    DuplicateLinePolicy::Sum
                        if existing.expected_quantity.checked_add(record.quantity).is_none() =>
                    {
                        warn!(
                            order_number = header.order_number,
                            product_code = %record.product_code,
                            expected_quantity = existing.expected_quantity,
                            quantity = record.quantity,
                            "应到数量累加超出范围，保持原值"
                        );
                        summary.lines_out_of_range += 1;
                    }
                    DuplicateLinePolicy::Sum => {
                        OrderLineRepository::add_expected_tx(
                            tx,
                            header.order_number,
                            &record.product_code,
                            record.quantity,
                        )?;
                        summary.lines_merged += 1;
                    }
                    DuplicateLinePolicy::Keep => summary.lines_kept += 1,
                }
            }

            Ok(ImportOutcome::Imported(summary))
        })?;

        match &outcome {
            ImportOutcome::Imported(summary) => info!(
                batch_id = %summary.batch_id,
                order_number = summary.order_number,
                internal_reference = %summary.internal_reference,
                order_created = summary.order_created,
                lines_created = summary.lines_created,
                lines_merged = summary.lines_merged,
                lines_kept = summary.lines_kept,
                lines_out_of_range = summary.lines_out_of_range,
                rows_skipped = summary.rows_skipped,
                "订单单据导入完成"
            ),
            ImportOutcome::OrderExists { order_number, .. } => {
                warn!(order_number, "订单已存在，等待人工确认")
            }
        }
        Ok(outcome)
    }

    /// 订单准备
    ///
    /// # 返回
    /// - Ok(Some(true)): 新建订单
    /// - Ok(Some(false)): 订单已存在，继续追加
    /// - Ok(None): 订单已存在，尚未决策
    /// - Err(Declined): 订单已存在，人工放弃
    fn prepare_order_tx(
        conn: &Connection,
        header: &HeaderRecord,
        decision: ExistingOrderDecision,
    ) -> ImportResult<Option<bool>> {
        if !OrderRepository::exists_tx(conn, header.order_number)? {
            OrderRepository::insert_tx(
                conn,
                &Order {
                    order_number: header.order_number,
                    internal_reference: header.internal_reference.clone(),
                },
            )?;
            return Ok(Some(true));
        }

        match decision {
            ExistingOrderDecision::Ask => Ok(None),
            ExistingOrderDecision::Continue => Ok(Some(false)),
            ExistingOrderDecision::Abort => Err(ImportError::Declined),
        }
    }
}
