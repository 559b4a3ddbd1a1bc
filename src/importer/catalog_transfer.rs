// ==========================================
// 到货核对系统 - 条码批量导入/导出
// ==========================================
// 行格式: barcode, product_code, last_update, primary_code
// 导入: 条码已存在 → 跳过（不覆盖）；编码不合法 → 拒绝（计数）
// 导出: 全部条码按条码升序写出，首行为列名
// ==========================================

use crate::domain::product::Product;
use crate::domain::types::ProductCode;
use crate::importer::document::RawRow;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::read_csv_rows;
use crate::repository::{with_transaction, ProductRepository, SharedConnection};
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

pub const BARCODE_COLUMNS: [&str; 4] = ["barcode", "product_code", "last_update", "primary_code"];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// 条码导入汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BarcodeImportSummary {
    pub inserted: usize,
    pub skipped_existing: usize,
    pub rejected: usize,
}

fn parse_date_cell(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

fn parse_flag_cell(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

fn is_column_header(row: &RawRow) -> bool {
    row.first()
        .map(|c| c.trim().eq_ignore_ascii_case(BARCODE_COLUMNS[0]))
        .unwrap_or(false)
}

pub struct CatalogTransfer {
    conn: SharedConnection,
    product_repo: ProductRepository,
}

impl CatalogTransfer {
    pub fn new(conn: SharedConnection) -> Self {
        Self {
            product_repo: ProductRepository::from_connection(conn.clone()),
            conn,
        }
    }

    /// 从 CSV 文件批量导入条码
    pub fn import_barcodes(&self, path: &Path, today: NaiveDate) -> ImportResult<BarcodeImportSummary> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if path.exists() && ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let rows = read_csv_rows(path)?;
        let summary = self.import_barcode_rows(&rows, today)?;
        info!(
            path = %path.display(),
            inserted = summary.inserted,
            skipped_existing = summary.skipped_existing,
            rejected = summary.rejected,
            "条码批量导入完成"
        );
        Ok(summary)
    }

    /// 批量导入已读取的行（单事务）
    pub fn import_barcode_rows(
        &self,
        rows: &[RawRow],
        today: NaiveDate,
    ) -> ImportResult<BarcodeImportSummary> {
        with_transaction(&self.conn, |tx| {
            let mut summary = BarcodeImportSummary::default();

            for (row_idx, row) in rows.iter().enumerate() {
                if row_idx == 0 && is_column_header(row) {
                    continue;
                }

                let barcode = row.first().map(|c| c.trim()).unwrap_or("");
                let raw_code = row.get(1).map(String::as_str).unwrap_or("");
                let product_code = match ProductCode::parse(raw_code) {
                    Ok(code) if !barcode.is_empty() => code,
                    _ => {
                        warn!(row = row_idx + 1, barcode, raw_code, "条码行无效，已拒绝");
                        summary.rejected += 1;
                        continue;
                    }
                };

                let raw_date = row.get(2).map(String::as_str).unwrap_or("");
                let last_update = parse_date_cell(raw_date).unwrap_or_else(|| {
                    warn!(row = row_idx + 1, raw_date, "日期无法解析，按导入日期处理");
                    today
                });

                let raw_flag = row.get(3).map(String::as_str).unwrap_or("");
                let is_primary = parse_flag_cell(raw_flag).unwrap_or_else(|| {
                    warn!(row = row_idx + 1, raw_flag, "主条码标记无法解析，按否处理");
                    false
                });

                let product = Product {
                    barcode: barcode.to_string(),
                    product_code,
                    last_update,
                    is_primary,
                };
                if ProductRepository::insert_if_absent_tx(tx, &product)? {
                    summary.inserted += 1;
                } else {
                    summary.skipped_existing += 1;
                }
            }

            Ok(summary)
        })
    }

    /// 导出全部条码
    ///
    /// # 返回
    /// - Ok(n): 写出的条码数
    pub fn export_barcodes(&self, path: &Path) -> ImportResult<usize> {
        let products = self.product_repo.list_all_by_barcode()?;

        let mut writer = WriterBuilder::new().from_path(path)?;
        writer.write_record(BARCODE_COLUMNS)?;
        for product in &products {
            let last_update = product.last_update.format("%Y-%m-%d").to_string();
            writer.write_record([
                product.barcode.as_str(),
                product.product_code.as_str(),
                last_update.as_str(),
                if product.is_primary { "true" } else { "false" },
            ])?;
        }
        writer.flush()?;

        info!(path = %path.display(), count = products.len(), "条码已导出");
        Ok(products.len())
    }
}
