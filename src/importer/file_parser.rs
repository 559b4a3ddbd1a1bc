// ==========================================
// 到货核对系统 - 单据抽取器实现
// ==========================================
// 职责: 把外部文件转为原始行（不解析业务含义）
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// - Excel: 第 1 张表 = 表头区，第 2 张表 = 明细区；只有一张表时两区共用
// - CSV: 全部行同时作为表头区与明细区（表头按标记行定位，明细按编码格式过滤）
// ==========================================

use crate::importer::document::{OrderDocument, RawRow};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader, Sheets};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// ==========================================
// DocumentExtractor Trait
// ==========================================
/// 单据抽取器: 给定文件，返回表头区与明细区的原始行
pub trait DocumentExtractor {
    fn extract(&self, path: &Path) -> ImportResult<OrderDocument>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 读取无表头 CSV 的全部行（跳过完全空白的行）
pub fn read_csv_rows(path: &Path) -> ImportResult<Vec<RawRow>> {
    ensure_exists(path)?;

    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // 允许行长度不一致
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: RawRow = record.iter().map(|v| v.trim().to_string()).collect();

        if row.iter().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}

// ==========================================
// CSV 抽取器
// ==========================================
pub struct CsvDocumentExtractor;

impl DocumentExtractor for CsvDocumentExtractor {
    fn extract(&self, path: &Path) -> ImportResult<OrderDocument> {
        ensure_exists(path)?;

        let ext = extension_of(path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let rows = read_csv_rows(path)?;
        Ok(OrderDocument {
            header_rows: rows.clone(),
            line_rows: rows,
        })
    }
}

// ==========================================
// Excel 抽取器
// ==========================================
pub struct ExcelDocumentExtractor;

impl ExcelDocumentExtractor {
    fn sheet_rows(
        workbook: &mut Sheets<BufReader<File>>,
        sheet_name: &str,
    ) -> ImportResult<Vec<RawRow>> {
        let range = workbook.worksheet_range(sheet_name)?;

        let rows = range
            .rows()
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| cell.to_string().trim().to_string())
                    .collect::<RawRow>()
            })
            .filter(|row| !row.iter().all(|v| v.is_empty()))
            .collect();
        Ok(rows)
    }
}

impl DocumentExtractor for ExcelDocumentExtractor {
    fn extract(&self, path: &Path) -> ImportResult<OrderDocument> {
        ensure_exists(path)?;

        let ext = extension_of(path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();
        let Some(header_sheet) = sheet_names.first() else {
            return Err(ImportError::ExcelParseError("Excel 文件无工作表".to_string()));
        };

        let header_rows = Self::sheet_rows(&mut workbook, header_sheet)?;
        let line_rows = match sheet_names.get(1) {
            Some(line_sheet) => Self::sheet_rows(&mut workbook, line_sheet)?,
            None => header_rows.clone(),
        };

        Ok(OrderDocument {
            header_rows,
            line_rows,
        })
    }
}

// ==========================================
// 通用抽取器（根据扩展名自动选择）
// ==========================================
pub struct UniversalDocumentExtractor;

impl DocumentExtractor for UniversalDocumentExtractor {
    fn extract(&self, path: &Path) -> ImportResult<OrderDocument> {
        // 先判断文件存在，保证“文件缺失”与“格式不支持”可区分
        ensure_exists(path)?;

        match extension_of(path).as_str() {
            "csv" => CsvDocumentExtractor.extract(path),
            "xlsx" | "xls" => ExcelDocumentExtractor.extract(path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_csv_extractor() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "Customer Ord,40408133,,SJ532017").unwrap();
        writeln!(temp_file, ",,,").unwrap();
        writeln!(temp_file, "1,AB1234,Widget,ea,12").unwrap();
        temp_file.flush().unwrap();

        let doc = CsvDocumentExtractor.extract(temp_file.path()).unwrap();
        assert_eq!(doc.header_rows.len(), 2);
        assert_eq!(doc.line_rows, doc.header_rows);
        assert_eq!(doc.line_rows[1][1], "AB1234");
    }

    #[test]
    fn test_missing_file_reported_distinctly() {
        let err = UniversalDocumentExtractor
            .extract(Path::new("/nonexistent/order.csv"))
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let temp_file = Builder::new().suffix(".pdf").tempfile().unwrap();
        let err = UniversalDocumentExtractor.extract(temp_file.path()).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(ext) if ext == "pdf"));
    }
}
