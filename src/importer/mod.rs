// ==========================================
// 到货核对系统 - 导入层
// ==========================================
// 职责: 外部单据 → 强类型记录 → 订单/订单行；条码批量导入导出
// 结构: 抽取器（文件 → 原始行）与规范化（原始行 → 记录）分离
// ==========================================

pub mod catalog_transfer;
pub mod document;
pub mod error;
pub mod file_parser;
pub mod order_importer;

pub use catalog_transfer::{BarcodeImportSummary, CatalogTransfer};
pub use document::{HeaderRecord, LineItemRecord, OrderDocument, HEADER_TAG};
pub use error::{ImportError, ImportResult};
pub use file_parser::{
    CsvDocumentExtractor, DocumentExtractor, ExcelDocumentExtractor, UniversalDocumentExtractor,
};
pub use order_importer::{
    DuplicateLinePolicy, ExistingOrderDecision, ImportOptions, ImportOutcome, OrderImportSummary,
    OrderImporter,
};
