// ==========================================
// 到货核对系统 - 引擎层
// ==========================================
// 职责: 实现业务规则（身份解析、订单解析、数量规则、差异报表）
// 红线: Engine 不拼业务外 SQL、不做交互 I/O；需要人工决策时返回待决结果
// ==========================================

pub mod catalog;
pub mod error;
pub mod input;
pub mod order_resolver;
pub mod order_store;
pub mod reconciliation;
pub mod report;

// 重导出核心引擎
pub use catalog::ProductCatalog;
pub use error::{EngineError, EngineResult, Entity};
pub use input::{is_scan_finish, parse_confirmation, parse_quantity, QuantityEntry};
pub use order_resolver::{MatchedBy, OrderResolution, OrderResolver};
pub use order_store::OrderStore;
pub use reconciliation::{
    AdjustOutcome, ForceAddDecision, InputSource, ReconciliationEngine, RejectReason,
    ScanOutcome, ScanRequest,
};
pub use report::{OrderReport, OrderReportRow, ReportGenerator, ReportSummary};
