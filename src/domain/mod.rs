// ==========================================
// 到货核对系统 - 领域层
// ==========================================
// 职责: 实体与值类型定义，不含存储与交互逻辑
// ==========================================

pub mod order;
pub mod product;
pub mod types;

pub use order::{Order, OrderLine};
pub use product::Product;
pub use types::{ProductCode, ProductCodeError, ReferenceMatchMode, ReportMode};
