// ==========================================
// 到货核对系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单到货盘点 (扫码/手工录入 → 差异核对)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 应用层 - 交互前端
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ProductCode, ReferenceMatchMode, ReportMode};

// 领域实体
pub use domain::{Order, OrderLine, Product};

// 引擎
pub use engine::{
    EngineError, EngineResult, OrderResolver, ProductCatalog, ReconciliationEngine,
    ReportGenerator,
};

// 导入
pub use importer::{CatalogTransfer, ImportError, OrderImporter};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "到货核对系统";
