// ==========================================
// 到货核对系统 - 应用层
// ==========================================
// 职责: 组装应用状态，提供文本交互前端
// ==========================================

pub mod cli;
pub mod state;

// 重导出
pub use cli::{Cli, Command};
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
