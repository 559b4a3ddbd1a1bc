// ==========================================
// 到货核对系统 - 主入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单到货盘点（扫码/手工录入 → 差异核对）
// ==========================================

use std::io;

use stock_checker::app::{get_default_db_path, AppState, Cli};
use stock_checker::i18n::{set_locale, DEFAULT_LOCALE};

/// 设置后日志以 JSON 行输出
const LOG_JSON_ENV: &str = "STOCK_CHECKER_LOG_JSON";

fn main() -> anyhow::Result<()> {
    // 初始化日志系统（输出到 stderr，不干扰交互）
    if std::env::var_os(LOG_JSON_ENV).is_some() {
        stock_checker::logging::init_json();
    } else {
        stock_checker::logging::init();
    }

    tracing::info!("==================================================");
    tracing::info!("{}", stock_checker::APP_NAME);
    tracing::info!("系统版本: {}", stock_checker::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let mut state = AppState::new(db_path)?;

    // 已初始化的库按配置切换界面语言
    set_locale(DEFAULT_LOCALE);
    if state.is_initialised()? {
        set_locale(&state.config.ui_locale()?);
        tracing::info!(config = %state.config.get_config_snapshot()?, "配置已加载");
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    Cli::new(&mut state, stdin.lock(), stdout.lock()).run()
}
