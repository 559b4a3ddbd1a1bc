// ==========================================
// 到货核对系统 - 应用状态
// ==========================================
// 职责: 管理进程内唯一的存储句柄，以及建立在其上的全部引擎
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::ConfigManager;
use crate::db::{init_schema, is_initialised, open_sqlite_connection};
use crate::engine::{
    OrderResolver, OrderStore, ProductCatalog, ReconciliationEngine, ReportGenerator,
};
use crate::importer::{CatalogTransfer, OrderImporter};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{lock_connection, SharedConnection};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "STOCK_CHECKER_DB_PATH";

/// 应用状态
///
/// 所有引擎共享同一个连接；订单解析器的匹配规则在创建时从配置读取
pub struct AppState {
    /// 数据库路径（内存库为 ":memory:"）
    pub db_path: String,
    conn: SharedConnection,

    pub config: ConfigManager,
    pub catalog: ProductCatalog,
    pub resolver: OrderResolver,
    pub orders: OrderStore,
    pub reconciliation: ReconciliationEngine,
    pub reports: ReportGenerator,
    pub importer: OrderImporter,
    pub transfer: CatalogTransfer,
}

impl AppState {
    /// 打开数据库并创建应用状态
    ///
    /// 不会自动建表；是否已初始化由 `is_initialised` 判断
    pub fn new(db_path: String) -> RepositoryResult<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建应用状态
    pub fn from_connection(db_path: String, conn: SharedConnection) -> RepositoryResult<Self> {
        let config = ConfigManager::from_connection(conn.clone());

        // 未建表时 config_kv 不存在，按默认规则处理
        let initialised = {
            let guard = lock_connection(&conn)?;
            is_initialised(&guard)?
        };
        let match_mode = if initialised {
            config.reference_match_mode()?
        } else {
            Default::default()
        };

        Ok(Self {
            db_path,
            catalog: ProductCatalog::new(conn.clone()),
            resolver: OrderResolver::new(conn.clone(), match_mode),
            orders: OrderStore::new(conn.clone()),
            reconciliation: ReconciliationEngine::new(conn.clone()),
            reports: ReportGenerator::new(conn.clone()),
            importer: OrderImporter::new(conn.clone()),
            transfer: CatalogTransfer::new(conn.clone()),
            config,
            conn,
        })
    }

    /// 共享存储句柄
    pub fn connection(&self) -> SharedConnection {
        self.conn.clone()
    }

    /// 数据库是否已建表
    pub fn is_initialised(&self) -> RepositoryResult<bool> {
        let conn = lock_connection(&self.conn)?;
        Ok(is_initialised(&conn)?)
    }

    /// 建表（幂等），并按配置重建订单解析器
    pub fn initialise(&mut self) -> RepositoryResult<()> {
        {
            let conn = lock_connection(&self.conn)?;
            init_schema(&conn)?;
        }
        self.reload_match_mode()?;
        tracing::info!(db_path = %self.db_path, "数据库已初始化");
        Ok(())
    }

    /// 重新读取参考号匹配规则
    pub fn reload_match_mode(&mut self) -> RepositoryResult<()> {
        let mode = self.config.reference_match_mode()?;
        self.resolver = OrderResolver::new(self.conn.clone(), mode);
        Ok(())
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 STOCK_CHECKER_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./stock_checker.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("stock-checker-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("stock-checker");

        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("stock_checker.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_keys;
    use crate::db::open_in_memory;
    use crate::domain::types::ReferenceMatchMode;

    #[test]
    fn test_initialise_reloads_match_mode() {
        let conn = Arc::new(Mutex::new(open_in_memory().unwrap()));
        let mut state = AppState::from_connection(":memory:".to_string(), conn).unwrap();
        assert!(!state.is_initialised().unwrap());

        state.initialise().unwrap();
        assert!(state.is_initialised().unwrap());
        assert_eq!(state.resolver.match_mode(), ReferenceMatchMode::CaseFold);

        state
            .config
            .set_config_value(config_keys::REFERENCE_MATCH_MODE, "EXACT")
            .unwrap();
        state.reload_match_mode().unwrap();
        assert_eq!(state.resolver.match_mode(), ReferenceMatchMode::Exact);
    }
}
