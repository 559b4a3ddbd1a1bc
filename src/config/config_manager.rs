// ==========================================
// 到货核对系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value)
// 约定: 未配置或取值非法时回退默认值（非法值记录告警）
// ==========================================

use crate::domain::types::ReferenceMatchMode;
use crate::i18n::{normalize_locale, DEFAULT_LOCALE};
use crate::importer::DuplicateLinePolicy;
use crate::repository::error::RepositoryResult;
use crate::repository::{lock_connection, SharedConnection};
use rusqlite::{params, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: SharedConnection,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = lock_connection(&self.conn)?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = lock_connection(&self.conn)?;
        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 列出全部配置（按 key 排序）
    pub fn list_configs(&self) -> RepositoryResult<Vec<(String, String)>> {
        let conn = lock_connection(&self.conn)?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// 获取所有配置的快照（JSON 格式，用于日志与诊断）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let config_map: BTreeMap<String, String> = self.list_configs()?.into_iter().collect();
        Ok(json!(config_map).to_string())
    }

    // ===== 业务配置 =====

    /// 参考号匹配方式（默认 CASE_FOLD）
    pub fn reference_match_mode(&self) -> RepositoryResult<ReferenceMatchMode> {
        let raw = self.get_config_or_default(
            config_keys::REFERENCE_MATCH_MODE,
            ReferenceMatchMode::default().to_db_str(),
        )?;
        Ok(ReferenceMatchMode::from_str(&raw).unwrap_or_else(|| {
            warn!(value = %raw, "reference_match_mode 取值非法，使用默认值");
            ReferenceMatchMode::default()
        }))
    }

    /// 界面语言（默认 zh-CN）
    pub fn ui_locale(&self) -> RepositoryResult<String> {
        let raw = self.get_config_or_default(config_keys::UI_LOCALE, DEFAULT_LOCALE)?;
        Ok(match normalize_locale(&raw) {
            Some(locale) => locale.to_string(),
            None => {
                warn!(value = %raw, "ui_locale 取值非法，使用默认值");
                DEFAULT_LOCALE.to_string()
            }
        })
    }

    /// 重复订单行合并策略（默认 SUM）
    pub fn duplicate_line_policy(&self) -> RepositoryResult<DuplicateLinePolicy> {
        let raw = self.get_config_or_default(
            config_keys::DUPLICATE_LINE_POLICY,
            DuplicateLinePolicy::default().to_db_str(),
        )?;
        Ok(DuplicateLinePolicy::from_str(&raw).unwrap_or_else(|| {
            warn!(value = %raw, "duplicate_line_policy 取值非法，使用默认值");
            DuplicateLinePolicy::default()
        }))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const REFERENCE_MATCH_MODE: &str = "reference_match_mode";
    pub const UI_LOCALE: &str = "ui_locale";
    pub const DUPLICATE_LINE_POLICY: &str = "duplicate_line_policy";
}
