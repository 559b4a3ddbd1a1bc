// ==========================================
// 到货核对系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据质量错误 =====
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") || msg.contains("PRIMARY KEY") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            rusqlite::Error::FromSqlConversionFailure(col, _, source) => {
                RepositoryError::FieldValueError {
                    field: format!("column#{}", col),
                    message: source.to_string(),
                }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_schema, open_in_memory};

    #[test]
    fn test_primary_key_violation_mapped() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute("INSERT INTO orders VALUES (1, 'SJ1')", []).unwrap();
        let err: RepositoryError = conn
            .execute("INSERT INTO orders VALUES (1, 'SJ2')", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_foreign_key_violation_mapped() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let err: RepositoryError = conn
            .execute("INSERT INTO scanned_products VALUES (99, 'AB1234', 1, 0)", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }
}
