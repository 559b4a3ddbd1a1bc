// ==========================================
// 到货核对系统 - 引擎层错误类型
// ==========================================
// 职责: 业务错误分类；全部为可恢复错误，由前端决定提示/重试
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::ProductCodeError;
use crate::repository::error::RepositoryError;
use std::fmt;
use thiserror::Error;

/// 错误涉及的实体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Barcode,
    Order,
    OrderLine,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Barcode => write!(f, "条码"),
            Entity::Order => write!(f, "订单"),
            Entity::OrderLine => write!(f, "订单行"),
        }
    }
}

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 输入校验 =====
    #[error("产品编码格式错误: {0}（应为 2 个字母 + 4 个数字）")]
    InvalidFormat(String),

    #[error("无法识别的输入: {0}（既不是已登记条码，也不是合法产品编码）")]
    InvalidInput(String),

    #[error("数量不是整数: {0}")]
    MalformedQuantity(String),

    // ===== 数据状态 =====
    #[error("{entity}已存在: {key}")]
    AlreadyExists { entity: Entity, key: String },

    #[error("{entity}不存在: {key}")]
    NotFound { entity: Entity, key: String },

    #[error("参考号 {reference} 对应 {count} 个订单，请改用客户订单号")]
    AmbiguousReference { reference: String, count: usize },

    // ===== 人工决策 =====
    #[error("操作已取消")]
    Declined,

    // ===== 存储 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub fn not_found(entity: Entity, key: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn already_exists(entity: Entity, key: impl ToString) -> Self {
        EngineError::AlreadyExists {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<ProductCodeError> for EngineError {
    fn from(err: ProductCodeError) -> Self {
        EngineError::InvalidFormat(err.0)
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
