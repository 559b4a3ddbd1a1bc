// ==========================================
// 到货核对系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ==========================================
// 产品编码 (Product Code)
// ==========================================
// 格式: 2 个 ASCII 字母 + 4 个 ASCII 数字，大小写不敏感，统一存大写
// 只能通过 parse 构造，拿到 ProductCode 即代表格式已校验

/// 产品编码格式错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("产品编码格式错误: {0}（应为 2 个字母 + 4 个数字）")]
pub struct ProductCodeError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductCode(String);

impl ProductCode {
    /// 校验格式（不做 trim，前后空白视为格式错误）
    pub fn is_valid(raw: &str) -> bool {
        let bytes = raw.as_bytes();
        bytes.len() == 6
            && bytes[..2].iter().all(|b| b.is_ascii_alphabetic())
            && bytes[2..].iter().all(|b| b.is_ascii_digit())
    }

    /// 校验并规范化为大写
    pub fn parse(raw: &str) -> Result<Self, ProductCodeError> {
        if Self::is_valid(raw) {
            Ok(Self(raw.to_ascii_uppercase()))
        } else {
            Err(ProductCodeError(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProductCode {
    type Err = ProductCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProductCode {
    type Error = ProductCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProductCode> for String {
    fn from(code: ProductCode) -> Self {
        code.0
    }
}

impl AsRef<str> for ProductCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ==========================================
// 参考号匹配模式 (Reference Match Mode)
// ==========================================
// 订单解析时参考号的比较规则，所有调用方统一使用同一规则
// 序列化格式: SCREAMING_SNAKE_CASE (与 config_kv 一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceMatchMode {
    #[default]
    CaseFold, // 大小写不敏感
    Exact,    // 精确匹配
}

impl ReferenceMatchMode {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "CASE_FOLD" => Some(ReferenceMatchMode::CaseFold),
            "EXACT" => Some(ReferenceMatchMode::Exact),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReferenceMatchMode::CaseFold => "CASE_FOLD",
            ReferenceMatchMode::Exact => "EXACT",
        }
    }
}

impl fmt::Display for ReferenceMatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 报表模式 (Report Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportMode {
    #[default]
    Full,              // 全部订单行
    DiscrepanciesOnly, // 核对模式: 只显示差异 ≠ 0 的行
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_code_boundaries() {
        assert!(ProductCode::is_valid("AB1234"));
        assert!(ProductCode::is_valid("ab1234"));
        assert!(!ProductCode::is_valid("A12345"));
        assert!(!ProductCode::is_valid("ABC123"));
        assert!(!ProductCode::is_valid("AB12345"));
        assert!(!ProductCode::is_valid("AB123"));
        assert!(!ProductCode::is_valid(" AB1234"));
        assert!(!ProductCode::is_valid(""));
        // 非 ASCII 字母不接受
        assert!(!ProductCode::is_valid("ÄB1234"));
    }

    #[test]
    fn test_product_code_canonical_upper() {
        let code = ProductCode::parse("ab1234").unwrap();
        assert_eq!(code.as_str(), "AB1234");
        assert_eq!(code, ProductCode::parse("AB1234").unwrap());
    }

    #[test]
    fn test_product_code_serde() {
        let code: ProductCode = serde_json::from_str("\"cd0001\"").unwrap();
        assert_eq!(code.as_str(), "CD0001");
        assert!(serde_json::from_str::<ProductCode>("\"bad\"").is_err());
    }

    #[test]
    fn test_reference_match_mode_parse() {
        assert_eq!(
            ReferenceMatchMode::from_str("case_fold"),
            Some(ReferenceMatchMode::CaseFold)
        );
        assert_eq!(ReferenceMatchMode::from_str("EXACT"), Some(ReferenceMatchMode::Exact));
        assert_eq!(ReferenceMatchMode::from_str("other"), None);
    }
}
