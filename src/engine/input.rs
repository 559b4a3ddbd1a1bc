// ==========================================
// 到货核对系统 - 人工输入约定
// ==========================================
// 职责: 数量输入/确认输入/结束口令的解析规则（纯函数，不做 I/O）
// 红线: 数量输入失败一律中止本次操作，绝不静默当作 0
// ==========================================

use crate::engine::error::{EngineError, EngineResult};

/// 数量输入的取消口令
pub const QUANTITY_CANCEL_TOKENS: [&str; 2] = ["cancel", "back"];

/// 扫码循环的结束口令
pub const SCAN_FINISH_TOKENS: [&str; 2] = ["finish", "end"];

const CONFIRM_YES: [&str; 2] = ["y", "yes"];
const CONFIRM_NO: [&str; 3] = ["n", "no", "back"];

/// 数量输入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityEntry {
    Quantity(i64),
    Cancelled,
}

/// 解析数量输入
///
/// # 返回
/// - Ok(Quantity(n)): 合法整数（允许负数，用于纠错）
/// - Ok(Cancelled): 取消口令
/// - Err(MalformedQuantity): 非整数；调用方按取消处理，不重试
pub fn parse_quantity(text: &str) -> EngineResult<QuantityEntry> {
    let trimmed = text.trim();
    if is_one_of(trimmed, &QUANTITY_CANCEL_TOKENS) {
        return Ok(QuantityEntry::Cancelled);
    }

    trimmed
        .parse::<i64>()
        .map(QuantityEntry::Quantity)
        .map_err(|_| EngineError::MalformedQuantity(trimmed.to_string()))
}

/// 解析确认输入
///
/// # 返回
/// - Some(true): 确认
/// - Some(false): 拒绝
/// - None: 无法识别（由前端决定是否重新询问）
pub fn parse_confirmation(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if is_one_of(trimmed, &CONFIRM_YES) {
        Some(true)
    } else if is_one_of(trimmed, &CONFIRM_NO) {
        Some(false)
    } else {
        None
    }
}

/// 是否为扫码结束口令
pub fn is_scan_finish(text: &str) -> bool {
    is_one_of(text.trim(), &SCAN_FINISH_TOKENS)
}

pub(crate) fn is_one_of(value: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| t.eq_ignore_ascii_case(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity_signed() {
        assert_eq!(parse_quantity("5").unwrap(), QuantityEntry::Quantity(5));
        assert_eq!(parse_quantity(" -1 ").unwrap(), QuantityEntry::Quantity(-1));
        assert_eq!(parse_quantity("0").unwrap(), QuantityEntry::Quantity(0));
    }

    #[test]
    fn test_parse_quantity_cancel() {
        assert_eq!(parse_quantity("cancel").unwrap(), QuantityEntry::Cancelled);
        assert_eq!(parse_quantity("BACK").unwrap(), QuantityEntry::Cancelled);
    }

    #[test]
    fn test_parse_quantity_malformed_never_zero() {
        for raw in ["", "abc", "1.5", "5x"] {
            let err = parse_quantity(raw).unwrap_err();
            assert!(matches!(err, EngineError::MalformedQuantity(_)), "输入 {:?}", raw);
        }
    }

    #[test]
    fn test_parse_confirmation() {
        assert_eq!(parse_confirmation("y"), Some(true));
        assert_eq!(parse_confirmation("YES"), Some(true));
        assert_eq!(parse_confirmation("no"), Some(false));
        assert_eq!(parse_confirmation("back"), Some(false));
        assert_eq!(parse_confirmation("maybe"), None);
    }

    #[test]
    fn test_scan_finish() {
        assert!(is_scan_finish("finish"));
        assert!(is_scan_finish(" END "));
        assert!(!is_scan_finish("AB1234"));
    }
}
