// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）和英文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["zh-CN", "en"];

/// 默认语言
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 规范化语言代码
///
/// "en-US"/"EN" → "en"，"zh"/"zh_cn" → "zh-CN"；无法识别时返回 None
pub fn normalize_locale(raw: &str) -> Option<&'static str> {
    let lowered = raw.trim().to_lowercase().replace('_', "-");
    if lowered == "en" || lowered.starts_with("en-") {
        Some("en")
    } else if lowered == "zh" || lowered.starts_with("zh-") {
        Some("zh-CN")
    } else {
        None
    }
}

/// 设置语言（无法识别的语言回退到默认语言）
pub fn set_locale(locale: &str) {
    let resolved = normalize_locale(locale).unwrap_or_else(|| {
        tracing::warn!(locale, "不支持的语言，使用默认语言");
        DEFAULT_LOCALE
    });
    rust_i18n::set_locale(resolved);
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use stock_checker::i18n::t;
/// let msg = t("common.invalid_command");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use stock_checker::i18n::t_with_args;
/// let msg = t_with_args("import.file_not_found", &[("path", "/tmp/order.csv")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
