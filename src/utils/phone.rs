use regex::Regex;
use std::sync::OnceLock;

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9(][0-9 ()\-]{5,18}[0-9]$").expect("valid phone regex"))
}

/// 判断自由文本是否像电话号码（用于下单时识别顾客）
pub fn looks_like_phone(text: &str) -> bool {
    let text = text.trim();
    phone_regex().is_match(text) && text.chars().filter(|c| c.is_ascii_digit()).count() >= 7
}

/// 去掉空格、括号和横线，保留开头的 `+`
pub fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}
