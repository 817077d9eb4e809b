use crate::error::{AppError, AppResult};

/// 解析金额文本为 paise：`80` -> 8000, `80.5` -> 8050, `₹ 1,200.25` -> 120025
pub fn parse_amount(text: &str) -> AppResult<i64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('₹')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();

    let invalid = || AppError::ValidationError(format!("Invalid amount: {text:?}"));

    if cleaned.is_empty() || cleaned.starts_with('-') {
        return Err(invalid());
    }

    let (whole, frac) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };
    if frac.len() > 2
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
        || (whole.is_empty() && frac.is_empty())
    {
        return Err(invalid());
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => frac.parse().map_err(|_| invalid())?,
    };

    whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(invalid)
}

/// 8050 -> "80.50"
pub fn format_amount(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs = paise.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
