//! Value helpers shared by the normalizer and the merge policy.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// First run of digits in a string.
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// A number written with a single decimal comma, e.g. `38,4`.
static DECIMAL_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d+,\d+$").unwrap());

/// A date with a four-digit year at the start or the end.
static FOUR_DIGIT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{4}\D.*|.*\D\d{4})$").unwrap());

/// Day-first formats seen in field data, tried after ISO.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Parse a value as a number, accepting a decimal comma.
///
/// Words that `f64::from_str` would accept (`inf`, `NaN`) are not numbers here.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let candidate = normalize_decimal(trimmed);
    candidate.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn is_numeric(value: &str) -> bool {
    parse_number(value).is_some()
}

/// Rewrite `38,4` as `38.4`; anything else is returned unchanged.
pub fn normalize_decimal(value: &str) -> String {
    if DECIMAL_COMMA.is_match(value) {
        value.replace(',', ".")
    } else {
        value.to_string()
    }
}

/// Rewrite a recognizable date as `YYYY-MM-DD`; anything else is returned unchanged.
pub fn normalize_date(value: &str) -> String {
    // chrono's %Y accepts short years, which would turn `05-11-20` into year 5.
    if !FOUR_DIGIT_YEAR.is_match(value) {
        return value.to_string();
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| value.to_string())
}

/// First integer embedded in a value (`"S3"` → 3, `"#12"` → 12).
pub fn leading_integer(value: &str) -> Option<u32> {
    DIGIT_RUN
        .find(value)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Render a stored SQLite value as the string the engine compares on.
pub fn render_sql_value(value: &rusqlite::types::Value) -> Option<String> {
    use rusqlite::types::Value;
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s.clone()),
        Value::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    }
}
