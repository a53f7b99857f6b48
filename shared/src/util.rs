/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Backend timestamps use a space between date and time (`2025-05-30 12:39:12`);
/// ISO parsers expect `T`. Only the first separator is replaced.
pub fn normalize_timestamp(raw: &str) -> String {
    raw.trim().replacen(' ', "T", 1)
}
