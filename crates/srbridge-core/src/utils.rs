//! 通用工具函数

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::error::{BridgeError, Result};

/// 为FHIR资源生成本地唯一标识符
///
/// 每个资源在单次转换内生成一次，同一输出内的交叉引用均使用该值。
pub fn generate_resource_id() -> String {
    Uuid::new_v4().to_string()
}

/// 解析日历日期
///
/// 接受DICOM紧凑格式 (YYYYMMDD) 与ISO格式 (YYYY-MM-DD)。
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    let parsed = if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        NaiveDate::parse_from_str(trimmed, "%Y%m%d")
    } else {
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
    };
    parsed.map_err(|_| BridgeError::DateFormat(value.to_string()))
}

/// 宽容解析日历日期
///
/// 格式不符的日期降级为空值，转换继续，不中断请求。
pub fn parse_date_lossy(value: &str, field: &str) -> Option<NaiveDate> {
    if value.trim().is_empty() {
        return None;
    }
    match parse_calendar_date(value) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!("字段 {} 日期降级为空: {}", field, e);
            None
        }
    }
}

/// HL7 紧凑日期 (YYYYMMDD)
pub fn hl7_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// FHIR 日历日期 (YYYY-MM-DD)
pub fn fhir_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// HL7 消息时间戳 (YYYYMMDDHHMMSS)
pub fn hl7_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_calendar_date() {
        let compact = parse_calendar_date("19850315").unwrap();
        let iso = parse_calendar_date("1985-03-15").unwrap();
        assert_eq!(compact, iso);
        assert_eq!(hl7_date(compact), "19850315");
        assert_eq!(fhir_date(compact), "1985-03-15");
    }

    #[test]
    fn test_parse_calendar_date_rejects_malformed() {
        assert!(matches!(
            parse_calendar_date("2025135"),
            Err(BridgeError::DateFormat(_))
        ));
        assert!(parse_calendar_date("not-a-date").is_err());
        // 无效的月/日组合
        assert!(parse_calendar_date("20251345").is_err());
    }

    #[test]
    fn test_parse_date_lossy_degrades() {
        assert_eq!(parse_date_lossy("", "StudyDate"), None);
        assert_eq!(parse_date_lossy("20251345", "StudyDate"), None);
        assert!(parse_date_lossy("20250512", "StudyDate").is_some());
    }

    #[test]
    fn test_generate_resource_id() {
        let a = generate_resource_id();
        let b = generate_resource_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
