//! Timestamp utilities

use chrono::{Local, NaiveDateTime};

/// Format used for the `timestamp` column of annotation rows
pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current wall-clock time in the server's local timezone
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS`
pub fn format_record_timestamp(at: &NaiveDateTime) -> String {
    at.format(RECORD_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_record_timestamp() {
        let at = NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 1)
            .unwrap();
        assert_eq!(format_record_timestamp(&at), "2025-03-07 09:05:01");
    }

    #[test]
    fn test_format_record_timestamp_is_fixed_width() {
        let formatted = format_record_timestamp(&local_now());
        assert_eq!(formatted.len(), 19);
        assert_eq!(&formatted[4..5], "-");
        assert_eq!(&formatted[10..11], " ");
    }
}
