//! Common types and utilities shared across models.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

/// Storage format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage format for wall-clock times
pub const TIME_FORMAT: &str = "%H:%M";
/// Storage format for local date-times
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Weekday as stored in `doctor_availability.day_of_week`
pub fn weekday_to_db(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

/// Parse a weekday name, accepting full names and three-letter abbreviations
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_uppercase().as_str() {
        "MONDAY" | "MON" => Some(Weekday::Mon),
        "TUESDAY" | "TUE" => Some(Weekday::Tue),
        "WEDNESDAY" | "WED" => Some(Weekday::Wed),
        "THURSDAY" | "THU" => Some(Weekday::Thu),
        "FRIDAY" | "FRI" => Some(Weekday::Fri),
        "SATURDAY" | "SAT" => Some(Weekday::Sat),
        "SUNDAY" | "SUN" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parse a stored time, tolerating a trailing seconds component
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored date-time, also accepting the ISO `T` separator and
/// minute precision
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Current local wall-clock time at second precision
pub fn now_local() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_names() {
        assert_eq!(weekday_to_db(Weekday::Mon), "MONDAY");
        assert_eq!(parse_weekday("monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Sat"), Some(Weekday::Sat));
        assert_eq!(parse_weekday("funday"), None);

        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            assert_eq!(parse_weekday(weekday_to_db(day)), Some(day));
        }
    }

    #[test]
    fn test_parse_time_accepts_seconds() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(parse_time("09:00"), Some(nine));
        assert_eq!(parse_time("09:00:00"), Some(nine));
        assert_eq!(parse_time("9am"), None);
        assert_eq!(format_time(nine), "09:00");
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2025-03-03 09:30:00"), Some(expected));
        assert_eq!(parse_datetime("2025-03-03T09:30:00"), Some(expected));
        assert_eq!(parse_datetime("2025-03-03 09:30"), Some(expected));
        assert_eq!(format_datetime(expected), "2025-03-03 09:30:00");
        assert_eq!(parse_datetime("03/03/2025"), None);
    }
}
