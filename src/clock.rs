use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike, Utc};

const WEEKDAYS: [&str; 7] = [
    "воскресенье",
    "понедельник",
    "вторник",
    "среда",
    "четверг",
    "пятница",
    "суббота",
];

// Genitive case, as used after a day number.
const MONTHS: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

/// The wall clock of the machine's time zone.
///
/// Every reading goes through the zone rules in effect at that instant, so the display
/// follows daylight-saving changes and `TZ` updates without a restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalClock;

impl LocalClock {
    pub fn now(&self) -> NaiveDateTime {
        self.at(Utc::now())
    }

    /// What a local wall clock showed at `instant`.
    pub fn at(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&Local).naive_local()
    }
}

/// `H:MM`, no leading zero on the hour.
pub fn time_text<T: Timelike>(now: &T) -> String {
    format!("{}:{:02}", now.hour(), now.minute())
}

/// `пятница, 16 октября 2026 года`
pub fn date_text<T: Datelike>(now: &T) -> String {
    format!(
        "{}, {} {} {} года",
        WEEKDAYS[now.weekday().num_days_from_sunday() as usize],
        now.day(),
        MONTHS[now.month0() as usize],
        now.year(),
    )
}

/// `YYYY-MM-DD`, the date format of the image feed.
pub fn iso_date<T: Datelike>(now: &T) -> String {
    format!("{:04}-{:02}-{:02}", now.year(), now.month(), now.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .unwrap()
    }

    #[test]
    fn time_has_no_leading_hour_zero() {
        assert_eq!(time_text(&at(2026, 10, 16, 7, 5)), "7:05");
        assert_eq!(time_text(&at(2026, 10, 16, 23, 59)), "23:59");
        assert_eq!(time_text(&at(2026, 10, 16, 0, 0)), "0:00");
    }

    #[test]
    fn date_is_russian() {
        assert_eq!(
            date_text(&at(2026, 10, 16, 12, 0)),
            "пятница, 16 октября 2026 года"
        );
        assert_eq!(
            date_text(&at(2025, 11, 23, 12, 0)),
            "воскресенье, 23 ноября 2025 года"
        );
    }

    #[test]
    fn iso_date_is_zero_padded() {
        assert_eq!(iso_date(&at(2025, 3, 4, 0, 0)), "2025-03-04");
        assert_eq!(iso_date(&at(2025, 3, 4, 0, 0).date()), "2025-03-04");
    }
}
