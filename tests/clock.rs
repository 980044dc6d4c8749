//! Runs in its own test binary because it sets `TZ` for the whole process.

use chrono::{TimeZone, Utc};

use snowclock::clock::{self, LocalClock};

// Central European rules: UTC+1, UTC+2 from the last Sunday of March 02:00 to the last
// Sunday of October 03:00. A rule string needs no zoneinfo database.
const CENTRAL_EUROPE: &str = "CET-1CEST,M3.5.0,M10.5.0/3";

#[test]
fn follows_daylight_saving_changes() {
    std::env::set_var("TZ", CENTRAL_EUROPE);
    let clock = LocalClock;

    // Summer time, before the change on Sunday 25 October 2026.
    let summer = clock.at(Utc.with_ymd_and_hms(2026, 10, 16, 7, 5, 0).unwrap());
    assert_eq!(clock::time_text(&summer), "9:05");
    assert_eq!(clock::date_text(&summer), "пятница, 16 октября 2026 года");

    // Same UTC time of day after the change reads one hour earlier.
    let winter = clock.at(Utc.with_ymd_and_hms(2026, 10, 26, 7, 5, 0).unwrap());
    assert_eq!(clock::time_text(&winter), "8:05");

    let winter = clock.at(Utc.with_ymd_and_hms(2026, 10, 26, 9, 5, 0).unwrap());
    assert_eq!(clock::time_text(&winter), "10:05");

    // 23:30 UTC is already the next local day in both seasons.
    let late = clock.at(Utc.with_ymd_and_hms(2026, 10, 26, 23, 30, 0).unwrap());
    assert_eq!(clock::iso_date(&late), "2026-10-27");
    assert_eq!(clock::time_text(&late), "0:30");
}
