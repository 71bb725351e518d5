use std::cell::RefCell;

use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;
pub use time::Date;
use time::{macros::format_description, Month, UtcOffset};

pub type StaticDateFormat<'a> =
    &'static [time::format_description::BorrowedFormatItem<'a>];

pub const STANDARD_DATE_FORMAT: StaticDateFormat =
    format_description!("[year]-[month]-[day]");

pub fn parse_standard_date(date_str: &str) -> Result<Date, time::error::Parse> {
    Date::parse(date_str, STANDARD_DATE_FORMAT)
}

lazy_static! {
    // DD.MM.YYYY, with the day and month not necessarily zero-padded.
    static ref GERMAN_DATE_RE: Regex =
        Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap();
}

fn month_from_number(m: u8) -> Option<Month> {
    // nth_next wraps, so 0-based offset from January is safe for 1..=12
    if (1..=12).contains(&m) {
        Some(Month::January.nth_next(m - 1))
    } else {
        None
    }
}

/// Parses a date in German broker notation (`DD.MM.YYYY`).
pub fn parse_german_date(date_str: &str) -> Option<Date> {
    let caps = GERMAN_DATE_RE.captures(date_str.trim())?;
    let day: u8 = caps[1].parse().ok()?;
    let month: u8 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    Date::from_calendar_date(year, month_from_number(month)?, day).ok()
}

/// Normalizes a broker-export date to a typed Date. Accepts ISO
/// `YYYY-MM-DD` and German `DD.MM.YYYY`. Anything else (including the
/// empty strings found on footer rows) yields None.
pub fn normalize_date(date_str: &str) -> Option<Date> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains('-') {
        return parse_standard_date(trimmed).ok();
    }
    parse_german_date(trimmed)
}

fn date_naive_to_date(dn: &chrono::NaiveDate) -> Date {
    Date::from_calendar_date(
        dn.year(),
        Month::December.nth_next(dn.month() as u8),
        dn.day() as u8,
    )
    .unwrap()
}

thread_local! {
    static TODAYS_DATE_FOR_TEST_TL: RefCell<Date> = RefCell::new(Date::MIN);
}

pub fn set_todays_date_for_test(d: Date) {
    TODAYS_DATE_FOR_TEST_TL.with_borrow_mut(|d_| *d_ = d);
}

pub fn today_local() -> Date {
    let test_date: Date = TODAYS_DATE_FOR_TEST_TL.with_borrow(|d| d.clone());
    if test_date != Date::MIN {
        return test_date.clone();
    }
    let now = chrono::offset::Local::now();
    date_naive_to_date(&now.date_naive())
}

// This is a (possibly unsafe, but no worse than today_local) way
// to get the current system UtcOffset of local timezone.
// Using UtcOffset::current_local_offset is apparently unsafe on Linux,
// and will return an error if used without enabling some "unsafe" feature.
pub fn local_utc_offset() -> Result<UtcOffset, time::error::ComponentRange> {
    let now = chrono::offset::Local::now();
    let offset = now.offset();
    UtcOffset::from_whole_seconds(-1 * offset.utc_minus_local())
}

// Used by both unit and integration tests
pub mod pub_testlib {
    use time::{Date, Duration, Month};

    pub fn doy_date(year: u32, day: i64) -> Date {
        Date::from_calendar_date(year as i32, Month::January, 1)
            .unwrap()
            .saturating_add(Duration::days(day))
    }
}
