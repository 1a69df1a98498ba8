//! South African public holiday calendar.
//!
//! Fixed-date holidays plus the two Easter-derived ones:
//! * New Year's Day (Jan 1)
//! * Human Rights Day (Mar 21)
//! * Good Friday (Easter - 2)
//! * Family Day (Easter + 1)
//! * Freedom Day (Apr 27)
//! * Workers' Day (May 1)
//! * Youth Day (Jun 16)
//! * National Women's Day (Aug 9)
//! * Heritage Day (Sep 24)
//! * Day of Reconciliation (Dec 16)
//! * Christmas Day (Dec 25)
//! * Day of Goodwill (Dec 26)
//!
//! A holiday falling on a Sunday is also observed on the next day that is not
//! already a holiday.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

const FIXED_HOLIDAYS: [(u32, u32, &str); 10] = [
    (1, 1, "New Year's Day"),
    (3, 21, "Human Rights Day"),
    (4, 27, "Freedom Day"),
    (5, 1, "Workers' Day"),
    (6, 16, "Youth Day"),
    (8, 9, "National Women's Day"),
    (9, 24, "Heritage Day"),
    (12, 16, "Day of Reconciliation"),
    (12, 25, "Christmas Day"),
    (12, 26, "Day of Goodwill"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicHoliday {
    pub date: NaiveDate,
    pub name: &'static str,
    /// True for the weekday substitute of a holiday that fell on a Sunday.
    pub observed: bool,
}

/// Gregorian Easter Sunday (anonymous algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// All public holidays of `year`, sorted by date.
pub fn public_holidays(year: i32) -> Vec<PublicHoliday> {
    let mut holidays: Vec<PublicHoliday> = FIXED_HOLIDAYS
        .iter()
        .filter_map(|&(month, day, name)| {
            NaiveDate::from_ymd_opt(year, month, day).map(|date| PublicHoliday {
                date,
                name,
                observed: false,
            })
        })
        .collect();

    if let Some(easter) = easter_sunday(year) {
        holidays.push(PublicHoliday {
            date: easter - Duration::days(2),
            name: "Good Friday",
            observed: false,
        });
        holidays.push(PublicHoliday {
            date: easter + Duration::days(1),
            name: "Family Day",
            observed: false,
        });
    }

    let mut taken: BTreeSet<NaiveDate> = holidays.iter().map(|h| h.date).collect();
    let sundays: Vec<PublicHoliday> = holidays
        .iter()
        .filter(|h| h.date.weekday() == Weekday::Sun)
        .cloned()
        .collect();
    for holiday in sundays {
        let mut substitute = holiday.date + Duration::days(1);
        while taken.contains(&substitute) {
            substitute += Duration::days(1);
        }
        taken.insert(substitute);
        holidays.push(PublicHoliday {
            date: substitute,
            name: holiday.name,
            observed: true,
        });
    }

    holidays.sort_by_key(|h| h.date);
    holidays
}

fn holiday_dates(first_year: i32, last_year: i32) -> BTreeSet<NaiveDate> {
    (first_year..=last_year)
        .flat_map(public_holidays)
        .map(|h| h.date)
        .collect()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn is_public_holiday(date: NaiveDate) -> bool {
    public_holidays(date.year()).iter().any(|h| h.date == date)
}

pub fn is_working_day(date: NaiveDate) -> bool {
    !is_weekend(date) && !is_public_holiday(date)
}

/// Working days in `[start, end]`, both ends included. Zero when `end < start`.
pub fn working_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }
    let holidays = holiday_dates(start.year(), end.year());
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !is_weekend(*day) && !holidays.contains(day))
        .count() as u32
}
