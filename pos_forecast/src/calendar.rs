//! Calendar features: weekday, season and the Japanese public-holiday calendar
//!
//! The holiday rules cover 1980-2099: fixed-date holidays, the Happy Monday
//! moves, the equinox approximation, substitute holidays and the sandwiched
//! "citizens' holiday", plus the one-off imperial and Olympic dates.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Weekday index with Monday = 0 and Sunday = 6
pub fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

/// Saturday or Sunday
pub fn is_weekend(date: NaiveDate) -> bool {
    weekday_index(date) >= 5
}

/// Season index: spring (3-5) = 0, summer (6-8) = 1, autumn (9-11) = 2, winter = 3
pub fn season(month: u32) -> u32 {
    match month {
        3..=5 => 0,
        6..=8 => 1,
        9..=11 => 2,
        _ => 3,
    }
}

/// Whether `date` is a Japanese public holiday, including substitute and
/// sandwiched holidays
pub fn is_public_holiday(date: NaiveDate) -> bool {
    is_statutory_holiday(date) || is_substitute_holiday(date) || is_citizens_holiday(date)
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn nth_monday(year: i32, month: u32, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Mon, n)
}

fn vernal_equinox_day(year: i32) -> u32 {
    let offset = f64::from(year - 1980);
    (20.8431 + 0.242194 * offset - (offset / 4.0).floor()).floor() as u32
}

fn autumnal_equinox_day(year: i32) -> u32 {
    let offset = f64::from(year - 1980);
    (23.2488 + 0.242194 * offset - (offset / 4.0).floor()).floor() as u32
}

/// Holidays named directly by the holiday law or by one-off acts
fn is_statutory_holiday(date: NaiveDate) -> bool {
    let year = date.year();
    let (month, day) = (date.month(), date.day());

    let one_offs: [(i32, u32, u32); 11] = [
        (1989, 2, 24),  // state funeral of Emperor Showa
        (1990, 11, 12), // enthronement ceremony
        (1993, 6, 9),   // crown prince's wedding
        (2019, 4, 30),
        (2019, 5, 1), // accession day
        (2019, 5, 2),
        (2019, 10, 22), // enthronement ceremony
        (2020, 7, 23),  // moved for the Tokyo Olympics
        (2020, 7, 24),
        (2021, 7, 22),
        (2021, 7, 23),
    ];
    if one_offs.contains(&(year, month, day)) {
        return true;
    }
    if (year == 2020 && month == 8 && day == 10) || (year == 2021 && month == 8 && day == 8) {
        return true;
    }

    match month {
        1 => {
            day == 1
                || if year >= 2000 {
                    nth_monday(year, 1, 2) == Some(date)
                } else {
                    day == 15
                }
        }
        2 => day == 11 || (year >= 2020 && day == 23),
        3 => day == vernal_equinox_day(year),
        4 => day == 29,
        5 => day == 3 || (year >= 2007 && day == 4) || day == 5,
        7 => match year {
            2020 | 2021 => false,
            1996..=2002 => day == 20,
            y if y >= 2003 => nth_monday(year, 7, 3) == Some(date),
            _ => false,
        },
        8 => year >= 2016 && year != 2020 && year != 2021 && day == 11,
        9 => {
            day == autumnal_equinox_day(year)
                || if year >= 2003 {
                    nth_monday(year, 9, 3) == Some(date)
                } else {
                    day == 15
                }
        }
        10 => match year {
            2020 | 2021 => false,
            y if y >= 2000 => nth_monday(year, 10, 2) == Some(date),
            _ => day == 10,
        },
        11 => day == 3 || day == 23,
        12 => (1989..=2018).contains(&year) && day == 23,
        _ => false,
    }
}

/// Monday-after-Sunday rule; since 2007 the next non-holiday after a Sunday holiday
fn is_substitute_holiday(date: NaiveDate) -> bool {
    if is_statutory_holiday(date) || ymd(1973, 4, 12).map_or(true, |start| date < start) {
        return false;
    }

    let previous = date - Duration::days(1);
    if date.year() < 2007 {
        return date.weekday() == Weekday::Mon && is_statutory_holiday(previous);
    }

    let mut cursor = previous;
    while is_statutory_holiday(cursor) {
        if cursor.weekday() == Weekday::Sun {
            return true;
        }
        cursor -= Duration::days(1);
    }
    false
}

/// A non-Sunday weekday squeezed between two statutory holidays
fn is_citizens_holiday(date: NaiveDate) -> bool {
    if ymd(1985, 12, 27).map_or(true, |start| date < start)
        || date.weekday() == Weekday::Sun
        || is_statutory_holiday(date)
    {
        return false;
    }
    is_statutory_holiday(date - Duration::days(1)) && is_statutory_holiday(date + Duration::days(1))
}
