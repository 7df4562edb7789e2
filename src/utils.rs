//! Calendar arithmetic shared by every module that needs to turn a
//! (year, month, day, time) reading into a naive count of seconds since
//! the epoch, or back.
//!
//! Grounded on `boa-dev-temporal`'s root `src/utils.rs` (`epoch_days_for_year`,
//! `day_of_week`, `days_in_month`) and on `zoneinfo_rs::rule`'s
//! `epoch_days_for_rule_date` weekday-search loops.

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Number of days elapsed between the Unix epoch and the first of
/// `year` (Gregorian, proleptic).
pub fn epoch_days_for_year(year: i32) -> i64 {
    let year = i64::from(year);
    365 * (year - 1970) + (year - 1969).div_euclid(4) - (year - 1901).div_euclid(100)
        + (year - 1601).div_euclid(400)
}

/// `true` if `year` is a Gregorian leap year.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days `month` (1-based, Jan=1) has in `year`.
pub fn days_in_month(month: u8, year: i32) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => unreachable!("month out of range 1..=12"),
    }
}

/// Days elapsed from the start of `year` to the start of `month` (1-based).
pub fn day_of_year_until_start_of_month(month: u8, year: i32) -> i64 {
    let leap = i64::from(is_leap_year(year));
    match month {
        1 => 0,
        2 => 31,
        3 => 59 + leap,
        4 => 90 + leap,
        5 => 120 + leap,
        6 => 151 + leap,
        7 => 181 + leap,
        8 => 212 + leap,
        9 => 243 + leap,
        10 => 273 + leap,
        11 => 304 + leap,
        12 => 334 + leap,
        _ => unreachable!("month out of range 1..=12"),
    }
}

/// Epoch-day count for the first of `month` in `year`.
pub fn epoch_days_for_year_month(year: i32, month: u8) -> i64 {
    epoch_days_for_year(year) + day_of_year_until_start_of_month(month, year)
}

/// Day-of-week for an epoch-day count. `0` is Sunday, matching
/// [`crate::types::WeekDay`]'s discriminants. Epoch day `0` (1970-01-01)
/// is a Thursday, hence the `+4`.
pub fn epoch_days_to_week_day(epoch_days: i64) -> u8 {
    (epoch_days + 4).rem_euclid(7) as u8
}

/// Epoch seconds (UTC-naive, i.e. not yet adjusted for any zone offset)
/// at midnight of the given epoch day.
pub fn epoch_seconds_for_epoch_days(epoch_days: i64) -> i64 {
    epoch_days * SECONDS_PER_DAY
}

/// Calendar year containing the given epoch-day count. Used only to feed
/// the Window Builder's tidy pass (spec.md §4.C) a human year number; not
/// performance sensitive.
pub fn year_for_epoch_days(epoch_days: i64) -> i32 {
    // Binary search would be overkill; tzdata years are always close to
    // 1970, so a linear Gregorian estimate converges in at most one
    // correction step.
    let mut year = (1970.0 + (epoch_days as f64) / 365.2425) as i32;
    loop {
        let start = epoch_days_for_year(year);
        if epoch_days < start {
            year -= 1;
            continue;
        }
        let next_start = epoch_days_for_year(year + 1);
        if epoch_days >= next_start {
            year += 1;
            continue;
        }
        return year;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_for_known_years() {
        assert_eq!(epoch_days_for_year(1970), 0);
        assert_eq!(epoch_days_for_year(1969), -365);
        assert_eq!(epoch_days_for_year(1972), 365 + 365);
    }

    #[test]
    fn week_day_matches_known_epoch() {
        // 1970-01-01 was a Thursday.
        assert_eq!(epoch_days_to_week_day(0), 4);
        // 1969-12-28 was a Sunday.
        assert_eq!(epoch_days_to_week_day(-4), 0);
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2, 2024), 29);
        assert_eq!(days_in_month(2, 2023), 28);
        assert_eq!(days_in_month(2, 2000), 29);
        assert_eq!(days_in_month(2, 1900), 28);
    }

    #[test]
    fn year_for_epoch_days_round_trips() {
        for year in -50..=2100 {
            let start = epoch_days_for_year(year);
            assert_eq!(year_for_epoch_days(start), year);
            assert_eq!(year_for_epoch_days(start + 300), year);
        }
    }
}
