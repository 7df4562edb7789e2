//! Field-level value types shared by the parser, model, window builder and
//! transition compiler. Grounded on `zoneinfo_rs::types` (`Time`, `Sign`,
//! `Month`, `WeekDay`) but reshaped per the REDESIGN FLAGS of spec.md §9:
//! `YearBound` replaces bare sentinel integers and `TimeDefinition` replaces
//! `QualifiedTime`'s fused value/interpretation enum with a plain 3-variant
//! enum plus an explicit `resolve` operation.

use alloc::string::String;
use core::cmp::Ordering;
use core::fmt;

use crate::error::{ParseError, SourceLocation};

/// A year, or one of the two open-ended sentinels tzdata spells `min`
/// (the left edge of the supported range) and `max` (the right edge,
/// i.e. "forever"). Kept as its own sum type rather than `i32::MIN`/`MAX`
/// so that arithmetic on a `YearBound` can never silently wrap (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YearBound {
    Min,
    Finite(i32),
    Max,
}

impl YearBound {
    /// Numeric value used only where an algorithm genuinely needs one
    /// (e.g. the tidy pass's `capYear` arithmetic). `Min`/`Max` saturate
    /// rather than wrap.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Min => i32::MIN,
            Self::Finite(y) => y,
            Self::Max => i32::MAX,
        }
    }
}

impl PartialOrd for YearBound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for YearBound {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_i32().cmp(&other.as_i32())
    }
}

/// Month of the year, `Jan = 1` .. `Dec = 12`, matching tzdata's own
/// one-based numbering and `zoneinfo_rs::types::Month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Month {
    Jan = 1,
    Feb = 2,
    Mar = 3,
    Apr = 4,
    May = 5,
    Jun = 6,
    Jul = 7,
    Aug = 8,
    Sep = 9,
    Oct = 10,
    Nov = 11,
    Dec = 12,
}

const MONTH_NAMES: [(&str, Month); 12] = [
    ("january", Month::Jan),
    ("february", Month::Feb),
    ("march", Month::Mar),
    ("april", Month::Apr),
    ("may", Month::May),
    ("june", Month::Jun),
    ("july", Month::Jul),
    ("august", Month::Aug),
    ("september", Month::Sep),
    ("october", Month::Oct),
    ("november", Month::Nov),
    ("december", Month::Dec),
];

impl Month {
    pub fn from_number(n: u8) -> Option<Self> {
        Some(match n {
            1 => Self::Jan,
            2 => Self::Feb,
            3 => Self::Mar,
            4 => Self::Apr,
            5 => Self::May,
            6 => Self::Jun,
            7 => Self::Jul,
            8 => Self::Aug,
            9 => Self::Sep,
            10 => Self::Oct,
            11 => Self::Nov,
            12 => Self::Dec,
            _ => return None,
        })
    }

    /// Parses a case-insensitive prefix of at least 3 characters of the
    /// full month name (spec.md §4.A "Month").
    pub fn parse_prefix(text: &str, loc: &SourceLocation) -> Result<Self, ParseError> {
        parse_name_prefix(text, &MONTH_NAMES, "month", loc)
    }
}

/// Day of the week, `Sun = 0` .. `Sat = 6`. `0` doubles as "absent" in the
/// packed `TransitionRule` wire format (§4.F.1), so `Sun` is deliberately
/// the zero discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WeekDay {
    Sun = 0,
    Mon = 1,
    Tue = 2,
    Wed = 3,
    Thu = 4,
    Fri = 5,
    Sat = 6,
}

const WEEKDAY_NAMES: [(&str, WeekDay); 7] = [
    ("sunday", WeekDay::Sun),
    ("monday", WeekDay::Mon),
    ("tuesday", WeekDay::Tue),
    ("wednesday", WeekDay::Wed),
    ("thursday", WeekDay::Thu),
    ("friday", WeekDay::Fri),
    ("saturday", WeekDay::Sat),
];

impl WeekDay {
    pub fn from_number(n: u8) -> Option<Self> {
        Some(match n {
            0 => Self::Sun,
            1 => Self::Mon,
            2 => Self::Tue,
            3 => Self::Wed,
            4 => Self::Thu,
            5 => Self::Fri,
            6 => Self::Sat,
            _ => return None,
        })
    }

    /// Parses a case-insensitive prefix of at least 3 characters of the
    /// full weekday name (spec.md §4.A "Day-of-week").
    pub fn parse_prefix(text: &str, loc: &SourceLocation) -> Result<Self, ParseError> {
        parse_name_prefix(text, &WEEKDAY_NAMES, "weekday", loc)
    }
}

fn parse_name_prefix<T: Copy>(
    text: &str,
    table: &[(&str, T)],
    field: &'static str,
    loc: &SourceLocation,
) -> Result<T, ParseError> {
    if text.len() < 3 {
        return Err(ParseError::InvalidField {
            loc: loc.clone(),
            field,
            text: text.into(),
        });
    }
    let lower = to_ascii_lowercase(text);
    for (name, value) in table {
        if lower.len() <= name.len() && name.as_bytes().starts_with(lower.as_bytes()) {
            return Ok(*value);
        }
    }
    Err(ParseError::InvalidField {
        loc: loc.clone(),
        field,
        text: text.into(),
    })
}

fn to_ascii_lowercase(s: &str) -> String {
    s.chars().map(|c| c.to_ascii_lowercase()).collect()
}

/// Sign of a [`Time`] value. tzdata allows a leading `-` on offsets and
/// savings amounts; the magnitude is always stored separately so that
/// `00:00` has an unambiguous sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Positive,
    Negative,
}

/// A signed time-of-day / duration, `HH[:MM[:SS]]`, as produced by the
/// offset, savings and time-of-day field parsers (spec.md §4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    pub sign: Sign,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            sign: Sign::Positive,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl Time {
    pub fn is_zero(&self) -> bool {
        self.hour == 0 && self.minute == 0 && self.second == 0
    }

    /// Total seconds, signed.
    pub fn as_secs(&self) -> i64 {
        let magnitude = i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second);
        match self.sign {
            Sign::Positive => magnitude,
            Sign::Negative => -magnitude,
        }
    }

    pub fn from_secs(secs: i64) -> Self {
        let sign = if secs < 0 { Sign::Negative } else { Sign::Positive };
        let magnitude = secs.unsigned_abs();
        Self {
            sign,
            hour: (magnitude / 3600) as u32,
            minute: ((magnitude % 3600) / 60) as u32,
            second: (magnitude % 60) as u32,
        }
    }
}

/// How a rule or zone-until's literal time-of-day maps to an absolute
/// instant (spec.md §9 "Time definition mapping"). Deliberately a plain
/// enum with a free-standing `resolve` method rather than the teacher's
/// `QualifiedTime`, which bundled the literal `Time` value and its
/// interpretation into one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeDefinition {
    Wall,
    Standard,
    Utc,
}

impl TimeDefinition {
    /// Suffix character on a time-of-day field selects the definition
    /// (spec.md §4.A "Time-of-day"): `s/S` → Standard; `u/U/g/G/z/Z` →
    /// Utc; anything else (including `w/W` or no suffix) → Wall.
    pub fn from_suffix(suffix: Option<char>) -> Self {
        match suffix {
            Some('s') | Some('S') => Self::Standard,
            Some('u') | Some('U') | Some('g') | Some('G') | Some('z') | Some('Z') => Self::Utc,
            _ => Self::Wall,
        }
    }

    /// Resolves a naive (offset-free) local reading of the clock,
    /// expressed in seconds since the epoch as if it were already UTC,
    /// into the actual UTC instant it denotes.
    ///
    /// - `Wall`: the reading is standard time plus whatever savings is
    ///   in effect, so subtract `standardOffset + savings`.
    /// - `Standard`: the reading is standard time, so subtract only
    ///   `standardOffset`.
    /// - `Utc`: the reading is already UTC.
    pub fn resolve(self, naive_local_seconds: i64, standard_offset: i64, savings: i64) -> i64 {
        match self {
            Self::Wall => naive_local_seconds - (standard_offset + savings),
            Self::Standard => naive_local_seconds - standard_offset,
            Self::Utc => naive_local_seconds,
        }
    }

    pub(crate) fn as_u2(self) -> u8 {
        match self {
            Self::Wall => 0,
            Self::Standard => 1,
            Self::Utc => 2,
        }
    }

    pub(crate) fn from_u2(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Wall),
            1 => Some(Self::Standard),
            2 => Some(Self::Utc),
            _ => None,
        }
    }
}

/// A day-of-month expression, generalized over the four textual forms
/// spec.md §4.A describes (`lastXxx`, `Xxx>=N`, `Xxx<=N`, a bare integer)
/// into one struct rather than the teacher's four-variant `DayOfMonth`
/// enum, matching the flattened `dayOfMonthIndicator`/`dayOfWeek?`/
/// `adjustForwards` attributes spec.md §3's `RawRule` actually names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DaySpec {
    /// Signed day-of-month indicator: `1..=31` counts from the start of
    /// the month, `-1..=-28` counts back from the end (`-1` = "the last
    /// day eligible"). Never `0`.
    pub day_of_month_indicator: i8,
    /// `None` for a bare day-of-month; `Some` for `lastXxx`/`Xxx>=N`/`Xxx<=N`.
    pub day_of_week: Option<WeekDay>,
    /// When `day_of_week` is set: search forwards (`Xxx>=N`) or
    /// backwards (`lastXxx`, `Xxx<=N`) from the indicator day.
    pub adjust_forwards: bool,
}

impl DaySpec {
    pub fn bare_day(day: i8) -> Self {
        Self {
            day_of_month_indicator: day,
            day_of_week: None,
            adjust_forwards: false,
        }
    }

    pub fn last(day_of_week: WeekDay) -> Self {
        Self {
            day_of_month_indicator: -1,
            day_of_week: Some(day_of_week),
            adjust_forwards: false,
        }
    }

    pub fn on_or_after(day_of_week: WeekDay, day: i8) -> Self {
        Self {
            day_of_month_indicator: day,
            day_of_week: Some(day_of_week),
            adjust_forwards: true,
        }
    }

    pub fn on_or_before(day_of_week: WeekDay, day: i8) -> Self {
        Self {
            day_of_month_indicator: day,
            day_of_week: Some(day_of_week),
            adjust_forwards: false,
        }
    }

    pub fn in_valid_range(&self) -> bool {
        let v = self.day_of_month_indicator;
        v != 0 && v >= -28 && v <= 31
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jan => "Jan",
            Self::Feb => "Feb",
            Self::Mar => "Mar",
            Self::Apr => "Apr",
            Self::May => "May",
            Self::Jun => "Jun",
            Self::Jul => "Jul",
            Self::Aug => "Aug",
            Self::Sep => "Sep",
            Self::Oct => "Oct",
            Self::Nov => "Nov",
            Self::Dec => "Dec",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new("test", 1, "")
    }

    #[test]
    fn month_prefix_matches_shortest_and_longest() {
        assert_eq!(Month::parse_prefix("Jan", &loc()).unwrap(), Month::Jan);
        assert_eq!(Month::parse_prefix("January", &loc()).unwrap(), Month::Jan);
    }

    #[test]
    fn month_prefix_rejects_short_or_ambiguous() {
        assert!(Month::parse_prefix("Ju", &loc()).is_err());
        assert!(Month::parse_prefix("xyz", &loc()).is_err());
    }

    #[test]
    fn time_definition_resolves_wall_standard_utc() {
        let naive = 1_000_000i64;
        assert_eq!(TimeDefinition::Wall.resolve(naive, 3600, 3600), naive - 7200);
        assert_eq!(TimeDefinition::Standard.resolve(naive, 3600, 3600), naive - 3600);
        assert_eq!(TimeDefinition::Utc.resolve(naive, 3600, 3600), naive);
    }

    #[test]
    fn year_bound_orders_sentinels_around_finite() {
        assert!(YearBound::Min < YearBound::Finite(1970));
        assert!(YearBound::Finite(2024) < YearBound::Max);
        assert!(YearBound::Min < YearBound::Max);
    }

    #[test]
    fn time_round_trips_through_seconds() {
        let t = Time {
            sign: Sign::Negative,
            hour: 1,
            minute: 30,
            second: 0,
        };
        assert_eq!(Time::from_secs(t.as_secs()), t);
    }
}
