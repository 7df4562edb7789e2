//! Tokenizer & Record Parser (component A, spec.md §4.A). Grounded on
//! `zoneinfo_rs::parser`'s `ZoneInfoParser`/`LineParseContext` shape
//! (track a current line number, strip comments, split on whitespace)
//! but reworked to parse each tzdata line straight into the
//! [`crate::model`] types rather than an intermediate AST.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::{CompileError, ParseError, SemanticError, SourceLocation};
use crate::model::{
    LeapAdjustment, LeapSecondEntry, RawRule, RawZone, TzDataModel, UntilSpec, ZoneSavings,
};
use crate::types::{DaySpec, Month, Sign, Time, TimeDefinition, WeekDay, YearBound};

/// Strips a `#`-led comment (and anything after it) from a line.
fn remove_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn loc(file: &str, line_number: u32, line_text: &str) -> SourceLocation {
    SourceLocation::new(file, line_number, line_text)
}

fn next_token<'a>(
    tokens: &mut core::str::SplitWhitespace<'a>,
    l: &SourceLocation,
) -> Result<&'a str, ParseError> {
    tokens.next().ok_or_else(|| ParseError::TooFewFields {
        loc: l.clone(),
        expected_at_least: 1,
        found: 0,
    })
}

fn parse_i32(text: &str, field: &'static str, l: &SourceLocation) -> Result<i32, ParseError> {
    text.parse::<i32>().map_err(|_| ParseError::InvalidField {
        loc: l.clone(),
        field,
        text: text.into(),
    })
}

fn parse_i8(text: &str, field: &'static str, l: &SourceLocation) -> Result<i8, ParseError> {
    text.parse::<i8>().map_err(|_| ParseError::InvalidField {
        loc: l.clone(),
        field,
        text: text.into(),
    })
}

/// Year field (spec.md §4.A "Year"): `minimum`/`maximum` (any
/// case-insensitive truncation down to 3 letters) map to the open
/// sentinels; otherwise a signed decimal integer.
pub fn parse_year(text: &str, l: &SourceLocation) -> Result<YearBound, ParseError> {
    if is_truncated_prefix(text, "minimum") {
        return Ok(YearBound::Min);
    }
    if is_truncated_prefix(text, "maximum") {
        return Ok(YearBound::Max);
    }
    Ok(YearBound::Finite(parse_i32(text, "year", l)?))
}

/// A Rule's `To` column additionally accepts `only` (case-insensitive,
/// not prefix-matched), meaning "same as `From`".
pub fn parse_to_year(text: &str, default: i32, l: &SourceLocation) -> Result<YearBound, ParseError> {
    if text.eq_ignore_ascii_case("only") {
        return Ok(YearBound::Finite(default));
    }
    parse_year(text, l)
}

fn is_truncated_prefix(text: &str, full: &str) -> bool {
    text.len() >= 3 && text.len() <= full.len() && full.as_bytes()[..text.len()].eq_ignore_ascii_case(text.as_bytes())
}

/// Day specification (spec.md §4.A "Day specification").
pub fn parse_day_spec(text: &str, l: &SourceLocation) -> Result<DaySpec, ParseError> {
    if text.len() > 4 && text[..4].eq_ignore_ascii_case("last") {
        let weekday = WeekDay::parse_prefix(&text[4..], l)?;
        return Ok(DaySpec::last(weekday));
    }
    if let Some(idx) = text.find(">=") {
        let weekday = WeekDay::parse_prefix(&text[..idx], l)?;
        let day = parse_i8(&text[idx + 2..], "dayOfMonth", l)?;
        return Ok(DaySpec::on_or_after(weekday, day));
    }
    if let Some(idx) = text.find("<=") {
        let weekday = WeekDay::parse_prefix(&text[..idx], l)?;
        let day = parse_i8(&text[idx + 2..], "dayOfMonth", l)?;
        return Ok(DaySpec::on_or_before(weekday, day));
    }
    Ok(DaySpec::bare_day(parse_i8(text, "dayOfMonth", l)?))
}

/// Parses the magnitude/sign portion shared by every clock-valued field:
/// an optional leading `-`, then `H[:MM[:SS]]`.
fn parse_clock_magnitude(text: &str, l: &SourceLocation) -> Result<(Sign, u32, u32, u32, i64), ParseError> {
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (Sign::Negative, rest),
        None => (Sign::Positive, text),
    };
    let mut parts = rest.splitn(3, ':');
    let hour_text = parts.next().unwrap_or("");
    let hour = parse_i32(hour_text, "time", l)?;
    if hour < 0 {
        return Err(ParseError::InvalidField {
            loc: l.clone(),
            field: "time",
            text: text.into(),
        });
    }
    let minute = match parts.next() {
        Some(m) => parse_i32(m, "time", l)?,
        None => 0,
    };
    let second = match parts.next() {
        Some(s) => parse_i32(s, "time", l)?,
        None => 0,
    };
    let total = i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second);
    Ok((sign, hour as u32, minute as u32, second as u32, total))
}

/// A plain signed duration field with no suffix and no end-of-day
/// rollover: `STDOFF` and `SAVE` (spec.md §4.A "Offset", "Savings period").
pub fn parse_duration_field(text: &str, l: &SourceLocation) -> Result<Time, ParseError> {
    let (sign, hour, minute, second, _total) = parse_clock_magnitude(text, l)?;
    Ok(Time {
        sign,
        hour,
        minute,
        second,
    })
}

/// A time-of-day field that may carry a time-definition suffix and the
/// `24:00` end-of-day special case: `AT` (Rule) and the `until` time
/// column (Zone) (spec.md §4.A "Time-of-day").
pub fn parse_time_of_day(
    text: &str,
    l: &SourceLocation,
) -> Result<(Time, bool, TimeDefinition), ParseError> {
    let (body, suffix) = match text.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&text[..text.len() - 1], Some(c)),
        _ => (text, None),
    };
    let (sign, hour, minute, second, total) = parse_clock_magnitude(body, l)?;
    let time_definition = TimeDefinition::from_suffix(suffix);
    if total == 86_400 {
        return Ok((Time::default(), true, time_definition));
    }
    Ok((
        Time {
            sign,
            hour,
            minute,
            second,
        },
        false,
        time_definition,
    ))
}

/// Parses a savings field into the tagged union spec.md §9 calls for:
/// a fixed duration if it parses as one, otherwise a rule-name reference
/// (spec.md §4.A "savings: try parse as fixed seconds; on failure, treat
/// as rule name reference").
fn parse_zone_savings(text: &str, l: &SourceLocation) -> ZoneSavings {
    if text == "-" {
        return ZoneSavings::Fixed(0);
    }
    match parse_duration_field(text, l) {
        Ok(time) => ZoneSavings::Fixed(time.as_secs()),
        Err(_) => ZoneSavings::RuleName(text.to_string()),
    }
}

/// A single logical Zone-line (the shared tail after `Zone Name`, or a
/// whole continuation line): `stdOffset savings format [until...]`.
fn parse_zone_fields<'a>(
    mut tokens: core::str::SplitWhitespace<'a>,
    l: &SourceLocation,
) -> Result<RawZone, ParseError> {
    let std_offset = parse_duration_field(next_token(&mut tokens, l)?, l)?.as_secs();
    let savings = parse_zone_savings(next_token(&mut tokens, l)?, l);
    let format = next_token(&mut tokens, l)?.to_string();
    let until = match tokens.next() {
        None => None,
        Some(year_text) => {
            let year = parse_i32(year_text, "untilYear", l)?;
            let month = match tokens.next() {
                Some(t) => Month::parse_prefix(t, l)?,
                None => Month::Jan,
            };
            let day = match tokens.next() {
                Some(t) => parse_day_spec(t, l)?,
                None => DaySpec::bare_day(1),
            };
            let (time_of_day, end_of_day, time_definition) = match tokens.next() {
                Some(t) => parse_time_of_day(t, l)?,
                None => (Time::default(), false, TimeDefinition::Wall),
            };
            Some(UntilSpec {
                year,
                month,
                day,
                time_of_day,
                end_of_day,
                time_definition,
            })
        }
    };
    Ok(RawZone {
        standard_offset_seconds: std_offset,
        savings,
        abbreviation_format: format,
        until,
    })
}

/// A Rule line: `Rule Name From To Type In On At Save Letters`
/// (spec.md §4.A "Rule-line parsing"). Requires at least 9 tokens; the
/// `Type` column is consumed and ignored.
fn parse_rule_line(tokens_line: &str, l: &SourceLocation) -> Result<RawRule, CompileError> {
    let tokens: Vec<&str> = tokens_line.split_whitespace().collect();
    if tokens.len() < 9 {
        return Err(ParseError::TooFewFields {
            loc: l.clone(),
            expected_at_least: 9,
            found: tokens.len(),
        }
        .into());
    }
    let name = tokens[1].to_string();
    let start_year = match parse_year(tokens[2], l)? {
        YearBound::Finite(y) => y,
        other => {
            return Err(ParseError::InvalidField {
                loc: l.clone(),
                field: "startYear",
                text: format!("{other:?}"),
            }
            .into())
        }
    };
    let end_year = parse_to_year(tokens[3], start_year, l)?;
    // tokens[4] is the legacy Type column; consumed, ignored.
    let month = Month::parse_prefix(tokens[5], l)?;
    let day = parse_day_spec(tokens[6], l)?;
    let (time_of_day, end_of_day, time_definition) = parse_time_of_day(tokens[7], l)?;
    let savings = parse_duration_field(tokens[8], l)?;

    if YearBound::Finite(start_year) > end_year {
        return Err(SemanticError::StartYearAfterEndYear { rule_name: name }.into());
    }
    if end_of_day && !time_of_day.is_zero() {
        return Err(SemanticError::EndOfDayWithNonMidnightTime { rule_name: name }.into());
    }
    if !day.in_valid_range() {
        return Err(SemanticError::DayOfMonthIndicatorOutOfRange {
            rule_name: name,
            value: i32::from(day.day_of_month_indicator),
        }
        .into());
    }

    Ok(RawRule {
        name,
        start_year: YearBound::Finite(start_year),
        end_year,
        month,
        day,
        time_of_day,
        end_of_day,
        time_definition,
        savings_seconds: savings.as_secs(),
    })
}

/// A Link line: `Link realId aliasId`.
fn parse_link_line(tokens_line: &str, l: &SourceLocation) -> Result<(String, String), ParseError> {
    let mut tokens = tokens_line.split_whitespace();
    let _keyword = next_token(&mut tokens, l)?;
    let real_id = next_token(&mut tokens, l)?.to_string();
    let alias_id = next_token(&mut tokens, l)?.to_string();
    Ok((alias_id, real_id))
}

/// A Leap line: `Leap YYYY Mon DD HH:MM:SS {+|-} {S}`
/// (spec.md §4.A "Leap-line parsing").
fn parse_leap_line(tokens_line: &str, l: &SourceLocation) -> Result<LeapSecondEntry, CompileError> {
    let tokens: Vec<&str> = tokens_line.split_whitespace().collect();
    if tokens.len() < 7 {
        return Err(ParseError::TooFewFields {
            loc: l.clone(),
            expected_at_least: 7,
            found: tokens.len(),
        }
        .into());
    }
    let year = parse_i32(tokens[1], "year", l)?;
    let month = Month::parse_prefix(tokens[2], l)?;
    let day = parse_i8(tokens[3], "day", l)?;
    let (_, hour, minute, second, _total) = parse_clock_magnitude(tokens[4], l)?;
    let sign_token = tokens[5];
    let stationary_token = tokens[6];
    if stationary_token != "S" && stationary_token != "s" {
        return Err(SemanticError::MalformedLeapSecondTime { loc: l.clone() }.into());
    }
    let adjustment = match sign_token {
        "+" if (hour, minute, second) == (23, 59, 60) => LeapAdjustment::Positive,
        "-" if (hour, minute, second) == (23, 59, 59) => LeapAdjustment::Negative,
        _ => return Err(SemanticError::MalformedLeapSecondTime { loc: l.clone() }.into()),
    };
    let epoch_day = crate::utils::epoch_days_for_year_month(year, month as u8) + i64::from(day) - 1;
    Ok(LeapSecondEntry {
        epoch_day,
        adjustment,
    })
}

/// Parses one tzdata source file's text into `model`, tracking the
/// currently-open Zone block across continuation lines.
pub fn parse_source(file_name: &str, text: &str, model: &mut TzDataModel) -> Result<(), CompileError> {
    let mut current_zone: Option<String> = None;
    for (idx, raw_line) in text.lines().enumerate() {
        let line_number = (idx + 1) as u32;
        let line = remove_comment(raw_line);
        if line.trim().is_empty() {
            continue;
        }
        let is_continuation = line.starts_with(' ') || line.starts_with('\t');
        let l = loc(file_name, line_number, raw_line);

        if is_continuation {
            let zone_id = current_zone.clone().ok_or_else(|| {
                CompileError::from(ParseError::UnknownRecordKind { loc: l.clone() })
            })?;
            let zone_line = parse_zone_fields(line.split_whitespace(), &l)?;
            let is_final = zone_line.is_final();
            model.add_zone_line(zone_id.clone(), zone_line);
            if is_final {
                current_zone = None;
            }
            continue;
        }

        // Any non-continuation line closes an open Zone block.
        current_zone = None;

        let mut tokens = line.split_whitespace();
        let keyword = next_token(&mut tokens, &l)?;
        match keyword {
            "Rule" => {
                let rule = parse_rule_line(line, &l)?;
                model.add_rule(rule);
            }
            "Zone" => {
                let zone_id = next_token(&mut tokens, &l)?.to_string();
                let zone_line = parse_zone_fields(tokens, &l)?;
                let is_final = zone_line.is_final();
                model.add_zone_line(zone_id.clone(), zone_line);
                if !is_final {
                    current_zone = Some(zone_id);
                }
            }
            "Link" => {
                let (alias, real) = parse_link_line(line, &l)?;
                model.add_link(alias, real)?;
            }
            "Leap" => {
                let entry = parse_leap_line(line, &l)?;
                model.add_leap_second(entry);
            }
            _ => return Err(ParseError::UnknownRecordKind { loc: l }.into()),
        }
    }
    Ok(())
}
