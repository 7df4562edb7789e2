//! Transition Compiler (component D, spec.md §4.D): consumes the windows
//! built by [`crate::window`] and produces the instant/offset history and
//! recurring tail described by spec.md §3 (`Transition`, `TransitionRule`,
//! `ZoneRules`).
//!
//! Grounded loosely on `zoneinfo_rs::compiler` (`Transition`,
//! `CompiledTransitions`) and `zoneinfo_rs::zone::ZoneRecord::compile`'s
//! per-window loop, but the actual algorithm below follows spec.md §4.D's
//! pipeline precisely rather than the teacher's; see DESIGN.md for the one
//! open-question resolution this module makes (treating `loopWindowStart`/
//! `loopWindowOffset` as an absolute instant and offset, not a naive local
//! reading, across the per-window loop).

use alloc::vec::Vec;

use crate::dedup::Deduplicator;
use crate::error::StateError;
use crate::types::{DaySpec, Month, TimeDefinition, Time, WeekDay};
use crate::utils;
use crate::window::{Window, WindowEnd, WindowRules};

/// Hard cap on a region's recurring tail (spec.md §3 `TransitionRule`,
/// "At most 15 per region"; §4.F.1 "u8 lastRuleCount ≤ 15").
pub const MAX_LAST_TRANSITION_RULES: usize = 15;

/// A single discrete offset change (spec.md §3 `Transition`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Transition {
    pub epoch_second: i64,
    pub offset_before: i64,
    pub offset_after: i64,
}

/// The recurring tail that describes transitions past the last historical
/// one (spec.md §3 `TransitionRule`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionRule {
    pub month: Month,
    pub day_of_month_indicator: i8,
    pub day_of_week: Option<WeekDay>,
    pub time_of_day: Time,
    pub end_of_day: bool,
    pub time_definition: TimeDefinition,
    pub standard_offset: i64,
    pub offset_before: i64,
    pub offset_after: i64,
}

/// A compiled region's full offset history (spec.md §3 `ZoneRules`).
/// `standard_transitions`/`wall_transitions` are the historical instant
/// lists; the `initial_*_offset` fields are the offset in force before
/// the first transition of each list (needed because §4.F.1's wire
/// format stores `count+1` offsets for `count` transitions).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneRules {
    pub initial_standard_offset: i64,
    pub standard_transitions: Vec<Transition>,
    pub initial_wall_offset: i64,
    pub wall_transitions: Vec<Transition>,
    pub last_rules: Vec<TransitionRule>,
}

/// Resolves a [`DaySpec`] to an epoch-day count for the given year/month
/// (spec.md §4.D "Resolve the cutover date"), using the stored
/// `adjust_forwards` direction rather than re-deriving a direction from
/// the sign of `day_of_month_indicator` (see DESIGN.md).
fn resolve_epoch_days(year: i32, month: Month, day: DaySpec) -> i64 {
    let month_num = month as u8;
    let month_length = i32::from(utils::days_in_month(month_num, year));
    let start_day = if day.day_of_month_indicator < 0 {
        month_length + 1 + i32::from(day.day_of_month_indicator)
    } else {
        i32::from(day.day_of_month_indicator)
    };
    let month_start = utils::epoch_days_for_year_month(year, month_num);
    let mut offset = i64::from(start_day - 1);
    if let Some(weekday) = day.day_of_week {
        loop {
            let candidate = month_start + offset;
            if utils::epoch_days_to_week_day(candidate) == weekday as u8 {
                break;
            }
            offset += if day.adjust_forwards { 1 } else { -1 };
        }
    }
    month_start + offset
}

/// Combines a resolved date with a time-of-day into a naive (offset-free)
/// reading expressed as seconds since the epoch, as if that reading were
/// already UTC. [`TimeDefinition::resolve`] turns this into an actual
/// instant.
pub fn materialize_naive(year: i32, month: Month, day: DaySpec, time: Time, end_of_day: bool) -> i64 {
    let mut epoch_days = resolve_epoch_days(year, month, day);
    if end_of_day {
        epoch_days += 1;
    }
    utils::epoch_seconds_for_epoch_days(epoch_days) + time.as_secs()
}

/// spec.md §4.D "Materializing a last-rule → TransitionRule": the two
/// normalizations applied to the raw month/day/time so the recurring
/// form stays correct across leap years and doesn't need re-deriving a
/// concrete year.
fn normalize_last_rule_day(month: Month, mut day: DaySpec, mut end_of_day: bool) -> (DaySpec, bool) {
    if day.day_of_month_indicator < 0 && month != Month::Feb {
        let month_max_length = i32::from(utils::days_in_month(month as u8, 2001));
        day.day_of_month_indicator = (month_max_length - 6) as i8;
        day.adjust_forwards = true;
    }
    let is_feb_28 = month == Month::Feb && day.day_of_month_indicator == 28;
    if end_of_day && day.day_of_month_indicator > 0 && !is_feb_28 {
        day.day_of_month_indicator += 1;
        if let Some(weekday) = day.day_of_week {
            day.day_of_week = Some(WeekDay::from_number((weekday as u8 + 1) % 7).expect("mod 7 is in range"));
        }
        end_of_day = false;
    }
    (day, end_of_day)
}

fn window_end_instant(window: &Window, loop_savings: i64) -> i64 {
    match window.end {
        WindowEnd::Forever => i64::MAX,
        WindowEnd::At(until_naive, until_def) => {
            until_def.resolve(until_naive, window.standard_offset, loop_savings)
        }
    }
}

/// spec.md §4.D step 2: the savings value in effect at the moment the
/// window begins.
fn effective_entry_savings(window: &Window, window_start_instant: i64) -> i64 {
    match &window.rules {
        WindowRules::Fixed(savings) => *savings,
        WindowRules::Unset => 0,
        WindowRules::Rules { ordinary, .. } => {
            let mut running_savings = 0i64;
            let mut result = 0i64;
            for occ in ordinary {
                let naive = materialize_naive(occ.year, occ.month, occ.day, occ.time_of_day, occ.end_of_day);
                let instant = occ.time_definition.resolve(naive, window.standard_offset, running_savings);
                if instant <= window_start_instant {
                    running_savings = occ.savings_seconds;
                    result = occ.savings_seconds;
                }
            }
            result
        }
    }
}

/// Runs the pipeline of spec.md §4.D over an already-built, ordered list
/// of windows (the last of which must be the "forever" window) and
/// returns the compiled offset history for one region. `dedup` is the
/// process-scoped Deduplicator (spec.md §4.E, "injected into B-F"): every
/// offset, transition and transition-rule this pipeline emits is interned
/// through it before being copied into the returned `ZoneRules`, so
/// value-equal instances collapse to one canonical allocation across the
/// whole compile.
pub fn compile_region(windows: &mut [Window], zone_name: &str, dedup: &mut Deduplicator) -> Result<ZoneRules, StateError> {
    if windows.is_empty() {
        return Err(StateError::NoWindows { zone: zone_name.into() });
    }

    let mut loop_standard_offset = windows[0].standard_offset;
    let mut loop_savings = match windows[0].rules {
        WindowRules::Fixed(s) => s,
        _ => 0,
    };
    let mut loop_window_start = i64::MIN;
    let mut loop_window_offset = loop_standard_offset + loop_savings;

    let mut standard_transitions = Vec::new();
    let mut wall_transitions = Vec::new();
    let mut last_transition_rules = Vec::new();
    let initial_standard_offset = *dedup.dedup_offset(loop_standard_offset);
    let initial_wall_offset = *dedup.dedup_offset(loop_window_offset);

    let window_count = windows.len();
    let mut max_last_rule_start_year = i32::MIN;
    for (index, window) in windows.iter_mut().enumerate() {
        let window_start_year = utils::year_for_epoch_days(
            loop_window_start.div_euclid(utils::SECONDS_PER_DAY).clamp(
                utils::epoch_days_for_year(i32::MIN + 1),
                utils::epoch_days_for_year(i32::MAX - 1),
            ),
        );
        window.tidy(window_start_year, &mut max_last_rule_start_year, zone_name)?;

        let effective_savings = effective_entry_savings(window, loop_window_start);

        if loop_standard_offset != window.standard_offset {
            standard_transitions.push(*dedup.dedup_transition(Transition {
                epoch_second: loop_window_start,
                offset_before: *dedup.dedup_offset(loop_standard_offset),
                offset_after: *dedup.dedup_offset(window.standard_offset),
            }));
            loop_standard_offset = window.standard_offset;
        }

        let effective_wall_offset = loop_standard_offset + effective_savings;
        if effective_wall_offset != loop_window_offset {
            wall_transitions.push(*dedup.dedup_transition(Transition {
                epoch_second: loop_window_start,
                offset_before: *dedup.dedup_offset(loop_window_offset),
                offset_after: *dedup.dedup_offset(effective_wall_offset),
            }));
        }

        loop_savings = effective_savings;

        if let WindowRules::Rules { ordinary, last } = &window.rules {
            for occ in ordinary {
                let naive = materialize_naive(occ.year, occ.month, occ.day, occ.time_of_day, occ.end_of_day);
                let instant = occ.time_definition.resolve(naive, window.standard_offset, loop_savings);
                let window_end = window_end_instant(window, loop_savings);
                let offset_before = window.standard_offset + loop_savings;
                let offset_after = window.standard_offset + occ.savings_seconds;
                if instant >= loop_window_start && instant < window_end && offset_before != offset_after {
                    wall_transitions.push(*dedup.dedup_transition(Transition {
                        epoch_second: instant,
                        offset_before: *dedup.dedup_offset(offset_before),
                        offset_after: *dedup.dedup_offset(offset_after),
                    }));
                    loop_savings = occ.savings_seconds;
                }
            }

            for rule in last {
                let (day, end_of_day) = normalize_last_rule_day(rule.month, rule.day, rule.end_of_day);
                let offset_before = window.standard_offset + loop_savings;
                let offset_after = window.standard_offset + rule.savings_seconds;
                last_transition_rules.push(*dedup.dedup_transition_rule(TransitionRule {
                    month: rule.month,
                    day_of_month_indicator: day.day_of_month_indicator,
                    day_of_week: day.day_of_week,
                    time_of_day: rule.time_of_day,
                    end_of_day,
                    time_definition: rule.time_definition,
                    standard_offset: *dedup.dedup_offset(window.standard_offset),
                    offset_before: *dedup.dedup_offset(offset_before),
                    offset_after: *dedup.dedup_offset(offset_after),
                }));
                loop_savings = rule.savings_seconds;
                if last_transition_rules.len() > MAX_LAST_TRANSITION_RULES {
                    return Err(StateError::TooManyLastTransitionRules {
                        zone: zone_name.into(),
                        count: last_transition_rules.len(),
                    });
                }
            }
        }

        loop_window_offset = window.standard_offset + loop_savings;
        if index + 1 < window_count {
            loop_window_start = window_end_instant(window, loop_savings);
        }
    }

    Ok(ZoneRules {
        initial_standard_offset,
        standard_transitions,
        initial_wall_offset,
        wall_transitions,
        last_rules: last_transition_rules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sign, YearBound};
    use crate::window::WindowBuilder;

    fn at(hour: u32, minute: u32) -> Time {
        Time {
            sign: Sign::Positive,
            hour,
            minute,
            second: 0,
        }
    }

    /// Scenario 1 (spec.md §8): single cutover from +01:00 to +02:00.
    #[test]
    fn single_cutover_emits_standard_and_wall_transition_together() {
        let mut builder = WindowBuilder::new("Test/Single");
        let until_naive = materialize_naive(1950, Month::Jan, DaySpec::bare_day(1), at(1, 0), false);
        builder.add_window(3600, until_naive, TimeDefinition::Standard).unwrap();
        builder.set_fixed_savings_to_window(0).unwrap();
        builder.add_window_forever(7200).unwrap();
        builder.set_fixed_savings_to_window(0).unwrap();

        let mut dedup = Deduplicator::new();
        let rules = compile_region(&mut builder.windows, "Test/Single", &mut dedup).unwrap();
        assert_eq!(rules.standard_transitions.len(), 1);
        assert_eq!(rules.standard_transitions[0].offset_before, 3600);
        assert_eq!(rules.standard_transitions[0].offset_after, 7200);
        assert_eq!(rules.wall_transitions.len(), 1);
        assert_eq!(rules.wall_transitions[0].epoch_second, rules.standard_transitions[0].epoch_second);
    }

    /// Scenario 4 (spec.md §8): end-of-day rollover rewrites the last-rule
    /// cutover to the following day at 00:00.
    #[test]
    fn end_of_day_last_rule_advances_to_next_day() {
        let day = DaySpec::last(WeekDay::Thu);
        let (normalized, end_of_day) = normalize_last_rule_day(Month::Mar, day, true);
        assert!(!end_of_day);
        assert_eq!(normalized.day_of_week, Some(WeekDay::Fri));
        assert!(normalized.day_of_month_indicator > 0);
    }

    #[test]
    fn last_sunday_resolves_to_final_sunday_of_march() {
        // March 2008: last Sunday is the 30th.
        let days = resolve_epoch_days(2008, Month::Mar, DaySpec::last(WeekDay::Sun));
        assert_eq!(utils::year_for_epoch_days(days), 2008);
        let month_start = utils::epoch_days_for_year_month(2008, 3);
        assert_eq!(days - month_start + 1, 30);
    }

    #[test]
    fn on_or_after_and_on_or_before_semantics() {
        let ge = resolve_epoch_days(2025, Month::Mar, DaySpec::on_or_after(WeekDay::Sat, 25));
        let le = resolve_epoch_days(2025, Month::Mar, DaySpec::on_or_before(WeekDay::Sat, 29));
        assert_eq!(ge, le);
    }

    /// Scenario 2 (spec.md §8): Europe/London-style recurring last-rules.
    #[test]
    fn recurring_last_rules_produce_gap_and_overlap_tail() {
        let mut builder = WindowBuilder::new("Test/London");
        builder.add_window_forever(0).unwrap();
        builder
            .add_rule_to_window(
                1996,
                YearBound::Max,
                Month::Mar,
                DaySpec::last(WeekDay::Sun),
                at(1, 0),
                false,
                TimeDefinition::Wall,
                3600,
            )
            .unwrap();
        builder
            .add_rule_to_window(
                1996,
                YearBound::Max,
                Month::Oct,
                DaySpec::last(WeekDay::Sun),
                at(1, 0),
                false,
                TimeDefinition::Wall,
                0,
            )
            .unwrap();
        let mut dedup = Deduplicator::new();
        let rules = compile_region(&mut builder.windows, "Test/London", &mut dedup).unwrap();
        assert_eq!(rules.last_rules.len(), 2);
        let spring = rules.last_rules.iter().find(|r| r.month == Month::Mar).unwrap();
        assert_eq!(spring.offset_before, 0);
        assert_eq!(spring.offset_after, 3600);
        let autumn = rules.last_rules.iter().find(|r| r.month == Month::Oct).unwrap();
        assert_eq!(autumn.offset_before, 3600);
        assert_eq!(autumn.offset_after, 0);
    }

    /// spec.md §3/§4.F.1: a region whose recurring tail grows past 15
    /// entries must fail the compile rather than silently truncate at
    /// the encoder (`u8 lastRuleCount`).
    #[test]
    fn more_than_fifteen_last_rules_is_rejected() {
        let mut builder = WindowBuilder::new("Test/TooManyLastRules");
        builder.add_window_forever(0).unwrap();
        let months = [
            Month::Jan, Month::Feb, Month::Mar, Month::Apr, Month::May, Month::Jun, Month::Jul, Month::Aug,
            Month::Sep, Month::Oct, Month::Nov, Month::Dec,
        ];
        for i in 0..16 {
            let month = months[i % months.len()];
            let day = 1 + (i / months.len()) as i8;
            builder
                .add_rule_to_window(
                    2000,
                    YearBound::Max,
                    month,
                    DaySpec::bare_day(day),
                    at(0, 0),
                    false,
                    TimeDefinition::Wall,
                    if i % 2 == 0 { 3600 } else { 0 },
                )
                .unwrap();
        }
        let mut dedup = Deduplicator::new();
        assert!(compile_region(&mut builder.windows, "Test/TooManyLastRules", &mut dedup).is_err());
    }
}
