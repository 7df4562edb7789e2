//! Window Builder (component C, spec.md §4.C). Grounded in spirit on
//! `zoneinfo_rs::zone::ZoneBuildContext` (the idea of running state
//! threaded across a zone's continuation lines) but re-architected into
//! the explicit `Window`/`WindowBuilder` pair the REDESIGN FLAGS in
//! spec.md §9 call for (`WindowEnd::{At, Forever}` as a sum type rather
//! than a boolean/sentinel flag).

use alloc::vec::Vec;

use crate::error::StateError;
use crate::types::{DaySpec, Month, TimeDefinition};
use crate::utils;

/// Upper bound on the number of rule entries a single window may
/// accumulate (spec.md §3 Window invariant (c)).
pub const MAX_RULES_PER_WINDOW: usize = 2000;

/// A window's closing boundary: either a concrete local date-time (with
/// the time-definition needed to resolve it to an instant) or the open
/// "forever" marker (spec.md §9 `WindowEnd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    At(i64, TimeDefinition),
    Forever,
}

impl WindowEnd {
    /// Naive local seconds used purely for ordering windows; `Forever`
    /// sorts after every concrete boundary.
    fn sort_key(&self) -> i64 {
        match self {
            Self::At(naive, _) => *naive,
            Self::Forever => i64::MAX,
        }
    }
}

/// A single year's concrete materialization of a rule (spec.md §4.C
/// "expanded as one concrete yearly occurrence").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOccurrence {
    pub year: i32,
    pub month: Month,
    pub day: DaySpec,
    pub time_of_day: crate::types::Time,
    pub end_of_day: bool,
    pub time_definition: TimeDefinition,
    pub savings_seconds: i64,
}

/// A recurring rule family whose `endYear = MAX` (spec.md glossary
/// "Last-rule"). `start_year` is mutated in place by the tidy pass as
/// historical occurrences are peeled off into the window's ordinary
/// rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastRule {
    pub start_year: i32,
    pub month: Month,
    pub day: DaySpec,
    pub time_of_day: crate::types::Time,
    pub end_of_day: bool,
    pub time_definition: TimeDefinition,
    pub savings_seconds: i64,
}

impl LastRule {
    fn materialize_at(&self, year: i32) -> RuleOccurrence {
        RuleOccurrence {
            year,
            month: self.month,
            day: self.day,
            time_of_day: self.time_of_day,
            end_of_day: self.end_of_day,
            time_definition: self.time_definition,
            savings_seconds: self.savings_seconds,
        }
    }
}

/// Mutually-exclusive rule storage for one window (spec.md §3 Window
/// invariant (b)): unset, a fixed savings amount, or explicit rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowRules {
    Unset,
    Fixed(i64),
    Rules {
        ordinary: Vec<RuleOccurrence>,
        last: Vec<LastRule>,
    },
}

/// An interval of constant standard offset (spec.md §3 `Window`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub standard_offset: i64,
    pub end: WindowEnd,
    pub rules: WindowRules,
}

impl Window {
    fn rules_len(&self) -> usize {
        match &self.rules {
            WindowRules::Rules { ordinary, last } => ordinary.len() + last.len(),
            _ => 0,
        }
    }

    /// Tidy pass (spec.md §4.C), run once per window at the start of
    /// transition compilation, receiving the window's start year
    /// (derived from the running compiler's `loopWindowStart`) and the
    /// region's running `maxLastRuleStartYear`, threaded by the caller
    /// across every window of the region exactly as §4.C/§4.D describe it
    /// as a pair: a bounded window that carries last-rules poisons this
    /// value to `MAX` so a later forever window's `capYear` computation
    /// saturates and drops its own recurring tail entirely (see
    /// DESIGN.md).
    pub fn tidy(
        &mut self,
        window_start_year: i32,
        max_last_rule_start_year: &mut i32,
        zone_name: &str,
    ) -> Result<(), StateError> {
        let (ordinary, last) = match &mut self.rules {
            WindowRules::Rules { ordinary, last } => (ordinary, last),
            _ => {
                if matches!(self.rules, WindowRules::Unset) {
                    self.rules = WindowRules::Fixed(0);
                }
                return Ok(());
            }
        };

        if last.len() == 1 {
            return Err(StateError::SingleLastRule {
                zone: zone_name.into(),
            });
        }

        match self.end {
            WindowEnd::Forever => {
                if !last.is_empty() {
                    let cap_year = (*max_last_rule_start_year).max(window_start_year).saturating_add(1);
                    if cap_year == i32::MAX {
                        // A prior window already poisoned the running cap
                        // (or this one alone pushed it there): the
                        // recurring tail is dropped outright rather than
                        // expanded through to i32::MAX (spec.md §4.C "If
                        // capYear == MAX, clear the last-rule list").
                        last.clear();
                    } else {
                        for rule in last.iter_mut() {
                            let mut year = rule.start_year;
                            while year <= cap_year {
                                ordinary.push(rule.materialize_at(year));
                                year += 1;
                            }
                            rule.start_year = cap_year.saturating_add(1);
                        }
                        *max_last_rule_start_year = cap_year;
                    }
                }
            }
            WindowEnd::At(until_naive, _) => {
                if !last.is_empty() {
                    let until_year = utils::year_for_epoch_days(until_naive.div_euclid(utils::SECONDS_PER_DAY));
                    for rule in last.drain(..) {
                        let mut year = rule.start_year;
                        while year <= until_year.saturating_add(1) {
                            ordinary.push(rule.materialize_at(year));
                            year += 1;
                        }
                    }
                    *max_last_rule_start_year = i32::MAX;
                }
            }
        }

        ordinary.sort_by(|a, b| {
            let a_naive = crate::compiler::materialize_naive(a.year, a.month, a.day, a.time_of_day, a.end_of_day);
            let b_naive = crate::compiler::materialize_naive(b.year, b.month, b.day, b.time_of_day, b.end_of_day);
            (a.year, a.month, a_naive).cmp(&(b.year, b.month, b_naive))
        });
        // Every surviving last-rule shares the same post-expansion
        // `start_year` (spec.md §4.C), so sorting by that alone is a
        // no-op and leaves the list in rule-file insertion order. Sort by
        // the full (year, month, resolved date) key instead, exactly like
        // `ordinary` above, so the compiler threads `loopSavings` through
        // the last-rules in calendar order rather than file order.
        last.sort_by(|a, b| {
            let a_naive = crate::compiler::materialize_naive(a.start_year, a.month, a.day, a.time_of_day, a.end_of_day);
            let b_naive = crate::compiler::materialize_naive(b.start_year, b.month, b.day, b.time_of_day, b.end_of_day);
            (a.start_year, a.month, a_naive).cmp(&(b.start_year, b.month, b_naive))
        });

        if matches!(&self.rules, WindowRules::Rules { ordinary, last } if ordinary.is_empty() && last.is_empty())
        {
            self.rules = WindowRules::Fixed(0);
        }
        Ok(())
    }
}

/// Accepts standard-offset windows, fixed savings, and recurring rules
/// for one region, enforcing the ordering and mutual-exclusivity
/// invariants of spec.md §4.C as each operation is applied.
#[derive(Debug, Default)]
pub struct WindowBuilder {
    pub windows: Vec<Window>,
    zone_name: alloc::string::String,
}

impl WindowBuilder {
    pub fn new(zone_name: impl Into<alloc::string::String>) -> Self {
        Self {
            windows: Vec::new(),
            zone_name: zone_name.into(),
        }
    }

    fn last_until_sort_key(&self) -> i64 {
        self.windows.last().map(|w| w.end.sort_key()).unwrap_or(i64::MIN)
    }

    pub fn add_window(
        &mut self,
        standard_offset: i64,
        until_naive: i64,
        until_time_definition: TimeDefinition,
    ) -> Result<(), StateError> {
        let end = WindowEnd::At(until_naive, until_time_definition);
        if end.sort_key() <= self.last_until_sort_key() {
            return Err(StateError::WindowOrderingViolated {
                zone: self.zone_name.clone(),
            });
        }
        self.windows.push(Window {
            standard_offset,
            end,
            rules: WindowRules::Unset,
        });
        Ok(())
    }

    pub fn add_window_forever(&mut self, standard_offset: i64) -> Result<(), StateError> {
        if self.windows.iter().any(|w| w.end == WindowEnd::Forever) {
            return Err(StateError::DuplicateForeverWindow {
                zone: self.zone_name.clone(),
            });
        }
        if i64::MAX <= self.last_until_sort_key() {
            return Err(StateError::WindowOrderingViolated {
                zone: self.zone_name.clone(),
            });
        }
        self.windows.push(Window {
            standard_offset,
            end: WindowEnd::Forever,
            rules: WindowRules::Unset,
        });
        Ok(())
    }

    fn current_mut(&mut self) -> &mut Window {
        self.windows
            .last_mut()
            .expect("add_window/add_window_forever must be called before setting rules")
    }

    pub fn set_fixed_savings_to_window(&mut self, seconds: i64) -> Result<(), StateError> {
        let zone_name = self.zone_name.clone();
        let window = self.current_mut();
        if matches!(&window.rules, WindowRules::Rules { ordinary, last } if !ordinary.is_empty() || !last.is_empty())
        {
            return Err(StateError::MixedFixedAndRules { zone: zone_name });
        }
        window.rules = WindowRules::Fixed(seconds);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_rule_to_window(
        &mut self,
        start_year: i32,
        end_year: crate::types::YearBound,
        month: Month,
        day: DaySpec,
        time_of_day: crate::types::Time,
        end_of_day: bool,
        time_definition: TimeDefinition,
        savings_seconds: i64,
    ) -> Result<(), StateError> {
        debug_assert!(day.in_valid_range(), "day spec range is validated at parse time");
        let zone_name = self.zone_name.clone();
        let window = self.current_mut();
        if matches!(window.rules, WindowRules::Fixed(_)) {
            return Err(StateError::MixedFixedAndRules { zone: zone_name });
        }
        if !matches!(window.rules, WindowRules::Rules { .. }) {
            window.rules = WindowRules::Rules {
                ordinary: Vec::new(),
                last: Vec::new(),
            };
        }
        let (ordinary, last) = match &mut window.rules {
            WindowRules::Rules { ordinary, last } => (ordinary, last),
            _ => unreachable!(),
        };

        if end_year == crate::types::YearBound::Max {
            if ordinary.len() + last.len() + 1 > MAX_RULES_PER_WINDOW {
                return Err(StateError::TooManyRulesInWindow {
                    zone: zone_name,
                    limit: MAX_RULES_PER_WINDOW,
                });
            }
            last.push(LastRule {
                start_year,
                month,
                day,
                time_of_day,
                end_of_day,
                time_definition,
                savings_seconds,
            });
            return Ok(());
        }

        let end_year_value = end_year.as_i32();
        let span = (end_year_value - start_year + 1).max(0) as usize;
        if ordinary.len() + last.len() + span > MAX_RULES_PER_WINDOW {
            return Err(StateError::TooManyRulesInWindow {
                zone: zone_name,
                limit: MAX_RULES_PER_WINDOW,
            });
        }
        for year in start_year..=end_year_value {
            ordinary.push(RuleOccurrence {
                year,
                month,
                day,
                time_of_day,
                end_of_day,
                time_definition,
                savings_seconds,
            });
        }
        Ok(())
    }
}
