//! The Rule/Zone Model (component B, spec.md §4.B): a passive container
//! for what the parser produces. No compiling logic lives here — just
//! keyed maps preserving file order, as the teacher's `RuleTable` did
//! before compiling was split out of it.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::types::{DaySpec, Month, TimeDefinition, Time, YearBound};

/// A named recurring DST rule family, one row of a `Rule` record
/// (spec.md §3 `RawRule`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRule {
    pub name: String,
    pub start_year: YearBound,
    pub end_year: YearBound,
    pub month: Month,
    pub day: DaySpec,
    pub time_of_day: Time,
    pub end_of_day: bool,
    pub time_definition: TimeDefinition,
    pub savings_seconds: i64,
}

/// What a Zone line's savings field resolved to (spec.md §3 `RawZone`):
/// either a literal duration or a reference to a named rule family,
/// mutually exclusive per the REDESIGN FLAGS note in §9 ("model as an
/// explicit tagged union").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneSavings {
    Fixed(i64),
    RuleName(String),
}

/// The temporal fields of a Zone line's `until` column, reusing the same
/// month/day/time grammar as a rule (spec.md §4.A "same structure as
/// RawRule's temporal fields").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntilSpec {
    pub year: i32,
    pub month: Month,
    pub day: DaySpec,
    pub time_of_day: Time,
    pub end_of_day: bool,
    pub time_definition: TimeDefinition,
}

/// One line of a multi-line Zone block (spec.md §3 `RawZone`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawZone {
    pub standard_offset_seconds: i64,
    pub savings: ZoneSavings,
    pub abbreviation_format: String,
    pub until: Option<UntilSpec>,
}

impl RawZone {
    /// A zone block is complete once a line with no `until` is seen
    /// (spec.md §4.A "Returns 'zone is complete' iff no untilYear present").
    pub fn is_final(&self) -> bool {
        self.until.is_none()
    }
}

/// `+1` at `23:59:60`, `-1` at `23:59:59`; any other combination is a
/// parse-time `SemanticError` (spec.md §3 `LeapSecondEntry`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeapAdjustment {
    Positive,
    Negative,
}

/// A single leap-second entry: the date it applies to (expressed as a
/// naive epoch-day count, since the time-of-day is implied by the
/// adjustment direction) and the adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeapSecondEntry {
    pub epoch_day: i64,
    pub adjustment: LeapAdjustment,
}

/// Passive container populated by the parser: keyed maps, insertion
/// order preserved within each key (spec.md §4.B). Canonical ordering
/// (by year, or by date for leap entries) is established only at
/// emission time by the components that consume this model.
#[derive(Debug, Default)]
pub struct TzDataModel {
    pub rules: HashMap<String, Vec<RawRule>>,
    pub zones: HashMap<String, Vec<RawZone>>,
    pub links: HashMap<String, String>,
    pub leap_seconds: Vec<LeapSecondEntry>,
}

impl TzDataModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: RawRule) {
        self.rules.entry(rule.name.clone()).or_default().push(rule);
    }

    pub fn add_zone_line(&mut self, zone_id: String, line: RawZone) {
        self.zones.entry(zone_id).or_default().push(line);
    }

    /// Registers one `Link realId aliasId` record. Fails if `aliasId` was
    /// already declared by an earlier Link record in this compile
    /// (spec.md §7 `SemanticError` "duplicate alias").
    pub fn add_link(&mut self, alias: String, real_id: String) -> Result<(), crate::error::SemanticError> {
        if self.links.contains_key(&alias) {
            return Err(crate::error::SemanticError::DuplicateLinkAlias { alias });
        }
        self.links.insert(alias, real_id);
        Ok(())
    }

    pub fn add_leap_second(&mut self, entry: LeapSecondEntry) {
        self.leap_seconds.push(entry);
    }
}
