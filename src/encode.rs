//! Binary Catalog Encoder/Decoder (component F, spec.md §4.F): writes the
//! tzdb catalog stream and, for round-trip testing, reads it back. The
//! cursor/`read_exact` shape is grounded on
//! `astrolabe::local::cursor::Cursor` and `astrolabe::local::header::Header`
//! (both hand-roll big-endian framing with `from_be_bytes`/`to_be_bytes`
//! rather than pulling in a byte-order crate); this module follows the same
//! convention on the write side.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::compiler::{Transition, TransitionRule, ZoneRules};
use crate::types::{Month, TimeDefinition, WeekDay};

const FORMAT_VERSION: u8 = 1;
const MAGIC: &str = "TZDB";

/// Lower bound / upper bound of the `epochSec-packed` short form, and the
/// byte that marks the escape to the long form (spec.md §4.F.2).
const EPOCH_PACKED_MIN: i64 = -4_575_744_000;
const EPOCH_PACKED_MAX_EXCLUSIVE: i64 = 10_413_792_000;
const EPOCH_PACKED_ESCAPE: u8 = 0xFF;
const OFFSET_PACKED_ESCAPE: u8 = 0x7F;

/// A consumer-side framing failure (spec.md §4.F "A corrupt tag or magic
/// triggers a consumer-side format error"). Kept separate from
/// [`crate::error::CompileError`]: decoding is a downstream concern, not
/// part of the compiler's own fallible surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    UnexpectedEof,
    BadMagic,
    UnsupportedFormatVersion(u8),
    InvalidUtf8,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of catalog stream"),
            Self::BadMagic => write!(f, "catalog stream does not start with the TZDB magic"),
            Self::UnsupportedFormatVersion(v) => write!(f, "unsupported catalog format version {v}"),
            Self::InvalidUtf8 => write!(f, "catalog stream contains invalid UTF-8"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// One version's region-id → rule-blob-index mapping (spec.md §4.F's
/// per-version table), keeping the encoder and driver decoupled: the
/// driver hands this shape to [`encode_catalog`] without needing to know
/// the wire layout.
#[derive(Debug, Clone)]
pub struct VersionEntry {
    pub label: String,
    /// `(region id, index into the rule blob table)`, already resolved
    /// against the shared `regionId`/blob tables.
    pub regions: Vec<(String, u16)>,
}

fn write_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn write_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn write_utf(out: &mut Vec<u8>, s: &str) {
    write_u16(out, s.len() as u16);
    out.extend_from_slice(s.as_bytes());
}

/// spec.md §4.F.2 offset-packed encoding.
fn write_offset_packed(out: &mut Vec<u8>, secs: i64) {
    if secs % 900 == 0 {
        let units = secs / 900;
        if (-128..=126).contains(&units) {
            out.push(units as i8 as u8);
            return;
        }
    }
    out.push(OFFSET_PACKED_ESCAPE);
    write_i32(out, secs as i32);
}

/// spec.md §4.F.2 epochSec-packed encoding.
fn write_epoch_sec_packed(out: &mut Vec<u8>, secs: i64) {
    if secs >= EPOCH_PACKED_MIN && secs < EPOCH_PACKED_MAX_EXCLUSIVE && secs % 900 == 0 {
        let n = ((secs - EPOCH_PACKED_MIN) / 900) as u32;
        let bytes = n.to_be_bytes();
        debug_assert_eq!(bytes[0], 0, "epochSec-packed short form must fit in 24 bits");
        if bytes[1] != EPOCH_PACKED_ESCAPE {
            out.push(bytes[1]);
            out.push(bytes[2]);
            out.push(bytes[3]);
            return;
        }
    }
    out.push(EPOCH_PACKED_ESCAPE);
    out.extend_from_slice(&secs.to_be_bytes());
}

fn write_transition_rule(out: &mut Vec<u8>, rule: &TransitionRule) {
    out.push(rule.month as u8);
    out.push(rule.day_of_month_indicator as u8);
    out.push(rule.day_of_week.map_or(0, |w| w as u8 + 1));
    write_offset_packed(out, rule.time_of_day.as_secs());
    out.push(u8::from(rule.end_of_day));
    out.push(rule.time_definition.as_u2());
    write_offset_packed(out, rule.standard_offset);
    write_offset_packed(out, rule.offset_before);
    write_offset_packed(out, rule.offset_after);
}

/// spec.md §4.F.1: encodes one region's compiled offset history.
pub fn encode_zone_rules(rules: &ZoneRules) -> Vec<u8> {
    let mut out = Vec::new();

    write_i32(&mut out, rules.standard_transitions.len() as i32);
    for t in &rules.standard_transitions {
        write_epoch_sec_packed(&mut out, t.epoch_second);
    }
    write_offset_packed(&mut out, rules.initial_standard_offset);
    for t in &rules.standard_transitions {
        write_offset_packed(&mut out, t.offset_after);
    }

    write_i32(&mut out, rules.wall_transitions.len() as i32);
    for t in &rules.wall_transitions {
        write_epoch_sec_packed(&mut out, t.epoch_second);
    }
    write_offset_packed(&mut out, rules.initial_wall_offset);
    for t in &rules.wall_transitions {
        write_offset_packed(&mut out, t.offset_after);
    }

    debug_assert!(rules.last_rules.len() <= crate::compiler::MAX_LAST_TRANSITION_RULES);
    out.push(rules.last_rules.len() as u8);
    for rule in &rules.last_rules {
        write_transition_rule(&mut out, rule);
    }

    out
}

/// spec.md §4.F: assembles the whole catalog stream from the already
/// deduplicated region and rule-blob tables.
pub fn encode_catalog(versions: &[VersionEntry], region_ids: &[String], rule_blobs: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(FORMAT_VERSION);
    write_utf(&mut out, MAGIC);

    write_u16(&mut out, versions.len() as u16);
    for v in versions {
        write_utf(&mut out, &v.label);
    }

    write_u16(&mut out, region_ids.len() as u16);
    for id in region_ids {
        write_utf(&mut out, id);
    }

    write_u16(&mut out, rule_blobs.len() as u16);
    for blob in rule_blobs {
        write_u16(&mut out, blob.len() as u16);
        out.extend_from_slice(blob);
    }

    for v in versions {
        write_u16(&mut out, v.regions.len() as u16);
        for (region_id, rule_index) in &v.regions {
            let region_index = region_ids
                .iter()
                .position(|id| id == region_id)
                .expect("region id must be present in the shared region table") as u16;
            write_u16(&mut out, region_index);
            write_u16(&mut out, *rule_index);
        }
    }

    out
}

/// Cursor over an in-memory catalog stream, mirroring
/// `astrolabe::local::cursor::Cursor`'s `read_exact` shape.
struct Cursor<'a> {
    remaining: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { remaining: bytes }
    }

    fn read_exact(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining.len() < len {
            return Err(DecodeError::UnexpectedEof);
        }
        let (data, rest) = self.remaining.split_at(len);
        self.remaining = rest;
        Ok(data)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_exact(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_exact(2)?.try_into().expect("len checked above")))
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_exact(4)?.try_into().expect("len checked above")))
    }

    fn read_utf(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_exact(len)?;
        core::str::from_utf8(bytes)
            .map(String::from)
            .map_err(|_| DecodeError::InvalidUtf8)
    }

    fn read_offset_packed(&mut self) -> Result<i64, DecodeError> {
        let first = self.read_u8()?;
        if first == OFFSET_PACKED_ESCAPE {
            Ok(i64::from(self.read_i32()?))
        } else {
            Ok(i64::from(first as i8) * 900)
        }
    }

    fn read_epoch_sec_packed(&mut self) -> Result<i64, DecodeError> {
        let first = self.read_u8()?;
        if first == EPOCH_PACKED_ESCAPE {
            Ok(i64::from_be_bytes(self.read_exact(8)?.try_into().expect("len checked above")))
        } else {
            let rest = self.read_exact(2)?;
            let n = u32::from_be_bytes([0, first, rest[0], rest[1]]);
            Ok(EPOCH_PACKED_MIN + i64::from(n) * 900)
        }
    }

    fn read_transition_rule(&mut self) -> Result<TransitionRule, DecodeError> {
        let month_byte = self.read_u8()?;
        let month = Month::from_number(month_byte).ok_or(DecodeError::UnsupportedFormatVersion(month_byte))?;
        let day_of_month_indicator = self.read_u8()? as i8;
        let day_of_week_byte = self.read_u8()?;
        let day_of_week = if day_of_week_byte == 0 {
            None
        } else {
            Some(WeekDay::from_number(day_of_week_byte - 1).ok_or(DecodeError::UnsupportedFormatVersion(day_of_week_byte))?)
        };
        let time_secs = self.read_offset_packed()?;
        let end_of_day = self.read_u8()? != 0;
        let time_definition_byte = self.read_u8()?;
        let time_definition =
            TimeDefinition::from_u2(time_definition_byte).ok_or(DecodeError::UnsupportedFormatVersion(time_definition_byte))?;
        let standard_offset = self.read_offset_packed()?;
        let offset_before = self.read_offset_packed()?;
        let offset_after = self.read_offset_packed()?;
        Ok(TransitionRule {
            month,
            day_of_month_indicator,
            day_of_week,
            time_of_day: crate::types::Time::from_secs(time_secs),
            end_of_day,
            time_definition,
            standard_offset,
            offset_before,
            offset_after,
        })
    }
}

/// Decodes one `ZoneRules` blob (the inverse of [`encode_zone_rules`]),
/// used by the round-trip property tests.
pub fn decode_zone_rules(bytes: &[u8]) -> Result<ZoneRules, DecodeError> {
    let mut cursor = Cursor::new(bytes);

    let std_count = cursor.read_i32()? as usize;
    let mut std_instants = Vec::with_capacity(std_count);
    for _ in 0..std_count {
        std_instants.push(cursor.read_epoch_sec_packed()?);
    }
    let mut standard_offsets = Vec::with_capacity(std_count + 1);
    for _ in 0..=std_count {
        standard_offsets.push(cursor.read_offset_packed()?);
    }
    let initial_standard_offset = standard_offsets[0];
    let mut standard_transitions = Vec::with_capacity(std_count);
    for i in 0..std_count {
        standard_transitions.push(Transition {
            epoch_second: std_instants[i],
            offset_before: standard_offsets[i],
            offset_after: standard_offsets[i + 1],
        });
    }

    let wall_count = cursor.read_i32()? as usize;
    let mut wall_instants = Vec::with_capacity(wall_count);
    for _ in 0..wall_count {
        wall_instants.push(cursor.read_epoch_sec_packed()?);
    }
    let mut wall_offsets = Vec::with_capacity(wall_count + 1);
    for _ in 0..=wall_count {
        wall_offsets.push(cursor.read_offset_packed()?);
    }
    let initial_wall_offset = wall_offsets[0];
    let mut wall_transitions = Vec::with_capacity(wall_count);
    for i in 0..wall_count {
        wall_transitions.push(Transition {
            epoch_second: wall_instants[i],
            offset_before: wall_offsets[i],
            offset_after: wall_offsets[i + 1],
        });
    }

    let last_rule_count = cursor.read_u8()? as usize;
    let mut last_rules = Vec::with_capacity(last_rule_count);
    for _ in 0..last_rule_count {
        last_rules.push(cursor.read_transition_rule()?);
    }

    Ok(ZoneRules {
        initial_standard_offset,
        standard_transitions,
        initial_wall_offset,
        wall_transitions,
        last_rules,
    })
}

/// Decoded form of [`encode_catalog`]'s output, for round-trip tests.
#[derive(Debug, Clone)]
pub struct DecodedCatalog {
    pub version_labels: Vec<String>,
    pub region_ids: Vec<String>,
    pub rule_blobs: Vec<Vec<u8>>,
    pub versions: Vec<VersionEntry>,
}

pub fn decode_catalog(bytes: &[u8]) -> Result<DecodedCatalog, DecodeError> {
    let mut cursor = Cursor::new(bytes);

    let format_version = cursor.read_u8()?;
    if format_version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedFormatVersion(format_version));
    }
    let magic = cursor.read_utf()?;
    if magic != MAGIC {
        return Err(DecodeError::BadMagic);
    }

    let version_count = cursor.read_u16()? as usize;
    let mut version_labels = Vec::with_capacity(version_count);
    for _ in 0..version_count {
        version_labels.push(cursor.read_utf()?);
    }

    let region_count = cursor.read_u16()? as usize;
    let mut region_ids = Vec::with_capacity(region_count);
    for _ in 0..region_count {
        region_ids.push(cursor.read_utf()?);
    }

    let blob_count = cursor.read_u16()? as usize;
    let mut rule_blobs = Vec::with_capacity(blob_count);
    for _ in 0..blob_count {
        let len = cursor.read_u16()? as usize;
        rule_blobs.push(cursor.read_exact(len)?.to_vec());
    }

    let mut versions = Vec::with_capacity(version_count);
    for label in version_labels.iter().cloned() {
        let pair_count = cursor.read_u16()? as usize;
        let mut regions = Vec::with_capacity(pair_count);
        for _ in 0..pair_count {
            let region_index = cursor.read_u16()?;
            let rule_index = cursor.read_u16()?;
            let region_id = region_ids
                .get(region_index as usize)
                .cloned()
                .unwrap_or_else(|| format!("<bad region index {region_index}>"));
            regions.push((region_id, rule_index));
        }
        versions.push(VersionEntry { label, regions });
    }

    Ok(DecodedCatalog {
        version_labels,
        region_ids,
        rule_blobs,
        versions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sign, Time};

    fn time(hour: u32) -> Time {
        Time {
            sign: Sign::Positive,
            hour,
            minute: 0,
            second: 0,
        }
    }

    #[test]
    fn offset_packed_round_trips_multiples_of_900() {
        for secs in [-3600i64, 0, 900, 3600, -900 * 100] {
            let mut out = Vec::new();
            write_offset_packed(&mut out, secs);
            let mut cursor = Cursor::new(&out);
            assert_eq!(cursor.read_offset_packed().unwrap(), secs);
        }
    }

    #[test]
    fn offset_packed_falls_back_to_escape_for_non_multiples() {
        let mut out = Vec::new();
        write_offset_packed(&mut out, 1234);
        assert_eq!(out[0], OFFSET_PACKED_ESCAPE);
        let mut cursor = Cursor::new(&out);
        assert_eq!(cursor.read_offset_packed().unwrap(), 1234);
    }

    #[test]
    fn epoch_sec_packed_round_trips_in_range() {
        for secs in [0i64, 915_148_800, -2_208_988_800] {
            let mut out = Vec::new();
            write_epoch_sec_packed(&mut out, secs);
            let mut cursor = Cursor::new(&out);
            assert_eq!(cursor.read_epoch_sec_packed().unwrap(), secs);
        }
    }

    #[test]
    fn epoch_sec_packed_falls_back_outside_range() {
        let mut out = Vec::new();
        write_epoch_sec_packed(&mut out, i64::MAX);
        assert_eq!(out[0], EPOCH_PACKED_ESCAPE);
        let mut cursor = Cursor::new(&out);
        assert_eq!(cursor.read_epoch_sec_packed().unwrap(), i64::MAX);
    }

    #[test]
    fn zone_rules_round_trip_through_encode_decode() {
        let rules = ZoneRules {
            initial_standard_offset: 3600,
            standard_transitions: alloc::vec![Transition {
                epoch_second: 915_148_800,
                offset_before: 3600,
                offset_after: 7200,
            }],
            initial_wall_offset: 3600,
            wall_transitions: Vec::new(),
            last_rules: alloc::vec![TransitionRule {
                month: Month::Mar,
                day_of_month_indicator: 25,
                day_of_week: Some(WeekDay::Sun),
                time_of_day: time(1),
                end_of_day: false,
                time_definition: TimeDefinition::Wall,
                standard_offset: 3600,
                offset_before: 3600,
                offset_after: 7200,
            }],
        };
        let encoded = encode_zone_rules(&rules);
        let decoded = decode_zone_rules(&encoded).unwrap();
        assert_eq!(decoded, rules);
    }

    #[test]
    fn catalog_round_trips_tables_and_mapping() {
        let rules = ZoneRules {
            initial_standard_offset: 0,
            standard_transitions: Vec::new(),
            initial_wall_offset: 0,
            wall_transitions: Vec::new(),
            last_rules: Vec::new(),
        };
        let blob = encode_zone_rules(&rules);
        let region_ids = alloc::vec!["Europe/London".into(), "UTC".into()];
        let versions = alloc::vec![VersionEntry {
            label: "2025a".into(),
            regions: alloc::vec![("Europe/London".into(), 0u16)],
        }];
        let encoded = encode_catalog(&versions, &region_ids, &alloc::vec![blob]);
        let decoded = decode_catalog(&encoded).unwrap();
        assert_eq!(decoded.version_labels, alloc::vec!["2025a".to_string()]);
        assert_eq!(decoded.region_ids, region_ids);
        assert_eq!(decoded.versions.len(), 1);
        assert_eq!(decoded.versions[0].regions, alloc::vec![("Europe/London".to_string(), 0u16)]);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = [1u8, 0, 3, b'B', b'A', b'D'];
        assert_eq!(decode_catalog(&bytes), Err(DecodeError::BadMagic));
    }
}
