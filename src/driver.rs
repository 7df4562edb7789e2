//! Driver (component G, spec.md §4.G): wires one compilation per tzdata
//! distribution version — Parser → Model → Window Builder → Transition
//! Compiler — then aggregates the per-version results into a catalog.
//! Grounded on `zoneinfo_rs::provider`'s per-identifier build loop (parse
//! all sources, compile each zone id, resolve links) but generalized to
//! run once per version and then fold the versions together, which the
//! teacher (a single-version runtime provider) never needed to do.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::compiler::{self, ZoneRules};
use crate::dedup::Deduplicator;
use crate::encode::{self, VersionEntry};
use crate::error::{CompileError, NameError, SemanticError};
use crate::model::{LeapSecondEntry, RawZone, TzDataModel, ZoneSavings};
use crate::parser;
use crate::window::WindowBuilder;

/// Verbose diagnostics (spec.md §6 `-verbose`, §7 "stack trace in verbose
/// mode"), routed through the optional `log` dependency the same way the
/// teacher workspace carries it for `temporal_rs`; compiles to nothing
/// when the `log` feature is off, so this core stays usable in strict
/// `no_std` embeddings.
macro_rules! trace_diag {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::trace!($($arg)*);
    };
}

/// Ids the finished region map never carries (spec.md §4.D "The finished
/// ZoneRules drops the special synthetic ids ... they are reconstructed
/// by the consumer from fixed offsets").
const SYNTHETIC_REGION_IDS: [&str; 5] = ["UTC", "GMT", "GMT0", "GMT+0", "GMT-0"];

/// One named tzdata source file handed to the driver for one version.
pub struct SourceFile<'a> {
    pub name: &'a str,
    pub text: &'a str,
}

/// Everything needed to compile one tzdata distribution version.
pub struct VersionInput<'a> {
    pub label: &'a str,
    pub sources: &'a [SourceFile<'a>],
    pub leap_seconds: Option<SourceFile<'a>>,
}

/// The result of compiling a single version, before cross-version
/// aggregation (spec.md §4.G steps 1-5).
pub struct CompiledVersion {
    pub label: String,
    pub regions: HashMap<String, Rc<ZoneRules>>,
    pub leap_seconds: Vec<LeapSecondEntry>,
}

/// Builds the windows for one zone id from its `RawZone` line sequence
/// and the named rule families it references, then runs the transition
/// compiler over them. Not named in spec.md's component table by itself
/// but is exactly the "Build ZoneRules for each concrete zone id" step
/// of §4.G.
fn build_zone_rules(
    zone_name: &str,
    raw_zones: &[RawZone],
    rule_sets: &HashMap<String, Vec<crate::model::RawRule>>,
    dedup: &mut Deduplicator,
) -> Result<ZoneRules, CompileError> {
    let mut builder = WindowBuilder::new(zone_name);
    for zone_line in raw_zones {
        match &zone_line.until {
            Some(until) => {
                let naive = compiler::materialize_naive(
                    until.year,
                    until.month,
                    until.day,
                    until.time_of_day,
                    until.end_of_day,
                );
                builder.add_window(zone_line.standard_offset_seconds, naive, until.time_definition)?;
            }
            None => builder.add_window_forever(zone_line.standard_offset_seconds)?,
        }

        match &zone_line.savings {
            ZoneSavings::Fixed(seconds) => builder.set_fixed_savings_to_window(*seconds)?,
            ZoneSavings::RuleName(name) => {
                let rules = rule_sets.get(name).ok_or_else(|| SemanticError::UnknownRuleName {
                    zone: zone_name.to_string(),
                    rule_name: name.clone(),
                })?;
                for rule in rules {
                    builder.add_rule_to_window(
                        rule.start_year.as_i32(),
                        rule.end_year,
                        rule.month,
                        rule.day,
                        rule.time_of_day,
                        rule.end_of_day,
                        rule.time_definition,
                        rule.savings_seconds,
                    )?;
                }
            }
        }
    }

    compiler::compile_region(&mut builder.windows, zone_name, dedup).map_err(CompileError::from)
}

/// Follows at most one hop of Link indirection (spec.md §3 "Link ...
/// resolution follows at most one indirection", §4.G step 4).
fn resolve_link(
    alias: &str,
    real: &str,
    links: &HashMap<String, String>,
    built: &HashMap<String, Rc<ZoneRules>>,
) -> Result<Rc<ZoneRules>, CompileError> {
    if let Some(rules) = built.get(real) {
        return Ok(rules.clone());
    }
    match links.get(real) {
        Some(real2) => match built.get(real2) {
            Some(rules) => Ok(rules.clone()),
            None if links.contains_key(real2) => Err(NameError::LinkChainTooDeep { alias: alias.to_string() }.into()),
            None => Err(NameError::UnresolvedLinkTarget {
                alias: alias.to_string(),
                target: real2.clone(),
            }
            .into()),
        },
        None => Err(NameError::UnresolvedLinkTarget {
            alias: alias.to_string(),
            target: real.to_string(),
        }
        .into()),
    }
}

/// Compiles one tzdata distribution version end to end (spec.md §4.G
/// steps 1-5), sharing `dedup` with sibling calls so structurally
/// identical `ZoneRules` collapse to one canonical instance across
/// versions as well as within one.
pub fn compile_version(input: &VersionInput, dedup: &mut Deduplicator) -> Result<CompiledVersion, CompileError> {
    let mut model = TzDataModel::new();
    for source in input.sources {
        parser::parse_source(source.name, source.text, &mut model)?;
    }
    if let Some(leap) = &input.leap_seconds {
        parser::parse_source(leap.name, leap.text, &mut model)?;
    }

    let mut regions: HashMap<String, Rc<ZoneRules>> = HashMap::new();
    for (zone_name, raw_zones) in &model.zones {
        trace_diag!("{}: compiling {} zone line(s)", zone_name, raw_zones.len());
        let rules = build_zone_rules(zone_name, raw_zones, &model.rules, dedup)?;
        let interned_name = dedup.dedup_string(zone_name.clone());
        regions.insert((*interned_name).clone(), dedup.dedup_zone_rules(rules));
    }

    // Resolved against this frozen, zone-only snapshot rather than the
    // live `regions` map below: `regions` is progressively gaining alias
    // entries as this loop runs, and `HashMap` iteration order is
    // randomized per process, so reading from it here would make a
    // chain's accepted depth depend on which alias `model.links.keys()`
    // happens to visit first instead of the static Link graph.
    let zone_regions = regions.clone();
    for alias in model.links.keys() {
        let real = &model.links[alias];
        trace_diag!("resolving link {} -> {}", alias, real);
        let resolved = resolve_link(alias, real, &model.links, &zone_regions)?;
        let interned_alias = dedup.dedup_string(alias.clone());
        regions.insert((*interned_alias).clone(), resolved);
    }

    for synthetic in SYNTHETIC_REGION_IDS {
        regions.remove(synthetic);
    }

    Ok(CompiledVersion {
        label: input.label.to_string(),
        regions,
        leap_seconds: model.leap_seconds,
    })
}

/// The aggregated result of a whole compile, across every version
/// (spec.md §4.G "After all versions"), already shaped for
/// [`crate::encode::encode_catalog`].
pub struct Catalog {
    pub version_labels: Vec<String>,
    pub region_ids: Vec<String>,
    pub rule_blobs: Vec<Vec<u8>>,
    pub version_entries: Vec<VersionEntry>,
    pub best_leap_seconds: Vec<LeapSecondEntry>,
}

/// Picks the leap-second table whose last entry is latest, with ties
/// going to the later version in iteration order (spec.md §4.G
/// "the one whose last date is maximal across versions (ties: last-seen)").
fn pick_best_leap_seconds(versions: &[CompiledVersion]) -> Vec<LeapSecondEntry> {
    let mut best: Option<&Vec<LeapSecondEntry>> = None;
    let mut best_last = i64::MIN;
    for version in versions {
        let last = version.leap_seconds.iter().map(|e| e.epoch_day).max().unwrap_or(i64::MIN);
        if best.is_none() || last >= best_last {
            best = Some(&version.leap_seconds);
            best_last = last;
        }
    }
    best.cloned().unwrap_or_default()
}

/// Compiles every version and folds the results into one [`Catalog`]
/// (spec.md §4.G "compute the union of region ids ... the union of
/// distinct ZoneRules ... select the bestLeapSeconds map ... Emit the
/// catalog stream").
pub fn compile_catalog(inputs: &[VersionInput]) -> Result<Catalog, CompileError> {
    let mut dedup = Deduplicator::new();
    let mut compiled = Vec::with_capacity(inputs.len());
    for input in inputs {
        trace_diag!("compiling version {}", input.label);
        compiled.push(compile_version(input, &mut dedup)?);
    }

    let mut region_id_set: BTreeMap<String, ()> = BTreeMap::new();
    for version in &compiled {
        for region_id in version.regions.keys() {
            region_id_set.insert(region_id.clone(), ());
        }
    }
    let region_ids: Vec<String> = region_id_set.into_keys().collect();

    let mut blob_index_by_ptr: HashMap<usize, u16> = HashMap::new();
    let mut rule_blobs: Vec<Vec<u8>> = Vec::new();

    let mut version_entries = Vec::with_capacity(compiled.len());
    let mut version_labels = Vec::with_capacity(compiled.len());
    for version in &compiled {
        let mut regions: Vec<(String, u16)> = Vec::with_capacity(version.regions.len());
        let mut region_names: Vec<&String> = version.regions.keys().collect();
        region_names.sort();
        for region_id in region_names {
            let rules = &version.regions[region_id];
            let ptr = Rc::as_ptr(rules) as usize;
            let index = *blob_index_by_ptr.entry(ptr).or_insert_with(|| {
                rule_blobs.push(encode::encode_zone_rules(rules));
                (rule_blobs.len() - 1) as u16
            });
            regions.push((region_id.clone(), index));
        }
        version_entries.push(VersionEntry {
            label: version.label.clone(),
            regions,
        });
        version_labels.push(version.label.clone());
    }

    let best_leap_seconds = pick_best_leap_seconds(&compiled);

    Ok(Catalog {
        version_labels,
        region_ids,
        rule_blobs,
        version_entries,
        best_leap_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALGERIA: &str = "\
Rule\tAlgeria\t1916\tonly\t-\tJun\t14\t23:00s\t1:00\t-\n\
Rule\tAlgeria\t1916\tonly\t-\tOct\t 1\t 0:00s\t0\t-\n\
Zone\tAfrica/Algiers\t0:12:12\t-\tLMT\t1891\tMar\t16\n\
\t0:09:21\t-\tPMT\t1911\tMar\t11\n\
\t0:00\tAlgeria\tWE%sT\t1940\tFeb\t25\t2:00\n\
\t1:00\tAlgeria\tCE%sT\n";

    const LINKS: &str = "Link\tAfrica/Algiers\tAfrica/Algiers_Alias\n";

    #[test]
    fn compiles_a_single_version_with_rules_and_links() {
        let input = VersionInput {
            label: "2025a",
            sources: &[
                SourceFile { name: "africa", text: ALGERIA },
                SourceFile { name: "backward", text: LINKS },
            ],
            leap_seconds: None,
        };
        let mut dedup = Deduplicator::new();
        let version = compile_version(&input, &mut dedup).unwrap();
        assert!(version.regions.contains_key("Africa/Algiers"));
        assert!(version.regions.contains_key("Africa/Algiers_Alias"));
        assert!(!version.regions.contains_key("UTC"));
    }

    #[test]
    fn catalog_dedups_identical_blobs_across_versions() {
        let input_a = VersionInput {
            label: "2024a",
            sources: &[SourceFile { name: "africa", text: ALGERIA }],
            leap_seconds: None,
        };
        let input_b = VersionInput {
            label: "2025a",
            sources: &[SourceFile { name: "africa", text: ALGERIA }],
            leap_seconds: None,
        };
        let catalog = compile_catalog(&[input_a, input_b]).unwrap();
        assert_eq!(catalog.version_labels.len(), 2);
        assert_eq!(catalog.rule_blobs.len(), 1, "identical source across versions must share one blob");
    }

    #[test]
    fn unresolved_link_target_is_fatal() {
        let input = VersionInput {
            label: "2025a",
            sources: &[
                SourceFile { name: "africa", text: ALGERIA },
                SourceFile {
                    name: "backward",
                    text: "Link\tAfrica/Nowhere\tAfrica/Ghost\n",
                },
            ],
            leap_seconds: None,
        };
        let mut dedup = Deduplicator::new();
        assert!(compile_version(&input, &mut dedup).is_err());
    }

    /// A three-hop alias chain (`Link A B; Link B C; Link C D` with `D`
    /// real) is rejected regardless of which alias `hashbrown::HashMap`'s
    /// randomized iteration happens to visit first (spec.md §3 "follows
    /// at most one indirection"). Run across many fresh compiles so a
    /// resolution path that only fails under some iteration orders would
    /// show up as a flake rather than passing by luck.
    #[test]
    fn three_hop_link_chain_is_rejected_regardless_of_iteration_order() {
        let chain_links = "\
Link\tAfrica/Algiers\tAfrica/Chain_C\n\
Link\tAfrica/Chain_C\tAfrica/Chain_B\n\
Link\tAfrica/Chain_B\tAfrica/Chain_A\n";

        for _ in 0..50 {
            let input = VersionInput {
                label: "2025a",
                sources: &[
                    SourceFile { name: "africa", text: ALGERIA },
                    SourceFile { name: "backward", text: chain_links },
                ],
                leap_seconds: None,
            };
            let mut dedup = Deduplicator::new();
            let err = compile_version(&input, &mut dedup).expect_err("a 3-hop link chain must never resolve");
            assert!(
                matches!(err, CompileError::Name(NameError::LinkChainTooDeep { .. })),
                "expected LinkChainTooDeep, got {err:?}"
            );
        }
    }
}
