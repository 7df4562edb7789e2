//! End-to-end tests over the Driver + Encoder (spec.md §4.G, §4.F),
//! exercising scenarios 3, 5 and 6 of spec.md §8 plus the catalog-level
//! testable properties (link-resolution identity, blob deduplication,
//! round-trip bit-exactness) that need a whole compiled catalog to set up.

use tzdb_compiler::dedup::Deduplicator;
use tzdb_compiler::driver::{compile_catalog, compile_version, SourceFile, VersionInput};
use tzdb_compiler::encode::{decode_catalog, decode_zone_rules, encode_catalog, encode_zone_rules};

/// Scenario 3 (spec.md §8): two rules both firing on the same calendar
/// day in a forever window (modeled on Africa/Cairo 2010's September 10
/// double change).
const CAIRO_STYLE: &str = "\
Rule\tCairoTest\t2010\tonly\t-\tSep\t10\t12:00s\t1:00\t-\n\
Rule\tCairoTest\t2010\tonly\t-\tSep\t10\t23:00s\t0\t-\n\
Zone\tAfrica/CairoTest\t2:00\tCairoTest\tEE%sT\n";

const LONDON_STYLE: &str = "\
Rule\tGB-Eire\t1996\tmax\t-\tMar\tlastSun\t 1:00u\t1:00\t-\n\
Rule\tGB-Eire\t1996\tmax\t-\tOct\tlastSun\t 1:00u\t0\t-\n\
Zone\tEurope/LondonTest\t0:00\tGB-Eire\tGMT/BST\n";

const LINKS: &str = "Link\tAfrica/CairoTest\tAfrica/CairoAlias\n";

fn single_version<'a>(label: &'a str, sources: &'a [SourceFile<'a>]) -> VersionInput<'a> {
    VersionInput {
        label,
        sources,
        leap_seconds: None,
    }
}

#[test]
fn scenario_3_same_day_double_change_produces_two_wall_transitions() {
    let cairo = SourceFile {
        name: "africa",
        text: CAIRO_STYLE,
    };
    let input = single_version("2010a", core::slice::from_ref(&cairo));
    let mut dedup = Deduplicator::new();
    let version = compile_version(&input, &mut dedup).unwrap();
    let rules = version.regions.get("Africa/CairoTest").unwrap();
    assert_eq!(rules.wall_transitions.len(), 2, "both September 10 rules must produce distinct transitions");
    assert!(rules.wall_transitions[0].epoch_second < rules.wall_transitions[1].epoch_second);
    assert_eq!(rules.wall_transitions[0].offset_before, 7200);
    assert_eq!(rules.wall_transitions[0].offset_after, 10_800);
    assert_eq!(rules.wall_transitions[1].offset_before, 10_800);
    assert_eq!(rules.wall_transitions[1].offset_after, 7200);
}

#[test]
fn scenario_5_link_chain_resolution_matches_real_zone_identity() {
    let cairo = SourceFile {
        name: "africa",
        text: CAIRO_STYLE,
    };
    let links = SourceFile {
        name: "backward",
        text: LINKS,
    };
    let input = single_version("2010a", &[cairo, links]);
    let mut dedup = Deduplicator::new();
    let version = compile_version(&input, &mut dedup).unwrap();
    let real = version.regions.get("Africa/CairoTest").unwrap();
    let alias = version.regions.get("Africa/CairoAlias").unwrap();
    assert!(
        alloc_rc_ptr_eq(real, alias),
        "an alias whose target is a real zone must resolve to the identical ZoneRules instance"
    );
}

fn alloc_rc_ptr_eq<T>(a: &std::rc::Rc<T>, b: &std::rc::Rc<T>) -> bool {
    std::rc::Rc::ptr_eq(a, b)
}

#[test]
fn scenario_6_leap_second_round_trip_and_malformed_time_is_rejected() {
    let cairo = SourceFile {
        name: "africa",
        text: CAIRO_STYLE,
    };
    let good_leap = SourceFile {
        name: "leapseconds",
        text: "Leap\t2016\tDec\t31\t23:59:60\t+\tS\n",
    };
    let input = VersionInput {
        label: "2016g",
        sources: core::slice::from_ref(&cairo),
        leap_seconds: Some(good_leap),
    };
    let mut dedup = Deduplicator::new();
    let version = compile_version(&input, &mut dedup).unwrap();
    assert_eq!(version.leap_seconds.len(), 1);

    let bad_leap = SourceFile {
        name: "leapseconds",
        text: "Leap\t2016\tDec\t31\t23:59:59\t+\tS\n",
    };
    let bad_input = VersionInput {
        label: "2016g-bad",
        sources: core::slice::from_ref(&cairo),
        leap_seconds: Some(bad_leap),
    };
    let mut dedup2 = Deduplicator::new();
    assert!(compile_version(&bad_input, &mut dedup2).is_err());
}

#[test]
fn catalog_blob_table_has_no_duplicate_structurally_equal_entries() {
    let cairo = SourceFile {
        name: "africa",
        text: CAIRO_STYLE,
    };
    let london = SourceFile {
        name: "europe",
        text: LONDON_STYLE,
    };
    let v1 = single_version("2024a", core::slice::from_ref(&cairo));
    let v2 = single_version("2025a", core::slice::from_ref(&cairo));
    let v3 = VersionInput {
        label: "2025a-with-london",
        sources: &[cairo, london],
        leap_seconds: None,
    };
    let catalog = compile_catalog(&[v1, v2, v3]).unwrap();

    for i in 0..catalog.rule_blobs.len() {
        for j in (i + 1)..catalog.rule_blobs.len() {
            assert_ne!(catalog.rule_blobs[i], catalog.rule_blobs[j], "no two rule blobs may be byte-identical");
        }
    }
}

#[test]
fn encoded_catalog_round_trips_through_decode() {
    let cairo = SourceFile {
        name: "africa",
        text: CAIRO_STYLE,
    };
    let input = single_version("2024a", core::slice::from_ref(&cairo));
    let catalog = compile_catalog(&[input]).unwrap();
    let encoded = encode_catalog(&catalog.version_entries, &catalog.region_ids, &catalog.rule_blobs);
    let decoded = decode_catalog(&encoded).unwrap();

    assert_eq!(decoded.version_labels, catalog.version_labels);
    assert_eq!(decoded.region_ids, catalog.region_ids);
    assert_eq!(decoded.rule_blobs, catalog.rule_blobs);

    for blob in &catalog.rule_blobs {
        let reencoded = encode_zone_rules(&decode_zone_rules(blob).unwrap());
        assert_eq!(&reencoded, blob, "encode(decode(blob)) must equal blob bitwise");
    }
}
