//! Deduplicator (component E, spec.md §4.E): a process-scoped map from a
//! canonical value to a shared, reference-counted canonical instance.
//! Generalizes the "insert if absent, return canonical" pattern of
//! `zoneinfo_rs::tzif::DesignationSet::insert_and_retrieve_index` from one
//! concrete kind (designations) into one typed table per interned kind,
//! per the REDESIGN FLAGS note in spec.md §9 ("a set of typed interning
//! tables ... hashed by value").

use alloc::rc::Rc;
use alloc::string::String;
use indexmap::IndexMap;

use crate::compiler::{Transition, TransitionRule, ZoneRules};

/// One `insert-if-absent, return canonical` table for a single value
/// type. Kept generic so the Driver can hold one per interned kind
/// without repeating the map/clone boilerplate. Backed by `IndexMap`
/// rather than a plain hash map so the rule-blob table built from it
/// keeps first-seen insertion order, which the byte-exact encoder
/// (spec.md §4.F) needs for stable blob indices — the same reason the
/// teacher's `DesignationSet` sits on an `IndexSet` rather than a
/// `HashSet` (`zoneinfo_rs::tzif::DesignationSet`).
#[derive(Debug)]
pub struct InternTable<T: Eq + core::hash::Hash + Clone> {
    canonical: IndexMap<T, Rc<T>>,
}

impl<T: Eq + core::hash::Hash + Clone> Default for InternTable<T> {
    fn default() -> Self {
        Self {
            canonical: IndexMap::new(),
        }
    }
}

impl<T: Eq + core::hash::Hash + Clone> InternTable<T> {
    pub fn dedup(&mut self, value: T) -> Rc<T> {
        if let Some(existing) = self.canonical.get(&value) {
            return existing.clone();
        }
        let rc = Rc::new(value.clone());
        self.canonical.insert(value, rc.clone());
        rc
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

/// The full set of interning tables used across one compile (spec.md
/// §4.E: "carried across versions in one compile to maximize sharing").
#[derive(Debug, Default)]
pub struct Deduplicator {
    pub offsets: InternTable<i64>,
    pub transitions: InternTable<Transition>,
    pub transition_rules: InternTable<TransitionRule>,
    pub zone_rules: InternTable<ZoneRules>,
    pub strings: InternTable<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dedup_offset(&mut self, offset: i64) -> Rc<i64> {
        self.offsets.dedup(offset)
    }

    pub fn dedup_transition(&mut self, transition: Transition) -> Rc<Transition> {
        self.transitions.dedup(transition)
    }

    pub fn dedup_transition_rule(&mut self, rule: TransitionRule) -> Rc<TransitionRule> {
        self.transition_rules.dedup(rule)
    }

    pub fn dedup_zone_rules(&mut self, rules: ZoneRules) -> Rc<ZoneRules> {
        self.zone_rules.dedup(rules)
    }

    pub fn dedup_string(&mut self, s: String) -> Rc<String> {
        self.strings.dedup(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_returns_the_same_canonical_instance() {
        let mut table: InternTable<i64> = InternTable::default();
        let a = table.dedup(900);
        let b = table.dedup(900);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn dedup_zone_rules_collapses_structurally_equal_blobs() {
        let mut dedup = Deduplicator::new();
        let rules_a = ZoneRules {
            initial_standard_offset: 3600,
            standard_transitions: alloc::vec::Vec::new(),
            initial_wall_offset: 3600,
            wall_transitions: alloc::vec::Vec::new(),
            last_rules: alloc::vec::Vec::new(),
        };
        let rules_b = rules_a.clone();
        let a = dedup.dedup_zone_rules(rules_a);
        let b = dedup.dedup_zone_rules(rules_b);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(dedup.zone_rules.len(), 1);
    }
}
