//! # Property-Based Tests
//!
//! Cache validity and mapping invariants checked with proptest.

use archer_link_core::{
    ChangeAwareCache, ContentId, FieldDefinition, FieldId, FieldMapping, LevelId, MemoryStore,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid date")
}

// =============================================================================
// CACHE PROPERTIES
// =============================================================================

proptest! {
    /// A load hits exactly when elapsed time is within the timeout.
    #[test]
    fn load_hits_iff_within_timeout(timeout in 1u64..100_000, elapsed in 0i64..200_000) {
        let store = MemoryStore::new();
        let mut cache = ChangeAwareCache::new(&store, "FieldMeta", ContentId(100), timeout);
        cache.write(&"payload", Some(epoch())).expect("write");

        let loaded: Option<String> = cache
            .load(Some(epoch() + Duration::seconds(elapsed)))
            .expect("load");

        prop_assert_eq!(loaded.is_some(), elapsed as u64 <= timeout);
    }

    /// Timeout zero never returns data, however fresh the entry.
    #[test]
    fn zero_timeout_never_hits(elapsed in 0i64..10_000, record in 1u64..1_000_000) {
        let store = MemoryStore::new();
        let mut cache = ChangeAwareCache::new(&store, "FieldMeta", ContentId(record), 0);
        cache.write(&record, Some(epoch())).expect("write");

        let loaded: Option<u64> = cache
            .load(Some(epoch() + Duration::seconds(elapsed)))
            .expect("load");

        prop_assert_eq!(loaded, None);
    }

    /// A reference time before the write counts as unchanged.
    #[test]
    fn earlier_reference_time_hits(back in 0i64..100_000) {
        let store = MemoryStore::new();
        let mut cache = ChangeAwareCache::new(&store, "FieldMeta", ContentId(1), 60);
        cache.write(&1u8, Some(epoch())).expect("write");

        let loaded: Option<u8> = cache
            .load(Some(epoch() - Duration::seconds(back)))
            .expect("load");

        prop_assert_eq!(loaded, Some(1));
    }
}

// =============================================================================
// MAPPING PROPERTIES
// =============================================================================

proptest! {
    /// For every field id on the record, id_to_alias[k] exists and
    /// alias_to_id[id_to_alias[k]] == k.
    #[test]
    fn tables_are_exact_inverses(ids in btree_set(1u64..50_000, 0..60)) {
        let definitions: Vec<FieldDefinition> = ids
            .iter()
            .map(|&id| FieldDefinition {
                id: FieldId(id),
                alias: Some(format!("field_{id}")),
                name: format!("Field {id}"),
                field_type: 1,
                level_id: Some(LevelId(7)),
            })
            .collect();
        let present: BTreeSet<FieldId> = ids.iter().map(|&id| FieldId(id)).collect();

        let mapping = FieldMapping::build(LevelId(7), &present, &definitions);

        prop_assert_eq!(mapping.len(), present.len());
        for id in &present {
            let alias = mapping.alias_for(*id);
            prop_assert!(alias.is_some());
            prop_assert_eq!(mapping.id_for(alias.unwrap_or_default()), Some(*id));
        }
        prop_assert!(mapping.is_consistent());
    }

    /// Only ids present on the record are mapped, whatever the level defines.
    #[test]
    fn mapping_is_restricted_to_present_ids(
        defined in btree_set(1u64..1_000, 1..40),
        picks in vec(any::<bool>(), 40),
    ) {
        let definitions: Vec<FieldDefinition> = defined
            .iter()
            .map(|&id| FieldDefinition {
                id: FieldId(id),
                alias: Some(format!("a{id}")),
                name: String::new(),
                field_type: 1,
                level_id: None,
            })
            .collect();
        let present: BTreeSet<FieldId> = defined
            .iter()
            .zip(picks.iter())
            .filter(|(_, keep)| **keep)
            .map(|(&id, _)| FieldId(id))
            .collect();

        let mapping = FieldMapping::build(LevelId(1), &present, &definitions);

        for (id, _) in mapping.iter() {
            prop_assert!(present.contains(&id));
        }
        prop_assert_eq!(mapping.len(), present.len());
    }
}
