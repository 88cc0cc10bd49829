//! Property tests for lookups against restored records

use filehash_core::{
    HashStore, HashStoreConfig, Lookup, NullClient, SECONDS_PER_DAY, WorkerMode,
};
use filehash_test_utils::CacheEntryBuilder;
use proptest::prelude::*;
use std::path::Path;
use std::sync::Arc;

fn manual_store() -> Arc<HashStore> {
    HashStore::new(HashStoreConfig::default().with_worker(WorkerMode::Manual)).unwrap()
}

proptest! {
    #[test]
    fn prop_matching_request_always_hits(
        size in any::<u64>(),
        mod_time in any::<u64>(),
        hash in any::<[u8; 20]>(),
        repeats in 1usize..8,
    ) {
        let store = manual_store();
        let entry = CacheEntryBuilder::new("/m/file.mkv")
            .with_size(size)
            .with_mod_stamp(mod_time)
            .with_hash(hash)
            .build();
        let expected = entry.hash;
        store.restore([entry]);

        for token in 0..repeats as u64 {
            let lookup = store
                .request_hash(Path::new("/m/file.mkv"), size, mod_time, Arc::new(NullClient), token)
                .unwrap();
            prop_assert_eq!(lookup, Lookup::Valid(expected));
        }
        prop_assert_eq!(store.pending_len(), 0);
        prop_assert!(store.has_unsaved_changes());
    }

    #[test]
    fn prop_any_difference_misses(
        size in any::<u64>(),
        mod_time in any::<u64>(),
        size_delta in 0u64..3,
        time_delta in 0u64..3,
    ) {
        prop_assume!(size_delta != 0 || time_delta != 0);
        let store = manual_store();
        store.restore([CacheEntryBuilder::new("/m/file.mkv")
            .with_size(size)
            .with_mod_stamp(mod_time)
            .build()]);

        let lookup = store
            .request_hash(
                Path::new("/m/file.mkv"),
                size.wrapping_add(size_delta),
                mod_time.wrapping_add(time_delta),
                Arc::new(NullClient),
                1,
            )
            .unwrap();
        prop_assert_eq!(lookup, Lookup::Pending);
        prop_assert_eq!(store.pending_len(), 1);
    }

    #[test]
    fn prop_clean_keeps_exactly_the_fresh_records(
        ages in prop::collection::vec(0u64..60, 1..20),
    ) {
        let store = manual_store();
        let now = 10_000 * SECONDS_PER_DAY;
        let entries: Vec<_> = ages
            .iter()
            .enumerate()
            .map(|(i, age)| {
                CacheEntryBuilder::new(&format!("/m/{i}"))
                    .accessed_at(now - age * SECONDS_PER_DAY)
                    .build()
            })
            .collect();
        store.restore(entries);

        let removed = store.clean_at(now);

        let expected_removed = ages.iter().filter(|age| **age > 30).count();
        prop_assert_eq!(removed, expected_removed);
        prop_assert_eq!(store.len(), ages.len() - expected_removed);
        prop_assert_eq!(store.has_unsaved_changes(), expected_removed > 0);
    }
}
