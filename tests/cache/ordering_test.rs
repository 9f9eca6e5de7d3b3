/*!
 * Cache Ordering Tests
 * Iteration order equals first-insertion order for any key sequence
 */

use native_lifecycle::CacheTable;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

/// First occurrence of each key, in order
fn first_seen(keys: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.iter()
        .filter(|key| seen.insert(key.as_str()))
        .cloned()
        .collect()
}

fn fill(keys: &[String], capacity: usize) -> CacheTable<usize> {
    let mut table = CacheTable::with_capacity(capacity);
    for (i, key) in keys.iter().enumerate() {
        table.add(key).get_or_insert_with(|| i);
    }
    table
}

#[test]
fn test_shuffled_unique_keys_keep_order() {
    let mut rng = StdRng::seed_from_u64(7);
    for n in [0usize, 1, 5, 1000] {
        let mut keys: Vec<String> = (0..n).map(|i| format!("entry-{i}")).collect();
        keys.shuffle(&mut rng);

        let table = fill(&keys, 1);
        assert_eq!(table.len(), n);
        assert_eq!(table.keys().collect::<Vec<_>>(), keys);
        for (position, entry) in table.iter().enumerate() {
            assert_eq!(entry.index(), position);
            assert_eq!(entry.data(), Some(&position));
        }
    }
}

#[test]
fn test_duplicates_keep_first_position() {
    let keys: Vec<String> = ["b", "a", "b", "c", "a", "d"]
        .iter()
        .map(|k| k.to_string())
        .collect();
    let table = fill(&keys, 2);
    assert_eq!(table.keys().collect::<Vec<_>>(), vec!["b", "a", "c", "d"]);
    // Data set on first add survives later adds
    assert_eq!(table.find("a").and_then(|e| e.data()), Some(&1));
}

proptest! {
    #[test]
    fn prop_iteration_matches_first_insertion(
        raw in prop::collection::vec(0u16..64, 0..200),
        capacity in 1usize..32,
    ) {
        let keys: Vec<String> = raw.iter().map(|k| format!("k{k}")).collect();
        let table = fill(&keys, capacity);
        let expected = first_seen(&keys);

        prop_assert_eq!(table.len(), expected.len());
        prop_assert_eq!(table.keys().map(str::to_string).collect::<Vec<_>>(), expected.clone());
        for key in &expected {
            prop_assert!(table.contains(key));
        }
    }

    #[test]
    fn prop_absent_keys_not_found(
        present in prop::collection::vec(any::<u32>(), 0..100),
        candidate in any::<u32>(),
    ) {
        let keys: Vec<String> = present.iter().map(|k| k.to_string()).collect();
        let table = fill(&keys, 4);
        let candidate = candidate.to_string();
        prop_assert_eq!(table.find(&candidate).is_some(), keys.contains(&candidate));
    }
}
