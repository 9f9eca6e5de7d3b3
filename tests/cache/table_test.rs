/*!
 * Cache Table Tests
 * Idempotent add, lookup, growth and teardown
 */

use native_lifecycle::CacheTable;
use pretty_assertions::assert_eq;

#[test]
fn test_add_is_idempotent() {
    let mut table: CacheTable<u32> = CacheTable::new();
    table.add("HKLM\\Software").set(1);
    let again = table.add("HKLM\\Software");
    assert_eq!(again.data(), Some(&1));
    assert_eq!(again.index(), 0);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_entry_address_is_stable_across_growth() {
    let mut table: CacheTable<()> = CacheTable::with_capacity(2);
    let first: *const _ = table.add("alpha");

    for i in 0..100 {
        table.add(&format!("key-{i}"));
    }
    assert!(table.capacity() >= 101);

    let found: *const _ = table.find("alpha").unwrap();
    let added: *const _ = table.add("alpha");
    assert_eq!(first, found);
    assert_eq!(first, added);
}

#[test]
fn test_keys_are_case_sensitive() {
    let mut table: CacheTable<&str> = CacheTable::new();
    table.add("Path").set("upper");
    table.add("path").set("lower");

    assert_eq!(table.len(), 2);
    assert_eq!(table.find("Path").and_then(|e| e.data()), Some(&"upper"));
    assert_eq!(table.find("path").and_then(|e| e.data()), Some(&"lower"));
    assert!(table.find("PATH").is_none());
}

#[test]
fn test_empty_key() {
    let mut table: CacheTable<u8> = CacheTable::new();
    table.add("").set(0);
    assert!(table.contains(""));
    assert_eq!(table.keys().collect::<Vec<_>>(), vec![""]);
}

#[test]
fn test_data_updates_in_place() {
    let mut table: CacheTable<Vec<u64>> = CacheTable::new();
    table.add("sizes").get_or_insert_with(Vec::new).push(10);
    table.add("sizes").get_or_insert_with(Vec::new).push(20);
    table.find_mut("sizes").unwrap().data_mut().unwrap().push(30);

    assert_eq!(table.find("sizes").unwrap().data(), Some(&vec![10, 20, 30]));
    assert_eq!(table.find_mut("sizes").unwrap().take(), Some(vec![10, 20, 30]));
    assert!(table.find("sizes").unwrap().data().is_none());
}

#[test]
fn test_destroy_visits_every_entry_in_order() {
    let mut table: CacheTable<usize> = CacheTable::with_capacity(4);
    let keys = ["d", "b", "a", "c", "e", "f"];
    for (i, key) in keys.iter().enumerate() {
        if i % 2 == 0 {
            table.add(key).set(i);
        } else {
            table.add(key);
        }
    }

    let mut visited = Vec::new();
    table.destroy_with(|key, data| visited.push((key.to_string(), data)));

    let expected: Vec<_> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| (key.to_string(), (i % 2 == 0).then_some(i)))
        .collect();
    assert_eq!(visited, expected);
}

#[test]
fn test_runtime_builds_configured_tables() {
    let runtime = native_lifecycle::Runtime::new(native_lifecycle::LifecycleConfig::default())
        .unwrap();
    let mut table = runtime.cache_table::<String>();
    assert!(table.is_empty());
    table.add("service").set("running".to_string());
    assert_eq!(
        table.iter().map(|e| e.key()).collect::<Vec<_>>(),
        vec!["service"]
    );
}
