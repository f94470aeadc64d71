//! Tests for AssortmentStore
//!
//! These tests verify:
//! - Round-trip of containers through store/get
//! - The size guard and the no-overwrite rule
//! - Remove symmetry and absent lookups
//! - Count accounting
//! - Key walks and bulk record export
//! - Persistence across close/open

use std::time::Duration;

use assortdb::layout::MAX_CAPACITY;
use assortdb::{AssortError, AssortmentStore, Config, Container, DocHash, DocRef, TermHash};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store(capacity: usize) -> (TempDir, AssortmentStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = open_in(&temp_dir, capacity);
    (temp_dir, store)
}

fn open_in(temp_dir: &TempDir, capacity: usize) -> AssortmentStore {
    let config = Config::builder()
        .storage_root(temp_dir.path())
        .capacity(capacity)
        .buffer_kb(64)
        .build();
    AssortmentStore::open(config).unwrap()
}

fn term(s: &str) -> TermHash {
    TermHash::try_from(s).unwrap()
}

fn doc(hash: &str, attrs: &str) -> DocRef {
    DocRef::new(DocHash::try_from(hash).unwrap(), attrs).unwrap()
}

/// Container for term number `i` with `refs` references
fn numbered(i: usize, refs: usize) -> Container {
    let docs = (0..refs)
        .map(|j| doc(&format!("d{:05}{:06}", j, i), &format!("attr-{}-{}", i, j)))
        .collect();
    Container::new(term(&format!("t{:011}", i)), 1_000 + i as i64, docs)
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_root_and_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("cache").join("assortments");
    let config = Config::builder().storage_root(&root).capacity(7).build();

    let store = AssortmentStore::open(config).unwrap();

    assert!(root.join("assortment_007.db").exists());
    assert_eq!(store.path(), root.join("assortment_007.db"));
    assert_eq!(store.capacity(), 7);
    assert_eq!(store.size(), 0);
}

#[test]
fn test_file_name_is_zero_padded() {
    assert_eq!(AssortmentStore::file_name(1), "assortment_001.db");
    assert_eq!(AssortmentStore::file_name(42), "assortment_042.db");
    assert_eq!(AssortmentStore::file_name(1234), "assortment_1234.db");
}

#[test]
fn test_open_zero_capacity_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .storage_root(temp_dir.path())
        .capacity(0)
        .build();

    let result = AssortmentStore::open(config);

    assert!(matches!(result, Err(AssortError::Config(_))));
}

#[test]
fn test_open_capacity_above_max_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .storage_root(temp_dir.path())
        .capacity(MAX_CAPACITY + 1)
        .build();

    let result = AssortmentStore::open(config);

    assert!(matches!(result, Err(AssortError::Config(_))));
    assert!(!AssortmentStore::file_path(temp_dir.path(), MAX_CAPACITY + 1).exists());
}

#[test]
fn test_reopen_with_unbounded_preload_budget() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = open_in(&temp_dir, 2);
        store.store(&numbered(1, 2)).unwrap();
        store.close();
    }

    let config = Config::builder()
        .storage_root(temp_dir.path())
        .capacity(2)
        .buffer_kb(64)
        .preload_budget(Duration::MAX)
        .build();
    let mut store = AssortmentStore::open(config).unwrap();

    assert_eq!(store.size(), 1);
    assert_eq!(store.cache_stats().rows, 1);
    assert_eq!(store.get(numbered(1, 2).term_hash()).unwrap(), Some(numbered(1, 2)));
}

#[test]
fn test_shards_for_different_capacities_coexist() {
    let temp_dir = TempDir::new().unwrap();
    let mut one = open_in(&temp_dir, 1);
    let mut two = open_in(&temp_dir, 2);

    one.store(&numbered(1, 1)).unwrap();
    two.store(&numbered(1, 2)).unwrap();

    assert_eq!(one.get(&term("t00000000001")).unwrap().unwrap().len(), 1);
    assert_eq!(two.get(&term("t00000000001")).unwrap().unwrap().len(), 2);
}

// =============================================================================
// Store / Get Tests
// =============================================================================

#[test]
fn test_concrete_scenario_capacity_two() {
    let (_temp, mut store) = setup_temp_store(2);
    let before = store.size();
    let container = Container::new(
        term("aaaa00000000"),
        1000,
        vec![doc("docA00000000", "x"), doc("docB00000000", "y")],
    );

    store.store(&container).unwrap();

    let fetched = store.get(&term("aaaa00000000")).unwrap().unwrap();
    assert_eq!(fetched, container);
    assert_eq!(fetched.updated(), 1000);

    let removed = store.remove(&term("aaaa00000000")).unwrap().unwrap();
    assert_eq!(removed, container);
    assert!(!store.contains(&term("aaaa00000000")).unwrap());
    assert_eq!(store.size(), before);
}

#[test]
fn test_round_trip_for_many_capacities() {
    for capacity in [1, 2, 3, 8, 17] {
        let (_temp, mut store) = setup_temp_store(capacity);
        let container = numbered(5, capacity);

        store.store(&container).unwrap();

        let fetched = store.get(container.term_hash()).unwrap().unwrap();
        assert_eq!(fetched.term_hash(), container.term_hash());
        assert_eq!(fetched.updated(), container.updated());
        assert!(fetched.iter().eq(container.iter()));
    }
}

#[test]
fn test_store_wrong_size_rejected() {
    let (_temp, mut store) = setup_temp_store(3);
    store.store(&numbered(1, 3)).unwrap();

    for refs in [0, 2, 4] {
        let result = store.store(&numbered(2, refs));
        assert!(matches!(
            result,
            Err(AssortError::SizeMismatch { expected: 3, actual }) if actual == refs
        ));
    }

    assert_eq!(store.size(), 1);
    assert!(!store.contains(&term("t00000000002")).unwrap());
}

#[test]
fn test_store_duplicate_rejected_first_kept() {
    let (_temp, mut store) = setup_temp_store(1);
    let first = Container::new(term("dupdupdupdup"), 1, vec![doc("docA00000000", "first")]);
    let second = Container::new(term("dupdupdupdup"), 2, vec![doc("docB00000000", "second")]);

    store.store(&first).unwrap();
    let result = store.store(&second);

    assert!(matches!(result, Err(AssortError::DuplicateKey(_))));
    assert_eq!(store.get(&term("dupdupdupdup")).unwrap(), Some(first));
    assert_eq!(store.size(), 1);
}

// =============================================================================
// Remove / Contains Tests
// =============================================================================

#[test]
fn test_remove_matches_prior_get() {
    let (_temp, mut store) = setup_temp_store(4);
    let container = numbered(9, 4);
    store.store(&container).unwrap();

    let before = store.get(container.term_hash()).unwrap();
    let removed = store.remove(container.term_hash()).unwrap();

    assert_eq!(removed, before);
    assert!(!store.contains(container.term_hash()).unwrap());
    assert_eq!(store.get(container.term_hash()).unwrap(), None);
}

#[test]
fn test_absent_is_not_error() {
    let (_temp, mut store) = setup_temp_store(2);
    let missing = term("nothere00000");

    assert_eq!(store.get(&missing).unwrap(), None);
    assert_eq!(store.remove(&missing).unwrap(), None);
    assert!(!store.contains(&missing).unwrap());
}

#[test]
fn test_count_accounting() {
    let (_temp, mut store) = setup_temp_store(2);

    for i in 0..10 {
        store.store(&numbered(i, 2)).unwrap();
    }
    assert_eq!(store.size(), 10);

    for i in 0..4 {
        assert!(store.remove(numbered(i, 2).term_hash()).unwrap().is_some());
    }
    assert_eq!(store.size(), 6);
}

#[test]
fn test_store_after_remove() {
    let (_temp, mut store) = setup_temp_store(1);
    let first = numbered(3, 1);
    store.store(&first).unwrap();
    store.remove(first.term_hash()).unwrap();

    let replacement = Container::new(*first.term_hash(), 99, vec![doc("docZ00000000", "z")]);
    store.store(&replacement).unwrap();

    assert_eq!(store.get(first.term_hash()).unwrap(), Some(replacement));
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_keys_ascending_cover_all() {
    let (_temp, mut store) = setup_temp_store(1);
    for i in [7, 3, 9, 1, 5] {
        store.store(&numbered(i, 1)).unwrap();
    }

    let keys: Vec<TermHash> = store.keys(None, true, false).unwrap().collect();

    assert_eq!(keys.len(), 5);
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(keys[0], term("t00000000001"));
}

#[test]
fn test_keys_wraparound_from_middle() {
    let (_temp, mut store) = setup_temp_store(1);
    for i in 0..6 {
        store.store(&numbered(i, 1)).unwrap();
    }
    let start = term("t00000000003");

    let keys: Vec<TermHash> = store.keys(Some(&start), true, true).unwrap().collect();

    let expected: Vec<TermHash> = [3, 4, 5, 0, 1, 2]
        .iter()
        .map(|&i| *numbered(i, 1).term_hash())
        .collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_keys_descending_without_wrap() {
    let (_temp, mut store) = setup_temp_store(1);
    for i in 0..4 {
        store.store(&numbered(i, 1)).unwrap();
    }
    let start = term("t00000000002");

    let keys: Vec<TermHash> = store.keys(Some(&start), false, false).unwrap().collect();

    assert_eq!(
        keys,
        vec![term("t00000000002"), term("t00000000001"), term("t00000000000")]
    );
}

#[test]
fn test_records_export() {
    let (_temp, mut store) = setup_temp_store(2);
    let containers: Vec<Container> = (0..3).map(|i| numbered(i, 2)).collect();
    for c in containers.iter().rev() {
        store.store(c).unwrap();
    }

    let exported: Vec<Container> = store
        .records()
        .unwrap()
        .map(|row| store.decode(&row.unwrap()).unwrap())
        .collect();

    assert_eq!(exported, containers);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_reopen_keeps_records() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = open_in(&temp_dir, 3);
        for i in 0..5 {
            store.store(&numbered(i, 3)).unwrap();
        }
        store.remove(numbered(2, 3).term_hash()).unwrap();
        store.close();
    }

    let mut store = open_in(&temp_dir, 3);

    assert_eq!(store.size(), 4);
    assert_eq!(store.get(numbered(4, 3).term_hash()).unwrap(), Some(numbered(4, 3)));
    assert_eq!(store.get(numbered(2, 3).term_hash()).unwrap(), None);
    assert!(!store.backup_dir().exists());
}

#[test]
fn test_reopen_still_refuses_duplicates() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = open_in(&temp_dir, 1);
        store.store(&numbered(1, 1)).unwrap();
        store.close();
    }

    let mut store = open_in(&temp_dir, 1);
    let result = store.store(&numbered(1, 1));

    assert!(matches!(result, Err(AssortError::DuplicateKey(_))));
}
