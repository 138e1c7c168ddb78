//! Tests for Catalog
//!
//! These tests verify:
//! - put/get with first-write-wins key binding
//! - Deduplication of identical (truncated) payloads
//! - First-fit placement and container capacity bounds
//! - Round-trip persistence through the catalog record
//! - Error taxonomy (not found, corrupt, config)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dedupstore::{
    Catalog, Config, Container, ContentHash, DedupError, MemoryRecordStore, PutKind, RecordStore,
    Result,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_file_catalog(block_capacity: usize, container_capacity: usize) -> (TempDir, Catalog) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .block_capacity(block_capacity)
        .container_capacity(container_capacity)
        .build();
    let catalog = Catalog::open(config).unwrap();
    (temp_dir, catalog)
}

fn memory_catalog(
    block_capacity: usize,
    container_capacity: usize,
) -> Catalog<Arc<MemoryRecordStore>> {
    Catalog::create_with_store(
        Arc::new(MemoryRecordStore::new()),
        "mem",
        block_capacity,
        container_capacity,
    )
    .unwrap()
}

/// Record store that counts writes
#[derive(Default)]
struct CountingStore {
    inner: MemoryRecordStore,
    writes: AtomicUsize,
}

impl RecordStore for CountingStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.inner.read(name)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(name, bytes)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        self.inner.remove(name)
    }

    fn list(&self) -> Result<Vec<String>> {
        self.inner.list()
    }
}

// =============================================================================
// Reference Scenario
// =============================================================================

#[test]
fn test_shared_value_scenario() {
    let (temp, mut catalog) = setup_file_catalog(8, 8);

    catalog.put_block("key", b"value").unwrap();
    catalog.put_block("key1", b"value").unwrap();
    catalog.put_block("key2", b"value").unwrap();
    catalog.put_block("normalized_key", b"Data.").unwrap();

    assert_eq!(catalog.get_block("key").unwrap(), b"value".to_vec());
    assert_eq!(catalog.get_block("key1").unwrap(), b"value".to_vec());
    assert_eq!(catalog.get_block("key2").unwrap(), b"value".to_vec());

    let hash1 = catalog.hash_for_key("key1").unwrap().clone();
    let hash2 = catalog.hash_for_key("key2").unwrap().clone();
    assert_eq!(hash1, hash2);
    assert_eq!(
        catalog.container_for_hash(&hash1),
        catalog.container_for_hash(&hash2)
    );

    let refs = catalog.references(&catalog.content_hash(b"value")).unwrap();
    assert_eq!(refs, vec!["key", "key1", "key2"]);

    let store_name = catalog.store_name().to_string();
    drop(catalog);

    let config = Config::builder()
        .data_dir(temp.path())
        .store_name(store_name)
        .build();
    let reopened = Catalog::open(config).unwrap();

    assert_eq!(reopened.get_block("key2").unwrap(), b"value".to_vec());
    assert_eq!(reopened.get_block("normalized_key").unwrap(), b"Data.".to_vec());
    assert_eq!(
        reopened.keys().collect::<Vec<_>>(),
        vec!["key", "key1", "key2", "normalized_key"]
    );
}

// =============================================================================
// Put / Get Tests
// =============================================================================

#[test]
fn test_put_reports_stored_then_deduplicated() {
    let mut catalog = memory_catalog(8, 8);

    let first = catalog.put_block("a", b"same").unwrap();
    let second = catalog.put_block("b", b"same").unwrap();

    assert_eq!(first.kind, PutKind::Stored);
    assert_eq!(second.kind, PutKind::Deduplicated);
    assert_eq!(first.content_hash, second.content_hash);
    assert_eq!(first.container, second.container);
    assert!(!first.truncated);
}

#[test]
fn test_first_write_wins() {
    let mut catalog = memory_catalog(8, 8);

    catalog.put_block("key", b"first").unwrap();
    let outcome = catalog.put_block("key", b"second").unwrap();

    assert_eq!(outcome.kind, PutKind::AlreadyBound);
    assert_eq!(outcome.content_hash, ContentHash::of(b"first"));
    assert_eq!(catalog.get_block("key").unwrap(), b"first".to_vec());
    assert_eq!(catalog.stats().units, 1);
}

#[test]
fn test_rebinding_key_writes_nothing() {
    let mut catalog =
        Catalog::create_with_store(Arc::new(CountingStore::default()), "count", 8, 8)
            .unwrap();
    catalog.put_block("key", b"value").unwrap();
    let before = catalog.store().writes.load(Ordering::SeqCst);

    catalog.put_block("key", b"value").unwrap();
    catalog.put_block("key", b"other").unwrap();

    assert_eq!(catalog.store().writes.load(Ordering::SeqCst), before);
}

#[test]
fn test_put_writes_container_then_catalog() {
    let mut catalog =
        Catalog::create_with_store(Arc::new(CountingStore::default()), "count", 8, 8)
            .unwrap();
    let after_open = catalog.store().writes.load(Ordering::SeqCst);
    assert_eq!(after_open, 1);

    catalog.put_block("a", b"one").unwrap();
    assert_eq!(catalog.store().writes.load(Ordering::SeqCst), 3);

    catalog.put_block("b", b"one").unwrap();
    assert_eq!(catalog.store().writes.load(Ordering::SeqCst), 5);
}

#[test]
fn test_get_missing_key_is_not_found() {
    let catalog = memory_catalog(8, 8);

    let err = catalog.get_block("somekey").unwrap_err();

    assert!(err.is_not_found());
    assert!(matches!(err, DedupError::KeyNotFound(ref key) if key == "somekey"));
}

#[test]
fn test_deduplicated_keys_share_single_block() {
    let mut catalog = memory_catalog(8, 8);

    catalog.put_block("k1", b"payload").unwrap();
    catalog.put_block("k2", b"payload").unwrap();

    let hash = catalog.hash_for_key("k1").unwrap().clone();
    let container = catalog
        .load_container(catalog.container_for_hash(&hash).unwrap())
        .unwrap();
    assert_eq!(container.len(), 1);

    let block = container.get_unit(&hash).unwrap();
    assert!(block.contains_reference("k1"));
    assert!(block.contains_reference("k2"));
    assert_eq!(
        catalog.stats(),
        dedupstore::CatalogStats {
            keys: 2,
            units: 1,
            containers: 1
        }
    );
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncation_is_reported_and_deterministic() {
    let mut catalog = memory_catalog(4, 8);

    let outcome = catalog.put_block("long", b"abcdefgh").unwrap();

    assert!(outcome.truncated);
    assert_eq!(outcome.content_hash, ContentHash::of(b"abcd"));
    assert_eq!(catalog.content_hash(b"abcdefgh"), ContentHash::of(b"abcd"));
    assert_eq!(catalog.get_block("long").unwrap(), b"abcd".to_vec());
}

#[test]
fn test_payloads_equal_after_truncation_deduplicate() {
    let mut catalog = memory_catalog(4, 8);

    catalog.put_block("x", b"abcdXXXX").unwrap();
    let outcome = catalog.put_block("y", b"abcdYYYY").unwrap();

    assert_eq!(outcome.kind, PutKind::Deduplicated);
    assert_eq!(catalog.get_block("y").unwrap(), b"abcd".to_vec());
}

// =============================================================================
// Placement Tests
// =============================================================================

#[test]
fn test_first_fit_fills_container_before_opening_another() {
    let mut catalog = memory_catalog(8, 2);

    let a = catalog.put_block("a", b"one").unwrap();
    let b = catalog.put_block("b", b"two").unwrap();
    let c = catalog.put_block("c", b"three").unwrap();

    assert_eq!(a.container, b.container);
    assert_ne!(b.container, c.container);
    assert!(c.container > a.container);
}

#[test]
fn test_containers_never_exceed_capacity() {
    let mut catalog = memory_catalog(8, 2);

    for i in 0..5 {
        let key = format!("key{}", i);
        let value = format!("value{}", i);
        catalog.put_block(&key, value.as_bytes()).unwrap();
    }

    let ids = catalog.container_ids();
    assert_eq!(ids.len(), 3);
    for id in ids {
        let container = catalog.load_container(id).unwrap();
        assert!(container.len() <= 2);
        assert_eq!(container.unit_capacity(), 2);
    }
    for i in 0..5 {
        let key = format!("key{}", i);
        assert_eq!(
            catalog.get_block(&key).unwrap(),
            format!("value{}", i).into_bytes()
        );
    }
}

#[test]
fn test_duplicates_do_not_consume_capacity() {
    let mut catalog = memory_catalog(8, 1);

    for i in 0..4 {
        catalog.put_block(&format!("k{}", i), b"same").unwrap();
    }

    assert_eq!(catalog.container_ids().len(), 1);
    assert_eq!(catalog.stats().keys, 4);
}

#[test]
fn test_placement_reuses_container_with_freed_space() {
    let mut catalog = memory_catalog(8, 2);
    catalog.put_block("a", b"one").unwrap();
    catalog.put_block("b", b"two").unwrap();
    let first = catalog.container_for_hash(&ContentHash::of(b"one")).unwrap();

    // Free a slot behind the catalog's back; placement reloads containers
    let mut container = catalog.load_container(first).unwrap();
    container
        .remove_unit_by_hash(catalog.store(), &ContentHash::of(b"two"))
        .unwrap();

    let outcome = catalog.put_block("c", b"three").unwrap();

    assert_eq!(outcome.container, first);
}

#[test]
fn test_binary_payload_returned_byte_exact() {
    let mut catalog = memory_catalog(8, 4);
    let payload = [0xff, 0xfe, 0x00, 0x80, 0xc3];

    catalog.put_block("bin", &payload).unwrap();

    assert_eq!(catalog.get_block("bin").unwrap(), payload.to_vec());
}

#[test]
fn test_dedup_into_container_missing_block_is_corrupt() {
    let mut catalog = memory_catalog(8, 4);
    let id = catalog.put_block("a", b"same").unwrap().container;

    // Container record no longer holds the block the catalog points at
    Container::new(id, 4).save(catalog.store()).unwrap();

    let err = catalog.put_block("b", b"same").unwrap_err();

    assert!(matches!(err, DedupError::Corrupt(ref reason) if reason.contains("lacks it")));
    assert!(!catalog.contains_key("b"));
}

#[test]
fn test_placement_skips_container_at_its_own_limit() {
    let mut catalog = memory_catalog(8, 4);
    let first = catalog.put_block("a", b"one").unwrap().container;

    // Rewrite the container with a tighter limit than the catalog's
    let mut tight = Container::new(first, 1);
    tight
        .add_unit(catalog.store(), dedupstore::Block::new(8, "a", b"one"))
        .unwrap();

    let outcome = catalog.put_block("b", b"two").unwrap();

    assert_eq!(outcome.kind, PutKind::Stored);
    assert_ne!(outcome.container, first);
    assert_eq!(catalog.load_container(first).unwrap().len(), 1);
    assert_eq!(catalog.get_block("b").unwrap(), b"two".to_vec());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reload_reproduces_indexes() {
    let mut catalog = memory_catalog(8, 2);
    for i in 0..6 {
        let value = format!("v{}", i % 3);
        catalog.put_block(&format!("k{}", i), value.as_bytes()).unwrap();
    }

    let keys: Vec<String> = catalog.keys().map(str::to_string).collect();
    let bindings: Vec<_> = keys
        .iter()
        .map(|k| {
            let hash = catalog.hash_for_key(k).unwrap().clone();
            let container = catalog.container_for_hash(&hash).unwrap();
            (hash, container)
        })
        .collect();
    let stats = catalog.stats();

    let store = catalog.into_store();
    let reloaded = Catalog::load(store, "mem").unwrap();

    assert_eq!(reloaded.stats(), stats);
    for (key, (hash, container)) in keys.iter().zip(bindings) {
        assert_eq!(reloaded.hash_for_key(key), Some(&hash));
        assert_eq!(reloaded.container_for_hash(&hash), Some(container));
    }
    assert_eq!(reloaded.get_block("k4").unwrap(), b"v1".to_vec());
}

#[test]
fn test_reload_keeps_stored_capacities() {
    let catalog = memory_catalog(4, 3);
    let store = catalog.into_store();

    let reopened = Catalog::open_with_store(store, Some("mem"), 16, 16).unwrap();

    assert_eq!(reopened.block_capacity(), 4);
    assert_eq!(reopened.container_capacity(), 3);
}

#[test]
fn test_open_unnamed_store_creates_record() {
    let (temp, catalog) = setup_file_catalog(8, 8);

    let record = temp.path().join(format!("{}.catalog", catalog.store_name()));
    assert!(record.is_file());
}

#[test]
fn test_open_missing_named_store_fails_without_writing() {
    let store = Arc::new(MemoryRecordStore::new());

    let result = Catalog::open_with_store(Arc::clone(&store), Some("typo"), 8, 8);

    assert!(matches!(
        result,
        Err(DedupError::RecordNotFound(ref name)) if name == "typo.catalog"
    ));
    assert!(!store.exists("typo.catalog").unwrap());
    assert!(store.is_empty());
}

#[test]
fn test_open_missing_named_file_store_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .store_name("typo")
        .build();

    let err = Catalog::open(config).unwrap_err();

    assert!(err.is_not_found());
    assert!(!temp_dir.path().join("typo.catalog").exists());
}

#[test]
fn test_create_existing_store_rejected() {
    let catalog = memory_catalog(8, 8);
    let store = catalog.into_store();

    let result = Catalog::create_with_store(Arc::clone(&store), "mem", 8, 8);

    assert!(matches!(result, Err(DedupError::Config(_))));
    assert!(Catalog::load(store, "mem").is_ok());
}

#[test]
fn test_open_without_name_generates_one() {
    let store = Arc::new(MemoryRecordStore::new());

    let first = Catalog::open_with_store(Arc::clone(&store), None, 8, 8).unwrap();
    let second = Catalog::open_with_store(Arc::clone(&store), None, 8, 8).unwrap();

    assert!(first.store_name().starts_with("catalog-"));
    assert_ne!(first.store_name(), second.store_name());
    assert!(store
        .exists(&Catalog::<MemoryRecordStore>::record_name(first.store_name()))
        .unwrap());
}

#[test]
fn test_load_missing_catalog() {
    let result = Catalog::load(MemoryRecordStore::new(), "ghost");

    assert!(matches!(result, Err(DedupError::RecordNotFound(ref name)) if name == "ghost.catalog"));
}

#[test]
fn test_open_corrupt_catalog_fails() {
    let store = MemoryRecordStore::new();
    store.write("bad.catalog", b"garbage bytes").unwrap();

    let result = Catalog::open_with_store(store, Some("bad"), 8, 8);

    assert!(matches!(result, Err(DedupError::Corrupt(_))));
}

#[test]
fn test_get_reloads_container_every_time() {
    let mut catalog = memory_catalog(8, 8);
    catalog.put_block("key", b"value").unwrap();
    let hash = catalog.hash_for_key("key").unwrap().clone();
    let id = catalog.container_for_hash(&hash).unwrap();

    let mut container: Container = catalog.load_container(id).unwrap();
    container.remove_unit_by_hash(catalog.store(), &hash).unwrap();

    assert!(matches!(catalog.get_block("key"), Err(DedupError::Corrupt(_))));

    catalog.store().remove(&id.record_name()).unwrap();
    assert!(matches!(
        catalog.get_block("key"),
        Err(DedupError::RecordNotFound(_))
    ));
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_zero_capacities_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let zero_block = Config::builder()
        .data_dir(temp_dir.path())
        .block_capacity(0)
        .build();
    assert!(matches!(Catalog::open(zero_block), Err(DedupError::Config(_))));

    let zero_container =
        Catalog::open_with_store(MemoryRecordStore::new(), Some("x"), 8, 0);
    assert!(matches!(zero_container, Err(DedupError::Config(_))));
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.block_capacity, 8);
    assert_eq!(config.container_capacity, 8);
    assert!(config.store_name.is_none());
    assert!(config.validate().is_ok());
}
