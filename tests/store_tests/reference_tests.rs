//! ValueRef Tests

use embedkv::{KvStore, KvStoreExt, MemoryBackend, ValueRef};

fn open_store() -> MemoryBackend {
    let store = MemoryBackend::new();
    store.begin().unwrap();
    store
}

#[test]
fn test_bind_loads_current_value() {
    let store = open_store();
    store.put_u32("count", 12).unwrap();

    let count = store.bind("count", 0u32).unwrap();
    assert_eq!(count.cached(), 12);
    assert_eq!(count.key(), "count");
}

#[test]
fn test_bind_missing_key_uses_default() {
    let store = open_store();

    let level = store.bind("level", 5i16).unwrap();
    assert_eq!(level.cached(), 5);
    assert!(!level.exists().unwrap());
}

#[test]
fn test_assign_writes_through() {
    let store = open_store();
    let mut count = store.bind("count", 0u32).unwrap();

    assert_eq!(count.assign(41).unwrap(), 4);
    assert_eq!(count.cached(), 41);
    assert_eq!(store.get_u32("count", 0).unwrap(), 41);
}

#[test]
fn test_two_references_to_one_key() {
    let store = open_store();
    let mut first = store.bind("count", 0u32).unwrap();
    let mut second = store.bind("count", 0u32).unwrap();

    first.assign(7).unwrap();

    // The second cache is stale until it reads the store again
    assert_eq!(second.cached(), 0);
    assert_eq!(second.read().unwrap(), 7);
    assert_eq!(second.cached(), 7);

    second.assign(8).unwrap();
    assert_eq!(first.cached(), 7);
    assert_eq!(first.load().unwrap(), 8);
}

#[test]
fn test_save_persists_cache() {
    let store = open_store();
    let mut flag = ValueRef::new(&store, "flag", true);

    assert!(!store.exists("flag").unwrap());
    assert_eq!(flag.save().unwrap(), 1);
    assert!(store.get_bool("flag", false).unwrap());
    assert!(flag.load().unwrap());
}

#[test]
fn test_remove_through_reference() {
    let store = open_store();
    let mut temp = store.bind("temp", 0i32).unwrap();
    temp.assign(-42).unwrap();

    assert!(temp.remove().unwrap());
    assert!(!temp.exists().unwrap());
    assert!(!store.exists("temp").unwrap());
}
