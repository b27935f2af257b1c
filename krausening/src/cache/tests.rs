//! Tests for snapshot caching, refresh and invalidation.
#![allow(
    unfulfilled_lint_expectations,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
#![expect(
    clippy::expect_used,
    reason = "tests panic to surface fixture and setup failures"
)]

use super::*;
use crate::environment::FixedEnvironment;
use rstest::{fixture, rstest};
use std::sync::Barrier;
use std::thread;
use test_helpers::fixtures::PropertyTree;

struct Harness {
    tree: PropertyTree,
    cache: Arc<PropertyCache>,
}

#[fixture]
fn harness() -> Harness {
    let tree = PropertyTree::new().expect("property tree");
    tree.write_base("test.properties", "greeting=hello\noverride.me=base\n")
        .expect("write base");
    tree.write_extension("test.properties", "override.me=local\n")
        .expect("write extension");
    let locations = Locations::new(
        Some(tree.base_dir().to_path_buf()),
        Some(tree.extensions_dir().to_path_buf()),
    )
    .expect("locations");
    let resolver = Resolver::new(Arc::new(FixedEnvironment::new()));
    let cache = Arc::new(PropertyCache::new(locations, resolver));
    Harness { tree, cache }
}

#[rstest]
fn loads_and_memoises(harness: Harness) {
    let first = harness.cache.get_or_load("test.properties").expect("load");
    assert_eq!(first.get("greeting").as_deref(), Some("hello"));
    assert_eq!(first.get("override.me").as_deref(), Some("local"));
    assert_eq!(first.sources().len(), 2);
    let second = harness.cache.get_or_load("test.properties").expect("load");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(harness.cache.cached_names(), vec!["test.properties"]);
}

#[rstest]
fn concurrent_first_loads_share_one_build(harness: Harness) {
    const CALLERS: usize = 8;
    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let cache = Arc::clone(&harness.cache);
            let gate = Arc::clone(&barrier);
            thread::spawn(move || {
                gate.wait();
                cache.get_or_load("test.properties").expect("load")
            })
        })
        .collect();
    let sets: Vec<Arc<PropertySet>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("caller thread"))
        .collect();
    let first = sets.first().expect("at least one set");
    assert!(sets.iter().all(|set| Arc::ptr_eq(set, first)));
    assert_eq!(first.generation(), 1);
    let refreshed = harness
        .cache
        .refresh("test.properties")
        .expect("refresh")
        .expect("cached");
    assert_eq!(refreshed.generation(), 2, "only one build ran before refresh");
}

#[rstest]
fn refresh_swaps_without_touching_old_snapshot(harness: Harness) {
    let old = harness.cache.get_or_load("test.properties").expect("load");
    harness
        .tree
        .write_base("test.properties", "greeting=bonjour\n")
        .expect("rewrite base");
    let new = harness
        .cache
        .refresh("test.properties")
        .expect("refresh")
        .expect("cached");
    assert_eq!(old.get("greeting").as_deref(), Some("hello"));
    assert_eq!(new.get("greeting").as_deref(), Some("bonjour"));
    assert!(new.generation() > old.generation());
    let current = harness.cache.get_or_load("test.properties").expect("load");
    assert!(Arc::ptr_eq(&current, &new));
}

#[rstest]
fn failed_refresh_keeps_previous_entry(harness: Harness) {
    let old = harness.cache.get_or_load("test.properties").expect("load");
    harness
        .tree
        .write_base("test.properties", "broken=\\u12\n")
        .expect("rewrite base");
    assert!(harness.cache.refresh("test.properties").is_err());
    let current = harness.cache.peek("test.properties").expect("still cached");
    assert!(Arc::ptr_eq(&current, &old));
}

#[rstest]
fn failed_first_load_is_not_cached(harness: Harness) {
    harness
        .tree
        .write_base("broken.properties", "k=\\uXYZW\n")
        .expect("write broken");
    assert!(harness.cache.get_or_load("broken.properties").is_err());
    assert!(harness.cache.peek("broken.properties").is_none());
    assert_eq!(harness.cache.slot_count(), 0, "no empty slot is left behind");
    assert!(harness.cache.cached_names().iter().all(|n| n != "broken.properties"));
    harness
        .tree
        .write_base("broken.properties", "k=fixed\n")
        .expect("fix file");
    let set = harness.cache.get_or_load("broken.properties").expect("retry");
    assert_eq!(set.get("k").as_deref(), Some("fixed"));
}

#[rstest]
fn refresh_of_unknown_name_is_none(harness: Harness) {
    assert!(harness.cache.refresh("other.properties").expect("refresh").is_none());
}

#[rstest]
fn invalidate_drops_entry_but_not_snapshots(harness: Harness) {
    let old = harness.cache.get_or_load("test.properties").expect("load");
    assert!(harness.cache.invalidate("test.properties"));
    assert!(!harness.cache.invalidate("test.properties"));
    assert!(harness.cache.peek("test.properties").is_none());
    assert_eq!(old.get("greeting").as_deref(), Some("hello"));
    let reloaded = harness.cache.get_or_load("test.properties").expect("load");
    assert!(!Arc::ptr_eq(&old, &reloaded));
}

#[rstest]
fn missing_file_caches_empty_set(harness: Harness) {
    let set = harness.cache.get_or_load("absent.properties").expect("load");
    assert!(set.is_empty());
    assert!(!set.has_sources());
    let cached = harness.cache.peek("absent.properties").expect("cached");
    assert!(Arc::ptr_eq(&cached, &set));
}

#[rstest]
fn only_the_first_lookup_reports_a_build(harness: Harness) {
    let (first, built) = harness.cache.get_or_build("test.properties").expect("load");
    assert!(built);
    let (second, built_again) = harness.cache.get_or_build("test.properties").expect("load");
    assert!(!built_again);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(harness.cache.slot_count(), 1);
}

#[rstest]
fn invalid_names_create_no_slot(harness: Harness) {
    assert!(harness.cache.get_or_load("../escape.properties").is_err());
    assert_eq!(harness.cache.slot_count(), 0);
}
