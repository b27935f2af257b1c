//! Layer merging through standalone managers.
//!
//! Each test builds its own [`PropertyManager`] over the fixture trees in
//! `tests/resources`, so none of them touch the shared instance or the
//! process environment.
#![allow(
    unfulfilled_lint_expectations,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
#![expect(
    clippy::expect_used,
    reason = "tests panic to surface fixture and setup failures"
)]

use krausening::{FixedEnvironment, KrauseningError, ManagerSettings, PropertyManager};
use rstest::{fixture, rstest};
use std::sync::Arc;
use test_helpers::fixtures::PropertyTree;

const EXAMPLE: &str = "example.properties";

fn resource(name: &str) -> String {
    format!("{}/tests/resources/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn manager(base: Option<&str>, extensions: Option<&str>) -> PropertyManager {
    let mut settings = ManagerSettings::new();
    if let Some(dir) = base {
        settings = settings.with_base(resource(dir));
    }
    if let Some(dir) = extensions {
        settings = settings.with_extensions(resource(dir));
    }
    let env = FixedEnvironment::new().with_var("region", "us-east-1");
    PropertyManager::with_environment(settings, Arc::new(env)).expect("build manager")
}

#[fixture]
fn layered() -> PropertyManager {
    manager(Some("base"), Some("extensions"))
}

#[rstest]
fn reads_base_value() {
    let props = manager(Some("base"), None)
        .get_properties(EXAMPLE)
        .expect("load");
    assert!(props.has_sources());
    assert_eq!(props.get("foo").as_deref(), Some("bar"));
}

#[rstest]
#[case::not_overridden("foo", "bar")]
#[case::overridden("override.me", "some-localized-value")]
#[case::added_by_extension("newly.added.in.extensions", "new.value")]
fn extension_layers_over_base(layered: PropertyManager, #[case] key: &str, #[case] expected: &str) {
    let props = layered.get_properties(EXAMPLE).expect("load");
    assert_eq!(props.get(key).as_deref(), Some(expected));
    assert!(props.has(key));
    assert_eq!(props.sources().len(), 2);
}

#[rstest]
fn without_any_location_sets_are_empty() {
    let props = manager(None, None).get_properties(EXAMPLE).expect("load");
    assert!(props.is_empty());
    assert!(!props.has_sources());
    assert_eq!(props.get("region").as_deref(), Some("us-east-1"));
}

#[rstest]
fn nonexistent_base_location_is_tolerated() {
    let props = manager(Some("does-not-exist"), None)
        .get_properties(EXAMPLE)
        .expect("load");
    assert!(!props.has_sources());
}

#[rstest]
fn nonexistent_extensions_location_keeps_base() {
    let props = manager(Some("base"), Some("does-not-exist"))
        .get_properties(EXAMPLE)
        .expect("load");
    assert_eq!(props.get("foo").as_deref(), Some("bar"));
    assert_eq!(props.get("newly.added.in.extensions"), None);
}

#[rstest]
fn empty_file_yields_empty_set() {
    let props = manager(Some("base"), None)
        .get_properties("empty.properties")
        .expect("load");
    assert!(props.has_sources());
    assert!(props.is_empty());
    assert_eq!(props.get("newly.added.in.extensions"), None);
}

#[rstest]
fn empty_base_location_has_no_sources() {
    let props = manager(Some("empty"), None)
        .get_properties(EXAMPLE)
        .expect("load");
    assert!(!props.has_sources());
}

#[rstest]
fn empty_extensions_location_keeps_base() {
    let props = manager(Some("base"), Some("empty"))
        .get_properties(EXAMPLE)
        .expect("load");
    assert_eq!(props.get("foo").as_deref(), Some("bar"));
}

#[rstest]
fn non_properties_files_are_not_loaded() {
    let props = manager(Some("not-just-properties-files"), Some("empty"))
        .get_properties("some-other-configuration-file.xml")
        .expect("load");
    assert!(!props.has_sources());
    assert!(props.is_empty());
}

#[rstest]
#[case::layered(Some("base"), Some("extensions"), &["empty.properties", "example.properties"])]
#[case::mixed_files(Some("not-just-properties-files"), Some("empty"), &["example.properties"])]
#[case::missing(Some("does-not-exist"), None, &[])]
#[case::unset(None, None, &[])]
fn lists_available_files(
    #[case] base: Option<&str>,
    #[case] extensions: Option<&str>,
    #[case] expected: &[&str],
) {
    let files = manager(base, extensions)
        .available_files()
        .expect("list files");
    assert_eq!(files, expected);
}

#[rstest]
fn invalid_file_names_are_rejected(layered: PropertyManager) {
    let err = layered
        .get_properties("../base/example.properties")
        .expect_err("rejected");
    assert!(matches!(&*err, KrauseningError::InvalidFileName { .. }));
    assert!(layered.cached_files().is_empty());
}

#[rstest]
fn base_file_in_place_of_directory_is_fatal() {
    let settings = ManagerSettings::new().with_base(resource("base/example.properties"));
    let err = PropertyManager::new(settings).expect_err("not a directory");
    assert!(matches!(&*err, KrauseningError::NotADirectory { .. }));
}

fn encrypted_manager(password: Option<&str>) -> PropertyManager {
    let mut settings = ManagerSettings::new().with_base(resource("encrypted"));
    if let Some(password) = password {
        settings = settings.with_password(password);
    }
    PropertyManager::with_environment(settings, Arc::new(FixedEnvironment::new()))
        .expect("build manager")
}

#[rstest]
fn encrypted_values_are_decrypted_with_the_master_password() {
    let props = encrypted_manager(Some("krausening-secret"))
        .get_properties("secret.properties")
        .expect("load");
    assert_eq!(props.get("db.password").as_deref(), Some("s3cr3t-value"));
    assert_eq!(props.get("db.user").as_deref(), Some("app"));
}

#[rstest]
fn encrypted_values_are_returned_as_written_without_a_password() {
    let props = encrypted_manager(None)
        .get_properties("secret.properties")
        .expect("load");
    assert_eq!(
        props.get("db.password").as_deref(),
        Some("ENC(AQIDBAUGBwj3Qb33R3zI99gZHLwn50cq)")
    );
}

#[rstest]
fn wrong_master_password_fails_the_load() {
    let manager = encrypted_manager(Some("not-the-password"));
    let err = manager
        .get_properties("secret.properties")
        .expect_err("cannot decrypt");
    assert!(matches!(
        &*err,
        KrauseningError::Decrypt { key, .. } if key == "db.password"
    ));
    assert!(manager.cached_files().is_empty());
}

#[rstest]
fn repeated_lookups_share_one_snapshot(layered: PropertyManager) {
    let first = layered.get_properties(EXAMPLE).expect("load");
    let second = layered.get_properties(EXAMPLE).expect("load");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(layered.cached_files(), vec![EXAMPLE]);
    assert!(layered.is_watching());
    layered.stop();
    assert!(!layered.is_watching());
    let third = layered.get_properties(EXAMPLE).expect("load after stop");
    assert!(Arc::ptr_eq(&first, &third));
    assert!(!layered.is_watching());
}

struct TreeManager {
    manager: PropertyManager,
    tree: PropertyTree,
}

#[fixture]
fn tree_manager() -> TreeManager {
    let tree = PropertyTree::new().expect("property tree");
    tree.write_base("a.properties", "value=a1\n").expect("write a");
    tree.write_base("b.properties", "value=b1\n").expect("write b");
    let settings = ManagerSettings::new()
        .with_base(tree.base_dir())
        .with_extensions(tree.extensions_dir());
    let manager = PropertyManager::with_environment(settings, Arc::new(FixedEnvironment::new()))
        .expect("build manager");
    manager.stop();
    TreeManager { manager, tree }
}

#[rstest]
fn reload_all_rebuilds_every_cached_set(tree_manager: TreeManager) {
    let TreeManager { manager, tree } = tree_manager;
    let old_a = manager.get_properties("a.properties").expect("load a");
    manager.get_properties("b.properties").expect("load b");
    tree.write_base("a.properties", "value=a2\n").expect("rewrite a");
    tree.write_extension("b.properties", "value=b2\n").expect("extend b");
    assert_eq!(manager.reload_all().expect("reload"), 2);
    let a = manager.get_properties("a.properties").expect("load a");
    let b = manager.get_properties("b.properties").expect("load b");
    assert_eq!(a.get("value").as_deref(), Some("a2"));
    assert_eq!(b.get("value").as_deref(), Some("b2"));
    assert_eq!(old_a.get("value").as_deref(), Some("a1"));
}

#[rstest]
fn reload_all_reports_failures_but_finishes(tree_manager: TreeManager) {
    let TreeManager { manager, tree } = tree_manager;
    let old_a = manager.get_properties("a.properties").expect("load a");
    manager.get_properties("b.properties").expect("load b");
    tree.write_base("a.properties", "value=\\uBAD\n").expect("break a");
    tree.write_base("b.properties", "value=b2\n").expect("rewrite b");
    let err = manager.reload_all().expect_err("a fails");
    assert!(matches!(&*err, KrauseningError::Parse { .. }));
    let a = manager.get_properties("a.properties").expect("cached a");
    let b = manager.get_properties("b.properties").expect("load b");
    assert!(Arc::ptr_eq(&a, &old_a));
    assert_eq!(b.get("value").as_deref(), Some("b2"));
}

#[rstest]
fn invalidate_forces_a_fresh_load(tree_manager: TreeManager) {
    let TreeManager { manager, tree } = tree_manager;
    let old = manager.get_properties("a.properties").expect("load a");
    tree.write_base("a.properties", "value=a3\n").expect("rewrite a");
    assert!(manager.invalidate("a.properties"));
    let fresh = manager.get_properties("a.properties").expect("reload a");
    assert_eq!(fresh.get("value").as_deref(), Some("a3"));
    assert_eq!(old.get("value").as_deref(), Some("a1"));
}
