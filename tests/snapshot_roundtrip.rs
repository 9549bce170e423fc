//! Snapshot round trip
//!
//! `commit()` followed by `open()` on a fresh store handle must yield a
//! record map, schema, and index maps equal to those before the commit.

use serde_json::json;
use tempfile::TempDir;

use reclite::store::{FieldDef, OnExists, Record, Schema, Store, StoreConfig, StoreError};

fn populated(path: &std::path::Path) -> Store {
    let schema = Schema::new(vec![
        FieldDef::new("name"),
        FieldDef::with_default("age", json!(0)),
        FieldDef::new("size"),
    ])
    .unwrap();

    let mut db = Store::create(StoreConfig::at_path(path), schema, OnExists::Fail).unwrap();
    db.insert(&[("name", json!("homer")), ("age", json!(23)), ("size", json!(1.84))])
        .unwrap();
    db.insert(&[("name", json!("marge")), ("age", json!(36)), ("size", json!(1.94))])
        .unwrap();
    db.insert(&[("name", json!("bart")), ("age", json!(10))]).unwrap();
    db.create_index(&["age", "name"]).unwrap();
    db
}

fn assert_same_state(before: &Store, after: &Store) {
    assert_eq!(before.len(), after.len());
    assert_eq!(
        before.schema().field_names().collect::<Vec<_>>(),
        after.schema().field_names().collect::<Vec<_>>()
    );
    let lhs: Vec<&Record> = before.iter().collect();
    let rhs: Vec<&Record> = after.iter().collect();
    assert_eq!(lhs, rhs);

    assert_eq!(before.indexed_fields(), after.indexed_fields());
    for field in before.indexed_fields() {
        let lhs_view = before.index(field).unwrap();
        let rhs_view = after.index(field).unwrap();
        assert_eq!(lhs_view.keys(), rhs_view.keys());
        for key in lhs_view.keys() {
            assert_eq!(lhs_view.records_for(&key), rhs_view.records_for(&key));
        }
    }
}

#[test]
fn test_commit_open_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.rdb");

    let db = populated(&path);
    db.commit().unwrap();

    let reopened = Store::open(StoreConfig::at_path(&path)).unwrap();
    assert_same_state(&db, &reopened);
}

#[test]
fn test_reopened_store_allocates_past_old_ids() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.rdb");

    let mut db = populated(&path);
    db.delete_one(2).unwrap();
    db.commit().unwrap();

    let mut reopened = Store::open(StoreConfig::at_path(&path)).unwrap();
    let id = reopened.insert(&[("name", json!("lisa"))]).unwrap();
    assert_eq!(id, 3, "counter must not reuse ids freed before the snapshot");
}

#[test]
fn test_reopened_index_still_accelerates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.rdb");

    let db = populated(&path);
    db.commit().unwrap();
    drop(db);

    let mut reopened = Store::open(StoreConfig::at_path(&path)).unwrap();
    let matched = reopened.select(&[("age", json!(23))]).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].get("name"), Some(json!("homer")));

    // the reopened index keeps absorbing mutations
    reopened.insert(&[("name", json!("abe")), ("age", json!(23))]).unwrap();
    let matched = reopened.select(&[("age", json!(23))]).unwrap();
    assert_eq!(matched.len(), 2);
}

#[test]
fn test_uncommitted_changes_not_persisted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.rdb");

    let mut db = populated(&path);
    db.commit().unwrap();
    db.insert(&[("name", json!("lisa"))]).unwrap();
    // no commit for the last insert
    drop(db);

    let reopened = Store::open(StoreConfig::at_path(&path)).unwrap();
    assert_eq!(reopened.len(), 3);
}

#[test]
fn test_schema_changes_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.rdb");

    let mut db = populated(&path);
    db.add_field("job", json!("none")).unwrap();
    db.drop_field("size").unwrap();
    // add_field / drop_field persist on their own

    let reopened = Store::open(StoreConfig::at_path(&path)).unwrap();
    let names: Vec<&str> = reopened.schema().field_names().collect();
    assert_eq!(names, vec!["name", "age", "job"]);
    assert_eq!(reopened.get(0).unwrap().get("job"), Some(json!("none")));
    assert_eq!(reopened.get(0).unwrap().get("size"), None);

    assert_same_state(&db, &reopened);
}

#[test]
fn test_versions_survive_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.rdb");

    let mut db = populated(&path);
    db.update(0, &[("age", json!(24))]).unwrap();
    db.update(0, &[("age", json!(25))]).unwrap();
    db.commit().unwrap();

    let reopened = Store::open(StoreConfig::at_path(&path)).unwrap();
    assert_eq!(reopened.get(0).unwrap().version(), 2);
    assert_eq!(reopened.get(1).unwrap().version(), 0);
}

#[test]
fn test_open_missing_file_not_found() {
    let dir = TempDir::new().unwrap();
    let err = Store::open(StoreConfig::at_path(dir.path().join("missing.rdb"))).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn test_open_truncated_snapshot_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.rdb");

    let db = populated(&path);
    db.commit().unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let err = Store::open(StoreConfig::at_path(&path)).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

#[test]
fn test_open_garbage_snapshot_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.rdb");
    std::fs::write(&path, b"{\"not\": \"a snapshot\"}\ngarbage").unwrap();

    let err = Store::open(StoreConfig::at_path(&path)).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

#[test]
fn test_in_memory_store_never_touches_disk() {
    let mut db = Store::in_memory(Schema::from_names(["name"]).unwrap());
    db.insert(&[("name", json!("homer"))]).unwrap();
    db.commit().unwrap(); // no-op, no path to write
    assert!(db.config().path().is_none());
    assert!(!db.config().is_persistent());
}
