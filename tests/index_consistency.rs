//! Index / record consistency invariant
//!
//! For all sequences of insert/update/delete, after each operation every
//! indexed field's bucket map must exactly equal the map obtained by
//! rebuilding it from scratch via a full scan of the records.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use reclite::store::{Record, RecordId, Schema, Store};

const NAMES: &[&str] = &["homer", "marge", "bart", "lisa", "maggie"];

/// Brute-force bucket map for one field: value (as JSON text) -> ascending ids.
fn scan_buckets(db: &Store, field: &str) -> BTreeMap<String, Vec<RecordId>> {
    let mut buckets: BTreeMap<String, Vec<RecordId>> = BTreeMap::new();
    for record in db.iter() {
        if let Some(value) = record.get(field) {
            buckets.entry(value.to_string()).or_default().push(record.id());
        }
    }
    // iteration is ascending by id, so each bucket is already sorted
    buckets
}

/// Bucket map as reported by the live index.
fn index_buckets(db: &Store, field: &str) -> BTreeMap<String, Vec<RecordId>> {
    let view = db.index(field).unwrap();
    view.keys()
        .iter()
        .map(|key| {
            let ids = view
                .records_for(key)
                .iter()
                .map(Record::id)
                .collect::<Vec<_>>();
            (key.to_string(), ids)
        })
        .collect()
}

fn assert_indices_consistent(db: &Store, step: usize) {
    for field in db.indexed_fields() {
        assert_eq!(
            index_buckets(db, field),
            scan_buckets(db, field),
            "index on {} diverged from scan at step {}",
            field,
            step
        );
    }
}

fn random_value(rng: &mut StdRng) -> Value {
    match rng.gen_range(0..4) {
        0 => json!(NAMES[rng.gen_range(0..NAMES.len())]),
        1 => json!(rng.gen_range(0..5i64)),
        2 => json!(rng.gen_range(0..3) as f64 / 2.0),
        _ => Value::Null,
    }
}

#[test]
fn test_buckets_equal_full_scan_after_every_operation() {
    let mut rng = StdRng::seed_from_u64(0xDB);
    let mut db = Store::in_memory(Schema::from_names(["name", "age", "tag"]).unwrap());
    db.create_index(&["name", "age"]).unwrap();

    for step in 0..400 {
        let live: Vec<RecordId> = db.iter().map(Record::id).collect();
        match rng.gen_range(0..3) {
            0 => {
                db.insert(&[
                    ("name", random_value(&mut rng)),
                    ("age", random_value(&mut rng)),
                    ("tag", random_value(&mut rng)),
                ])
                .unwrap();
            }
            1 if !live.is_empty() => {
                let id = live[rng.gen_range(0..live.len())];
                let field = ["name", "age", "tag"][rng.gen_range(0..3)];
                db.update(id, &[(field, random_value(&mut rng))]).unwrap();
            }
            2 if !live.is_empty() => {
                let id = live[rng.gen_range(0..live.len())];
                db.delete_one(id).unwrap();
            }
            _ => {
                db.insert(&[("name", random_value(&mut rng))]).unwrap();
            }
        }
        assert_indices_consistent(&db, step);
    }
}

#[test]
fn test_consistency_survives_batch_operations() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut db = Store::in_memory(Schema::from_names(["name", "age"]).unwrap());
    db.create_index(&["age"]).unwrap();

    for step in 0..50 {
        let rows: Vec<Vec<(&str, Value)>> = (0..rng.gen_range(1..5))
            .map(|_| {
                vec![
                    ("name", random_value(&mut rng)),
                    ("age", random_value(&mut rng)),
                ]
            })
            .collect();
        let row_slices: Vec<&[(&str, Value)]> = rows.iter().map(Vec::as_slice).collect();
        let ids = db.insert_batch(&row_slices).unwrap();
        assert_indices_consistent(&db, step);

        db.update_many(&ids, &[("age", random_value(&mut rng))]).unwrap();
        assert_indices_consistent(&db, step);

        if rng.gen_bool(0.5) {
            db.delete(&ids).unwrap();
            assert_indices_consistent(&db, step);
        }
    }
}

#[test]
fn test_index_created_late_equals_scan() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut db = Store::in_memory(Schema::from_names(["name", "age"]).unwrap());

    for _ in 0..100 {
        db.insert(&[("name", random_value(&mut rng)), ("age", random_value(&mut rng))])
            .unwrap();
    }
    db.create_index(&["name", "age"]).unwrap();
    assert_indices_consistent(&db, 0);
}
