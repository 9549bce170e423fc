//! Index manager
//!
//! Owns one `FieldIndex` per indexed field and applies every record
//! mutation to the affected buckets inline, so the record map and the
//! index map are never observable in disagreement.
//!
//! Indices are derived data: any index can be rebuilt from a full scan of
//! the record map, and `rebuild` is exactly that scan.

use std::collections::BTreeMap;

use serde_json::Value;

use super::bucket::FieldIndex;
use super::key::IndexKey;
use crate::store::record::{Record, RecordId};

/// Portable form of the index map used by the snapshot codec:
/// field name -> list of (value, ascending ids) pairs.
pub type PortableIndexMap = BTreeMap<String, Vec<(Value, Vec<RecordId>)>>;

/// Maintains the per-field bucket maps.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexManager {
    indexes: BTreeMap<String, FieldIndex>,
}

impl IndexManager {
    /// Creates a new manager with no indexed fields
    pub fn new() -> Self {
        Self {
            indexes: BTreeMap::new(),
        }
    }

    /// Returns true if the field is indexed
    pub fn is_indexed(&self, field: &str) -> bool {
        self.indexes.contains_key(field)
    }

    /// Names of the indexed fields, in lexicographic order
    pub fn indexed_fields(&self) -> Vec<&str> {
        self.indexes.keys().map(String::as_str).collect()
    }

    /// The bucket map for one field, if indexed
    pub fn field_index(&self, field: &str) -> Option<&FieldIndex> {
        self.indexes.get(field)
    }

    /// Build the index for `field` by a full scan of the current records.
    ///
    /// Replaces any existing index on the field. The caller is responsible
    /// for having rejected records whose value for `field` is not a scalar.
    pub fn rebuild<'a>(&mut self, field: &str, records: impl Iterator<Item = &'a Record>) {
        let mut index = FieldIndex::new();
        for record in records {
            if let Some(key) = record.get(field).as_ref().and_then(IndexKey::from_value) {
                index.insert(key, record.id());
            }
        }
        self.indexes.insert(field.to_string(), index);
    }

    /// Discard the index on `field`. Returns false when it was not indexed.
    pub fn drop_index(&mut self, field: &str) -> bool {
        self.indexes.remove(field).is_some()
    }

    /// Add a freshly inserted record to every index.
    pub fn apply_insert(&mut self, record: &Record) {
        for (field, index) in &mut self.indexes {
            if let Some(key) = record.get(field).as_ref().and_then(IndexKey::from_value) {
                index.insert(key, record.id());
            }
        }
    }

    /// Re-key one field's bucket for a value change on `id`.
    ///
    /// No-op when the field is not indexed.
    pub fn apply_update(&mut self, field: &str, id: RecordId, old: &Value, new: &Value) {
        if let Some(index) = self.indexes.get_mut(field) {
            if let Some(key) = IndexKey::from_value(old) {
                index.remove(&key, id);
            }
            if let Some(key) = IndexKey::from_value(new) {
                index.insert(key, id);
            }
        }
    }

    /// Remove a deleted record from every index.
    pub fn apply_delete(&mut self, record: &Record) {
        for (field, index) in &mut self.indexes {
            if let Some(key) = record.get(field).as_ref().and_then(IndexKey::from_value) {
                index.remove(&key, record.id());
            }
        }
    }

    /// The ids bucketed under `value` for `field`.
    ///
    /// `None` when the field is not indexed; an empty slice when it is but
    /// no record holds the value.
    pub fn lookup(&self, field: &str, value: &Value) -> Option<&[RecordId]> {
        let index = self.indexes.get(field)?;
        match IndexKey::from_value(value) {
            Some(key) => Some(index.ids_for(&key)),
            None => Some(&[]),
        }
    }

    /// Export as the portable snapshot form.
    pub fn to_portable(&self) -> PortableIndexMap {
        self.indexes
            .iter()
            .map(|(field, index)| {
                let entries = index
                    .entries()
                    .map(|(key, ids)| (key.to_value(), ids.to_vec()))
                    .collect();
                (field.clone(), entries)
            })
            .collect()
    }

    /// Reconstruct a manager from the portable snapshot form.
    pub fn from_portable(portable: &PortableIndexMap) -> Self {
        let mut manager = Self::new();
        for (field, entries) in portable {
            let mut index = FieldIndex::new();
            for (value, ids) in entries {
                if let Some(key) = IndexKey::from_value(value) {
                    for id in ids {
                        index.insert(key.clone(), *id);
                    }
                }
            }
            manager.indexes.insert(field.clone(), index);
        }
        manager
    }
}
