//! Store lifecycle and record mutation
//!
//! The store owns the record map, the identifier counter, and the index
//! manager, and mutates them together: any operation that changes a
//! record's value for an indexed field updates the matching bucket as part
//! of the same logical step. Single-threaded by design; `&mut self` on
//! every mutating operation is the whole concurrency story.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::errors::{StoreError, StoreResult};
use super::record::{Record, RecordId};
use super::schema::Schema;
use crate::index::{IndexKey, IndexManager};
use crate::snapshot::{self, SnapshotBody, FORMAT_VERSION};

/// Behavior of `create` when the snapshot file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnExists {
    /// Fail with `AlreadyExists`
    Fail,
    /// Discard the existing snapshot and start empty
    Override,
    /// Open the existing snapshot instead (the given schema is ignored)
    Open,
}

/// Store construction parameters.
///
/// Persistence is decided here, explicitly, once: a store built with no
/// path never touches the filesystem and `commit` is a no-op.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    path: Option<PathBuf>,
    format_version: u8,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl StoreConfig {
    /// Pure in-memory store: no snapshot file, `commit` is a no-op.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            format_version: FORMAT_VERSION,
        }
    }

    /// Store persisted to a snapshot file at `path`.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            format_version: FORMAT_VERSION,
        }
    }

    /// Override the snapshot format version written by `commit`.
    pub fn with_format_version(mut self, version: u8) -> Self {
        self.format_version = version;
        self
    }

    /// The snapshot path, `None` for an in-memory store
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True when the store writes snapshots
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    /// True when a snapshot file is present at the configured path.
    ///
    /// Always false for an in-memory store.
    pub fn snapshot_exists(&self) -> bool {
        self.path.as_deref().map_or(false, Path::exists)
    }

    /// The snapshot format version `commit` writes
    pub fn format_version(&self) -> u8 {
        self.format_version
    }
}

/// The record store.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    schema: Schema,
    next_id: RecordId,
    records: BTreeMap<RecordId, Record>,
    pub(super) indexes: IndexManager,
}

impl Store {
    /// Create a pure in-memory store with the given schema.
    pub fn in_memory(schema: Schema) -> Self {
        Self {
            config: StoreConfig::in_memory(),
            schema,
            next_id: 0,
            records: BTreeMap::new(),
            indexes: IndexManager::new(),
        }
    }

    /// Create a new store.
    ///
    /// When the snapshot file already exists, `on_exists` decides:
    /// `Fail` surfaces `AlreadyExists`, `Override` discards the prior
    /// content, `Open` delegates to [`Store::open`] and ignores `schema`.
    /// A fresh store starts with an empty record map, a zeroed identifier
    /// counter and no indices, and writes an initial snapshot.
    pub fn create(config: StoreConfig, schema: Schema, on_exists: OnExists) -> StoreResult<Self> {
        if let Some(path) = config.path() {
            if path.exists() {
                if !path.is_file() {
                    return Err(StoreError::Io(format!(
                        "{} exists and is not a file",
                        path.display()
                    )));
                }
                match on_exists {
                    OnExists::Fail => return Err(StoreError::AlreadyExists(path.to_path_buf())),
                    OnExists::Open => return Self::open(config),
                    OnExists::Override => std::fs::remove_file(path)?,
                }
            }
        }

        let store = Self {
            config,
            schema,
            next_id: 0,
            records: BTreeMap::new(),
            indexes: IndexManager::new(),
        };
        store.commit()?;
        debug!(fields = store.schema.len(), "store created");
        Ok(store)
    }

    /// Open an existing store from its last snapshot.
    ///
    /// Fails with `NotFound` when no snapshot exists, `Corrupt` when the
    /// file does not decode as a consistent quadruple. Persisted buckets
    /// are checked against a fresh rebuild from the record map; a mismatch
    /// means the snapshot was cut mid-write, and since indices are derived
    /// data the rebuilt buckets win.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let Some(path) = config.path() else {
            return Err(StoreError::NotFound(
                "in-memory store has no snapshot to open".to_string(),
            ));
        };
        if !path.exists() {
            return Err(StoreError::NotFound(format!(
                "no snapshot at {}",
                path.display()
            )));
        }

        let body = snapshot::read_snapshot(path)?;
        let SnapshotBody {
            schema,
            next_id,
            records: rows,
            indices,
        } = body;

        let mut records = BTreeMap::new();
        let mut max_id = None;
        for record in rows {
            let id = record.id();
            if records.insert(id, record).is_some() {
                return Err(StoreError::Corrupt(format!("duplicate record id {}", id)));
            }
            max_id = Some(max_id.map_or(id, |m: RecordId| m.max(id)));
        }
        if let Some(max) = max_id {
            if next_id <= max {
                return Err(StoreError::Corrupt(format!(
                    "next id {} does not exceed max record id {}",
                    next_id, max
                )));
            }
        }

        for field in indices.keys() {
            if !schema.contains(field) {
                return Err(StoreError::Corrupt(format!(
                    "index on undeclared field {}",
                    field
                )));
            }
        }

        let persisted = IndexManager::from_portable(&indices);
        let mut rebuilt = IndexManager::new();
        for field in indices.keys() {
            rebuilt.rebuild(field, records.values());
        }
        let indexes = if persisted == rebuilt {
            persisted
        } else {
            warn!("persisted indices inconsistent with records, rebuilt from scan");
            rebuilt
        };

        debug!(records = records.len(), "store opened");
        Ok(Self {
            config,
            schema,
            next_id,
            records,
            indexes,
        })
    }

    /// Write the full snapshot: schema, counter, records, indices.
    ///
    /// No-op for an in-memory store. A failed write leaves the in-memory
    /// state untouched; the on-disk snapshot may be inconsistent until the
    /// next successful commit.
    pub fn commit(&self) -> StoreResult<()> {
        let Some(path) = self.config.path() else {
            return Ok(());
        };
        let body = SnapshotBody {
            schema: self.schema.clone(),
            next_id: self.next_id,
            records: self.records.values().cloned().collect(),
            indices: self.indexes.to_portable(),
        };
        snapshot::write_snapshot(path, &body, self.config.format_version())?;
        debug!(records = self.records.len(), "snapshot committed");
        Ok(())
    }

    /// The declared schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when a record with this id is live
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    /// The record with this id, as a snapshot.
    ///
    /// Fails with `NotFound` for an absent id.
    pub fn get(&self, id: RecordId) -> StoreResult<Record> {
        self.records
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::record_not_found(id))
    }

    /// Iterate over the live records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub(super) fn records(&self) -> &BTreeMap<RecordId, Record> {
        &self.records
    }

    /// Insert one record from field/value pairs.
    ///
    /// Unknown field names fail with `UnknownField`; unspecified fields
    /// take the schema default. The new record gets the next identifier
    /// and version 0, and lands in every index bucket in ascending-id
    /// position. Returns the new identifier.
    pub fn insert(&mut self, values: &[(&str, Value)]) -> StoreResult<RecordId> {
        for (name, _) in values {
            if !self.schema.contains(name) {
                return Err(StoreError::UnknownField((*name).to_string()));
            }
        }
        let mut fields = self.schema.defaults_row();
        for (name, value) in values {
            fields.insert((*name).to_string(), value.clone());
        }
        self.insert_fields(fields)
    }

    /// Insert one record from positional values, mapped onto schema order.
    ///
    /// Unspecified trailing fields take their defaults; surplus values
    /// beyond the declared fields are ignored.
    pub fn insert_values(&mut self, values: &[Value]) -> StoreResult<RecordId> {
        let mut fields = self.schema.defaults_row();
        for (name, value) in self.schema.field_names().zip(values.iter()) {
            fields.insert(name.to_string(), value.clone());
        }
        self.insert_fields(fields)
    }

    /// Insert a batch of records, each independently, returning all ids.
    ///
    /// This is the batch half of the insert contract: each row goes
    /// through the same path as [`Store::insert`], so a failing row leaves
    /// the earlier rows inserted.
    pub fn insert_batch(&mut self, rows: &[&[(&str, Value)]]) -> StoreResult<Vec<RecordId>> {
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(self.insert(row)?);
        }
        Ok(ids)
    }

    fn insert_fields(&mut self, fields: BTreeMap<String, Value>) -> StoreResult<RecordId> {
        for field in self.indexes.indexed_fields() {
            if let Some(value) = fields.get(field) {
                if IndexKey::from_value(value).is_none() {
                    return Err(StoreError::UnindexableValue(field.to_string()));
                }
            }
        }

        let id = self.next_id;
        let record = Record::new(id, fields);
        self.indexes.apply_insert(&record);
        self.records.insert(id, record);
        self.next_id += 1;
        Ok(id)
    }

    /// Update one record. See [`Store::update_many`].
    pub fn update(&mut self, id: RecordId, changes: &[(&str, Value)]) -> StoreResult<()> {
        self.update_many(&[id], changes)
    }

    /// Apply the same field changes to each given record.
    ///
    /// Fields not in the schema are silently ignored. For each indexed
    /// changed field, the id moves from the old value's bucket to the new
    /// value's — skipped entirely when old equals new. Every updated
    /// record's version advances by exactly 1, whether or not any field
    /// value actually changed. Fails with `NotFound`, before mutating
    /// anything, when any id is absent.
    pub fn update_many(&mut self, ids: &[RecordId], changes: &[(&str, Value)]) -> StoreResult<()> {
        let changes: Vec<(&str, &Value)> = changes
            .iter()
            .filter(|(field, _)| self.schema.contains(field))
            .map(|(field, value)| (*field, value))
            .collect();

        let missing: Vec<RecordId> = ids
            .iter()
            .copied()
            .filter(|id| !self.records.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::records_not_found(&missing));
        }

        for (field, value) in &changes {
            if self.indexes.is_indexed(field) && IndexKey::from_value(value).is_none() {
                return Err(StoreError::UnindexableValue((*field).to_string()));
            }
        }

        for id in ids {
            let Some(record) = self.records.get_mut(id) else {
                continue;
            };
            for (field, value) in &changes {
                if let Some(old) = record.get(field) {
                    if old != **value {
                        self.indexes.apply_update(field, *id, &old, value);
                    }
                }
                record.set(field, (*value).clone());
            }
            record.bump_version();
        }
        Ok(())
    }

    /// Delete one record. Fails with `NotFound` for an absent id.
    pub fn delete_one(&mut self, id: RecordId) -> StoreResult<()> {
        self.delete(&[id]).map(|_| ())
    }

    /// Delete a batch of records, returning the count deleted.
    ///
    /// The whole batch is validated before anything is mutated: `NotFound`
    /// when any id is absent, `DuplicateId` when an id appears twice. A
    /// failed batch leaves the store completely unchanged.
    pub fn delete(&mut self, ids: &[RecordId]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut sorted = ids.to_vec();
        sorted.sort_unstable();

        let missing: Vec<RecordId> = sorted
            .iter()
            .copied()
            .filter(|id| !self.records.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::records_not_found(&missing));
        }
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(StoreError::DuplicateId(pair[0]));
            }
        }

        for id in &sorted {
            if let Some(record) = self.records.remove(id) {
                self.indexes.apply_delete(&record);
            }
        }
        Ok(sorted.len())
    }

    /// Append a field to the schema, back-filling every record with
    /// `default`.
    ///
    /// Fails with `AlreadyDefined` when the name collides with an existing
    /// field and `ReservedField` for `__id__`/`__version__`. Persists.
    pub fn add_field(&mut self, name: &str, default: Value) -> StoreResult<()> {
        self.schema.add_field(name, default.clone())?;
        for record in self.records.values_mut() {
            record.set(name, default.clone());
        }
        self.commit()
    }

    /// Remove a field from the schema and from every record, deleting any
    /// index built on it.
    ///
    /// Fails with `ReservedField` for `__id__`/`__version__` and
    /// `UnknownField` when the field is not declared. Persists.
    pub fn drop_field(&mut self, name: &str) -> StoreResult<()> {
        self.schema.drop_field(name)?;
        for record in self.records.values_mut() {
            record.remove_field(name);
        }
        self.indexes.drop_index(name);
        self.commit()
    }

    /// Build indices on the named fields.
    ///
    /// Fails with `UnknownField` for an undeclared field and
    /// `UnindexableValue` when a current record holds an array or object
    /// in one of the fields — both checked before any index is built.
    /// Already-indexed fields are skipped, and a snapshot is written only
    /// when at least one index was actually built.
    pub fn create_index(&mut self, fields: &[&str]) -> StoreResult<()> {
        for field in fields {
            if !self.schema.contains(field) {
                return Err(StoreError::UnknownField((*field).to_string()));
            }
            if self.indexes.is_indexed(field) {
                continue;
            }
            for record in self.records.values() {
                if let Some(value) = record.get(field) {
                    if IndexKey::from_value(&value).is_none() {
                        return Err(StoreError::UnindexableValue((*field).to_string()));
                    }
                }
            }
        }

        let mut built = false;
        for field in fields {
            if self.indexes.is_indexed(field) {
                continue;
            }
            self.indexes.rebuild(field, self.records.values());
            built = true;
            debug!(field = *field, "index built");
        }
        if built {
            self.commit()?;
        }
        Ok(())
    }

    /// Discard the indices on the named fields.
    ///
    /// Fails with `NoIndex`, before discarding anything, when any named
    /// field is not indexed. Persists.
    pub fn delete_index(&mut self, fields: &[&str]) -> StoreResult<()> {
        for field in fields {
            if !self.indexes.is_indexed(field) {
                return Err(StoreError::NoIndex((*field).to_string()));
            }
        }
        for field in fields {
            self.indexes.drop_index(field);
        }
        self.commit()
    }

    /// Names of the currently indexed fields
    pub fn indexed_fields(&self) -> Vec<&str> {
        self.indexes.indexed_fields()
    }

    /// Accessor for one field's index.
    ///
    /// Fails with `NoIndex` when the field is not indexed.
    pub fn index(&self, field: &str) -> StoreResult<IndexView<'_>> {
        if !self.indexes.is_indexed(field) {
            return Err(StoreError::NoIndex(field.to_string()));
        }
        Ok(IndexView {
            store: self,
            field: field.to_string(),
        })
    }
}

impl<'a> IntoIterator for &'a Store {
    type Item = &'a Record;
    type IntoIter = std::collections::btree_map::Values<'a, RecordId, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

/// Read view over one field's index: the distinct values present and the
/// records bucketed under each.
#[derive(Debug)]
pub struct IndexView<'a> {
    store: &'a Store,
    field: String,
}

impl IndexView<'_> {
    /// The indexed field name
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Distinct values present in the index, in key order
    pub fn keys(&self) -> Vec<Value> {
        self.store
            .indexes
            .field_index(&self.field)
            .map(|index| index.keys().map(IndexKey::to_value).collect())
            .unwrap_or_default()
    }

    /// The records whose field equals `value`, ascending by id.
    ///
    /// Empty when no record holds the value.
    pub fn records_for(&self, value: &Value) -> Vec<Record> {
        self.store
            .indexes
            .lookup(&self.field, value)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.store.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}
