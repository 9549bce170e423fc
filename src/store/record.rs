//! Record type and identifier space
//!
//! A record is an untyped field/value mapping plus two reserved fields:
//! the unique, immutable identifier and a version counter incremented by
//! exactly 1 on every successful update. Records handed to callers are
//! snapshots; the store's `update` is the only sanctioned mutation path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record identifier: monotonically allocated, never reused.
pub type RecordId = u64;

/// Reserved name resolving to the record identifier
pub const ID_FIELD: &str = "__id__";

/// Reserved name resolving to the record version
pub const VERSION_FIELD: &str = "__version__";

/// Returns true for the two reserved field names
pub fn is_reserved(name: &str) -> bool {
    name == ID_FIELD || name == VERSION_FIELD
}

/// One schema-conformant record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "__id__")]
    id: RecordId,
    #[serde(rename = "__version__")]
    version: u64,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates a record with version 0. Store-internal.
    pub(crate) fn new(id: RecordId, fields: BTreeMap<String, Value>) -> Self {
        Self {
            id,
            version: 0,
            fields,
        }
    }

    /// The record identifier
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// The version counter: 0 on insert, +1 per update
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The field/value mapping, without the reserved fields
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Value of a field, with `__id__` and `__version__` resolvable too.
    ///
    /// Returns `None` for a name that is neither reserved nor present.
    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            ID_FIELD => Some(Value::from(self.id)),
            VERSION_FIELD => Some(Value::from(self.version)),
            _ => self.fields.get(field).cloned(),
        }
    }

    pub(crate) fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    pub(crate) fn remove_field(&mut self, field: &str) {
        self.fields.remove(field);
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), json!("homer"));
        fields.insert("age".to_string(), json!(23));
        Record::new(5, fields)
    }

    #[test]
    fn test_new_record_starts_at_version_zero() {
        let record = sample();
        assert_eq!(record.id(), 5);
        assert_eq!(record.version(), 0);
    }

    #[test]
    fn test_get_resolves_reserved_names() {
        let record = sample();
        assert_eq!(record.get(ID_FIELD), Some(json!(5)));
        assert_eq!(record.get(VERSION_FIELD), Some(json!(0)));
        assert_eq!(record.get("name"), Some(json!("homer")));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_bump_version() {
        let mut record = sample();
        record.bump_version();
        record.bump_version();
        assert_eq!(record.version(), 2);
    }

    #[test]
    fn test_serde_shape_carries_reserved_fields() {
        let record = sample();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["__id__"], json!(5));
        assert_eq!(value["__version__"], json!(0));
        assert_eq!(value["fields"]["age"], json!(23));

        let back: Record = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_is_reserved() {
        assert!(is_reserved("__id__"));
        assert!(is_reserved("__version__"));
        assert!(!is_reserved("name"));
    }
}
