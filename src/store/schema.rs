//! Field schema
//!
//! The schema is an ordered sequence of uniquely named fields, each with an
//! optional default value used when an insert leaves the field unspecified.
//! Field declarations carry no type: values are opaque to the store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::errors::{StoreError, StoreResult};
use super::record::is_reserved;

/// One declared field: a name and the default value for unspecified inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Default value, `Value::Null` when not given
    pub default: Value,
}

impl FieldDef {
    /// A field defaulting to null
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Value::Null,
        }
    }

    /// A field with an explicit default
    pub fn with_default(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default,
        }
    }
}

/// Ordered field declarations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    /// Build a schema from field definitions.
    ///
    /// Fails with `ReservedField` for `__id__`/`__version__` and with
    /// `AlreadyDefined` for a duplicated name.
    pub fn new(fields: Vec<FieldDef>) -> StoreResult<Self> {
        let mut schema = Schema { fields: Vec::new() };
        for field in fields {
            schema.add_field(field.name, field.default)?;
        }
        Ok(schema)
    }

    /// Build a schema from bare names, all defaulting to null.
    pub fn from_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> StoreResult<Self> {
        Self::new(names.into_iter().map(FieldDef::new).collect())
    }

    /// Declared field names in schema order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field is declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when `name` is a declared field
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// The default value declared for `name`
    pub fn default_of(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.default)
    }

    /// A fresh field map with every field set to its default.
    pub fn defaults_row(&self) -> BTreeMap<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.default.clone()))
            .collect()
    }

    /// Append a field.
    ///
    /// Fails with `ReservedField` for a reserved name and `AlreadyDefined`
    /// when the name collides with an existing field.
    pub fn add_field(&mut self, name: impl Into<String>, default: Value) -> StoreResult<()> {
        let name = name.into();
        if is_reserved(&name) {
            return Err(StoreError::ReservedField(name));
        }
        if self.contains(&name) {
            return Err(StoreError::AlreadyDefined(name));
        }
        self.fields.push(FieldDef { name, default });
        Ok(())
    }

    /// Remove a field.
    ///
    /// Fails with `ReservedField` for a reserved name and `UnknownField`
    /// when the name is not declared.
    pub fn drop_field(&mut self, name: &str) -> StoreResult<()> {
        if is_reserved(name) {
            return Err(StoreError::ReservedField(name.to_string()));
        }
        let pos = self
            .fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| StoreError::UnknownField(name.to_string()))?;
        self.fields.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_names_preserves_order() {
        let schema = Schema::from_names(["name", "age", "size"]).unwrap();
        let names: Vec<&str> = schema.field_names().collect();
        assert_eq!(names, vec!["name", "age", "size"]);
    }

    #[test]
    fn test_reserved_names_rejected() {
        let err = Schema::from_names(["name", "__id__"]).unwrap_err();
        assert!(matches!(err, StoreError::ReservedField(_)));

        let err = Schema::from_names(["__version__"]).unwrap_err();
        assert!(matches!(err, StoreError::ReservedField(_)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Schema::from_names(["name", "name"]).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyDefined(_)));
    }

    #[test]
    fn test_defaults_row() {
        let schema = Schema::new(vec![
            FieldDef::new("name"),
            FieldDef::with_default("age", json!(0)),
        ])
        .unwrap();

        let row = schema.defaults_row();
        assert_eq!(row["name"], Value::Null);
        assert_eq!(row["age"], json!(0));
    }

    #[test]
    fn test_add_and_drop_field() {
        let mut schema = Schema::from_names(["name"]).unwrap();

        schema.add_field("age", json!(5)).unwrap();
        assert!(schema.contains("age"));
        assert_eq!(schema.default_of("age"), Some(&json!(5)));

        let err = schema.add_field("age", Value::Null).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyDefined(_)));

        schema.drop_field("age").unwrap();
        assert!(!schema.contains("age"));

        let err = schema.drop_field("age").unwrap_err();
        assert!(matches!(err, StoreError::UnknownField(_)));

        let err = schema.drop_field("__id__").unwrap_err();
        assert!(matches!(err, StoreError::ReservedField(_)));
    }
}
