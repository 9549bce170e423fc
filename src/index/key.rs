//! Totally-ordered index keys for field values
//!
//! Buckets are keyed by `IndexKey`, not by `serde_json::Value`, because the
//! raw JSON value has no total order. Ordering is deterministic:
//! Null < Bool < Int < Float < String.

use serde_json::Value;

/// Index key representing a scalar field value.
///
/// Floats are stored as order-preserving bit patterns so that the derived
/// `Ord` gives the numeric order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Null value (the default for unspecified fields)
    Null,
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value (stored as bits for total ordering)
    Float(u64),
    /// String value
    String(String),
}

impl IndexKey {
    /// Create a key from a float.
    ///
    /// Uses the bit representation for total ordering.
    pub fn from_float(v: f64) -> Self {
        let bits = v.to_bits();
        // Negative floats: flip all bits. Positive floats: flip sign bit.
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Float(ordered)
    }

    /// Create a key from a JSON value.
    ///
    /// Returns `None` for arrays and objects: compound values cannot be
    /// bucket keys, and the store rejects them before any index is touched.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(IndexKey::Null),
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(IndexKey::Int(i))
                } else {
                    n.as_f64().map(IndexKey::from_float)
                }
            }
            Value::String(s) => Some(IndexKey::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Convert the key back to the JSON value it was derived from.
    pub fn to_value(&self) -> Value {
        match self {
            IndexKey::Null => Value::Null,
            IndexKey::Bool(b) => Value::Bool(*b),
            IndexKey::Int(i) => Value::from(*i),
            IndexKey::Float(ordered) => {
                // Inverse of the `from_float` transform.
                let bits = if (ordered >> 63) == 1 {
                    ordered ^ (1 << 63)
                } else {
                    !ordered
                };
                serde_json::Number::from_f64(f64::from_bits(bits))
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            IndexKey::String(s) => Value::String(s.clone()),
        }
    }
}
