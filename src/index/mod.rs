//! Per-field indexing
//!
//! An index on a field is a mapping between the values taken by the field
//! and the sorted list of ids of the records whose field equals that value.
//! Indices accelerate equality selection and are maintained inline on every
//! record mutation.

mod bucket;
mod key;
mod manager;

pub use bucket::FieldIndex;
pub use key::IndexKey;
pub use manager::{IndexManager, PortableIndexMap};
