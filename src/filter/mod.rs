//! Filter expression algebra
//!
//! Comparisons combined with AND/OR, evaluated lazily over the live record
//! set. Expressions are plain values: building one touches no store state,
//! and the same tree can be applied repeatedly as records change.

mod eval;
mod expr;

pub use eval::{eval_ids, matches_record};
pub use expr::{field, CompareOp, Expr, FieldExpr};
