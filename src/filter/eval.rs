//! Expression evaluation
//!
//! Leaves are evaluated against each record's in-memory value for the
//! bound field; no index is consulted here (index acceleration lives in
//! the store's equality selection). AND retains the identifiers present
//! in both result sets, OR unions them, so duplicate-valued but distinct
//! records combine correctly.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::expr::{CompareOp, Expr};
use crate::store::record::{Record, RecordId};

/// Evaluate an expression over the live record set, returning matching ids
/// ascending.
pub fn eval_ids(expr: &Expr, records: &BTreeMap<RecordId, Record>) -> BTreeSet<RecordId> {
    match expr {
        Expr::Empty => records.keys().copied().collect(),
        Expr::Leaf { field, op, value } => records
            .values()
            .filter(|r| leaf_matches(r, field, *op, value))
            .map(Record::id)
            .collect(),
        Expr::And(left, right) => {
            let lhs = eval_ids(left, records);
            let rhs = eval_ids(right, records);
            lhs.intersection(&rhs).copied().collect()
        }
        Expr::Or(left, right) => {
            let lhs = eval_ids(left, records);
            let rhs = eval_ids(right, records);
            lhs.union(&rhs).copied().collect()
        }
    }
}

/// True when one record satisfies the expression.
///
/// Equivalent to membership in `eval_ids`; used for brute-force checks and
/// per-candidate filtering.
pub fn matches_record(expr: &Expr, record: &Record) -> bool {
    match expr {
        Expr::Empty => true,
        Expr::Leaf { field, op, value } => leaf_matches(record, field, *op, value),
        Expr::And(left, right) => matches_record(left, record) && matches_record(right, record),
        Expr::Or(left, right) => matches_record(left, record) || matches_record(right, record),
    }
}

/// A record lacking the bound field never matches, whatever the operator.
fn leaf_matches(record: &Record, field: &str, op: CompareOp, literal: &Value) -> bool {
    let Some(actual) = record.get(field) else {
        return false;
    };

    match op {
        CompareOp::Eq => actual == *literal,
        CompareOp::Ne => actual != *literal,
        CompareOp::Lt => ordering_matches(&actual, literal, |o| o == std::cmp::Ordering::Less),
        CompareOp::Lte => ordering_matches(&actual, literal, |o| o != std::cmp::Ordering::Greater),
        CompareOp::Gt => ordering_matches(&actual, literal, |o| o == std::cmp::Ordering::Greater),
        CompareOp::Gte => ordering_matches(&actual, literal, |o| o != std::cmp::Ordering::Less),
        CompareOp::Contains => substring_matches(&actual, literal, false),
        CompareOp::ContainsCi => substring_matches(&actual, literal, true),
        CompareOp::In => match literal {
            Value::Array(candidates) => candidates.contains(&actual),
            _ => false,
        },
    }
}

/// Ordering comparison: numbers compare numerically, strings
/// lexicographically, anything else (or a mixed pair) never matches.
fn ordering_matches(
    actual: &Value,
    bound: &Value,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> bool {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                return accept(ai.cmp(&bi));
            }
            match (a.as_f64(), b.as_f64()) {
                (Some(af), Some(bf)) => af.partial_cmp(&bf).map(&accept).unwrap_or(false),
                _ => false,
            }
        }
        (Value::String(a), Value::String(b)) => accept(a.as_str().cmp(b.as_str())),
        _ => false,
    }
}

fn substring_matches(actual: &Value, needle: &Value, ignore_case: bool) -> bool {
    match (actual, needle) {
        (Value::String(haystack), Value::String(needle)) => {
            if ignore_case {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            } else {
                haystack.contains(needle.as_str())
            }
        }
        _ => false,
    }
}
