//! Selection and aggregation façade
//!
//! Equality selection consults indices before falling back to a linear
//! scan; expression queries always evaluate over the live record set. The
//! two paths must return identical identifier sets for equivalent queries
//! — the fast path is an optimization, never a semantic change.

use serde_json::Value;

use super::base::Store;
use super::errors::{StoreError, StoreResult};
use super::record::{is_reserved, Record, RecordId};
use crate::filter::{eval_ids, Expr};

impl Store {
    /// Equality-only selection: the records whose value equals the given
    /// one for every listed field, ascending by id.
    ///
    /// Requested fields are partitioned into indexed and non-indexed. When
    /// any field is indexed, the bucket id sets are intersected starting
    /// from the smallest bucket, and only the surviving candidates are
    /// checked against the non-indexed fields; with no indexed field the
    /// first field seeds a full scan and the rest filter it. An empty
    /// criteria list returns every record.
    ///
    /// Fails with `UnknownField` for an undeclared, non-reserved field.
    pub fn select(&self, criteria: &[(&str, Value)]) -> StoreResult<Vec<Record>> {
        for (field, _) in criteria {
            self.check_known_field(field)?;
        }
        if criteria.is_empty() {
            return Ok(self.iter().cloned().collect());
        }

        let (indexed, plain): (Vec<_>, Vec<_>) = criteria
            .iter()
            .partition(|(field, _)| self.indexes.is_indexed(field));

        let mut candidates: Vec<RecordId>;
        let remaining: &[&(&str, Value)];

        if !indexed.is_empty() {
            let mut buckets: Vec<&[RecordId]> = indexed
                .iter()
                .map(|(field, value)| self.indexes.lookup(field, value).unwrap_or(&[]))
                .collect();
            buckets.sort_by_key(|bucket| bucket.len());

            candidates = buckets[0].to_vec();
            for bucket in &buckets[1..] {
                if candidates.is_empty() {
                    break;
                }
                candidates = intersect_sorted(&candidates, bucket);
            }
            remaining = &plain;
        } else {
            let (first_field, first_value) = &plain[0];
            candidates = self
                .iter()
                .filter(|r| r.get(first_field).as_ref() == Some(first_value))
                .map(Record::id)
                .collect();
            remaining = &plain[1..];
        }

        for (field, value) in remaining {
            candidates.retain(|id| {
                self.records()
                    .get(id)
                    .and_then(|r| r.get(field))
                    .as_ref()
                    == Some(value)
            });
        }

        Ok(candidates
            .iter()
            .filter_map(|id| self.records().get(id).cloned())
            .collect())
    }

    /// Evaluate a filter expression, returning matching records ascending
    /// by id. The empty expression returns every record.
    pub fn query(&self, expr: &Expr) -> Vec<Record> {
        eval_ids(expr, self.records())
            .into_iter()
            .filter_map(|id| self.records().get(&id).cloned())
            .collect()
    }

    /// Number of records matching the expression.
    pub fn count(&self, expr: &Expr) -> usize {
        eval_ids(expr, self.records()).len()
    }

    /// Partition the filtered record set by a field's value, returning
    /// value/count pairs — one entry per distinct value present, in no
    /// guaranteed order. `None` filters nothing.
    pub fn group_count(
        &self,
        field: &str,
        filter: Option<&Expr>,
    ) -> StoreResult<Vec<(Value, usize)>> {
        self.check_known_field(field)?;
        let empty = Expr::Empty;
        let expr = filter.unwrap_or(&empty);

        let mut groups: Vec<(Value, usize)> = Vec::new();
        for id in eval_ids(expr, self.records()) {
            let Some(value) = self.records().get(&id).and_then(|r| r.get(field)) else {
                continue;
            };
            match groups.iter_mut().find(|(v, _)| *v == value) {
                Some((_, count)) => *count += 1,
                None => groups.push((value, 1)),
            }
        }
        Ok(groups)
    }

    /// Distinct values of a field over the filtered record set.
    /// `None` filters nothing.
    pub fn unique_values(&self, field: &str, filter: Option<&Expr>) -> StoreResult<Vec<Value>> {
        Ok(self
            .group_count(field, filter)?
            .into_iter()
            .map(|(value, _)| value)
            .collect())
    }

    fn check_known_field(&self, field: &str) -> StoreResult<()> {
        if self.schema().contains(field) || is_reserved(field) {
            Ok(())
        } else {
            Err(StoreError::UnknownField(field.to_string()))
        }
    }
}

/// Intersection of two ascending id slices, ascending.
fn intersect_sorted(a: &[RecordId], b: &[RecordId]) -> Vec<RecordId> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}
