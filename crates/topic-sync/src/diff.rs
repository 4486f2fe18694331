//! CRUD diff between two keyed snapshots
//!
//! Records are compared field by field after flattening each one to
//! `path -> primitive` pairs, so a change deep inside one record is one
//! update of that record, never a delete plus a create.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Records to create, update and delete, each in key order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudDiff<T> {
    pub created: Vec<T>,
    pub updated: Vec<T>,
    pub deleted: Vec<T>,
}

impl<T> Default for CrudDiff<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T> CrudDiff<T> {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }
}

/// Flattened view of one record: dotted path -> primitive
pub type FlatRecord = BTreeMap<String, Value>;

/// Flatten a record to comparable primitives
///
/// Objects and arrays are walked; empty containers are kept as leaves so
/// `{}` and a missing field stay distinguishable.
///
/// # Errors
/// Fails if the record cannot be represented as JSON (e.g. a map with
/// non-string keys).
pub fn flatten_record<T: Serialize>(record: &T) -> Result<FlatRecord, serde_json::Error> {
    let mut flat = FlatRecord::new();
    flatten_into(String::new(), serde_json::to_value(record)?, &mut flat);
    Ok(flat)
}

fn flatten_into(path: String, value: Value, flat: &mut FlatRecord) {
    let join = |key: &str| {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{path}.{key}")
        }
    };
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(join(&key), child, flat);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.into_iter().enumerate() {
                flatten_into(join(&index.to_string()), child, flat);
            }
        }
        leaf => {
            flat.insert(path, leaf);
        }
    }
}

fn same_content<T: Serialize>(before: &T, after: &T) -> bool {
    match (flatten_record(before), flatten_record(after)) {
        (Ok(before), Ok(after)) => before == after,
        (Err(err), _) | (_, Err(err)) => {
            tracing::warn!(error = %err, "record not comparable, treating as changed");
            false
        }
    }
}

/// Diff two collections keyed by `identify`
///
/// Ids only in `after` are created, ids only in `before` are deleted, ids in
/// both with different flattened content are updated (with the `after`
/// record). Duplicate ids within one collection keep the last record.
pub fn compute_crud_diff<T, K, F>(before: &[T], after: &[T], identify: F) -> CrudDiff<T>
where
    T: Serialize + Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    let before: BTreeMap<K, &T> = before.iter().map(|record| (identify(record), record)).collect();
    let after: BTreeMap<K, &T> = after.iter().map(|record| (identify(record), record)).collect();

    let mut diff = CrudDiff::default();
    for (key, record) in &after {
        match before.get(key) {
            None => diff.created.push((*record).clone()),
            Some(old) if !same_content(*old, *record) => diff.updated.push((*record).clone()),
            Some(_) => {}
        }
    }
    diff.deleted = before
        .iter()
        .filter(|(key, _)| !after.contains_key(*key))
        .map(|(_, record)| (*record).clone())
        .collect();
    diff
}
