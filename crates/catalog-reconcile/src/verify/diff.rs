//! Field-level diff between two keyed record sets.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{FieldValue, Record, ID_FIELD};

use super::types::{RecordDiff, ValueDiff, EXISTENCE_FIELD};

/// Compare two record sets keyed by normalized ID.
///
/// An ID present on one side only yields a single `existence` entry. For IDs
/// present on both sides, every field except `_id` is compared; list values
/// are compared order-insensitively and a missing field equals an explicit
/// null. IDs without differences are omitted.
pub fn diff(left: &BTreeMap<String, Record>, right: &BTreeMap<String, Record>) -> RecordDiff {
    let ids: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
    let mut result = RecordDiff::new();

    for id in ids {
        let fields = match (left.get(id), right.get(id)) {
            (Some(l), Some(r)) => diff_records(l, r),
            (l, r) => {
                let mut fields = BTreeMap::new();
                fields.insert(
                    EXISTENCE_FIELD.to_string(),
                    ValueDiff::new(
                        Some(FieldValue::Bool(l.is_some())),
                        Some(FieldValue::Bool(r.is_some())),
                    ),
                );
                fields
            }
        };

        if !fields.is_empty() {
            result.insert(id.clone(), fields);
        }
    }

    result
}

/// Differing fields of two records describing the same entity.
pub fn diff_records(left: &Record, right: &Record) -> BTreeMap<String, ValueDiff> {
    let names: BTreeSet<&String> = left
        .keys()
        .chain(right.keys())
        .filter(|name| name.as_str() != ID_FIELD)
        .collect();

    names
        .into_iter()
        .filter_map(|name| {
            let l = present(left.get(name));
            let r = present(right.get(name));
            let same = match (l, r) {
                (None, None) => true,
                (Some(a), Some(b)) => a.sorted() == b.sorted(),
                _ => false,
            };
            if same {
                None
            } else {
                Some((name.clone(), ValueDiff::new(l.cloned(), r.cloned())))
            }
        })
        .collect()
}

fn present(value: Option<&FieldValue>) -> Option<&FieldValue> {
    value.filter(|v| !v.is_null())
}
