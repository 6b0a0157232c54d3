//! Records and identifier sets.

use std::collections::{BTreeMap, BTreeSet};

use super::value::FieldValue;

/// Integer identity of a catalog entity in the relational store.
pub type EntityId = i64;

/// Field name of the key in both the ETL output and the search index.
pub const ID_FIELD: &str = "_id";

/// A row or document: field name to value.
///
/// Used for raw relational rows, ETL output and indexed documents alike.
pub type Record = BTreeMap<String, FieldValue>;

/// Set of string-normalized entity identifiers.
pub type IdSet = BTreeSet<String>;

/// Normalization of a store-native key into its [`IdSet`] form.
pub trait NormalizedId {
    /// String form used for cross-store comparison.
    fn normalized_id(&self) -> String;
}

impl NormalizedId for EntityId {
    fn normalized_id(&self) -> String {
        self.to_string()
    }
}

impl NormalizedId for FieldValue {
    fn normalized_id(&self) -> String {
        self.to_id_string()
    }
}

/// Index records by their normalized `_id`. Records without an `_id` are dropped.
pub fn index_by_id<I>(records: I) -> BTreeMap<String, Record>
where
    I: IntoIterator<Item = Record>,
{
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.get(ID_FIELD)?.to_id_string();
            Some((id, record))
        })
        .collect()
}
