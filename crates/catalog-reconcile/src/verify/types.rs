//! Result types produced by the reconciliation passes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{CatalogEntityKind, FieldValue, IdSet};

/// Outcome of comparing the live ID sets of both stores for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchReport {
    pub entity_kind: CatalogEntityKind,

    /// Size of the relational live ID set.
    pub relational_count: usize,

    /// Size of the document live ID set.
    pub document_count: usize,

    /// Live in the catalog but missing from the index.
    pub only_in_relational: IdSet,

    /// Live in the index but not in the catalog.
    pub only_in_document: IdSet,
}

impl MismatchReport {
    /// True when both stores agree on the live ID set.
    pub fn is_clean(&self) -> bool {
        self.only_in_relational.is_empty() && self.only_in_document.is_empty()
    }

    /// Total number of IDs present on one side only.
    pub fn mismatch_count(&self) -> usize {
        self.only_in_relational.len() + self.only_in_document.len()
    }
}

/// A single field that disagrees between the stores for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub entity_id: String,
    pub field: String,
    pub relational_value: Option<FieldValue>,
    pub document_value: Option<FieldValue>,
}

/// Both sides of a differing field. `None` means the field is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDiff {
    pub left: Option<FieldValue>,
    pub right: Option<FieldValue>,
}

impl ValueDiff {
    pub fn new(left: Option<FieldValue>, right: Option<FieldValue>) -> Self {
        Self { left, right }
    }
}

/// Per-ID, per-field differences between two record sets.
///
/// IDs without differences are not present.
pub type RecordDiff = BTreeMap<String, BTreeMap<String, ValueDiff>>;

/// Synthetic field reported when an ID exists on one side only.
pub const EXISTENCE_FIELD: &str = "existence";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_clean() {
        let report = MismatchReport {
            entity_kind: CatalogEntityKind::Series,
            relational_count: 2,
            document_count: 2,
            only_in_relational: IdSet::new(),
            only_in_document: IdSet::new(),
        };
        assert!(report.is_clean());
        assert_eq!(report.mismatch_count(), 0);
    }

    #[test]
    fn test_report_serializes_kind_lowercase() {
        let report = MismatchReport {
            entity_kind: CatalogEntityKind::Product,
            relational_count: 1,
            document_count: 0,
            only_in_relational: IdSet::from(["9".to_string()]),
            only_in_document: IdSet::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entity_kind"], "product");
        assert_eq!(json["only_in_relational"][0], "9");
    }
}
