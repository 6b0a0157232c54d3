//! Cross-store comparison passes.
//!
//! - [`reconcile`]: set difference of the live ID sets of both stores
//! - [`spot_check`]: per-ID `last_modified_time` comparison
//! - [`diff`]: field-by-field diff of denormalized records against indexed documents
//!
//! Everything here is pure over its inputs except the spot checker, which
//! reads from both stores.

pub mod diff;
pub mod spot_check;
pub mod types;

pub use diff::{diff, diff_records};
pub use spot_check::{FieldSpotChecker, LAST_MODIFIED_FIELD};
pub use types::{FieldDiff, MismatchReport, RecordDiff, ValueDiff, EXISTENCE_FIELD};

use tracing::info;

use crate::core::{CatalogEntityKind, IdSet};

/// Compare the live ID sets of both stores.
///
/// Equal sets produce a clean report; that is a successful outcome.
pub fn reconcile(
    kind: CatalogEntityKind,
    relational_ids: &IdSet,
    document_ids: &IdSet,
) -> MismatchReport {
    let only_in_relational: IdSet = relational_ids.difference(document_ids).cloned().collect();
    let only_in_document: IdSet = document_ids.difference(relational_ids).cloned().collect();

    info!(
        "{}: {} only in relational, {} only in document",
        kind,
        only_in_relational.len(),
        only_in_document.len()
    );

    MismatchReport {
        entity_kind: kind,
        relational_count: relational_ids.len(),
        document_count: document_ids.len(),
        only_in_relational,
        only_in_document,
    }
}
