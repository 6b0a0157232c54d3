//! Configuration validation.

use super::Config;
use crate::error::{ReconcileError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Relational validation
    if config.relational.host.is_empty() {
        return Err(ReconcileError::Config("relational.host is required".into()));
    }
    if config.relational.database.is_empty() {
        return Err(ReconcileError::Config(
            "relational.database is required".into(),
        ));
    }
    if config.relational.user.is_empty() {
        return Err(ReconcileError::Config("relational.user is required".into()));
    }
    if config.relational.port == 0 {
        return Err(ReconcileError::Config(
            "relational.port must be non-zero".into(),
        ));
    }

    // Document validation
    if config.document.url.is_empty() {
        return Err(ReconcileError::Config("document.url is required".into()));
    }
    if !config.document.url.starts_with("mongodb://")
        && !config.document.url.starts_with("mongodb+srv://")
    {
        return Err(ReconcileError::Config(
            "document.url must start with mongodb:// or mongodb+srv://".into(),
        ));
    }
    if config.document.database.is_empty() {
        return Err(ReconcileError::Config(
            "document.database is required".into(),
        ));
    }

    // Reconcile config validation - only check if explicitly set
    if config.reconcile.batch_size == 0 {
        return Err(ReconcileError::Config(
            "reconcile.batch_size must be at least 1".into(),
        ));
    }
    if let Some(0) = config.reconcile.spot_check_workers {
        return Err(ReconcileError::Config(
            "reconcile.spot_check_workers must be at least 1".into(),
        ));
    }
    if let Some(0) = config.reconcile.max_relational_connections {
        return Err(ReconcileError::Config(
            "reconcile.max_relational_connections must be at least 1".into(),
        ));
    }
    if let Some(0) = config.reconcile.max_document_connections {
        return Err(ReconcileError::Config(
            "reconcile.max_document_connections must be at least 1".into(),
        ));
    }

    Ok(())
}
