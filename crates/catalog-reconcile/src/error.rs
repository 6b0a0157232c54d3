//! Error types for the reconciliation library.

use thiserror::Error;

/// Exit code for configuration errors (invalid YAML, missing fields, etc.).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when a store could not be reached.
pub const EXIT_STORE_UNAVAILABLE: u8 = 2;
/// Exit code when a store rejected a query.
pub const EXIT_QUERY_FAILED: u8 = 3;
/// Exit code when the run was cancelled.
pub const EXIT_CANCELLED: u8 = 4;
/// Exit code for serialization failures.
pub const EXIT_SERIALIZATION_ERROR: u8 = 5;
/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for reconciliation operations.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure talking to a store. Never retried internally.
    #[error("{store} store unavailable: {message}")]
    StoreUnavailable { store: String, message: String },

    /// The store understood the request but rejected it, or returned
    /// data the engine cannot interpret.
    #[error("{store} query failed: {message}")]
    QueryFailed { store: String, message: String },

    /// IO error (report files, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled between steps (SIGINT, etc.)
    #[error("Reconciliation cancelled")]
    Cancelled,
}

impl ReconcileError {
    /// Create a StoreUnavailable error for the named store.
    pub fn store_unavailable(store: impl Into<String>, message: impl ToString) -> Self {
        ReconcileError::StoreUnavailable {
            store: store.into(),
            message: message.to_string(),
        }
    }

    /// Create a QueryFailed error for the named store.
    pub fn query_failed(store: impl Into<String>, message: impl ToString) -> Self {
        ReconcileError::QueryFailed {
            store: store.into(),
            message: message.to_string(),
        }
    }

    /// Whether the caller may reasonably retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReconcileError::StoreUnavailable { .. })
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ReconcileError::Config(_) | ReconcileError::Yaml(_) => EXIT_CONFIG_ERROR,
            ReconcileError::StoreUnavailable { .. } => EXIT_STORE_UNAVAILABLE,
            ReconcileError::QueryFailed { .. } => EXIT_QUERY_FAILED,
            ReconcileError::Cancelled => EXIT_CANCELLED,
            ReconcileError::Json(_) => EXIT_SERIALIZATION_ERROR,
            ReconcileError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for ReconcileError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => ReconcileError::store_unavailable("relational", err),
            other => ReconcileError::query_failed("relational", other),
        }
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for ReconcileError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match *err.kind {
            ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } => {
                ReconcileError::store_unavailable("document", err)
            }
            _ => ReconcileError::query_failed("document", err),
        }
    }
}

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
