use sea_orm::error::DbErr;
use serde::Serialize;

/// Errors surfaced by the stock services.
///
/// Only the primary write path and reconciliation return these; auxiliary
/// effects (ledger, cache purge, event emission) report through [`SideEffect`]
/// instead so a caller can always tell "the stock write failed" apart from
/// "the stock write landed but its audit trail did not".
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Reconciliation error: {0}")]
    ReconciliationError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }
}

/// Outcome of a best-effort auxiliary effect.
///
/// The primary stock mutation is the operation of record. Ledger writes,
/// cache purges and event sends must never abort it, but the caller still
/// learns whether they landed.
#[derive(Debug, Clone, Serialize)]
pub enum SideEffect {
    Applied,
    Failed(String),
}

impl SideEffect {
    pub fn is_applied(&self) -> bool {
        matches!(self, SideEffect::Applied)
    }

    /// Collapse a fallible auxiliary call into a side-effect status,
    /// logging the failure on the way.
    pub fn from_result<T, E: std::fmt::Display>(result: Result<T, E>, what: &str) -> Self {
        match result {
            Ok(_) => SideEffect::Applied,
            Err(e) => {
                tracing::warn!(effect = what, error = %e, "auxiliary effect failed");
                SideEffect::Failed(format!("{}: {}", what, e))
            }
        }
    }
}
