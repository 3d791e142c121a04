use thiserror::Error;

/// Error taxonomy for insert execution and transaction control.
///
/// `Validation` and `UnknownDialect` are detected before any store interaction.
/// `ConstraintViolation` and `Connectivity` originate in the store and always
/// unwind through the enclosing transaction, which rolls back before re-raising.
#[derive(Debug, Error)]
pub enum InsertError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("transaction context is closed")]
    ContextClosed,

    #[error("generated key not found: {0}")]
    NotFound(String),

    #[error("store reported {reported} rows written for a {expected}-row insert")]
    RowCountMismatch { expected: u64, reported: u64 },

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),
}

impl InsertError {
    /// True for errors raised before the statement reached the store.
    #[must_use]
    pub fn is_pre_dispatch(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownDialect(_))
    }
}
