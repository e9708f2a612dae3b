//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with context about which operation failed. At the
//! [`PlaceStore`](vibemap_core::store::PlaceStore) boundary they are
//! mapped onto [`StoreError`].

use vibemap_core::error::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A place document could not be stored.
    #[error("Invalid place document: {0}")]
    InvalidDocument(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Postgres(
                e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
            ) => Self::Unavailable(e.to_string()),
            DbError::Config(msg) => Self::Unavailable(msg),
            other => Self::Query(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhaustion_is_unavailable() {
        let err = StoreError::from(DbError::Postgres(sqlx::Error::PoolTimedOut));
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn bad_rows_are_query_failures() {
        let err = StoreError::from(DbError::Postgres(sqlx::Error::RowNotFound));
        assert!(matches!(err, StoreError::Query(_)));
        let err = StoreError::from(DbError::InvalidDocument(String::from("no city")));
        assert!(matches!(err, StoreError::Query(_)));
    }
}
