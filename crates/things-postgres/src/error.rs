//! Error types and utilities for database operations.

use std::borrow::Cow;

use deadpool::managed::TimeoutType;
use diesel::result::{ConnectionError, DatabaseErrorKind, Error};
use diesel_async::pooled_connection::PoolError as DieselPoolError;
use diesel_async::pooled_connection::deadpool::PoolError as DeadpoolError;

use crate::types::{ConstraintCategory, ThingConstraints};

/// Type-erased error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Comprehensive error type for all PostgreSQL database operations.
///
/// This enum covers all possible error conditions that can occur when working
/// with the database, including connection issues, query failures, timeouts,
/// and migration problems.
#[derive(Debug, thiserror::Error)]
#[must_use = "database errors should be handled appropriately"]
pub enum PgError {
    /// Configuration error.
    ///
    /// This includes invalid configuration parameters, missing required settings,
    /// or other issues related to the database configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database operation timed out.
    ///
    /// This can occur during connection creation, waiting for available connections,
    /// or connection recycling operations.
    #[error("Database operation timed out")]
    Timeout(TimeoutType),

    /// Failed to establish or maintain a database connection.
    ///
    /// This includes authentication failures, network issues, and invalid
    /// connection parameters.
    #[error("Database connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Database migration operation failed.
    ///
    /// This occurs when applying or rolling back database schema changes.
    #[error("Database migration error: {0}")]
    Migration(BoxError),

    /// Database query execution failed.
    ///
    /// This includes SQL syntax errors, constraint violations, type mismatches,
    /// and other query-related failures.
    #[error("Database query error: {0}")]
    Query(#[from] Error),

    /// Unexpected error occurred.
    ///
    /// This can occur when an error is encountered that is not covered by the
    /// other error types.
    #[error("Unexpected error: {0}")]
    Unexpected(Cow<'static, str>),
}

impl PgError {
    /// Extracts the constraint name from a constraint violation error.
    ///
    /// # Returns
    ///
    /// - `Some(constraint_name)` if this error represents a constraint violation
    /// - `None` if this error is not related to a constraint violation
    pub fn constraint(&self) -> Option<&str> {
        let PgError::Query(err) = self else {
            return None;
        };

        let Error::DatabaseError(_, err) = err else {
            return None;
        };

        err.constraint_name()
    }

    /// Returns a structured constraint violation if this error represents one.
    ///
    /// This provides a more structured way to handle known constraint
    /// violations using the [`ThingConstraints`] enum.
    pub fn constraint_violation(&self) -> Option<ThingConstraints> {
        self.constraint().and_then(ThingConstraints::new)
    }

    /// Returns whether this error indicates a transient failure that might succeed on retry.
    ///
    /// Transient errors include timeouts and certain connection issues that may
    /// be resolved by retrying the operation.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PgError::Timeout(_) | PgError::Connection(ConnectionError::BadConnection(_))
        )
    }
}

impl From<DeadpoolError> for PgError {
    fn from(value: DeadpoolError) -> Self {
        match value {
            DeadpoolError::Timeout(timeout) => Self::Timeout(timeout),
            DeadpoolError::Backend(DieselPoolError::QueryError(error)) => Self::Query(error),
            DeadpoolError::Backend(DieselPoolError::ConnectionError(error)) => {
                Self::Connection(error)
            }
            DeadpoolError::PostCreateHook(err) => {
                Self::Unexpected(err.to_string().into())
            }
            DeadpoolError::NoRuntimeSpecified => {
                tracing::error!("No tokio runtime specified for connection pool");
                Self::Unexpected("No runtime specified".into())
            }
            DeadpoolError::Closed => {
                Self::Connection(ConnectionError::InvalidConnectionUrl(
                    "Connection pool is closed".into(),
                ))
            }
        }
    }
}

impl From<PgError> for things_core::Error {
    fn from(err: PgError) -> Self {
        // Known constraints are mapped by name, so callers get a message
        // saying which uniqueness guarantee broke instead of a raw index
        // name from the database.
        if let Some(constraint) = err.constraint_violation()
            && constraint.categorize() == ConstraintCategory::Uniqueness
        {
            let message = match constraint {
                ThingConstraints::IdUnique => "thing identifier is already registered",
                ThingConstraints::KeyUnique => "thing key is already held by another thing",
            };
            return things_core::Error::conflict().with_message(message);
        }

        match err {
            PgError::Query(Error::NotFound) => things_core::Error::not_found(),
            PgError::Query(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
                // Unique violation on a constraint this crate does not name.
                let conflict = things_core::Error::conflict();
                match info.constraint_name() {
                    Some(name) => conflict.with_message(name.to_owned()),
                    None => conflict,
                }
            }
            other => things_core::Error::select_entity().with_source(other),
        }
    }
}

/// Specialized [`Result`] type for database operations.
///
/// This is a convenience alias that uses [`PgError`] as the error type,
/// making database operation signatures cleaner and more consistent.
pub type PgResult<T, E = PgError> = Result<T, E>;

#[cfg(test)]
mod tests {
    use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error};

    use super::PgError;
    use crate::types::ThingConstraints;

    struct ConstraintInfo {
        constraint: Option<&'static str>,
    }

    impl DatabaseErrorInformation for ConstraintInfo {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn details(&self) -> Option<&str> {
            None
        }

        fn hint(&self) -> Option<&str> {
            None
        }

        fn table_name(&self) -> Option<&str> {
            Some("things")
        }

        fn column_name(&self) -> Option<&str> {
            None
        }

        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }

        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn unique_violation(constraint: Option<&'static str>) -> PgError {
        PgError::Query(Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(ConstraintInfo { constraint }),
        ))
    }

    #[test]
    fn violation_is_recognized_as_a_named_constraint() {
        let err = unique_violation(Some("things_key_key"));
        assert_eq!(
            err.constraint_violation(),
            Some(ThingConstraints::KeyUnique)
        );
        assert_eq!(err.constraint(), Some("things_key_key"));
    }

    #[test]
    fn key_constraint_maps_to_a_conflict_about_the_key() {
        let err = things_core::Error::from(unique_violation(Some("things_key_key")));
        assert!(err.is_conflict());
        assert!(err.message.as_deref().unwrap().contains("key"));
    }

    #[test]
    fn id_constraint_maps_to_a_conflict_about_the_identifier() {
        let err = things_core::Error::from(unique_violation(Some("things_pkey")));
        assert!(err.is_conflict());
        assert!(err.message.as_deref().unwrap().contains("identifier"));
    }

    #[test]
    fn unnamed_unique_violation_still_maps_to_conflict() {
        let err = things_core::Error::from(unique_violation(Some("some_other_index")));
        assert!(err.is_conflict());
        assert_eq!(err.message.as_deref(), Some("some_other_index"));

        let err = things_core::Error::from(unique_violation(None));
        assert!(err.is_conflict());
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let err = things_core::Error::from(PgError::Query(Error::NotFound));
        assert!(err.is_not_found());
    }
}
