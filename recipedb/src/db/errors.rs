use thiserror::Error;

/// Unified error type for persistence operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// No live row matched the identifier and ownership chain, or the row was
    /// already archived
    #[error("Entity not found")]
    NotFound,

    /// The database could not be reached before migrating
    #[error("Database is not ready")]
    NotReady {
        #[source]
        source: sqlx::Error,
    },

    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Check constraint violation
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// An input value cannot be persisted as given
    #[error("Invalid value for {field}: {message}")]
    InvalidInput { field: &'static str, message: String },

    /// A statement did not complete before the configured deadline
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// Applying the schema migrations failed
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().map(|s| s.to_string());
                let table = db_err.table().map(|s| s.to_string());
                let message = db_err.message().to_string();

                if db_err.is_unique_violation() {
                    DbError::UniqueViolation { constraint, table, message }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation { constraint, table, message }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation { constraint, table, message }
                } else {
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

impl DbError {
    /// Categorize a driver error, attaching the failed operation to anything
    /// that isn't a recognised constraint or lookup failure.
    pub(crate) fn during(operation: &str, err: sqlx::Error) -> Self {
        match DbError::from(err) {
            DbError::Other(inner) => DbError::Other(inner.context(format!("{operation} failed"))),
            categorized => categorized,
        }
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
