//! Error types for scribe-orm
//!
//! Definition-time schema errors, record access errors, configuration
//! errors, and driver errors share one enum so callers can `?` through
//! every layer. Not-found is never an error: lookups return `Option`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrmError>;

#[derive(Error, Debug)]
pub enum OrmError {
    /// More than one field of a shape was declared as primary key
    #[error("Duplicate primary key for field '{second}' in {shape} (already '{first}')")]
    DuplicatePrimaryKey {
        shape: String,
        first: String,
        second: String,
    },

    /// No field of a shape was declared as primary key
    #[error("Primary key not found in {shape}")]
    MissingPrimaryKey { shape: String },

    /// Two fields of a shape resolve to the same column
    #[error("Duplicate column '{column}' in {shape}")]
    DuplicateField { shape: String, column: String },

    /// Record access with a key that is not a column of the shape
    #[error("{shape} has no attribute '{field}'")]
    UnknownField { shape: String, field: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Missing required config key '{key}'")]
    MissingConfigKey { key: &'static str },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Timed out waiting for a pooled connection")]
    AcquireTimeout,

    /// Raised only when the strict row-count policy is enabled
    #[error("Failed to {operation} record in {table}: expected {expected} affected row(s), got {actual}")]
    RowCountMismatch {
        operation: &'static str,
        table: String,
        expected: u64,
        actual: u64,
    },

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl OrmError {
    pub fn unknown_field(shape: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            shape: shape.into(),
            field: field.into(),
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// True for errors raised while declaring an entity shape
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicatePrimaryKey { .. }
                | Self::MissingPrimaryKey { .. }
                | Self::DuplicateField { .. }
        )
    }
}

impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => Self::PoolClosed,
            sqlx::Error::PoolTimedOut => Self::AcquireTimeout,
            other => Self::Database(other),
        }
    }
}

impl From<toml::de::Error> for OrmError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}
