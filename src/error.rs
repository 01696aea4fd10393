//! Error types for tablekit.

use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Error)]
pub enum Error {
    /// A record type's metadata is malformed (zero or multiple key
    /// columns, property/column count mismatch, unknown property).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested dialect is not in the supported set.
    #[error("Unsupported dialect: '{0}'. Expected: postgres or sqlserver")]
    UnsupportedDialect(String),

    /// A statement failed at the driver. Carries the SQL text and the
    /// parameter snapshot so the failure can be diagnosed offline.
    #[error("Execution error: {message}\n  sql: {sql}\n  params: {params:?}")]
    SqlExecution {
        message: String,
        sql: String,
        params: Vec<(String, Value)>,
    },

    /// A single-result query matched more than one row.
    #[error("Duplicate record: query against '{table}' matched more than one row")]
    DuplicateRecord { table: String },

    /// A pending migration's SQL failed; the whole batch was rolled back.
    #[error("Migration {id} ('{description}') failed: {source}")]
    Migration {
        id: u64,
        description: String,
        #[source]
        source: Box<Error>,
    },

    /// Two migrations were registered with the same ID for the same table.
    #[error("Duplicate migration id {id} for table '{table}'")]
    DuplicateMigration { id: u64, table: String },

    /// A row column could not be converted to the requested type.
    #[error("Decode error: column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an execution error from a failing command.
    pub fn execution(
        message: impl Into<String>,
        sql: impl Into<String>,
        params: Vec<(String, Value)>,
    ) -> Self {
        Self::SqlExecution {
            message: message.into(),
            sql: sql.into(),
            params,
        }
    }

    /// Create a decode error for the given column.
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for tablekit operations.
pub type Result<T> = std::result::Result<T, Error>;
