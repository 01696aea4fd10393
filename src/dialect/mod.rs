//! SQL dialect selection and the per-dialect generation strategy.

pub mod postgres;
pub mod sqlserver;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::record::ColumnType;

pub use postgres::PostgresGenerator;
pub use sqlserver::SqlServerGenerator;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    SqlServer,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::Postgres
    }
}

impl Dialect {
    pub fn generator(&self) -> &'static dyn SqlGenerator {
        match self {
            Dialect::Postgres => &PostgresGenerator,
            Dialect::SqlServer => &SqlServerGenerator,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::SqlServer => "sqlserver",
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlserver" | "mssql" | "tsql" => Ok(Self::SqlServer),
            other => Err(Error::UnsupportedDialect(other.to_string())),
        }
    }
}

/// Trait for dialect-specific SQL generation primitives.
///
/// Statement builders call these for quoting, type mapping and row
/// limiting; structural differences too large for a primitive (the
/// conditional insert/upsert forms) are handled by a `match` on
/// [`Dialect`] inside the builder itself.
pub trait SqlGenerator: Send + Sync {
    /// Quote an identifier (table or column name).
    fn quote_identifier(&self, name: &str) -> String;

    /// Named parameter placeholder for a logical property.
    /// Both dialects use `@Name`; providers rewrite to their native
    /// positional form at bind time.
    fn placeholder(&self, name: &str) -> String {
        format!("@{}", name)
    }

    /// Map a logical column type to the dialect's SQL type string.
    fn sql_type(&self, ty: &ColumnType) -> String;

    /// Prefix emitted directly after `SELECT` (T-SQL `TOP n`).
    /// Empty for dialects that limit with a trailing clause.
    fn top_clause(&self, limit: Option<usize>, offset: Option<usize>) -> String;

    /// Trailing row-limit clause (`LIMIT n OFFSET m`, `OFFSET … FETCH …`).
    /// Empty for dialects that already limited via [`Self::top_clause`].
    fn limit_clause(&self, limit: Option<usize>, offset: Option<usize>) -> String;

    /// Random-ordering function for `ORDER BY`.
    fn random_function(&self) -> &'static str;
}
