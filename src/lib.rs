//! Typed relational access with per-dialect SQL generation.
//!
//! Record types describe their columns once; the engine renders, caches
//! and executes the SQL for them against PostgreSQL or SQL Server.
//!
//! ```ignore
//! use tablekit::prelude::*;
//! let table: Table<User, PgProvider> = Table::new(provider, Dialect::Postgres, &cache)?;
//! let user = table.insert(User::named("ada")).await?;
//! ```

pub mod command;
pub mod config;
pub mod cursor;
pub mod descriptor;
pub mod dialect;
pub mod error;
pub mod migrate;
pub mod pg;
pub mod predicate;
pub mod provider;
pub mod record;
pub mod row;
pub mod statement;
pub mod table;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude {
    pub use crate::command::{CommandKind, SqlCommand};
    pub use crate::config::Config;
    pub use crate::cursor::KeyGenerator;
    pub use crate::descriptor::{DescriptorCache, TableDescriptor};
    pub use crate::dialect::Dialect;
    pub use crate::error::{Error, Result};
    pub use crate::migrate::{Migration, MigrationRegistry, Migrator};
    pub use crate::pg::PgProvider;
    pub use crate::predicate::Predicate;
    pub use crate::provider::{Connection, ConnectionProvider, Transaction};
    pub use crate::record::{ColumnSpec, ColumnType, Record, RecordPair};
    pub use crate::row::Row;
    pub use crate::table::Table;
    pub use crate::value::Value;
}
