//! Migration declarations and the registration-time duplicate guard.

use std::collections::HashSet;

use crate::dialect::Dialect;
use crate::error::{Error, Result};

type ApplyFn = Box<dyn Fn(Dialect) -> String + Send + Sync>;

/// A versioned schema-change unit. The ID is monotonically increasing
/// per table and gap-tolerant; the apply function renders the change's
/// SQL for the configured dialect.
pub struct Migration {
    pub id: u64,
    pub table_id: String,
    pub description: String,
    apply: ApplyFn,
}

impl Migration {
    pub fn new(
        id: u64,
        table_id: impl Into<String>,
        description: impl Into<String>,
        apply: impl Fn(Dialect) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            table_id: table_id.into(),
            description: description.into(),
            apply: Box::new(apply),
        }
    }

    /// A migration whose SQL is the same under every dialect.
    pub fn sql(
        id: u64,
        table_id: impl Into<String>,
        description: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        let sql = sql.into();
        Self::new(id, table_id, description, move |_| sql.clone())
    }

    pub fn render(&self, dialect: Dialect) -> String {
        (self.apply)(dialect)
    }
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("id", &self.id)
            .field("table_id", &self.table_id)
            .field("description", &self.description)
            .finish()
    }
}

/// The ordered set of declared migrations.
///
/// Registering two migrations with the same ID for the same table fails
/// immediately; this is a startup-time guard, not a runtime one.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    entries: Vec<Migration>,
    seen: HashSet<(String, u64)>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, migration: Migration) -> Result<()> {
        let key = (migration.table_id.clone(), migration.id);
        if !self.seen.insert(key) {
            return Err(Error::DuplicateMigration {
                id: migration.id,
                table: migration.table_id,
            });
        }
        self.entries.push(migration);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Migration> {
        self.entries.iter()
    }
}
