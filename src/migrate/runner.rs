//! The migration application engine.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::SqlCommand;
use crate::descriptor::DescriptorCache;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::migrate::registry::MigrationRegistry;
use crate::provider::{Connection, ConnectionProvider, Transaction};
use crate::record::{ColumnSpec, ColumnType, Record};
use crate::row::Row;
use crate::table::Table;
use crate::value::Value;

/// A durably persisted "this migration ran" row. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMigration {
    pub id: Uuid,
    pub date_created: DateTime<Utc>,
    pub last_modified: Option<DateTime<Utc>>,
    pub migration_id: i64,
    pub table_id: String,
    pub description: String,
    pub applied_on: DateTime<Utc>,
}

static APPLIED_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::key("Id", ColumnType::Uuid),
    ColumnSpec::new("DateCreated", ColumnType::Timestamptz),
    ColumnSpec::new("LastModified", ColumnType::Timestamptz).nullable(),
    ColumnSpec::new("MigrationId", ColumnType::BigInt),
    ColumnSpec::new("TableId", ColumnType::Text),
    ColumnSpec::new("Description", ColumnType::Text),
    ColumnSpec::new("AppliedOn", ColumnType::Timestamptz),
];

impl Record for AppliedMigration {
    const TABLE: &'static str = "schema_migrations";

    fn columns() -> &'static [ColumnSpec] {
        APPLIED_COLUMNS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn date_created(&self) -> DateTime<Utc> {
        self.date_created
    }

    fn set_date_created(&mut self, at: DateTime<Utc>) {
        self.date_created = at;
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    fn set_last_modified(&mut self, at: Option<DateTime<Utc>>) {
        self.last_modified = at;
    }

    fn to_row(&self) -> Vec<(String, Value)> {
        vec![
            ("Id".into(), self.id.into()),
            ("DateCreated".into(), self.date_created.into()),
            ("LastModified".into(), self.last_modified.into()),
            ("MigrationId".into(), self.migration_id.into()),
            ("TableId".into(), self.table_id.as_str().into()),
            ("Description".into(), self.description.as_str().into()),
            ("AppliedOn".into(), self.applied_on.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.uuid("id")?,
            date_created: row.timestamp("date_created")?,
            last_modified: row.timestamp_opt("last_modified")?,
            migration_id: row.int("migration_id")?,
            table_id: row.text("table_id")?,
            description: row.text("description")?,
            applied_on: row.timestamp("applied_on")?,
        })
    }
}

/// Applies registered migrations exactly once, in ascending ID order,
/// inside a single transaction.
///
/// The runner provides no cross-process mutual exclusion; callers must
/// serialize concurrent migration runs externally (an advisory lock or
/// deploy-time ordering).
pub struct Migrator<P: ConnectionProvider> {
    table: Table<AppliedMigration, P>,
    registry: MigrationRegistry,
    dialect: Dialect,
}

impl<P: ConnectionProvider> Migrator<P> {
    pub fn new(
        provider: Arc<P>,
        dialect: Dialect,
        cache: &DescriptorCache,
        registry: MigrationRegistry,
    ) -> Result<Self> {
        let table = Table::new(provider, dialect, cache)?;
        Ok(Self {
            table,
            registry,
            dialect,
        })
    }

    /// Apply every registered-but-unapplied migration. Returns how many
    /// were applied. A second call with nothing new applies zero and
    /// leaves the persisted state untouched.
    pub async fn apply_migrations(&self) -> Result<usize> {
        self.table.ensure_table().await?;

        let applied: HashSet<(String, u64)> = self
            .table
            .all()
            .await?
            .into_iter()
            .map(|m| (m.table_id, m.migration_id as u64))
            .collect();

        let mut pending: Vec<_> = self
            .registry
            .iter()
            .filter(|m| !applied.contains(&(m.table_id.clone(), m.id)))
            .collect();
        pending.sort_by_key(|m| m.id);

        if pending.is_empty() {
            debug!("no pending migrations");
            return Ok(0);
        }
        info!(pending = pending.len(), "applying migrations");

        let mut tx = self.table.provider().begin().await?;
        for migration in &pending {
            let sql = migration.render(self.dialect);
            debug!(id = migration.id, sql = %sql, "applying migration");
            let outcome = self.apply_one(&mut tx, migration, sql).await;
            if let Err(source) = outcome {
                warn!(id = migration.id, "migration failed, rolling back batch");
                tx.rollback().await?;
                return Err(Error::Migration {
                    id: migration.id,
                    description: migration.description.clone(),
                    source: Box::new(source),
                });
            }
        }
        tx.commit().await?;
        info!(applied = pending.len(), "migration batch committed");
        Ok(pending.len())
    }

    async fn apply_one(
        &self,
        tx: &mut P::Transaction,
        migration: &crate::migrate::Migration,
        sql: String,
    ) -> Result<()> {
        tx.execute(&SqlCommand::execute(sql)).await?;
        let record = AppliedMigration {
            id: Uuid::nil(),
            date_created: Utc::now(),
            last_modified: None,
            migration_id: migration.id as i64,
            table_id: migration.table_id.clone(),
            description: migration.description.clone(),
            applied_on: Utc::now(),
        };
        self.table.insert_on(tx, record).await?;
        Ok(())
    }
}
