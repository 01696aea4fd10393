//! The generic table engine.
//!
//! Every operation comes in two forms with identical semantics: a
//! convenience form that acquires a connection from the provider, and a
//! `*_on` form that runs against a caller-supplied connection or open
//! transaction. Cancellation is cooperative and checked only at
//! operation entry; a round trip already in flight runs to completion.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::command::SqlCommand;
use crate::descriptor::DescriptorCache;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::predicate::Predicate;
use crate::provider::{Connection, ConnectionProvider};
use crate::record::{Record, RecordPair};
use crate::statement::{StatementKind, Statements};
use crate::value::Value;

pub struct Table<R, P>
where
    R: Record + 'static,
    P: ConnectionProvider,
{
    provider: Arc<P>,
    statements: Statements,
    cancel: CancellationToken,
    _record: PhantomData<fn() -> R>,
}

impl<R, P> Table<R, P>
where
    R: Record + 'static,
    P: ConnectionProvider,
{
    /// Build a table engine for `R` under the given dialect. Descriptors
    /// come from the injected cache, so repeated construction for the
    /// same type is metadata-free after the first call.
    pub fn new(provider: Arc<P>, dialect: Dialect, cache: &DescriptorCache) -> Result<Self> {
        let descriptor = cache.descriptor_for::<R>(dialect)?;
        Ok(Self {
            provider,
            statements: Statements::new(descriptor),
            cancel: CancellationToken::new(),
            _record: PhantomData,
        })
    }

    /// Attach a cooperative cancellation signal.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.statements.descriptor().dialect()
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn fixed_cmd(&self, kind: StatementKind) -> SqlCommand {
        let sql = self.statements.fixed(kind);
        match kind {
            StatementKind::Count => SqlCommand::scalar(sql.as_str()),
            StatementKind::Insert
            | StatementKind::Update
            | StatementKind::DeleteById
            | StatementKind::DeleteAll
            | StatementKind::EnsureTable => SqlCommand::execute(sql.as_str()),
            _ => SqlCommand::query(sql.as_str()),
        }
        .with_shape(kind)
    }

    fn rows_to_records(rows: Vec<crate::row::Row>) -> Result<Vec<R>> {
        rows.iter().map(R::from_row).collect()
    }

    // ----- insert -----

    pub async fn insert(&self, record: R) -> Result<R> {
        let mut conn = self.provider.acquire().await?;
        self.insert_on(&mut conn, record).await
    }

    /// Assigns a fresh identifier (when unset) and the creation
    /// timestamp, then executes the insert.
    pub async fn insert_on<C: Connection>(&self, conn: &mut C, mut record: R) -> Result<R> {
        if self.cancelled() {
            return Ok(record);
        }
        if record.id().is_nil() {
            record.set_id(Uuid::new_v4());
        }
        record.set_date_created(Utc::now());
        let cmd = self
            .fixed_cmd(StatementKind::Insert)
            .bind_all(record.to_row());
        conn.execute(&cmd).await?;
        Ok(record)
    }

    // ----- lookups -----

    pub async fn get(&self, id: Uuid) -> Result<Option<R>> {
        let mut conn = self.provider.acquire().await?;
        self.get_on(&mut conn, id).await
    }

    pub async fn get_on<C: Connection>(&self, conn: &mut C, id: Uuid) -> Result<Option<R>> {
        if self.cancelled() {
            return Ok(None);
        }
        let key = self.statements.descriptor().key().property.clone();
        let cmd = self.fixed_cmd(StatementKind::GetById).bind(key, id);
        let rows = conn.query(&cmd).await?;
        rows.first().map(R::from_row).transpose()
    }

    pub async fn get_by(&self, predicate: &Predicate) -> Result<Option<R>> {
        let mut conn = self.provider.acquire().await?;
        self.get_by_on(&mut conn, predicate).await
    }

    /// At most one record. A predicate matching more than one row is an
    /// error, never a silent first-row pick.
    pub async fn get_by_on<C: Connection>(
        &self,
        conn: &mut C,
        predicate: &Predicate,
    ) -> Result<Option<R>> {
        if self.cancelled() {
            return Ok(None);
        }
        let sql = self.statements.predicated(StatementKind::GetBy, predicate)?;
        let cmd = SqlCommand::query(sql.as_str())
            .with_shape(StatementKind::GetBy)
            .bind_all(predicate.params());
        let rows = conn.query(&cmd).await?;
        if rows.len() > 1 {
            return Err(Error::DuplicateRecord {
                table: self.statements.descriptor().table.clone(),
            });
        }
        rows.first().map(R::from_row).transpose()
    }

    pub async fn all(&self) -> Result<Vec<R>> {
        let mut conn = self.provider.acquire().await?;
        self.all_on(&mut conn).await
    }

    pub async fn all_on<C: Connection>(&self, conn: &mut C) -> Result<Vec<R>> {
        if self.cancelled() {
            return Ok(Vec::new());
        }
        let cmd = self.fixed_cmd(StatementKind::All);
        Self::rows_to_records(conn.query(&cmd).await?)
    }

    pub async fn filter(&self, predicate: &Predicate) -> Result<Vec<R>> {
        let mut conn = self.provider.acquire().await?;
        self.filter_on(&mut conn, predicate).await
    }

    /// Zero or more records; an empty match is not an error.
    pub async fn filter_on<C: Connection>(
        &self,
        conn: &mut C,
        predicate: &Predicate,
    ) -> Result<Vec<R>> {
        if self.cancelled() {
            return Ok(Vec::new());
        }
        let sql = self.statements.predicated(StatementKind::Filter, predicate)?;
        let cmd = SqlCommand::query(sql.as_str())
            .with_shape(StatementKind::Filter)
            .bind_all(predicate.params());
        Self::rows_to_records(conn.query(&cmd).await?)
    }

    /// Raw-SQL escape hatch for trusted call sites only: the text is
    /// executed as given, with the supplied parameters bound.
    pub async fn find_with_sql(&self, sql: &str, params: Vec<(String, Value)>) -> Result<Vec<R>> {
        let mut conn = self.provider.acquire().await?;
        self.find_with_sql_on(&mut conn, sql, params).await
    }

    pub async fn find_with_sql_on<C: Connection>(
        &self,
        conn: &mut C,
        sql: &str,
        params: Vec<(String, Value)>,
    ) -> Result<Vec<R>> {
        if self.cancelled() {
            return Ok(Vec::new());
        }
        let cmd = SqlCommand::query(sql).bind_all(params);
        Self::rows_to_records(conn.query(&cmd).await?)
    }

    // ----- update / delete -----

    pub async fn update(&self, record: R) -> Result<R> {
        let mut conn = self.provider.acquire().await?;
        self.update_on(&mut conn, record).await
    }

    /// Full-row overwrite by key; stamps `LastModified`.
    pub async fn update_on<C: Connection>(&self, conn: &mut C, mut record: R) -> Result<R> {
        if self.cancelled() {
            return Ok(record);
        }
        record.set_last_modified(Some(Utc::now()));
        let cmd = self
            .fixed_cmd(StatementKind::Update)
            .bind_all(record.to_row());
        conn.execute(&cmd).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64> {
        let mut conn = self.provider.acquire().await?;
        self.delete_on(&mut conn, id).await
    }

    /// Unconditional delete; an absent row is not an error.
    pub async fn delete_on<C: Connection>(&self, conn: &mut C, id: Uuid) -> Result<u64> {
        if self.cancelled() {
            return Ok(0);
        }
        let key = self.statements.descriptor().key().property.clone();
        let cmd = self.fixed_cmd(StatementKind::DeleteById).bind(key, id);
        conn.execute(&cmd).await
    }

    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<u64> {
        let mut conn = self.provider.acquire().await?;
        self.delete_many_on(&mut conn, ids).await
    }

    pub async fn delete_many_on<C: Connection>(&self, conn: &mut C, ids: &[Uuid]) -> Result<u64> {
        if self.cancelled() || ids.is_empty() {
            return Ok(0);
        }
        let key = self.statements.descriptor().key().property.clone();
        let sql = self.statements.delete_many(ids.len());
        let mut cmd = SqlCommand::execute(sql).with_shape(StatementKind::DeleteById);
        for (i, id) in ids.iter().enumerate() {
            cmd = cmd.bind(format!("{}{}", key, i), *id);
        }
        conn.execute(&cmd).await
    }

    pub async fn delete_by(&self, predicate: &Predicate) -> Result<u64> {
        let mut conn = self.provider.acquire().await?;
        self.delete_by_on(&mut conn, predicate).await
    }

    pub async fn delete_by_on<C: Connection>(
        &self,
        conn: &mut C,
        predicate: &Predicate,
    ) -> Result<u64> {
        if self.cancelled() {
            return Ok(0);
        }
        let sql = self.statements.predicated(StatementKind::DeleteBy, predicate)?;
        let cmd = SqlCommand::execute(sql.as_str())
            .with_shape(StatementKind::DeleteBy)
            .bind_all(predicate.params());
        conn.execute(&cmd).await
    }

    pub async fn delete_all(&self) -> Result<u64> {
        let mut conn = self.provider.acquire().await?;
        self.delete_all_on(&mut conn).await
    }

    pub async fn delete_all_on<C: Connection>(&self, conn: &mut C) -> Result<u64> {
        if self.cancelled() {
            return Ok(0);
        }
        let cmd = self.fixed_cmd(StatementKind::DeleteAll);
        conn.execute(&cmd).await
    }

    // ----- scalars -----

    pub async fn count(&self) -> Result<u64> {
        let mut conn = self.provider.acquire().await?;
        self.count_on(&mut conn).await
    }

    pub async fn count_on<C: Connection>(&self, conn: &mut C) -> Result<u64> {
        if self.cancelled() {
            return Ok(0);
        }
        let cmd = self.fixed_cmd(StatementKind::Count);
        match conn.scalar(&cmd).await? {
            Some(Value::Int(n)) => Ok(n.max(0) as u64),
            _ => Ok(0),
        }
    }

    pub async fn exists(&self, predicate: &Predicate) -> Result<bool> {
        let mut conn = self.provider.acquire().await?;
        self.exists_on(&mut conn, predicate).await
    }

    pub async fn exists_on<C: Connection>(
        &self,
        conn: &mut C,
        predicate: &Predicate,
    ) -> Result<bool> {
        if self.cancelled() {
            return Ok(false);
        }
        let sql = self.statements.predicated(StatementKind::Exists, predicate)?;
        let cmd = SqlCommand::scalar(sql.as_str())
            .with_shape(StatementKind::Exists)
            .bind_all(predicate.params());
        // Postgres answers with a boolean, T-SQL with 1/0.
        Ok(match conn.scalar(&cmd).await? {
            Some(Value::Bool(b)) => b,
            Some(Value::Int(n)) => n != 0,
            _ => false,
        })
    }

    // ----- ordered access -----

    pub async fn first(&self) -> Result<Option<R>> {
        let mut conn = self.provider.acquire().await?;
        self.first_on(&mut conn).await
    }

    pub async fn first_on<C: Connection>(&self, conn: &mut C) -> Result<Option<R>> {
        self.one_ordered(conn, StatementKind::First).await
    }

    pub async fn last(&self) -> Result<Option<R>> {
        let mut conn = self.provider.acquire().await?;
        self.last_on(&mut conn).await
    }

    pub async fn last_on<C: Connection>(&self, conn: &mut C) -> Result<Option<R>> {
        self.one_ordered(conn, StatementKind::Last).await
    }

    async fn one_ordered<C: Connection>(
        &self,
        conn: &mut C,
        kind: StatementKind,
    ) -> Result<Option<R>> {
        if self.cancelled() {
            return Ok(None);
        }
        let cmd = self.fixed_cmd(kind);
        let rows = conn.query(&cmd).await?;
        rows.first().map(R::from_row).transpose()
    }

    /// Uniform-enough random sample; not cryptographically random.
    pub async fn random(&self, count: usize) -> Result<Vec<R>> {
        let mut conn = self.provider.acquire().await?;
        self.random_on(&mut conn, count).await
    }

    pub async fn random_on<C: Connection>(&self, conn: &mut C, count: usize) -> Result<Vec<R>> {
        if self.cancelled() {
            return Ok(Vec::new());
        }
        let cmd = SqlCommand::query(self.statements.random(count));
        Self::rows_to_records(conn.query(&cmd).await?)
    }

    pub async fn page(&self, limit: usize, offset: usize) -> Result<Vec<R>> {
        let mut conn = self.provider.acquire().await?;
        self.page_on(&mut conn, limit, offset).await
    }

    pub async fn page_on<C: Connection>(
        &self,
        conn: &mut C,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<R>> {
        if self.cancelled() {
            return Ok(Vec::new());
        }
        let cmd = SqlCommand::query(self.statements.page(limit, offset));
        Self::rows_to_records(conn.query(&cmd).await?)
    }

    pub async fn next(&self, token: RecordPair) -> Result<Option<R>> {
        let mut conn = self.provider.acquire().await?;
        self.next_on(&mut conn, token).await
    }

    /// The record created immediately after the token; `None` at the
    /// boundary.
    pub async fn next_on<C: Connection>(
        &self,
        conn: &mut C,
        token: RecordPair,
    ) -> Result<Option<R>> {
        self.adjacent(conn, StatementKind::Next, token).await
    }

    pub async fn previous(&self, token: RecordPair) -> Result<Option<R>> {
        let mut conn = self.provider.acquire().await?;
        self.previous_on(&mut conn, token).await
    }

    /// The record created immediately before the token; `None` at the
    /// boundary.
    pub async fn previous_on<C: Connection>(
        &self,
        conn: &mut C,
        token: RecordPair,
    ) -> Result<Option<R>> {
        self.adjacent(conn, StatementKind::Previous, token).await
    }

    async fn adjacent<C: Connection>(
        &self,
        conn: &mut C,
        kind: StatementKind,
        token: RecordPair,
    ) -> Result<Option<R>> {
        if self.cancelled() {
            return Ok(None);
        }
        let cmd = self.fixed_cmd(kind).bind("DateCreated", token.date_created);
        let rows = conn.query(&cmd).await?;
        rows.first().map(R::from_row).transpose()
    }

    /// Every `(id, date_created)` pair, newest first. The cursor's bulk
    /// fetch — far smaller than loading full rows.
    pub async fn sorted_ids(&self) -> Result<Vec<RecordPair>> {
        let mut conn = self.provider.acquire().await?;
        self.sorted_ids_on(&mut conn).await
    }

    pub async fn sorted_ids_on<C: Connection>(&self, conn: &mut C) -> Result<Vec<RecordPair>> {
        if self.cancelled() {
            return Ok(Vec::new());
        }
        let descriptor = self.statements.descriptor();
        let key = descriptor.key().column.clone();
        let created = descriptor.created().column.clone();
        let cmd = self.fixed_cmd(StatementKind::SortedIds);
        let rows = conn.query(&cmd).await?;
        rows.iter()
            .map(|row| {
                Ok(RecordPair {
                    id: row.uuid(&key)?,
                    date_created: row.timestamp(&created)?,
                })
            })
            .collect()
    }

    // ----- conditional writes -----

    pub async fn try_insert(&self, record: R, predicate: &Predicate) -> Result<(R, bool)> {
        let mut conn = self.provider.acquire().await?;
        self.try_insert_on(&mut conn, record, predicate).await
    }

    /// Insert unless a row matching the predicate already exists. One
    /// round trip, check-then-act: not atomic under concurrent writers.
    /// Returns the record and whether the insert fired. Predicate
    /// properties that are also record columns bind the record's value.
    pub async fn try_insert_on<C: Connection>(
        &self,
        conn: &mut C,
        mut record: R,
        predicate: &Predicate,
    ) -> Result<(R, bool)> {
        if self.cancelled() {
            return Ok((record, false));
        }
        if record.id().is_nil() {
            record.set_id(Uuid::new_v4());
        }
        record.set_date_created(Utc::now());
        let sql = self.statements.predicated(StatementKind::TryInsert, predicate)?;
        let cmd = SqlCommand::execute(sql.as_str())
            .with_shape(StatementKind::TryInsert)
            .bind_all(Self::merge_params(record.to_row(), predicate));
        let affected = conn.execute(&cmd).await?;
        Ok((record, affected > 0))
    }

    pub async fn insert_or_update(&self, record: R, predicate: &Predicate) -> Result<R> {
        let mut conn = self.provider.acquire().await?;
        self.insert_or_update_on(&mut conn, record, predicate).await
    }

    /// Update the row matching the predicate or insert when none exists.
    /// Same single-round-trip, check-then-act caveat as
    /// [`Self::try_insert_on`].
    pub async fn insert_or_update_on<C: Connection>(
        &self,
        conn: &mut C,
        mut record: R,
        predicate: &Predicate,
    ) -> Result<R> {
        if self.cancelled() {
            return Ok(record);
        }
        if record.id().is_nil() {
            record.set_id(Uuid::new_v4());
            record.set_date_created(Utc::now());
        }
        let sql = self.statements.predicated(StatementKind::Upsert, predicate)?;
        let cmd = SqlCommand::execute(sql.as_str())
            .with_shape(StatementKind::Upsert)
            .bind_all(Self::merge_params(record.to_row(), predicate));
        conn.execute(&cmd).await?;
        Ok(record)
    }

    /// Record params first; predicate params only for names the record
    /// does not already bind, so a shared `@Name` placeholder resolves
    /// to the record's value.
    fn merge_params(
        mut params: Vec<(String, Value)>,
        predicate: &Predicate,
    ) -> Vec<(String, Value)> {
        for (name, value) in predicate.entries() {
            if !params.iter().any(|(existing, _)| existing == name) {
                params.push((name.clone(), value.clone()));
            }
        }
        params
    }

    // ----- schema -----

    pub async fn ensure_table(&self) -> Result<()> {
        let mut conn = self.provider.acquire().await?;
        self.ensure_table_on(&mut conn).await
    }

    /// Idempotent CREATE TABLE rendered from the descriptor set.
    pub async fn ensure_table_on<C: Connection>(&self, conn: &mut C) -> Result<()> {
        if self.cancelled() {
            return Ok(());
        }
        let cmd = self.fixed_cmd(StatementKind::EnsureTable);
        conn.execute(&cmd).await?;
        Ok(())
    }
}
