//! sqlx-backed Postgres connection provider.
//!
//! Rewrites the named `@Name` placeholders in a [`SqlCommand`] to
//! positional `$n` in parameter order and binds every value through
//! sqlx; user-supplied values never reach the SQL text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::{Column, Row as _, TypeInfo};
use uuid::Uuid;

use crate::command::SqlCommand;
use crate::error::{Error, Result};
use crate::provider::{Connection, ConnectionProvider, Transaction};
use crate::row::Row;
use crate::value::Value;

/// Connection provider over a shared [`PgPool`].
#[derive(Clone)]
pub struct PgProvider {
    pool: PgPool,
}

impl PgProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url)
            .await
            .map_err(|e| Error::execution(e.to_string(), "<connect>", Vec::new()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A pooled connection handle.
pub struct PgConnection {
    conn: sqlx::pool::PoolConnection<sqlx::Postgres>,
}

/// An open transaction handle.
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, sqlx::Postgres>,
}

#[async_trait]
impl ConnectionProvider for PgProvider {
    type Connection = PgConnection;
    type Transaction = PgTransaction;

    async fn acquire(&self) -> Result<PgConnection> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| Error::execution(e.to_string(), "<acquire>", Vec::new()))?;
        Ok(PgConnection { conn })
    }

    async fn begin(&self) -> Result<PgTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::execution(e.to_string(), "<begin>", Vec::new()))?;
        Ok(PgTransaction { tx })
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn query(&mut self, cmd: &SqlCommand) -> Result<Vec<Row>> {
        run_query(&mut *self.conn, cmd).await
    }

    async fn execute(&mut self, cmd: &SqlCommand) -> Result<u64> {
        run_execute(&mut *self.conn, cmd).await
    }
}

#[async_trait]
impl Connection for PgTransaction {
    async fn query(&mut self, cmd: &SqlCommand) -> Result<Vec<Row>> {
        run_query(&mut *self.tx, cmd).await
    }

    async fn execute(&mut self, cmd: &SqlCommand) -> Result<u64> {
        run_execute(&mut *self.tx, cmd).await
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| Error::execution(e.to_string(), "<commit>", Vec::new()))
    }

    async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| Error::execution(e.to_string(), "<rollback>", Vec::new()))
    }
}

async fn run_query(
    conn: &mut sqlx::PgConnection,
    cmd: &SqlCommand,
) -> Result<Vec<Row>> {
    let sql = positional_sql(cmd);
    tracing::debug!(sql = %sql, "executing query");
    let mut query = sqlx::query(&sql);
    for (_, value) in cmd.params() {
        query = bind_value(query, value);
    }
    let rows = query
        .fetch_all(conn)
        .await
        .map_err(|e| Error::execution(e.to_string(), cmd.text(), cmd.params_snapshot()))?;
    rows.iter().map(decode_row).collect()
}

async fn run_execute(conn: &mut sqlx::PgConnection, cmd: &SqlCommand) -> Result<u64> {
    let sql = positional_sql(cmd);
    tracing::debug!(sql = %sql, "executing statement");
    let mut query = sqlx::query(&sql);
    for (_, value) in cmd.params() {
        query = bind_value(query, value);
    }
    let done = query
        .execute(conn)
        .await
        .map_err(|e| Error::execution(e.to_string(), cmd.text(), cmd.params_snapshot()))?;
    Ok(done.rows_affected())
}

/// Rewrite `@Name` placeholders to `$n` in parameter order. Longer names
/// are replaced first so `@Id` never clobbers `@Id0`.
fn positional_sql(cmd: &SqlCommand) -> String {
    let mut order: Vec<(usize, &str)> = cmd
        .params()
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (i, name.as_str()))
        .collect();
    order.sort_by_key(|(_, name)| std::cmp::Reverse(name.len()));

    let mut sql = cmd.text().to_string();
    for (index, name) in order {
        sql = sql.replace(&format!("@{}", name), &format!("${}", index + 1));
    }
    sql
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    value: &Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(n) => query.bind(*n),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.clone()),
        Value::Uuid(u) => query.bind(*u),
        Value::Timestamp(t) => query.bind(*t),
    }
}

fn decode_row(row: &PgRow) -> Result<Row> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let value = decode_value(row, i, column.type_info().name())
            .map_err(|e| Error::decode(&name, e.to_string()))?;
        out.push(name, value);
    }
    Ok(out)
}

fn decode_value(row: &PgRow, index: usize, type_name: &str) -> sqlx::Result<Value> {
    Ok(match type_name {
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)?
            .map_or(Value::Null, Value::Uuid),
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)?
            .map_or(Value::Null, Value::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map_or(Value::Null, |n| Value::Int(i64::from(n))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)?
            .map_or(Value::Null, |n| Value::Int(i64::from(n))),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)?
            .map_or(Value::Null, Value::Int),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map_or(Value::Null, |n| Value::Float(f64::from(n))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)?
            .map_or(Value::Null, Value::Float),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map_or(Value::Null, Value::Timestamp),
        _ => row
            .try_get::<Option<String>, _>(index)?
            .map_or(Value::Null, Value::Text),
    })
}
