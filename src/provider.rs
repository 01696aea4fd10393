//! Connection and transaction seams.
//!
//! The engine never manages pooling or retry policy; it consumes opaque
//! handles supplied by a [`ConnectionProvider`] and hands them
//! [`SqlCommand`] values to run.

use async_trait::async_trait;

use crate::command::SqlCommand;
use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// An open connection (or live transaction) that can run commands.
#[async_trait]
pub trait Connection: Send {
    /// Run a row-returning command.
    async fn query(&mut self, cmd: &SqlCommand) -> Result<Vec<Row>>;

    /// Run a command and return the affected-row count.
    async fn execute(&mut self, cmd: &SqlCommand) -> Result<u64>;

    /// Run a command and return the first column of the first row.
    async fn scalar(&mut self, cmd: &SqlCommand) -> Result<Option<Value>> {
        let rows = self.query(cmd).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.iter().next().map(|(_, v)| v.clone())))
    }
}

/// A connection bound to an open transaction.
#[async_trait]
pub trait Transaction: Connection {
    async fn commit(self) -> Result<()>;
    async fn rollback(self) -> Result<()>;
}

/// Supplies connections and transactions. Pooling, retry and timeout
/// policy all live behind this seam.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Connection: Connection;
    type Transaction: Transaction;

    async fn acquire(&self) -> Result<Self::Connection>;
    async fn begin(&self) -> Result<Self::Transaction>;
}
