//! Forward-only iteration over record identifiers.

use std::collections::VecDeque;

use uuid::Uuid;

use crate::error::Result;
use crate::provider::ConnectionProvider;
use crate::record::{Record, RecordPair};
use crate::table::Table;

/// A single-consumer cursor over every record identifier, ordered by
/// creation time descending.
///
/// The first advance fetches the full `(id, date_created)` pair list in
/// one round trip and buffers it; subsequent advances consume the buffer
/// with no further I/O. Exhaustion yields `None` and resets the buffer,
/// so the next advance starts a fresh pass with a new fetch. Not safe
/// for concurrent use; each consumer owns its own generator.
pub struct KeyGenerator<'t, R, P>
where
    R: Record + 'static,
    P: ConnectionProvider,
{
    table: &'t Table<R, P>,
    buffer: Option<VecDeque<RecordPair>>,
}

impl<'t, R, P> KeyGenerator<'t, R, P>
where
    R: Record + 'static,
    P: ConnectionProvider,
{
    pub fn new(table: &'t Table<R, P>) -> Self {
        Self {
            table,
            buffer: None,
        }
    }

    /// Advance one step. `None` means the pass is exhausted.
    pub async fn next_id(&mut self) -> Result<Option<Uuid>> {
        let pair = self.next_pair().await?;
        Ok(pair.map(|p| p.id))
    }

    /// Advance one step, yielding the full ordering token.
    pub async fn next_pair(&mut self) -> Result<Option<RecordPair>> {
        let buffer = match self.buffer {
            Some(ref mut buffer) => buffer,
            None => {
                let pairs = self.table.sorted_ids().await?;
                self.buffer.insert(pairs.into())
            }
        };
        match buffer.pop_front() {
            Some(pair) => Ok(Some(pair)),
            None => {
                // Reset so a fresh pass refetches.
                self.buffer = None;
                Ok(None)
            }
        }
    }
}
