//! Rows returned by connection providers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::value::Value;

/// A single result row: column values in select order, addressable by
/// column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column value. Providers push columns in select order.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push((column.into(), value));
    }

    /// Look up a column by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate columns in select order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn require(&self, column: &str) -> Result<&Value> {
        self.get(column)
            .ok_or_else(|| Error::decode(column, "column missing from row"))
    }

    /// Read a UUID column.
    pub fn uuid(&self, column: &str) -> Result<Uuid> {
        match self.require(column)? {
            Value::Uuid(u) => Ok(*u),
            other => Err(Error::decode(column, format!("expected uuid, got {other}"))),
        }
    }

    /// Read a non-null text column.
    pub fn text(&self, column: &str) -> Result<String> {
        match self.require(column)? {
            Value::Text(s) => Ok(s.clone()),
            other => Err(Error::decode(column, format!("expected text, got {other}"))),
        }
    }

    /// Read a nullable text column.
    pub fn text_opt(&self, column: &str) -> Result<Option<String>> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            other => Err(Error::decode(column, format!("expected text, got {other}"))),
        }
    }

    /// Read a non-null integer column.
    pub fn int(&self, column: &str) -> Result<i64> {
        match self.require(column)? {
            Value::Int(n) => Ok(*n),
            other => Err(Error::decode(column, format!("expected int, got {other}"))),
        }
    }

    /// Read a non-null boolean column.
    pub fn bool(&self, column: &str) -> Result<bool> {
        match self.require(column)? {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::decode(column, format!("expected bool, got {other}"))),
        }
    }

    /// Read a non-null timestamp column.
    pub fn timestamp(&self, column: &str) -> Result<DateTime<Utc>> {
        match self.require(column)? {
            Value::Timestamp(t) => Ok(*t),
            other => Err(Error::decode(
                column,
                format!("expected timestamp, got {other}"),
            )),
        }
    }

    /// Read a nullable timestamp column.
    pub fn timestamp_opt(&self, column: &str) -> Result<Option<DateTime<Utc>>> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::Timestamp(t) => Ok(Some(*t)),
            other => Err(Error::decode(
                column,
                format!("expected timestamp, got {other}"),
            )),
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
