//! The `Record` trait: static per-type metadata plus row conversion.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Logical column types, mapped to dialect SQL types by the generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Text,
    Varchar(u16),
    Int,
    BigInt,
    Bool,
    Float,
    Timestamptz,
    Bytea,
    Jsonb,
}

/// Static metadata for one mapped property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Logical property name (PascalCase, e.g. `UserName`).
    pub property: &'static str,
    /// Column name override. `None` means snake_case folding of the
    /// property name.
    pub column: Option<&'static str>,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Exactly one column per record type must set this.
    pub key: bool,
}

impl ColumnSpec {
    pub const fn new(property: &'static str, ty: ColumnType) -> Self {
        Self {
            property,
            column: None,
            ty,
            nullable: false,
            key: false,
        }
    }

    pub const fn key(property: &'static str, ty: ColumnType) -> Self {
        Self {
            property,
            column: None,
            ty,
            nullable: false,
            key: true,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn named(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }
}

/// A logical table row.
///
/// Every record carries an opaque 128-bit identifier assigned at insert,
/// an immutable creation timestamp, and a nullable last-modified
/// timestamp maintained by update operations. All remaining mapped
/// properties are declared through [`Record::columns`].
pub trait Record: Sized + Send + Sync {
    /// Base table name (already snake_case, unquoted).
    const TABLE: &'static str;

    /// Declared property metadata. The invariant columns (`Id`,
    /// `DateCreated`, `LastModified`) must be included, with `Id`
    /// flagged as the key.
    fn columns() -> &'static [ColumnSpec];

    fn id(&self) -> Uuid;
    fn set_id(&mut self, id: Uuid);

    fn date_created(&self) -> DateTime<Utc>;
    fn set_date_created(&mut self, at: DateTime<Utc>);

    fn last_modified(&self) -> Option<DateTime<Utc>>;
    fn set_last_modified(&mut self, at: Option<DateTime<Utc>>);

    /// Current property values keyed by logical property name, in
    /// declaration order.
    fn to_row(&self) -> Vec<(String, Value)>;

    /// Rebuild a record from a provider row keyed by column name.
    fn from_row(row: &Row) -> Result<Self>;

    /// Ordering key for cursor and next/previous queries.
    fn pair(&self) -> RecordPair {
        RecordPair {
            id: self.id(),
            date_created: self.date_created(),
        }
    }
}

/// The minimal ordering key: `(DateCreated, Id)`, totally ordered by
/// creation time with the identifier as tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPair {
    pub id: Uuid,
    pub date_created: DateTime<Utc>,
}

impl Ord for RecordPair {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.date_created
            .cmp(&other.date_created)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for RecordPair {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
