//! Conditional insert and insert-or-update builders.
//!
//! Both shapes are check-then-act guarded by a predicate and execute as
//! one round trip, but they are not atomic upserts: two concurrent
//! writers can both pass the existence check. Callers needing real
//! atomicity must hold a unique constraint on the guarded columns.

use crate::descriptor::TableDescriptor;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::predicate::Predicate;

/// Insert only when no row matches the predicate.
pub fn build_try_insert(d: &TableDescriptor, predicate: &Predicate) -> Result<String> {
    let clause = predicate.where_clause(d)?;
    Ok(match d.dialect() {
        Dialect::Postgres => format!(
            "INSERT INTO {table} ({cols}) SELECT {values} WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE {clause})",
            table = d.quoted_table,
            cols = d.column_list(),
            values = d.placeholder_list(),
        ),
        Dialect::SqlServer => format!(
            "IF NOT EXISTS (SELECT 1 FROM {table} WHERE {clause}) INSERT INTO {table} ({cols}) VALUES ({values})",
            table = d.quoted_table,
            cols = d.column_list(),
            values = d.placeholder_list(),
        ),
    })
}

/// Update the row matching the predicate, inserting when none exists.
pub fn build_insert_or_update(d: &TableDescriptor, predicate: &Predicate) -> Result<String> {
    let clause = predicate.where_clause(d)?;
    let assignments = d
        .columns()
        .iter()
        .filter(|c| !c.key)
        .map(|c| c.assignment.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Ok(match d.dialect() {
        // Writable-CTE form: the UPDATE runs first; the INSERT fires only
        // when it touched nothing.
        Dialect::Postgres => format!(
            "WITH updated AS (UPDATE {table} SET {assignments} WHERE {clause} RETURNING {key}) \
             INSERT INTO {table} ({cols}) SELECT {values} WHERE NOT EXISTS (SELECT 1 FROM updated)",
            table = d.quoted_table,
            key = d.key().quoted,
            cols = d.column_list(),
            values = d.placeholder_list(),
        ),
        Dialect::SqlServer => format!(
            "IF NOT EXISTS (SELECT 1 FROM {table} WHERE {clause}) \
             INSERT INTO {table} ({cols}) VALUES ({values}) \
             ELSE UPDATE {table} SET {assignments} WHERE {clause}",
            table = d.quoted_table,
            cols = d.column_list(),
            values = d.placeholder_list(),
        ),
    })
}
