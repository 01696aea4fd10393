//! DELETE statement builders.

use crate::descriptor::TableDescriptor;
use crate::error::Result;
use crate::predicate::Predicate;

pub fn build_delete_by_id(d: &TableDescriptor) -> String {
    format!("DELETE FROM {} WHERE {}", d.quoted_table, d.key().assignment)
}

/// Batch delete over an IN list. Placeholders are `@Id0..@IdN` in id
/// order.
pub fn build_delete_many(d: &TableDescriptor, count: usize) -> String {
    let key = d.key();
    let placeholders = (0..count)
        .map(|i| format!("{}{}", key.placeholder, i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "DELETE FROM {} WHERE {} IN ({})",
        d.quoted_table, key.column, placeholders
    )
}

pub fn build_delete_by(d: &TableDescriptor, predicate: &Predicate) -> Result<String> {
    Ok(format!(
        "DELETE FROM {} WHERE {}",
        d.quoted_table,
        predicate.where_clause(d)?
    ))
}

pub fn build_delete_all(d: &TableDescriptor) -> String {
    format!("DELETE FROM {}", d.quoted_table)
}
