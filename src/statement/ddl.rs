//! Descriptor-driven DDL: table bootstrap.

use crate::descriptor::TableDescriptor;
use crate::dialect::Dialect;

/// Render an idempotent CREATE TABLE from the descriptor set.
pub fn build_ensure_table(d: &TableDescriptor) -> String {
    let columns = d
        .columns()
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", c.quoted, c.sql_type);
            if c.key {
                def.push_str(" PRIMARY KEY");
            } else if !c.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect::<Vec<_>>()
        .join(", ");

    match d.dialect() {
        Dialect::Postgres => format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            d.quoted_table, columns
        ),
        Dialect::SqlServer => format!(
            "IF OBJECT_ID(N'{table}', N'U') IS NULL CREATE TABLE {quoted} ({columns})",
            table = d.table,
            quoted = d.quoted_table,
        ),
    }
}
