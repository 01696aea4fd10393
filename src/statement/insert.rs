//! INSERT statement builder.

use crate::descriptor::TableDescriptor;

/// Full-column insert in declaration order.
pub fn build_insert(d: &TableDescriptor) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        d.quoted_table,
        d.column_list(),
        d.placeholder_list()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::testing::User;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_postgres() {
        let d = TableDescriptor::build::<User>(Dialect::Postgres).unwrap();
        assert_eq!(
            build_insert(&d),
            "INSERT INTO \"users\" (\"id\", \"date_created\", \"last_modified\", \"created_by\", \
             \"user_name\", \"email\", \"age\") VALUES (@Id, @DateCreated, @LastModified, \
             @CreatedBy, @UserName, @Email, @Age)"
        );
    }

    #[test]
    fn test_insert_sqlserver_quoting() {
        let d = TableDescriptor::build::<User>(Dialect::SqlServer).unwrap();
        let sql = build_insert(&d);
        assert!(sql.starts_with("INSERT INTO [users] ([id], [date_created]"));
        assert!(sql.contains("VALUES (@Id, @DateCreated"));
    }
}
