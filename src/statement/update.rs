//! UPDATE statement builder.

use crate::descriptor::TableDescriptor;

/// Full-row overwrite by key: every non-key column is assigned.
pub fn build_update(d: &TableDescriptor) -> String {
    let assignments = d
        .columns()
        .iter()
        .filter(|c| !c.key)
        .map(|c| c.assignment.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {} WHERE {}",
        d.quoted_table,
        assignments,
        d.key().assignment
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::testing::User;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_excludes_key_from_set() {
        let d = TableDescriptor::build::<User>(Dialect::Postgres).unwrap();
        assert_eq!(
            build_update(&d),
            "UPDATE \"users\" SET date_created = @DateCreated, last_modified = @LastModified, \
             created_by = @CreatedBy, user_name = @UserName, email = @Email, age = @Age \
             WHERE id = @Id"
        );
    }
}
