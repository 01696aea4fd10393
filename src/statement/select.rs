//! SELECT-shaped statement builders.

use crate::descriptor::TableDescriptor;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::predicate::Predicate;

/// All rows, declaration-order column list, no ordering guarantee.
pub fn build_all(d: &TableDescriptor) -> String {
    format!("SELECT {} FROM {}", d.column_list(), d.quoted_table)
}

/// Oldest row by creation time.
pub fn build_first(d: &TableDescriptor) -> String {
    ordered_limit_one(d, "ASC")
}

/// Newest row by creation time.
pub fn build_last(d: &TableDescriptor) -> String {
    ordered_limit_one(d, "DESC")
}

fn ordered_limit_one(d: &TableDescriptor, direction: &str) -> String {
    let generator = d.dialect().generator();
    let created = &d.created().quoted;
    format!(
        "SELECT {top}{cols} FROM {table} ORDER BY {created} {direction}{limit}",
        top = generator.top_clause(Some(1), None),
        cols = d.column_list(),
        table = d.quoted_table,
        limit = generator.limit_clause(Some(1), None),
    )
}

pub fn build_count(d: &TableDescriptor) -> String {
    format!("SELECT COUNT(*) FROM {}", d.quoted_table)
}

pub fn build_get_by_id(d: &TableDescriptor) -> String {
    format!(
        "SELECT {} FROM {} WHERE {}",
        d.column_list(),
        d.quoted_table,
        d.key().assignment
    )
}

/// Single-row predicate lookup. Limit 2 so the engine can detect a
/// predicate that matched more than one row instead of silently taking
/// the first.
pub fn build_get_by(d: &TableDescriptor, predicate: &Predicate) -> Result<String> {
    let generator = d.dialect().generator();
    Ok(format!(
        "SELECT {top}{cols} FROM {table} WHERE {clause}{limit}",
        top = generator.top_clause(Some(2), None),
        cols = d.column_list(),
        table = d.quoted_table,
        clause = predicate.where_clause(d)?,
        limit = generator.limit_clause(Some(2), None),
    ))
}

/// Zero-or-more predicate query.
pub fn build_filter(d: &TableDescriptor, predicate: &Predicate) -> Result<String> {
    Ok(format!(
        "SELECT {} FROM {} WHERE {}",
        d.column_list(),
        d.quoted_table,
        predicate.where_clause(d)?
    ))
}

pub fn build_exists(d: &TableDescriptor, predicate: &Predicate) -> Result<String> {
    let clause = predicate.where_clause(d)?;
    let inner = format!("SELECT 1 FROM {} WHERE {}", d.quoted_table, clause);
    Ok(match d.dialect() {
        Dialect::Postgres => format!("SELECT EXISTS ({})", inner),
        Dialect::SqlServer => {
            format!("SELECT CASE WHEN EXISTS ({}) THEN 1 ELSE 0 END", inner)
        }
    })
}

/// Uniform-enough random sample; not cryptographically random.
pub fn build_random(d: &TableDescriptor, count: usize) -> String {
    let generator = d.dialect().generator();
    format!(
        "SELECT {top}{cols} FROM {table} ORDER BY {random}{limit}",
        top = generator.top_clause(Some(count), None),
        cols = d.column_list(),
        table = d.quoted_table,
        random = generator.random_function(),
        limit = generator.limit_clause(Some(count), None),
    )
}

/// Stable page ordered by creation time then key.
pub fn build_page(d: &TableDescriptor, limit: usize, offset: usize) -> String {
    let generator = d.dialect().generator();
    let created = &d.created().quoted;
    format!(
        "SELECT {top}{cols} FROM {table} ORDER BY {created} ASC, {key} ASC{limit}",
        top = generator.top_clause(Some(limit), Some(offset)),
        cols = d.column_list(),
        table = d.quoted_table,
        key = d.key().quoted,
        limit = generator.limit_clause(Some(limit), Some(offset)),
    )
}

/// The row whose creation time is the minimum strictly greater than the
/// cursor token's.
pub fn build_next(d: &TableDescriptor) -> String {
    adjacent(d, ">", "ASC")
}

/// The row whose creation time is the maximum strictly less than the
/// cursor token's.
pub fn build_previous(d: &TableDescriptor) -> String {
    adjacent(d, "<", "DESC")
}

fn adjacent(d: &TableDescriptor, comparison: &str, direction: &str) -> String {
    let generator = d.dialect().generator();
    let created = d.created();
    format!(
        "SELECT {top}{cols} FROM {table} WHERE {col} {cmp} {ph} ORDER BY {quoted} {direction}{limit}",
        top = generator.top_clause(Some(1), None),
        cols = d.column_list(),
        table = d.quoted_table,
        col = created.column,
        cmp = comparison,
        ph = created.placeholder,
        quoted = created.quoted,
        limit = generator.limit_clause(Some(1), None),
    )
}

/// The cursor's bulk fetch: every `(id, date_created)` pair, newest
/// first, key descending as tie-break.
pub fn build_sorted_ids(d: &TableDescriptor) -> String {
    let created = &d.created().quoted;
    let key = &d.key().quoted;
    format!(
        "SELECT {key}, {created} FROM {table} ORDER BY {created} DESC, {key} DESC",
        table = d.quoted_table,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::User;
    use pretty_assertions::assert_eq;

    fn pg() -> TableDescriptor {
        TableDescriptor::build::<User>(Dialect::Postgres).unwrap()
    }

    fn tsql() -> TableDescriptor {
        TableDescriptor::build::<User>(Dialect::SqlServer).unwrap()
    }

    const PG_COLS: &str = "\"id\", \"date_created\", \"last_modified\", \"created_by\", \"user_name\", \"email\", \"age\"";

    #[test]
    fn test_all() {
        assert_eq!(build_all(&pg()), format!("SELECT {} FROM \"users\"", PG_COLS));
    }

    #[test]
    fn test_first_last() {
        assert_eq!(
            build_first(&pg()),
            format!("SELECT {} FROM \"users\" ORDER BY \"date_created\" ASC LIMIT 1", PG_COLS)
        );
        assert!(build_last(&tsql()).starts_with("SELECT TOP 1 "));
        assert!(build_last(&tsql()).ends_with("ORDER BY [date_created] DESC"));
    }

    #[test]
    fn test_get_by_pinned_scenario() {
        // {UserName: "a"} matchAll=true must produce snake_cased column
        // with a named parameter.
        let pred = Predicate::all().eq("UserName", "a");
        let sql = build_get_by(&pg(), &pred).unwrap();
        assert!(sql.contains("WHERE user_name = @UserName"));
        assert!(sql.ends_with("LIMIT 2"));
        assert_eq!(pred.params().len(), 1);
    }

    #[test]
    fn test_exists_per_dialect() {
        let pred = Predicate::all().eq("Email", "x");
        assert_eq!(
            build_exists(&pg(), &pred).unwrap(),
            "SELECT EXISTS (SELECT 1 FROM \"users\" WHERE email = @Email)"
        );
        assert_eq!(
            build_exists(&tsql(), &pred).unwrap(),
            "SELECT CASE WHEN EXISTS (SELECT 1 FROM [users] WHERE email = @Email) THEN 1 ELSE 0 END"
        );
    }

    #[test]
    fn test_random_per_dialect() {
        assert!(build_random(&pg(), 3).ends_with("ORDER BY RANDOM() LIMIT 3"));
        let sql = build_random(&tsql(), 3);
        assert!(sql.starts_with("SELECT TOP 3 "));
        assert!(sql.ends_with("ORDER BY NEWID()"));
    }

    #[test]
    fn test_page_per_dialect() {
        assert!(build_page(&pg(), 10, 20)
            .ends_with("ORDER BY \"date_created\" ASC, \"id\" ASC LIMIT 10 OFFSET 20"));
        assert!(build_page(&tsql(), 10, 20)
            .ends_with("ORDER BY [date_created] ASC, [id] ASC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"));
    }

    #[test]
    fn test_next_previous() {
        let next = build_next(&pg());
        assert!(next.contains("WHERE date_created > @DateCreated"));
        assert!(next.ends_with("ORDER BY \"date_created\" ASC LIMIT 1"));

        let previous = build_previous(&pg());
        assert!(previous.contains("WHERE date_created < @DateCreated"));
        assert!(previous.ends_with("ORDER BY \"date_created\" DESC LIMIT 1"));
    }

    #[test]
    fn test_sorted_ids() {
        assert_eq!(
            build_sorted_ids(&pg()),
            "SELECT \"id\", \"date_created\" FROM \"users\" ORDER BY \"date_created\" DESC, \"id\" DESC"
        );
    }
}
