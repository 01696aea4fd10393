use super::SqlGenerator;
use crate::record::ColumnType;

pub struct SqlServerGenerator;

impl SqlGenerator for SqlServerGenerator {
    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name)
    }

    fn sql_type(&self, ty: &ColumnType) -> String {
        match ty {
            ColumnType::Uuid => "UNIQUEIDENTIFIER".to_string(),
            ColumnType::Text => "NVARCHAR(MAX)".to_string(),
            ColumnType::Varchar(len) => format!("NVARCHAR({})", len),
            ColumnType::Int => "INT".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Bool => "BIT".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Timestamptz => "DATETIMEOFFSET".to_string(),
            ColumnType::Bytea => "VARBINARY(MAX)".to_string(),
            ColumnType::Jsonb => "NVARCHAR(MAX)".to_string(),
        }
    }

    fn top_clause(&self, limit: Option<usize>, offset: Option<usize>) -> String {
        // TOP only when there is no offset; offset paging uses
        // OFFSET/FETCH in limit_clause instead.
        match (limit, offset) {
            (Some(lim), None) => format!("TOP {} ", lim),
            _ => String::new(),
        }
    }

    fn limit_clause(&self, limit: Option<usize>, offset: Option<usize>) -> String {
        // T-SQL requires ORDER BY for OFFSET/FETCH; every paged shape
        // the statement cache produces carries one.
        let Some(off) = offset else {
            return String::new();
        };
        let mut sql = format!(" OFFSET {} ROWS", off);
        if let Some(lim) = limit {
            sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", lim));
        }
        sql
    }

    fn random_function(&self) -> &'static str {
        "NEWID()"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(SqlServerGenerator.quote_identifier("users"), "[users]");
    }

    #[test]
    fn test_top_vs_offset_fetch() {
        assert_eq!(SqlServerGenerator.top_clause(Some(1), None), "TOP 1 ");
        assert_eq!(SqlServerGenerator.limit_clause(Some(1), None), "");
        assert_eq!(SqlServerGenerator.top_clause(Some(10), Some(5)), "");
        assert_eq!(
            SqlServerGenerator.limit_clause(Some(10), Some(5)),
            " OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_sql_types() {
        assert_eq!(SqlServerGenerator.sql_type(&ColumnType::Uuid), "UNIQUEIDENTIFIER");
        assert_eq!(SqlServerGenerator.sql_type(&ColumnType::Bool), "BIT");
    }
}
