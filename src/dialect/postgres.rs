use super::SqlGenerator;
use crate::record::ColumnType;

pub struct PostgresGenerator;

impl SqlGenerator for PostgresGenerator {
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn sql_type(&self, ty: &ColumnType) -> String {
        match ty {
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Varchar(len) => format!("VARCHAR({})", len),
            ColumnType::Int => "INT".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Bool => "BOOLEAN".to_string(),
            ColumnType::Float => "DOUBLE PRECISION".to_string(),
            ColumnType::Timestamptz => "TIMESTAMPTZ".to_string(),
            ColumnType::Bytea => "BYTEA".to_string(),
            ColumnType::Jsonb => "JSONB".to_string(),
        }
    }

    fn top_clause(&self, _limit: Option<usize>, _offset: Option<usize>) -> String {
        String::new()
    }

    fn limit_clause(&self, limit: Option<usize>, offset: Option<usize>) -> String {
        let mut sql = String::new();
        if let Some(lim) = limit {
            sql.push_str(&format!(" LIMIT {}", lim));
        }
        if let Some(off) = offset {
            sql.push_str(&format!(" OFFSET {}", off));
        }
        sql
    }

    fn random_function(&self) -> &'static str {
        "RANDOM()"
    }
}
