//! Statement synthesis and memoization.
//!
//! Fixed-shape statements (no per-call variable data) are built once per
//! table and reused forever. Predicate-shaped statements are keyed by the
//! predicate's match mode plus its ordered property-name list, so
//! repeated calls with the same shape reuse the generated text. Shapes
//! whose text embeds per-call literals (random sample size, page bounds,
//! IN-list width) are rendered on demand.

pub mod ddl;
pub mod delete;
pub mod insert;
pub mod select;
pub mod update;
pub mod upsert;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::descriptor::TableDescriptor;
use crate::error::Result;
use crate::predicate::Predicate;

/// Operation shapes the cache can synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    // Fixed shapes.
    All,
    First,
    Last,
    Count,
    GetById,
    Insert,
    Update,
    DeleteById,
    DeleteAll,
    Next,
    Previous,
    SortedIds,
    EnsureTable,
    // Predicate shapes.
    GetBy,
    Filter,
    DeleteBy,
    Exists,
    TryInsert,
    Upsert,
}

/// Memoizing statement cache for one (record type, dialect) pair.
pub struct Statements {
    descriptor: Arc<TableDescriptor>,
    fixed: RwLock<HashMap<StatementKind, Arc<String>>>,
    predicated: RwLock<HashMap<(StatementKind, String), Arc<String>>>,
}

impl Statements {
    pub fn new(descriptor: Arc<TableDescriptor>) -> Self {
        Self {
            descriptor,
            fixed: RwLock::new(HashMap::new()),
            predicated: RwLock::new(HashMap::new()),
        }
    }

    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    /// Fetch (or build and memoize) a fixed-shape statement.
    pub fn fixed(&self, kind: StatementKind) -> Arc<String> {
        if let Some(found) = self
            .fixed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
        {
            return Arc::clone(found);
        }

        let built = Arc::new(self.build_fixed(kind));
        let mut map = self.fixed.write().unwrap_or_else(|e| e.into_inner());
        let entry = map.entry(kind).or_insert(built);
        Arc::clone(entry)
    }

    /// Fetch (or build and memoize) a predicate-shape statement. The
    /// cache key is the shape plus the predicate's name/mode key, never
    /// its values.
    pub fn predicated(&self, kind: StatementKind, predicate: &Predicate) -> Result<Arc<String>> {
        let key = (kind, predicate.cache_key());
        if let Some(found) = self
            .predicated
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Ok(Arc::clone(found));
        }

        let built = Arc::new(self.build_predicated(kind, predicate)?);
        let mut map = self.predicated.write().unwrap_or_else(|e| e.into_inner());
        let entry = map.entry(key).or_insert(built);
        Ok(Arc::clone(entry))
    }

    /// Random sample: the limit is a literal, so no memoization.
    pub fn random(&self, count: usize) -> String {
        select::build_random(&self.descriptor, count)
    }

    /// Ordered page: bounds are literals, so no memoization.
    pub fn page(&self, limit: usize, offset: usize) -> String {
        select::build_page(&self.descriptor, limit, offset)
    }

    /// Batch delete: width of the IN list varies per call.
    pub fn delete_many(&self, count: usize) -> String {
        delete::build_delete_many(&self.descriptor, count)
    }

    fn build_fixed(&self, kind: StatementKind) -> String {
        let d = &self.descriptor;
        match kind {
            StatementKind::All => select::build_all(d),
            StatementKind::First => select::build_first(d),
            StatementKind::Last => select::build_last(d),
            StatementKind::Count => select::build_count(d),
            StatementKind::GetById => select::build_get_by_id(d),
            StatementKind::Insert => insert::build_insert(d),
            StatementKind::Update => update::build_update(d),
            StatementKind::DeleteById => delete::build_delete_by_id(d),
            StatementKind::DeleteAll => delete::build_delete_all(d),
            StatementKind::Next => select::build_next(d),
            StatementKind::Previous => select::build_previous(d),
            StatementKind::SortedIds => select::build_sorted_ids(d),
            StatementKind::EnsureTable => ddl::build_ensure_table(d),
            other => unreachable!("{other:?} is a predicate shape"),
        }
    }

    fn build_predicated(&self, kind: StatementKind, predicate: &Predicate) -> Result<String> {
        let d = &self.descriptor;
        match kind {
            StatementKind::GetBy => select::build_get_by(d, predicate),
            StatementKind::Filter => select::build_filter(d, predicate),
            StatementKind::DeleteBy => delete::build_delete_by(d, predicate),
            StatementKind::Exists => select::build_exists(d, predicate),
            StatementKind::TryInsert => upsert::build_try_insert(d, predicate),
            StatementKind::Upsert => upsert::build_insert_or_update(d, predicate),
            other => unreachable!("{other:?} is a fixed shape"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::testing::User;

    fn statements(dialect: Dialect) -> Statements {
        let descriptor = Arc::new(TableDescriptor::build::<User>(dialect).unwrap());
        Statements::new(descriptor)
    }

    #[test]
    fn test_fixed_statements_are_memoized() {
        let stmts = statements(Dialect::Postgres);
        let first = stmts.fixed(StatementKind::All);
        let second = stmts.fixed(StatementKind::All);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_predicate_statements_share_by_shape() {
        let stmts = statements(Dialect::Postgres);
        let a = Predicate::all().eq("UserName", "a");
        let b = Predicate::all().eq("UserName", "b");
        let one = stmts.predicated(StatementKind::Filter, &a).unwrap();
        let two = stmts.predicated(StatementKind::Filter, &b).unwrap();
        assert!(Arc::ptr_eq(&one, &two));

        // A different ordered name set builds fresh text.
        let c = Predicate::all().eq("Email", "x").eq("UserName", "a");
        let three = stmts.predicated(StatementKind::Filter, &c).unwrap();
        assert!(!Arc::ptr_eq(&one, &three));
    }
}
