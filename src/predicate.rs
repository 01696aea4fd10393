//! Flat equality predicates joined with AND or OR.

use crate::descriptor::TableDescriptor;
use crate::error::Result;
use crate::value::Value;

/// An ordered set of `property = value` constraints.
///
/// Entry order is caller-controlled and preserved all the way into the
/// generated SQL; the statement cache keys generated text on the match
/// mode plus the ordered property-name list, so two predicates with the
/// same shape reuse the same statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    entries: Vec<(String, Value)>,
    match_all: bool,
}

impl Predicate {
    /// Constraints joined with `AND`.
    pub fn all() -> Self {
        Self {
            entries: Vec::new(),
            match_all: true,
        }
    }

    /// Constraints joined with `OR`.
    pub fn any() -> Self {
        Self {
            entries: Vec::new(),
            match_all: false,
        }
    }

    /// Add an equality constraint on a logical property.
    #[must_use]
    pub fn eq(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((property.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn match_all(&self) -> bool {
        self.match_all
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// Ordered parameter bag for binding.
    pub fn params(&self) -> Vec<(String, Value)> {
        self.entries.clone()
    }

    /// Stable cache key: match mode plus ordered property names.
    pub fn cache_key(&self) -> String {
        let mut key = String::from(if self.match_all { "all" } else { "any" });
        for (name, _) in &self.entries {
            key.push('|');
            key.push_str(name);
        }
        key
    }

    /// Render the WHERE body (`col = @Prop AND col2 = @Prop2`) against a
    /// descriptor set. Fails if a property is not declared on the record.
    pub fn where_clause(&self, descriptor: &TableDescriptor) -> Result<String> {
        let joiner = if self.match_all { " AND " } else { " OR " };
        let mut clauses = Vec::with_capacity(self.entries.len());
        for (property, _) in &self.entries {
            clauses.push(descriptor.get(property)?.assignment.clone());
        }
        Ok(clauses.join(joiner))
    }
}
