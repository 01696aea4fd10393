//! Column descriptors: the per-(record type, dialect) mapping from
//! logical property names to column metadata. Built once, cached forever.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use convert_case::{Case, Casing};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::record::Record;

/// How one logical property maps to a column in a specific dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Logical property name, e.g. `UserName`.
    pub property: String,
    /// Derived column name, e.g. `user_name`.
    pub column: String,
    /// Quoted column name in the target dialect.
    pub quoted: String,
    /// Dialect SQL type string, e.g. `TIMESTAMPTZ` / `DATETIMEOFFSET`.
    pub sql_type: String,
    pub nullable: bool,
    pub key: bool,
    /// Parameter placeholder, e.g. `@UserName`.
    pub placeholder: String,
    /// Assignment fragment, e.g. `user_name = @UserName`.
    pub assignment: String,
}

/// The frozen descriptor set for one record type under one dialect.
#[derive(Debug)]
pub struct TableDescriptor {
    pub table: String,
    pub quoted_table: String,
    dialect: Dialect,
    columns: Vec<ColumnDescriptor>,
    by_property: HashMap<String, usize>,
    key_index: usize,
    created_index: usize,
}

impl TableDescriptor {
    /// Build descriptors for a record type. Validates that exactly one
    /// key property is declared, that a `DateCreated` property exists,
    /// and that no property name collides.
    pub fn build<R: Record>(dialect: Dialect) -> Result<Self> {
        let generator = dialect.generator();
        let specs = R::columns();

        let mut columns = Vec::with_capacity(specs.len());
        let mut by_property = HashMap::with_capacity(specs.len());
        let mut key_index = None;

        for spec in specs {
            let column = spec
                .column
                .map(str::to_string)
                .unwrap_or_else(|| spec.property.to_case(Case::Snake));
            let quoted = generator.quote_identifier(&column);
            let placeholder = generator.placeholder(spec.property);
            let descriptor = ColumnDescriptor {
                property: spec.property.to_string(),
                column: column.clone(),
                assignment: format!("{} = {}", column, placeholder),
                quoted,
                sql_type: generator.sql_type(&spec.ty),
                nullable: spec.nullable,
                key: spec.key,
                placeholder,
            };

            if spec.key {
                if key_index.is_some() {
                    return Err(Error::config(format!(
                        "record '{}' declares more than one key property",
                        R::TABLE
                    )));
                }
                key_index = Some(columns.len());
            }
            if by_property
                .insert(descriptor.property.clone(), columns.len())
                .is_some()
            {
                return Err(Error::config(format!(
                    "record '{}' declares property '{}' twice",
                    R::TABLE,
                    spec.property
                )));
            }
            columns.push(descriptor);
        }

        let key_index = key_index.ok_or_else(|| {
            Error::config(format!("record '{}' declares no key property", R::TABLE))
        })?;
        let created_index = *by_property.get("DateCreated").ok_or_else(|| {
            Error::config(format!(
                "record '{}' declares no DateCreated property",
                R::TABLE
            ))
        })?;
        if columns.len() != specs.len() {
            return Err(Error::config(format!(
                "record '{}': declared {} properties but built {} columns",
                R::TABLE,
                specs.len(),
                columns.len()
            )));
        }

        Ok(Self {
            table: R::TABLE.to_string(),
            quoted_table: generator.quote_identifier(R::TABLE),
            dialect,
            columns,
            by_property,
            key_index,
            created_index,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// All descriptors in declaration order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// The single key column.
    pub fn key(&self) -> &ColumnDescriptor {
        &self.columns[self.key_index]
    }

    /// The creation-timestamp column every record carries.
    pub fn created(&self) -> &ColumnDescriptor {
        &self.columns[self.created_index]
    }

    /// Look up a descriptor by logical property name.
    pub fn get(&self, property: &str) -> Result<&ColumnDescriptor> {
        self.by_property
            .get(property)
            .map(|&i| &self.columns[i])
            .ok_or_else(|| {
                Error::config(format!(
                    "record '{}' has no property '{}'",
                    self.table, property
                ))
            })
    }

    /// Comma-joined quoted column list in declaration order.
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.quoted.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Comma-joined placeholder list in declaration order.
    pub fn placeholder_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.placeholder.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Process-wide, write-once-per-key descriptor cache.
///
/// Injected rather than ambient so tests can hold isolated caches per
/// dialect/type combination. Concurrent builders for the same key
/// converge on an equivalent result; the first insert wins.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    inner: RwLock<HashMap<(TypeId, Dialect), Arc<TableDescriptor>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the descriptor set for `R` under `dialect`, building it on
    /// first use.
    pub fn descriptor_for<R: Record + 'static>(
        &self,
        dialect: Dialect,
    ) -> Result<Arc<TableDescriptor>> {
        let cache_key = (TypeId::of::<R>(), dialect);
        if let Some(found) = self
            .inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&cache_key)
        {
            return Ok(Arc::clone(found));
        }

        let built = Arc::new(TableDescriptor::build::<R>(dialect)?);
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let entry = map.entry(cache_key).or_insert(built);
        Ok(Arc::clone(entry))
    }
}
