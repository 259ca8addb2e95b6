//! Read-only catalog capability consumed by the optimizer.
//!
//! The optimizer never mutates the catalog; it resolves table oids, schemas
//! and index metadata through [`CatalogAccessor`]. Lookups are synchronous
//! in-memory calls.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{OptResult, OptimizerError};

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatabaseOid(pub u32);

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespaceOid(pub u32);

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableOid(pub u32);

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnOid(pub u32);

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexOid(pub u32);

impl TableOid {
    /// Sentinel for a get without a backing table (`SELECT 1`).
    pub const INVALID: TableOid = TableOid(0);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSchema {
    pub oid: ColumnOid,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnSchema>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Offset of a column into the underlying tuple.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Metadata of one index, resolved through the owning table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSchema {
    pub oid: IndexOid,
    pub name: String,
    pub table_oid: TableOid,
    /// Key column names in index order.
    pub key_columns: Vec<String>,
}

pub trait CatalogAccessor {
    fn default_namespace(&self) -> NamespaceOid;

    fn table_oid(&self, namespace: NamespaceOid, table_name: &str) -> OptResult<TableOid>;

    fn schema(&self, table: TableOid) -> OptResult<Schema>;

    /// All indexes defined on `table`. An unknown table has no indexes.
    fn indexes(&self, table: TableOid) -> Vec<IndexSchema>;
}

/// In-memory catalog used in tests and by the default optimizer context.
pub struct MemoryCatalog {
    namespace: NamespaceOid,
    tables: HashMap<(NamespaceOid, String), TableOid>,
    schemas: HashMap<TableOid, Schema>,
    indexes: HashMap<TableOid, Vec<IndexSchema>>,
    next_oid: u32,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new(NamespaceOid(1))
    }
}

impl MemoryCatalog {
    pub fn new(namespace: NamespaceOid) -> Self {
        Self {
            namespace,
            tables: HashMap::new(),
            schemas: HashMap::new(),
            indexes: HashMap::new(),
            next_oid: 0,
        }
    }

    pub fn add_table<S: Into<String>>(&mut self, name: S, column_names: &[&str]) -> TableOid {
        self.next_oid += 1;
        let table_oid = TableOid(self.next_oid);
        let columns = column_names
            .iter()
            .enumerate()
            .map(|(idx, name)| ColumnSchema {
                oid: ColumnOid(idx as u32 + 1),
                name: (*name).to_string(),
            })
            .collect();

        self.tables.insert((self.namespace, name.into()), table_oid);
        self.schemas.insert(table_oid, Schema::new(columns));
        table_oid
    }

    pub fn add_index<S: Into<String>>(
        &mut self,
        table: TableOid,
        name: S,
        key_columns: &[&str],
    ) -> IndexOid {
        self.next_oid += 1;
        let oid = IndexOid(self.next_oid);
        self.indexes.entry(table).or_default().push(IndexSchema {
            oid,
            name: name.into(),
            table_oid: table,
            key_columns: key_columns.iter().map(|c| (*c).to_string()).collect(),
        });
        oid
    }
}

impl CatalogAccessor for MemoryCatalog {
    fn default_namespace(&self) -> NamespaceOid {
        self.namespace
    }

    fn table_oid(&self, namespace: NamespaceOid, table_name: &str) -> OptResult<TableOid> {
        self.tables
            .get(&(namespace, table_name.to_string()))
            .copied()
            .ok_or_else(|| OptimizerError::catalog(format!("table {:?} not found", table_name)))
    }

    fn schema(&self, table: TableOid) -> OptResult<Schema> {
        self.schemas
            .get(&table)
            .cloned()
            .ok_or_else(|| OptimizerError::catalog(format!("schema of {:?} not found", table)))
    }

    fn indexes(&self, table: TableOid) -> Vec<IndexSchema> {
        self.indexes.get(&table).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup() {
        let mut catalog = MemoryCatalog::new(NamespaceOid(1));
        let order = catalog.add_table("order", &["o_id", "o_carrier_id"]);

        assert_eq!(order, catalog.table_oid(NamespaceOid(1), "order").unwrap());
        assert!(catalog.table_oid(NamespaceOid(1), "missing").is_err());

        let schema = catalog.schema(order).unwrap();
        assert_eq!(Some(1), schema.offset_of("o_carrier_id"));
        assert_eq!(ColumnOid(1), schema.column("o_id").unwrap().oid);
    }

    #[test]
    fn test_indexes() {
        let mut catalog = MemoryCatalog::new(NamespaceOid(1));
        let order = catalog.add_table("order", &["o_id"]);
        catalog.add_index(order, "order_pkey", &["o_id"]);

        let indexes = catalog.indexes(order);
        assert_eq!(1, indexes.len());
        assert_eq!(vec!["o_id".to_string()], indexes[0].key_columns);
        assert!(catalog.indexes(TableOid(42)).is_empty());
    }
}
