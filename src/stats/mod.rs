//! Table and column statistics.
//!
//! [`StatsStorage`] is the long-lived store shared by concurrent
//! optimizations; per-group [`Statistics`] are derived during one call and
//! die with the memo.

mod deriver;
pub use deriver::*;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::catalog::{ColumnOid, DatabaseOid, NamespaceOid, TableOid};

/// Statistics of one column of a base table.
///
/// The serialized form matches the collaborator's persisted JSON objects,
/// hence the renamed keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    #[serde(rename = "namespace_id")]
    namespace_oid: NamespaceOid,
    #[serde(rename = "database_id")]
    database_oid: DatabaseOid,
    #[serde(rename = "table_id")]
    table_oid: TableOid,
    #[serde(rename = "column_id")]
    column_oid: ColumnOid,
    column_name: String,
    num_rows: u64,
    cardinality: f64,
    frac_null: f64,
    #[serde(rename = "most_common_vals")]
    most_common_values: Vec<f64>,
    most_common_freqs: Vec<f64>,
    histogram_bounds: Vec<f64>,
    #[serde(rename = "is_basetable")]
    is_base_table: bool,
}

impl ColumnStats {
    #[allow(clippy::too_many_arguments)]
    pub fn new<S: Into<String>>(
        namespace_oid: NamespaceOid,
        database_oid: DatabaseOid,
        table_oid: TableOid,
        column_oid: ColumnOid,
        column_name: S,
        num_rows: u64,
        cardinality: f64,
        frac_null: f64,
        most_common_values: Vec<f64>,
        most_common_freqs: Vec<f64>,
        histogram_bounds: Vec<f64>,
        is_base_table: bool,
    ) -> Self {
        let stats = Self {
            namespace_oid,
            database_oid,
            table_oid,
            column_oid,
            column_name: column_name.into(),
            num_rows,
            cardinality,
            frac_null,
            most_common_values,
            most_common_freqs,
            histogram_bounds,
            is_base_table,
        };
        debug_assert!(stats.is_valid());
        stats
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn column_oid(&self) -> ColumnOid {
        self.column_oid
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn cardinality(&self) -> f64 {
        self.cardinality
    }

    pub fn frac_null(&self) -> f64 {
        self.frac_null
    }

    pub fn most_common_values(&self) -> &[f64] {
        &self.most_common_values
    }

    pub fn most_common_freqs(&self) -> &[f64] {
        &self.most_common_freqs
    }

    pub fn histogram_bounds(&self) -> &[f64] {
        &self.histogram_bounds
    }

    pub fn is_base_table(&self) -> bool {
        self.is_base_table
    }

    /// Structural invariants of a statistics record.
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.frac_null)
            && self.most_common_values.len() == self.most_common_freqs.len()
            && self.most_common_freqs.iter().sum::<f64>() <= 1.0 + f64::EPSILON
            && self.histogram_bounds.windows(2).all(|w| w[0] <= w[1])
    }

    /// Update after a join: adopt the joined table's row count and scale the
    /// cardinality so the sample selectivity carries over to the full table.
    pub fn update_join_stats(&mut self, table_num_rows: u64, sample_size: u64, sample_card: u64) {
        self.num_rows = table_num_rows;

        let estimated_card = sample_card as f64 * self.num_rows as f64 / sample_size as f64;
        self.cardinality = self.cardinality.min(estimated_card);
    }

    /// Scale the record to `row_count` rows, clamping the cardinality.
    pub(crate) fn scaled_to(&self, row_count: f64) -> ColumnStats {
        let mut scaled = self.clone();
        scaled.num_rows = row_count.round() as u64;
        scaled.cardinality = scaled.cardinality.min(row_count.max(0.0));
        scaled.is_base_table = false;
        scaled
    }
}

/// Statistics of one base table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    #[serde(rename = "database_id")]
    database_oid: DatabaseOid,
    #[serde(rename = "table_id")]
    table_oid: TableOid,
    num_rows: u64,
    #[serde(rename = "is_basetable")]
    is_base_table: bool,
    column_stats: Vec<ColumnStats>,
}

impl TableStats {
    pub fn new(
        database_oid: DatabaseOid,
        table_oid: TableOid,
        num_rows: u64,
        is_base_table: bool,
        column_stats: Vec<ColumnStats>,
    ) -> Self {
        Self {
            database_oid,
            table_oid,
            num_rows,
            is_base_table,
            column_stats,
        }
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn column_stats(&self) -> &[ColumnStats] {
        &self.column_stats
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnStats> {
        self.column_stats.iter().find(|c| c.column_name == name)
    }
}

/// Mapping `(db_oid, table_oid) -> TableStats`.
///
/// Safe for concurrent readers and exclusive writers; per-query derived
/// statistics never land here.
#[derive(Default)]
pub struct StatsStorage {
    tables: RwLock<HashMap<(DatabaseOid, TableOid), Arc<TableStats>>>,
}

impl StatsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false and leaves the stored value untouched when the key is
    /// already present.
    pub fn insert_table_stats(
        &self,
        database_oid: DatabaseOid,
        table_oid: TableOid,
        stats: TableStats,
    ) -> bool {
        let mut tables = self.tables.write().expect("stats storage poisoned");
        match tables.entry((database_oid, table_oid)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(Arc::new(stats));
                true
            }
        }
    }

    pub fn table_stats(
        &self,
        database_oid: DatabaseOid,
        table_oid: TableOid,
    ) -> Option<Arc<TableStats>> {
        self.tables
            .read()
            .expect("stats storage poisoned")
            .get(&(database_oid, table_oid))
            .cloned()
    }

    /// Returns false when the key is absent.
    pub fn delete_table_stats(&self, database_oid: DatabaseOid, table_oid: TableOid) -> bool {
        self.tables
            .write()
            .expect("stats storage poisoned")
            .remove(&(database_oid, table_oid))
            .is_some()
    }

    pub fn contains(&self, database_oid: DatabaseOid, table_oid: TableOid) -> bool {
        self.tables
            .read()
            .expect("stats storage poisoned")
            .contains_key(&(database_oid, table_oid))
    }
}

/// Derived statistics of one memo group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statistics {
    row_count: f64,
    /// Column statistics keyed by qualified column name.
    column_stats: HashMap<String, ColumnStats>,
}

impl Statistics {
    pub fn new(row_count: f64, column_stats: HashMap<String, ColumnStats>) -> Self {
        Self {
            row_count,
            column_stats,
        }
    }

    pub fn row_count(&self) -> f64 {
        self.row_count
    }

    pub fn column_stats(&self) -> &HashMap<String, ColumnStats> {
        &self.column_stats
    }

    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.column_stats.get(name)
    }
}
