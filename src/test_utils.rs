//! Fixtures shared by unit and integration tests: expression shorthands, a
//! generic two-table setup, and a TPC-C style catalog with statistics.

use std::sync::Arc;

use crate::cascades::{CascadesOptimizer, GroupExprId};
use crate::catalog::{ColumnOid, DatabaseOid, MemoryCatalog, NamespaceOid, TableOid};
use crate::expression::{AnnotatedExpression, ExprRef, ScalarExpr};
use crate::operator::{Get, SeqScan};
use crate::optimizer::OptimizerContext;
use crate::plan::Plan;
use crate::properties::PropertySet;
use crate::settings::OptimizerSettings;
use crate::stats::{ColumnStats, StatsStorage, TableStats};

pub fn col(table: &str, column: &str) -> ExprRef {
    ScalarExpr::column(table, column).into_ref()
}

pub fn int(value: i64) -> ExprRef {
    ScalarExpr::integer(value).into_ref()
}

pub fn col_eq(left_table: &str, left_col: &str, right_table: &str, right_col: &str) -> AnnotatedExpression {
    AnnotatedExpression::new(
        ScalarExpr::compare_equal(col(left_table, left_col), col(right_table, right_col))
            .into_ref(),
    )
}

pub fn col_eq_int(table: &str, column: &str, value: i64) -> AnnotatedExpression {
    AnnotatedExpression::new(ScalarExpr::compare_equal(col(table, column), int(value)).into_ref())
}

/// Stable synthetic table oid for tests that never touch the catalog.
fn synthetic_oid(alias: &str) -> TableOid {
    let raw = alias
        .bytes()
        .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    TableOid(raw | 1)
}

pub fn table_get(alias: &str) -> Get {
    get_with_predicates(alias, vec![])
}

pub fn get_with_predicates(alias: &str, predicates: Vec<AnnotatedExpression>) -> Get {
    Get::new(
        DatabaseOid(1),
        NamespaceOid(1),
        synthetic_oid(alias),
        predicates,
        alias,
        false,
    )
}

pub fn seq_scan(alias: &str) -> SeqScan {
    SeqScan::new(
        DatabaseOid(1),
        NamespaceOid(1),
        synthetic_oid(alias),
        vec![],
        alias,
        false,
        false,
    )
}

pub fn default_context() -> OptimizerContext {
    OptimizerContext::default()
}

/// Optimizer over an ingested plan with an empty rule set, for binding and
/// rule application tests.
pub fn optimizer_with_plan(plan: &Plan) -> CascadesOptimizer {
    CascadesOptimizer::new(PropertySet::new(), vec![], plan, OptimizerContext::default())
        .expect("test plan is well formed")
}

/// First logical member of the root group.
pub fn root_logical_expr(optimizer: &CascadesOptimizer) -> GroupExprId {
    let memo = optimizer.memo();
    memo[memo.root_group_id()].logical_group_expr_ids()[0]
}

/// Column statistics in the shape used across the statistics tests.
pub fn tpcc_column_stats(column_oid: u32, column_name: &str) -> ColumnStats {
    ColumnStats::new(
        NamespaceOid(1),
        DatabaseOid(1),
        TableOid(1),
        ColumnOid(column_oid),
        column_name,
        5,
        4.0,
        0.2,
        vec![3.0, 4.0, 5.0],
        vec![0.2, 0.2, 0.2],
        vec![1.0, 5.0],
        true,
    )
}

/// A bound TPC-C style environment: catalog, statistics and oids for the
/// `new_order` and `order` tables.
pub struct TpccFixture {
    pub context: OptimizerContext,
    pub database_oid: DatabaseOid,
    pub namespace_oid: NamespaceOid,
    pub tbl_new_order: TableOid,
    pub tbl_order: TableOid,
}

pub const ORDER_COLUMNS: [&str; 8] = [
    "o_id",
    "o_d_id",
    "o_w_id",
    "o_c_id",
    "o_entry_d",
    "o_carrier_id",
    "o_ol_cnt",
    "o_all_local",
];

pub const NEW_ORDER_COLUMNS: [&str; 3] = ["no_o_id", "no_d_id", "no_w_id"];

impl TpccFixture {
    pub fn new(settings: OptimizerSettings) -> Self {
        let database_oid = DatabaseOid(1);
        let namespace_oid = NamespaceOid(1);

        let mut catalog = MemoryCatalog::new(namespace_oid);
        let tbl_new_order = catalog.add_table("new_order", &NEW_ORDER_COLUMNS);
        let tbl_order = catalog.add_table("order", &ORDER_COLUMNS);
        catalog.add_index(tbl_new_order, "new_order_pkey", &["no_o_id"]);
        catalog.add_index(tbl_order, "order_pkey", &["o_id"]);

        let stats = StatsStorage::new();
        stats.insert_table_stats(
            database_oid,
            tbl_new_order,
            table_stats_of(database_oid, namespace_oid, tbl_new_order, 900, &NEW_ORDER_COLUMNS),
        );
        stats.insert_table_stats(
            database_oid,
            tbl_order,
            table_stats_of(database_oid, namespace_oid, tbl_order, 3000, &ORDER_COLUMNS),
        );

        Self {
            context: OptimizerContext::new(Arc::new(catalog), Arc::new(stats), settings),
            database_oid,
            namespace_oid,
            tbl_new_order,
            tbl_order,
        }
    }

    /// Bound get over one of the fixture tables.
    pub fn get(&self, table_name: &str, predicates: Vec<AnnotatedExpression>) -> Get {
        let table_oid = if table_name == "new_order" {
            self.tbl_new_order
        } else {
            self.tbl_order
        };
        Get::new(
            self.database_oid,
            self.namespace_oid,
            table_oid,
            predicates,
            table_name,
            false,
        )
    }
}

impl Default for TpccFixture {
    fn default() -> Self {
        Self::new(OptimizerSettings::default())
    }
}

fn table_stats_of(
    database_oid: DatabaseOid,
    namespace_oid: NamespaceOid,
    table_oid: TableOid,
    num_rows: u64,
    columns: &[&str],
) -> TableStats {
    let column_stats = columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            ColumnStats::new(
                namespace_oid,
                database_oid,
                table_oid,
                ColumnOid(idx as u32 + 1),
                *name,
                num_rows,
                (num_rows as f64 / 2.0).max(1.0),
                0.0,
                vec![],
                vec![],
                vec![],
                true,
            )
        })
        .collect();

    TableStats::new(database_oid, table_oid, num_rows, true, column_stats)
}
