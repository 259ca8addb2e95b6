//! Statistics derivation.
//!
//! Two collaborating pieces: [`derive_input_stats`] announces, per child
//! group, the columns whose statistics the child must provide for a logical
//! expression; [`derive_group_stats`] then computes a group's statistics
//! from its children's using simple cardinality formulas. The search driver
//! runs both bottom-up on demand.

use std::collections::HashMap;

use log::trace;

use crate::cascades::{GroupExpr, Memo};
use crate::cost::DEFAULT_ROW_COUNT;
use crate::expression::{AnnotatedExpression, CompareKind, ExprKind, ExprRef, ExprSet};
use crate::operator::{Get, LogicalOperator};
use crate::optimizer::OptimizerContext;
use crate::stats::{ColumnStats, Statistics};

/// Selectivity assumed for a predicate nothing better is known about.
const DEFAULT_SELECTIVITY: f64 = 0.1;
/// Selectivity of a range comparison.
const RANGE_SELECTIVITY: f64 = 1.0 / 3.0;

/// Per child group, the set of columns for which statistics must be derived
/// to satisfy `required_cols` at this expression.
pub fn derive_input_stats(
    gexpr: &GroupExpr,
    required_cols: &ExprSet,
    memo: &Memo,
) -> Vec<ExprSet> {
    let operator = match gexpr.operator().as_logical() {
        Some(op) => op,
        None => return vec![ExprSet::new(); gexpr.inputs().len()],
    };

    use LogicalOperator::*;
    match operator {
        LogicalDerivedGet(get) => {
            // Only columns that are named outputs of the derived query survive;
            // they are translated to the underlying producing expression.
            let mut child = ExprSet::new();
            for col in required_cols {
                if let ExprKind::ColumnValue {
                    table_name,
                    column_name,
                } = col.kind()
                {
                    if table_name == get.table_alias() {
                        if let Some(underlying) = get.expr_of(column_name) {
                            child.insert(underlying.clone());
                        }
                    }
                }
            }
            vec![child]
        }
        LogicalJoin(join) => {
            let mut children = vec![ExprSet::new(), ExprSet::new()];
            for col in required_cols {
                pass_down_column(col, gexpr, memo, &mut children);
            }
            // Columns referenced by the join's own predicates are needed too.
            for predicate in join.predicates() {
                let mut refs = ExprSet::new();
                predicate.expr().collect_column_refs(&mut refs);
                for col in &refs {
                    pass_down_column(col, gexpr, memo, &mut children);
                }
            }
            children
        }
        LogicalAggregate(aggregate) => {
            let mut child = ExprSet::new();
            for column in aggregate.columns() {
                child.insert(column.clone());
            }
            for col in required_cols {
                if col.contains_aggregate() {
                    // Requirements on an aggregate translate to its argument.
                    col.collect_column_refs(&mut child);
                } else {
                    child.insert(col.clone());
                }
            }
            vec![child]
        }
        LogicalGet(_) | LogicalInsert(_) | LogicalExternalScan(_) => vec![],
        LogicalFilter(_) | LogicalLimit(_) | LogicalDistinct(_) | LogicalInsertSelect(_)
        | LogicalUpdate(_) | LogicalDelete(_) | LogicalExportFile(_) => {
            vec![required_cols.clone(); gexpr.inputs().len()]
        }
    }
}

/// Route one required column to the single child group whose covered alias
/// set contains it.
fn pass_down_column(col: &ExprRef, gexpr: &GroupExpr, memo: &Memo, children: &mut [ExprSet]) {
    if let ExprKind::ColumnValue { table_name, .. } = col.kind() {
        for (idx, group_id) in gexpr.inputs().iter().enumerate() {
            if memo[*group_id].table_aliases().contains(table_name) {
                children[idx].insert(col.clone());
                return;
            }
        }
        trace!("column {} not covered by any join child", col);
    }
}

/// Compute a group's statistics from its children's.
pub fn derive_group_stats(
    gexpr: &GroupExpr,
    required_cols: &ExprSet,
    child_stats: &[Statistics],
    context: &OptimizerContext,
) -> Statistics {
    let operator = match gexpr.operator().as_logical() {
        Some(op) => op,
        None => return Statistics::default(),
    };

    use LogicalOperator::*;
    match operator {
        LogicalGet(get) => derive_base_table_stats(get, required_cols, context),
        LogicalJoin(join) => {
            let left = &child_stats[0];
            let right = &child_stats[1];
            let row_count = join_cardinality(join.predicates(), left, right);

            let mut columns = HashMap::new();
            for stats in [left, right] {
                for (name, col) in stats.column_stats() {
                    columns.insert(name.clone(), col.scaled_to(row_count));
                }
            }
            Statistics::new(row_count, columns)
        }
        LogicalAggregate(aggregate) => {
            let input = &child_stats[0];
            let mut row_count = 1.0;
            for column in aggregate.columns() {
                let card = column
                    .stats_name()
                    .and_then(|name| input.column(&name))
                    .map(|c| c.cardinality())
                    .unwrap_or(DEFAULT_SELECTIVITY * input.row_count());
                row_count *= card.max(1.0);
            }
            let row_count = row_count.min(input.row_count()).max(1.0);
            Statistics::new(row_count, scale_columns(input, row_count))
        }
        LogicalFilter(filter) => {
            let input = &child_stats[0];
            let selectivity = conjunction_selectivity(filter.predicates(), input);
            let row_count = (input.row_count() * selectivity).max(1.0);
            Statistics::new(row_count, scale_columns(input, row_count))
        }
        LogicalLimit(limit) => {
            let input = &child_stats[0];
            let row_count = input.row_count().min(limit.limit() as f64);
            Statistics::new(row_count, scale_columns(input, row_count))
        }
        LogicalDistinct(_) => {
            let input = &child_stats[0];
            Statistics::new(input.row_count(), input.column_stats().clone())
        }
        LogicalExternalScan(_) => Statistics::new(DEFAULT_ROW_COUNT, HashMap::new()),
        LogicalInsert(insert) => Statistics::new(insert.values().len() as f64, HashMap::new()),
        LogicalDerivedGet(_) | LogicalInsertSelect(_) | LogicalUpdate(_) | LogicalDelete(_)
        | LogicalExportFile(_) => child_stats
            .first()
            .cloned()
            .unwrap_or_default(),
    }
}

fn derive_base_table_stats(
    get: &Get,
    required_cols: &ExprSet,
    context: &OptimizerContext,
) -> Statistics {
    let table_stats = context
        .stats
        .table_stats(get.database_oid(), get.table_oid());

    let base_rows = table_stats
        .as_ref()
        .map(|t| t.num_rows() as f64)
        .unwrap_or(DEFAULT_ROW_COUNT);

    let mut columns = HashMap::new();
    if let Some(table_stats) = &table_stats {
        for col in required_cols {
            if let ExprKind::ColumnValue {
                table_name,
                column_name,
            } = col.kind()
            {
                if table_name == get.table_alias() {
                    if let Some(stats) = table_stats.column_by_name(column_name) {
                        columns.insert(
                            format!("{}.{}", table_name, column_name),
                            stats.clone(),
                        );
                    }
                }
            }
        }
    }

    let base = Statistics::new(base_rows, columns);
    if get.predicates().is_empty() {
        return base;
    }

    let selectivity = conjunction_selectivity(get.predicates(), &base);
    let row_count = (base_rows * selectivity).max(1.0);
    Statistics::new(row_count, scale_columns(&base, row_count))
}

fn scale_columns(input: &Statistics, row_count: f64) -> HashMap<String, ColumnStats> {
    input
        .column_stats()
        .iter()
        .map(|(name, col)| (name.clone(), col.scaled_to(row_count)))
        .collect()
}

/// Selectivity of a conjunction, assuming predicate independence.
fn conjunction_selectivity(predicates: &[AnnotatedExpression], input: &Statistics) -> f64 {
    predicates
        .iter()
        .map(|p| predicate_selectivity(p, input))
        .product()
}

fn predicate_selectivity(predicate: &AnnotatedExpression, input: &Statistics) -> f64 {
    match predicate.expr().kind() {
        ExprKind::Compare(CompareKind::Equal) => {
            // Uniform distribution: 1 / NDV of the referenced column.
            predicate
                .expr()
                .children()
                .iter()
                .filter_map(|c| c.stats_name())
                .filter_map(|name| input.column(&name).map(|s| s.cardinality()))
                .map(|card| 1.0 / card.max(1.0))
                .next()
                .unwrap_or(DEFAULT_SELECTIVITY)
        }
        ExprKind::Compare(_) => RANGE_SELECTIVITY,
        _ => DEFAULT_SELECTIVITY,
    }
}

/// Standard equi-join estimate: `|L| * |R| / max(card(lk), card(rk))`, a
/// cross product when no equality key is available.
fn join_cardinality(
    predicates: &[AnnotatedExpression],
    left: &Statistics,
    right: &Statistics,
) -> f64 {
    let cross = left.row_count() * right.row_count();

    let mut result = cross;
    for predicate in predicates {
        if let ExprKind::Compare(CompareKind::Equal) = predicate.expr().kind() {
            let cards: Vec<f64> = predicate
                .expr()
                .children()
                .iter()
                .filter_map(|c| c.stats_name())
                .filter_map(|name| {
                    left.column(&name)
                        .or_else(|| right.column(&name))
                        .map(|s| s.cardinality())
                })
                .collect();

            if let Some(max_card) = cards.into_iter().reduce(f64::max) {
                result = result.min(cross / max_card.max(1.0));
            } else {
                result = result.min(cross * DEFAULT_SELECTIVITY);
            }
        } else {
            result = result.min(cross * RANGE_SELECTIVITY);
        }
    }

    result.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    use crate::cascades::Memo;
    use crate::expression::{AggregateKind, ScalarExpr};
    use crate::operator::LogicalOperator::LogicalDerivedGet;
    use crate::operator::Operator::Logical;
    use crate::operator::{Aggregate, DerivedGet, Join};
    use crate::plan::LogicalPlanBuilder;
    use crate::test_utils::{col, col_eq, col_eq_int, table_get, TpccFixture};

    fn exprs(set: &ExprSet) -> Vec<String> {
        let mut names: Vec<_> = set.iter().map(|e| e.to_string()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_join_routes_columns_to_owning_child() {
        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.get(table_get("t2")).build().root();
            builder
                .get(table_get("t1"))
                .join(Join::inner(vec![col_eq("t1", "c1", "t2", "c2")]), right)
                .build()
        };
        let memo = Memo::from_plan(&plan).unwrap();
        let root = memo[memo.root_group_id()].logical_group_expr_ids()[0];

        let required: ExprSet = [col("t1", "c3"), col("t2", "c4")].into_iter().collect();
        let children = derive_input_stats(&memo[root], &required, &memo);

        assert_eq!(2, children.len());
        // Required columns route by alias; the join's own predicate columns
        // propagate to their owners too.
        assert_eq!(vec!["t1.c1", "t1.c3"], exprs(&children[0]));
        assert_eq!(vec!["t2.c2", "t2.c4"], exprs(&children[1]));
    }

    #[test]
    fn test_aggregate_requirements_translate_to_arguments() {
        let plan = LogicalPlanBuilder::new()
            .get(table_get("t1"))
            .aggregate(Aggregate::new(vec![col("t1", "c2")], vec![]))
            .build();
        let memo = Memo::from_plan(&plan).unwrap();
        let root = memo[memo.root_group_id()].logical_group_expr_ids()[0];

        let count = ScalarExpr::aggregate(AggregateKind::Count, col("t1", "c1")).into_ref();
        let required: ExprSet = [count, col("t1", "c3")].into_iter().collect();
        let children = derive_input_stats(&memo[root], &required, &memo);

        assert_eq!(1, children.len());
        assert_eq!(vec!["t1.c1", "t1.c2", "t1.c3"], exprs(&children[0]));
    }

    #[test]
    fn test_derived_get_translates_output_names() {
        let plan = LogicalPlanBuilder::new()
            .get(table_get("t1"))
            .operator(
                Logical(LogicalDerivedGet(DerivedGet::new(
                    "sub",
                    btreemap! {"x".to_string() => col("t1", "c1")},
                ))),
                vec![],
            )
            .build();
        let memo = Memo::from_plan(&plan).unwrap();
        let root = memo[memo.root_group_id()].logical_group_expr_ids()[0];

        // A named output maps to its underlying expression; unknown outputs
        // are dropped.
        let required: ExprSet = [col("sub", "x"), col("sub", "missing")]
            .into_iter()
            .collect();
        let children = derive_input_stats(&memo[root], &required, &memo);

        assert_eq!(1, children.len());
        assert_eq!(vec!["t1.c1"], exprs(&children[0]));
    }

    #[test]
    fn test_base_table_stats_apply_selectivity() {
        let fixture = TpccFixture::default();
        let plan = LogicalPlanBuilder::new()
            .get(fixture.get("order", vec![col_eq_int("order", "o_carrier_id", 5)]))
            .build();
        let memo = Memo::from_plan(&plan).unwrap();
        let root = memo[memo.root_group_id()].logical_group_expr_ids()[0];

        let required: ExprSet = [col("order", "o_carrier_id")].into_iter().collect();
        let stats = derive_group_stats(&memo[root], &required, &[], &fixture.context);

        // 3000 rows, equality selectivity 1 / 1500.
        assert_eq!(2.0, stats.row_count());
        let column = stats.column("order.o_carrier_id").unwrap();
        assert!(column.cardinality() <= 2.0);
    }

    #[test]
    fn test_unknown_table_falls_back_to_defaults() {
        let fixture = TpccFixture::default();
        let plan = LogicalPlanBuilder::new().get(table_get("mystery")).build();
        let memo = Memo::from_plan(&plan).unwrap();
        let root = memo[memo.root_group_id()].logical_group_expr_ids()[0];

        let stats = derive_group_stats(&memo[root], &ExprSet::new(), &[], &fixture.context);
        assert_eq!(DEFAULT_ROW_COUNT, stats.row_count());
    }

    #[test]
    fn test_join_cardinality_uses_max_key_cardinality() {
        let left = Statistics::new(
            1000.0,
            [(
                "t1.c1".to_string(),
                crate::test_utils::tpcc_column_stats(1, "c1"),
            )]
            .into_iter()
            .collect(),
        );
        let right = Statistics::new(500.0, Default::default());

        // Key cardinality 4 (from the fixture stats record).
        let rows = join_cardinality(&[col_eq("t1", "c1", "t2", "c2")], &left, &right);
        assert_eq!(1000.0 * 500.0 / 4.0, rows);

        // No equality key: cross product.
        let rows = join_cardinality(&[], &left, &right);
        assert_eq!(1000.0 * 500.0, rows);
    }
}
