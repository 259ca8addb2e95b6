use crate::cost::Cost;
use crate::error::{OptResult, OptimizerError};
use crate::operator::{Operator, PhysicalOperator};
use crate::settings::CostModelVariant;
use crate::stats::Statistics;

/// Row count assumed for a group without derived statistics.
pub const DEFAULT_ROW_COUNT: f64 = 1000.0;

/// Operator-local cost estimation, dispatched by the configured variant.
#[derive(Default)]
pub struct CostModel {}

impl CostModel {
    /// Estimate the cost of one operator without accumulating children's
    /// cost. `stats` are the derived statistics of the operator's group.
    pub fn estimate_cost(
        &self,
        variant: CostModelVariant,
        operator: &Operator,
        stats: Option<&Statistics>,
    ) -> OptResult<Cost> {
        let physical = operator.as_physical().ok_or_else(|| {
            OptimizerError::internal("no cost for logical operator")
        })?;

        match variant {
            CostModelVariant::Trivial => Ok(Cost::from(1.0)),
            CostModelVariant::Cardinality => Ok(self.cardinality_cost(physical, stats)),
        }
    }

    fn cardinality_cost(&self, operator: &PhysicalOperator, stats: Option<&Statistics>) -> Cost {
        let rows = stats.map(|s| s.row_count()).unwrap_or(DEFAULT_ROW_COUNT);

        use PhysicalOperator::*;
        let cost = match operator {
            SeqScan(_) | ExternalFileScan(_) => rows,
            // Full index scans pay for random access; they only win when the
            // delivered order saves an explicit sort.
            IndexScan(_) => rows * 2.0,
            TableFreeScan(_) => 1.0,
            QueryDerivedScan(_) => 0.0,
            HashGroupBy(_) => rows * 1.5,
            SortGroupBy(_) => rows,
            Aggregate(_) => rows,
            Distinct(_) => rows,
            // Output-cardinality based: a nested loop join producing the
            // same rows as a hash join still pays a quadratic factor.
            NLJoin(_) => (rows * rows).max(rows),
            HashJoin(_) => rows * 1.2,
            Limit(limit) => (limit.limit() as f64).min(rows),
            OrderBy(_) => rows * rows.max(2.0).log2(),
            Insert(insert) => insert.values().len() as f64,
            InsertSelect(_) | Update(_) | Delete(_) => rows,
            ExportExternalFile(_) => rows,
        };

        Cost::from(cost.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator::Physical;
    use crate::operator::{PhysicalOperator, TableFreeScan};
    use crate::test_utils::seq_scan;

    #[test]
    fn test_trivial_variant_charges_unit_cost() {
        let model = CostModel::default();
        let scan = Physical(PhysicalOperator::SeqScan(seq_scan("t1")));

        let cost = model
            .estimate_cost(CostModelVariant::Trivial, &scan, None)
            .unwrap();
        assert_eq!(Cost::from(1.0), cost);
    }

    #[test]
    fn test_index_scan_costs_more_than_seq_scan() {
        let model = CostModel::default();
        let seq = Physical(PhysicalOperator::SeqScan(seq_scan("t1")));

        let seq_cost = model
            .estimate_cost(CostModelVariant::Cardinality, &seq, None)
            .unwrap();
        let free_cost = model
            .estimate_cost(
                CostModelVariant::Cardinality,
                &Physical(PhysicalOperator::TableFreeScan(TableFreeScan::new())),
                None,
            )
            .unwrap();

        assert!(free_cost < seq_cost);
    }

    #[test]
    fn test_logical_operator_has_no_cost() {
        use crate::operator::LogicalOperator::LogicalDistinct;
        use crate::operator::Operator::Logical;

        let model = CostModel::default();
        let result = model.estimate_cost(
            CostModelVariant::Trivial,
            &Logical(LogicalDistinct(crate::operator::Distinct::new())),
            None,
        );
        assert!(result.is_err());
    }
}
