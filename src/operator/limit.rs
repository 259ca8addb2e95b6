use std::fmt::Formatter;

use crate::error::OptResult;
use crate::expression::ExprRef;
use crate::operator::{
    DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
};
use crate::optimizer::Optimizer;
use crate::properties::{Property, PropertySet, SortDirection, SortSpec};

/// Limit with optional fused ORDER BY.
///
/// The binder folds `ORDER BY .. LIMIT ..` into a single limit carrying the
/// sort expressions, so the physical limit can materialize the order itself
/// instead of requiring it from its child.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Limit {
    limit: u64,
    offset: u64,
    sort_exprs: Vec<ExprRef>,
    sort_directions: Vec<SortDirection>,
}

impl Limit {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit,
            offset,
            sort_exprs: vec![],
            sort_directions: vec![],
        }
    }

    pub fn with_sort(
        limit: u64,
        offset: u64,
        sort_exprs: Vec<ExprRef>,
        sort_directions: Vec<SortDirection>,
    ) -> Self {
        Self {
            limit,
            offset,
            sort_exprs,
            sort_directions,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn sort_exprs(&self) -> &[ExprRef] {
        &self.sort_exprs
    }

    pub fn sort_directions(&self) -> &[SortDirection] {
        &self.sort_directions
    }
}

impl PhysicalOperatorTrait for Limit {
    /// Limit fulfills its internal sort property itself; the child is left
    /// unconstrained.
    fn derive_properties<O: Optimizer>(
        &self,
        _context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        let mut provided = PropertySet::new();
        if !self.sort_exprs.is_empty() {
            provided.add_property(Property::Sort(SortSpec::new(
                self.sort_exprs.clone(),
                self.sort_directions.clone(),
            )));
        }

        Ok(vec![DerivePropResult {
            output_prop: provided,
            input_required_props: vec![PropertySet::new()],
        }])
    }
}

impl DisplayFields for Limit {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("");
        s.field("limit", &self.limit).field("offset", &self.offset);
        if !self.sort_exprs.is_empty() {
            s.field(
                "sort",
                &self.sort_exprs.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            );
        }
        s.finish()
    }
}

/// Order enforcer spliced into a group when a required sort cannot be
/// provided by any candidate. Carries its sort keys so the winner chain can
/// be materialized without a property context.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct OrderBy {
    sort_spec: SortSpec,
}

impl OrderBy {
    pub fn new(sort_spec: SortSpec) -> Self {
        Self { sort_spec }
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort_spec
    }
}

impl PhysicalOperatorTrait for OrderBy {
    /// Enforcers are inserted and costed directly by the search driver, so
    /// the derivation offers no candidates of its own.
    fn derive_properties<O: Optimizer>(
        &self,
        _context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![])
    }
}

impl DisplayFields for OrderBy {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field(
                "sort",
                &self
                    .sort_spec
                    .sort_exprs()
                    .iter()
                    .zip(self.sort_spec.sort_directions())
                    .map(|(e, d)| format!("{} {:?}", e, d))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::LogicalPlanBuilder;
    use crate::test_utils::{col, optimizer_with_plan, root_logical_expr, table_get};

    #[test]
    fn test_limit_materializes_its_own_sort() {
        let limit = Limit::with_sort(
            1,
            2,
            vec![col("t1", "c1")],
            vec![SortDirection::Descending],
        );
        let plan = LogicalPlanBuilder::new()
            .get(table_get("t1"))
            .limit(limit.clone())
            .build();
        let optimizer = optimizer_with_plan(&plan);

        let results = limit
            .derive_properties(DerivePropContext {
                required_prop: &PropertySet::new(),
                expr_handle: root_logical_expr(&optimizer),
                optimizer: &optimizer,
            })
            .unwrap();

        assert_eq!(1, results.len());
        let sort = results[0].output_prop.sort_prop().unwrap();
        assert_eq!(vec![col("t1", "c1")], sort.sort_exprs());
        assert_eq!(vec![SortDirection::Descending], sort.sort_directions());
        // The child is left unconstrained.
        assert!(results[0].input_required_props[0].is_empty());
    }

    #[test]
    fn test_plain_limit_provides_nothing() {
        let limit = Limit::new(10, 0);
        let plan = LogicalPlanBuilder::new()
            .get(table_get("t1"))
            .limit(limit.clone())
            .build();
        let optimizer = optimizer_with_plan(&plan);

        let results = limit
            .derive_properties(DerivePropContext {
                required_prop: &PropertySet::new(),
                expr_handle: root_logical_expr(&optimizer),
                optimizer: &optimizer,
            })
            .unwrap();
        assert!(results[0].output_prop.is_empty());
    }
}
