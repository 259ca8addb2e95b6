use std::collections::BTreeSet;
use std::fmt::Formatter;

use crate::error::OptResult;
use crate::expression::AnnotatedExpression;
use crate::operator::{
    DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
};
use crate::optimizer::{OptExpr, OptGroup, Optimizer};
use crate::properties::{PropertySet};

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
    Semi,
    AntiSemi,
    /// Produces an extra boolean column indicating match; used by subquery
    /// decorrelation.
    Mark,
    /// Produces exactly one joined row per outer row.
    Single,
}

/// Logical join operator. Predicates are a conjunction; equality with an
/// empty predicate list is a cross product.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Join {
    join_type: JoinType,
    predicates: Vec<AnnotatedExpression>,
}

impl Join {
    pub fn new(join_type: JoinType, predicates: Vec<AnnotatedExpression>) -> Self {
        Self {
            join_type,
            predicates,
        }
    }

    pub fn inner(predicates: Vec<AnnotatedExpression>) -> Self {
        Self::new(JoinType::Inner, predicates)
    }

    /// Mark joins carry no predicates of their own; the match condition
    /// lives in the filter being decorrelated.
    pub fn mark() -> Self {
        Self::new(JoinType::Mark, vec![])
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn predicates(&self) -> &[AnnotatedExpression] {
        &self.predicates
    }
}

impl DisplayFields for Join {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("join_type", &self.join_type)
            .field("predicates", &self.predicates)
            .finish()
    }
}

/// Physical nested-loop join.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct NLJoin {
    join_type: JoinType,
    predicates: Vec<AnnotatedExpression>,
}

impl NLJoin {
    pub fn new(join_type: JoinType, predicates: Vec<AnnotatedExpression>) -> Self {
        Self {
            join_type,
            predicates,
        }
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn predicates(&self) -> &[AnnotatedExpression] {
        &self.predicates
    }
}

impl PhysicalOperatorTrait for NLJoin {
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        derive_for_join(self.join_type, context)
    }
}

impl DisplayFields for NLJoin {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("join_type", &self.join_type)
            .field("predicates", &self.predicates)
            .finish()
    }
}

/// Physical hash join; the build side is the left input, the probe side the
/// right one.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct HashJoin {
    join_type: JoinType,
    predicates: Vec<AnnotatedExpression>,
}

impl HashJoin {
    pub fn new(join_type: JoinType, predicates: Vec<AnnotatedExpression>) -> Self {
        Self {
            join_type,
            predicates,
        }
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn predicates(&self) -> &[AnnotatedExpression] {
        &self.predicates
    }
}

impl PhysicalOperatorTrait for HashJoin {
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        derive_for_join(self.join_type, context)
    }
}

impl DisplayFields for HashJoin {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("join_type", &self.join_type)
            .field("predicates", &self.predicates)
            .finish()
    }
}

/// Shared derivation for inner joins.
///
/// Joins provide nothing by default. Additionally, a required sort whose
/// columns all come from the probe (right) side can be pushed down into the
/// right child, with the join claiming the requirement as provided.
///
/// Non-inner variants yield no entries: their property contract is still
/// open pending cost-model work.
fn derive_for_join<O: Optimizer>(
    join_type: JoinType,
    context: DerivePropContext<O>,
) -> OptResult<Vec<DerivePropResult>> {
    if join_type != JoinType::Inner {
        return Ok(vec![]);
    }

    let mut output = vec![DerivePropResult::passthrough_none(2)];

    let expr = context.optimizer.expr_at(context.expr_handle);
    let probe_group = context
        .optimizer
        .group_at(expr.input_at(1, context.optimizer));
    let probe_aliases = probe_group.logical_prop().table_aliases();

    for property in context.required_prop.properties() {
        let sort = property.as_sort();
        let mut sort_aliases = BTreeSet::new();
        for sort_expr in sort.sort_exprs() {
            sort_expr.referenced_aliases(&mut sort_aliases);
        }

        if !sort_aliases.is_empty() && sort_aliases.is_subset(probe_aliases) {
            output.push(DerivePropResult {
                output_prop: context.required_prop.clone(),
                input_required_props: vec![PropertySet::new(), context.required_prop.clone()],
            });
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascades::{CascadesOptimizer, GroupExprKey};
    use crate::operator::Operator::Physical;
    use crate::operator::PhysicalOperator;
    use crate::plan::LogicalPlanBuilder;
    use crate::properties::{Property, SortDirection, SortSpec};
    use crate::test_utils::{col, col_eq, optimizer_with_plan, root_logical_expr, table_get};

    fn join_optimizer_with_physical() -> (CascadesOptimizer, crate::cascades::GroupExprId) {
        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.get(table_get("t2")).build().root();
            builder
                .get(table_get("t1"))
                .join(Join::inner(vec![col_eq("t1", "c1", "t2", "c2")]), right)
                .build()
        };
        let mut optimizer = optimizer_with_plan(&plan);

        let root = root_logical_expr(&optimizer);
        let inputs = optimizer.memo()[root].inputs().to_vec();
        let key = GroupExprKey {
            operator: Physical(PhysicalOperator::HashJoin(HashJoin::new(
                JoinType::Inner,
                vec![col_eq("t1", "c1", "t2", "c2")],
            ))),
            inputs,
        };
        let expr_id = optimizer.memo.insert_group_expression(key, Some(root.group_id));
        (optimizer, expr_id)
    }

    fn sort_on(table: &str, column: &str) -> PropertySet {
        PropertySet::with_property(Property::Sort(SortSpec::new(
            vec![col(table, column)],
            vec![SortDirection::Ascending],
        )))
    }

    #[test]
    fn test_join_provides_nothing_by_default() {
        let (optimizer, expr_id) = join_optimizer_with_physical();
        let join = optimizer.memo[expr_id]
            .operator()
            .as_physical()
            .unwrap()
            .clone();

        let required = PropertySet::new();
        let results = join
            .derive_properties(DerivePropContext {
                required_prop: &required,
                expr_handle: expr_id,
                optimizer: &optimizer,
            })
            .unwrap();

        assert_eq!(1, results.len());
        assert!(results[0].output_prop.is_empty());
        assert_eq!(2, results[0].input_required_props.len());
    }

    #[test]
    fn test_join_pushes_probe_side_sort_down() {
        let (optimizer, expr_id) = join_optimizer_with_physical();
        let join = optimizer.memo[expr_id]
            .operator()
            .as_physical()
            .unwrap()
            .clone();

        // Sort over the probe (right) side can be pushed into it.
        let required = sort_on("t2", "c2");
        let results = join
            .derive_properties(DerivePropContext {
                required_prop: &required,
                expr_handle: expr_id,
                optimizer: &optimizer,
            })
            .unwrap();

        assert_eq!(2, results.len());
        assert_eq!(required, results[1].output_prop);
        assert!(results[1].input_required_props[0].is_empty());
        assert_eq!(required, results[1].input_required_props[1]);

        // Sort over the build side cannot.
        let build_side = sort_on("t1", "c1");
        let results = join
            .derive_properties(DerivePropContext {
                required_prop: &build_side,
                expr_handle: expr_id,
                optimizer: &optimizer,
            })
            .unwrap();
        assert_eq!(1, results.len());
    }

    #[test]
    fn test_outer_join_variants_are_stubs() {
        let (optimizer, expr_id) = join_optimizer_with_physical();
        let left_join = NLJoin::new(JoinType::Left, vec![]);

        let required = PropertySet::new();
        let results = left_join
            .derive_properties(DerivePropContext {
                required_prop: &required,
                expr_handle: expr_id,
                optimizer: &optimizer,
            })
            .unwrap();
        assert!(results.is_empty());
    }
}
