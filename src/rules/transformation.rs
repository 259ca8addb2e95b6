//! Join reordering rules. Together with the memo's deduplication these
//! enumerate bushy inner-join orders.

use log::trace;

use crate::error::OptResult;
use crate::operator::LogicalOperator::LogicalJoin;
use crate::operator::Operator::Logical;
use crate::operator::{Join, JoinType, Operator};
use crate::optimizer::Optimizer;
use crate::rules::RulePromise::Logical as LogicalPromise;
use crate::rules::{
    leaf_group_aliases, OptExpression, Pattern, Rule, RuleId, RulePromise, RuleResult,
};

fn is_inner_join(op: &Operator) -> bool {
    matches!(op, Logical(LogicalJoin(join)) if join.join_type() == JoinType::Inner)
}

#[rustfmt::skip::macros(lazy_static)]
lazy_static! {
    static ref INNER_JOIN_COMMUTATIVITY_PATTERN: Pattern =
        Pattern::new(is_inner_join, vec![Pattern::leaf(), Pattern::leaf()]);
    static ref INNER_JOIN_ASSOCIATIVITY_PATTERN: Pattern = Pattern::new(
        is_inner_join,
        vec![
            Pattern::new(is_inner_join, vec![Pattern::leaf(), Pattern::leaf()]),
            Pattern::leaf(),
        ],
    );
}

/// `A JOIN B -> B JOIN A`, predicates unchanged.
#[derive(Clone, Default)]
pub struct InnerJoinCommutativityRule {}

impl InnerJoinCommutativityRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for InnerJoinCommutativityRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let join_op = input.get_operator(ctx)?.clone();
        result.add(OptExpression::with_operator(
            join_op,
            vec![input[1].clone(), input[0].clone()],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &INNER_JOIN_COMMUTATIVITY_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::InnerJoinCommutativity
    }

    fn rule_promise(&self) -> RulePromise {
        LogicalPromise
    }
}

/// `(left JOIN middle) JOIN right -> left JOIN (middle JOIN right)`.
///
/// The union of both joins' predicates is redistributed: predicates covered
/// by `middle` and `right` together move to the new inner join, everything
/// else stays at the new outer join.
#[derive(Clone, Default)]
pub struct InnerJoinAssociativityRule {}

impl InnerJoinAssociativityRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for InnerJoinAssociativityRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let parent_join = input.get_operator(ctx)?.as_logical().unwrap();
        let child_join = input[0].get_operator(ctx)?.as_logical().unwrap();

        let left = &input[0][0];
        let middle = &input[0][1];
        let right = &input[1];
        trace!(
            "reassociating ({:?} JOIN {:?}) JOIN {:?}",
            left.node(),
            middle.node(),
            right.node()
        );

        let mut inner_aliases = leaf_group_aliases(middle, ctx)?.clone();
        inner_aliases.extend(leaf_group_aliases(right, ctx)?.iter().cloned());

        let mut predicates = parent_join.as_logical_join().unwrap().predicates().to_vec();
        predicates.extend_from_slice(child_join.as_logical_join().unwrap().predicates());

        let mut new_child_predicates = vec![];
        let mut new_parent_predicates = vec![];
        for predicate in predicates {
            if predicate.covered_by(&inner_aliases) {
                new_child_predicates.push(predicate);
            } else {
                new_parent_predicates.push(predicate);
            }
        }

        let new_child_join = OptExpression::with_operator(
            Logical(LogicalJoin(Join::inner(new_child_predicates))),
            vec![middle.clone(), right.clone()],
        );
        result.add(OptExpression::with_operator(
            Logical(LogicalJoin(Join::inner(new_parent_predicates))),
            vec![left.clone(), new_child_join],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &INNER_JOIN_ASSOCIATIVITY_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::InnerJoinAssociativity
    }

    fn rule_promise(&self) -> RulePromise {
        LogicalPromise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascades::Binding;
    use crate::operator::LogicalOperator;
    use crate::plan::LogicalPlanBuilder;
    use crate::rules::OptExprNode::{GroupHandleNode, OperatorNode};
    use crate::rules::RuleResult;
    use crate::test_utils::{col_eq, optimizer_with_plan, root_logical_expr, table_get};

    #[test]
    fn test_commutativity_swaps_children() {
        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.get(table_get("t2")).build().root();
            builder
                .get(table_get("t1"))
                .join(Join::inner(vec![col_eq("t1", "c1", "t2", "c2")]), right)
                .build()
        };
        let optimizer = optimizer_with_plan(&plan);
        let rule = InnerJoinCommutativityRule::new();

        let binding = Binding::new(
            root_logical_expr(&optimizer),
            rule.pattern(),
            optimizer.memo(),
        )
        .into_iter()
        .next()
        .unwrap();
        let original_inputs: Vec<_> = binding
            .inputs()
            .iter()
            .map(|input| input.node().clone())
            .collect();

        let mut result = RuleResult::new();
        rule.apply(binding, &optimizer, &mut result).unwrap();
        let results: Vec<_> = result.results().collect();
        assert_eq!(1, results.len());

        let swapped: Vec<_> = results[0]
            .inputs()
            .iter()
            .map(|input| input.node().clone())
            .collect();
        assert_eq!(original_inputs[0], swapped[1]);
        assert_eq!(original_inputs[1], swapped[0]);

        // Predicates are untouched.
        match results[0].node() {
            OperatorNode(Logical(LogicalJoin(join))) => {
                assert_eq!(vec![col_eq("t1", "c1", "t2", "c2")], join.predicates());
            }
            other => panic!("expected a join, got {:?}", other),
        }
    }

    #[test]
    fn test_associativity_redistributes_predicates() {
        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let t2 = builder.get(table_get("t2")).build().root();
            let t3 = builder.get(table_get("t3")).build().root();
            builder
                .get(table_get("t1"))
                .join(Join::inner(vec![col_eq("t1", "c1", "t2", "c2")]), t2)
                .join(Join::inner(vec![col_eq("t2", "c2", "t3", "c3")]), t3)
                .build()
        };
        let optimizer = optimizer_with_plan(&plan);
        let rule = InnerJoinAssociativityRule::new();

        let binding = Binding::new(
            root_logical_expr(&optimizer),
            rule.pattern(),
            optimizer.memo(),
        )
        .into_iter()
        .next()
        .unwrap();

        let mut result = RuleResult::new();
        rule.apply(binding, &optimizer, &mut result).unwrap();
        let results: Vec<_> = result.results().collect();
        assert_eq!(1, results.len());
        let output = &results[0];

        // New shape: t1 JOIN (t2 JOIN t3).
        assert!(matches!(output[0].node(), GroupHandleNode(_)));
        let inner = &output[1];
        assert!(matches!(inner[0].node(), GroupHandleNode(_)));
        assert!(matches!(inner[1].node(), GroupHandleNode(_)));

        // t2.c2 = t3.c3 moves into the new inner join, t1.c1 = t2.c2 stays.
        match (output.node(), inner.node()) {
            (
                OperatorNode(Logical(LogicalJoin(parent))),
                OperatorNode(Logical(LogicalOperator::LogicalJoin(child))),
            ) => {
                assert_eq!(vec![col_eq("t1", "c1", "t2", "c2")], parent.predicates());
                assert_eq!(vec![col_eq("t2", "c2", "t3", "c3")], child.predicates());
            }
            other => panic!("expected two joins, got {:?}", other),
        }
    }

    #[test]
    fn test_associativity_does_not_bind_plain_join() {
        // A two-way join has no nested join to reassociate.
        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.get(table_get("t2")).build().root();
            builder
                .get(table_get("t1"))
                .join(Join::inner(vec![col_eq("t1", "c1", "t2", "c2")]), right)
                .build()
        };
        let optimizer = optimizer_with_plan(&plan);
        let rule = InnerJoinAssociativityRule::new();

        let bindings: Vec<_> = Binding::new(
            root_logical_expr(&optimizer),
            rule.pattern(),
            optimizer.memo(),
        )
        .into_iter()
        .collect();
        assert!(bindings.is_empty());
    }
}
