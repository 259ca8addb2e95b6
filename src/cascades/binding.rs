use itertools::Itertools;

use crate::cascades::memo::Memo;
use crate::cascades::{CascadesOptimizer, GroupExprId};
use crate::rules::{OptExpression, Pattern};

type OptExpr = OptExpression<CascadesOptimizer>;

/// Enumerates every binding of a rule pattern rooted at one group
/// expression.
///
/// The root operator must match the pattern root. For each child slot a
/// [`Pattern::Leaf`] binds the child group as a whole (a group handle in
/// the resulting expression), while a typed pattern recurses into every
/// logical expression of the child group; the bindings are the cartesian
/// product over child slots.
pub struct Binding<'a, 'b> {
    group_expr_id: GroupExprId,
    pattern: &'b Pattern,
    memo: &'a Memo,
}

impl<'a, 'b> Binding<'a, 'b> {
    pub fn new(group_expr_id: GroupExprId, pattern: &'b Pattern, memo: &'a Memo) -> Self {
        Self {
            group_expr_id,
            pattern,
            memo,
        }
    }

    fn bind_expr(&self, group_expr_id: GroupExprId, pattern: &Pattern) -> Vec<OptExpr> {
        let group_expr = &self.memo[group_expr_id];
        if !group_expr.matches_without_children(pattern) {
            return vec![];
        }

        // A childless pattern matches exactly once; the cartesian product
        // below would yield nothing for zero child slots.
        if pattern.children().is_empty() {
            return vec![OptExpr::with_expr_handle(group_expr_id, vec![])];
        }

        pattern
            .children()
            .iter()
            .zip(group_expr.input_group_ids())
            .map(|(child_pattern, child_group_id)| match child_pattern {
                Pattern::Leaf => vec![OptExpr::with_group_handle(child_group_id)],
                Pattern::Operator { .. } => self.memo[child_group_id]
                    .logical_group_expr_ids()
                    .into_iter()
                    .flat_map(|child_expr_id| self.bind_expr(child_expr_id, child_pattern))
                    .collect(),
            })
            .multi_cartesian_product()
            .map(|inputs| OptExpr::with_expr_handle(group_expr_id, inputs))
            .collect()
    }
}

impl<'a, 'b> IntoIterator for Binding<'a, 'b> {
    type Item = OptExpr;
    type IntoIter = std::vec::IntoIter<OptExpr>;

    fn into_iter(self) -> Self::IntoIter {
        self.bind_expr(self.group_expr_id, self.pattern).into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascades::memo::Memo;
    use crate::operator::LogicalOperator::{LogicalFilter, LogicalGet, LogicalJoin, LogicalLimit};
    use crate::operator::Operator::Logical;
    use crate::operator::{Join, Limit};
    use crate::plan::LogicalPlanBuilder;
    use crate::rules::OptExprNode::{ExprHandleNode, GroupHandleNode};
    use crate::rules::Pattern;
    use crate::test_utils::{col_eq, col_eq_int, table_get};

    #[test]
    fn test_bind_one() {
        let plan = LogicalPlanBuilder::new()
            .get(table_get("t1"))
            .filter(vec![col_eq_int("t1", "c1", 5)])
            .limit(Limit::new(10, 0))
            .build();

        let memo = Memo::from_plan(&plan).unwrap();
        let pattern = Pattern::new(
            |op| matches!(op, Logical(LogicalLimit(_))),
            vec![Pattern::leaf()],
        );

        let root_expr_id = memo[memo.root_group_id()].logical_group_expr_ids()[0];
        let mut bindings = Binding::new(root_expr_id, &pattern, &memo).into_iter();

        let binding = bindings.next().unwrap();
        assert!(matches!(binding.node(), ExprHandleNode(id) if *id == root_expr_id));
        assert_eq!(1, binding.inputs().len());
        assert!(matches!(binding[0].node(), GroupHandleNode(_)));

        assert!(bindings.next().is_none());
    }

    #[test]
    fn test_bind_typed_child() {
        let plan = LogicalPlanBuilder::new()
            .get(table_get("t1"))
            .filter(vec![col_eq_int("t1", "c1", 5)])
            .limit(Limit::new(10, 0))
            .build();

        let memo = Memo::from_plan(&plan).unwrap();
        let pattern = Pattern::new(
            |op| matches!(op, Logical(LogicalLimit(_))),
            vec![Pattern::new(
                |op| matches!(op, Logical(LogicalFilter(_))),
                vec![Pattern::leaf()],
            )],
        );

        let root_expr_id = memo[memo.root_group_id()].logical_group_expr_ids()[0];
        let bindings: Vec<_> = Binding::new(root_expr_id, &pattern, &memo)
            .into_iter()
            .collect();

        assert_eq!(1, bindings.len());
        let binding = &bindings[0];
        assert!(matches!(binding[0].node(), ExprHandleNode(_)));
        assert!(matches!(binding[0][0].node(), GroupHandleNode(_)));
    }

    #[test]
    fn test_bind_enumerates_alternatives() {
        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.get(table_get("t2")).build().root();
            builder
                .get(table_get("t1"))
                .join(Join::inner(vec![col_eq("t1", "c1", "t2", "c2")]), right)
                .limit(Limit::new(7, 0))
                .build()
        };

        let mut memo = Memo::from_plan(&plan).unwrap();

        // Insert a second join alternative into the join group.
        let root_expr_id = memo[memo.root_group_id()].logical_group_expr_ids()[0];
        let join_group_id = memo[root_expr_id].inputs()[0];
        let join_inputs: Vec<_> = {
            let join_expr_id = memo[join_group_id].logical_group_expr_ids()[0];
            memo[join_expr_id].inputs().to_vec()
        };
        let commuted = crate::cascades::memo::GroupExprKey {
            operator: Logical(LogicalJoin(Join::inner(vec![col_eq(
                "t2", "c2", "t1", "c1",
            )]))),
            inputs: join_inputs.into_iter().rev().collect(),
        };
        memo.insert_group_expression(commuted, Some(join_group_id));

        let pattern = Pattern::new(
            |op| matches!(op, Logical(LogicalLimit(_))),
            vec![Pattern::new(
                |op| matches!(op, Logical(LogicalJoin(_))),
                vec![Pattern::leaf(), Pattern::leaf()],
            )],
        );

        let bindings: Vec<_> = Binding::new(root_expr_id, &pattern, &memo)
            .into_iter()
            .collect();

        // One binding per logical join member of the child group.
        assert_eq!(2, bindings.len());
        for binding in &bindings {
            assert_eq!(2, binding[0].inputs().len());
            assert!(binding[0]
                .inputs()
                .iter()
                .all(|input| matches!(input.node(), GroupHandleNode(_))));
        }
    }

    #[test]
    fn test_childless_pattern_binds_scan() {
        let plan = LogicalPlanBuilder::new().get(table_get("t1")).build();
        let memo = Memo::from_plan(&plan).unwrap();

        let pattern = Pattern::leaf_operator(|op| matches!(op, Logical(LogicalGet(_))));
        let root_expr_id = memo[memo.root_group_id()].logical_group_expr_ids()[0];

        let bindings: Vec<_> = Binding::new(root_expr_id, &pattern, &memo)
            .into_iter()
            .collect();
        assert_eq!(1, bindings.len());
        assert!(bindings[0].inputs().is_empty());
    }
}
