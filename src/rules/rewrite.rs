//! Filter placement rules: pushing predicates towards scans, fusing
//! consecutive filters, and the decorrelating pull rules.

use std::collections::BTreeSet;

use log::trace;

use crate::error::OptResult;
use crate::expression::{AnnotatedExpression, ExprRef};
use crate::operator::LogicalOperator::{
    LogicalAggregate, LogicalFilter, LogicalGet, LogicalJoin,
};
use crate::operator::Operator::Logical;
use crate::operator::{Aggregate, Filter, Get, Join, JoinType, Operator};
use crate::optimizer::Optimizer;
use crate::rules::RulePromise::{Logical as LogicalPromise, UnnestHigh};
use crate::rules::{
    leaf_group_aliases, OptExpression, Pattern, Rule, RuleId, RulePromise, RuleResult,
};

fn is_filter(op: &Operator) -> bool {
    matches!(op, Logical(LogicalFilter(_)))
}

fn is_inner_join(op: &Operator) -> bool {
    matches!(op, Logical(LogicalJoin(join)) if join.join_type() == JoinType::Inner)
}

fn is_mark_join(op: &Operator) -> bool {
    matches!(op, Logical(LogicalJoin(join)) if join.join_type() == JoinType::Mark)
}

fn is_aggregate(op: &Operator) -> bool {
    matches!(op, Logical(LogicalAggregate(_)))
}

fn is_get(op: &Operator) -> bool {
    matches!(op, Logical(LogicalGet(_)))
}

#[rustfmt::skip::macros(lazy_static)]
lazy_static! {
    static ref PUSH_IMPLICIT_FILTER_THROUGH_JOIN_PATTERN: Pattern =
        Pattern::new(is_inner_join, vec![Pattern::leaf(), Pattern::leaf()]);
    static ref PUSH_EXPLICIT_FILTER_THROUGH_JOIN_PATTERN: Pattern = Pattern::new(
        is_filter,
        vec![Pattern::new(is_inner_join, vec![Pattern::leaf(), Pattern::leaf()])],
    );
    static ref PUSH_FILTER_THROUGH_AGGREGATION_PATTERN: Pattern = Pattern::new(
        is_filter,
        vec![Pattern::new(is_aggregate, vec![Pattern::leaf()])],
    );
    static ref COMBINE_CONSECUTIVE_FILTER_PATTERN: Pattern = Pattern::new(
        is_filter,
        vec![Pattern::new(is_filter, vec![Pattern::leaf()])],
    );
    static ref EMBED_FILTER_INTO_GET_PATTERN: Pattern =
        Pattern::new(is_filter, vec![Pattern::leaf_operator(is_get)]);
    static ref PULL_FILTER_THROUGH_MARK_JOIN_PATTERN: Pattern = Pattern::new(
        is_mark_join,
        vec![
            Pattern::leaf(),
            Pattern::new(is_filter, vec![Pattern::leaf()]),
        ],
    );
    static ref PULL_FILTER_THROUGH_AGGREGATION_PATTERN: Pattern = Pattern::new(
        is_aggregate,
        vec![Pattern::new(is_filter, vec![Pattern::leaf()])],
    );
}

/// Split a conjunction by pushdown target. A predicate goes to a child when
/// its alias set is covered by that child's aliases; everything else stays
/// at the join.
fn partition_predicates(
    predicates: &[AnnotatedExpression],
    left_aliases: &BTreeSet<String>,
    right_aliases: &BTreeSet<String>,
) -> (
    Vec<AnnotatedExpression>,
    Vec<AnnotatedExpression>,
    Vec<AnnotatedExpression>,
) {
    let mut left = vec![];
    let mut right = vec![];
    let mut join = vec![];

    for predicate in predicates {
        if predicate.covered_by(left_aliases) {
            left.push(predicate.clone());
        } else if predicate.covered_by(right_aliases) {
            right.push(predicate.clone());
        } else {
            join.push(predicate.clone());
        }
    }

    (left, right, join)
}

/// Wrap `child` in a filter when there is anything to evaluate there.
fn maybe_filter<O: Optimizer>(
    child: OptExpression<O>,
    predicates: Vec<AnnotatedExpression>,
) -> OptExpression<O> {
    if predicates.is_empty() {
        child
    } else {
        OptExpression::with_operator(
            Logical(LogicalFilter(Filter::new(predicates))),
            vec![child],
        )
    }
}

/// Push a join's own predicates down to the side each one references.
#[derive(Clone, Default)]
pub struct PushImplicitFilterThroughJoinRule {}

impl PushImplicitFilterThroughJoinRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for PushImplicitFilterThroughJoinRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let join = input.get_operator(ctx)?.as_logical().unwrap();
        let predicates = join.as_logical_join().unwrap().predicates();

        let left_aliases = leaf_group_aliases(&input[0], ctx)?;
        let right_aliases = leaf_group_aliases(&input[1], ctx)?;
        let (left, right, remaining) =
            partition_predicates(predicates, left_aliases, right_aliases);

        // Only emit if a predicate actually moved.
        if left.is_empty() && right.is_empty() {
            return Ok(());
        }

        let left_branch = maybe_filter(input[0].clone(), left);
        let right_branch = maybe_filter(input[1].clone(), right);
        result.add(OptExpression::with_operator(
            Logical(LogicalJoin(Join::inner(remaining))),
            vec![left_branch, right_branch],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &PUSH_IMPLICIT_FILTER_THROUGH_JOIN_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::PushImplicitFilterThroughJoin
    }

    fn rule_promise(&self) -> RulePromise {
        LogicalPromise
    }
}

/// Push an explicit filter above a join down through it, merging the filter
/// predicates with the join's own before partitioning.
#[derive(Clone, Default)]
pub struct PushExplicitFilterThroughJoinRule {}

impl PushExplicitFilterThroughJoinRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for PushExplicitFilterThroughJoinRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let filter_op = input.get_operator(ctx)?.as_logical().unwrap();
        let join_expr = &input[0];
        let join_op = join_expr.get_operator(ctx)?.as_logical().unwrap();

        let mut predicates = join_op.as_logical_join().unwrap().predicates().to_vec();
        predicates.extend_from_slice(filter_op.as_logical_filter().unwrap().predicates());

        let left_aliases = leaf_group_aliases(&join_expr[0], ctx)?;
        let right_aliases = leaf_group_aliases(&join_expr[1], ctx)?;
        let (left, right, remaining) =
            partition_predicates(&predicates, left_aliases, right_aliases);

        let left_branch = maybe_filter(join_expr[0].clone(), left);
        let right_branch = maybe_filter(join_expr[1].clone(), right);
        result.add(OptExpression::with_operator(
            Logical(LogicalJoin(Join::inner(remaining))),
            vec![left_branch, right_branch],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &PUSH_EXPLICIT_FILTER_THROUGH_JOIN_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::PushExplicitFilterThroughJoin
    }

    fn rule_promise(&self) -> RulePromise {
        LogicalPromise
    }
}

/// Split a filter above an aggregation: predicates over aggregate results
/// become HAVING, the rest push below the aggregation.
#[derive(Clone, Default)]
pub struct PushFilterThroughAggregationRule {}

impl PushFilterThroughAggregationRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for PushFilterThroughAggregationRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let filter_op = input.get_operator(ctx)?.as_logical().unwrap();
        let aggregate = input[0]
            .get_operator(ctx)?
            .as_logical()
            .unwrap()
            .as_logical_aggregate()
            .unwrap()
            .clone();

        let mut embedded = vec![];
        let mut pushdown = vec![];
        for predicate in filter_op.as_logical_filter().unwrap().predicates() {
            if predicate.expr().contains_aggregate() {
                embedded.push(predicate.clone());
            } else {
                pushdown.push(predicate.clone());
            }
        }
        // Preserve the existing HAVING clause.
        embedded.extend_from_slice(aggregate.having());

        let child = maybe_filter(input[0][0].clone(), pushdown);
        result.add(OptExpression::with_operator(
            Logical(LogicalAggregate(Aggregate::new(
                aggregate.columns().to_vec(),
                embedded,
            ))),
            vec![child],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &PUSH_FILTER_THROUGH_AGGREGATION_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::PushFilterThroughAggregation
    }

    fn rule_promise(&self) -> RulePromise {
        LogicalPromise
    }
}

/// Concatenate the predicate lists of two consecutive filters.
#[derive(Clone, Default)]
pub struct CombineConsecutiveFilterRule {}

impl CombineConsecutiveFilterRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for CombineConsecutiveFilterRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let root = input.get_operator(ctx)?.as_logical().unwrap();
        let child = input[0].get_operator(ctx)?.as_logical().unwrap();

        let mut predicates = root.as_logical_filter().unwrap().predicates().to_vec();
        predicates.extend_from_slice(child.as_logical_filter().unwrap().predicates());

        result.add(OptExpression::with_operator(
            Logical(LogicalFilter(Filter::new(predicates))),
            vec![input[0][0].clone()],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &COMBINE_CONSECUTIVE_FILTER_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::CombineConsecutiveFilter
    }

    fn rule_promise(&self) -> RulePromise {
        LogicalPromise
    }
}

/// Fuse filter predicates into the scan's internal predicate list.
#[derive(Clone, Default)]
pub struct EmbedFilterIntoGetRule {}

impl EmbedFilterIntoGetRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for EmbedFilterIntoGetRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let filter_op = input.get_operator(ctx)?.as_logical().unwrap();
        let get = input[0]
            .get_operator(ctx)?
            .as_logical()
            .unwrap()
            .as_logical_get()
            .unwrap()
            .clone();

        let mut predicates = get.predicates().to_vec();
        predicates.extend_from_slice(filter_op.as_logical_filter().unwrap().predicates());

        result.add(OptExpression::from(Logical(LogicalGet(Get::new(
            get.database_oid(),
            get.namespace_oid(),
            get.table_oid(),
            predicates,
            get.table_alias(),
            get.is_for_update(),
        )))));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &EMBED_FILTER_INTO_GET_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::EmbedFilterIntoGet
    }

    fn rule_promise(&self) -> RulePromise {
        LogicalPromise
    }
}

/// Lift a filter above a mark join, so decorrelation can work on it before
/// the push rules bury it again.
#[derive(Clone, Default)]
pub struct PullFilterThroughMarkJoinRule {}

impl PullFilterThroughMarkJoinRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for PullFilterThroughMarkJoinRule {
    fn check<O: Optimizer>(&self, input: &OptExpression<O>, ctx: &O) -> bool {
        // Mark joins produced by decorrelation carry no predicates of their
        // own; anything else is not ours to touch.
        match input.get_operator(ctx) {
            Ok(op) => op
                .as_logical()
                .and_then(|l| l.as_logical_join())
                .map(|join| join.predicates().is_empty())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let join_op = input.get_operator(ctx)?.clone();
        let filter_op = input[1].get_operator(ctx)?.clone();

        let join = OptExpression::with_operator(
            join_op,
            vec![input[0].clone(), input[1][0].clone()],
        );
        result.add(OptExpression::with_operator(filter_op, vec![join]));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &PULL_FILTER_THROUGH_MARK_JOIN_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::PullFilterThroughMarkJoin
    }

    fn rule_promise(&self) -> RulePromise {
        UnnestHigh
    }
}

/// Pull correlated predicates above an aggregation, turning their inner-side
/// expressions into additional group-by columns.
#[derive(Clone, Default)]
pub struct PullFilterThroughAggregationRule {}

impl PullFilterThroughAggregationRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for PullFilterThroughAggregationRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let filter_expr = &input[0];
        let child_aliases = leaf_group_aliases(&filter_expr[0], ctx)?;
        let filter_op = filter_expr.get_operator(ctx)?.as_logical().unwrap();

        let mut correlated = vec![];
        let mut normal = vec![];
        let mut new_groupby_cols: Vec<ExprRef> = vec![];
        for predicate in filter_op.as_logical_filter().unwrap().predicates() {
            if predicate.covered_by(child_aliases) {
                normal.push(predicate.clone());
                continue;
            }

            // Correlated predicate, already in the form outer.a = (expr).
            // The comparison child bound at a smaller depth references the
            // outer scope; the other side is the inner expression to group
            // on. Equal depths fall through to the right child.
            correlated.push(predicate.clone());
            let root = predicate.expr();
            if root.child(0).depth() < root.depth() {
                new_groupby_cols.push(root.child(1).clone());
            } else {
                new_groupby_cols.push(root.child(0).clone());
            }
        }

        if correlated.is_empty() {
            trace!("no correlated predicates, nothing to pull");
            return Ok(());
        }

        let aggregate = input
            .get_operator(ctx)?
            .as_logical()
            .unwrap()
            .as_logical_aggregate()
            .unwrap();
        new_groupby_cols.extend(aggregate.columns().iter().cloned());

        let aggr_child = maybe_filter(filter_expr[0].clone(), normal);
        let new_aggregate = OptExpression::with_operator(
            Logical(LogicalAggregate(Aggregate::new(
                new_groupby_cols,
                aggregate.having().to_vec(),
            ))),
            vec![aggr_child],
        );

        result.add(OptExpression::with_operator(
            Logical(LogicalFilter(Filter::new(correlated))),
            vec![new_aggregate],
        ));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &PULL_FILTER_THROUGH_AGGREGATION_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::PullFilterThroughAggregation
    }

    fn rule_promise(&self) -> RulePromise {
        UnnestHigh
    }
}
