//! Implementation rules: provide a physical implementation for each logical
//! operator. They fire with [`RulePromise::Physical`] so candidates exist
//! early and give the search a pruning bound.

use std::collections::BTreeSet;

use crate::catalog::CatalogAccessor;
use crate::error::OptResult;
use crate::expression::{CompareKind, ExprKind};
use crate::operator::LogicalOperator::{
    LogicalAggregate, LogicalDelete, LogicalDerivedGet, LogicalDistinct, LogicalExportFile,
    LogicalExternalScan, LogicalGet, LogicalInsert, LogicalInsertSelect, LogicalJoin,
    LogicalLimit, LogicalUpdate,
};
use crate::operator::Operator::{Logical, Physical};
use crate::operator::{
    HashGroupBy, HashJoin, IndexScan, Join, JoinType, NLJoin, Operator, PhysicalOperator,
    PlainAggregate, SeqScan, SortGroupBy, TableFreeScan,
};
use crate::optimizer::Optimizer;
use crate::rules::RulePromise::Physical as PhysicalPromise;
use crate::rules::{
    leaf_group_aliases, OptExpression, Pattern, Rule, RuleId, RulePromise, RuleResult,
};

fn is_base_get(op: &Operator) -> bool {
    matches!(op, Logical(LogicalGet(get)) if !get.is_table_free())
}

fn is_table_free_get(op: &Operator) -> bool {
    matches!(op, Logical(LogicalGet(get)) if get.is_table_free())
}

fn is_inner_join(op: &Operator) -> bool {
    matches!(op, Logical(LogicalJoin(join)) if join.join_type() == JoinType::Inner)
}

fn is_group_by(op: &Operator) -> bool {
    matches!(op, Logical(LogicalAggregate(agg)) if !agg.columns().is_empty())
}

fn is_plain_aggregate(op: &Operator) -> bool {
    matches!(
        op,
        Logical(LogicalAggregate(agg)) if agg.columns().is_empty() && agg.having().is_empty()
    )
}

#[rustfmt::skip::macros(lazy_static)]
lazy_static! {
    static ref BASE_GET_PATTERN: Pattern = Pattern::leaf_operator(is_base_get);
    static ref TABLE_FREE_GET_PATTERN: Pattern = Pattern::leaf_operator(is_table_free_get);
    static ref DERIVED_GET_PATTERN: Pattern = Pattern::new(
        |op| matches!(op, Logical(LogicalDerivedGet(_))),
        vec![Pattern::leaf()],
    );
    static ref INNER_JOIN_PATTERN: Pattern =
        Pattern::new(is_inner_join, vec![Pattern::leaf(), Pattern::leaf()]);
    static ref GROUP_BY_PATTERN: Pattern = Pattern::new(is_group_by, vec![Pattern::leaf()]);
    static ref PLAIN_AGGREGATE_PATTERN: Pattern =
        Pattern::new(is_plain_aggregate, vec![Pattern::leaf()]);
    static ref LIMIT_PATTERN: Pattern = Pattern::new(
        |op| matches!(op, Logical(LogicalLimit(_))),
        vec![Pattern::leaf()],
    );
    static ref DISTINCT_PATTERN: Pattern = Pattern::new(
        |op| matches!(op, Logical(LogicalDistinct(_))),
        vec![Pattern::leaf()],
    );
    static ref INSERT_PATTERN: Pattern =
        Pattern::leaf_operator(|op| matches!(op, Logical(LogicalInsert(_))));
    static ref INSERT_SELECT_PATTERN: Pattern = Pattern::new(
        |op| matches!(op, Logical(LogicalInsertSelect(_))),
        vec![Pattern::leaf()],
    );
    static ref UPDATE_PATTERN: Pattern = Pattern::new(
        |op| matches!(op, Logical(LogicalUpdate(_))),
        vec![Pattern::leaf()],
    );
    static ref DELETE_PATTERN: Pattern = Pattern::new(
        |op| matches!(op, Logical(LogicalDelete(_))),
        vec![Pattern::leaf()],
    );
    static ref EXTERNAL_SCAN_PATTERN: Pattern =
        Pattern::leaf_operator(|op| matches!(op, Logical(LogicalExternalScan(_))));
    static ref EXPORT_PATTERN: Pattern = Pattern::new(
        |op| matches!(op, Logical(LogicalExportFile(_))),
        vec![Pattern::leaf()],
    );
}

#[derive(Clone, Default)]
pub struct GetToSeqScanRule {}

impl GetToSeqScanRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for GetToSeqScanRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let get = input
            .get_operator(ctx)?
            .as_logical()
            .unwrap()
            .as_logical_get()
            .unwrap();

        result.add(OptExpression::from(Physical(PhysicalOperator::SeqScan(
            SeqScan::new(
                get.database_oid(),
                get.namespace_oid(),
                get.table_oid(),
                get.predicates().to_vec(),
                get.table_alias(),
                get.is_for_update(),
                ctx.context().settings.parallel_execution,
            ),
        ))));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &BASE_GET_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::GetToSeqScan
    }

    fn rule_promise(&self) -> RulePromise {
        PhysicalPromise
    }
}

/// One index scan candidate per index on the scanned table. The property
/// deriver decides which of them can actually claim a required sort.
#[derive(Clone, Default)]
pub struct GetToIndexScanRule {}

impl GetToIndexScanRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for GetToIndexScanRule {
    fn check<O: Optimizer>(&self, _input: &OptExpression<O>, ctx: &O) -> bool {
        ctx.context().settings.enable_index_scan
    }

    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let get = input
            .get_operator(ctx)?
            .as_logical()
            .unwrap()
            .as_logical_get()
            .unwrap();

        for index in ctx.context().catalog.indexes(get.table_oid()) {
            result.add(OptExpression::from(Physical(PhysicalOperator::IndexScan(
                IndexScan::new(
                    get.database_oid(),
                    get.namespace_oid(),
                    get.table_oid(),
                    index.oid,
                    get.predicates().to_vec(),
                    get.table_alias(),
                    get.is_for_update(),
                    ctx.context().settings.parallel_execution,
                ),
            ))));
        }
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &BASE_GET_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::GetToIndexScan
    }

    fn rule_promise(&self) -> RulePromise {
        PhysicalPromise
    }
}

#[derive(Clone, Default)]
pub struct GetToTableFreeScanRule {}

impl GetToTableFreeScanRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for GetToTableFreeScanRule {
    fn apply<O: Optimizer>(
        &self,
        _input: OptExpression<O>,
        _ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        result.add(OptExpression::from(Physical(
            PhysicalOperator::TableFreeScan(TableFreeScan::new()),
        )));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &TABLE_FREE_GET_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::GetToTableFreeScan
    }

    fn rule_promise(&self) -> RulePromise {
        PhysicalPromise
    }
}

#[derive(Clone, Default)]
pub struct DerivedGetToDerivedScanRule {}

impl DerivedGetToDerivedScanRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for DerivedGetToDerivedScanRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let get = input
            .get_operator(ctx)?
            .as_logical()
            .unwrap()
            .as_logical_derived_get()
            .unwrap()
            .clone();

        result.add(input.clone_with_inputs(Physical(PhysicalOperator::QueryDerivedScan(get))));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &DERIVED_GET_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::DerivedGetToDerivedScan
    }

    fn rule_promise(&self) -> RulePromise {
        PhysicalPromise
    }
}

#[derive(Clone, Default)]
pub struct JoinToNLJoinRule {}

impl JoinToNLJoinRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for JoinToNLJoinRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let join = input
            .get_operator(ctx)?
            .as_logical()
            .unwrap()
            .as_logical_join()
            .unwrap();

        let nl_join = NLJoin::new(join.join_type(), join.predicates().to_vec());
        result.add(input.clone_with_inputs(Physical(PhysicalOperator::NLJoin(nl_join))));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &INNER_JOIN_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::JoinToNLJoin
    }

    fn rule_promise(&self) -> RulePromise {
        PhysicalPromise
    }
}

/// Hash joins need at least one equality predicate spanning both sides.
#[derive(Clone, Default)]
pub struct JoinToHashJoinRule {}

impl JoinToHashJoinRule {
    pub fn new() -> Self {
        Self {}
    }

    fn has_equi_predicate<O: Optimizer>(
        join: &Join,
        input: &OptExpression<O>,
        ctx: &O,
    ) -> OptResult<bool> {
        let left_aliases = leaf_group_aliases(&input[0], ctx)?;
        let right_aliases = leaf_group_aliases(&input[1], ctx)?;

        Ok(join.predicates().iter().any(|predicate| {
            if !matches!(predicate.expr().kind(), ExprKind::Compare(CompareKind::Equal)) {
                return false;
            }

            let mut left_refs = BTreeSet::new();
            predicate.expr().child(0).referenced_aliases(&mut left_refs);
            let mut right_refs = BTreeSet::new();
            predicate.expr().child(1).referenced_aliases(&mut right_refs);

            !left_refs.is_empty()
                && !right_refs.is_empty()
                && ((left_refs.is_subset(left_aliases) && right_refs.is_subset(right_aliases))
                    || (left_refs.is_subset(right_aliases)
                        && right_refs.is_subset(left_aliases)))
        }))
    }
}

impl Rule for JoinToHashJoinRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let join = input
            .get_operator(ctx)?
            .as_logical()
            .unwrap()
            .as_logical_join()
            .unwrap()
            .clone();

        if !Self::has_equi_predicate(&join, &input, ctx)? {
            return Ok(());
        }

        let hash_join = HashJoin::new(join.join_type(), join.predicates().to_vec());
        result.add(input.clone_with_inputs(Physical(PhysicalOperator::HashJoin(hash_join))));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &INNER_JOIN_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::JoinToHashJoin
    }

    fn rule_promise(&self) -> RulePromise {
        PhysicalPromise
    }
}

#[derive(Clone, Default)]
pub struct AggregateToHashGroupByRule {}

impl AggregateToHashGroupByRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for AggregateToHashGroupByRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let aggregate = input
            .get_operator(ctx)?
            .as_logical()
            .unwrap()
            .as_logical_aggregate()
            .unwrap();

        let group_by =
            HashGroupBy::new(aggregate.columns().to_vec(), aggregate.having().to_vec());
        result.add(input.clone_with_inputs(Physical(PhysicalOperator::HashGroupBy(group_by))));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &GROUP_BY_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::AggregateToHashGroupBy
    }

    fn rule_promise(&self) -> RulePromise {
        PhysicalPromise
    }
}

#[derive(Clone, Default)]
pub struct AggregateToSortGroupByRule {}

impl AggregateToSortGroupByRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for AggregateToSortGroupByRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        let aggregate = input
            .get_operator(ctx)?
            .as_logical()
            .unwrap()
            .as_logical_aggregate()
            .unwrap();

        let group_by =
            SortGroupBy::new(aggregate.columns().to_vec(), aggregate.having().to_vec());
        result.add(input.clone_with_inputs(Physical(PhysicalOperator::SortGroupBy(group_by))));
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &GROUP_BY_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::AggregateToSortGroupBy
    }

    fn rule_promise(&self) -> RulePromise {
        PhysicalPromise
    }
}

#[derive(Clone, Default)]
pub struct AggregateToPlainAggregateRule {}

impl AggregateToPlainAggregateRule {
    pub fn new() -> Self {
        Self {}
    }
}

impl Rule for AggregateToPlainAggregateRule {
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        _ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()> {
        result.add(
            input.clone_with_inputs(Physical(PhysicalOperator::Aggregate(PlainAggregate::new()))),
        );
        Ok(())
    }

    fn pattern(&self) -> &Pattern {
        &PLAIN_AGGREGATE_PATTERN
    }

    fn rule_id(&self) -> RuleId {
        RuleId::AggregateToPlainAggregate
    }

    fn rule_promise(&self) -> RulePromise {
        PhysicalPromise
    }
}

/// Copies the logical payload into the physical operator set unchanged.
macro_rules! payload_implementation_rule {
    ($rule:ident, $doc:literal, $pattern:ident, $rule_id:ident, $logical_variant:ident, $physical_variant:ident) => {
        #[doc = $doc]
        #[derive(Clone, Default)]
        pub struct $rule {}

        impl $rule {
            pub fn new() -> Self {
                Self {}
            }
        }

        impl Rule for $rule {
            fn apply<O: Optimizer>(
                &self,
                input: OptExpression<O>,
                ctx: &O,
                result: &mut RuleResult<O>,
            ) -> OptResult<()> {
                let operator = match input.get_operator(ctx)? {
                    Logical($logical_variant(payload)) => {
                        Physical(PhysicalOperator::$physical_variant(payload.clone()))
                    }
                    other => {
                        return Err(crate::error::OptimizerError::internal(format!(
                            "pattern mismatch: {:?}",
                            other
                        )))
                    }
                };
                result.add(input.clone_with_inputs(operator));
                Ok(())
            }

            fn pattern(&self) -> &Pattern {
                &$pattern
            }

            fn rule_id(&self) -> RuleId {
                RuleId::$rule_id
            }

            fn rule_promise(&self) -> RulePromise {
                PhysicalPromise
            }
        }
    };
}

payload_implementation_rule!(
    LimitToLimitRule,
    "Limit keeps its fused sort payload in the physical operator.",
    LIMIT_PATTERN,
    LimitToLimit,
    LogicalLimit,
    Limit
);
payload_implementation_rule!(
    DistinctToDistinctRule,
    "Duplicate elimination.",
    DISTINCT_PATTERN,
    DistinctToDistinct,
    LogicalDistinct,
    Distinct
);
payload_implementation_rule!(
    InsertToInsertRule,
    "Insert of literal rows.",
    INSERT_PATTERN,
    InsertToInsert,
    LogicalInsert,
    Insert
);
payload_implementation_rule!(
    InsertSelectToInsertSelectRule,
    "Insert fed by a query.",
    INSERT_SELECT_PATTERN,
    InsertSelectToInsertSelect,
    LogicalInsertSelect,
    InsertSelect
);
payload_implementation_rule!(
    UpdateToUpdateRule,
    "Update through its scan child.",
    UPDATE_PATTERN,
    UpdateToUpdate,
    LogicalUpdate,
    Update
);
payload_implementation_rule!(
    DeleteToDeleteRule,
    "Delete through its scan child.",
    DELETE_PATTERN,
    DeleteToDelete,
    LogicalDelete,
    Delete
);
payload_implementation_rule!(
    ExternalScanToExternalScanRule,
    "External file scan.",
    EXTERNAL_SCAN_PATTERN,
    ExternalScanToExternalScan,
    LogicalExternalScan,
    ExternalFileScan
);
payload_implementation_rule!(
    ExportToExportRule,
    "Export of the child's rows into an external file.",
    EXPORT_PATTERN,
    ExportToExport,
    LogicalExportFile,
    ExportExternalFile
);
