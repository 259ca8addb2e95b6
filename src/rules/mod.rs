//! Optimization rules.
//!
//! Rules come in three flavors:
//!
//! 1. Rewrite rules producing a plan assumed to be better than the input,
//!    e.g. [`PushImplicitFilterThroughJoinRule`]. The decorrelating pull
//!    rules also belong here, with a raised promise so they fire before the
//!    push rules undo their work.
//! 2. Exploration rules producing equivalent logical alternatives, e.g.
//!    [`InnerJoinCommutativityRule`].
//! 3. Implementation rules providing physical implementations, e.g.
//!    [`GetToSeqScanRule`].
//!
//! A rule only sees an [`OptExpression`] produced by matching its pattern
//! against the memo; it never walks the memo itself. `check` filters a
//! binding, `apply` emits zero or more replacements, and a rule that emits
//! nothing simply contributes nothing.

mod pattern;
pub use pattern::*;
mod opt_expr;
pub use opt_expr::*;
mod rewrite;
pub use rewrite::*;
mod transformation;
pub use transformation::*;
mod implementation;
pub use implementation::*;

use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};

use enum_dispatch::enum_dispatch;
use enumset::EnumSetType;
use strum_macros::AsRefStr;

use crate::error::{OptResult, OptimizerError};
use crate::optimizer::{OptGroup, Optimizer};
use crate::rules::OptExprNode::GroupHandleNode;
use crate::settings::OptimizerSettings;

pub struct RuleResult<O: Optimizer> {
    exprs: Vec<OptExpression<O>>,
}

impl<O: Optimizer> Default for RuleResult<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Optimizer> RuleResult<O> {
    pub fn new() -> Self {
        Self { exprs: vec![] }
    }

    pub fn add(&mut self, new_expr: OptExpression<O>) {
        self.exprs.push(new_expr);
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn results(self) -> impl Iterator<Item = OptExpression<O>> {
        self.exprs.into_iter()
    }
}

/// A rule provides equivalent transformations of optimizer expressions.
#[enum_dispatch(RuleImpl)]
pub trait Rule {
    /// Filter a binding before `apply`. A rejected binding is not an error.
    fn check<O: Optimizer>(&self, _input: &OptExpression<O>, _ctx: &O) -> bool {
        true
    }

    /// Apply the rule to a matched sub-plan.
    fn apply<O: Optimizer>(
        &self,
        input: OptExpression<O>,
        ctx: &O,
        result: &mut RuleResult<O>,
    ) -> OptResult<()>;

    fn pattern(&self) -> &Pattern;

    /// Identifies the rule, to avoid applying it twice to one group
    /// expression.
    fn rule_id(&self) -> RuleId;

    /// Biases application order: higher promises fire first.
    fn rule_promise(&self) -> RulePromise;
}

#[enum_dispatch]
#[derive(Clone, AsRefStr)]
pub enum RuleImpl {
    // Rewrite rules
    PushImplicitFilterThroughJoinRule,
    PushExplicitFilterThroughJoinRule,
    PushFilterThroughAggregationRule,
    CombineConsecutiveFilterRule,
    EmbedFilterIntoGetRule,
    PullFilterThroughMarkJoinRule,
    PullFilterThroughAggregationRule,

    // Exploration rules
    InnerJoinCommutativityRule,
    InnerJoinAssociativityRule,

    // Implementation rules
    GetToSeqScanRule,
    GetToIndexScanRule,
    GetToTableFreeScanRule,
    DerivedGetToDerivedScanRule,
    JoinToNLJoinRule,
    JoinToHashJoinRule,
    AggregateToHashGroupByRule,
    AggregateToSortGroupByRule,
    AggregateToPlainAggregateRule,
    LimitToLimitRule,
    DistinctToDistinctRule,
    InsertToInsertRule,
    InsertSelectToInsertSelectRule,
    UpdateToUpdateRule,
    DeleteToDeleteRule,
    ExternalScanToExternalScanRule,
    ExportToExportRule,
}

#[derive(EnumSetType, Debug)]
pub enum RuleId {
    PushImplicitFilterThroughJoin,
    PushExplicitFilterThroughJoin,
    PushFilterThroughAggregation,
    CombineConsecutiveFilter,
    EmbedFilterIntoGet,
    PullFilterThroughMarkJoin,
    PullFilterThroughAggregation,

    InnerJoinCommutativity,
    InnerJoinAssociativity,

    GetToSeqScan,
    GetToIndexScan,
    GetToTableFreeScan,
    DerivedGetToDerivedScan,
    JoinToNLJoin,
    JoinToHashJoin,
    AggregateToHashGroupBy,
    AggregateToSortGroupBy,
    AggregateToPlainAggregate,
    LimitToLimit,
    DistinctToDistinct,
    InsertToInsert,
    InsertSelectToInsertSelect,
    UpdateToUpdate,
    DeleteToDelete,
    ExternalScanToExternalScan,
    ExportToExport,
}

/// Rule ordering hint. Tasks for rules with a higher promise are scheduled
/// to run first; `UnnestHigh` makes the decorrelating pull rules fire before
/// the push rules.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RulePromise {
    Logical = 1,
    Physical = 2,
    UnnestHigh = 3,
}

impl Debug for RuleImpl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// The full rule set for one optimization call, gated by settings.
///
/// `relation_count` is the number of base relations in the plan; beyond the
/// join-order threshold the reordering rules are left out and the initial
/// join order stands.
pub fn default_rule_set(settings: &OptimizerSettings, relation_count: usize) -> Vec<RuleImpl> {
    let mut rules: Vec<RuleImpl> = vec![
        PushImplicitFilterThroughJoinRule::new().into(),
        PushExplicitFilterThroughJoinRule::new().into(),
        PushFilterThroughAggregationRule::new().into(),
        CombineConsecutiveFilterRule::new().into(),
        EmbedFilterIntoGetRule::new().into(),
        PullFilterThroughMarkJoinRule::new().into(),
        PullFilterThroughAggregationRule::new().into(),
    ];

    if relation_count <= settings.join_order_threshold {
        rules.push(InnerJoinCommutativityRule::new().into());
        rules.push(InnerJoinAssociativityRule::new().into());
    }

    rules.push(GetToSeqScanRule::new().into());
    if settings.enable_index_scan {
        rules.push(GetToIndexScanRule::new().into());
    }
    rules.extend([
        GetToTableFreeScanRule::new().into(),
        DerivedGetToDerivedScanRule::new().into(),
        JoinToNLJoinRule::new().into(),
        JoinToHashJoinRule::new().into(),
        AggregateToHashGroupByRule::new().into(),
        AggregateToSortGroupByRule::new().into(),
        AggregateToPlainAggregateRule::new().into(),
        LimitToLimitRule::new().into(),
        DistinctToDistinctRule::new().into(),
        InsertToInsertRule::new().into(),
        InsertSelectToInsertSelectRule::new().into(),
        UpdateToUpdateRule::new().into(),
        DeleteToDeleteRule::new().into(),
        ExternalScanToExternalScanRule::new().into(),
        ExportToExportRule::new().into(),
    ]);

    rules
}

/// Covered alias set of a leaf binding node.
pub(crate) fn leaf_group_aliases<'a, O: Optimizer>(
    expr: &OptExpression<O>,
    ctx: &'a O,
) -> OptResult<&'a BTreeSet<String>> {
    match expr.node() {
        GroupHandleNode(handle) => Ok(ctx
            .group_at(handle.clone())
            .logical_prop()
            .table_aliases()),
        _ => Err(OptimizerError::internal(
            "expected a group handle at the pattern horizon",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_debug_uses_name() {
        let rule: RuleImpl = CombineConsecutiveFilterRule::new().into();
        assert_eq!("CombineConsecutiveFilterRule", format!("{:?}", rule));
    }

    #[test]
    fn test_rule_set_gating() {
        let mut settings = OptimizerSettings::default();
        settings.enable_index_scan = false;
        settings.join_order_threshold = 2;

        let rules = default_rule_set(&settings, 3);
        assert!(!rules
            .iter()
            .any(|r| matches!(r, RuleImpl::InnerJoinCommutativityRule(_))));
        assert!(!rules
            .iter()
            .any(|r| matches!(r, RuleImpl::GetToIndexScanRule(_))));

        let rules = default_rule_set(&OptimizerSettings::default(), 3);
        assert!(rules
            .iter()
            .any(|r| matches!(r, RuleImpl::InnerJoinAssociativityRule(_))));
    }
}
