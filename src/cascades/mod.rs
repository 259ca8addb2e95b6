//! Cascades style cost based optimizer: memo, binding and the task driver.

mod binding;
pub(crate) use binding::Binding;
mod memo;
pub use memo::*;
mod task;

use log::debug;

use crate::cascades::task::{schedule, OptimizeGroupTask};
use crate::cost::{CostModel, INF};
use crate::error::{OptResult, OptimizerError};
use crate::operator::LogicalOperator::LogicalGet;
use crate::operator::Operator::Logical;
use crate::optimizer::{Optimizer, OptimizerContext};
use crate::plan::Plan;
use crate::properties::PropertySet;
use crate::rules::{default_rule_set, RuleImpl};

pub struct CascadesOptimizer {
    pub(crate) required_prop: PropertySet,
    pub(crate) rules: Vec<RuleImpl>,
    pub(crate) memo: Memo,
    pub(crate) context: OptimizerContext,
    pub(crate) cost_model: CostModel,
}

impl Optimizer for CascadesOptimizer {
    type GroupHandle = GroupId;
    type ExprHandle = GroupExprId;
    type Group = Group;
    type Expr = GroupExpr;

    fn context(&self) -> &OptimizerContext {
        &self.context
    }

    fn group_at(&self, group_handle: GroupId) -> &Group {
        &self.memo[group_handle]
    }

    fn expr_at(&self, expr_handle: GroupExprId) -> &GroupExpr {
        &self.memo[expr_handle]
    }

    fn find_best_plan(mut self) -> OptResult<Plan> {
        let root_task =
            OptimizeGroupTask::new(self.memo.root_group_id(), self.required_prop.clone(), INF)
                .into();

        match schedule(&mut self, root_task) {
            Ok(()) => {}
            Err(OptimizerError::DeadlineExceeded) => {
                // Keep the best plan found so far, if there is one.
                debug!("deadline exceeded, returning best-so-far plan");
                return self
                    .memo
                    .best_plan(&self.required_prop)
                    .map_err(|_| OptimizerError::DeadlineExceeded);
            }
            Err(e) => return Err(e),
        }

        debug!("memo after optimization: {:?}", self.memo);
        self.memo.best_plan(&self.required_prop)
    }
}

impl CascadesOptimizer {
    pub fn new(
        required_prop: PropertySet,
        rules: Vec<RuleImpl>,
        plan: &Plan,
        context: OptimizerContext,
    ) -> OptResult<Self> {
        Ok(Self {
            required_prop,
            rules,
            memo: Memo::from_plan(plan)?,
            context,
            cost_model: CostModel::default(),
        })
    }

    /// Construct with the default rule set, gated by the context's settings
    /// and the number of base relations in the plan.
    pub fn with_default_rules(
        required_prop: PropertySet,
        plan: &Plan,
        context: OptimizerContext,
    ) -> OptResult<Self> {
        let relation_count = plan
            .bfs_iterator()
            .filter(|node| matches!(node.operator(), Logical(LogicalGet(_))))
            .count();
        let rules = default_rule_set(&context.settings, relation_count);
        Self::new(required_prop, rules, plan, context)
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }
}

/// Entry point: optimize a bound logical plan into an executable physical
/// plan that fulfills `required_prop` at the root.
pub fn optimize(
    plan: &Plan,
    required_prop: PropertySet,
    context: OptimizerContext,
) -> OptResult<Plan> {
    CascadesOptimizer::with_default_rules(required_prop, plan, context)?.find_best_plan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator::Physical;
    use crate::operator::{Join, PhysicalOperator};
    use crate::plan::LogicalPlanBuilder;
    use crate::test_utils::{col_eq, default_context, table_get};

    #[test]
    fn test_optimize_join_to_hash_join() {
        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.get(table_get("t2")).build().root();
            builder
                .get(table_get("t1"))
                .join(Join::inner(vec![col_eq("t1", "c1", "t2", "c2")]), right)
                .build()
        };

        let best = optimize(&plan, PropertySet::new(), default_context()).unwrap();

        let root = best.root();
        match root.operator() {
            Physical(PhysicalOperator::HashJoin(join)) => {
                assert_eq!(1, join.predicates().len());
            }
            other => panic!("expected hash join at the root, got {:?}", other),
        }
        assert_eq!(2, root.inputs().len());
        for input in root.inputs() {
            assert!(matches!(
                input.operator(),
                Physical(PhysicalOperator::SeqScan(_))
            ));
        }
    }

    #[test]
    fn test_cancellation() {
        let plan = LogicalPlanBuilder::new().get(table_get("t1")).build();

        let context = default_context();
        context.abort_handle().store(true, std::sync::atomic::Ordering::Relaxed);

        let result = optimize(&plan, PropertySet::new(), context);
        assert!(matches!(result, Err(OptimizerError::Cancelled)));
    }

    #[test]
    fn test_deadline_without_winner() {
        let plan = LogicalPlanBuilder::new().get(table_get("t1")).build();

        // A deadline in the past stops the search before any winner exists.
        let deadline = std::time::Instant::now() - std::time::Duration::from_secs(1);
        let context = default_context().with_deadline(deadline);

        let result = optimize(&plan, PropertySet::new(), context);
        assert!(matches!(result, Err(OptimizerError::DeadlineExceeded)));
    }

    #[test]
    fn test_no_physical_plan_reports_group_state() {
        // A mark join has no physical implementation; the search must fail
        // with diagnostics rather than panic.
        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.get(table_get("t2")).build().root();
            builder.get(table_get("t1")).join(Join::mark(), right).build()
        };

        let result = optimize(&plan, PropertySet::new(), default_context());
        match result {
            Err(OptimizerError::NoPhysicalPlan(msg)) => {
                assert!(msg.contains("explored"));
            }
            other => panic!("expected NoPhysicalPlan, got {:?}", other.map(|_| ())),
        }
    }
}
