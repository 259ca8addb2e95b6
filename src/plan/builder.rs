use std::sync::Arc;

use crate::expression::AnnotatedExpression;
use crate::operator::LogicalOperator::{
    LogicalAggregate, LogicalDistinct, LogicalFilter, LogicalGet, LogicalJoin, LogicalLimit,
};
use crate::operator::Operator::Logical;
use crate::operator::{Aggregate, Distinct, Filter, Get, Join, Limit, Operator};
use crate::plan::{Plan, PlanNode, PlanNodeId, PlanNodeRef};

/// Builds bound logical plans for optimizer input.
///
/// Multi-child plans are built by finishing one subtree with [`build`] and
/// feeding its root into the next operator, as the join method does.
///
/// [`build`]: LogicalPlanBuilder::build
#[derive(Default)]
pub struct LogicalPlanBuilder {
    root: Option<PlanNodeRef>,
    next_plan_node_id: PlanNodeId,
}

impl LogicalPlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, operator: Operator, inputs: Vec<PlanNodeRef>) -> &mut Self {
        self.next_plan_node_id += 1;
        self.root = Some(Arc::new(PlanNode::new(
            self.next_plan_node_id,
            operator,
            inputs,
        )));
        self
    }

    fn push_unary(&mut self, operator: Operator) -> &mut Self {
        let input = self.root.take().expect("unary operator needs an input");
        self.push(operator, vec![input])
    }

    pub fn get(&mut self, get: Get) -> &mut Self {
        self.push(Logical(LogicalGet(get)), vec![])
    }

    pub fn filter(&mut self, predicates: Vec<AnnotatedExpression>) -> &mut Self {
        self.push_unary(Logical(LogicalFilter(Filter::new(predicates))))
    }

    pub fn join(&mut self, join: Join, right: PlanNodeRef) -> &mut Self {
        let left = self.root.take().expect("join needs a left input");
        self.push(Logical(LogicalJoin(join)), vec![left, right])
    }

    pub fn aggregate(&mut self, aggregate: Aggregate) -> &mut Self {
        self.push_unary(Logical(LogicalAggregate(aggregate)))
    }

    pub fn limit(&mut self, limit: Limit) -> &mut Self {
        self.push_unary(Logical(LogicalLimit(limit)))
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.push_unary(Logical(LogicalDistinct(Distinct::new())))
    }

    /// Escape hatch for operators without a dedicated method.
    pub fn operator(&mut self, operator: Operator, extra_inputs: Vec<PlanNodeRef>) -> &mut Self {
        let mut inputs = Vec::with_capacity(extra_inputs.len() + 1);
        if let Some(root) = self.root.take() {
            inputs.push(root);
        }
        inputs.extend(extra_inputs);
        self.push(operator, inputs)
    }

    /// Consumes the current plan but not the id state, which is useful for
    /// building multi-child plans.
    pub fn build(&mut self) -> Plan {
        Plan::new(self.root.take().expect("empty plan"))
    }
}
