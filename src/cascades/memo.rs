use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Display, Formatter};
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use enumset::EnumSet;
use itertools::Itertools;
use log::trace;
use prettytable::{row, Table};

use crate::cascades::CascadesOptimizer;
use crate::cost::Cost;
use crate::error::{OptResult, OptimizerError};
use crate::expression::ExprSet;
use crate::operator::Operator;
use crate::optimizer::{OptExpr, OptExprHandle, OptGroup, OptGroupHandle};
use crate::plan::{Plan, PlanNode, PlanNodeIdGen, PlanNodeRef};
use crate::properties::{LogicalProperty, PropertySet};
use crate::rules::OptExprNode::{ExprHandleNode, GroupHandleNode, OperatorNode};
use crate::rules::{OptExpression, Pattern, RuleId};
use crate::stats::Statistics;

/// Dynamic programming table of the search: groups of equivalent
/// expressions, deduplicated by operator payload and ordered child groups.
pub struct Memo {
    /// Avoids inserting duplicate group expressions.
    group_exprs: HashMap<GroupExprKey, GroupExprId>,
    groups: HashMap<GroupId, Group>,
    root_group_id: GroupId,
    next_group_id: GroupId,
}

impl Memo {
    /// Ingest a bound logical tree, bottom-up. The input is validated
    /// against operator arities; the tree is consumed and not retained.
    pub fn from_plan(plan: &Plan) -> OptResult<Memo> {
        let mut memo = Memo {
            group_exprs: HashMap::new(),
            groups: HashMap::new(),
            root_group_id: GroupId(0),
            next_group_id: GroupId(0),
        };

        let plan_nodes = plan.bfs_iterator().collect::<Vec<PlanNodeRef>>();
        let mut node_to_group = HashMap::with_capacity(plan_nodes.len());
        for node in plan_nodes.into_iter().rev() {
            if node.operator().as_logical().is_none() {
                return Err(OptimizerError::binding(format!(
                    "optimizer input must be logical, found {:?}",
                    node.operator()
                )));
            }
            if let Some(arity) = node.operator().arity() {
                if arity != node.inputs().len() {
                    return Err(OptimizerError::binding(format!(
                        "{:?} expects {} children, found {}",
                        node.operator(),
                        arity,
                        node.inputs().len()
                    )));
                }
            }

            let key = GroupExprKey {
                operator: node.operator().clone(),
                inputs: node
                    .inputs()
                    .iter()
                    .map(|input| *node_to_group.get(&input.id()).expect("bottom-up order"))
                    .collect(),
            };

            let group_id = memo.insert_group_expression(key, None).group_id;
            node_to_group.insert(node.id(), group_id);
        }

        memo.root_group_id = *node_to_group
            .get(&plan.root().id())
            .expect("root was ingested");
        Ok(memo)
    }

    pub fn root_group_id(&self) -> GroupId {
        self.root_group_id
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Insert a rule result. Nodes extracted unchanged from the memo keep
    /// their identity; leaf sentinels resolve back to the referenced group.
    ///
    /// This only ever creates groups and group expressions. A result whose
    /// canonical form already lives in another group is returned as-is; no
    /// groups are merged while bindings may still be alive.
    pub fn insert_opt_expression(
        &mut self,
        opt_expr: &OptExpression<CascadesOptimizer>,
        target_group: Option<GroupId>,
    ) -> GroupExprId {
        match opt_expr.node() {
            ExprHandleNode(group_expr_id) => *group_expr_id,
            GroupHandleNode(_) => unreachable!("group handle is not insertable directly"),
            OperatorNode(operator) => {
                let inputs = opt_expr
                    .inputs()
                    .iter()
                    .map(|input| match input.node() {
                        GroupHandleNode(group_id) => *group_id,
                        ExprHandleNode(expr_id) => expr_id.group_id,
                        OperatorNode(_) => self.insert_opt_expression(input, None).group_id,
                    })
                    .collect();

                let key = GroupExprKey {
                    operator: operator.clone(),
                    inputs,
                };
                self.insert_group_expression(key, target_group)
            }
        }
    }

    pub fn insert_group_expression(
        &mut self,
        key: GroupExprKey,
        target_group: Option<GroupId>,
    ) -> GroupExprId {
        if let Some(existing) = self.group_exprs.get(&key) {
            if let Some(target) = target_group {
                if target != existing.group_id {
                    // Structurally equal expressions discovered through two
                    // different groups. Keep the original home; merging is
                    // not worth invalidating live bindings for.
                    trace!(
                        "duplicate group expression {:?} found in group {:?}, target was {:?}",
                        key,
                        existing.group_id,
                        target
                    );
                }
            }
            return *existing;
        }

        let group_id = match target_group {
            Some(group_id) => group_id,
            None => self.new_group(&key),
        };

        let group_expr_id = self[group_id].insert_group_expr(GroupExpr::new(key.clone()));
        self.group_exprs.insert(key, group_expr_id);
        group_expr_id
    }

    fn new_group(&mut self, key: &GroupExprKey) -> GroupId {
        let table_aliases = {
            let child_aliases = key
                .inputs
                .iter()
                .map(|gid| self[*gid].table_aliases())
                .collect::<Vec<_>>();
            key.operator.derive_table_aliases(&child_aliases)
        };
        let logical_prop = LogicalProperty::new(table_aliases);

        let group_id = self.next_group_id();
        self.groups.insert(group_id, Group::new(group_id, logical_prop));
        group_id
    }

    fn next_group_id(&mut self) -> GroupId {
        let ret = self.next_group_id;
        self.next_group_id.0 += 1;
        ret
    }

    /// Materialize the winner chain of the root group.
    pub fn best_plan(&self, required_prop: &PropertySet) -> OptResult<Plan> {
        let mut id_gen = PlanNodeIdGen::new();
        self[self.root_group_id]
            .best_plan_of(required_prop, self, &mut id_gen)
            .map(Plan::new)
    }
}

impl Index<GroupId> for Memo {
    type Output = Group;

    fn index(&self, index: GroupId) -> &Group {
        self.groups.get(&index).expect("unknown group id")
    }
}

impl IndexMut<GroupId> for Memo {
    fn index_mut(&mut self, index: GroupId) -> &mut Group {
        self.groups.get_mut(&index).expect("unknown group id")
    }
}

impl Index<GroupExprId> for Memo {
    type Output = GroupExpr;

    fn index(&self, index: GroupExprId) -> &GroupExpr {
        &self[index.group_id][index]
    }
}

impl IndexMut<GroupExprId> for Memo {
    fn index_mut(&mut self, index: GroupExprId) -> &mut GroupExpr {
        &mut self[index.group_id][index]
    }
}

impl Debug for Memo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "Groups in memo:")?;
        for group_id in self.groups.keys().sorted() {
            writeln!(f, "{:?}", self.groups[group_id])?;
        }
        Ok(())
    }
}

/// Index of a group in the memo.
#[derive(Hash, Eq, PartialEq, Clone, Copy, Ord, PartialOrd)]
pub struct GroupId(pub usize);

impl Debug for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OptGroupHandle for GroupId {
    type O = CascadesOptimizer;
}

/// Index of a group expression within its group.
#[derive(Hash, Eq, PartialEq, Clone, Copy)]
pub struct GroupExprId {
    pub group_id: GroupId,
    pub expr_id: usize,
}

impl GroupExprId {
    pub fn new(group_id: GroupId, expr_id: usize) -> Self {
        Self { group_id, expr_id }
    }
}

impl Debug for GroupExprId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}.{}", self.group_id, self.expr_id)
    }
}

impl OptExprHandle for GroupExprId {
    type O = CascadesOptimizer;
}

/// Identity of a group expression: operator payload plus ordered child
/// group ids.
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct GroupExprKey {
    pub operator: Operator,
    pub inputs: Vec<GroupId>,
}

/// A set of logically equivalent expressions, plus the physical
/// implementations discovered for them during search.
pub struct Group {
    group_id: GroupId,
    logical_prop: LogicalProperty,
    /// Derived statistics; shared by all members.
    stats: Option<Statistics>,
    /// Columns whose statistics have been derived already.
    stats_cols: ExprSet,
    pub(crate) logical_group_exprs: HashMap<GroupExprId, GroupExpr>,
    pub(crate) physical_group_exprs: HashMap<GroupExprId, GroupExpr>,
    /// Lowest cost implementation per required property set.
    best_plans: HashMap<PropertySet, OptimizationResult>,
    /// All logical members have been explored for transformations.
    pub(crate) explored: bool,
    /// Implementation rules have fired for this group.
    pub(crate) implemented: bool,
    next_expr_id: usize,
}

impl Group {
    fn new(group_id: GroupId, logical_prop: LogicalProperty) -> Self {
        Self {
            group_id,
            logical_prop,
            stats: None,
            stats_cols: ExprSet::new(),
            logical_group_exprs: HashMap::new(),
            physical_group_exprs: HashMap::new(),
            best_plans: HashMap::new(),
            explored: false,
            implemented: false,
            next_expr_id: 0,
        }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn table_aliases(&self) -> &BTreeSet<String> {
        self.logical_prop.table_aliases()
    }

    pub fn statistics(&self) -> Option<&Statistics> {
        self.stats.as_ref()
    }

    pub fn stats_ready(&self, required_cols: &ExprSet) -> bool {
        self.stats.is_some() && required_cols.is_subset(&self.stats_cols)
    }

    pub fn set_statistics(&mut self, stats: Statistics, derived_cols: &ExprSet) {
        self.stats = Some(stats);
        self.stats_cols.extend(derived_cols.iter().cloned());
    }

    pub fn winner(&self, required_prop: &PropertySet) -> Option<&OptimizationResult> {
        self.best_plans.get(required_prop)
    }

    pub fn winners(&self) -> impl Iterator<Item = (&PropertySet, &OptimizationResult)> {
        self.best_plans.iter()
    }

    /// Record `group_expr_id` as the winner for `output_prop` unless a
    /// strictly cheaper one is already known. Ties keep the earlier entry,
    /// which makes winner selection deterministic in insertion order.
    pub fn update_winner(
        &mut self,
        group_expr_id: GroupExprId,
        output_prop: &PropertySet,
        input_props: &[PropertySet],
        cost: Cost,
    ) {
        if let Some(winner) = self.winner(output_prop) {
            if winner.lowest_cost <= cost {
                return;
            }
        }

        self.best_plans.insert(
            output_prop.clone(),
            OptimizationResult {
                lowest_cost: cost,
                group_expr_id,
            },
        );

        let group_expr = self
            .physical_group_exprs
            .get_mut(&group_expr_id)
            .expect("winner must be a physical member of this group");
        group_expr.update_winner_input(output_prop, input_props, cost);
    }

    pub fn logical_group_expr_ids(&self) -> Vec<GroupExprId> {
        self.logical_group_exprs
            .keys()
            .copied()
            .sorted_by_key(|id| id.expr_id)
            .collect()
    }

    pub fn physical_group_expr_ids(&self) -> Vec<GroupExprId> {
        self.physical_group_exprs
            .keys()
            .copied()
            .sorted_by_key(|id| id.expr_id)
            .collect()
    }

    pub fn expr_count(&self) -> usize {
        self.logical_group_exprs.len() + self.physical_group_exprs.len()
    }

    fn insert_group_expr(&mut self, group_expr: GroupExpr) -> GroupExprId {
        let group_expr_id = self.next_group_expr_id();
        match group_expr.key.operator {
            Operator::Logical(_) => {
                self.logical_group_exprs.insert(group_expr_id, group_expr);
            }
            Operator::Physical(_) => {
                self.physical_group_exprs.insert(group_expr_id, group_expr);
            }
        }
        group_expr_id
    }

    fn next_group_expr_id(&mut self) -> GroupExprId {
        let expr_id = self.next_expr_id;
        self.next_expr_id += 1;
        GroupExprId {
            group_id: self.group_id,
            expr_id,
        }
    }

    fn best_plan_of(
        &self,
        prop: &PropertySet,
        memo: &Memo,
        id_gen: &mut PlanNodeIdGen,
    ) -> OptResult<PlanNodeRef> {
        let winner = self.winner(prop).ok_or_else(|| {
            OptimizerError::NoPhysicalPlan(format!(
                "group {:?} (explored: {}, implemented: {}, {} logical / {} physical members) \
                 has no winner for {:?}",
                self.group_id,
                self.explored,
                self.implemented,
                self.logical_group_exprs.len(),
                self.physical_group_exprs.len(),
                prop
            ))
        })?;

        let best_group_expr = self
            .physical_group_exprs
            .get(&winner.group_expr_id)
            .expect("winner lives in this group");
        let winner_input = best_group_expr
            .output_prop_map
            .get(prop)
            .expect("winner input properties were recorded");

        let plan_node_id = id_gen.gen_next();
        let input_plans = best_group_expr
            .key
            .inputs
            .iter()
            .zip(&winner_input.input_props)
            .map(|(group_id, input_prop)| memo[*group_id].best_plan_of(input_prop, memo, id_gen))
            .try_collect()?;

        Ok(Arc::new(PlanNode::new(
            plan_node_id,
            best_group_expr.key.operator.clone(),
            input_plans,
        )))
    }
}

impl OptGroup for Group {
    fn logical_prop(&self) -> &LogicalProperty {
        &self.logical_prop
    }
}

impl Index<GroupExprId> for Group {
    type Output = GroupExpr;

    fn index(&self, index: GroupExprId) -> &GroupExpr {
        self.logical_group_exprs
            .get(&index)
            .or_else(|| self.physical_group_exprs.get(&index))
            .expect("unknown group expression id")
    }
}

impl IndexMut<GroupExprId> for Group {
    fn index_mut(&mut self, index: GroupExprId) -> &mut GroupExpr {
        self.logical_group_exprs
            .get_mut(&index)
            .or_else(|| self.physical_group_exprs.get_mut(&index))
            .expect("unknown group expression id")
    }
}

impl Debug for Group {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Group {} (aliases: {:?}):",
            self.group_id.0,
            self.table_aliases()
        )?;

        let mut table = Table::new();
        table.add_row(row!["Id", "Operator", "Inputs"]);
        for group_expr_id in self
            .logical_group_expr_ids()
            .into_iter()
            .chain(self.physical_group_expr_ids())
        {
            let group_expr = &self[group_expr_id];
            table.add_row(row![
                group_expr_id.expr_id,
                format!("{}", group_expr.key.operator),
                format!("{:?}", group_expr.key.inputs)
            ]);
        }
        writeln!(f, "{}", table)
    }
}

/// The best implementation found for one required property set.
#[derive(Debug)]
pub struct OptimizationResult {
    pub lowest_cost: Cost,
    pub group_expr_id: GroupExprId,
}

/// Chosen child required-property sets and cost of a winning expression,
/// keyed by the property set it wins for.
pub struct WinnerInput {
    pub lowest_cost: Cost,
    pub input_props: Vec<PropertySet>,
}

pub struct GroupExpr {
    /// Uniquely identifies the expression; never changes after creation.
    key: GroupExprKey,
    /// Rules already applied to this expression.
    applied_rules: EnumSet<RuleId>,
    output_prop_map: HashMap<PropertySet, WinnerInput>,
}

impl GroupExpr {
    pub(crate) fn new(key: GroupExprKey) -> Self {
        Self {
            key,
            applied_rules: EnumSet::new(),
            output_prop_map: HashMap::new(),
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.key.operator
    }

    pub fn inputs(&self) -> &[GroupId] {
        &self.key.inputs
    }

    pub fn input_group_ids(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.key.inputs.iter().copied()
    }

    pub fn is_logical(&self) -> bool {
        matches!(self.key.operator, Operator::Logical(_))
    }

    pub fn is_physical(&self) -> bool {
        matches!(self.key.operator, Operator::Physical(_))
    }

    pub fn is_rule_applied(&self, rule_id: RuleId) -> bool {
        self.applied_rules.contains(rule_id)
    }

    pub fn set_rule_applied(&mut self, rule_id: RuleId) {
        self.applied_rules |= rule_id;
    }

    pub fn matches_without_children(&self, pattern: &Pattern) -> bool {
        pattern.matches_root(&self.key.operator, self.key.inputs.len())
    }

    pub fn winner_input(&self, output_prop: &PropertySet) -> Option<&WinnerInput> {
        self.output_prop_map.get(output_prop)
    }

    fn update_winner_input(
        &mut self,
        output_prop: &PropertySet,
        input_props: &[PropertySet],
        cost: Cost,
    ) {
        if let Some(winner) = self.output_prop_map.get(output_prop) {
            if winner.lowest_cost <= cost {
                return;
            }
        }

        self.output_prop_map.insert(
            output_prop.clone(),
            WinnerInput {
                input_props: input_props.to_vec(),
                lowest_cost: cost,
            },
        );
    }
}

impl OptExpr for GroupExpr {
    type O = CascadesOptimizer;
    type InputHandle = GroupId;

    fn operator(&self) -> &Operator {
        GroupExpr::operator(self)
    }

    fn inputs_len(&self, _opt: &CascadesOptimizer) -> usize {
        self.key.inputs.len()
    }

    fn input_at(&self, idx: usize, _opt: &CascadesOptimizer) -> GroupId {
        self.key.inputs[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::LogicalOperator::{LogicalGet, LogicalJoin, LogicalLimit};
    use crate::operator::Operator::Logical;
    use crate::operator::{Join, Limit};
    use crate::plan::LogicalPlanBuilder;
    use crate::test_utils::{col_eq, table_get};

    #[test]
    fn test_build_memo_from_plan() {
        let plan = LogicalPlanBuilder::new()
            .get(table_get("t1"))
            .limit(Limit::new(5, 0))
            .build();

        let memo = Memo::from_plan(&plan).unwrap();
        assert_eq!(2, memo.groups.len());

        let root_group = &memo[memo.root_group_id()];
        assert_eq!(1, root_group.logical_group_expr_ids().len());
        assert_eq!(0, root_group.physical_group_expr_ids().len());

        let root_expr = &memo[root_group.logical_group_expr_ids()[0]];
        assert_eq!(
            &Logical(LogicalLimit(Limit::new(5, 0))),
            root_expr.operator()
        );

        let scan_group = &memo[root_expr.inputs()[0]];
        let scan_expr = &memo[scan_group.logical_group_expr_ids()[0]];
        assert_eq!(&Logical(LogicalGet(table_get("t1"))), scan_expr.operator());
        assert!(scan_expr.inputs().is_empty());
        assert!(scan_group.table_aliases().contains("t1"));
    }

    #[test]
    fn test_structural_dedup() {
        let build = || {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.get(table_get("t2")).build().root();
            builder
                .get(table_get("t1"))
                .join(Join::inner(vec![col_eq("t1", "c1", "t2", "c2")]), right)
                .build()
        };

        // Insert the same tree twice: group set must not grow.
        let plan = build();
        let mut memo = Memo::from_plan(&plan).unwrap();
        assert_eq!(3, memo.groups.len());

        let other = build();
        let nodes = other.bfs_iterator().collect::<Vec<_>>();
        let mut node_to_group = HashMap::new();
        for node in nodes.into_iter().rev() {
            let key = GroupExprKey {
                operator: node.operator().clone(),
                inputs: node
                    .inputs()
                    .iter()
                    .map(|i| *node_to_group.get(&i.id()).unwrap())
                    .collect(),
            };
            let id = memo.insert_group_expression(key, None);
            node_to_group.insert(node.id(), id.group_id);
        }

        assert_eq!(3, memo.groups.len());
        assert_eq!(
            memo.root_group_id(),
            *node_to_group.get(&other.root().id()).unwrap()
        );
    }

    #[test]
    fn test_join_group_aliases_are_unioned() {
        let plan = {
            let mut builder = LogicalPlanBuilder::new();
            let right = builder.get(table_get("t2")).build().root();
            builder
                .get(table_get("t1"))
                .join(Join::inner(vec![col_eq("t1", "c1", "t2", "c2")]), right)
                .build()
        };

        let memo = Memo::from_plan(&plan).unwrap();
        let root_aliases = memo[memo.root_group_id()].table_aliases();
        assert_eq!(
            vec!["t1".to_string(), "t2".to_string()],
            root_aliases.iter().cloned().collect::<Vec<_>>()
        );

        let root_expr_id = memo[memo.root_group_id()].logical_group_expr_ids()[0];
        assert!(matches!(
            memo[root_expr_id].operator(),
            Logical(LogicalJoin(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_tree() {
        // A join with a single child violates the arity invariant.
        let mut builder = LogicalPlanBuilder::new();
        let plan = builder
            .get(table_get("t1"))
            .operator(Logical(LogicalJoin(Join::inner(vec![]))), vec![])
            .build();

        assert!(matches!(
            Memo::from_plan(&plan),
            Err(OptimizerError::BindingInvariant(_))
        ));
    }
}
