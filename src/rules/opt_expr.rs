use std::fmt::{Debug, Formatter};
use std::ops::Index;

use crate::error::{OptResult, OptimizerError};
use crate::operator::Operator;
use crate::optimizer::{OptExpr, Optimizer};
use crate::rules::OptExprNode::{ExprHandleNode, GroupHandleNode, OperatorNode};

/// One node in an [`OptExpression`].
pub enum OptExprNode<O: Optimizer> {
    /// A fresh operator created by a rule.
    OperatorNode(Operator),
    /// A bound expression living in the memo.
    ExprHandleNode(O::ExprHandle),
    /// The leaf sentinel: an entire group, referenced by handle. It matches
    /// any group during binding and is resolved back to the group on
    /// insertion, so it can never surface in an emitted plan.
    GroupHandleNode(O::GroupHandle),
}

impl<O: Optimizer> Clone for OptExprNode<O> {
    fn clone(&self) -> Self {
        match self {
            OperatorNode(op) => OperatorNode(op.clone()),
            ExprHandleNode(handle) => ExprHandleNode(handle.clone()),
            GroupHandleNode(handle) => GroupHandleNode(handle.clone()),
        }
    }
}

impl<O: Optimizer> PartialEq for OptExprNode<O> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OperatorNode(op), OperatorNode(other_op)) => op == other_op,
            (ExprHandleNode(handle), ExprHandleNode(other_handle)) => handle == other_handle,
            (GroupHandleNode(handle), GroupHandleNode(other_handle)) => handle == other_handle,
            _ => false,
        }
    }
}

impl<O: Optimizer> Debug for OptExprNode<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatorNode(op) => write!(f, "Operator: {:?}", op),
            ExprHandleNode(handle) => write!(f, "Expr: {:?}", handle),
            GroupHandleNode(handle) => write!(f, "Group: {:?}", handle),
        }
    }
}

impl<O: Optimizer> From<Operator> for OptExprNode<O> {
    fn from(op: Operator) -> Self {
        OperatorNode(op)
    }
}

/// Expression tree matched by a rule pattern, and the form of a rule's
/// output.
///
/// As input, interior nodes are expression handles into the memo and the
/// pattern's leaves are group handles. As output, nodes created by the rule
/// are operators, while untouched sub-trees stay handles and are re-used on
/// insertion.
pub struct OptExpression<O: Optimizer> {
    node: OptExprNode<O>,
    inputs: Vec<OptExpression<O>>,
}

impl<O: Optimizer> Clone for OptExpression<O> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            inputs: self.inputs.clone(),
        }
    }
}

impl<O: Optimizer> PartialEq for OptExpression<O> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.inputs == other.inputs
    }
}

impl<O: Optimizer> OptExpression<O> {
    pub fn with_operator<I>(operator: Operator, inputs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        Self {
            node: OperatorNode(operator),
            inputs: inputs.into_iter().collect(),
        }
    }

    pub fn with_expr_handle<I>(handle: O::ExprHandle, inputs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        Self {
            node: ExprHandleNode(handle),
            inputs: inputs.into_iter().collect(),
        }
    }

    /// Group handles are leaves by construction; they never carry inputs.
    pub fn with_group_handle(handle: O::GroupHandle) -> Self {
        Self {
            node: GroupHandleNode(handle),
            inputs: vec![],
        }
    }

    /// New tree with `operator` at the root and this node's inputs.
    pub fn clone_with_inputs(&self, operator: Operator) -> Self {
        Self {
            node: OperatorNode(operator),
            inputs: self.inputs.clone(),
        }
    }

    pub fn node(&self) -> &OptExprNode<O> {
        &self.node
    }

    pub fn inputs(&self) -> &[Self] {
        &self.inputs
    }

    pub fn get_operator<'a>(&'a self, optimizer: &'a O) -> OptResult<&'a Operator> {
        match &self.node {
            OperatorNode(op) => Ok(op),
            ExprHandleNode(handle) => Ok(optimizer.expr_at(handle.clone()).operator()),
            GroupHandleNode(_) => Err(OptimizerError::internal(
                "can't get operator from group handle",
            )),
        }
    }

    fn format(&self, f: &mut Formatter<'_>, level: usize) -> std::fmt::Result {
        if level > 0 {
            write!(f, "{}--", "  ".repeat(level - 1))?;
        }
        writeln!(f, "{:?}", self.node)?;
        for input in &self.inputs {
            input.format(f, level + 1)?;
        }
        Ok(())
    }
}

impl<O: Optimizer> Debug for OptExpression<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.format(f, 0)
    }
}

/// Creates a leaf expression from an operator.
impl<O: Optimizer> From<Operator> for OptExpression<O> {
    fn from(op: Operator) -> Self {
        OptExpression::with_operator(op, vec![])
    }
}

/// Index of inputs.
impl<O: Optimizer> Index<usize> for OptExpression<O> {
    type Output = OptExpression<O>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.inputs[index]
    }
}
