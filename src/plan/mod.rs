//! External plan representation.
//!
//! A [`Plan`] is a single-root tree of operator nodes. It is both the input
//! of an optimization call (a bound logical tree) and its output (the
//! materialized physical winner chain).

mod explain;
pub use explain::*;
mod builder;
pub use builder::*;

use std::collections::HashSet;
use std::mem::swap;
use std::sync::Arc;

use crate::operator::Operator;

pub type PlanNodeId = u32;

pub type PlanNodeRef = Arc<PlanNode>;

#[derive(Clone, Debug, Default)]
pub struct PlanNodeIdGen {
    next: PlanNodeId,
}

impl PlanNodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gen_next(&mut self) -> PlanNodeId {
        self.next += 1;
        self.next
    }
}

/// One node in a plan: an operator plus its owned children.
#[derive(Debug)]
pub struct PlanNode {
    id: PlanNodeId,
    operator: Operator,
    inputs: Vec<PlanNodeRef>,
}

/// Equality ignores node ids; two plans are the same when their operator
/// trees are.
impl PartialEq for PlanNode {
    fn eq(&self, other: &Self) -> bool {
        self.operator == other.operator && self.inputs == other.inputs
    }
}

impl PlanNode {
    pub fn new(id: PlanNodeId, operator: Operator, inputs: Vec<PlanNodeRef>) -> Self {
        Self {
            id,
            operator,
            inputs,
        }
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn inputs(&self) -> &[PlanNodeRef] {
        &self.inputs
    }
}

/// A query plan: a single-root directed tree.
#[derive(PartialEq, Debug)]
pub struct Plan {
    root: PlanNodeRef,
}

impl Plan {
    pub fn new(root: PlanNodeRef) -> Self {
        Self { root }
    }

    pub fn root(&self) -> PlanNodeRef {
        self.root.clone()
    }

    pub fn bfs_iterator(&self) -> impl Iterator<Item = PlanNodeRef> {
        let mut visited = HashSet::new();
        visited.insert(self.root.id);

        BfsPlanNodeIter {
            visited,
            cur_level: vec![self.root.clone()],
            next_level: vec![],
        }
    }
}

/// Breadth-first iterator over plan nodes.
struct BfsPlanNodeIter {
    visited: HashSet<PlanNodeId>,
    cur_level: Vec<PlanNodeRef>,
    next_level: Vec<PlanNodeRef>,
}

impl Iterator for BfsPlanNodeIter {
    type Item = PlanNodeRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur_level.is_empty() {
            swap(&mut self.cur_level, &mut self.next_level);
        }

        if let Some(node) = self.cur_level.pop() {
            for input in &node.inputs {
                if self.visited.insert(input.id) {
                    self.next_level.push(input.clone());
                }
            }
            Some(node)
        } else {
            None
        }
    }
}
