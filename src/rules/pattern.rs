use crate::operator::Operator;

pub type OperatorMatcher = fn(&Operator) -> bool;

/// A pattern defines which sub-trees of the memo a rule operates on.
///
/// The root must be an operator node; a child is either another operator
/// pattern, matched against every logical expression of the child group, or
/// a [`Pattern::Leaf`], which matches any group as a whole and makes the
/// binding record the group id.
///
/// Matching `Filter(Join(LEAF, LEAF))` looks like:
/// ```
/// use peridot::operator::LogicalOperator::{LogicalFilter, LogicalJoin};
/// use peridot::operator::Operator::Logical;
/// use peridot::rules::Pattern;
///
/// Pattern::new(
///     |op| matches!(op, Logical(LogicalFilter(_))),
///     vec![Pattern::new(
///         |op| matches!(op, Logical(LogicalJoin(_))),
///         vec![Pattern::leaf(), Pattern::leaf()],
///     )],
/// );
/// ```
pub enum Pattern {
    Leaf,
    Operator {
        predict: OperatorMatcher,
        children: Vec<Pattern>,
    },
}

pub fn any(_: &Operator) -> bool {
    true
}

impl Pattern {
    pub fn leaf() -> Pattern {
        Pattern::Leaf
    }

    pub fn new<I: IntoIterator<Item = Pattern>>(predict: OperatorMatcher, children: I) -> Pattern {
        Pattern::Operator {
            predict,
            children: children.into_iter().collect(),
        }
    }

    /// Single operator with no children, e.g. a scan.
    pub fn leaf_operator(predict: OperatorMatcher) -> Pattern {
        Pattern::new(predict, vec![])
    }

    pub fn children(&self) -> &[Pattern] {
        match self {
            Pattern::Leaf => &[],
            Pattern::Operator { children, .. } => children,
        }
    }

    /// Match an operator against the root of this pattern, ignoring
    /// children. [`Pattern::Leaf`] matches everything.
    pub fn matches_root(&self, operator: &Operator, input_count: usize) -> bool {
        match self {
            Pattern::Leaf => true,
            Pattern::Operator { predict, children } => {
                predict(operator) && children.len() == input_count
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::LogicalOperator::{LogicalFilter, LogicalJoin};
    use crate::operator::Operator::Logical;
    use crate::operator::{Filter, Join};

    #[test]
    fn test_matches_root() {
        let pattern = Pattern::new(
            |op| matches!(op, Logical(LogicalJoin(_))),
            vec![Pattern::leaf(), Pattern::leaf()],
        );

        let join = Logical(LogicalJoin(Join::inner(vec![])));
        let filter = Logical(LogicalFilter(Filter::new(vec![])));

        assert!(pattern.matches_root(&join, 2));
        // Child count mismatch.
        assert!(!pattern.matches_root(&join, 1));
        assert!(!pattern.matches_root(&filter, 2));
        assert!(Pattern::leaf().matches_root(&filter, 7));
    }
}
