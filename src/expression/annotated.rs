use std::collections::BTreeSet;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

use crate::expression::ExprRef;

/// A predicate together with the set of table aliases it references.
///
/// The alias closure is computed once at construction and used by the
/// rewrite rules to decide pushdown targets. Equality and hashing ignore the
/// cached set since it is fully determined by the expression.
#[derive(Clone)]
pub struct AnnotatedExpression {
    expr: ExprRef,
    table_alias_set: BTreeSet<String>,
}

impl AnnotatedExpression {
    pub fn new(expr: ExprRef) -> Self {
        let mut table_alias_set = BTreeSet::new();
        expr.referenced_aliases(&mut table_alias_set);
        Self {
            expr,
            table_alias_set,
        }
    }

    pub fn expr(&self) -> &ExprRef {
        &self.expr
    }

    pub fn table_alias_set(&self) -> &BTreeSet<String> {
        &self.table_alias_set
    }

    /// True when every alias this predicate references is covered by `aliases`.
    pub fn covered_by(&self, aliases: &BTreeSet<String>) -> bool {
        self.table_alias_set.is_subset(aliases)
    }
}

impl From<ExprRef> for AnnotatedExpression {
    fn from(expr: ExprRef) -> Self {
        AnnotatedExpression::new(expr)
    }
}

impl PartialEq for AnnotatedExpression {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl Eq for AnnotatedExpression {}

impl Hash for AnnotatedExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.expr.hash(state);
    }
}

impl Debug for AnnotatedExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expr)
    }
}

impl Display for AnnotatedExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ScalarExpr;

    #[test]
    fn test_alias_closure() {
        let predicate = AnnotatedExpression::new(
            ScalarExpr::compare_equal(
                ScalarExpr::column("t1", "c1").into_ref(),
                ScalarExpr::column("t2", "c2").into_ref(),
            )
            .into_ref(),
        );

        let both: BTreeSet<String> = ["t1".to_string(), "t2".to_string()].into_iter().collect();
        let left: BTreeSet<String> = ["t1".to_string()].into_iter().collect();

        assert_eq!(&both, predicate.table_alias_set());
        assert!(predicate.covered_by(&both));
        assert!(!predicate.covered_by(&left));
    }
}
