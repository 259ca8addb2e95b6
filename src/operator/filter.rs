use std::fmt::Formatter;

use crate::expression::AnnotatedExpression;
use crate::operator::DisplayFields;

/// Logical filter: a conjunction of predicates over its single child.
///
/// Filters only exist in the logical space. Implementation either embeds
/// them into a scan, pushes them below a join, or folds them into an
/// aggregation's HAVING clause; a filter surviving to implementation has no
/// physical counterpart.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<AnnotatedExpression>,
}

impl Filter {
    pub fn new(predicates: Vec<AnnotatedExpression>) -> Self {
        Self { predicates }
    }

    pub fn predicates(&self) -> &[AnnotatedExpression] {
        &self.predicates
    }
}

impl DisplayFields for Filter {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("predicates", &self.predicates)
            .finish()
    }
}
