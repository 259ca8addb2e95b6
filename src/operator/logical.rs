use std::fmt::{Display, Formatter};

use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;
use strum_macros::AsRefStr;

use crate::expression::ExprSet;
use crate::operator::{
    Aggregate, Delete, DerivedGet, DisplayFields, Distinct, ExportFile, ExternalScan, Filter, Get,
    Insert, InsertSelect, Join, Limit, Update,
};

/// Logical relational operator.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EnumAsInner, AsRefStr)]
#[enum_dispatch]
pub enum LogicalOperator {
    LogicalGet(Get),
    LogicalDerivedGet(DerivedGet),
    LogicalFilter(Filter),
    LogicalJoin(Join),
    LogicalAggregate(Aggregate),
    LogicalLimit(Limit),
    LogicalDistinct(Distinct),
    LogicalInsert(Insert),
    LogicalInsertSelect(InsertSelect),
    LogicalUpdate(Update),
    LogicalDelete(Delete),
    LogicalExternalScan(ExternalScan),
    LogicalExportFile(ExportFile),
}

impl Display for LogicalOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())?;
        self.display(f)
    }
}

impl LogicalOperator {
    pub fn arity(&self) -> Option<usize> {
        use LogicalOperator::*;
        match self {
            LogicalGet(_) | LogicalInsert(_) | LogicalExternalScan(_) => Some(0),
            LogicalDerivedGet(_) | LogicalFilter(_) | LogicalAggregate(_) | LogicalLimit(_)
            | LogicalDistinct(_) | LogicalInsertSelect(_) | LogicalUpdate(_) | LogicalDelete(_)
            | LogicalExportFile(_) => Some(1),
            LogicalJoin(_) => Some(2),
        }
    }

    /// Columns referenced by the operator payload. Feeds the required-column
    /// seed of statistics derivation.
    pub fn collect_referenced_columns(&self, out: &mut ExprSet) {
        use LogicalOperator::*;
        match self {
            LogicalGet(get) => {
                for predicate in get.predicates() {
                    predicate.expr().collect_column_refs(out);
                }
            }
            LogicalFilter(filter) => {
                for predicate in filter.predicates() {
                    predicate.expr().collect_column_refs(out);
                }
            }
            LogicalJoin(join) => {
                for predicate in join.predicates() {
                    predicate.expr().collect_column_refs(out);
                }
            }
            LogicalAggregate(aggregate) => {
                for column in aggregate.columns() {
                    column.collect_column_refs(out);
                }
                for predicate in aggregate.having() {
                    predicate.expr().collect_column_refs(out);
                }
            }
            LogicalLimit(limit) => {
                for expr in limit.sort_exprs() {
                    expr.collect_column_refs(out);
                }
            }
            LogicalDerivedGet(_) | LogicalDistinct(_) | LogicalInsert(_)
            | LogicalInsertSelect(_) | LogicalUpdate(_) | LogicalDelete(_)
            | LogicalExternalScan(_) | LogicalExportFile(_) => {}
        }
    }
}
