//! Scalar expression trees embedded in operator payloads.
//!
//! Expressions are immutable once attached to an operator and shared through
//! [`ExprRef`]. Structural equality and hashing are derived from the full
//! node contents, which is what memo deduplication relies on.

mod annotated;
pub use annotated::*;

use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use ordered_float::OrderedFloat;

pub type ExprRef = Arc<ScalarExpr>;
pub type ExprSet = HashSet<ExprRef>;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum ScalarValue {
    Boolean(bool),
    Integer(i64),
    Float(OrderedFloat<f64>),
    Varchar(String),
    Null,
}

impl Display for ScalarValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Boolean(v) => write!(f, "{}", v),
            ScalarValue::Integer(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
            ScalarValue::Varchar(v) => write!(f, "'{}'", v),
            ScalarValue::Null => write!(f, "NULL"),
        }
    }
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum CompareKind {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

/// Node kind of a [`ScalarExpr`]. Children live in the uniform child list of
/// the node itself.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum ExprKind {
    /// Bound reference to a column of a named table alias.
    ColumnValue {
        table_name: String,
        column_name: String,
    },
    /// Reference into a child tuple: `(tuple_idx, value_idx)`.
    TupleValue { tuple_idx: usize, value_idx: usize },
    Constant(ScalarValue),
    /// Two children.
    Compare(CompareKind),
    /// One child, the aggregate argument.
    Aggregate(AggregateKind),
}

/// A scalar expression node.
///
/// `depth` tracks the subquery nesting level the expression was bound at and
/// is used for correlated-predicate detection: a comparison child with a
/// smaller depth than the enclosing predicate references an outer scope.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ScalarExpr {
    kind: ExprKind,
    children: Vec<ExprRef>,
    alias: Option<String>,
    depth: i32,
}

impl ScalarExpr {
    pub fn new(kind: ExprKind, children: Vec<ExprRef>) -> Self {
        Self {
            kind,
            children,
            alias: None,
            depth: -1,
        }
    }

    pub fn column<T: Into<String>, C: Into<String>>(table_name: T, column_name: C) -> Self {
        Self::new(
            ExprKind::ColumnValue {
                table_name: table_name.into(),
                column_name: column_name.into(),
            },
            vec![],
        )
    }

    pub fn tuple_value(tuple_idx: usize, value_idx: usize) -> Self {
        Self::new(ExprKind::TupleValue {
            tuple_idx,
            value_idx,
        }, vec![])
    }

    pub fn constant(value: ScalarValue) -> Self {
        Self::new(ExprKind::Constant(value), vec![])
    }

    pub fn integer(value: i64) -> Self {
        Self::constant(ScalarValue::Integer(value))
    }

    pub fn compare(kind: CompareKind, left: ExprRef, right: ExprRef) -> Self {
        Self::new(ExprKind::Compare(kind), vec![left, right])
    }

    pub fn compare_equal(left: ExprRef, right: ExprRef) -> Self {
        Self::compare(CompareKind::Equal, left, right)
    }

    pub fn aggregate(kind: AggregateKind, arg: ExprRef) -> Self {
        Self::new(ExprKind::Aggregate(kind), vec![arg])
    }

    pub fn with_alias<S: Into<String>>(mut self, alias: S) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn into_ref(self) -> ExprRef {
        Arc::new(self)
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn children(&self) -> &[ExprRef] {
        &self.children
    }

    pub fn child(&self, idx: usize) -> &ExprRef {
        &self.children[idx]
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Copy this node with a replaced child list. Alias and depth carry over.
    pub fn copy_with_children(&self, children: Vec<ExprRef>) -> Self {
        Self {
            kind: self.kind.clone(),
            children,
            alias: self.alias.clone(),
            depth: self.depth,
        }
    }

    pub fn is_column_ref(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::ColumnValue { .. } | ExprKind::TupleValue { .. }
        )
    }

    pub fn column_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::ColumnValue { column_name, .. } => Some(column_name),
            _ => None,
        }
    }

    pub fn table_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::ColumnValue { table_name, .. } => Some(table_name),
            _ => None,
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        matches!(self.kind, ExprKind::Aggregate(_))
            || self.children.iter().any(|c| c.contains_aggregate())
    }

    /// Table aliases referenced anywhere beneath this node.
    pub fn referenced_aliases(&self, out: &mut BTreeSet<String>) {
        if let ExprKind::ColumnValue { table_name, .. } = &self.kind {
            out.insert(table_name.clone());
        }
        for child in &self.children {
            child.referenced_aliases(out);
        }
    }

    /// Column and tuple reference nodes beneath this node, self included.
    pub fn collect_column_refs(&self, out: &mut ExprSet) {
        if self.is_column_ref() {
            out.insert(Arc::new(self.clone()));
        }
        for child in &self.children {
            child.collect_column_refs(out);
        }
    }

    /// Qualified name used to key derived column statistics.
    pub fn stats_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::ColumnValue {
                table_name,
                column_name,
            } => Some(format!("{}.{}", table_name, column_name)),
            ExprKind::TupleValue {
                tuple_idx,
                value_idx,
            } => Some(format!("?{}.{}", tuple_idx, value_idx)),
            _ => None,
        }
    }
}

impl Display for ScalarExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExprKind::ColumnValue {
                table_name,
                column_name,
            } => write!(f, "{}.{}", table_name, column_name),
            ExprKind::TupleValue {
                tuple_idx,
                value_idx,
            } => write!(f, "?{}.{}", tuple_idx, value_idx),
            ExprKind::Constant(v) => write!(f, "{}", v),
            ExprKind::Compare(kind) => {
                let op = match kind {
                    CompareKind::Equal => "=",
                    CompareKind::NotEqual => "<>",
                    CompareKind::LessThan => "<",
                    CompareKind::LessThanOrEqual => "<=",
                    CompareKind::GreaterThan => ">",
                    CompareKind::GreaterThanOrEqual => ">=",
                };
                write!(f, "{} {} {}", self.children[0], op, self.children[1])
            }
            ExprKind::Aggregate(kind) => {
                write!(f, "{:?}({})", kind, self.children[0])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carrier_eq_5() -> ScalarExpr {
        ScalarExpr::compare_equal(
            ScalarExpr::column("order", "o_carrier_id").into_ref(),
            ScalarExpr::integer(5).into_ref(),
        )
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(carrier_eq_5(), carrier_eq_5());
        assert_ne!(
            carrier_eq_5(),
            ScalarExpr::compare_equal(
                ScalarExpr::column("order", "o_carrier_id").into_ref(),
                ScalarExpr::integer(6).into_ref(),
            )
        );
    }

    #[test]
    fn test_referenced_aliases() {
        let expr = ScalarExpr::compare_equal(
            ScalarExpr::column("t1", "c1").into_ref(),
            ScalarExpr::column("t2", "c2").into_ref(),
        );

        let mut aliases = BTreeSet::new();
        expr.referenced_aliases(&mut aliases);
        assert_eq!(
            vec!["t1".to_string(), "t2".to_string()],
            aliases.into_iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_contains_aggregate() {
        let plain = carrier_eq_5();
        assert!(!plain.contains_aggregate());

        let agg = ScalarExpr::compare(
            CompareKind::GreaterThan,
            ScalarExpr::aggregate(
                AggregateKind::Count,
                ScalarExpr::column("order", "o_id").into_ref(),
            )
            .into_ref(),
            ScalarExpr::integer(10).into_ref(),
        );
        assert!(agg.contains_aggregate());
    }

    #[test]
    fn test_copy_with_children_keeps_depth() {
        let expr = carrier_eq_5().with_depth(1);
        let copied = expr.copy_with_children(vec![
            ScalarExpr::column("order", "o_id").into_ref(),
            ScalarExpr::integer(7).into_ref(),
        ]);

        assert_eq!(1, copied.depth());
        assert_eq!("order.o_id = 7", format!("{}", copied));
    }
}
