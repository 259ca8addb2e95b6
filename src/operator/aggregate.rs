use std::fmt::Formatter;

use crate::error::OptResult;
use crate::expression::{AnnotatedExpression, ExprRef};
use crate::operator::{
    DerivePropContext, DerivePropResult, DisplayFields, PhysicalOperatorTrait,
};
use crate::optimizer::Optimizer;
use crate::properties::{Property, PropertySet, SortSpec};

/// Logical aggregation with optional group-by columns and HAVING predicates.
/// An empty column list is a plain (single-group) aggregation.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Aggregate {
    columns: Vec<ExprRef>,
    having: Vec<AnnotatedExpression>,
}

impl Aggregate {
    pub fn new(columns: Vec<ExprRef>, having: Vec<AnnotatedExpression>) -> Self {
        Self { columns, having }
    }

    pub fn columns(&self) -> &[ExprRef] {
        &self.columns
    }

    pub fn having(&self) -> &[AnnotatedExpression] {
        &self.having
    }
}

impl DisplayFields for Aggregate {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("");
        s.field("columns", &self.columns.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        if !self.having.is_empty() {
            s.field("having", &self.having);
        }
        s.finish()
    }
}

/// Hash based aggregation. Erases any input order.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct HashGroupBy {
    columns: Vec<ExprRef>,
    having: Vec<AnnotatedExpression>,
}

impl HashGroupBy {
    pub fn new(columns: Vec<ExprRef>, having: Vec<AnnotatedExpression>) -> Self {
        Self { columns, having }
    }

    pub fn columns(&self) -> &[ExprRef] {
        &self.columns
    }

    pub fn having(&self) -> &[AnnotatedExpression] {
        &self.having
    }
}

impl PhysicalOperatorTrait for HashGroupBy {
    fn derive_properties<O: Optimizer>(
        &self,
        _context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::passthrough_none(1)])
    }
}

impl DisplayFields for HashGroupBy {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("columns", &self.columns.iter().map(|c| c.to_string()).collect::<Vec<_>>())
            .finish()
    }
}

/// Sort based aggregation: the child must deliver input sorted on the
/// group-by columns, and the operator preserves that order.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct SortGroupBy {
    columns: Vec<ExprRef>,
    having: Vec<AnnotatedExpression>,
}

impl SortGroupBy {
    pub fn new(columns: Vec<ExprRef>, having: Vec<AnnotatedExpression>) -> Self {
        Self { columns, having }
    }

    pub fn columns(&self) -> &[ExprRef] {
        &self.columns
    }

    pub fn having(&self) -> &[AnnotatedExpression] {
        &self.having
    }
}

impl PhysicalOperatorTrait for SortGroupBy {
    fn derive_properties<O: Optimizer>(
        &self,
        _context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        let sort = PropertySet::with_property(Property::Sort(SortSpec::all_ascending(
            self.columns.clone(),
        )));
        Ok(vec![DerivePropResult {
            output_prop: sort.clone(),
            input_required_props: vec![sort],
        }])
    }
}

impl DisplayFields for SortGroupBy {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("columns", &self.columns.iter().map(|c| c.to_string()).collect::<Vec<_>>())
            .finish()
    }
}

/// Plain aggregation without group-by columns.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Default)]
pub struct PlainAggregate {}

impl PlainAggregate {
    pub fn new() -> Self {
        Self {}
    }
}

impl PhysicalOperatorTrait for PlainAggregate {
    fn derive_properties<O: Optimizer>(
        &self,
        _context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::passthrough_none(1)])
    }
}

impl DisplayFields for PlainAggregate {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("").finish()
    }
}

/// Duplicate elimination. Shared by the logical and physical operator sets;
/// the physical side lets the child fulfill the full requirement.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Default)]
pub struct Distinct {}

impl Distinct {
    pub fn new() -> Self {
        Self {}
    }
}

impl PhysicalOperatorTrait for Distinct {
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>> {
        Ok(vec![DerivePropResult::passthrough_required(
            context.required_prop,
        )])
    }
}

impl DisplayFields for Distinct {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("").finish()
    }
}
