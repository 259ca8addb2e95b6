use std::fmt::{Debug, Display, Formatter};

use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;
use strum_macros::AsRefStr;

use crate::error::OptResult;
use crate::operator::{
    Delete, DerivedGet, DisplayFields, Distinct, ExportFile, ExternalScan, HashGroupBy, HashJoin,
    IndexScan, Insert, InsertSelect, Limit, NLJoin, OrderBy, PlainAggregate, SeqScan, SortGroupBy,
    TableFreeScan, Update,
};
use crate::optimizer::Optimizer;
use crate::properties::PropertySet;

/// Physical relational operator.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EnumAsInner, AsRefStr)]
#[enum_dispatch]
pub enum PhysicalOperator {
    SeqScan(SeqScan),
    IndexScan(IndexScan),
    TableFreeScan(TableFreeScan),
    QueryDerivedScan(DerivedGet),
    ExternalFileScan(ExternalScan),
    HashGroupBy(HashGroupBy),
    SortGroupBy(SortGroupBy),
    Aggregate(PlainAggregate),
    Distinct(Distinct),
    NLJoin(NLJoin),
    HashJoin(HashJoin),
    Limit(Limit),
    OrderBy(OrderBy),
    Insert(Insert),
    InsertSelect(InsertSelect),
    Update(Update),
    Delete(Delete),
    ExportExternalFile(ExportFile),
}

impl Display for PhysicalOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())?;
        self.display(f)
    }
}

/// Inputs of a child-property derivation.
pub struct DerivePropContext<'a, O: Optimizer> {
    pub required_prop: &'a PropertySet,
    pub expr_handle: O::ExprHandle,
    pub optimizer: &'a O,
}

/// One candidate produced by a child-property derivation: the property set
/// the operator provides, and the property set required from each child.
#[derive(Clone, Debug)]
pub struct DerivePropResult {
    pub output_prop: PropertySet,
    pub input_required_props: Vec<PropertySet>,
}

impl DerivePropResult {
    /// Candidate providing nothing and requiring nothing from `children`
    /// children.
    pub fn passthrough_none(children: usize) -> Self {
        Self {
            output_prop: PropertySet::new(),
            input_required_props: vec![PropertySet::new(); children],
        }
    }

    /// Candidate forwarding the full requirement to a single child and
    /// claiming it as provided.
    pub fn passthrough_required(required: &PropertySet) -> Self {
        Self {
            output_prop: required.clone(),
            input_required_props: vec![required.clone()],
        }
    }
}

/// Per-operator child-property derivation, dispatched over the closed
/// physical operator set.
///
/// The search driver asks each physical candidate for its
/// `(provided, required-per-child)` entries and picks the entry whose
/// provided set fulfills the requirement and whose children all have
/// winners. An operator returning no entries is never winnable.
#[enum_dispatch(PhysicalOperator)]
pub trait PhysicalOperatorTrait: Debug + PartialEq {
    fn derive_properties<O: Optimizer>(
        &self,
        context: DerivePropContext<O>,
    ) -> OptResult<Vec<DerivePropResult>>;
}
